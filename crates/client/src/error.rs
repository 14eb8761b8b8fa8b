use thiserror::Error;

/// How the host should present an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Written to the log only; the user never sees it.
    Logged,
    /// Inline, dismissible message next to the affected content.
    InlineNotice,
    /// Blocking alert the user has to acknowledge.
    Alert,
    /// Replaces the whole view with a single error state.
    ErrorView,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClientError {
    /// Probe or refresh failure. Callers treat it as "no session".
    #[error("session check failed: {0}")]
    Session(String),

    #[error("failed to load {what}: {message}")]
    Fetch { what: &'static str, message: String },

    /// Displays the remote message verbatim.
    #[error("{message}")]
    Mutation {
        action: &'static str,
        message: String,
    },

    #[error("{0}")]
    Aggregation(String),

    #[error("please sign in to {0}")]
    Unauthenticated(&'static str),

    #[error("a {0} request is already in progress")]
    InFlight(&'static str),

    #[error("{0} must not be empty")]
    EmptyInput(&'static str),

    /// The owning view went away before the result arrived.
    #[error("view was closed before the result arrived")]
    TornDown,
}

impl ClientError {
    pub fn surface(&self) -> Surface {
        match self {
            Self::Session(_) | Self::InFlight(_) | Self::TornDown => Surface::Logged,
            Self::Fetch { .. } | Self::EmptyInput(_) => Surface::InlineNotice,
            Self::Mutation { .. } | Self::Unauthenticated(_) => Surface::Alert,
            Self::Aggregation(_) => Surface::ErrorView,
        }
    }

    pub(crate) fn fetch(what: &'static str, err: &anyhow::Error) -> Self {
        Self::Fetch {
            what,
            message: err.to_string(),
        }
    }

    pub(crate) fn mutation(action: &'static str, err: &anyhow::Error) -> Self {
        Self::Mutation {
            action,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_surfaces() {
        assert_eq!(ClientError::Session("x".into()).surface(), Surface::Logged);
        assert_eq!(
            ClientError::Fetch {
                what: "history",
                message: "x".into()
            }
            .surface(),
            Surface::InlineNotice
        );
        assert_eq!(
            ClientError::Mutation {
                action: "vote",
                message: "x".into()
            }
            .surface(),
            Surface::Alert
        );
        assert_eq!(ClientError::Aggregation("x".into()).surface(), Surface::ErrorView);
        assert_eq!(ClientError::Unauthenticated("vote").surface(), Surface::Alert);
    }

    #[test]
    fn mutation_message_is_verbatim() {
        let err = ClientError::mutation("verify", &anyhow::anyhow!("Claim text is too short"));
        assert_eq!(err.to_string(), "Claim text is too short");
        assert_eq!(
            ClientError::Unauthenticated("vote").to_string(),
            "please sign in to vote"
        );
    }
}
