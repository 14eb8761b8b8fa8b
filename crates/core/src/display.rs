use crate::model::{Stance, Verdict, VerificationStatus};

impl VerificationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Verified => "Verified",
            Self::Disputed => "Disputed",
            Self::Outdated => "Outdated",
            Self::Pending => "Pending",
        }
    }
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Self::True => "True",
            Self::False => "False",
            Self::Misleading => "Misleading",
            Self::Pending => "Pending",
        }
    }
}

impl Stance {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Supports => "Supports",
            Self::Refutes => "Refutes",
            Self::Neutral => "Neutral",
        }
    }
}

/// Greeting name: the local part of an email address.
pub fn display_name(email: &str) -> &str {
    match email.split('@').next() {
        Some(local) if !local.is_empty() => local,
        _ => "User",
    }
}

/// Comment author label, `Anonymous` when no email is known.
pub fn author_label(email: Option<&str>) -> &str {
    match email.and_then(|e| e.split('@').next()) {
        Some(local) if !local.is_empty() => local,
        _ => "Anonymous",
    }
}

/// Render a confidence in `[0, 1]` as a whole percentage.
pub fn confidence_label(confidence: Option<f64>) -> String {
    match confidence {
        Some(c) if c > 0.0 => format!("{:.0}%", c * 100.0),
        _ => "N/A".to_string(),
    }
}

pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{kept}…")
}
