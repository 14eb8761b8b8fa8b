//! Seams to the three external collaborators plus the host's router.
//!
//! Implementations return already-normalized entities; loosely-typed rows
//! never cross these traits. `crate::remote` binds them to the HTTP clients
//! and `crate::testing` provides in-memory versions.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use satya_core::{
    AuthEvent, CommentRecord, Evidence, ParentClaim, Session, VerdictResult, Verification,
    VerificationSummary, VoteValue,
};

/// Unsubscribe handle returned alongside an auth event receiver.
pub struct Unsubscribe(Box<dyn FnOnce() + Send>);

impl Unsubscribe {
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Consumes the handle, so it can run at most once.
    pub fn call(self) {
        (self.0)()
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Unsubscribe")
    }
}

/// A live registration on the identity provider's event stream.
#[derive(Debug)]
pub struct AuthSubscription {
    pub events: broadcast::Receiver<AuthEvent>,
    pub unsubscribe: Unsubscribe,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Session probe. `Ok(None)` means anonymous.
    async fn current_session(&self) -> Result<Option<Session>>;

    fn on_auth_state_change(&self) -> AuthSubscription;

    async fn sign_out(&self) -> Result<()>;
}

/// One page of a history query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    /// Only records created at or before this instant. Inclusive so records
    /// sharing the cursor's timestamp are not skipped; the caller's id union
    /// drops the ones it already holds.
    pub at_or_before: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDraft {
    pub verification_id: String,
    pub user_id: String,
    pub user_email: String,
    pub text: String,
}

#[async_trait]
pub trait DataStore: Send + Sync {
    /// Newest first.
    async fn verification_history(
        &self,
        owner_id: &str,
        page: PageRequest,
    ) -> Result<Vec<VerificationSummary>>;

    async fn verification(&self, id: &str) -> Result<Verification>;

    async fn claim(&self, id: &str) -> Result<ParentClaim>;

    async fn evidence(&self, verification_id: &str) -> Result<Vec<Evidence>>;

    async fn comments(&self, verification_id: &str) -> Result<Vec<CommentRecord>>;

    async fn insert_comment(&self, draft: &CommentDraft) -> Result<CommentRecord>;

    /// Idempotent upsert keyed on `(comment_id, user_id)`. `Neutral` clears.
    async fn handle_comment_vote(
        &self,
        comment_id: &str,
        user_id: &str,
        value: VoteValue,
    ) -> Result<()>;
}

#[async_trait]
pub trait VerdictService: Send + Sync {
    async fn verify(&self, claim_text: &str, user_id: &str) -> Result<VerdictResult>;
}

#[async_trait]
pub trait ClaimsCatalog: Send + Sync {
    /// Raw body of the catalog endpoint; shape checking is the caller's job.
    async fn list_claims(&self) -> Result<serde_json::Value>;
}

/// The host's router.
pub trait Navigator: Send + Sync {
    fn current_route(&self) -> String;

    fn redirect(&self, route: &str);
}
