//! Port implementations backed by the HTTP clients. Rows are normalized
//! here, once per fetch.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use satya_api::{CommentVoteArgs, NewComment, VerifyRequest, normalize};
use satya_api_client::{ApiClient, AuthClient, StoreClient};
use satya_core::{
    CommentRecord, Evidence, ParentClaim, Session, VerdictResult, Verification,
    VerificationSummary, VoteValue,
};

use crate::ports::{
    AuthSubscription, ClaimsCatalog, CommentDraft, DataStore, IdentityProvider, PageRequest,
    Unsubscribe, VerdictService,
};

#[async_trait]
impl IdentityProvider for AuthClient {
    async fn current_session(&self) -> Result<Option<Session>> {
        AuthClient::current_session(self).await
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        AuthSubscription {
            events: self.subscribe(),
            unsubscribe: Unsubscribe::new(|| debug!("auth subscription released")),
        }
    }

    async fn sign_out(&self) -> Result<()> {
        AuthClient::sign_out(self).await
    }
}

#[async_trait]
impl VerdictService for ApiClient {
    async fn verify(&self, claim_text: &str, user_id: &str) -> Result<VerdictResult> {
        let resp = ApiClient::verify(
            self,
            &VerifyRequest {
                claim_text: claim_text.to_string(),
                user_id: user_id.to_string(),
            },
        )
        .await?;
        Ok(normalize::verdict_result(resp))
    }
}

#[async_trait]
impl ClaimsCatalog for ApiClient {
    async fn list_claims(&self) -> Result<serde_json::Value> {
        ApiClient::list_claims(self).await
    }
}

/// Data store reads and writes, authorized as the signed-in user when an
/// identity client is attached.
pub struct RemoteStore {
    store: StoreClient,
    auth: Option<Arc<AuthClient>>,
}

impl RemoteStore {
    pub fn new(store: StoreClient, auth: Option<Arc<AuthClient>>) -> Self {
        Self { store, auth }
    }

    /// Use the signed-in user's token, refreshing it first when it is about
    /// to expire. A refresh that fails on transport keeps the held token.
    async fn authorize(&self) {
        let Some(auth) = &self.auth else {
            return;
        };
        if let Err(e) = auth.current_session().await {
            warn!("token refresh failed; using the held token: {e:#}");
        }
        self.store.set_access_token(auth.access_token());
    }
}

#[async_trait]
impl DataStore for RemoteStore {
    async fn verification_history(
        &self,
        owner_id: &str,
        page: PageRequest,
    ) -> Result<Vec<VerificationSummary>> {
        self.authorize().await;
        let rows = self
            .store
            .verification_history(owner_id, page.limit, page.at_or_before)
            .await?;
        Ok(normalize::verification_summaries(rows)?)
    }

    async fn verification(&self, id: &str) -> Result<Verification> {
        self.authorize().await;
        Ok(normalize::verification(self.store.verification(id).await?)?)
    }

    async fn claim(&self, id: &str) -> Result<ParentClaim> {
        self.authorize().await;
        Ok(normalize::parent_claim(self.store.claim(id).await?)?)
    }

    async fn evidence(&self, verification_id: &str) -> Result<Vec<Evidence>> {
        self.authorize().await;
        let rows = self.store.evidence(verification_id).await?;
        Ok(rows
            .into_iter()
            .map(normalize::evidence)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn comments(&self, verification_id: &str) -> Result<Vec<CommentRecord>> {
        self.authorize().await;
        let rows = self.store.comments(verification_id).await?;
        Ok(normalize::comment_records(rows)?)
    }

    async fn insert_comment(&self, draft: &CommentDraft) -> Result<CommentRecord> {
        self.authorize().await;
        let row = self
            .store
            .insert_comment(&NewComment {
                verification_id: draft.verification_id.clone(),
                user_id: draft.user_id.clone(),
                user_email: draft.user_email.clone(),
                text: draft.text.clone(),
            })
            .await?;
        Ok(normalize::comment_record(row)?)
    }

    async fn handle_comment_vote(
        &self,
        comment_id: &str,
        user_id: &str,
        value: VoteValue,
    ) -> Result<()> {
        self.authorize().await;
        self.store
            .comment_vote(&CommentVoteArgs {
                p_comment_id: comment_id.to_string(),
                p_user_id: user_id.to_string(),
                p_value: value.as_i64(),
            })
            .await
    }
}
