//! Verification detail: four reads composed into one view, all or nothing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use satya_core::vote::VoteTally;
use satya_core::{Comment, Session, VerificationDetail, VoteValue};

use crate::error::{ClientError, Result};
use crate::liveness::Liveness;
use crate::ports::{CommentDraft, DataStore};
use crate::vote::{CommentThread, VoteCoordinator};

/// Message shown in place of the whole view when composition fails.
pub const LOAD_FAILED: &str = "Failed to load verification details. Please try again later.";

pub struct DetailAggregator {
    store: Arc<dyn DataStore>,
}

impl DetailAggregator {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Verification, then its claim, then evidence, then comments. The
    /// first failure aborts the whole composition.
    pub async fn load(
        &self,
        verification_id: &str,
        current_user: Option<&str>,
    ) -> Result<VerificationDetail> {
        let verification = self
            .store
            .verification(verification_id)
            .await
            .map_err(|e| aggregation_failed("verification", &e))?;
        let claim = self
            .store
            .claim(&verification.claim_id)
            .await
            .map_err(|e| aggregation_failed("claim", &e))?;
        let evidence = self
            .store
            .evidence(verification_id)
            .await
            .map_err(|e| aggregation_failed("evidence", &e))?;
        let records = self
            .store
            .comments(verification_id)
            .await
            .map_err(|e| aggregation_failed("comments", &e))?;

        let mut comments: Vec<Comment> = records
            .into_iter()
            .map(|record| record.derive(current_user))
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(VerificationDetail {
            verification,
            claim,
            evidence,
            comments,
        })
    }
}

fn aggregation_failed(step: &str, err: &anyhow::Error) -> ClientError {
    warn!("detail {step} fetch failed: {err:#}");
    ClientError::Aggregation(LOAD_FAILED.to_string())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DetailState {
    #[default]
    Loading,
    /// Comments live in the shared thread; this copy is from load time.
    Ready(Box<VerificationDetail>),
    Failed(String),
}

/// State of one open detail view.
pub struct DetailView {
    store: Arc<dyn DataStore>,
    aggregator: DetailAggregator,
    thread: Arc<CommentThread>,
    votes: VoteCoordinator,
    state: Mutex<DetailState>,
    liveness: Liveness,
}

impl DetailView {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        let thread = Arc::new(CommentThread::new());
        Self {
            aggregator: DetailAggregator::new(store.clone()),
            votes: VoteCoordinator::new(store.clone(), thread.clone()),
            store,
            thread,
            state: Mutex::new(DetailState::Loading),
            liveness: Liveness::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DetailState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn load(&self, verification_id: &str, session: Option<&Session>) -> Result<()> {
        *self.lock() = DetailState::Loading;
        let user_id = session.map(|s| s.user_id.as_str());
        let outcome = self.aggregator.load(verification_id, user_id).await;
        if !self.liveness.is_alive() {
            debug!("detail view for {verification_id} closed; result discarded");
            return Err(ClientError::TornDown);
        }
        match outcome {
            Ok(detail) => {
                self.thread.replace(detail.comments.clone());
                *self.lock() = DetailState::Ready(Box::new(detail));
                Ok(())
            }
            Err(e) => {
                self.thread.clear();
                *self.lock() = DetailState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    pub fn state(&self) -> DetailState {
        self.lock().clone()
    }

    /// The composed view with the current comment thread, or `None` unless
    /// the last load succeeded.
    pub fn detail(&self) -> Option<VerificationDetail> {
        let DetailState::Ready(detail) = self.state() else {
            return None;
        };
        let mut detail = *detail;
        detail.comments = self.thread.snapshot();
        Some(detail)
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.thread.snapshot()
    }

    /// Insert a comment and put it at the top of the thread with no votes.
    pub async fn post_comment(&self, session: Option<&Session>, text: &str) -> Result<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::EmptyInput("comment"));
        }
        let Some(session) = session else {
            return Err(ClientError::Unauthenticated("comment"));
        };
        let verification_id = match &*self.lock() {
            DetailState::Ready(detail) => detail.verification.id.clone(),
            _ => {
                return Err(ClientError::Mutation {
                    action: "comment",
                    message: "verification is not loaded".to_string(),
                });
            }
        };

        let draft = CommentDraft {
            verification_id,
            user_id: session.user_id.clone(),
            user_email: session.email.clone(),
            text: text.to_string(),
        };
        let record = self.store.insert_comment(&draft).await.map_err(|e| {
            warn!("comment insert failed: {e:#}");
            ClientError::mutation("comment", &e)
        })?;
        if !self.liveness.is_alive() {
            return Err(ClientError::TornDown);
        }

        let tally = VoteTally::new(0, VoteValue::Neutral);
        let comment = Comment {
            id: record.id,
            text: record.text,
            author_email: record.author_email.or(Some(draft.user_email)),
            created_at: record.created_at,
            vote_count: tally.count,
            user_vote: tally.user_vote,
        };
        info!("comment {} posted", comment.id);
        self.thread.prepend(comment.clone());
        Ok(comment)
    }

    pub async fn vote(
        &self,
        session: Option<&Session>,
        comment_id: &str,
        requested: VoteValue,
    ) -> Result<VoteTally> {
        self.votes.vote(session, comment_id, requested).await
    }

    pub fn votes(&self) -> &VoteCoordinator {
        &self.votes
    }

    pub fn teardown(&self) {
        self.liveness.kill();
    }
}
