//! Optimistic comment voting with rollback.
//!
//! Each comment's vote goes through an explicit phase machine:
//! `Idle → Pending → Committed | RolledBack`. Clicks on the same comment are
//! serialized by a per-comment async lock held across the remote call, so a
//! second click starts from the first click's outcome.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use satya_core::vote::{VoteTally, effective_vote};
use satya_core::{Comment, Session, VoteValue};

use crate::error::{ClientError, Result};
use crate::ports::DataStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VotePhase {
    Idle(VoteTally),
    Pending { before: VoteTally, after: VoteTally },
    Committed(VoteTally),
    RolledBack(VoteTally),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteEvent {
    /// The user clicked a vote value.
    Requested(VoteValue),
    Confirmed,
    Failed,
}

impl VotePhase {
    /// The tally the user currently sees.
    pub fn displayed(&self) -> VoteTally {
        match *self {
            Self::Idle(t) | Self::Committed(t) | Self::RolledBack(t) => t,
            Self::Pending { after, .. } => after,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

/// Pure transition function. Events that make no sense in the current phase
/// leave it unchanged.
pub fn transition(phase: VotePhase, event: VoteEvent) -> VotePhase {
    match (phase, event) {
        (
            VotePhase::Idle(t) | VotePhase::Committed(t) | VotePhase::RolledBack(t),
            VoteEvent::Requested(requested),
        ) => VotePhase::Pending {
            before: t,
            after: t.with_vote(effective_vote(t.user_vote, requested)),
        },
        (VotePhase::Pending { after, .. }, VoteEvent::Confirmed) => VotePhase::Committed(after),
        (VotePhase::Pending { before, .. }, VoteEvent::Failed) => VotePhase::RolledBack(before),
        (phase, _) => phase,
    }
}

/// The comment list of the open detail view. Shared by the detail view
/// (load, new comments) and the vote coordinator (tallies).
#[derive(Debug, Default)]
pub struct CommentThread {
    inner: Mutex<ThreadInner>,
}

#[derive(Debug, Default)]
struct ThreadInner {
    /// Bumped whenever the list is replaced from the store.
    generation: u64,
    comments: Vec<Comment>,
}

impl ThreadInner {
    fn find_mut(&mut self, comment_id: &str) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id == comment_id)
    }
}

fn write_tally(comment: &mut Comment, tally: VoteTally) {
    comment.vote_count = tally.count;
    comment.user_vote = tally.user_vote;
}

impl CommentThread {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ThreadInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn replace(&self, comments: Vec<Comment>) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.comments = comments;
    }

    pub fn prepend(&self, comment: Comment) {
        self.lock().comments.insert(0, comment);
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.comments.clear();
    }

    pub fn snapshot(&self) -> Vec<Comment> {
        self.lock().comments.clone()
    }

    pub fn get(&self, comment_id: &str) -> Option<Comment> {
        self.lock().comments.iter().find(|c| c.id == comment_id).cloned()
    }

    pub fn tally(&self, comment_id: &str) -> Option<VoteTally> {
        self.lock()
            .comments
            .iter()
            .find(|c| c.id == comment_id)
            .map(|c| VoteTally::new(c.vote_count, c.user_vote))
    }

    /// The tally together with the list generation it was read from.
    fn tally_at(&self, comment_id: &str) -> Option<(u64, VoteTally)> {
        let inner = self.lock();
        inner
            .comments
            .iter()
            .find(|c| c.id == comment_id)
            .map(|c| (inner.generation, VoteTally::new(c.vote_count, c.user_vote)))
    }

    fn set_tally(&self, comment_id: &str, tally: VoteTally) {
        if let Some(comment) = self.lock().find_mut(comment_id) {
            write_tally(comment, tally);
        }
    }

    /// Write back a settled vote that began at `generation`. When the list
    /// was reloaded in between, the reloaded tally is authoritative: a
    /// confirmed vote is moved onto it and a failed one leaves it untouched.
    /// Returns the comment's resulting tally.
    fn settle(
        &self,
        comment_id: &str,
        generation: u64,
        settled: VoteTally,
        confirmed: bool,
    ) -> Option<VoteTally> {
        let mut inner = self.lock();
        let reloaded = inner.generation != generation;
        let comment = inner.find_mut(comment_id)?;
        if !reloaded {
            write_tally(comment, settled);
        } else if confirmed {
            let current = VoteTally::new(comment.vote_count, comment.user_vote);
            write_tally(comment, current.with_vote(settled.user_vote));
        }
        Some(VoteTally::new(comment.vote_count, comment.user_vote))
    }
}

pub struct VoteCoordinator {
    store: Arc<dyn DataStore>,
    thread: Arc<CommentThread>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    phases: Mutex<HashMap<String, VotePhase>>,
}

impl VoteCoordinator {
    pub fn new(store: Arc<dyn DataStore>, thread: Arc<CommentThread>) -> Self {
        Self {
            store,
            thread,
            locks: Mutex::new(HashMap::new()),
            phases: Mutex::new(HashMap::new()),
        }
    }

    fn comment_lock(&self, comment_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(comment_id.to_string())
            .or_default()
            .clone()
    }

    fn set_phase(&self, comment_id: &str, phase: VotePhase) {
        self.phases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(comment_id.to_string(), phase);
    }

    /// Last phase reached for `comment_id`, if it was ever voted on.
    pub fn phase(&self, comment_id: &str) -> Option<VotePhase> {
        self.phases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(comment_id)
            .copied()
    }

    /// Click `requested` on a comment. Returns the tally after the remote
    /// call settled; on failure the pre-click tally is restored and the error
    /// returned. A reload that lands mid-call wins over both.
    pub async fn vote(
        &self,
        session: Option<&Session>,
        comment_id: &str,
        requested: VoteValue,
    ) -> Result<VoteTally> {
        let Some(session) = session else {
            debug!("anonymous vote on {comment_id} rejected");
            return Err(ClientError::Unauthenticated("vote"));
        };

        let lock = self.comment_lock(comment_id);
        let _serialized = lock.lock().await;

        let Some((generation, current)) = self.thread.tally_at(comment_id) else {
            return Err(ClientError::Mutation {
                action: "vote",
                message: format!("comment {comment_id} is not loaded"),
            });
        };

        let pending = transition(VotePhase::Idle(current), VoteEvent::Requested(requested));
        let VotePhase::Pending { after, .. } = pending else {
            return Ok(current);
        };
        self.thread.set_tally(comment_id, after);
        self.set_phase(comment_id, pending);

        let result = self
            .store
            .handle_comment_vote(comment_id, &session.user_id, after.user_vote)
            .await;

        let confirmed = result.is_ok();
        let settled = match &result {
            Ok(()) => transition(pending, VoteEvent::Confirmed),
            Err(e) => {
                warn!("vote on {comment_id} failed; rolling back: {e:#}");
                transition(pending, VoteEvent::Failed)
            }
        };
        let shown = self
            .thread
            .settle(comment_id, generation, settled.displayed(), confirmed)
            .unwrap_or(settled.displayed());
        self.set_phase(comment_id, settled);
        match result {
            Ok(()) => Ok(shown),
            Err(e) => Err(ClientError::mutation("vote", &e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_computes_toggle_and_delta() {
        let idle = VotePhase::Idle(VoteTally::new(3, VoteValue::Up));
        let pending = transition(idle, VoteEvent::Requested(VoteValue::Up));
        assert_eq!(
            pending,
            VotePhase::Pending {
                before: VoteTally::new(3, VoteValue::Up),
                after: VoteTally::new(2, VoteValue::Neutral),
            }
        );
        assert_eq!(pending.displayed(), VoteTally::new(2, VoteValue::Neutral));
    }

    #[test]
    fn confirm_and_fail_settle_pending() {
        let pending = transition(
            VotePhase::Idle(VoteTally::new(0, VoteValue::Neutral)),
            VoteEvent::Requested(VoteValue::Down),
        );
        assert_eq!(
            transition(pending, VoteEvent::Confirmed),
            VotePhase::Committed(VoteTally::new(-1, VoteValue::Down))
        );
        assert_eq!(
            transition(pending, VoteEvent::Failed),
            VotePhase::RolledBack(VoteTally::new(0, VoteValue::Neutral))
        );
    }

    #[test]
    fn nonsense_events_are_ignored() {
        let idle = VotePhase::Idle(VoteTally::default());
        assert_eq!(transition(idle, VoteEvent::Confirmed), idle);
        assert_eq!(transition(idle, VoteEvent::Failed), idle);

        let pending = transition(idle, VoteEvent::Requested(VoteValue::Up));
        assert_eq!(transition(pending, VoteEvent::Requested(VoteValue::Down)), pending);
    }

    #[test]
    fn settled_phases_accept_new_requests() {
        let committed = VotePhase::Committed(VoteTally::new(1, VoteValue::Up));
        let again = transition(committed, VoteEvent::Requested(VoteValue::Down));
        assert_eq!(again.displayed(), VoteTally::new(-1, VoteValue::Down));
        assert!(again.is_pending());
    }

    #[test]
    fn thread_updates_only_matching_comment() {
        use satya_core::testing::comment;
        let thread = CommentThread::new();
        thread.replace(vec![
            comment("a", 2, 5, VoteValue::Neutral),
            comment("b", 1, 0, VoteValue::Neutral),
        ]);
        thread.set_tally("b", VoteTally::new(1, VoteValue::Up));
        assert_eq!(thread.tally("a"), Some(VoteTally::new(5, VoteValue::Neutral)));
        assert_eq!(thread.tally("b"), Some(VoteTally::new(1, VoteValue::Up)));
        assert_eq!(thread.tally("zz"), None);
    }

    #[test]
    fn settle_after_reload_moves_the_vote_onto_the_fresh_tally() {
        use satya_core::testing::comment;
        let thread = CommentThread::new();
        thread.replace(vec![comment("a", 1, 2, VoteValue::Neutral)]);
        let (generation, _) = thread.tally_at("a").unwrap();
        thread.set_tally("a", VoteTally::new(3, VoteValue::Up));

        thread.replace(vec![comment("a", 1, 7, VoteValue::Neutral)]);
        let shown = thread.settle("a", generation, VoteTally::new(3, VoteValue::Up), true);
        assert_eq!(shown, Some(VoteTally::new(8, VoteValue::Up)));

        let (generation, _) = thread.tally_at("a").unwrap();
        thread.replace(vec![comment("a", 1, 4, VoteValue::Up)]);
        let shown = thread.settle("a", generation, VoteTally::new(7, VoteValue::Neutral), false);
        assert_eq!(shown, Some(VoteTally::new(4, VoteValue::Up)));
    }
}
