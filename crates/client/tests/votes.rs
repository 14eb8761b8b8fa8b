use std::sync::Arc;

use chrono::Duration;
use satya_client::ports::DataStore;
use satya_client::testing::{MemoryStore, StoreOp};
use satya_client::{ClientError, DetailView, Surface, VotePhase};
use satya_core::testing::{cast, epoch, parent_claim, session, verification};
use satya_core::vote::VoteTally;
use satya_core::{CommentRecord, VoteValue};

/// A loaded detail view with one comment carrying two upvotes from others.
async fn loaded_view() -> (Arc<DetailView>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store.add_verification(verification("v1", "c1"), parent_claim("c1"));
    store.add_comment(
        "v1",
        CommentRecord {
            id: "k1".into(),
            text: "Source is a satire site".into(),
            author_email: Some("other@example.test".into()),
            created_at: epoch() + Duration::minutes(1),
            votes: vec![cast("u2", VoteValue::Up), cast("u3", VoteValue::Up)],
        },
    );
    let view = Arc::new(DetailView::new(store.clone()));
    view.load("v1", Some(&session("u1"))).await.unwrap();
    (view, store)
}

fn tally(view: &DetailView) -> VoteTally {
    let comment = &view.comments()[0];
    VoteTally::new(comment.vote_count, comment.user_vote)
}

fn sent_values(store: &MemoryStore) -> Vec<VoteValue> {
    store.vote_calls().into_iter().map(|(_, _, v)| v).collect()
}

#[tokio::test]
async fn upvote_twice_round_trips() {
    let (view, store) = loaded_view().await;
    let me = session("u1");
    assert_eq!(tally(&view), VoteTally::new(2, VoteValue::Neutral));

    let first = view.vote(Some(&me), "k1", VoteValue::Up).await.unwrap();
    assert_eq!(first, VoteTally::new(3, VoteValue::Up));
    assert_eq!(store.vote_total("k1"), 3);

    let second = view.vote(Some(&me), "k1", VoteValue::Up).await.unwrap();
    assert_eq!(second, VoteTally::new(2, VoteValue::Neutral));
    assert_eq!(tally(&view), VoteTally::new(2, VoteValue::Neutral));
    assert_eq!(store.vote_total("k1"), 2);
    assert_eq!(sent_values(&store), [VoteValue::Up, VoteValue::Neutral]);
    assert_eq!(
        view.votes().phase("k1"),
        Some(VotePhase::Committed(VoteTally::new(2, VoteValue::Neutral)))
    );
}

#[tokio::test]
async fn switching_sides_moves_by_two() {
    let (view, store) = loaded_view().await;
    let me = session("u1");
    view.vote(Some(&me), "k1", VoteValue::Up).await.unwrap();
    let switched = view.vote(Some(&me), "k1", VoteValue::Down).await.unwrap();
    assert_eq!(switched, VoteTally::new(1, VoteValue::Down));
    assert_eq!(store.vote_total("k1"), 1);
}

#[tokio::test]
async fn failed_vote_rolls_back() {
    let (view, store) = loaded_view().await;
    store.fail(StoreOp::Vote);

    let err = view
        .vote(Some(&session("u1")), "k1", VoteValue::Down)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Mutation { action: "vote", .. }));
    assert_eq!(err.surface(), Surface::Alert);
    assert_eq!(tally(&view), VoteTally::new(2, VoteValue::Neutral));
    assert_eq!(
        view.votes().phase("k1"),
        Some(VotePhase::RolledBack(VoteTally::new(2, VoteValue::Neutral)))
    );
    assert_eq!(store.vote_total("k1"), 2);
}

#[tokio::test]
async fn anonymous_vote_never_reaches_the_store() {
    let (view, store) = loaded_view().await;
    let err = view.vote(None, "k1", VoteValue::Up).await.unwrap_err();
    assert_eq!(err, ClientError::Unauthenticated("vote"));
    assert_eq!(tally(&view), VoteTally::new(2, VoteValue::Neutral));
    assert!(store.vote_calls().is_empty());
    assert_eq!(view.votes().phase("k1"), None);
}

#[tokio::test]
async fn pending_display_is_authoritative_plus_delta() {
    let (view, store) = loaded_view().await;
    let mut gate = store.pause_next_vote();

    let voting = view.clone();
    let vote = tokio::spawn(async move {
        voting
            .vote(Some(&session("u1")), "k1", VoteValue::Down)
            .await
    });
    gate.wait_started().await;

    let phase = view.votes().phase("k1").unwrap();
    assert!(phase.is_pending());
    assert_eq!(tally(&view), VoteTally::new(1, VoteValue::Down));
    assert_eq!(store.vote_total("k1") - 1, tally(&view).count);

    gate.release();
    assert_eq!(vote.await.unwrap(), Ok(VoteTally::new(1, VoteValue::Down)));
    assert_eq!(store.vote_total("k1"), tally(&view).count);
}

#[tokio::test]
async fn rapid_clicks_on_one_comment_are_serialized() {
    let (view, store) = loaded_view().await;
    let mut gate = store.pause_next_vote();

    let first_view = view.clone();
    let first = tokio::spawn(async move {
        first_view
            .vote(Some(&session("u1")), "k1", VoteValue::Up)
            .await
    });
    gate.wait_started().await;

    let second_view = view.clone();
    let second = tokio::spawn(async move {
        second_view
            .vote(Some(&session("u1")), "k1", VoteValue::Up)
            .await
    });
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    // The second click waits behind the first.
    assert_eq!(store.vote_calls().len(), 1);
    assert_eq!(tally(&view), VoteTally::new(3, VoteValue::Up));

    gate.release();
    assert_eq!(first.await.unwrap(), Ok(VoteTally::new(3, VoteValue::Up)));
    assert_eq!(second.await.unwrap(), Ok(VoteTally::new(2, VoteValue::Neutral)));
    assert_eq!(sent_values(&store), [VoteValue::Up, VoteValue::Neutral]);
    assert_eq!(tally(&view), VoteTally::new(2, VoteValue::Neutral));
    assert_eq!(store.vote_total("k1"), 2);
}

#[tokio::test]
async fn vote_on_unknown_comment_is_a_mutation_error() {
    let (view, store) = loaded_view().await;
    let err = view
        .vote(Some(&session("u1")), "missing", VoteValue::Up)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Mutation { action: "vote", .. }));
    assert!(store.vote_calls().is_empty());
}

#[tokio::test]
async fn reload_during_a_vote_keeps_the_fresh_tally() {
    let (view, store) = loaded_view().await;
    let me = session("u1");
    let mut gate = store.pause_next_vote();

    let voting = view.clone();
    let vote = tokio::spawn(async move {
        voting
            .vote(Some(&session("u1")), "k1", VoteValue::Down)
            .await
    });
    gate.wait_started().await;
    assert_eq!(tally(&view), VoteTally::new(1, VoteValue::Down));

    // Someone else upvotes, then the view is reloaded before our vote lands.
    store.handle_comment_vote("k1", "u4", VoteValue::Up).await.unwrap();
    view.load("v1", Some(&me)).await.unwrap();
    assert_eq!(tally(&view), VoteTally::new(3, VoteValue::Neutral));

    gate.release();
    assert_eq!(vote.await.unwrap(), Ok(VoteTally::new(2, VoteValue::Down)));
    assert_eq!(tally(&view), VoteTally::new(2, VoteValue::Down));
    assert_eq!(store.vote_total("k1"), 2);
}

#[tokio::test]
async fn failed_vote_after_a_reload_leaves_the_reloaded_tally() {
    let (view, store) = loaded_view().await;
    let mut gate = store.pause_next_vote();

    let voting = view.clone();
    let vote = tokio::spawn(async move {
        voting
            .vote(Some(&session("u1")), "k1", VoteValue::Up)
            .await
    });
    gate.wait_started().await;

    store.handle_comment_vote("k1", "u4", VoteValue::Down).await.unwrap();
    view.load("v1", Some(&session("u1"))).await.unwrap();
    store.fail(StoreOp::Vote);

    gate.release();
    assert!(vote.await.unwrap().is_err());
    assert_eq!(tally(&view), VoteTally::new(1, VoteValue::Neutral));
    assert_eq!(store.vote_total("k1"), 1);
}
