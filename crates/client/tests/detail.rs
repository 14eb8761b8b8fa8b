use std::sync::Arc;

use chrono::Duration;
use satya_client::detail::LOAD_FAILED;
use satya_client::testing::{Harness, MemoryStore, StoreOp};
use satya_client::{ClientError, DetailState, DetailView, Surface};
use satya_core::testing::{cast, epoch, evidence, parent_claim, session, verification};
use satya_core::{CommentRecord, Stance, VoteValue};
use satya_runtime_config::ClientConfig;

fn record(id: &str, minutes: i64, votes: Vec<satya_core::CastVote>) -> CommentRecord {
    CommentRecord {
        id: id.to_string(),
        text: format!("comment {id}"),
        author_email: Some("author@example.test".into()),
        created_at: epoch() + Duration::minutes(minutes),
        votes,
    }
}

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.add_verification(verification("v1", "c1"), parent_claim("c1"));
    store.add_evidence(
        "v1",
        vec![evidence("e1", Stance::Supports), evidence("e2", Stance::Refutes)],
    );
    store.add_comment(
        "v1",
        record(
            "old",
            1,
            vec![cast("u1", VoteValue::Down), cast("u2", VoteValue::Up), cast("u3", VoteValue::Up)],
        ),
    );
    store.add_comment("v1", record("new", 5, vec![cast("u2", VoteValue::Up)]));
    store
}

#[tokio::test]
async fn composes_all_four_reads() {
    let store = seeded_store();
    let view = DetailView::new(store.clone());
    view.load("v1", Some(&session("u1"))).await.unwrap();

    let detail = view.detail().unwrap();
    assert_eq!(detail.verification.id, "v1");
    assert_eq!(detail.claim.id, "c1");
    assert_eq!(detail.evidence.len(), 2);
    assert_eq!(
        store.calls(),
        [StoreOp::Verification, StoreOp::Claim, StoreOp::Evidence, StoreOp::Comments]
    );

    let ids: Vec<&str> = detail.comments.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["new", "old"]);
    assert_eq!(detail.comments[1].vote_count, 1);
    assert_eq!(detail.comments[1].user_vote, VoteValue::Down);
    assert_eq!(detail.comments[0].user_vote, VoteValue::Neutral);
}

#[tokio::test]
async fn tallies_are_derived_per_viewer() {
    let store = seeded_store();
    let anonymous = DetailView::new(store.clone());
    anonymous.load("v1", None).await.unwrap();
    assert!(anonymous
        .comments()
        .iter()
        .all(|c| c.user_vote == VoteValue::Neutral));

    let other = DetailView::new(store);
    other.load("v1", Some(&session("u2"))).await.unwrap();
    assert!(other.comments().iter().all(|c| c.user_vote == VoteValue::Up));
}

#[tokio::test]
async fn any_failed_read_fails_the_whole_view() {
    for op in [StoreOp::Verification, StoreOp::Claim, StoreOp::Evidence, StoreOp::Comments] {
        let store = seeded_store();
        store.fail(op);
        let view = DetailView::new(store);

        let err = view.load("v1", Some(&session("u1"))).await.unwrap_err();
        assert_eq!(err, ClientError::Aggregation(LOAD_FAILED.to_string()));
        assert_eq!(err.surface(), Surface::ErrorView);
        assert_eq!(view.detail(), None);
        assert_eq!(view.state(), DetailState::Failed(LOAD_FAILED.to_string()));
        assert!(view.comments().is_empty());
    }
}

#[tokio::test]
async fn evidence_failure_stops_before_comments() {
    let store = seeded_store();
    store.fail(StoreOp::Evidence);
    let view = DetailView::new(store.clone());
    assert!(view.load("v1", None).await.is_err());
    assert!(!store.calls().contains(&StoreOp::Comments));
}

#[tokio::test]
async fn unknown_verification_fails_to_load() {
    let view = DetailView::new(seeded_store());
    let err = view.load("nope", None).await.unwrap_err();
    assert!(matches!(err, ClientError::Aggregation(_)));
}

#[tokio::test]
async fn reload_after_failure_recovers() {
    let store = seeded_store();
    store.fail(StoreOp::Comments);
    let view = DetailView::new(store.clone());
    assert!(view.load("v1", None).await.is_err());

    store.recover(StoreOp::Comments);
    view.load("v1", None).await.unwrap();
    assert_eq!(view.comments().len(), 2);
}

#[tokio::test]
async fn posted_comment_is_prepended_without_votes() {
    let store = seeded_store();
    let me = session("u1");
    let view = DetailView::new(store.clone());
    view.load("v1", Some(&me)).await.unwrap();

    let posted = view
        .post_comment(Some(&me), "  Checked the primary source.  ")
        .await
        .unwrap();
    assert_eq!(posted.text, "Checked the primary source.");
    assert_eq!(posted.vote_count, 0);
    assert_eq!(posted.user_vote, VoteValue::Neutral);
    assert_eq!(posted.author_email.as_deref(), Some(me.email.as_str()));

    let comments = view.comments();
    assert_eq!(comments.len(), 3);
    assert_eq!(comments[0].id, posted.id);
    assert_eq!(view.detail().unwrap().comments[0].id, posted.id);
}

#[tokio::test]
async fn failed_post_leaves_thread_unchanged() {
    let store = seeded_store();
    let me = session("u1");
    let view = DetailView::new(store.clone());
    view.load("v1", Some(&me)).await.unwrap();
    let before = view.comments();

    store.fail(StoreOp::InsertComment);
    let err = view.post_comment(Some(&me), "hello").await.unwrap_err();
    assert!(matches!(err, ClientError::Mutation { action: "comment", .. }));
    assert_eq!(err.surface(), Surface::Alert);
    assert_eq!(view.comments(), before);
}

#[tokio::test]
async fn blank_or_anonymous_comments_are_rejected() {
    let store = seeded_store();
    let view = DetailView::new(store.clone());
    view.load("v1", None).await.unwrap();

    assert_eq!(
        view.post_comment(Some(&session("u1")), "   ").await,
        Err(ClientError::EmptyInput("comment"))
    );
    assert_eq!(
        view.post_comment(None, "hello").await,
        Err(ClientError::Unauthenticated("comment"))
    );
    assert!(!store.calls().contains(&StoreOp::InsertComment));
    assert_eq!(view.comments().len(), 2);
}

#[tokio::test]
async fn load_after_teardown_is_discarded() {
    let view = DetailView::new(seeded_store());
    view.teardown();
    assert_eq!(view.load("v1", None).await, Err(ClientError::TornDown));
    assert_eq!(view.state(), DetailState::Loading);
    assert!(view.comments().is_empty());
}

#[tokio::test]
async fn each_navigation_gets_a_fresh_view() {
    let harness = Harness::new(Some(session("u1")), "/verify/v1");
    harness
        .store
        .add_verification(verification("v1", "c1"), parent_claim("c1"));
    let ctx = harness.context(&ClientConfig::default());
    ctx.init().await;

    let first = ctx.open_detail();
    first.load("v1", ctx.current_session().as_ref()).await.unwrap();
    let second = ctx.open_detail();
    assert_eq!(second.state(), DetailState::Loading);
    assert_eq!(second.detail(), None);

    second.load("v1", ctx.current_session().as_ref()).await.unwrap();
    assert_eq!(
        harness
            .store
            .calls()
            .iter()
            .filter(|op| **op == StoreOp::Verification)
            .count(),
        2
    );
}
