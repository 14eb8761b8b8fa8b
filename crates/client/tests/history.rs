use std::sync::Arc;
use std::time::Duration;

use satya_client::history::merge_batch;
use satya_client::testing::{Harness, MemoryStore, StoreOp};
use satya_client::{ClientError, HistoryList, SessionState, Surface};
use satya_core::testing::{session, summary};
use satya_core::{AuthEvent, VerificationSummary};
use satya_runtime_config::ClientConfig;

fn ids(items: &[VerificationSummary]) -> Vec<String> {
    items.iter().map(|v| v.id.clone()).collect()
}

fn batch(spec: &[(&str, i64)]) -> Vec<VerificationSummary> {
    spec.iter().map(|(id, minutes)| summary(id, *minutes)).collect()
}

fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            out.push(tail);
        }
    }
    out
}

#[test]
fn merge_is_a_duplicate_free_union_in_any_arrival_order() {
    let batches = vec![
        batch(&[("c", 3), ("b", 2), ("a", 1)]),
        batch(&[("b", 2), ("a", 1), ("z", 0)]),
        batch(&[("e", 5), ("d", 4), ("c", 3)]),
        batch(&[("a", 1)]),
    ];
    let mut expected: Vec<String> = batches.iter().flatten().map(|v| v.id.clone()).collect();
    expected.sort();
    expected.dedup();

    for order in permutations(&batches) {
        let mut held = Vec::new();
        for b in order {
            merge_batch(&mut held, b);
        }
        let mut got = ids(&held);
        got.sort();
        assert_eq!(got, expected);
    }
}

#[test]
fn merge_never_reorders_held_records() {
    let mut held = batch(&[("c", 3), ("b", 2), ("a", 1)]);
    let added = merge_batch(&mut held, batch(&[("e", 5), ("a", 1), ("c", 3)]));
    assert_eq!(added, 1);
    assert_eq!(ids(&held), ["c", "b", "a", "e"]);
}

#[tokio::test]
async fn background_refresh_appends_only_unknown_records() {
    let store = Arc::new(MemoryStore::new());
    store.add_history("u1", batch(&[("a", 1), ("b", 2), ("c", 3)]));
    let history = HistoryList::new(store.clone(), 10);

    assert_eq!(history.refresh("u1").await.unwrap(), 3);
    assert_eq!(ids(&history.snapshot()), ["c", "b", "a"]);

    store.add_history("u1", batch(&[("d", 0)]));
    assert_eq!(history.refresh("u1").await.unwrap(), 1);
    assert_eq!(ids(&history.snapshot()), ["c", "b", "a", "d"]);

    assert_eq!(history.refresh("u1").await.unwrap(), 0);
    assert_eq!(history.len(), 4);
}

#[tokio::test]
async fn failed_fetch_leaves_held_records_untouched() {
    let store = Arc::new(MemoryStore::new());
    store.add_history("u1", batch(&[("a", 1), ("b", 2)]));
    let history = HistoryList::new(store.clone(), 10);
    history.refresh("u1").await.unwrap();

    store.fail(StoreOp::History);
    let err = history.refresh("u1").await.unwrap_err();
    assert!(matches!(err, ClientError::Fetch { what: "history", .. }));
    assert_eq!(err.surface(), Surface::InlineNotice);
    assert_eq!(ids(&history.snapshot()), ["b", "a"]);

    store.recover(StoreOp::History);
    assert_eq!(history.refresh("u1").await.unwrap(), 0);
}

#[tokio::test]
async fn load_more_pages_from_the_oldest_held_record() {
    let store = Arc::new(MemoryStore::new());
    store.add_history(
        "u1",
        batch(&[("a", 1), ("b", 2), ("c", 3), ("d", 4), ("e", 5)]),
    );
    let history = HistoryList::new(store.clone(), 2);

    history.refresh("u1").await.unwrap();
    assert_eq!(ids(&history.snapshot()), ["e", "d"]);
    history.load_more("u1").await.unwrap();
    history.load_more("u1").await.unwrap();
    assert_eq!(ids(&history.snapshot()), ["e", "d", "c", "b", "a"]);
    assert_eq!(history.load_more("u1").await.unwrap(), 0);

    let pages = store.history_pages();
    assert_eq!(pages[0].at_or_before, None);
    assert_eq!(pages[1].at_or_before, Some(summary("d", 4).created_at));
    assert_eq!(pages[2].at_or_before, Some(summary("b", 2).created_at));
    let limits: Vec<usize> = pages.iter().map(|p| p.limit).collect();
    assert_eq!(limits, [2, 3, 3, 3]);
}

#[tokio::test]
async fn records_sharing_the_page_boundary_timestamp_are_not_lost() {
    let store = Arc::new(MemoryStore::new());
    store.add_history("u1", batch(&[("a", 1), ("b", 2), ("c", 2), ("d", 4)]));
    let history = HistoryList::new(store.clone(), 2);

    history.refresh("u1").await.unwrap();
    assert_eq!(ids(&history.snapshot()), ["d", "c"]);
    assert_eq!(history.load_more("u1").await.unwrap(), 2);
    assert_eq!(ids(&history.snapshot()), ["d", "c", "b", "a"]);
    assert_eq!(history.load_more("u1").await.unwrap(), 0);
}

#[tokio::test]
async fn a_page_made_entirely_of_ties_still_advances() {
    let store = Arc::new(MemoryStore::new());
    store.add_history(
        "u1",
        batch(&[("a", 0), ("b", 0), ("c", 0), ("d", 0), ("e", 0)]),
    );
    let history = HistoryList::new(store.clone(), 2);

    history.refresh("u1").await.unwrap();
    assert_eq!(history.load_more("u1").await.unwrap(), 2);
    assert_eq!(history.load_more("u1").await.unwrap(), 1);
    assert_eq!(history.load_more("u1").await.unwrap(), 0);
    assert_eq!(ids(&history.snapshot()), ["e", "d", "c", "b", "a"]);
}

#[tokio::test]
async fn filter_is_a_view_over_held_records() {
    let store = Arc::new(MemoryStore::new());
    let mut records = batch(&[("a", 1), ("b", 2)]);
    records[0].claim_text = "The Moon is made of cheese".into();
    store.add_history("u1", records);
    let history = HistoryList::new(store, 10);
    history.refresh("u1").await.unwrap();

    assert_eq!(ids(&history.filtered("CHEESE")), ["a"]);
    assert_eq!(history.filtered("verified").len(), 2);
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn reset_during_fetch_drops_the_late_batch() {
    let store = Arc::new(MemoryStore::new());
    store.add_history("u1", batch(&[("a", 1)]));
    let history = Arc::new(HistoryList::new(store.clone(), 10));

    let mut gate = store.pause_next_history();
    let fetching = history.clone();
    let fetch = tokio::spawn(async move { fetching.refresh("u1").await });
    gate.wait_started().await;

    history.reset();
    gate.release();
    assert_eq!(fetch.await.unwrap(), Ok(0));
    assert!(history.is_empty());
}

#[tokio::test]
async fn fetch_landing_after_teardown_is_discarded() {
    let store = Arc::new(MemoryStore::new());
    store.add_history("u1", batch(&[("a", 1)]));
    let history = Arc::new(HistoryList::new(store.clone(), 10));

    let mut gate = store.pause_next_history();
    let fetching = history.clone();
    let fetch = tokio::spawn(async move { fetching.refresh("u1").await });
    gate.wait_started().await;

    history.teardown();
    gate.release();
    assert_eq!(fetch.await.unwrap(), Err(ClientError::TornDown));
    assert!(history.is_empty());
}

#[tokio::test]
async fn sign_out_event_clears_history() {
    let harness = Harness::new(Some(session("u1")), "/dashboard");
    harness
        .store
        .add_history("u1", batch(&[("a", 1), ("b", 2), ("c", 3)]));
    let ctx = harness.context(&ClientConfig::default());
    ctx.init().await;
    assert_eq!(ctx.refresh_history().await.unwrap(), 3);

    harness.identity.expire();
    harness.identity.emit(AuthEvent::signed_out());
    let mut states = ctx.session().subscribe();
    tokio::time::timeout(
        Duration::from_secs(2),
        states.wait_for(|s| *s == SessionState::Anonymous),
    )
    .await
    .unwrap()
    .unwrap();
    for _ in 0..20 {
        if ctx.history().is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(ctx.history().is_empty());
    assert_eq!(harness.navigator.redirects(), ["/login"]);
}

#[tokio::test]
async fn explicit_sign_out_clears_history() {
    let harness = Harness::new(Some(session("u1")), "/dashboard");
    harness.store.add_history("u1", batch(&[("a", 1)]));
    let ctx = harness.context(&ClientConfig::default());
    ctx.init().await;
    ctx.refresh_history().await.unwrap();

    ctx.sign_out().await.unwrap();
    assert!(ctx.history().is_empty());
    assert_eq!(
        ctx.refresh_history().await,
        Err(ClientError::Unauthenticated("view history"))
    );
}

#[tokio::test]
async fn anonymous_history_is_rejected_without_fetching() {
    let harness = Harness::new(None, "/");
    let ctx = harness.context(&ClientConfig::default());
    ctx.init().await;

    let err = ctx.load_more_history().await.unwrap_err();
    assert_eq!(err, ClientError::Unauthenticated("view history"));
    assert_eq!(err.surface(), Surface::Alert);
    assert!(harness.store.calls().is_empty());
}
