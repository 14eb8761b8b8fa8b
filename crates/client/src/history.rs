//! A user's verification history, grown by append-only union.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use satya_core::VerificationSummary;

use crate::error::{ClientError, Result};
use crate::liveness::Liveness;
use crate::ports::{DataStore, PageRequest};

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Append the records of `batch` whose ids are not already held, in batch
/// order. Held records are never moved or replaced. Returns the number of
/// records appended.
pub fn merge_batch<I>(held: &mut Vec<VerificationSummary>, batch: I) -> usize
where
    I: IntoIterator<Item = VerificationSummary>,
{
    let before = held.len();
    let mut seen: HashSet<String> = held.iter().map(|v| v.id.clone()).collect();
    for record in batch {
        if seen.insert(record.id.clone()) {
            held.push(record);
        }
    }
    held.len() - before
}

/// Case-insensitive match over claim text, explanation and status.
/// Never touches the held collection.
pub fn filter_view<'a>(held: &'a [VerificationSummary], query: &str) -> Vec<&'a VerificationSummary> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return held.iter().collect();
    }
    held.iter()
        .filter(|v| {
            v.claim_text.to_lowercase().contains(&needle)
                || v.status.as_str().contains(&needle)
                || v.explanation
                    .as_deref()
                    .is_some_and(|e| e.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Held history plus the single setter path that grows or clears it.
pub struct HistoryList {
    store: Arc<dyn DataStore>,
    page_size: usize,
    items: Mutex<Vec<VerificationSummary>>,
    /// Bumped by [`HistoryList::reset`] so fetches started before a reset
    /// cannot repopulate the list.
    generation: AtomicU64,
    liveness: Liveness,
}

impl HistoryList {
    pub fn new(store: Arc<dyn DataStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: if page_size == 0 {
                DEFAULT_PAGE_SIZE
            } else {
                page_size
            },
            items: Mutex::new(Vec::new()),
            generation: AtomicU64::new(0),
            liveness: Liveness::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<VerificationSummary>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetch the newest page and merge it in.
    pub async fn refresh(&self, owner_id: &str) -> Result<usize> {
        let page = PageRequest {
            limit: self.page_size,
            at_or_before: None,
        };
        self.fetch_and_merge(owner_id, page).await
    }

    /// Fetch the next older page and merge it in.
    ///
    /// The cursor is the oldest held timestamp, inclusive. The limit is widened
    /// by the number of held records at that timestamp, so a page always has
    /// room for `page_size` records not yet held even when many share it.
    pub async fn load_more(&self, owner_id: &str) -> Result<usize> {
        let page = {
            let items = self.lock();
            let cursor = items.iter().map(|v| v.created_at).min();
            let ties = cursor.map_or(0, |c| items.iter().filter(|v| v.created_at == c).count());
            PageRequest {
                limit: self.page_size + ties,
                at_or_before: cursor,
            }
        };
        self.fetch_and_merge(owner_id, page).await
    }

    async fn fetch_and_merge(&self, owner_id: &str, page: PageRequest) -> Result<usize> {
        let generation = self.generation.load(Ordering::Acquire);
        let batch = match self.store.verification_history(owner_id, page).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!("history fetch failed; keeping {} held records: {e:#}", self.len());
                return Err(ClientError::fetch("history", &e));
            }
        };
        if !self.liveness.is_alive() {
            debug!("history view closed; dropping {} fetched records", batch.len());
            return Err(ClientError::TornDown);
        }
        let mut items = self.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            debug!("history reset during fetch; dropping {} records", batch.len());
            return Ok(0);
        }
        let added = merge_batch(&mut items, batch);
        debug!("history merged {added} new records ({} held)", items.len());
        Ok(added)
    }

    /// Clear the list, e.g. on sign-out.
    pub fn reset(&self) {
        let mut items = self.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        items.clear();
    }

    pub fn snapshot(&self) -> Vec<VerificationSummary> {
        self.lock().clone()
    }

    pub fn filtered(&self, query: &str) -> Vec<VerificationSummary> {
        let items = self.lock();
        filter_view(&items, query).into_iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn oldest(&self) -> Option<DateTime<Utc>> {
        self.lock().iter().map(|v| v.created_at).min()
    }

    pub fn teardown(&self) {
        self.liveness.kill();
    }
}
