use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use satya_api::{ClaimRow, normalize};
use satya_core::Claim;
use satya_core::catalog::fallback_claims;

use crate::ports::ClaimsCatalog;

pub const NOTICE_EMPTY: &str = "No claims found. Using demo data.";
pub const NOTICE_MALFORMED: &str = "Invalid data format received. Using demo data.";

/// Catalog contents plus an explanation when they are the fallback set.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage {
    pub claims: Vec<Claim>,
    pub notice: Option<String>,
}

impl CatalogPage {
    pub fn is_fallback(&self) -> bool {
        self.notice.is_some()
    }
}

/// Turn the raw catalog body into claims. Rows are read one by one and an
/// unreadable row is skipped; the fallback set is used when the body is not
/// an array or no row survives.
pub fn parse_catalog(body: Value, now: DateTime<Utc>) -> CatalogPage {
    let Value::Array(items) = body else {
        return fallback(NOTICE_MALFORMED.to_string(), now);
    };
    if items.is_empty() {
        return fallback(NOTICE_EMPTY.to_string(), now);
    }
    let claims: Vec<Claim> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<ClaimRow>(item) {
            Ok(row) => Some(normalize::catalog_claim(row, i, now)),
            Err(e) => {
                warn!("skipping unreadable catalog row {i}: {e}");
                None
            }
        })
        .collect();
    if claims.is_empty() {
        return fallback(NOTICE_MALFORMED.to_string(), now);
    }
    CatalogPage {
        claims,
        notice: None,
    }
}

fn fallback(notice: String, now: DateTime<Utc>) -> CatalogPage {
    CatalogPage {
        claims: fallback_claims(now),
        notice: Some(notice),
    }
}

/// Loads the catalog; the result is never empty.
pub struct CatalogLoader {
    source: Arc<dyn ClaimsCatalog>,
}

impl CatalogLoader {
    pub fn new(source: Arc<dyn ClaimsCatalog>) -> Self {
        Self { source }
    }

    pub async fn load(&self) -> CatalogPage {
        let now = Utc::now();
        match self.source.list_claims().await {
            Ok(body) => parse_catalog(body, now),
            Err(e) => {
                warn!("catalog fetch failed: {e:#}");
                fallback(format!("Failed to load claims: {e}. Using demo data."), now)
            }
        }
    }
}
