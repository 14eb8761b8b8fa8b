use std::time::Duration;

use anyhow::Result;

use satya_api::{HealthResponse, VerifyRequest, VerifyResponse};

use crate::error::{check_status, parse_response};

/// Typed HTTP client for the verdict service.
///
/// Covers claim verification, the claims catalog and the health probe.
/// Nothing here retries: a failed verification is reported once, as is.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new client with the given base URL and timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create from an existing `reqwest::Client` (e.g. shared in tests).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── Health ────────────────────────────────────────────────────────────

    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self.client.get(self.url("/health")).send().await?;
        parse_response(resp).await
    }

    // ── Verification ──────────────────────────────────────────────────────

    pub async fn verify(&self, req: &VerifyRequest) -> Result<VerifyResponse> {
        let resp = self
            .client
            .post(self.url("/verify"))
            .json(req)
            .send()
            .await?;
        parse_response(resp).await
    }

    // ── Catalog ───────────────────────────────────────────────────────────

    /// `GET /api/claims` as untyped JSON; the body may be an array, an
    /// object, or anything else, and the caller decides what is usable.
    pub async fn list_claims(&self) -> Result<serde_json::Value> {
        let resp = self
            .client
            .get(self.url("/api/claims"))
            .header("Accept", "application/json")
            .header("Cache-Control", "no-store")
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }
}
