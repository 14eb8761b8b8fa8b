use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use tracing::debug;

use satya_api::{
    COMMENT_VOTE_PROCEDURE, ClaimRow, CommentRow, CommentVoteArgs, EvidenceRow, NewComment,
    VerificationRow, tables,
};

use crate::error::{check_status, parse_response};

const HISTORY_SELECT: &str =
    "id,status,explanation,created_at,claim_id,claim:claims!verifications_claim_id_fkey(id,title,content)";
const EVIDENCE_SELECT: &str = "id,stance,rationale,evidence_docs(id,url,title,snippet,source)";
const COMMENTS_SELECT: &str = "*,comment_votes(user_id,value)";

/// Header asking the store for a single object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Typed client for the remote data store's REST surface.
///
/// Reads are filtered selects over tables; writes are the comment insert and
/// the vote procedure. Requests carry the anonymous key and, once signed in,
/// the user's access token.
pub struct StoreClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    access_token: RwLock<Option<String>>,
}

impl StoreClient {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, anon_key))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, anon_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            access_token: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace (or clear) the bearer token used for row-level access.
    pub fn set_access_token(&self, token: Option<String>) {
        *self
            .access_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn bearer(&self) -> String {
        self.access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    fn get(&self, table: &str, query: &[(&str, String)]) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(table))
            .query(query)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        debug!("store select {table} {query:?}");
        let resp = self.get(table, query).send().await?;
        parse_response(resp).await
    }

    async fn select_single<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        debug!("store select single {table} {query:?}");
        let resp = self
            .get(table, query)
            .header("Accept", SINGLE_OBJECT)
            .send()
            .await?;
        parse_response(resp).await
    }

    // ── Reads ─────────────────────────────────────────────────────────────

    /// Newest-first page of a user's verifications (ties broken by id),
    /// optionally limited to those created at or before `at_or_before`.
    pub async fn verification_history(
        &self,
        owner_id: &str,
        limit: usize,
        at_or_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<VerificationRow>> {
        let mut query = vec![
            ("select", HISTORY_SELECT.to_string()),
            ("user_id", format!("eq.{owner_id}")),
            ("order", "created_at.desc,id.desc".to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(cursor) = at_or_before {
            query.push((
                "created_at",
                format!("lte.{}", cursor.to_rfc3339_opts(SecondsFormat::Micros, true)),
            ));
        }
        self.select(tables::VERIFICATIONS, &query).await
    }

    pub async fn verification(&self, id: &str) -> Result<VerificationRow> {
        self.select_single(
            tables::VERIFICATIONS,
            &[("select", "*".to_string()), ("id", format!("eq.{id}"))],
        )
        .await
    }

    pub async fn claim(&self, id: &str) -> Result<ClaimRow> {
        self.select_single(
            tables::CLAIMS,
            &[("select", "*".to_string()), ("id", format!("eq.{id}"))],
        )
        .await
    }

    pub async fn evidence(&self, verification_id: &str) -> Result<Vec<EvidenceRow>> {
        self.select(
            tables::VERIFICATION_EVIDENCE,
            &[
                ("select", EVIDENCE_SELECT.to_string()),
                ("verification_id", format!("eq.{verification_id}")),
            ],
        )
        .await
    }

    pub async fn comments(&self, verification_id: &str) -> Result<Vec<CommentRow>> {
        self.select(
            tables::COMMENTS,
            &[
                ("select", COMMENTS_SELECT.to_string()),
                ("verification_id", format!("eq.{verification_id}")),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    // ── Writes ────────────────────────────────────────────────────────────

    /// Insert a comment and return the stored row.
    pub async fn insert_comment(&self, comment: &NewComment) -> Result<CommentRow> {
        let resp = self
            .client
            .post(self.url(tables::COMMENTS))
            .header("apikey", &self.anon_key)
            .header("Prefer", "return=representation")
            .header("Accept", SINGLE_OBJECT)
            .bearer_auth(self.bearer())
            .json(comment)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// Call the idempotent vote upsert procedure.
    pub async fn comment_vote(&self, args: &CommentVoteArgs) -> Result<()> {
        let resp = self
            .client
            .post(self.url(&format!("rpc/{COMMENT_VOTE_PROCEDURE}")))
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
            .json(args)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}
