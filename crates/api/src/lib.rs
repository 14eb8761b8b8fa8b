//! Wire types for the three remote collaborators of the SatyaShodhak client:
//! the data store (rows), the verdict service, and the identity provider.
//!
//! Row types are deliberately lenient: every field is optional, ids may be
//! strings or numbers, and camelCase aliases are accepted. [`normalize`]
//! turns them into the strongly-shaped entities of `satya-core`.
//!
//! TypeScript declarations for the browser bundle are generated via `ts-rs`:
//!   cargo test -p satya-api --features ts -- export_typescript --nocapture

use serde::{Deserialize, Serialize};

mod flex;
pub mod normalize;

pub use normalize::NormalizeError;

// ─── Data store: tables ──────────────────────────────────────────────────────

/// Table names as exposed by the data store.
pub mod tables {
    pub const VERIFICATIONS: &str = "verifications";
    pub const CLAIMS: &str = "claims";
    pub const VERIFICATION_EVIDENCE: &str = "verification_evidence";
    pub const EVIDENCE_DOCS: &str = "evidence_docs";
    pub const COMMENTS: &str = "comments";
    pub const COMMENT_VOTES: &str = "comment_votes";
}

/// Name of the idempotent vote upsert procedure.
pub const COMMENT_VOTE_PROCEDURE: &str = "handle_comment_vote";

// ─── Data store: rows ────────────────────────────────────────────────────────

/// A `verifications` row, optionally with its claim embedded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerificationRow {
    #[serde(default, deserialize_with = "flex::opt_id")]
    pub id: Option<String>,
    #[serde(default, alias = "claimId", deserialize_with = "flex::opt_id")]
    pub claim_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub claim: Option<ClaimRow>,
}

/// A `claims` row. Serves both the catalog and the detail view's parent claim.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClaimRow {
    #[serde(default, deserialize_with = "flex::opt_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "flex::opt_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "flex::opt_text")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "flex::opt_text")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "flex::opt_text")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "flex::opt_text")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "flex::opt_text")]
    pub verdict: Option<String>,
    #[serde(default)]
    pub tags: Option<serde_json::Value>,
    #[serde(default, alias = "createdAt", deserialize_with = "flex::opt_text")]
    pub created_at: Option<String>,
}

/// A `verification_evidence` row with its documents embedded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvidenceRow {
    #[serde(default, deserialize_with = "flex::opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub stance: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
    /// A one-to-one embed arrives as an object, one-to-many as an array.
    #[serde(default, alias = "evidenceDocs", deserialize_with = "flex::one_or_many")]
    pub evidence_docs: Vec<EvidenceDocRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvidenceDocRow {
    #[serde(default, deserialize_with = "flex::opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// A `comments` row with its raw vote rows embedded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentRow {
    #[serde(default, deserialize_with = "flex::opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, alias = "userEmail")]
    pub user_email: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
    #[serde(default, alias = "commentVotes", deserialize_with = "flex::one_or_many")]
    pub comment_votes: Vec<VoteRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoteRow {
    #[serde(default, alias = "userId", deserialize_with = "flex::opt_id")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub value: Option<i64>,
}

/// Insert payload for `comments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct NewComment {
    pub verification_id: String,
    pub user_id: String,
    pub user_email: String,
    pub text: String,
}

/// Arguments of the vote procedure. `p_value = 0` clears the vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct CommentVoteArgs {
    pub p_comment_id: String,
    pub p_user_id: String,
    pub p_value: i64,
}

// ─── Verdict service ─────────────────────────────────────────────────────────

/// Request body for `POST /verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct VerifyRequest {
    pub claim_text: String,
    pub user_id: String,
}

/// Raw answer of `POST /verify`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct VerifyResponse {
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Returned by `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, alias = "supabase_connected")]
    pub store_connected: bool,
}

/// Error body shapes used by the remote services.
///
/// The verdict service answers `{ "detail": "..." }`; the data store and
/// identity provider use `message`, `msg` or `error_description`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ErrorBody {
    pub fn best_message(&self) -> Option<&str> {
        self.detail
            .as_deref()
            .or(self.message.as_deref())
            .or(self.msg.as_deref())
            .or(self.error_description.as_deref())
    }
}

// ─── Identity provider ───────────────────────────────────────────────────────

/// Body of the password grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordGrant {
    pub email: String,
    pub password: String,
}

/// Body of the refresh-token grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshGrant {
    pub refresh_token: String,
}

/// Returned by both token grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

// ─── TypeScript generation ───────────────────────────────────────────────────

#[cfg(all(test, feature = "ts"))]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use ts_rs::TS;

    /// Run with: cargo test -p satya-api --features ts -- export_typescript --nocapture
    #[test]
    fn export_typescript() {
        let out_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../frontend/lib/api-types.generated.ts");

        let cfg = ts_rs::Config::new().with_large_int("number");
        let mut parts: Vec<String> = Vec::new();
        parts.push("// AUTO-GENERATED by satya-api. DO NOT EDIT".to_string());
        parts.push(
            "// Regenerate with: cargo test -p satya-api --features ts -- export_typescript"
                .to_string(),
        );
        parts.push(String::new());

        macro_rules! collect_ts {
            ($($t:ty),+ $(,)?) => {
                $(
                    let decl = <$t>::decl(&cfg);
                    let decl = decl
                        .replacen("type ", "export interface ", 1)
                        .replace(" = {", " {")
                        .trim_end_matches(';')
                        .to_string();
                    parts.push(decl);
                    parts.push(String::new());
                )+
            };
        }

        collect_ts!(
            NewComment,
            CommentVoteArgs,
            VerifyRequest,
            VerifyResponse,
            HealthResponse,
            ErrorBody,
        );

        let content = parts.join("\n");

        if let Some(parent) = out_dir.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let mut file = std::fs::File::create(&out_dir)
            .unwrap_or_else(|e| panic!("Failed to create {}: {}", out_dir.display(), e));
        file.write_all(content.as_bytes())
            .unwrap_or_else(|e| panic!("Failed to write {}: {}", out_dir.display(), e));

        println!("Generated TypeScript types at: {}", out_dir.display());
    }
}
