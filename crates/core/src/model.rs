//! Strongly-shaped entities held by the client.
//!
//! Remote rows are loosely typed; `satya-api` normalizes them into these
//! types once per fetch. Nothing downstream of the boundary deals with
//! missing or differently-cased fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModelError {
    #[error("invalid vote value: {0} (expected -1, 0 or 1)")]
    InvalidVote(i64),
    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// The authenticated identity as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub issued_at: DateTime<Utc>,
}

/// Identity-provider notification kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

impl AuthEventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::SignedIn => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
        }
    }
}

impl std::fmt::Display for AuthEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One delivery from the identity provider's event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn signed_in(session: Session) -> Self {
        Self {
            kind: AuthEventKind::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            kind: AuthEventKind::SignedOut,
            session: None,
        }
    }

    pub fn token_refreshed(session: Session) -> Self {
        Self {
            kind: AuthEventKind::TokenRefreshed,
            session: Some(session),
        }
    }
}

// ─── Enums ───────────────────────────────────────────────────────────────────

/// Lifecycle status of a verification record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    Disputed,
    Outdated,
    #[default]
    Pending,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Verified => "verified",
            Self::Disputed => "disputed",
            Self::Outdated => "outdated",
            Self::Pending => "pending",
        }
    }

    /// Lenient parse: unknown or missing text falls back to `Pending`.
    pub fn parse_lossy(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or_default()
    }
}

impl std::str::FromStr for VerificationStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verified" => Ok(Self::Verified),
            "disputed" => Ok(Self::Disputed),
            "outdated" => Ok(Self::Outdated),
            "pending" => Ok(Self::Pending),
            _ => Err(ModelError::UnknownVariant {
                kind: "status",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical outcome of a claim check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    True,
    False,
    Misleading,
    #[default]
    Pending,
}

impl Verdict {
    pub fn as_str(&self) -> &str {
        match self {
            Self::True => "true",
            Self::False => "false",
            Self::Misleading => "misleading",
            Self::Pending => "pending",
        }
    }

    pub fn parse_lossy(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or_default()
    }
}

impl std::str::FromStr for Verdict {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Self::True),
            "false" => Ok(Self::False),
            "misleading" => Ok(Self::Misleading),
            "pending" => Ok(Self::Pending),
            _ => Err(ModelError::UnknownVariant {
                kind: "verdict",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relation of an evidence item to the claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Supports,
    Refutes,
    #[default]
    Neutral,
}

impl Stance {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Supports => "supports",
            Self::Refutes => "refutes",
            Self::Neutral => "neutral",
        }
    }

    pub fn parse_lossy(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or_default()
    }
}

impl std::str::FromStr for Stance {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supports" => Ok(Self::Supports),
            "refutes" => Ok(Self::Refutes),
            "neutral" => Ok(Self::Neutral),
            _ => Err(ModelError::UnknownVariant {
                kind: "stance",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Stance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single user's vote on a comment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum VoteValue {
    Down,
    #[default]
    Neutral,
    Up,
}

impl VoteValue {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Down => -1,
            Self::Neutral => 0,
            Self::Up => 1,
        }
    }
}

impl TryFrom<i64> for VoteValue {
    type Error = ModelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Down),
            0 => Ok(Self::Neutral),
            1 => Ok(Self::Up),
            other => Err(ModelError::InvalidVote(other)),
        }
    }
}

impl From<VoteValue> for i64 {
    fn from(value: VoteValue) -> Self {
        value.as_i64()
    }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// One row of a user's verification history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub id: String,
    pub status: VerificationStatus,
    pub claim_text: String,
    pub explanation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub claim_id: Option<String>,
}

/// A full verification record, as shown on the detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub id: String,
    pub claim_id: String,
    pub status: VerificationStatus,
    pub verdict: Option<Verdict>,
    pub confidence: Option<f64>,
    pub explanation: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The claim a verification was run against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentClaim {
    pub id: String,
    pub text: String,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceDoc {
    pub id: String,
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub source: Option<String>,
}

impl EvidenceDoc {
    /// Hostname of the source without a leading `www.`.
    pub fn host(&self) -> Option<String> {
        let raw = self.source.as_deref().unwrap_or(&self.url);
        let parsed = url::Url::parse(raw).ok()?;
        let host = parsed.host_str()?;
        Some(host.strip_prefix("www.").unwrap_or(host).to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: String,
    pub stance: Stance,
    pub rationale: String,
    pub documents: Vec<EvidenceDoc>,
}

/// A raw vote row as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVote {
    pub user_id: String,
    pub value: VoteValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub author_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub vote_count: i64,
    pub user_vote: VoteValue,
}

/// A comment with its raw vote rows, before per-user derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    pub text: String,
    pub author_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub votes: Vec<CastVote>,
}

impl CommentRecord {
    /// Derive the tally as seen by `current_user` (anonymous when `None`).
    pub fn derive(self, current_user: Option<&str>) -> Comment {
        let tally = crate::vote::tally(&self.votes, current_user.filter(|u| !u.is_empty()));
        Comment {
            id: self.id,
            text: self.text,
            author_email: self.author_email,
            created_at: self.created_at,
            vote_count: tally.count,
            user_vote: tally.user_vote,
        }
    }
}

/// Composed detail view. Built fresh per view, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationDetail {
    pub verification: Verification,
    pub claim: ParentClaim,
    pub evidence: Vec<Evidence>,
    pub comments: Vec<Comment>,
}

/// Catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub verdict: Verdict,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Normalized answer from the verdict service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictResult {
    pub verdict: Verdict,
    pub confidence: Option<f64>,
    pub explanation: Option<String>,
}
