//! Boundary normalization: raw rows → `satya-core` entities.
//!
//! Runs once per fetch. Every optional field has a defined default here so
//! display and state code never sees a missing value. A row without an id
//! cannot be merged by identity and is rejected.

use chrono::{DateTime, NaiveDateTime, Utc};
use satya_core::{
    CastVote, Claim, Comment, CommentRecord, Evidence, EvidenceDoc, ParentClaim, Stance, Verdict,
    VerdictResult, Verification, VerificationStatus, VerificationSummary, VoteValue,
};
use thiserror::Error;

use crate::{ClaimRow, CommentRow, EvidenceDocRow, EvidenceRow, VerificationRow, VerifyResponse};

pub const NO_TITLE: &str = "No title";
pub const NO_CLAIM_TEXT: &str = "No claim text available";
pub const UNTITLED_CLAIM: &str = "Untitled Claim";
pub const NO_SUMMARY: &str = "No summary available";
pub const UNTITLED_DOCUMENT: &str = "Untitled Document";

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum NormalizeError {
    #[error("{entity} row is missing `{field}`")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },
}

fn require(value: Option<String>, entity: &'static str, field: &'static str) -> Result<String, NormalizeError> {
    value.ok_or(NormalizeError::MissingField { entity, field })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Parse RFC 3339 or a bare `YYYY-MM-DDTHH:MM:SS[.f]` (taken as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Missing or unparsable timestamps sort as the oldest possible record.
fn timestamp_or_epoch(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(parse_timestamp)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

// ─── History ─────────────────────────────────────────────────────────────────

pub fn verification_summary(row: VerificationRow) -> Result<VerificationSummary, NormalizeError> {
    let id = require(row.id, "verification", "id")?;
    let (claim_text, claim_id) = match row.claim {
        Some(claim) => {
            let text = non_blank(claim.title)
                .or_else(|| non_blank(claim.content))
                .or_else(|| non_blank(claim.text))
                .unwrap_or_else(|| NO_TITLE.to_string());
            (text, claim.id.or(row.claim_id))
        }
        None => (NO_TITLE.to_string(), row.claim_id),
    };
    Ok(VerificationSummary {
        id,
        status: VerificationStatus::parse_lossy(row.status.as_deref()),
        claim_text,
        explanation: non_blank(row.explanation),
        created_at: timestamp_or_epoch(row.created_at.as_deref()),
        claim_id,
    })
}

/// All-or-nothing: one garbled row rejects the whole batch.
pub fn verification_summaries(
    rows: Vec<VerificationRow>,
) -> Result<Vec<VerificationSummary>, NormalizeError> {
    rows.into_iter().map(verification_summary).collect()
}

// ─── Detail ──────────────────────────────────────────────────────────────────

pub fn verification(row: VerificationRow) -> Result<Verification, NormalizeError> {
    let id = require(row.id, "verification", "id")?;
    let claim_id = require(
        row.claim_id.or_else(|| row.claim.and_then(|c| c.id)),
        "verification",
        "claim_id",
    )?;
    Ok(Verification {
        id,
        claim_id,
        status: VerificationStatus::parse_lossy(row.status.as_deref()),
        verdict: row.verdict.as_deref().map(|v| Verdict::parse_lossy(Some(v))),
        confidence: row.confidence.and_then(clamp_confidence),
        explanation: non_blank(row.explanation),
        created_at: timestamp_or_epoch(row.created_at.as_deref()),
    })
}

pub fn parent_claim(row: ClaimRow) -> Result<ParentClaim, NormalizeError> {
    let id = require(row.id, "claim", "id")?;
    let text = non_blank(row.text)
        .or_else(|| non_blank(row.content))
        .or_else(|| non_blank(row.title))
        .unwrap_or_else(|| NO_CLAIM_TEXT.to_string());
    Ok(ParentClaim {
        id,
        text,
        source: non_blank(row.source),
    })
}

fn evidence_doc(row: EvidenceDocRow, index: usize) -> EvidenceDoc {
    EvidenceDoc {
        id: row.id.unwrap_or_else(|| format!("doc-{index}")),
        url: row.url.unwrap_or_default(),
        title: non_blank(row.title).unwrap_or_else(|| UNTITLED_DOCUMENT.to_string()),
        snippet: row.snippet.unwrap_or_default(),
        source: non_blank(row.source),
    }
}

pub fn evidence(row: EvidenceRow) -> Result<Evidence, NormalizeError> {
    let id = require(row.id, "evidence", "id")?;
    Ok(Evidence {
        id,
        stance: Stance::parse_lossy(row.stance.as_deref()),
        rationale: row.rationale.unwrap_or_default(),
        documents: row
            .evidence_docs
            .into_iter()
            .enumerate()
            .map(|(i, doc)| evidence_doc(doc, i))
            .collect(),
    })
}

/// Derive `vote_count` and `user_vote` from the embedded vote rows.
///
/// Out-of-range stored values count by their sign; rows without a user id
/// still count toward the total.
pub fn comment(row: CommentRow, current_user: Option<&str>) -> Result<Comment, NormalizeError> {
    comment_record(row).map(|record| record.derive(current_user))
}

/// A comment row with its vote rows kept raw, for callers that derive the
/// tally themselves.
pub fn comment_record(row: CommentRow) -> Result<CommentRecord, NormalizeError> {
    let id = require(row.id, "comment", "id")?;
    let votes = row
        .comment_votes
        .into_iter()
        .map(|v| CastVote {
            user_id: v.user_id.unwrap_or_default(),
            value: VoteValue::try_from(v.value.unwrap_or(0).signum()).unwrap_or_default(),
        })
        .collect();
    Ok(CommentRecord {
        id,
        text: row.text.unwrap_or_default(),
        author_email: non_blank(row.user_email),
        created_at: timestamp_or_epoch(row.created_at.as_deref()),
        votes,
    })
}

pub fn comment_records(rows: Vec<CommentRow>) -> Result<Vec<CommentRecord>, NormalizeError> {
    rows.into_iter().map(comment_record).collect()
}

/// Comments newest first, as the detail view shows them at load time.
pub fn comments(
    rows: Vec<CommentRow>,
    current_user: Option<&str>,
) -> Result<Vec<Comment>, NormalizeError> {
    let mut out = rows
        .into_iter()
        .map(|row| comment(row, current_user))
        .collect::<Result<Vec<_>, _>>()?;
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(out)
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

fn tags(value: Option<serde_json::Value>) -> Vec<String> {
    match value {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Catalog entries never fail: an id-less row gets a positional id and a
/// missing timestamp becomes `now`.
pub fn catalog_claim(row: ClaimRow, index: usize, now: DateTime<Utc>) -> Claim {
    Claim {
        id: row.id.unwrap_or_else(|| format!("local-{index}")),
        title: non_blank(row.title).unwrap_or_else(|| UNTITLED_CLAIM.to_string()),
        summary: non_blank(row.summary).unwrap_or_else(|| NO_SUMMARY.to_string()),
        verdict: Verdict::parse_lossy(row.verdict.as_deref()),
        tags: tags(row.tags),
        created_at: row
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(now),
    }
}

// ─── Verdict service ─────────────────────────────────────────────────────────

fn clamp_confidence(c: f64) -> Option<f64> {
    if c.is_finite() {
        Some(c.clamp(0.0, 1.0))
    } else {
        None
    }
}

pub fn verdict_result(resp: VerifyResponse) -> VerdictResult {
    VerdictResult {
        verdict: Verdict::parse_lossy(resp.verdict.as_deref()),
        confidence: resp.confidence.and_then(clamp_confidence),
        explanation: non_blank(resp.explanation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn summary_prefers_title_then_content() {
        let s = verification_summary(row(json!({
            "id": "v1",
            "status": "DISPUTED",
            "created_at": "2025-02-01T10:00:00+00:00",
            "claim": {"id": "c1", "content": "body only"}
        })))
        .unwrap();
        assert_eq!(s.claim_text, "body only");
        assert_eq!(s.status, VerificationStatus::Disputed);
        assert_eq!(s.claim_id.as_deref(), Some("c1"));

        let untitled = verification_summary(row(json!({"id": "v2"}))).unwrap();
        assert_eq!(untitled.claim_text, NO_TITLE);
        assert_eq!(untitled.status, VerificationStatus::Pending);
        assert_eq!(untitled.created_at, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn batch_rejects_rows_without_id() {
        let rows = vec![row(json!({"id": "a"})), row(json!({"status": "verified"}))];
        assert_eq!(
            verification_summaries(rows),
            Err(NormalizeError::MissingField {
                entity: "verification",
                field: "id"
            })
        );
    }

    #[test]
    fn comment_votes_are_derived() {
        let c = comment(
            row(json!({
                "id": "c1",
                "text": "good point",
                "comment_votes": [
                    {"user_id": "u1", "value": 1},
                    {"user_id": "u2", "value": 1},
                    {"user_id": "me", "value": -1},
                    {"user_id": "u3", "value": null}
                ]
            })),
            Some("me"),
        )
        .unwrap();
        assert_eq!(c.vote_count, 1);
        assert_eq!(c.user_vote, VoteValue::Down);

        let anonymous = comment(row(json!({"id": "c2", "comment_votes": [{"user_id": "", "value": 1}]})), None).unwrap();
        assert_eq!(anonymous.vote_count, 1);
        assert_eq!(anonymous.user_vote, VoteValue::Neutral);
    }

    #[test]
    fn comments_sorted_newest_first() {
        let rows = vec![
            row(json!({"id": "old", "created_at": "2025-01-01T00:00:00Z"})),
            row(json!({"id": "new", "created_at": "2025-03-01T00:00:00Z"})),
            row(json!({"id": "mid", "created_at": "2025-02-01 00:00:00"})),
        ];
        let ids: Vec<String> = comments(rows, None).unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, ["new", "mid", "old"]);
    }

    #[test]
    fn catalog_defaults() {
        let now = satya_core::testing::epoch();
        let claim = catalog_claim(
            row(json!({"verdict": "TRUE", "tags": ["a", 3, "", "b"]})),
            7,
            now,
        );
        assert_eq!(claim.id, "local-7");
        assert_eq!(claim.title, UNTITLED_CLAIM);
        assert_eq!(claim.summary, NO_SUMMARY);
        assert_eq!(claim.verdict, Verdict::True);
        assert_eq!(claim.tags, ["a", "b"]);
        assert_eq!(claim.created_at, now);
    }

    #[test]
    fn verification_takes_claim_id_from_embed() {
        let v = verification(row(json!({"id": 9, "claim": {"id": 3}, "confidence": 1.7}))).unwrap();
        assert_eq!(v.id, "9");
        assert_eq!(v.claim_id, "3");
        assert_eq!(v.confidence, Some(1.0));

        let missing = verification(row(json!({"id": "v"})));
        assert!(missing.is_err());
    }

    #[test]
    fn parent_claim_text_fallbacks() {
        let c = parent_claim(row(json!({"id": "c", "title": "T"}))).unwrap();
        assert_eq!(c.text, "T");
        let empty = parent_claim(row(json!({"id": "c"}))).unwrap();
        assert_eq!(empty.text, NO_CLAIM_TEXT);
    }

    #[test]
    fn verdict_result_normalizes() {
        let r = verdict_result(VerifyResponse {
            verdict: Some("Misleading".into()),
            confidence: Some(f64::NAN),
            explanation: Some("  ".into()),
        });
        assert_eq!(r.verdict, Verdict::Misleading);
        assert_eq!(r.confidence, None);
        assert_eq!(r.explanation, None);
    }
}
