use crate::model::{
    CastVote, Comment, Evidence, EvidenceDoc, ParentClaim, Session, Stance, Verification,
    VerificationStatus, VerificationSummary, VoteValue,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Fixed reference instant so ordering assertions are stable.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
}

/// Session for `user_id` with a derived email.
pub fn session(user_id: &str) -> Session {
    Session {
        user_id: user_id.to_string(),
        email: format!("{user_id}@example.test"),
        issued_at: epoch(),
    }
}

/// History row created `minutes` after [`epoch`].
pub fn summary(id: &str, minutes: i64) -> VerificationSummary {
    VerificationSummary {
        id: id.to_string(),
        status: VerificationStatus::Verified,
        claim_text: format!("claim {id}"),
        explanation: None,
        created_at: epoch() + Duration::minutes(minutes),
        claim_id: Some(format!("claim-{id}")),
    }
}

pub fn verification(id: &str, claim_id: &str) -> Verification {
    Verification {
        id: id.to_string(),
        claim_id: claim_id.to_string(),
        status: VerificationStatus::Verified,
        verdict: None,
        confidence: None,
        explanation: Some("fixture".to_string()),
        created_at: epoch(),
    }
}

pub fn parent_claim(id: &str) -> ParentClaim {
    ParentClaim {
        id: id.to_string(),
        text: format!("text of {id}"),
        source: None,
    }
}

pub fn evidence(id: &str, stance: Stance) -> Evidence {
    Evidence {
        id: id.to_string(),
        stance,
        rationale: format!("rationale {id}"),
        documents: vec![EvidenceDoc {
            id: format!("doc-{}", next_id()),
            url: "https://example.org/source".to_string(),
            title: "Source".to_string(),
            snippet: String::new(),
            source: None,
        }],
    }
}

/// Comment created `minutes` after [`epoch`] with the given tally.
pub fn comment(id: &str, minutes: i64, vote_count: i64, user_vote: VoteValue) -> Comment {
    Comment {
        id: id.to_string(),
        text: format!("comment {id}"),
        author_email: Some("author@example.test".to_string()),
        created_at: epoch() + Duration::minutes(minutes),
        vote_count,
        user_vote,
    }
}

pub fn cast(user_id: &str, value: VoteValue) -> CastVote {
    CastVote {
        user_id: user_id.to_string(),
        value,
    }
}

fn next_id() -> u32 {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}
