//! Plain-text rendering of entities for the terminal.

use chrono::{DateTime, Local, Utc};
use satya_core::display::{author_label, confidence_label, truncate};
use satya_core::{Claim, Comment, Evidence, VerdictResult, VerificationDetail, VerificationSummary};

const CLAIM_WIDTH: usize = 72;

/// Output format for list commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub fn verdict_result(result: &VerdictResult) -> String {
    let mut out = format!(
        "Verdict:    {}\nConfidence: {}\n",
        result.verdict.label(),
        confidence_label(result.confidence)
    );
    if let Some(explanation) = &result.explanation {
        out.push_str(&format!("\n{explanation}\n"));
    }
    out
}

pub fn claim_line(claim: &Claim) -> String {
    let tags = if claim.tags.is_empty() {
        String::new()
    } else {
        format!("  [{}]", claim.tags.join(", "))
    };
    format!(
        "{:<11} {}{}\n            {}",
        claim.verdict.label(),
        truncate(&claim.title, CLAIM_WIDTH),
        tags,
        truncate(&claim.summary, CLAIM_WIDTH)
    )
}

pub fn summary_line(item: &VerificationSummary) -> String {
    format!(
        "{}  {:<9} {}  {}",
        timestamp(item.created_at),
        item.status.label(),
        item.id,
        truncate(&item.claim_text, CLAIM_WIDTH)
    )
}

fn evidence_block(item: &Evidence) -> String {
    let mut out = format!("  [{}] {}\n", item.stance.label(), item.rationale);
    for doc in &item.documents {
        let host = doc.host().unwrap_or_else(|| doc.url.clone());
        out.push_str(&format!("      - {} ({host})\n", doc.title));
        if !doc.snippet.is_empty() {
            out.push_str(&format!("        {}\n", truncate(&doc.snippet, CLAIM_WIDTH)));
        }
    }
    out
}

pub fn comment_line(comment: &Comment) -> String {
    let mine = match comment.user_vote.as_i64() {
        1 => " (you: up)",
        -1 => " (you: down)",
        _ => "",
    };
    format!(
        "  {:+} {}{}  {} · {}\n      {}",
        comment.vote_count,
        comment.id,
        mine,
        author_label(comment.author_email.as_deref()),
        timestamp(comment.created_at),
        comment.text
    )
}

pub fn detail(view: &VerificationDetail) -> String {
    let v = &view.verification;
    let mut out = format!(
        "Claim:      {}\nStatus:     {}\nVerdict:    {}\nConfidence: {}\nChecked:    {}\n",
        view.claim.text,
        v.status.label(),
        v.verdict.map_or("-", |verdict| verdict.label()),
        confidence_label(v.confidence),
        timestamp(v.created_at),
    );
    if let Some(source) = &view.claim.source {
        out.push_str(&format!("Source:     {source}\n"));
    }
    if let Some(explanation) = &v.explanation {
        out.push_str(&format!("\n{explanation}\n"));
    }

    out.push_str(&format!("\nEvidence ({})\n", view.evidence.len()));
    if view.evidence.is_empty() {
        out.push_str("  No evidence recorded.\n");
    }
    for item in &view.evidence {
        out.push_str(&evidence_block(item));
    }

    out.push_str(&format!("\nComments ({})\n", view.comments.len()));
    if view.comments.is_empty() {
        out.push_str("  No comments yet.\n");
    }
    for comment in &view.comments {
        out.push_str(&comment_line(comment));
        out.push('\n');
    }
    out
}
