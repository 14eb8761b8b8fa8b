//! Claims catalog: the fixed fallback set and the search/verdict filter.

use chrono::{DateTime, Duration, Utc};

use crate::model::{Claim, Verdict};

/// Claims shown when the catalog endpoint returns nothing usable, so the
/// catalog view is never empty.
pub fn fallback_claims(now: DateTime<Utc>) -> Vec<Claim> {
    vec![
        Claim {
            id: "550e8400-e29b-41d4-a716-446655440000".to_string(),
            title: "Vaccines cause autism".to_string(),
            summary: "Multiple studies have shown no link between vaccines and autism.".to_string(),
            verdict: Verdict::False,
            tags: tags(&["health", "vaccines", "myth"]),
            created_at: now - Duration::days(5),
        },
        Claim {
            id: "550e8400-e29b-41d4-a716-446655440001".to_string(),
            title: "Climate change is a hoax".to_string(),
            summary: "Over 97% of climate scientists agree that climate change is real and caused by human activity.".to_string(),
            verdict: Verdict::False,
            tags: tags(&["environment", "science", "politics"]),
            created_at: now - Duration::days(3),
        },
        Claim {
            id: "550e8400-e29b-41d4-a716-446655440002".to_string(),
            title: "Drinking 8 glasses of water daily is necessary".to_string(),
            summary: "Water needs vary by individual, and the 8-glass rule is not based on scientific evidence.".to_string(),
            verdict: Verdict::Misleading,
            tags: tags(&["health", "nutrition", "myth"]),
            created_at: now,
        },
    ]
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Verdict facet of the catalog filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerdictFilter {
    #[default]
    All,
    Only(Verdict),
}

impl VerdictFilter {
    pub fn matches(&self, verdict: Verdict) -> bool {
        match self {
            Self::All => true,
            Self::Only(v) => *v == verdict,
        }
    }
}

impl std::str::FromStr for VerdictFilter {
    type Err = crate::model::ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

/// Case-insensitive substring match over title, summary and tags,
/// intersected with the verdict facet.
pub fn filter_claims<'a>(claims: &'a [Claim], query: &str, verdict: VerdictFilter) -> Vec<&'a Claim> {
    let needle = query.trim().to_lowercase();
    claims
        .iter()
        .filter(|c| verdict.matches(c.verdict))
        .filter(|c| {
            needle.is_empty()
                || c.title.to_lowercase().contains(&needle)
                || c.summary.to_lowercase().contains(&needle)
                || c.tags.iter().any(|t| t.to_lowercase().contains(&needle))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_never_empty() {
        let claims = fallback_claims(Utc::now());
        assert_eq!(claims.len(), 3);
        assert!(claims.iter().all(|c| !c.title.is_empty()));
    }

    #[test]
    fn filter_by_query_and_verdict() {
        let claims = fallback_claims(Utc::now());

        let health = filter_claims(&claims, "HEALTH", VerdictFilter::All);
        assert_eq!(health.len(), 2);

        let misleading = filter_claims(&claims, "", VerdictFilter::Only(Verdict::Misleading));
        assert_eq!(misleading.len(), 1);
        assert_eq!(misleading[0].title, "Drinking 8 glasses of water daily is necessary");

        let none = filter_claims(&claims, "climate", VerdictFilter::Only(Verdict::True));
        assert!(none.is_empty());
    }

    #[test]
    fn verdict_filter_parses() {
        assert_eq!("all".parse::<VerdictFilter>().unwrap(), VerdictFilter::All);
        assert_eq!(
            "False".parse::<VerdictFilter>().unwrap(),
            VerdictFilter::Only(Verdict::False)
        );
        assert!("maybe".parse::<VerdictFilter>().is_err());
    }
}
