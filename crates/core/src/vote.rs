//! Pure vote arithmetic shared by the detail view and the vote coordinator.

use crate::model::{CastVote, VoteValue};

/// Aggregate of a comment's raw vote rows from one user's point of view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub count: i64,
    pub user_vote: VoteValue,
}

impl VoteTally {
    pub fn new(count: i64, user_vote: VoteValue) -> Self {
        Self { count, user_vote }
    }

    /// Move this user's vote to `to`, adjusting the count by the delta.
    pub fn with_vote(self, to: VoteValue) -> Self {
        Self {
            count: self.count + delta(self.user_vote, to),
            user_vote: to,
        }
    }
}

/// `count` is the sum of every row; `user_vote` is the value of the row
/// belonging to `user_id`, or neutral when absent or anonymous.
pub fn tally(votes: &[CastVote], user_id: Option<&str>) -> VoteTally {
    let count = votes.iter().map(|v| v.value.as_i64()).sum();
    let user_vote = user_id
        .and_then(|uid| votes.iter().find(|v| v.user_id == uid))
        .map(|v| v.value)
        .unwrap_or_default();
    VoteTally { count, user_vote }
}

/// Clicking the already-selected value cancels it; anything else replaces it.
pub fn effective_vote(current: VoteValue, requested: VoteValue) -> VoteValue {
    if requested == current {
        VoteValue::Neutral
    } else {
        requested
    }
}

pub fn delta(from: VoteValue, to: VoteValue) -> i64 {
    to.as_i64() - from.as_i64()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(user: &str, value: VoteValue) -> CastVote {
        CastVote {
            user_id: user.to_string(),
            value,
        }
    }

    #[test]
    fn tally_sums_and_finds_own_vote() {
        let votes = vec![
            vote("a", VoteValue::Up),
            vote("b", VoteValue::Up),
            vote("c", VoteValue::Down),
        ];
        assert_eq!(tally(&votes, Some("c")), VoteTally::new(1, VoteValue::Down));
        assert_eq!(tally(&votes, Some("zz")), VoteTally::new(1, VoteValue::Neutral));
        assert_eq!(tally(&votes, None), VoteTally::new(1, VoteValue::Neutral));
        assert_eq!(tally(&[], Some("a")), VoteTally::default());
    }

    #[test]
    fn toggle_cancels_same_value() {
        assert_eq!(effective_vote(VoteValue::Up, VoteValue::Up), VoteValue::Neutral);
        assert_eq!(effective_vote(VoteValue::Down, VoteValue::Up), VoteValue::Up);
        assert_eq!(effective_vote(VoteValue::Neutral, VoteValue::Down), VoteValue::Down);
    }

    #[test]
    fn double_up_vote_returns_to_start() {
        let start = VoteTally::new(4, VoteValue::Neutral);
        let once = start.with_vote(effective_vote(start.user_vote, VoteValue::Up));
        assert_eq!(once, VoteTally::new(5, VoteValue::Up));
        let twice = once.with_vote(effective_vote(once.user_vote, VoteValue::Up));
        assert_eq!(twice, start);
    }

    #[test]
    fn switching_sides_moves_by_two() {
        let start = VoteTally::new(0, VoteValue::Up);
        assert_eq!(start.with_vote(VoteValue::Down), VoteTally::new(-2, VoteValue::Down));
    }
}
