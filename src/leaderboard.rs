//! Cumulative player scores
//!
//! This module keeps every player's running score across all tiles of a
//! game and provides the descending standings shown to participants.

use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::watcher::Id;

/// Score information for a single player
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct ScoreMessage {
    /// Total points earned by the player
    pub points: u64,
    /// Current position in the standings (0-indexed)
    pub position: usize,
}

/// Manages the scores of all players of a game session
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
    /// Total score of each player that was ever credited
    scores: HashMap<Id, u64>,
}

impl Leaderboard {
    /// Credits each `(player, points)` pair
    ///
    /// # Returns
    ///
    /// The new total of every credited player, in input order
    pub fn add_scores(&mut self, scores: &[(Id, u64)]) -> Vec<(Id, u64)> {
        scores
            .iter()
            .map(|(id, points)| {
                let total = self.scores.entry(*id).or_default();
                *total = total.saturating_add(*points);
                (*id, *total)
            })
            .collect_vec()
    }

    /// Applies a signed administrative adjustment to a player's score
    ///
    /// Scores never drop below zero; a deduction larger than the current
    /// score leaves the player at zero.
    ///
    /// # Returns
    ///
    /// The player's new total
    pub fn adjust(&mut self, id: Id, delta: i64) -> u64 {
        let total = self.scores.entry(id).or_default();
        *total = total.saturating_add_signed(delta);
        *total
    }

    /// Gets the current total of a player, zero if they never scored
    pub fn points(&self, id: Id) -> u64 {
        self.scores.get(&id).copied().unwrap_or_default()
    }

    /// Returns all scores sorted in descending order
    ///
    /// Ties are ordered by player ID so the standings are stable.
    pub fn scores_descending(&self) -> Vec<(Id, u64)> {
        self.scores
            .iter()
            .map(|(id, points)| (*id, *points))
            .sorted_by(|(id_a, a), (id_b, b)| b.cmp(a).then(id_a.cmp(id_b)))
            .collect_vec()
    }

    /// Gets the score and standing of a player
    pub fn score(&self, id: Id) -> Option<ScoreMessage> {
        self.scores_descending()
            .into_iter()
            .position(|(other, _)| other == id)
            .map(|position| ScoreMessage {
                points: self.points(id),
                position,
            })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_add_scores_accumulates() {
        let mut leaderboard = Leaderboard::default();
        let p = Id::new();

        assert_eq!(leaderboard.add_scores(&[(p, 30)]), vec![(p, 30)]);
        assert_eq!(leaderboard.add_scores(&[(p, 35)]), vec![(p, 65)]);
        assert_eq!(leaderboard.points(p), 65);
    }

    #[test]
    fn test_adjust_saturates_at_zero() {
        let mut leaderboard = Leaderboard::default();
        let p = Id::new();

        assert_eq!(leaderboard.adjust(p, 20), 20);
        assert_eq!(leaderboard.adjust(p, -5), 15);
        assert_eq!(leaderboard.adjust(p, -100), 0);
    }

    #[test]
    fn test_unknown_player_has_no_score() {
        let leaderboard = Leaderboard::default();
        let p = Id::new();

        assert_eq!(leaderboard.points(p), 0);
        assert_eq!(leaderboard.score(p), None);
    }

    #[test]
    fn test_standings() {
        let mut leaderboard = Leaderboard::default();
        let p1 = Id::new();
        let p2 = Id::new();
        let p3 = Id::new();

        leaderboard.add_scores(&[(p1, 10), (p2, 50), (p3, 30)]);

        let standings = leaderboard.scores_descending();
        assert_eq!(standings, vec![(p2, 50), (p3, 30), (p1, 10)]);

        assert_eq!(
            leaderboard.score(p3),
            Some(ScoreMessage {
                points: 30,
                position: 1
            })
        );
    }
}
