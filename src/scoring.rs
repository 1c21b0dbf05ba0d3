//! Point computation for resolved tiles
//!
//! Every resolution path of the round state machine awards either the
//! percent sum of the answers revealed so far or the percent sum of all
//! answers. Awarded points are then split among the winning team's
//! current members.

use itertools::Itertools;

use crate::{bank::Answer, watcher::Id};

/// Sum of the percents of all currently revealed answers
pub fn revealed_sum(answers: &[Answer]) -> u64 {
    answers
        .iter()
        .filter(|answer| answer.revealed)
        .map(|answer| answer.percent)
        .sum()
}

/// Sum of the percents of all answers, revealed or not
///
/// This is normally 100 but is not required to be.
pub fn total_sum(answers: &[Answer]) -> u64 {
    answers.iter().map(|answer| answer.percent).sum()
}

/// Splits awarded points among the members of a team
///
/// Each member receives the floor of `points / members.len()`; the
/// remainder is dropped. A sole member receives the undivided amount and
/// an empty team receives nothing.
pub fn distribute(points: u64, members: &[Id]) -> Vec<(Id, u64)> {
    let Ok(count) = u64::try_from(members.len()) else {
        return Vec::new();
    };
    if count == 0 {
        return Vec::new();
    }
    let share = points / count;
    members.iter().map(|id| (*id, share)).collect_vec()
}
