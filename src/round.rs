//! Round state machine of a single tile
//!
//! A tile goes through `Closed → Main → Steal → Resolved`. The team that
//! opens it guesses first; three wrong guesses hand a single steal attempt
//! to the opposing team. Every operation returns a [`Step`] describing the
//! announcements to publish, what to do with the countdown and, when the
//! tile resolves, who won how many points. Operations that are not valid
//! for the current phase or actor return an empty step and change nothing.

use enum_map::EnumMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::{
    bank::{Answer, TileId, clean_answer},
    constants::round::{MAX_WRONG, PREPARE_AT},
    scoring,
    teams::Team,
    timer::TimerPhase,
};

/// Phase of a tile, derived from its flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Never opened
    Closed,
    /// The opening team is guessing
    Main,
    /// The opposing team has its single steal attempt
    Steal,
    /// Terminal; nothing on the tile changes anymore
    Resolved,
}

/// Why a tile was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    /// The opening team found every answer
    AllFound,
    /// The moderator revealed the last hidden answer
    AdminFullReveal,
    /// The stealing team named a hidden answer
    StealSuccess,
    /// The stealing team missed, timed out or was marked wrong
    StealFailed,
    /// The moderator closed the tile
    ForceClose,
}

/// Outcome of a resolved tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Team credited with the points
    pub winner: Team,
    /// Why the tile resolved
    pub reason: Reason,
    /// Points awarded to the winner
    pub points: u64,
}

/// Per-tile bookkeeping, initialized fresh whenever the tile is opened
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundMeta {
    /// Team that opened the tile
    pub original_team: Option<Team>,
    /// Team currently privileged to guess
    pub turn_team: Option<Team>,
    /// Wrong guesses of each team, saturating at three
    pub wrong: EnumMap<Team, u8>,
    /// Whether the steal phase is running
    pub steal_active: bool,
    /// Team holding the steal attempt
    pub steal_team: Option<Team>,
    /// Whether the steal attempt has been spent
    pub steal_used: bool,
}

/// Tile-level messages published to participants
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum UpdateMessage {
    /// A tile was opened and its question shown
    TileOpened {
        /// Address of the tile
        tile: TileId,
        /// The survey question
        question: String,
        /// Display label of the tile
        label: String,
        /// Team that opened the tile
        team: Team,
    },
    /// An answer became visible
    AnswerRevealed {
        /// Address of the tile
        tile: TileId,
        /// Position of the answer on the tile
        index: usize,
        /// Canonical answer text
        text: String,
        /// Survey percent of the answer
        percent: u64,
        /// Team credited with the answer; absent for display-only reveals
        team: Option<Team>,
    },
    /// A team guessed wrong
    WrongRecorded {
        /// Address of the tile
        tile: TileId,
        /// Team that guessed wrong
        team: Team,
        /// The team's wrong guesses on this tile so far
        count: u8,
    },
    /// (TEAM ONLY): the other team is close to losing the tile, start conferring
    Prepare {
        /// Address of the tile
        tile: TileId,
    },
    /// The phase of the open tile changed
    PhaseChanged {
        /// Address of the tile
        tile: TileId,
        /// New phase
        phase: TimerPhase,
        /// Team acting in the new phase
        owner: Team,
    },
    /// The tile was resolved
    TileResolved {
        /// Address of the tile
        tile: TileId,
        /// Team credited with the points
        winner: Team,
        /// Why the tile resolved
        reason: Reason,
        /// Points awarded
        points: u64,
    },
}

/// Audience of a tile message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    /// Every participant
    Everyone(UpdateMessage),
    /// Only the players of one team
    Team(Team, UpdateMessage),
}

/// What the countdown should do after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Restart it with its full duration for the same phase and owner
    Reset,
    /// Replace it with a fresh countdown
    Arm(TimerPhase, Team),
    /// Drop it
    Retire,
}

/// Result of applying one operation to a tile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    /// Messages to publish, in order
    pub announcements: Vec<Announcement>,
    /// Countdown directive; the countdown is left alone when absent
    pub timer: Option<TimerAction>,
    /// Set when the operation resolved the tile
    pub resolution: Option<Resolution>,
}

impl Step {
    /// Whether the operation was rejected and nothing changed
    pub fn is_ignored(&self) -> bool {
        self.announcements.is_empty()
    }
}

/// A question on the board together with its round state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    question: String,
    label: String,
    points: u64,
    answers: Vec<Answer>,
    /// Whether the question has been shown
    revealed: bool,
    /// Whether the tile is resolved
    answered: bool,
    meta: RoundMeta,
}

/// What a participant may see of an answer
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AnswerView {
    /// Answer text, hidden until revealed
    pub text: Option<String>,
    /// Survey percent, hidden until revealed
    pub percent: Option<u64>,
    /// Whether the answer is revealed
    pub revealed: bool,
    /// Team credited with the answer
    pub team: Option<Team>,
}

/// What a participant may see of a tile
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TileView {
    /// Question text, hidden until the tile is opened
    pub question: Option<String>,
    /// Display label
    pub label: String,
    /// Board value shown on the tile face
    pub points: u64,
    /// Current phase
    pub phase: Phase,
    /// Answers in board order
    pub answers: Vec<AnswerView>,
    /// Round bookkeeping, hosts only
    pub meta: Option<RoundMeta>,
}

impl Tile {
    /// Creates a closed tile from answers already in board order
    pub fn new(question: String, label: String, points: u64, answers: Vec<Answer>) -> Self {
        Self {
            question,
            label,
            points,
            answers,
            revealed: false,
            answered: false,
            meta: RoundMeta::default(),
        }
    }

    /// The survey question
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Display label of the tile
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Board value shown on the tile face
    pub fn points(&self) -> u64 {
        self.points
    }

    /// Answers in board order
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    /// Round bookkeeping
    pub fn meta(&self) -> &RoundMeta {
        &self.meta
    }

    /// Whether the question has been shown
    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Whether the tile is resolved
    pub fn is_answered(&self) -> bool {
        self.answered
    }

    /// Current phase of the tile
    pub fn phase(&self) -> Phase {
        if self.answered {
            Phase::Resolved
        } else if !self.revealed {
            Phase::Closed
        } else if self.meta.steal_active {
            Phase::Steal
        } else {
            Phase::Main
        }
    }

    /// Team allowed to act in the current phase
    pub fn phase_holder(&self) -> Option<Team> {
        match self.phase() {
            Phase::Main => self.meta.turn_team,
            Phase::Steal => self.meta.steal_team,
            Phase::Closed | Phase::Resolved => None,
        }
    }

    /// Percent sum of the answers revealed so far
    pub fn revealed_sum(&self) -> u64 {
        scoring::revealed_sum(&self.answers)
    }

    /// Percent sum of all answers
    pub fn total_sum(&self) -> u64 {
        scoring::total_sum(&self.answers)
    }

    /// Builds the participant view of this tile
    ///
    /// Hosts see every answer and the round bookkeeping; players only see
    /// what has been revealed.
    pub fn view(&self, host: bool) -> TileView {
        TileView {
            question: (host || self.revealed).then(|| self.question.clone()),
            label: self.label.clone(),
            points: self.points,
            phase: self.phase(),
            answers: self
                .answers
                .iter()
                .map(|answer| {
                    let visible = host || answer.revealed;
                    AnswerView {
                        text: visible.then(|| answer.text.clone()),
                        percent: visible.then_some(answer.percent),
                        revealed: answer.revealed,
                        team: answer.by_team,
                    }
                })
                .collect_vec(),
            meta: host.then(|| self.meta.clone()),
        }
    }

    fn find_answer(&self, guess: &str) -> Option<usize> {
        let cleaned = clean_answer(guess);
        self.answers
            .iter()
            .position(|answer| !answer.revealed && answer.matches(&cleaned))
    }

    /// Opens a closed tile for `team`
    pub fn open(&mut self, id: TileId, team: Team) -> Step {
        if self.phase() != Phase::Closed {
            return Step::default();
        }

        self.revealed = true;
        self.meta = RoundMeta {
            original_team: Some(team),
            turn_team: Some(team),
            ..RoundMeta::default()
        };

        tracing::info!(?id, %team, "tile opened");

        Step {
            announcements: vec![Announcement::Everyone(UpdateMessage::TileOpened {
                tile: id,
                question: self.question.clone(),
                label: self.label.clone(),
                team,
            })],
            timer: Some(TimerAction::Arm(TimerPhase::Main, team)),
            resolution: None,
        }
    }

    /// Evaluates a guess by `team`
    ///
    /// Blank guesses never match and count as wrong.
    pub fn guess(&mut self, id: TileId, team: Team, text: &str) -> Step {
        match self.phase() {
            Phase::Main if self.meta.turn_team == Some(team) => match self.find_answer(text) {
                Some(index) => self.reveal_in_main(id, index, team, Reason::AllFound),
                None => self.record_wrong(id, team),
            },
            Phase::Steal if self.meta.steal_team == Some(team) && !self.meta.steal_used => {
                let found = self.find_answer(text);
                self.attempt_steal(id, team, found)
            }
            _ => Step::default(),
        }
    }

    /// Reveals an answer on behalf of the team holding the phase
    pub fn admin_reveal(&mut self, id: TileId, index: usize) -> Step {
        if self.answers.get(index).is_none_or(|answer| answer.revealed) {
            return Step::default();
        }
        match (self.phase(), self.phase_holder()) {
            (Phase::Main, Some(team)) => {
                self.reveal_in_main(id, index, team, Reason::AdminFullReveal)
            }
            (Phase::Steal, Some(team)) if !self.meta.steal_used => {
                self.attempt_steal(id, team, Some(index))
            }
            _ => Step::default(),
        }
    }

    /// Counts a wrong guess for the team holding the phase
    pub fn mark_wrong(&mut self, id: TileId) -> Step {
        match (self.phase(), self.phase_holder()) {
            (Phase::Main, Some(team)) => self.record_wrong(id, team),
            (Phase::Steal, Some(team)) if !self.meta.steal_used => {
                self.attempt_steal(id, team, None)
            }
            _ => Step::default(),
        }
    }

    /// Handles an expired countdown of `phase`
    ///
    /// A countdown that no longer matches the tile's phase is ignored.
    pub fn timeout(&mut self, id: TileId, phase: TimerPhase) -> Step {
        match phase {
            TimerPhase::Main if self.phase() == Phase::Main => self.mark_wrong(id),
            TimerPhase::Steal if self.phase() == Phase::Steal => self.mark_wrong(id),
            _ => Step::default(),
        }
    }

    /// Resolves the tile immediately in favour of the opening team
    pub fn force_close(&mut self, id: TileId) -> Step {
        match (self.phase(), self.meta.original_team) {
            (Phase::Main | Phase::Steal, Some(original)) => {
                let points = self.revealed_sum();
                self.resolve(id, Vec::new(), original, Reason::ForceClose, points)
            }
            _ => Step::default(),
        }
    }

    fn reveal(&mut self, id: TileId, index: usize, team: Option<Team>) -> Announcement {
        let answer = &mut self.answers[index];
        answer.revealed = true;
        answer.by_team = team;
        Announcement::Everyone(UpdateMessage::AnswerRevealed {
            tile: id,
            index,
            text: answer.text.clone(),
            percent: answer.percent,
            team,
        })
    }

    fn reveal_in_main(
        &mut self,
        id: TileId,
        index: usize,
        team: Team,
        full_reason: Reason,
    ) -> Step {
        let announcement = self.reveal(id, index, Some(team));

        if self.answers.iter().all(|answer| answer.revealed) {
            let Some(original) = self.meta.original_team else {
                return Step::default();
            };
            let points = self.total_sum();
            return self.resolve(id, vec![announcement], original, full_reason, points);
        }

        Step {
            announcements: vec![announcement],
            timer: Some(TimerAction::Reset),
            resolution: None,
        }
    }

    fn record_wrong(&mut self, id: TileId, team: Team) -> Step {
        let count = (self.meta.wrong[team] + 1).min(MAX_WRONG);
        self.meta.wrong[team] = count;

        let mut announcements = vec![Announcement::Everyone(UpdateMessage::WrongRecorded {
            tile: id,
            team,
            count,
        })];

        if count == PREPARE_AT {
            announcements.push(Announcement::Team(
                team.other(),
                UpdateMessage::Prepare { tile: id },
            ));
        }

        if count < MAX_WRONG {
            return Step {
                announcements,
                timer: Some(TimerAction::Reset),
                resolution: None,
            };
        }

        let thief = team.other();
        self.meta.steal_active = true;
        self.meta.steal_team = Some(thief);
        self.meta.turn_team = Some(thief);

        tracing::info!(?id, %thief, "steal phase started");

        announcements.push(Announcement::Everyone(UpdateMessage::PhaseChanged {
            tile: id,
            phase: TimerPhase::Steal,
            owner: thief,
        }));

        Step {
            announcements,
            timer: Some(TimerAction::Arm(TimerPhase::Steal, thief)),
            resolution: None,
        }
    }

    fn attempt_steal(&mut self, id: TileId, team: Team, found: Option<usize>) -> Step {
        let Some(original) = self.meta.original_team else {
            return Step::default();
        };
        self.meta.steal_used = true;

        let points = self.revealed_sum();

        match found {
            Some(index) => {
                let announcement = self.reveal(id, index, Some(team));
                self.resolve(id, vec![announcement], team, Reason::StealSuccess, points)
            }
            None => self.resolve(id, Vec::new(), original, Reason::StealFailed, points),
        }
    }

    fn resolve(
        &mut self,
        id: TileId,
        mut announcements: Vec<Announcement>,
        winner: Team,
        reason: Reason,
        points: u64,
    ) -> Step {
        for index in 0..self.answers.len() {
            if !self.answers[index].revealed {
                announcements.push(self.reveal(id, index, None));
            }
        }

        self.answered = true;
        self.meta.steal_active = false;

        tracing::info!(?id, %winner, ?reason, points, "tile resolved");

        announcements.push(Announcement::Everyone(UpdateMessage::TileResolved {
            tile: id,
            winner,
            reason,
            points,
        }));

        Step {
            announcements,
            timer: Some(TimerAction::Retire),
            resolution: Some(Resolution {
                winner,
                reason,
                points,
            }),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    const ID: TileId = TileId {
        category: 0,
        index: 0,
    };

    fn tile() -> Tile {
        let answers = [
            ("Pizza", 40, vec!["pizza pie"]),
            ("Burger", 25, vec![]),
            ("Pasta", 20, vec!["spaghetti"]),
            ("Salad", 10, vec![]),
            ("Soup", 5, vec![]),
        ]
        .into_iter()
        .map(|(text, percent, alts)| Answer {
            text: text.to_string(),
            alts: alts.into_iter().map(str::to_string).collect(),
            percent,
            revealed: false,
            by_team: None,
        })
        .collect();
        Tile::new(
            "Name a food".to_string(),
            "10".to_string(),
            10,
            answers,
        )
    }

    fn opened() -> Tile {
        let mut tile = tile();
        tile.open(ID, Team::A);
        tile
    }

    fn three_wrong(tile: &mut Tile) -> Step {
        tile.guess(ID, Team::A, "nope");
        tile.guess(ID, Team::A, "still nope");
        tile.guess(ID, Team::A, "wrong again")
    }

    fn resolved_message(step: &Step) -> Option<&UpdateMessage> {
        step.announcements.iter().find_map(|a| match a {
            Announcement::Everyone(m @ UpdateMessage::TileResolved { .. }) => Some(m),
            _ => None,
        })
    }

    #[test]
    fn test_open() {
        let mut tile = tile();
        assert_eq!(tile.phase(), Phase::Closed);

        let step = tile.open(ID, Team::B);
        assert_eq!(step.timer, Some(TimerAction::Arm(TimerPhase::Main, Team::B)));
        assert_eq!(tile.phase(), Phase::Main);
        assert_eq!(tile.meta().original_team, Some(Team::B));
        assert_eq!(tile.meta().turn_team, Some(Team::B));
        assert!(tile.is_revealed());
    }

    #[test]
    fn test_open_twice_ignored() {
        let mut tile = opened();
        assert!(tile.open(ID, Team::B).is_ignored());
        assert_eq!(tile.meta().original_team, Some(Team::A));
    }

    #[test]
    fn test_guess_normalization() {
        for guess in ["  Pizza ", "pizza", "PIZZA", "Pizza Pie"] {
            let mut tile = opened();
            let step = tile.guess(ID, Team::A, guess);
            assert_eq!(step.timer, Some(TimerAction::Reset), "guess {guess:?}");
            assert!(tile.answers()[0].revealed);
            assert_eq!(tile.answers()[0].by_team, Some(Team::A));
        }
    }

    #[test]
    fn test_no_partial_match() {
        let mut tile = opened();
        tile.guess(ID, Team::A, "pizz");
        assert!(!tile.answers()[0].revealed);
        assert_eq!(tile.meta().wrong[Team::A], 1);
    }

    #[test]
    fn test_guess_from_wrong_team_ignored() {
        let mut tile = opened();
        assert!(tile.guess(ID, Team::B, "pizza").is_ignored());
        assert!(!tile.answers()[0].revealed);
        assert_eq!(tile.meta().wrong[Team::B], 0);
    }

    #[test]
    fn test_guess_on_closed_tile_ignored() {
        let mut tile = tile();
        assert!(tile.guess(ID, Team::A, "pizza").is_ignored());
    }

    #[test]
    fn test_repeated_correct_guess_counts_wrong() {
        let mut tile = opened();
        tile.guess(ID, Team::A, "pizza");
        tile.guess(ID, Team::A, "pizza");
        assert_eq!(tile.meta().wrong[Team::A], 1);
    }

    #[test]
    fn test_blank_guess_is_wrong() {
        let mut tile = opened();
        let step = tile.guess(ID, Team::A, "   ");
        assert_eq!(tile.meta().wrong[Team::A], 1);
        assert_eq!(step.timer, Some(TimerAction::Reset));
    }

    #[test]
    fn test_second_wrong_warns_other_team() {
        let mut tile = opened();
        let first = tile.guess(ID, Team::A, "x");
        assert!(
            !first
                .announcements
                .iter()
                .any(|a| matches!(a, Announcement::Team(..)))
        );

        let second = tile.guess(ID, Team::A, "y");
        assert!(second.announcements.contains(&Announcement::Team(
            Team::B,
            UpdateMessage::Prepare { tile: ID }
        )));
        assert_eq!(tile.phase(), Phase::Main);
    }

    #[test]
    fn test_third_wrong_starts_steal() {
        let mut tile = opened();
        let step = three_wrong(&mut tile);

        assert_eq!(tile.phase(), Phase::Steal);
        assert_eq!(step.timer, Some(TimerAction::Arm(TimerPhase::Steal, Team::B)));
        assert_eq!(tile.meta().steal_team, Some(Team::B));
        assert_eq!(tile.meta().turn_team, Some(Team::B));
        assert_eq!(tile.meta().wrong[Team::A], 3);
        assert!(step.announcements.contains(&Announcement::Everyone(
            UpdateMessage::PhaseChanged {
                tile: ID,
                phase: TimerPhase::Steal,
                owner: Team::B,
            }
        )));
    }

    #[test]
    fn test_scenario_a_steal_success_scores_snapshot() {
        let mut tile = opened();
        tile.guess(ID, Team::A, "pizza");
        tile.guess(ID, Team::A, "burger");
        assert_eq!(tile.revealed_sum(), 65);
        three_wrong(&mut tile);

        let step = tile.guess(ID, Team::B, "pasta");
        assert_eq!(
            step.resolution,
            Some(Resolution {
                winner: Team::B,
                reason: Reason::StealSuccess,
                points: 65,
            })
        );
        assert_eq!(step.timer, Some(TimerAction::Retire));
        assert_eq!(tile.phase(), Phase::Resolved);
        assert_eq!(tile.answers()[2].by_team, Some(Team::B));
        assert!(tile.answers().iter().all(|a| a.revealed));
        assert_eq!(tile.answers()[3].by_team, None);
    }

    #[test]
    fn test_scenario_b_steal_failure() {
        let mut tile = opened();
        tile.guess(ID, Team::A, "pizza");
        tile.guess(ID, Team::A, "burger");
        three_wrong(&mut tile);

        let step = tile.guess(ID, Team::B, "tacos");
        assert_eq!(
            step.resolution,
            Some(Resolution {
                winner: Team::A,
                reason: Reason::StealFailed,
                points: 65,
            })
        );
    }

    #[test]
    fn test_scenario_c_all_found() {
        let mut tile = opened();
        for guess in ["pizza", "burger", "spaghetti", "salad"] {
            assert!(tile.guess(ID, Team::A, guess).resolution.is_none());
        }
        let step = tile.guess(ID, Team::A, "soup");

        assert_eq!(
            step.resolution,
            Some(Resolution {
                winner: Team::A,
                reason: Reason::AllFound,
                points: 100,
            })
        );
        assert_eq!(
            resolved_message(&step),
            Some(&UpdateMessage::TileResolved {
                tile: ID,
                winner: Team::A,
                reason: Reason::AllFound,
                points: 100,
            })
        );
    }

    #[test]
    fn test_scenario_e_force_close() {
        let mut tile = opened();
        tile.guess(ID, Team::A, "pizza");
        tile.guess(ID, Team::A, "burger");
        tile.guess(ID, Team::A, "nope");

        let step = tile.force_close(ID);
        assert_eq!(
            step.resolution,
            Some(Resolution {
                winner: Team::A,
                reason: Reason::ForceClose,
                points: 65,
            })
        );
        assert_eq!(tile.phase(), Phase::Resolved);
    }

    #[test]
    fn test_force_close_during_steal() {
        let mut tile = opened();
        tile.guess(ID, Team::A, "pizza");
        three_wrong(&mut tile);

        let step = tile.force_close(ID);
        assert_eq!(step.resolution.map(|r| (r.winner, r.points)), Some((Team::A, 40)));
    }

    #[test]
    fn test_force_close_closed_tile_ignored() {
        let mut tile = tile();
        assert!(tile.force_close(ID).is_ignored());
    }

    #[test]
    fn test_steal_single_attempt() {
        let mut tile = opened();
        three_wrong(&mut tile);

        tile.guess(ID, Team::B, "tacos");
        let snapshot = tile.answers().to_vec();
        let meta = tile.meta().clone();

        assert!(tile.guess(ID, Team::B, "pizza").is_ignored());
        assert!(tile.admin_reveal(ID, 0).is_ignored());
        assert!(tile.mark_wrong(ID).is_ignored());
        assert!(tile.force_close(ID).is_ignored());
        assert!(tile.timeout(ID, TimerPhase::Steal).is_ignored());
        assert_eq!(tile.answers(), snapshot.as_slice());
        assert_eq!(tile.meta(), &meta);
    }

    #[test]
    fn test_steal_guess_from_original_team_ignored() {
        let mut tile = opened();
        three_wrong(&mut tile);
        assert!(tile.guess(ID, Team::A, "pizza").is_ignored());
        assert_eq!(tile.phase(), Phase::Steal);
    }

    #[test]
    fn test_wrong_count_frozen_during_steal() {
        let mut tile = opened();
        three_wrong(&mut tile);
        tile.mark_wrong(ID);
        assert_eq!(tile.meta().wrong[Team::A], 3);
        assert_eq!(tile.meta().wrong[Team::B], 0);
    }

    #[test]
    fn test_admin_reveal_in_main() {
        let mut tile = opened();
        let step = tile.admin_reveal(ID, 4);
        assert_eq!(step.timer, Some(TimerAction::Reset));
        assert_eq!(tile.answers()[4].by_team, Some(Team::A));
        assert_eq!(tile.phase(), Phase::Main);

        assert!(tile.admin_reveal(ID, 4).is_ignored());
        assert!(tile.admin_reveal(ID, 9).is_ignored());
    }

    #[test]
    fn test_admin_reveal_last_answer_resolves() {
        let mut tile = opened();
        for index in 0..4 {
            tile.admin_reveal(ID, index);
        }
        let step = tile.admin_reveal(ID, 4);
        assert_eq!(
            step.resolution,
            Some(Resolution {
                winner: Team::A,
                reason: Reason::AdminFullReveal,
                points: 100,
            })
        );
    }

    #[test]
    fn test_admin_reveal_in_steal_is_success() {
        let mut tile = opened();
        tile.guess(ID, Team::A, "soup");
        three_wrong(&mut tile);

        let step = tile.admin_reveal(ID, 0);
        assert_eq!(
            step.resolution,
            Some(Resolution {
                winner: Team::B,
                reason: Reason::StealSuccess,
                points: 5,
            })
        );
    }

    #[test]
    fn test_mark_wrong_matches_failed_guess() {
        let mut by_guess = opened();
        let mut by_admin = opened();

        for _ in 0..3 {
            by_guess.guess(ID, Team::A, "nope");
            by_admin.mark_wrong(ID);
        }
        assert_eq!(by_guess.meta(), by_admin.meta());

        let step = by_admin.mark_wrong(ID);
        assert_eq!(step.resolution.map(|r| r.reason), Some(Reason::StealFailed));
    }

    #[test]
    fn test_scenario_d_main_timeout_counts_as_wrong() {
        let mut by_timeout = opened();
        let mut by_guess = opened();

        let timeout_step = by_timeout.timeout(ID, TimerPhase::Main);
        let guess_step = by_guess.guess(ID, Team::A, "nope");

        assert_eq!(timeout_step, guess_step);
        assert_eq!(by_timeout.meta(), by_guess.meta());
    }

    #[test]
    fn test_steal_timeout_fails_steal() {
        let mut tile = opened();
        three_wrong(&mut tile);
        let step = tile.timeout(ID, TimerPhase::Steal);
        assert_eq!(
            step.resolution,
            Some(Resolution {
                winner: Team::A,
                reason: Reason::StealFailed,
                points: 0,
            })
        );
    }

    #[test]
    fn test_stale_timeout_ignored() {
        let mut tile = opened();
        assert!(tile.timeout(ID, TimerPhase::Steal).is_ignored());
        three_wrong(&mut tile);

        let step = tile.timeout(ID, TimerPhase::Main);
        assert!(step.is_ignored());
        assert_eq!(step.timer, None);
    }

    #[test]
    fn test_resolved_is_terminal() {
        let mut tile = opened();
        tile.force_close(ID);
        let answers = tile.answers().to_vec();
        let meta = tile.meta().clone();

        assert!(tile.open(ID, Team::B).is_ignored());
        assert!(tile.guess(ID, Team::A, "pizza").is_ignored());
        assert!(tile.admin_reveal(ID, 0).is_ignored());
        assert!(tile.mark_wrong(ID).is_ignored());
        assert!(tile.timeout(ID, TimerPhase::Main).is_ignored());
        assert!(tile.force_close(ID).is_ignored());

        assert_eq!(tile.answers(), answers.as_slice());
        assert_eq!(tile.meta(), &meta);
    }

    #[test]
    fn test_revealed_sum_bounded_by_total() {
        let mut tile = opened();
        for guess in ["pizza", "x", "burger", "y", "salad"] {
            tile.guess(ID, Team::A, guess);
            assert!(tile.revealed_sum() <= tile.total_sum());
        }
    }

    #[test]
    fn test_player_view_hides_answers() {
        let mut tile = opened();
        tile.guess(ID, Team::A, "burger");

        let view = tile.view(false);
        assert_eq!(view.question.as_deref(), Some("Name a food"));
        assert_eq!(view.answers[0].text, None);
        assert_eq!(view.answers[1].text.as_deref(), Some("Burger"));
        assert_eq!(view.answers[1].percent, Some(25));
        assert!(view.meta.is_none());

        let host = tile.view(true);
        assert_eq!(host.answers[0].text.as_deref(), Some("Pizza"));
        assert!(host.meta.is_some());
    }

    #[test]
    fn test_closed_view_hides_question() {
        let view = tile().view(false);
        assert_eq!(view.question, None);
        assert_eq!(view.phase, Phase::Closed);
    }
}
