//! Configuration constants for the feud game system
//!
//! This module contains all the configuration limits and constraints
//! used throughout the game system to ensure data integrity and
//! provide consistent boundaries for different game components.

/// Game session configuration constants
pub mod game {
    /// Maximum number of participants allowed in a single game session
    pub const MAX_PLAYER_COUNT: usize = 1000;
    /// Maximum length of a question bank title in characters
    pub const MAX_TITLE_LENGTH: usize = 200;
    /// Maximum number of categories on a board
    pub const MAX_CATEGORY_COUNT: usize = 12;
    /// Maximum number of tiles in a single category
    pub const MAX_TILE_COUNT: usize = 12;
}

/// Tile and answer configuration constants
pub mod tile {
    /// Number of answers kept per tile after sorting by percent
    pub const MAX_ANSWER_COUNT: usize = 5;
    /// Maximum length of a question text
    pub const MAX_QUESTION_LENGTH: usize = 300;
    /// Maximum length of a tile label or category name
    pub const MAX_LABEL_LENGTH: usize = 100;
    /// Maximum length of an answer or alternate spelling
    pub const MAX_ANSWER_LENGTH: usize = 200;
    /// Maximum number of alternate spellings per answer
    pub const MAX_ALT_COUNT: usize = 16;
    /// Upper bound of an answer's survey percent
    pub const MAX_PERCENT: u64 = 100;
    /// Board value shown on a tile when none is supplied
    pub const DEFAULT_POINTS: u64 = 10;
}

/// Round state machine constants
pub mod round {
    /// Wrong guesses after which the opposing team may steal
    pub const MAX_WRONG: u8 = 3;
    /// Wrong guesses after which the opposing team is told to prepare
    pub const PREPARE_AT: u8 = 2;
}

/// Timer configuration constants
pub mod timer {
    /// Minimum duration in seconds for either round phase
    pub const MIN_TIME_LIMIT: u64 = 5;
    /// Maximum duration in seconds for either round phase
    pub const MAX_TIME_LIMIT: u64 = 240;
    /// Default duration in seconds of the main guessing phase
    pub const DEFAULT_MAIN_TIME_LIMIT: u64 = 30;
    /// Default duration in seconds of the steal phase
    pub const DEFAULT_STEAL_TIME_LIMIT: u64 = 20;
    /// Interval in milliseconds between two timer evaluations
    pub const TICK_INTERVAL_MS: u64 = 250;
}

/// Player name configuration constants
pub mod name {
    /// Maximum length of a player name in characters
    pub const MAX_LENGTH: usize = 24;
}
