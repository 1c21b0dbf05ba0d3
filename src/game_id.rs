//! Game session identifiers
//!
//! A game ID is a short random number shown as five octal digits so it can
//! be read out to players in the room. It also keys stored snapshots.

use std::{fmt::Display, num::ParseIntError, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};

/// Smallest generated value, `10000` in octal
const MIN_VALUE: u16 = 0o10_000;
/// One past the largest generated value, `100000` in octal
const MAX_VALUE: u16 = 0o100_000;

/// A unique identifier for a game session
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct GameId(u16);

impl GameId {
    /// Creates a new random game ID
    pub fn new() -> Self {
        Self(fastrand::u16(MIN_VALUE..MAX_VALUE))
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:05o}", self.0)
    }
}

impl FromStr for GameId {
    type Err = ParseIntError;

    /// Parses a game ID from its octal form
    ///
    /// # Errors
    ///
    /// Returns a `ParseIntError` if the string is not an octal number that
    /// fits a game ID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(u16::from_str_radix(s.trim(), 8)?))
    }
}
