//! Question bank loading and the runtime board
//!
//! A question bank is a list of named categories, each holding tiles.
//! Every tile asks one survey question and carries up to five answers
//! weighted by the percentage of people who gave them. Answers are cut to
//! the first five supplied and sorted by descending percent once, at load
//! time; their order never changes afterwards.

use std::cmp::Reverse;

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    constants::{game, tile},
    round::Tile,
    teams::Team,
};

/// Errors that can occur when loading a question bank
#[derive(Error, Debug)]
pub enum Error {
    /// The input is not a well-formed question bank document
    #[error("malformed question bank: {0}")]
    Parse(#[from] serde_json::Error),
    /// The document parsed but violates a limit
    #[error("invalid question bank: {0}")]
    Invalid(#[from] garde::Report),
}

/// Raw answer entry as it may appear in a question bank document
///
/// Answers can be given either as a bare string or as a full object.
#[derive(Deserialize)]
#[serde(untagged)]
enum AnswerEntry {
    Text(String),
    Full {
        #[serde(default)]
        text: String,
        #[serde(default)]
        percent: f64,
        #[serde(default)]
        alts: Vec<String>,
    },
}

/// Configuration of a single answer
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
#[serde(from = "AnswerEntry")]
pub struct AnswerConfig {
    /// Canonical answer text
    #[garde(length(chars, max = tile::MAX_ANSWER_LENGTH))]
    pub text: String,
    /// Survey percent of this answer
    #[garde(range(max = tile::MAX_PERCENT))]
    pub percent: u64,
    /// Alternate spellings accepted as this answer
    #[garde(length(max = tile::MAX_ALT_COUNT), inner(length(chars, max = tile::MAX_ANSWER_LENGTH)))]
    pub alts: Vec<String>,
}

/// Rounds a supplied percent to a whole number, negative values count as zero
#[allow(clippy::cast_sign_loss)]
fn whole_percent(percent: f64) -> u64 {
    percent.max(0.0).round() as u64
}

impl From<AnswerEntry> for AnswerConfig {
    fn from(entry: AnswerEntry) -> Self {
        match entry {
            AnswerEntry::Text(text) => Self {
                text,
                percent: 0,
                alts: Vec::new(),
            },
            AnswerEntry::Full {
                text,
                percent,
                alts,
            } => Self {
                text,
                percent: whole_percent(percent),
                alts,
            },
        }
    }
}

/// Configuration of a single tile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TileConfig {
    /// The survey question
    #[garde(length(chars, max = tile::MAX_QUESTION_LENGTH))]
    #[serde(default, alias = "q")]
    pub question: String,
    /// Display label of the tile
    #[garde(length(chars, max = tile::MAX_LABEL_LENGTH))]
    #[serde(default)]
    pub label: String,
    /// Board value shown on the tile face
    #[garde(skip)]
    #[serde(default = "default_points")]
    pub points: u64,
    /// Supplied answers; only the first five are kept
    #[garde(dive)]
    #[serde(default)]
    pub answers: Vec<AnswerConfig>,
}

fn default_points() -> u64 {
    tile::DEFAULT_POINTS
}

/// Configuration of a category of tiles
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CategoryConfig {
    /// Category name shown above its column
    #[garde(length(chars, max = tile::MAX_LABEL_LENGTH))]
    pub name: String,
    /// Tiles of this category
    #[garde(length(max = game::MAX_TILE_COUNT), dive)]
    #[serde(default, alias = "items")]
    pub tiles: Vec<TileConfig>,
}

/// A complete question bank
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct QuestionBank {
    /// Title of the question bank
    #[garde(length(chars, max = game::MAX_TITLE_LENGTH))]
    #[serde(default)]
    pub title: String,
    /// Categories of the board
    #[garde(length(max = game::MAX_CATEGORY_COUNT), dive)]
    pub categories: Vec<CategoryConfig>,
}

impl QuestionBank {
    /// Parses and validates a question bank from JSON
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the JSON is malformed and
    /// [`Error::Invalid`] if a limit is violated.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let bank: Self = serde_json::from_str(json)?;
        bank.validate()?;
        Ok(bank)
    }

    /// Builds a fresh board where every tile is closed
    pub fn to_board(&self) -> Board {
        Board {
            categories: self
                .categories
                .iter()
                .map(|category| Category {
                    name: category.name.clone(),
                    tiles: category.tiles.iter().map(TileConfig::to_tile).collect_vec(),
                })
                .collect_vec(),
        }
    }
}

impl TileConfig {
    /// Creates the runtime tile with its answers cut and sorted
    pub fn to_tile(&self) -> Tile {
        let mut answers = self
            .answers
            .iter()
            .take(tile::MAX_ANSWER_COUNT)
            .map(Answer::from)
            .collect_vec();
        answers.sort_by_key(|answer| Reverse(answer.percent));

        Tile::new(
            self.question.clone(),
            self.label.clone(),
            self.points,
            answers,
        )
    }
}

/// A survey answer on a tile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    /// Canonical answer text
    pub text: String,
    /// Alternate spellings accepted as this answer
    pub alts: Vec<String>,
    /// Survey percent of this answer
    pub percent: u64,
    /// Whether the answer is visible on the board
    pub revealed: bool,
    /// Team credited with finding the answer, if any
    pub by_team: Option<Team>,
}

impl From<&AnswerConfig> for Answer {
    fn from(config: &AnswerConfig) -> Self {
        Self {
            text: config.text.clone(),
            alts: config.alts.clone(),
            percent: config.percent,
            revealed: false,
            by_team: None,
        }
    }
}

/// Normalizes a guess or answer for comparison
///
/// Surrounding whitespace is dropped and case is folded.
pub fn clean_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

impl Answer {
    /// Checks whether a cleaned guess names this answer
    pub fn matches(&self, cleaned_guess: &str) -> bool {
        !cleaned_guess.is_empty()
            && std::iter::once(&self.text)
                .chain(&self.alts)
                .any(|candidate| clean_answer(candidate) == cleaned_guess)
    }
}

/// Address of a tile on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileId {
    /// Index of the category
    pub category: usize,
    /// Index of the tile inside its category
    pub index: usize,
}

impl TileId {
    /// Creates a tile address
    pub fn new(category: usize, index: usize) -> Self {
        Self { category, index }
    }
}

/// A named column of tiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Category name
    pub name: String,
    /// Tiles of this category
    pub tiles: Vec<Tile>,
}

/// The runtime board of a game session
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Board {
    /// Categories of the board
    pub categories: Vec<Category>,
}

impl Board {
    /// Gets a tile by address
    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.categories.get(id.category)?.tiles.get(id.index)
    }

    /// Gets a mutable tile by address
    pub fn tile_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.categories.get_mut(id.category)?.tiles.get_mut(id.index)
    }

    /// Iterates over all tiles with their addresses
    pub fn tiles(&self) -> impl Iterator<Item = (TileId, &Tile)> {
        self.categories
            .iter()
            .enumerate()
            .flat_map(|(category, c)| {
                c.tiles
                    .iter()
                    .enumerate()
                    .map(move |(index, tile)| (TileId::new(category, index), tile))
            })
    }
}
