//! # Feud Game Library
//!
//! This library provides the game logic for a moderated, two-team survey
//! quiz. Teams take turns opening tiles on a board; each tile hides up to
//! five answers weighted by how many surveyed people gave them. Three wrong
//! guesses hand the opposing team a single chance to steal the points. The
//! library tracks participants, runs the per-tile round state machine and
//! its countdown, scores resolved tiles and keeps every connected client in
//! sync through caller-provided tunnels.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

use serde::Serialize;

pub mod bank;
pub mod constants;
pub mod driver;
pub mod game;
pub mod game_id;
pub mod leaderboard;
pub mod names;
pub mod persistence;
pub mod round;
pub mod scoring;
pub mod session;
pub mod teams;
pub mod timer;
pub mod watcher;

/// Messages sent to give a participant a complete view of the game
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum SyncMessage {
    /// Session-wide state
    Game(game::SyncMessage),
}

impl SyncMessage {
    /// Converts the sync message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Messages sent to notify participants about incremental changes
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum UpdateMessage {
    /// Session-wide updates
    Game(game::UpdateMessage),
    /// Updates about the open tile
    Round(round::UpdateMessage),
}

impl UpdateMessage {
    /// Converts the update message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}
