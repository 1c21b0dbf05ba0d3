//! Snapshot storage boundary
//!
//! A session can be written out as a JSON snapshot and read back later.
//! Where snapshots live is up to the embedding application; this module
//! only defines the [`SnapshotStore`] interface and an in-memory store.

use std::collections::HashMap;

use thiserror::Error;

use crate::{game::Game, game_id::GameId};

/// Errors that can occur while saving or loading a snapshot
#[derive(Error, Debug)]
pub enum Error {
    /// The snapshot could not be encoded or decoded
    #[error("snapshot encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
    /// The backing store failed
    #[error("snapshot store failed: {0}")]
    Store(String),
}

/// Storage for serialized game snapshots, keyed by game ID
pub trait SnapshotStore {
    /// Stores a snapshot, replacing any previous one for the same game
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the snapshot could not be written.
    fn save(&mut self, game_id: GameId, snapshot: String) -> Result<(), Error>;

    /// Gets the latest snapshot of a game, if one exists
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the store could not be read.
    fn load(&self, game_id: GameId) -> Result<Option<String>, Error>;
}

/// Snapshot store that keeps everything in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    snapshots: HashMap<GameId, String>,
}

impl SnapshotStore for MemoryStore {
    fn save(&mut self, game_id: GameId, snapshot: String) -> Result<(), Error> {
        self.snapshots.insert(game_id, snapshot);
        Ok(())
    }

    fn load(&self, game_id: GameId) -> Result<Option<String>, Error> {
        Ok(self.snapshots.get(&game_id).cloned())
    }
}

/// Serializes a game into its snapshot form
///
/// # Errors
///
/// Returns [`Error::Encoding`] if the game could not be serialized.
pub fn encode(game: &Game) -> Result<String, Error> {
    Ok(serde_json::to_string(game)?)
}

/// Writes a snapshot of `game` to `store`
///
/// # Errors
///
/// Returns an error if encoding or storing fails.
pub fn save<S: SnapshotStore>(store: &mut S, game_id: GameId, game: &Game) -> Result<(), Error> {
    store.save(game_id, encode(game)?)?;
    tracing::debug!(%game_id, "snapshot saved");
    Ok(())
}

/// Reads the latest snapshot of a game from `store`
///
/// # Errors
///
/// Returns an error if the store fails or the snapshot cannot be decoded.
pub fn load<S: SnapshotStore>(store: &S, game_id: GameId) -> Result<Option<Game>, Error> {
    store
        .load(game_id)?
        .map(|snapshot| serde_json::from_str::<Game>(&snapshot))
        .transpose()
        .map_err(Error::from)
}
