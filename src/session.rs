//! Outbound connection boundary
//!
//! The game never owns sockets. Callers hand it a `tunnel_finder` closure
//! that maps a participant to their [`Tunnel`], and every message leaves
//! the engine through it.

use super::{SyncMessage, UpdateMessage};

/// A one-way channel to a single connected participant
///
/// Sends are fire-and-forget: implementations must not block the game and
/// are expected to drop messages for connections that went away.
pub trait Tunnel {
    /// Sends an incremental update to the participant
    fn send_message(&self, message: &UpdateMessage);

    /// Sends a full view of the game, used on join and reconnect
    fn send_state(&self, state: &SyncMessage);

    /// Closes the connection
    fn close(self);
}
