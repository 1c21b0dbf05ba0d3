//! Single-writer runtime for a game session
//!
//! [`spawn`] moves a [`Game`] into its own tokio task. Participant actions
//! arrive as [`Command`]s over a channel and the countdown is evaluated on
//! a fixed interval, so actions and timer expiries are applied one at a
//! time in arrival order.

use std::{collections::HashMap, time::Duration};

use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{
    constants::timer::TICK_INTERVAL_MS,
    game::{Game, IncomingMessage},
    persistence,
    session::Tunnel,
    watcher::Id,
};

/// Capacity of the command queue of a game task
const COMMAND_BUFFER: usize = 256;

/// Errors returned by a [`GameHandle`]
#[derive(Error, Debug)]
pub enum Error {
    /// The game task is no longer running
    #[error("game task has stopped")]
    Stopped,
    /// The game task panicked
    #[error("game task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    /// The snapshot could not be produced
    #[error(transparent)]
    Snapshot(#[from] persistence::Error),
}

/// Work items processed by the game task
#[derive(Debug)]
pub enum Command<T> {
    /// A participant connected or reconnected with a new tunnel
    Connect {
        /// Participant ID
        watcher: Id,
        /// Tunnel to reach the participant
        tunnel: T,
    },
    /// A participant's connection dropped; they may reconnect later
    Disconnect(Id),
    /// A participant left the session for good
    Leave(Id),
    /// A participant sent a message
    Message {
        /// Sender of the message
        watcher: Id,
        /// The message
        message: IncomingMessage,
    },
    /// Produce a snapshot of the session
    Snapshot(oneshot::Sender<Result<String, persistence::Error>>),
}

/// The state owned by a game task
struct Actor<T> {
    game: Game,
    tunnels: HashMap<Id, T>,
}

fn finder<T: Clone>(tunnels: &HashMap<Id, T>) -> impl Fn(Id) -> Option<T> + '_ {
    move |id| tunnels.get(&id).cloned()
}

impl<T: Tunnel + Clone> Actor<T> {
    fn handle(&mut self, command: Command<T>) {
        match command {
            Command::Connect { watcher, tunnel } => {
                self.tunnels.insert(watcher, tunnel);
                if self.game.watchers.has_watcher(watcher) {
                    self.game.update_session(watcher, finder(&self.tunnels));
                } else if let Err(error) =
                    self.game.add_unassigned(watcher, finder(&self.tunnels))
                {
                    tracing::warn!(%watcher, %error, "connection refused");
                    self.game
                        .watchers
                        .remove_watcher_session(watcher, finder(&self.tunnels));
                    self.tunnels.remove(&watcher);
                }
            }
            Command::Disconnect(watcher) => {
                self.tunnels.remove(&watcher);
            }
            Command::Leave(watcher) => {
                self.game.remove_watcher(watcher, finder(&self.tunnels));
                self.tunnels.remove(&watcher);
            }
            Command::Message { watcher, message } => {
                self.game
                    .receive_message(watcher, message, finder(&self.tunnels));
            }
            Command::Snapshot(reply) => {
                // the requester may have gone away
                let _ = reply.send(persistence::encode(&self.game));
            }
        }
    }

    fn tick(&mut self) {
        self.game.tick(finder(&self.tunnels));
    }
}

async fn run<T: Tunnel + Clone>(game: Game, mut commands: mpsc::Receiver<Command<T>>) -> Game {
    let mut actor = Actor {
        game,
        tunnels: HashMap::new(),
    };

    let mut interval = time::interval(Duration::from_millis(TICK_INTERVAL_MS));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => actor.handle(command),
                None => break,
            },
            _ = interval.tick() => actor.tick(),
        }
    }

    tracing::info!(game = ?actor.game, "game task stopped");
    actor.game
}

/// Handle to a game running in its own task
#[derive(Debug)]
pub struct GameHandle<T> {
    sender: mpsc::Sender<Command<T>>,
    task: JoinHandle<Game>,
}

/// Starts a game task
///
/// The task runs until [`GameHandle::shutdown`] is called.
pub fn spawn<T>(game: Game) -> GameHandle<T>
where
    T: Tunnel + Clone + Send + 'static,
{
    let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
    tracing::info!(?game, "game task started");
    let task = tokio::spawn(run(game, receiver));
    GameHandle { sender, task }
}

impl<T: Send + 'static> GameHandle<T> {
    async fn command(&self, command: Command<T>) -> Result<(), Error> {
        self.sender
            .send(command)
            .await
            .map_err(|_| Error::Stopped)
    }

    /// Registers a participant's tunnel
    ///
    /// Known participants receive their current state again; unknown ones
    /// are added as unassigned connections.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stopped`] if the game task is gone.
    pub async fn connect(&self, watcher: Id, tunnel: T) -> Result<(), Error> {
        self.command(Command::Connect { watcher, tunnel }).await
    }

    /// Forgets a participant's tunnel without removing them from the game
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stopped`] if the game task is gone.
    pub async fn disconnect(&self, watcher: Id) -> Result<(), Error> {
        self.command(Command::Disconnect(watcher)).await
    }

    /// Removes a participant from the game
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stopped`] if the game task is gone.
    pub async fn leave(&self, watcher: Id) -> Result<(), Error> {
        self.command(Command::Leave(watcher)).await
    }

    /// Forwards a participant's message to the game
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stopped`] if the game task is gone.
    pub async fn send(&self, watcher: Id, message: IncomingMessage) -> Result<(), Error> {
        self.command(Command::Message { watcher, message }).await
    }

    /// Produces a snapshot reflecting every command sent before it
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stopped`] if the game task is gone and
    /// [`Error::Snapshot`] if the game could not be serialized.
    pub async fn snapshot(&self) -> Result<String, Error> {
        let (reply, response) = oneshot::channel();
        self.command(Command::Snapshot(reply)).await?;
        Ok(response.await.map_err(|_| Error::Stopped)??)
    }

    /// Stops the game task after it has drained its queue
    ///
    /// # Errors
    ///
    /// Returns [`Error::Join`] if the game task panicked.
    pub async fn shutdown(self) -> Result<Game, Error> {
        let Self { sender, task } = self;
        drop(sender);
        Ok(task.await?)
    }
}
