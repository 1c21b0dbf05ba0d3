//! Game session aggregate
//!
//! A [`Game`] owns everything belonging to one running board: the tiles
//! and their round state, the participants, team membership and turn,
//! scores and the single countdown. It performs no I/O of its own; all
//! outbound traffic goes through the tunnels returned by `tunnel_finder`
//! and time only advances when the owner calls [`Game::tick`].

use std::{fmt::Debug, time::Duration};

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use web_time::SystemTime;

use super::{
    bank::{Board, QuestionBank, TileId},
    constants::timer,
    game_id::GameId,
    leaderboard::{Leaderboard, ScoreMessage},
    names::{self, Names},
    persistence::{self, SnapshotStore},
    round::{Announcement, Phase, Step, TileView, TimerAction},
    scoring,
    session::Tunnel,
    teams::{Team, TeamManager},
    timer::{Scheduler, Tick, TimerPhase},
    watcher::{self, Id, PlayerValue, Value, ValueKind, Watchers},
};

/// Validates that a phase duration lies within the accepted bounds
fn validate_time_limit(val: &Duration) -> garde::Result {
    let (min, max) = (timer::MIN_TIME_LIMIT, timer::MAX_TIME_LIMIT);
    if (min..=max).contains(&val.as_secs()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "time limit is outside of the bounds [{min},{max}]"
        )))
    }
}

/// Timing configuration of a game session
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Validate, PartialEq, Eq)]
pub struct Options {
    /// Duration of the opening team's guessing countdown
    #[garde(custom(|v, _| validate_time_limit(v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    main_time_limit: Duration,
    /// Duration of the steal attempt countdown
    #[garde(custom(|v, _| validate_time_limit(v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    steal_time_limit: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            main_time_limit: Duration::from_secs(timer::DEFAULT_MAIN_TIME_LIMIT),
            steal_time_limit: Duration::from_secs(timer::DEFAULT_STEAL_TIME_LIMIT),
        }
    }
}

impl Options {
    /// Creates validated options
    ///
    /// # Errors
    ///
    /// Returns a report if either duration is outside the accepted bounds.
    pub fn new(main_time_limit: Duration, steal_time_limit: Duration) -> Result<Self, garde::Report> {
        let options = Self {
            main_time_limit,
            steal_time_limit,
        };
        options.validate()?;
        Ok(options)
    }

    /// Duration of the main phase countdown
    pub fn main_time_limit(&self) -> Duration {
        self.main_time_limit
    }

    /// Duration of the steal phase countdown
    pub fn steal_time_limit(&self) -> Duration {
        self.steal_time_limit
    }
}

/// A running game session
#[derive(Serialize, Deserialize)]
pub struct Game {
    /// Title of the question bank this board came from
    title: String,
    /// Tiles and their round state
    board: Board,
    /// Connected participants and their roles
    pub watchers: Watchers,
    /// Player names
    names: Names,
    /// Team membership and the global turn
    teams: TeamManager,
    /// Cumulative scores
    pub leaderboard: Leaderboard,
    /// The single countdown of this session
    timer: Scheduler,
    /// Timing configuration
    options: Options,
    /// The tile currently in play, if any
    open_tile: Option<TileId>,
}

impl Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("title", &self.title)
            .field("open_tile", &self.open_tile)
            .field("turn", &self.teams.turn())
            .finish_non_exhaustive()
    }
}

/// Messages received from participants, grouped by the role allowed to send them
#[derive(Debug, Deserialize, Clone)]
pub enum IncomingMessage {
    /// Messages from the moderator
    Host(IncomingHostMessage),
    /// Messages from connections that have not joined a team yet
    Unassigned(IncomingUnassignedMessage),
    /// Messages from players
    Player(IncomingPlayerMessage),
}

impl IncomingMessage {
    /// Checks that a message may be sent by a participant of `sender_kind`
    fn follows(&self, sender_kind: ValueKind) -> bool {
        matches!(
            (self, sender_kind),
            (IncomingMessage::Host(_), ValueKind::Host)
                | (IncomingMessage::Player(_), ValueKind::Player)
                | (IncomingMessage::Unassigned(_), ValueKind::Unassigned)
        )
    }
}

/// Messages that can be sent by players
#[derive(Debug, Deserialize, Clone)]
pub enum IncomingPlayerMessage {
    /// Open a tile for the player's team
    PickTile(TileId),
    /// Guess an answer on the open tile
    Guess(String),
}

/// Messages that can be sent by unassigned connections
#[derive(Debug, Deserialize, Clone)]
pub enum IncomingUnassignedMessage {
    /// Join a team, optionally with a chosen name
    Join {
        /// Requested name; blank names are replaced by a generated one
        #[serde(default)]
        name: String,
        /// Team to join; team A when absent
        #[serde(default)]
        team: Option<Team>,
    },
}

/// Messages that can be sent by the moderator
#[derive(Debug, Deserialize, Clone, Copy)]
pub enum IncomingHostMessage {
    /// Give the turn to a randomly drawn team
    DrawStartTeam,
    /// Pass the turn to the other team
    AdvanceTurn,
    /// Give the turn to a specific team
    SetTurn(Team),
    /// Reveal an answer of the open tile for the team holding the phase
    RevealAnswer(usize),
    /// Count a wrong guess for the team holding the phase
    MarkWrong,
    /// Resolve the open tile immediately
    ForceClose,
    /// Adjust a player's score directly
    AwardPoints {
        /// Player to adjust
        player: Id,
        /// Signed amount to add
        points: i64,
    },
}

/// A player as shown in the roster
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct PlayerEntry {
    /// Display name
    pub name: String,
    /// Team of the player
    pub team: Team,
    /// Cumulative score
    pub points: u64,
}

/// Remaining time of the running countdown
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct TimerView {
    /// Phase of the countdown
    pub phase: TimerPhase,
    /// Team the countdown runs for
    pub owner: Team,
    /// Whole seconds remaining
    pub remaining: u64,
}

/// A category as shown to a participant
#[derive(Debug, Serialize, Clone)]
pub struct CategoryView {
    /// Category name
    pub name: String,
    /// Tiles of the category
    pub tiles: Vec<TileView>,
}

/// Full view of the game for a single participant
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub struct BoardMessage {
    /// Title of the question bank
    pub title: String,
    /// Board contents visible to the recipient
    pub categories: Vec<CategoryView>,
    /// The tile currently in play
    pub open_tile: Option<TileId>,
    /// Team holding the global turn
    pub turn: Option<Team>,
    /// The running countdown
    pub timer: Option<TimerView>,
    /// Roster with scores
    pub players: Vec<PlayerEntry>,
    /// Team of the recipient, if they are a player
    pub team: Option<Team>,
}

/// Update messages sent to participants about session-wide changes
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// Assign a unique ID to a participant
    IdAssign(Id),
    /// Ask the participant to pick a name and a team
    NameChoose,
    /// Confirm that the participant joined
    NameAssign {
        /// The name that was assigned
        name: String,
        /// The team that was joined
        team: Team,
    },
    /// Report why a join was rejected
    NameError(names::Error),
    /// The roster or scores changed
    Players(Vec<PlayerEntry>),
    /// The global turn changed
    TurnChanged(Team),
    /// The displayed countdown changed
    TimerTick {
        /// Phase of the countdown
        phase: TimerPhase,
        /// Team the countdown runs for
        owner: Team,
        /// Whole seconds remaining
        remaining: u64,
    },
    /// The recipient's own score changed
    Score {
        /// Score and standing of the recipient
        score: Option<ScoreMessage>,
    },
}

/// Sync messages sent to participants on join and reconnect
#[derive(Debug, Serialize, Clone)]
pub enum SyncMessage {
    /// The complete board as visible to the recipient
    Board(Box<BoardMessage>),
}

impl Game {
    /// Creates a session with a fresh board built from `bank`
    ///
    /// # Arguments
    ///
    /// * `bank` - Validated question bank
    /// * `options` - Timing configuration
    /// * `host_id` - ID of the moderator
    pub fn new(bank: &QuestionBank, options: Options, host_id: Id) -> Self {
        Self {
            title: bank.title.clone(),
            board: bank.to_board(),
            watchers: Watchers::with_host_id(host_id),
            names: Names::default(),
            teams: TeamManager::default(),
            leaderboard: Leaderboard::default(),
            timer: Scheduler::new(options.main_time_limit, options.steal_time_limit),
            options,
            open_tile: None,
        }
    }

    /// Restores a session from `store`, or starts a fresh one
    ///
    /// A missing or unreadable snapshot falls back to a fresh board built
    /// from `bank`.
    pub fn restore_or_new<S: SnapshotStore>(
        store: &S,
        game_id: GameId,
        bank: &QuestionBank,
        options: Options,
        host_id: Id,
    ) -> Self {
        match persistence::load(store, game_id) {
            Ok(Some(game)) => {
                tracing::info!(%game_id, "restored game from snapshot");
                game
            }
            Ok(None) => Self::new(bank, options, host_id),
            Err(error) => {
                tracing::warn!(%game_id, %error, "discarding unusable snapshot");
                Self::new(bank, options, host_id)
            }
        }
    }

    /// Title of the question bank
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The board with all round state
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Team membership and the global turn
    pub fn teams(&self) -> &TeamManager {
        &self.teams
    }

    /// The countdown scheduler
    pub fn timer(&self) -> &Scheduler {
        &self.timer
    }

    /// Timing configuration
    pub fn options(&self) -> Options {
        self.options
    }

    /// The tile currently in play
    pub fn open_tile(&self) -> Option<TileId> {
        self.open_tile
    }

    fn players(&self) -> Vec<PlayerEntry> {
        self.watchers
            .ids(ValueKind::Player)
            .filter_map(|id| {
                Some(PlayerEntry {
                    name: self.watchers.get_name(id)?,
                    team: self.watchers.get_team(id)?,
                    points: self.leaderboard.points(id),
                })
            })
            .sorted_by(|a, b| b.points.cmp(&a.points).then_with(|| a.name.cmp(&b.name)))
            .collect_vec()
    }

    fn announce_players<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, tunnel_finder: F) {
        self.watchers
            .announce(&UpdateMessage::Players(self.players()).into(), tunnel_finder);
    }

    fn announce_turn<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, team: Team, tunnel_finder: F) {
        tracing::info!(%team, "turn changed");
        self.watchers
            .announce(&UpdateMessage::TurnChanged(team).into(), tunnel_finder);
    }

    // Participants

    /// Registers a new connection that has not joined a team yet
    ///
    /// # Errors
    ///
    /// Returns a [`watcher::Error`] if the ID is taken or the session is full.
    pub fn add_unassigned<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        watcher: Id,
        tunnel_finder: F,
    ) -> Result<(), watcher::Error> {
        self.watchers.add_watcher(watcher, Value::Unassigned)?;

        self.watchers
            .send_message(&UpdateMessage::IdAssign(watcher).into(), watcher, &tunnel_finder);
        self.update_session(watcher, tunnel_finder);

        Ok(())
    }

    /// Removes a participant who left the session and closes their tunnel
    ///
    /// A player loses their team membership and name; their score record
    /// stays on the leaderboard.
    pub fn remove_watcher<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        watcher: Id,
        tunnel_finder: F,
    ) {
        self.watchers
            .remove_watcher_session(watcher, &tunnel_finder);

        let Some(value) = self.watchers.remove_watcher(watcher) else {
            return;
        };

        if let Value::Player(player) = value {
            self.names.remove(&watcher);
            self.teams.remove_player(watcher);
            tracing::info!(%watcher, name = %player.name, team = %player.team, "player left");
            self.announce_players(tunnel_finder);
        }
    }

    fn join<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        watcher: Id,
        name: &str,
        team: Team,
        tunnel_finder: F,
    ) {
        let name = match self.names.set_name(watcher, name) {
            Ok(name) => name,
            Err(error) => {
                tracing::debug!(%watcher, %error, "join rejected");
                self.watchers.send_message(
                    &UpdateMessage::NameError(error).into(),
                    watcher,
                    tunnel_finder,
                );
                return;
            }
        };

        self.teams.add_player(watcher, team);
        self.watchers.update_watcher_value(
            watcher,
            Value::Player(PlayerValue {
                name: name.clone(),
                team,
            }),
        );

        tracing::info!(%watcher, %name, %team, "player joined");

        self.announce_players(&tunnel_finder);
        self.update_session(watcher, tunnel_finder);
    }

    // Round

    fn pick<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        watcher: Id,
        tile_id: TileId,
        now: SystemTime,
        tunnel_finder: F,
    ) {
        let Some(team) = self.teams.get_team(watcher) else {
            return;
        };

        let other_open = self
            .open_tile
            .and_then(|id| self.board.tile(id))
            .is_some_and(|tile| matches!(tile.phase(), Phase::Main | Phase::Steal));
        if other_open {
            tracing::debug!(%watcher, ?tile_id, "pick rejected, a tile is already open");
            return;
        }

        match self.teams.turn() {
            Some(turn) if turn != team => {
                tracing::debug!(%watcher, ?tile_id, %team, "pick rejected, not this team's turn");
                return;
            }
            Some(_) => {}
            None => {
                if self.board.tile(tile_id).is_none_or(|t| t.phase() != Phase::Closed) {
                    return;
                }
                self.teams.set_turn(team);
                self.announce_turn(team, &tunnel_finder);
            }
        }

        let Some(tile) = self.board.tile_mut(tile_id) else {
            return;
        };
        let step = tile.open(tile_id, team);
        if !step.is_ignored() {
            self.open_tile = Some(tile_id);
        }
        self.apply_step(tile_id, step, now, tunnel_finder);
    }

    /// Runs `operation` on the open tile and applies its outcome
    fn on_open_tile<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        now: SystemTime,
        tunnel_finder: F,
        operation: impl FnOnce(&mut crate::round::Tile, TileId) -> Step,
    ) {
        let Some(tile_id) = self.open_tile else {
            return;
        };
        let Some(tile) = self.board.tile_mut(tile_id) else {
            return;
        };
        let step = operation(tile, tile_id);
        self.apply_step(tile_id, step, now, tunnel_finder);
    }

    fn apply_step<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        tile_id: TileId,
        step: Step,
        now: SystemTime,
        tunnel_finder: F,
    ) {
        if step.is_ignored() {
            tracing::debug!(?tile_id, "action ignored");
            return;
        }

        match step.timer {
            None => {}
            Some(TimerAction::Reset) => self.timer.reset(now),
            Some(TimerAction::Arm(phase, owner)) => self.timer.arm(phase, owner, now),
            Some(TimerAction::Retire) => self.timer.retire(),
        }

        for announcement in step.announcements {
            match announcement {
                Announcement::Everyone(message) => {
                    self.watchers.announce(&message.into(), &tunnel_finder);
                }
                Announcement::Team(team, message) => {
                    self.watchers
                        .announce_team(team, &message.into(), &tunnel_finder);
                }
            }
        }

        let Some(resolution) = step.resolution else {
            return;
        };

        self.open_tile = None;

        let shares = scoring::distribute(resolution.points, self.teams.members(resolution.winner));
        let totals = self.leaderboard.add_scores(&shares);

        tracing::info!(
            ?tile_id,
            winner = %resolution.winner,
            points = resolution.points,
            members = shares.len(),
            "points distributed"
        );

        for (player, _) in totals {
            self.send_score(player, &tunnel_finder);
        }
        self.announce_players(tunnel_finder);
    }

    fn send_score<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, player: Id, tunnel_finder: F) {
        self.watchers.send_message(
            &UpdateMessage::Score {
                score: self.leaderboard.score(player),
            }
            .into(),
            player,
            tunnel_finder,
        );
    }

    // Network

    /// Handles a message from a participant
    ///
    /// Messages not allowed for the sender's role, and actions that are not
    /// valid in the current state of the round, are dropped without effect.
    #[tracing::instrument(skip(self, tunnel_finder))]
    pub fn receive_message<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        watcher_id: Id,
        message: IncomingMessage,
        tunnel_finder: F,
    ) {
        let Some(watcher_value) = self.watchers.get_watcher_value(watcher_id) else {
            return;
        };

        if !message.follows(watcher_value.kind()) {
            tracing::debug!("message does not match sender role");
            return;
        }

        let now = SystemTime::now();

        match message {
            IncomingMessage::Unassigned(IncomingUnassignedMessage::Join { name, team }) => {
                self.join(
                    watcher_id,
                    &name,
                    team.unwrap_or(Team::A),
                    tunnel_finder,
                );
            }
            IncomingMessage::Player(IncomingPlayerMessage::PickTile(tile_id)) => {
                self.pick(watcher_id, tile_id, now, tunnel_finder);
            }
            IncomingMessage::Player(IncomingPlayerMessage::Guess(text)) => {
                let Some(team) = self.teams.get_team(watcher_id) else {
                    return;
                };
                self.on_open_tile(now, tunnel_finder, |tile, id| tile.guess(id, team, &text));
            }
            IncomingMessage::Host(host_message) => {
                self.receive_host_message(host_message, now, tunnel_finder);
            }
        }
    }

    fn receive_host_message<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        message: IncomingHostMessage,
        now: SystemTime,
        tunnel_finder: F,
    ) {
        match message {
            IncomingHostMessage::DrawStartTeam => {
                let team = self.teams.draw_turn();
                self.announce_turn(team, tunnel_finder);
            }
            IncomingHostMessage::AdvanceTurn => {
                let team = self.teams.advance_turn();
                self.announce_turn(team, tunnel_finder);
            }
            IncomingHostMessage::SetTurn(team) => {
                self.teams.set_turn(team);
                self.announce_turn(team, tunnel_finder);
            }
            IncomingHostMessage::RevealAnswer(index) => {
                self.on_open_tile(now, tunnel_finder, |tile, id| tile.admin_reveal(id, index));
            }
            IncomingHostMessage::MarkWrong => {
                self.on_open_tile(now, tunnel_finder, |tile, id| tile.mark_wrong(id));
            }
            IncomingHostMessage::ForceClose => {
                self.on_open_tile(now, tunnel_finder, |tile, id| tile.force_close(id));
            }
            IncomingHostMessage::AwardPoints { player, points } => {
                if !self.watchers.has_watcher(player) && self.leaderboard.score(player).is_none()
                {
                    return;
                }
                let total = self.leaderboard.adjust(player, points);
                tracing::info!(%player, points, total, "score adjusted by moderator");
                self.send_score(player, &tunnel_finder);
                self.announce_players(tunnel_finder);
            }
        }
    }

    /// Evaluates the countdown against the current time
    pub fn tick<T: Tunnel, F: Fn(Id) -> Option<T>>(&mut self, tunnel_finder: F) {
        self.tick_at(SystemTime::now(), tunnel_finder);
    }

    /// Evaluates the countdown against `now`
    ///
    /// Publishes the remaining seconds when they change. An expired
    /// countdown is turned into a timeout of its phase on the open tile.
    pub fn tick_at<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        now: SystemTime,
        tunnel_finder: F,
    ) {
        match self.timer.poll(now) {
            None => {}
            Some(Tick::Countdown {
                phase,
                owner,
                remaining,
            }) => {
                self.watchers.announce(
                    &UpdateMessage::TimerTick {
                        phase,
                        owner,
                        remaining,
                    }
                    .into(),
                    tunnel_finder,
                );
            }
            Some(Tick::Expired { phase, owner }) => {
                tracing::info!(?phase, %owner, "countdown expired");
                self.on_open_tile(now, tunnel_finder, |tile, id| tile.timeout(id, phase));
            }
        }
    }

    /// Builds the full view of the session for a participant
    ///
    /// Hosts see every answer and the round bookkeeping; everyone else only
    /// sees what has been revealed.
    pub fn state_message(&self, watcher_id: Id, watcher_kind: ValueKind) -> super::SyncMessage {
        self.state_message_at(watcher_id, watcher_kind, SystemTime::now())
    }

    fn state_message_at(
        &self,
        watcher_id: Id,
        watcher_kind: ValueKind,
        now: SystemTime,
    ) -> super::SyncMessage {
        let host = matches!(watcher_kind, ValueKind::Host);

        SyncMessage::Board(Box::new(BoardMessage {
            title: self.title.clone(),
            categories: self
                .board
                .categories
                .iter()
                .map(|category| CategoryView {
                    name: category.name.clone(),
                    tiles: category.tiles.iter().map(|t| t.view(host)).collect_vec(),
                })
                .collect_vec(),
            open_tile: self.open_tile,
            turn: self.teams.turn(),
            timer: self
                .timer
                .active()
                .filter(|timer| timer.is_running())
                .map(|timer| TimerView {
                    phase: timer.phase(),
                    owner: timer.owner(),
                    remaining: timer.remaining_secs(now),
                }),
            players: self.players(),
            team: self.watchers.get_team(watcher_id),
        }))
        .into()
    }

    /// Resends everything a participant needs after (re)connecting
    pub fn update_session<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        watcher_id: Id,
        tunnel_finder: F,
    ) {
        let Some(watcher_value) = self.watchers.get_watcher_value(watcher_id) else {
            return;
        };

        match &watcher_value {
            Value::Host => {}
            Value::Player(player) => {
                self.watchers.send_message(
                    &UpdateMessage::NameAssign {
                        name: player.name.clone(),
                        team: player.team,
                    }
                    .into(),
                    watcher_id,
                    &tunnel_finder,
                );
            }
            Value::Unassigned => {
                self.watchers
                    .send_message(&UpdateMessage::NameChoose.into(), watcher_id, &tunnel_finder);
            }
        }

        self.watchers.send_state(
            &self.state_message(watcher_id, watcher_value.kind()),
            watcher_id,
            tunnel_finder,
        );
    }
}
