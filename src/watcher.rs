//! Participant tracking and message fan-out
//!
//! Every connection to a game session is a watcher: the moderator (host),
//! a joined player or a connection that has not joined a team yet. This
//! module tracks their roles and delivers messages to them through the
//! tunnels found by the caller-supplied `tunnel_finder`.

use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
    str::FromStr,
};

use enum_map::{Enum, EnumMap};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;

use super::{SyncMessage, UpdateMessage, session::Tunnel, teams::Team};

/// A unique identifier for participants in the game
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random participant ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Role and state of a participant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// A connection that has not joined a team yet
    Unassigned,
    /// The moderator controlling the round
    Host,
    /// A player on one of the two teams
    Player(PlayerValue),
}

/// The kind of participant without associated data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum ValueKind {
    /// An unassigned connection
    Unassigned,
    /// The moderator
    Host,
    /// A player
    Player,
}

impl Value {
    /// Returns the kind of this value without the associated data
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Unassigned => ValueKind::Unassigned,
            Value::Host => ValueKind::Host,
            Value::Player(_) => ValueKind::Player,
        }
    }
}

/// Player-specific data
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerValue {
    /// Display name of the player
    pub name: String,
    /// Team the player plays for
    pub team: Team,
}

/// Serialization helper for Watchers struct
#[derive(Deserialize)]
struct WatchersSerde {
    mapping: HashMap<Id, Value>,
}

/// Manages all participants (watchers) in a game session
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(from = "WatchersSerde")]
pub struct Watchers {
    /// Primary mapping from participant ID to their role
    mapping: HashMap<Id, Value>,

    /// Reverse mapping organized by participant kind
    #[serde(skip_serializing)]
    reverse_mapping: EnumMap<ValueKind, HashSet<Id>>,
}

impl From<WatchersSerde> for Watchers {
    fn from(serde: WatchersSerde) -> Self {
        let WatchersSerde { mapping } = serde;
        let mut reverse_mapping: EnumMap<ValueKind, HashSet<Id>> = EnumMap::default();
        for (id, value) in &mapping {
            reverse_mapping[value.kind()].insert(*id);
        }
        Self {
            mapping,
            reverse_mapping,
        }
    }
}

/// Errors that can occur when managing watchers
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The game has reached the maximum number of allowed participants
    #[error("maximum number of players reached")]
    MaximumPlayers,
    /// A participant with this ID is already registered
    #[error("participant already exists")]
    Exists,
}

impl Watchers {
    /// Creates a new Watchers instance with a host already assigned
    pub fn with_host_id(host_id: Id) -> Self {
        let mut watchers = Self::default();
        watchers.mapping.insert(host_id, Value::Host);
        watchers.reverse_mapping[ValueKind::Host].insert(host_id);
        watchers
    }

    /// Gets all participants of a kind that currently have a tunnel
    ///
    /// # Arguments
    ///
    /// * `filter` - The kind of participants to include
    /// * `tunnel_finder` - Function to retrieve the tunnel for a given ID
    ///
    /// # Returns
    ///
    /// `(id, tunnel, value)` for every connected participant of that kind
    pub fn specific_vec<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        filter: ValueKind,
        tunnel_finder: F,
    ) -> Vec<(Id, T, Value)> {
        self.reverse_mapping[filter]
            .iter()
            .filter_map(|x| match (tunnel_finder(*x), self.mapping.get(x)) {
                (Some(t), Some(v)) => Some((*x, t, v.to_owned())),
                _ => None,
            })
            .collect_vec()
    }

    /// Gets the count of participants of a specific kind
    pub fn specific_count(&self, filter: ValueKind) -> usize {
        self.reverse_mapping[filter].len()
    }

    /// Iterates over the IDs of all participants of a kind, connected or not
    pub fn ids(&self, filter: ValueKind) -> impl Iterator<Item = Id> + '_ {
        self.reverse_mapping[filter].iter().copied()
    }

    /// Adds a new watcher to the game session
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exists`] if the ID is already registered and
    /// [`Error::MaximumPlayers`] if the session is full.
    pub fn add_watcher(&mut self, watcher_id: Id, watcher_value: Value) -> Result<(), Error> {
        if self.mapping.contains_key(&watcher_id) {
            return Err(Error::Exists);
        }

        if self.mapping.len() >= crate::constants::game::MAX_PLAYER_COUNT {
            return Err(Error::MaximumPlayers);
        }

        let kind = watcher_value.kind();
        self.mapping.insert(watcher_id, watcher_value);
        self.reverse_mapping[kind].insert(watcher_id);

        Ok(())
    }

    /// Updates the role of an existing watcher
    ///
    /// Does nothing if the watcher is unknown.
    pub fn update_watcher_value(&mut self, watcher_id: Id, watcher_value: Value) {
        let old_kind = match self.mapping.get(&watcher_id) {
            Some(v) => v.kind(),
            _ => return,
        };
        let new_kind = watcher_value.kind();
        if old_kind != new_kind {
            self.reverse_mapping[old_kind].remove(&watcher_id);
            self.reverse_mapping[new_kind].insert(watcher_id);
        }
        self.mapping.insert(watcher_id, watcher_value);
    }

    /// Forgets a watcher entirely
    ///
    /// # Returns
    ///
    /// The role the watcher had, if they were known
    pub fn remove_watcher(&mut self, watcher_id: Id) -> Option<Value> {
        let value = self.mapping.remove(&watcher_id)?;
        self.reverse_mapping[value.kind()].remove(&watcher_id);
        Some(value)
    }

    /// Gets the role of a specific watcher
    pub fn get_watcher_value(&self, watcher_id: Id) -> Option<Value> {
        self.mapping.get(&watcher_id).map(ToOwned::to_owned)
    }

    /// Checks if a watcher exists in the game session
    pub fn has_watcher(&self, watcher_id: Id) -> bool {
        self.mapping.contains_key(&watcher_id)
    }

    /// Gets the display name of a player
    pub fn get_name(&self, watcher_id: Id) -> Option<String> {
        match self.mapping.get(&watcher_id)? {
            Value::Player(player) => Some(player.name.clone()),
            _ => None,
        }
    }

    /// Gets the team of a player
    pub fn get_team(&self, watcher_id: Id) -> Option<Team> {
        match self.mapping.get(&watcher_id)? {
            Value::Player(player) => Some(player.team),
            _ => None,
        }
    }

    /// Closes the tunnel of a watcher if they have one
    pub fn remove_watcher_session<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        watcher_id: Id,
        tunnel_finder: F,
    ) {
        if let Some(session) = tunnel_finder(watcher_id) {
            session.close();
        }
    }

    /// Sends an update message to a specific watcher
    pub fn send_message<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        message: &UpdateMessage,
        watcher_id: Id,
        tunnel_finder: F,
    ) {
        let Some(session) = tunnel_finder(watcher_id) else {
            return;
        };

        session.send_message(message);
    }

    /// Sends a state synchronization message to a specific watcher
    pub fn send_state<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        message: &SyncMessage,
        watcher_id: Id,
        tunnel_finder: F,
    ) {
        let Some(session) = tunnel_finder(watcher_id) else {
            return;
        };

        session.send_state(message);
    }

    /// Sends personalized messages to all assigned watchers
    ///
    /// The sender is called for every connected host and player and may
    /// return `None` to skip that watcher.
    ///
    /// # Arguments
    ///
    /// * `sender` - Function that generates the message for each watcher
    /// * `tunnel_finder` - Function to retrieve tunnels for watchers
    pub fn announce_with<S, T: Tunnel, F: Fn(Id) -> Option<T>>(&self, sender: S, tunnel_finder: F)
    where
        S: Fn(Id, &Value) -> Option<UpdateMessage>,
    {
        for kind in [ValueKind::Host, ValueKind::Player] {
            for (watcher, session, value) in self.specific_vec(kind, &tunnel_finder) {
                let Some(message) = sender(watcher, &value) else {
                    continue;
                };

                session.send_message(&message);
            }
        }
    }

    /// Broadcasts an update message to every host and player
    pub fn announce<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        message: &UpdateMessage,
        tunnel_finder: F,
    ) {
        self.announce_with(|_, _| Some(message.to_owned()), tunnel_finder);
    }

    /// Sends an update message only to the players of one team
    ///
    /// Hosts do not receive team-scoped messages.
    pub fn announce_team<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        team: Team,
        message: &UpdateMessage,
        tunnel_finder: F,
    ) {
        for (_, session, value) in self.specific_vec(ValueKind::Player, tunnel_finder) {
            if matches!(value, Value::Player(PlayerValue { team: t, .. }) if t == team) {
                session.send_message(message);
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
pub(crate) mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::game;

    /// Tunnel recording everything sent through it
    #[derive(Debug, Clone, Default)]
    pub struct MockTunnel {
        pub messages: Rc<RefCell<Vec<UpdateMessage>>>,
        pub states: Rc<RefCell<Vec<SyncMessage>>>,
        pub closed: Rc<RefCell<bool>>,
    }

    impl Tunnel for MockTunnel {
        fn send_message(&self, message: &UpdateMessage) {
            self.messages.borrow_mut().push(message.clone());
        }

        fn send_state(&self, state: &SyncMessage) {
            self.states.borrow_mut().push(state.clone());
        }

        fn close(self) {
            *self.closed.borrow_mut() = true;
        }
    }

    /// A set of mock tunnels keyed by participant
    #[derive(Debug, Default)]
    pub struct Tunnels(pub RefCell<HashMap<Id, MockTunnel>>);

    impl Tunnels {
        pub fn connect(&self, id: Id) -> MockTunnel {
            self.0.borrow_mut().entry(id).or_default().clone()
        }

        pub fn finder(&self) -> impl Fn(Id) -> Option<MockTunnel> + '_ {
            move |id| self.0.borrow().get(&id).cloned()
        }

        pub fn messages(&self, id: Id) -> Vec<UpdateMessage> {
            self.0
                .borrow()
                .get(&id)
                .map(|t| t.messages.borrow().clone())
                .unwrap_or_default()
        }

        pub fn states(&self, id: Id) -> Vec<SyncMessage> {
            self.0
                .borrow()
                .get(&id)
                .map(|t| t.states.borrow().clone())
                .unwrap_or_default()
        }
    }

    fn player(name: &str, team: Team) -> Value {
        Value::Player(PlayerValue {
            name: name.to_string(),
            team,
        })
    }

    fn ping() -> UpdateMessage {
        game::UpdateMessage::TurnChanged(Team::A).into()
    }

    #[test]
    fn test_with_host_id() {
        let host = Id::new();
        let watchers = Watchers::with_host_id(host);
        assert_eq!(watchers.get_watcher_value(host), Some(Value::Host));
        assert_eq!(watchers.specific_count(ValueKind::Host), 1);
    }

    #[test]
    fn test_add_existing_watcher() {
        let host = Id::new();
        let mut watchers = Watchers::with_host_id(host);
        assert_eq!(
            watchers.add_watcher(host, Value::Unassigned),
            Err(Error::Exists)
        );
    }

    #[test]
    fn test_update_moves_kind() {
        let mut watchers = Watchers::default();
        let id = Id::new();
        watchers.add_watcher(id, Value::Unassigned).unwrap();
        watchers.update_watcher_value(id, player("Ann", Team::B));

        assert_eq!(watchers.specific_count(ValueKind::Unassigned), 0);
        assert_eq!(watchers.specific_count(ValueKind::Player), 1);
        assert_eq!(watchers.get_name(id).as_deref(), Some("Ann"));
        assert_eq!(watchers.get_team(id), Some(Team::B));
    }

    #[test]
    fn test_remove_watcher() {
        let mut watchers = Watchers::default();
        let id = Id::new();
        watchers.add_watcher(id, player("Ann", Team::A)).unwrap();

        assert_eq!(watchers.remove_watcher(id), Some(player("Ann", Team::A)));
        assert!(!watchers.has_watcher(id));
        assert_eq!(watchers.specific_count(ValueKind::Player), 0);
        assert_eq!(watchers.remove_watcher(id), None);
    }

    #[test]
    fn test_announce_skips_unassigned() {
        let tunnels = Tunnels::default();
        let host = Id::new();
        let guest = Id::new();
        let mut watchers = Watchers::with_host_id(host);
        watchers.add_watcher(guest, Value::Unassigned).unwrap();
        tunnels.connect(host);
        tunnels.connect(guest);

        watchers.announce(&ping(), tunnels.finder());

        assert_eq!(tunnels.messages(host).len(), 1);
        assert!(tunnels.messages(guest).is_empty());
    }

    #[test]
    fn test_announce_team() {
        let tunnels = Tunnels::default();
        let host = Id::new();
        let a = Id::new();
        let b = Id::new();
        let mut watchers = Watchers::with_host_id(host);
        watchers.add_watcher(a, player("Ann", Team::A)).unwrap();
        watchers.add_watcher(b, player("Bob", Team::B)).unwrap();
        for id in [host, a, b] {
            tunnels.connect(id);
        }

        watchers.announce_team(Team::B, &ping(), tunnels.finder());

        assert!(tunnels.messages(host).is_empty());
        assert!(tunnels.messages(a).is_empty());
        assert_eq!(tunnels.messages(b).len(), 1);
    }

    #[test]
    fn test_disconnected_watchers_are_skipped() {
        let tunnels = Tunnels::default();
        let host = Id::new();
        let watchers = Watchers::with_host_id(host);

        watchers.announce(&ping(), tunnels.finder());
        assert!(tunnels.messages(host).is_empty());
    }

    #[test]
    fn test_remove_watcher_session_closes_tunnel() {
        let tunnels = Tunnels::default();
        let host = Id::new();
        let watchers = Watchers::with_host_id(host);
        let tunnel = tunnels.connect(host);

        watchers.remove_watcher_session(host, tunnels.finder());
        assert!(*tunnel.closed.borrow());
    }

    #[test]
    fn test_serde_rebuilds_reverse_mapping() {
        let mut watchers = Watchers::with_host_id(Id::new());
        let id = Id::new();
        watchers.add_watcher(id, player("Ann", Team::A)).unwrap();

        let json = serde_json::to_string(&watchers).unwrap();
        let restored: Watchers = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.specific_count(ValueKind::Host), 1);
        assert_eq!(restored.specific_count(ValueKind::Player), 1);
        assert_eq!(restored.get_team(id), Some(Team::A));
    }
}
