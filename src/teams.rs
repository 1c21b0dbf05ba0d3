//! Team membership and turn management
//!
//! A feud game always has exactly two teams. This module tracks which
//! player belongs to which team and which team currently holds the
//! global turn (the right to pick the next tile).

use std::{collections::HashMap, fmt::Display};

use enum_map::{Enum, EnumMap};
use serde::{Deserialize, Serialize};

use super::watcher::Id;

/// One of the two competing teams
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Enum, Serialize, Deserialize,
)]
pub enum Team {
    /// The red team
    A,
    /// The blue team
    B,
}

impl Team {
    /// Returns the opposing team
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// Picks one of the two teams uniformly at random
    pub fn random() -> Self {
        if fastrand::bool() { Self::A } else { Self::B }
    }
}

impl Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

/// Serialization helper for TeamManager struct
#[derive(Deserialize)]
struct TeamManagerSerde {
    team_to_players: EnumMap<Team, Vec<Id>>,
    turn: Option<Team>,
}

/// Manages player-to-team assignments and the global turn
///
/// The global turn is distinct from the per-tile turn held by the round
/// state machine: it decides who may open the next tile, while the
/// per-tile turn can move to the opposing team during a steal.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(from = "TeamManagerSerde")]
pub struct TeamManager {
    /// Members of each team in join order
    team_to_players: EnumMap<Team, Vec<Id>>,
    /// Team currently allowed to pick a tile
    turn: Option<Team>,

    /// Mapping from player ID to their team (rebuilt on deserialization)
    #[serde(skip_serializing)]
    player_to_team: HashMap<Id, Team>,
}

impl From<TeamManagerSerde> for TeamManager {
    /// Rebuilds the player mapping from the per-team member lists
    fn from(serde: TeamManagerSerde) -> Self {
        let TeamManagerSerde {
            team_to_players,
            turn,
        } = serde;
        let player_to_team = team_to_players
            .iter()
            .flat_map(|(team, players)| players.iter().map(move |id| (*id, team)))
            .collect();
        Self {
            team_to_players,
            turn,
            player_to_team,
        }
    }
}

impl TeamManager {
    /// Adds a player to a team, moving them if they already belong to the other one
    pub fn add_player(&mut self, player_id: Id, team: Team) {
        if let Some(previous) = self.player_to_team.insert(player_id, team) {
            self.team_to_players[previous].retain(|id| *id != player_id);
        }
        self.team_to_players[team].push(player_id);
    }

    /// Removes a player from their team
    ///
    /// # Returns
    ///
    /// The team the player belonged to, or `None` if they were unknown
    pub fn remove_player(&mut self, player_id: Id) -> Option<Team> {
        let team = self.player_to_team.remove(&player_id)?;
        self.team_to_players[team].retain(|id| *id != player_id);
        Some(team)
    }

    /// Gets the team of a specific player
    pub fn get_team(&self, player_id: Id) -> Option<Team> {
        self.player_to_team.get(&player_id).copied()
    }

    /// Gets the current members of a team in join order
    pub fn members(&self, team: Team) -> &[Id] {
        &self.team_to_players[team]
    }

    /// Gets the team currently holding the global turn
    pub fn turn(&self) -> Option<Team> {
        self.turn
    }

    /// Sets the global turn explicitly
    pub fn set_turn(&mut self, team: Team) {
        self.turn = Some(team);
    }

    /// Draws the starting team at random and gives it the turn
    pub fn draw_turn(&mut self) -> Team {
        let team = Team::random();
        self.turn = Some(team);
        team
    }

    /// Passes the global turn to the other team
    ///
    /// If no turn was set yet, a team is drawn at random instead.
    pub fn advance_turn(&mut self) -> Team {
        match self.turn {
            Some(team) => {
                self.turn = Some(team.other());
                team.other()
            }
            None => self.draw_turn(),
        }
    }
}
