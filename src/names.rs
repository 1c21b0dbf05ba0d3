//! Player name assignment
//!
//! Names are trimmed, limited in length, checked for inappropriate content
//! and unique within a game. A player who joins without a name is given a
//! generated pet name instead.

use std::collections::{HashMap, hash_map::Entry};

use heck::ToTitleCase;
use rustrict::CensorStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{constants::name::MAX_LENGTH, watcher::Id};

/// Attempts at drawing an unused generated name before giving up
const GENERATED_ATTEMPTS: usize = 16;

/// Serialization helper for Names struct
#[derive(Deserialize)]
struct NamesSerde {
    mapping: HashMap<Id, String>,
}

/// Manages player names and their associations with player IDs
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(from = "NamesSerde")]
pub struct Names {
    /// Primary mapping from player ID to name
    mapping: HashMap<Id, String>,

    /// Reverse mapping from name to player ID
    #[serde(skip_serializing)]
    reverse_mapping: HashMap<String, Id>,
}

impl From<NamesSerde> for Names {
    fn from(serde: NamesSerde) -> Self {
        let NamesSerde { mapping } = serde;
        let reverse_mapping = mapping
            .iter()
            .map(|(id, name)| (name.to_owned(), *id))
            .collect();
        Self {
            mapping,
            reverse_mapping,
        }
    }
}

/// Errors that can occur during name validation and assignment
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The requested name is already in use by another player
    #[error("name already in-use")]
    Used,
    /// The player already has an assigned name
    #[error("player has an existing name")]
    Assigned,
    /// The name contains inappropriate content
    #[error("name is inappropriate")]
    Sinful,
    /// The name exceeds the maximum allowed length
    #[error("name is too long")]
    TooLong,
}

/// Generates a title-cased two word pet name
fn generated_name() -> String {
    petname::petname(2, " ").unwrap_or_default().to_title_case()
}

impl Names {
    /// Retrieves the name associated with a player ID
    pub fn get_name(&self, id: &Id) -> Option<String> {
        self.mapping.get(id).map(ToOwned::to_owned)
    }

    /// Assigns a name to a player after validation
    ///
    /// Surrounding whitespace is dropped. A blank name is replaced by a
    /// generated one.
    ///
    /// # Returns
    ///
    /// The name that was actually assigned
    ///
    /// # Errors
    ///
    /// * `Error::TooLong` - Name exceeds the maximum length in characters
    /// * `Error::Sinful` - Name contains inappropriate content
    /// * `Error::Used` - Name is already taken by another player
    /// * `Error::Assigned` - Player already has a name assigned
    pub fn set_name(&mut self, id: Id, name: &str) -> Result<String, Error> {
        if self.mapping.contains_key(&id) {
            return Err(Error::Assigned);
        }

        let name = rustrict::trim_whitespace(name);
        let name = if name.is_empty() {
            self.unused_generated_name()?
        } else {
            if name.chars().count() > MAX_LENGTH {
                return Err(Error::TooLong);
            }
            if name.is_inappropriate() {
                return Err(Error::Sinful);
            }
            name.to_owned()
        };

        if self.reverse_mapping.contains_key(&name) {
            return Err(Error::Used);
        }

        match self.mapping.entry(id) {
            Entry::Occupied(_) => Err(Error::Assigned),
            Entry::Vacant(v) => {
                v.insert(name.clone());
                self.reverse_mapping.insert(name.clone(), id);
                Ok(name)
            }
        }
    }

    fn unused_generated_name(&self) -> Result<String, Error> {
        std::iter::repeat_with(generated_name)
            .take(GENERATED_ATTEMPTS)
            .find(|name| {
                !name.is_empty()
                    && name.chars().count() <= MAX_LENGTH
                    && !self.reverse_mapping.contains_key(name)
            })
            .ok_or(Error::Used)
    }

    /// Frees the name of a player who left
    pub fn remove(&mut self, id: &Id) -> Option<String> {
        let name = self.mapping.remove(id)?;
        self.reverse_mapping.remove(&name);
        Some(name)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut names = Names::default();
        let id = Id::new();

        assert_eq!(names.set_name(id, "Anna"), Ok("Anna".to_string()));
        assert_eq!(names.get_name(&id), Some("Anna".to_string()));
    }

    #[test]
    fn test_whitespace_trimmed() {
        let mut names = Names::default();
        assert_eq!(
            names.set_name(Id::new(), "  Anna  "),
            Ok("Anna".to_string())
        );
    }

    #[test]
    fn test_length_limit() {
        let mut names = Names::default();
        assert_eq!(
            names.set_name(Id::new(), &"a".repeat(MAX_LENGTH + 1)),
            Err(Error::TooLong)
        );
        assert!(names.set_name(Id::new(), &"a".repeat(MAX_LENGTH)).is_ok());
    }

    #[test]
    fn test_length_counts_characters() {
        let mut names = Names::default();
        let name = "ü".repeat(MAX_LENGTH);
        assert_eq!(names.set_name(Id::new(), &name), Ok(name));
    }

    #[test]
    fn test_blank_name_is_generated() {
        let mut names = Names::default();
        let id = Id::new();

        let name = names.set_name(id, "   ").unwrap();
        assert!(!name.is_empty());
        assert!(name.chars().count() <= MAX_LENGTH);
        assert_eq!(names.get_name(&id), Some(name));
    }

    #[test]
    fn test_duplicate() {
        let mut names = Names::default();
        names.set_name(Id::new(), "Anna").unwrap();
        assert_eq!(names.set_name(Id::new(), "Anna"), Err(Error::Used));
        assert_eq!(names.set_name(Id::new(), " Anna "), Err(Error::Used));
    }

    #[test]
    fn test_already_assigned() {
        let mut names = Names::default();
        let id = Id::new();
        names.set_name(id, "Anna").unwrap();
        assert_eq!(names.set_name(id, "Bert"), Err(Error::Assigned));
        assert_eq!(names.get_name(&id), Some("Anna".to_string()));
    }

    #[test]
    fn test_inappropriate() {
        let mut names = Names::default();
        for name in ["fuck", "shit"] {
            assert_eq!(names.set_name(Id::new(), name), Err(Error::Sinful));
        }
    }

    #[test]
    fn test_remove_frees_name() {
        let mut names = Names::default();
        let id = Id::new();
        names.set_name(id, "Anna").unwrap();

        assert_eq!(names.remove(&id), Some("Anna".to_string()));
        assert!(names.set_name(Id::new(), "Anna").is_ok());
    }

    #[test]
    fn test_serde_rebuilds_reverse_mapping() {
        let mut names = Names::default();
        let id = Id::new();
        names.set_name(id, "Anna").unwrap();

        let json = serde_json::to_string(&names).unwrap();
        let mut restored: Names = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.get_name(&id), Some("Anna".to_string()));
        assert_eq!(restored.set_name(Id::new(), "Anna"), Err(Error::Used));
    }
}
