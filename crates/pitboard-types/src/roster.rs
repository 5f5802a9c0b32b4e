use serde::{Deserialize, Serialize};

use crate::{PitboardError, Result};

pub const DEFAULT_NUMBER: &str = "#000";
pub const DEFAULT_NAME: &str = "Unnamed";
pub const DEFAULT_ROBOT: &str = "Robot";

/// A competing team as listed in the entry source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    pub number: String,
    pub name: String,
    #[serde(default)]
    pub robot_name: String,
}

impl Entrant {
    pub fn new(
        number: impl Into<String>,
        name: impl Into<String>,
        robot_name: impl Into<String>,
    ) -> Self {
        Self {
            number: number.into(),
            name: name.into(),
            robot_name: robot_name.into(),
        }
    }

    /// Neutral stand-in used when nothing has been loaded.
    pub fn placeholder() -> Self {
        Self::new(DEFAULT_NUMBER, DEFAULT_NAME, DEFAULT_ROBOT)
    }

    /// Leaderboard identity; blank fields fall back to the defaults first.
    pub fn key(&self) -> EntrantKey {
        EntrantKey::new(&self.number, &self.name)
    }

    pub fn robot_or_default(&self) -> &str {
        if self.robot_name.trim().is_empty() {
            DEFAULT_ROBOT
        } else {
            self.robot_name.trim()
        }
    }
}

impl Default for Entrant {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// Composite identity used to match an entrant to a leaderboard row.
///
/// Both the number and the name must match; two entrants sharing only one of
/// them stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntrantKey {
    pub number: String,
    pub name: String,
}

impl EntrantKey {
    pub fn new(number: &str, name: &str) -> Self {
        let number = number.trim();
        let name = name.trim();
        Self {
            number: if number.is_empty() {
                DEFAULT_NUMBER.to_string()
            } else {
                number.to_string()
            },
            name: if name.is_empty() {
                DEFAULT_NAME.to_string()
            } else {
                name.to_string()
            },
        }
    }
}

/// Ordered list of entrants with a rotation cursor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryRoster {
    entries: Vec<Entrant>,
    index: usize,
}

impl EntryRoster {
    pub const PLACEHOLDER_COUNT: usize = 5;

    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            index: 0,
        }
    }

    /// Built-in five-entrant roster that keeps the console usable without
    /// an entry file.
    pub fn placeholder() -> Self {
        let entries = (1..=Self::PLACEHOLDER_COUNT)
            .map(|n| {
                Entrant::new(
                    format!("#{n:03}"),
                    format!("Entry {n}"),
                    format!("Robot {n}"),
                )
            })
            .collect();
        Self { entries, index: 0 }
    }

    /// Replaces the roster wholesale and rewinds to the first entrant.
    /// Empty input installs the placeholder roster instead.
    pub fn load<I>(&mut self, rows: I)
    where
        I: IntoIterator<Item = Entrant>,
    {
        let entries: Vec<Entrant> = rows.into_iter().collect();
        if entries.is_empty() {
            *self = Self::placeholder();
        } else {
            self.entries = entries;
            self.index = 0;
        }
    }

    pub fn current(&self) -> Entrant {
        self.entries
            .get(self.index)
            .cloned()
            .unwrap_or_else(Entrant::placeholder)
    }

    /// Moves to the next entrant, wrapping past the last one.
    pub fn advance(&mut self) -> Result<&Entrant> {
        if self.entries.is_empty() {
            return Err(PitboardError::EmptyRoster);
        }
        self.index = (self.index + 1) % self.entries.len();
        Ok(&self.entries[self.index])
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn entries(&self) -> &[Entrant] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clamps a cursor restored from storage that no longer fits the list.
    pub fn normalize(&mut self) {
        if self.index >= self.entries.len() {
            self.index = 0;
        }
    }
}

impl Default for EntryRoster {
    fn default() -> Self {
        Self::placeholder()
    }
}
