use serde::{Deserialize, Serialize};

use crate::{roster::EntrantKey, PitboardError, Result};

/// Rows shown on the standings panel.
pub const DISPLAY_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub number: String,
    pub name: String,
    #[serde(default)]
    pub robot_name: String,
    pub best_time: f64,
}

impl LeaderboardEntry {
    pub fn key(&self) -> EntrantKey {
        EntrantKey::new(&self.number, &self.name)
    }

    /// `robot (name)` when a robot name is known, otherwise `name (number)`.
    pub fn display_name(&self) -> String {
        if self.robot_name.is_empty() {
            format!("{} ({})", self.name, self.number)
        } else {
            format!("{} ({})", self.robot_name, self.name)
        }
    }
}

/// Cross-entrant best times, always sorted fastest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the row for `key` and returns its 1-based
    /// position after re-sorting.
    pub fn upsert(
        &mut self,
        key: &EntrantKey,
        robot_name: &str,
        best_time: Option<f64>,
    ) -> Result<usize> {
        let best_time = best_time
            .filter(|t| t.is_finite())
            .ok_or(PitboardError::NoValidRecords)?;

        match self.entries.iter_mut().find(|entry| entry.key() == *key) {
            Some(entry) => {
                entry.best_time = best_time;
                entry.robot_name = robot_name.to_string();
            }
            None => self.entries.push(LeaderboardEntry {
                number: key.number.clone(),
                name: key.name.clone(),
                robot_name: robot_name.to_string(),
                best_time,
            }),
        }

        // Vec::sort_by is stable, ties keep their previous order.
        self.entries
            .sort_by(|a, b| a.best_time.total_cmp(&b.best_time));

        let position = self
            .entries
            .iter()
            .position(|entry| entry.key() == *key)
            .map(|idx| idx + 1)
            .unwrap_or(self.entries.len());
        Ok(position)
    }

    /// Position a time would take; ties share the better rank.
    pub fn rank_of(&self, time: f64) -> usize {
        1 + self
            .entries
            .iter()
            .filter(|entry| entry.best_time < time)
            .count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn top(&self, n: usize) -> &[LeaderboardEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Restores ordering on data read from storage.
    pub fn normalize(&mut self) {
        self.entries.retain(|entry| entry.best_time.is_finite());
        self.entries
            .sort_by(|a, b| a.best_time.total_cmp(&b.best_time));
    }
}
