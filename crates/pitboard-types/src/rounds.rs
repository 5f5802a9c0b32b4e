use serde::{Deserialize, Serialize};

use crate::{PitboardError, Result};

/// Number of rounds each entrant runs.
pub const MAX_ROUNDS: u32 = 5;

/// Value the time fields hold before anything was measured.
pub const UNSET_TIME: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    Time,
    Retired,
}

/// One attempt by the current entrant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    pub time: Option<f64>,
    pub kind: RecordKind,
}

impl RoundRecord {
    pub fn is_time(&self) -> bool {
        self.kind == RecordKind::Time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    InProgress,
    Full,
}

/// Ordered round attempts for the entrant on track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundRecorder {
    records: Vec<RoundRecord>,
}

impl RoundRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a timed attempt. Non-finite, non-positive or unset values are
    /// ignored and `false` is returned.
    pub fn commit_time(&mut self, time: f64) -> bool {
        if !time.is_finite() || time <= 0.0 || time == UNSET_TIME {
            return false;
        }
        let round = self.next_round();
        self.records.push(RoundRecord {
            round,
            time: Some(time),
            kind: RecordKind::Time,
        });
        true
    }

    pub fn commit_retirement(&mut self) {
        let round = self.next_round();
        self.records.push(RoundRecord {
            round,
            time: None,
            kind: RecordKind::Retired,
        });
    }

    /// Deletes one record. Stored round labels of the others are kept as-is.
    pub fn remove_at(&mut self, index: usize) -> Result<RoundRecord> {
        if index >= self.records.len() {
            return Err(PitboardError::Index {
                index,
                len: self.records.len(),
            });
        }
        Ok(self.records.remove(index))
    }

    pub fn clear_all(&mut self) {
        self.records.clear();
    }

    pub fn best_time(&self) -> Option<f64> {
        self.records
            .iter()
            .filter(|r| r.is_time())
            .filter_map(|r| r.time)
            .reduce(f64::min)
    }

    /// Round number the next attempt will be labelled with; saturates at
    /// [`MAX_ROUNDS`] without capping the list itself.
    pub fn next_round(&self) -> u32 {
        (self.records.len() as u32 + 1).min(MAX_ROUNDS)
    }

    pub fn phase(&self) -> RoundPhase {
        match self.records.len() {
            0 => RoundPhase::Idle,
            n if n < MAX_ROUNDS as usize => RoundPhase::InProgress,
            _ => RoundPhase::Full,
        }
    }

    pub fn records(&self) -> &[RoundRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
