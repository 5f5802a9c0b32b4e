use serde::{Deserialize, Serialize};

use crate::{
    leaderboard::LeaderboardEntry,
    roster::Entrant,
    rounds::{RoundRecord, MAX_ROUNDS},
};

/// Colour hint for the live timer readout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerTone {
    #[default]
    Idle,
    Running,
    Final,
    Ready,
}

/// What the live timer panel currently shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveDisplay {
    pub seconds: f64,
    pub tone: TimerTone,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
}

/// Derived, read-only snapshot published after every handled input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleView {
    pub entrant: Entrant,
    pub roster_index: usize,
    pub roster_len: usize,
    pub records: Vec<RoundRecord>,
    pub current_round: u32,
    pub max_rounds: u32,
    pub best_time: Option<f64>,
    pub position: Option<usize>,
    pub standings: Vec<LeaderboardEntry>,
    pub received_time: Option<f64>,
    pub live: LiveDisplay,
    pub stopwatch_running: bool,
    pub round_clock_secs: u32,
    pub round_clock_running: bool,
    pub auto_commit: bool,
    pub connection: ConnectionStatus,
}

impl Default for ConsoleView {
    fn default() -> Self {
        Self {
            entrant: Entrant::placeholder(),
            roster_index: 0,
            roster_len: 0,
            records: Vec::new(),
            current_round: 1,
            max_rounds: MAX_ROUNDS,
            best_time: None,
            position: None,
            standings: Vec::new(),
            received_time: None,
            live: LiveDisplay::default(),
            stopwatch_running: false,
            round_clock_secs: 0,
            round_clock_running: false,
            auto_commit: false,
            connection: ConnectionStatus::Disconnected,
        }
    }
}
