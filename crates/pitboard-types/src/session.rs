use serde::{Deserialize, Serialize};

use crate::{
    leaderboard::Leaderboard,
    roster::{Entrant, EntryRoster},
    rounds::RoundRecorder,
};

/// Persisted aggregate root owned by the running console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub entrant: Entrant,
    #[serde(default)]
    pub rounds: RoundRecorder,
    #[serde(default)]
    pub roster: EntryRoster,
    #[serde(default)]
    pub leaderboard: Leaderboard,
    #[serde(default)]
    pub auto_commit: bool,
}

impl SessionState {
    /// Starts on the first entrant of `roster`.
    pub fn with_roster(roster: EntryRoster) -> Self {
        Self {
            entrant: roster.current(),
            rounds: RoundRecorder::new(),
            roster,
            leaderboard: Leaderboard::new(),
            auto_commit: false,
        }
    }

    /// Repairs invariants that storage cannot guarantee.
    pub fn normalize(&mut self) {
        self.roster.normalize();
        self.leaderboard.normalize();
    }

    /// Moves to the next entrant and drops the per-entrant records.
    /// The leaderboard is left untouched.
    pub fn rotate(&mut self) -> crate::Result<&Entrant> {
        let next = self.roster.advance()?.clone();
        self.entrant = next;
        self.rounds.clear_all();
        Ok(&self.entrant)
    }

    /// Commits the current entrant's best time to the leaderboard.
    pub fn commit_best_time(&mut self) -> crate::Result<usize> {
        let robot = self.entrant.robot_or_default().to_string();
        self.leaderboard
            .upsert(&self.entrant.key(), &robot, self.rounds.best_time())
    }

    pub fn current_position(&self) -> Option<usize> {
        self.rounds
            .best_time()
            .map(|best| self.leaderboard.rank_of(best))
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::with_roster(EntryRoster::placeholder())
    }
}
