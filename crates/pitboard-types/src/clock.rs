use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Default length of the round clock (five minutes).
pub const DEFAULT_ROUND_CLOCK_SECS: u32 = 300;

/// Free-running stopwatch anchored on a monotonic instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stopwatch {
    started_at: Option<Instant>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from zero at `now`. Restarting a running stopwatch re-anchors it.
    pub fn start(&mut self, now: Instant) {
        self.started_at = Some(now);
    }

    /// Stops and returns the elapsed time, or `None` if it was not running.
    pub fn stop(&mut self, now: Instant) -> Option<Duration> {
        self.started_at
            .take()
            .map(|start| now.saturating_duration_since(start))
    }

    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.started_at
            .map(|start| now.saturating_duration_since(start))
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }
}

/// Outcome of one round clock tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTick {
    Idle,
    Remaining(u32),
    TimeUp,
}

/// Countdown shown next to the round records, decremented once per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundClock {
    length_secs: u32,
    remaining_secs: u32,
    #[serde(skip)]
    running: bool,
}

impl RoundClock {
    pub fn new(length_secs: u32) -> Self {
        Self {
            length_secs,
            remaining_secs: length_secs,
            running: false,
        }
    }

    /// Returns `false` when there is nothing left to count down.
    pub fn start(&mut self) -> bool {
        if self.remaining_secs == 0 {
            return false;
        }
        self.running = true;
        true
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn toggle(&mut self) -> bool {
        if self.running {
            self.stop();
            false
        } else {
            self.start()
        }
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.remaining_secs = self.length_secs;
    }

    pub fn tick(&mut self) -> ClockTick {
        if !self.running {
            return ClockTick::Idle;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.running = false;
            ClockTick::TimeUp
        } else {
            ClockTick::Remaining(self.remaining_secs)
        }
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl Default for RoundClock {
    fn default() -> Self {
        Self::new(DEFAULT_ROUND_CLOCK_SECS)
    }
}
