//! Gate signal state machine driving the live timer panel.

use std::time::{Duration, Instant};

use pitboard_types::{
    clock::Stopwatch,
    events::DeviceEvent,
    view::{LiveDisplay, TimerTone},
};
use tracing::debug;

/// Follow-up work the console schedules after a handled event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BridgeAction {
    ScheduleCommit { value: f64, after: Duration },
    ScheduleRestart { after: Duration },
}

#[derive(Debug, Clone)]
pub struct DeviceEventBridge {
    stopwatch: Stopwatch,
    display: LiveDisplay,
    received: Option<f64>,
    rearm_pending: bool,
    auto_commit_delay: Duration,
    restart_delay: Duration,
}

impl DeviceEventBridge {
    pub fn new(auto_commit_delay: Duration, restart_delay: Duration) -> Self {
        Self {
            stopwatch: Stopwatch::new(),
            display: LiveDisplay::default(),
            received: None,
            rearm_pending: false,
            auto_commit_delay,
            restart_delay,
        }
    }

    pub fn handle(
        &mut self,
        event: DeviceEvent,
        now: Instant,
        auto_commit: bool,
    ) -> Option<BridgeAction> {
        match event {
            DeviceEvent::Start => {
                self.rearm_pending = false;
                self.start(now);
                None
            }
            DeviceEvent::TimeReport(value) => {
                self.rearm_pending = false;
                self.stopwatch.stop(now);
                self.show(value, TimerTone::Final);
                self.received = Some(value);
                auto_commit.then_some(BridgeAction::ScheduleCommit {
                    value,
                    after: self.auto_commit_delay,
                })
            }
            DeviceEvent::Restart => {
                self.reset();
                self.rearm_pending = true;
                Some(BridgeAction::ScheduleRestart {
                    after: self.restart_delay,
                })
            }
            // Display only; a pending re-arm and a running stopwatch survive.
            DeviceEvent::Ready => {
                let seconds = match self.stopwatch.elapsed(now) {
                    Some(elapsed) => elapsed.as_secs_f64(),
                    None => 0.0,
                };
                self.show(seconds, TimerTone::Ready);
                None
            }
        }
    }

    /// Starts the stopwatch if a `Restart` is still pending, i.e. no start,
    /// time report, toggle or reset came in since. Returns whether it started.
    pub fn rearm(&mut self, now: Instant) -> bool {
        if !std::mem::take(&mut self.rearm_pending) {
            debug!("Skipping stopwatch re-arm, timer was taken over");
            return false;
        }
        self.start(now);
        true
    }

    /// Returns `true` when the stopwatch is running afterwards.
    pub fn toggle(&mut self, now: Instant) -> bool {
        self.rearm_pending = false;
        match self.stopwatch.stop(now) {
            Some(elapsed) => {
                self.show(elapsed.as_secs_f64(), TimerTone::Idle);
                false
            }
            None => {
                self.start(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.rearm_pending = false;
        self.stopwatch = Stopwatch::new();
        self.show(0.0, TimerTone::Idle);
    }

    /// Refreshes the display from the monotonic start; `None` when idle.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        let elapsed = self.stopwatch.elapsed(now)?.as_secs_f64();
        self.display.seconds = elapsed;
        Some(elapsed)
    }

    pub fn set_received(&mut self, value: Option<f64>) {
        self.received = value;
    }

    pub fn received_time(&self) -> Option<f64> {
        self.received
    }

    pub fn display(&self) -> LiveDisplay {
        self.display
    }

    pub fn is_running(&self) -> bool {
        self.stopwatch.is_running()
    }

    fn start(&mut self, now: Instant) {
        self.stopwatch.start(now);
        self.show(0.0, TimerTone::Running);
    }

    fn show(&mut self, seconds: f64, tone: TimerTone) {
        self.display = LiveDisplay { seconds, tone };
    }
}
