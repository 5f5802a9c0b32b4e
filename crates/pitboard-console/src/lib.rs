//! Console core: owns the session and serialises operator commands, gate
//! signals and timer ticks on a single task.

pub mod bridge;
mod hub;

use std::{path::PathBuf, time::Duration};

use futures::{stream::BoxStream, StreamExt};
use pitboard_device::DeviceEventSource;
use pitboard_entries::FileEntrySource;
use pitboard_ops::{KeyValueStore, PersistenceGateway};
use pitboard_types::{
    clock::{ClockTick, RoundClock},
    config::PitboardConfig,
    events::{DeviceEvent, LifecyclePhase, Notice, NoticeLevel, SystemEvent},
    leaderboard::DISPLAY_ROWS,
    roster::Entrant,
    rounds::MAX_ROUNDS,
    session::SessionState,
    time_codec,
    view::{ConnectionStatus, ConsoleView},
    PitboardError, Result,
};
use tokio::{
    sync::mpsc,
    time::{interval_at, Instant, Interval, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

pub use bridge::{BridgeAction, DeviceEventBridge};
pub use hub::EventHub;

const COMMAND_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 256;
const ROUND_CLOCK_PERIOD: Duration = Duration::from_secs(1);

/// Operator requests accepted by the console.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    ConnectDevice,
    DisconnectDevice,
    ToggleStopwatch,
    ResetStopwatch,
    ToggleRoundClock,
    ResetRoundClock,
    /// Typed time (`MM:SS.mmm` or seconds) that becomes the received time.
    EnterTime(String),
    CommitReceived,
    Retire,
    RemoveRecord(usize),
    ClearRecords,
    NextEntrant,
    EditEntrant(Entrant),
    ToggleAutoCommit,
    UpdateLeaderboard,
    ClearLeaderboard,
    LoadRoster(PathBuf),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Deferred {
    Commit(f64),
    Rearm,
}

#[derive(Debug)]
enum Input {
    Command(ConsoleCommand),
    Deferred(Deferred),
}

/// Timing knobs taken from [`PitboardConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsoleSettings {
    pub auto_commit_delay: Duration,
    pub restart_delay: Duration,
    pub live_refresh: Duration,
    pub round_clock_secs: u32,
}

impl ConsoleSettings {
    pub fn from_config(config: &PitboardConfig) -> Self {
        Self {
            auto_commit_delay: Duration::from_millis(config.device.auto_commit_delay_ms),
            restart_delay: Duration::from_millis(config.device.restart_delay_ms),
            live_refresh: Duration::from_millis(config.timing.live_refresh_ms),
            round_clock_secs: config.timing.round_clock_secs,
        }
    }
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self::from_config(&PitboardConfig::default())
    }
}

/// Cloneable sender side handed to the UI.
#[derive(Clone)]
pub struct ConsoleHandle {
    tx: mpsc::Sender<Input>,
    hub: EventHub,
}

impl ConsoleHandle {
    pub async fn send(&self, command: ConsoleCommand) -> Result<()> {
        self.tx
            .send(Input::Command(command))
            .await
            .map_err(|_| console_error("console has stopped"))
    }

    /// For callers outside the runtime, such as the terminal UI thread.
    pub fn blocking_send(&self, command: ConsoleCommand) -> Result<()> {
        self.tx
            .blocking_send(Input::Command(command))
            .map_err(|_| console_error("console has stopped"))
    }

    pub fn subscribe(&self) -> BoxStream<'static, SystemEvent> {
        self.hub.subscribe()
    }
}

pub struct Console<D, S>
where
    D: DeviceEventSource,
    S: KeyValueStore,
{
    settings: ConsoleSettings,
    state: SessionState,
    bridge: DeviceEventBridge,
    round_clock: RoundClock,
    device: D,
    device_events: Option<BoxStream<'static, DeviceEvent>>,
    persistence: PersistenceGateway<S>,
    hub: EventHub,
    tx: mpsc::Sender<Input>,
    rx: mpsc::Receiver<Input>,
}

impl<D, S> Console<D, S>
where
    D: DeviceEventSource,
    S: KeyValueStore,
{
    pub fn new(
        settings: ConsoleSettings,
        state: SessionState,
        device: D,
        persistence: PersistenceGateway<S>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        Self {
            bridge: DeviceEventBridge::new(settings.auto_commit_delay, settings.restart_delay),
            round_clock: RoundClock::new(settings.round_clock_secs),
            settings,
            state,
            device,
            device_events: None,
            persistence,
            hub: EventHub::new(EVENT_CAPACITY),
            tx,
            rx,
        }
    }

    pub fn handle(&self) -> ConsoleHandle {
        ConsoleHandle {
            tx: self.tx.clone(),
            hub: self.hub.clone(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Processes inputs until [`ConsoleCommand::Shutdown`] and returns the
    /// final session.
    pub async fn run(mut self) -> Result<SessionState> {
        let mut frame_tick = ticker(self.settings.live_refresh);
        let mut clock_tick = ticker(ROUND_CLOCK_PERIOD);

        self.hub
            .publish(SystemEvent::lifecycle(LifecyclePhase::Ready, "console ready"));
        self.publish_view();

        loop {
            let measuring = self.bridge.is_running();
            let counting = self.round_clock.is_running();

            tokio::select! {
                input = self.rx.recv() => match input {
                    Some(Input::Command(ConsoleCommand::Shutdown)) | None => break,
                    Some(Input::Command(command)) => self.handle_command(command).await,
                    Some(Input::Deferred(action)) => self.handle_deferred(action),
                },
                event = next_device_event(&mut self.device_events) => match event {
                    Some(event) => self.handle_device_event(event),
                    None => self.on_link_lost(),
                },
                _ = frame_tick.tick(), if measuring => {
                    self.bridge.tick(now());
                }
                _ = clock_tick.tick(), if counting => self.on_clock_tick(),
            }

            if !measuring && self.bridge.is_running() {
                frame_tick.reset();
            }
            if !counting && self.round_clock.is_running() {
                clock_tick.reset();
            }
            self.publish_view();
        }

        if let Err(err) = self.device.disconnect().await {
            warn!("Gate disconnect on shutdown failed: {err}");
        }
        self.save();
        self.hub
            .publish(SystemEvent::lifecycle(LifecyclePhase::Shutdown, "console stopped"));
        info!("Console stopped");
        Ok(self.state)
    }

    pub fn view(&self) -> ConsoleView {
        let connection = if self.device_events.is_some() && self.device.is_connected() {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        };
        ConsoleView {
            entrant: self.state.entrant.clone(),
            roster_index: self.state.roster.index(),
            roster_len: self.state.roster.len(),
            records: self.state.rounds.records().to_vec(),
            current_round: self.state.rounds.next_round(),
            max_rounds: MAX_ROUNDS,
            best_time: self.state.rounds.best_time(),
            position: self.state.current_position(),
            standings: self.state.leaderboard.top(DISPLAY_ROWS).to_vec(),
            received_time: self.bridge.received_time(),
            live: self.bridge.display(),
            stopwatch_running: self.bridge.is_running(),
            round_clock_secs: self.round_clock.remaining_secs(),
            round_clock_running: self.round_clock.is_running(),
            auto_commit: self.state.auto_commit,
            connection,
        }
    }

    async fn handle_command(&mut self, command: ConsoleCommand) {
        debug!("Console command {:?}", command);
        let result = match command {
            ConsoleCommand::ConnectDevice => self.connect_device().await,
            ConsoleCommand::DisconnectDevice => self.disconnect_device().await,
            ConsoleCommand::ToggleStopwatch => {
                self.bridge.toggle(now());
                Ok(())
            }
            ConsoleCommand::ResetStopwatch => {
                self.bridge.reset();
                Ok(())
            }
            ConsoleCommand::ToggleRoundClock => {
                if !self.round_clock.toggle() && self.round_clock.remaining_secs() == 0 {
                    self.notify(Notice::warning("Round clock has run out, reset it first"));
                }
                Ok(())
            }
            ConsoleCommand::ResetRoundClock => {
                self.round_clock.reset();
                Ok(())
            }
            ConsoleCommand::EnterTime(text) => time_codec::parse(&text).map(|time| {
                self.bridge.set_received(Some(time));
            }),
            ConsoleCommand::CommitReceived => self.commit_received(),
            ConsoleCommand::Retire => {
                self.state.rounds.commit_retirement();
                self.save();
                self.notify(Notice::info(format!(
                    "Round {}: retired",
                    self.last_round_label()
                )));
                Ok(())
            }
            ConsoleCommand::RemoveRecord(index) => {
                self.state.rounds.remove_at(index).map(|removed| {
                    self.save();
                    self.notify(Notice::info(format!("Removed round {}", removed.round)));
                })
            }
            ConsoleCommand::ClearRecords => {
                self.state.rounds.clear_all();
                self.save();
                self.notify(Notice::info("All records cleared"));
                Ok(())
            }
            ConsoleCommand::NextEntrant => self.next_entrant(),
            ConsoleCommand::EditEntrant(entrant) => {
                self.state.entrant = entrant;
                self.save();
                Ok(())
            }
            ConsoleCommand::ToggleAutoCommit => {
                self.state.auto_commit = !self.state.auto_commit;
                self.save();
                let state = if self.state.auto_commit { "on" } else { "off" };
                self.notify(Notice::info(format!("Auto-commit {state}")));
                Ok(())
            }
            ConsoleCommand::UpdateLeaderboard => self.state.commit_best_time().map(|position| {
                self.save();
                self.notify(Notice::info(format!(
                    "{} is P{position} on the leaderboard",
                    self.state.entrant.name
                )));
            }),
            ConsoleCommand::ClearLeaderboard => {
                self.state.leaderboard.clear();
                self.save();
                self.notify(Notice::info("Leaderboard cleared"));
                Ok(())
            }
            ConsoleCommand::LoadRoster(path) => self.load_roster(path).await,
            ConsoleCommand::Shutdown => Ok(()),
        };

        if let Err(err) = result {
            self.report(err);
        }
    }

    fn handle_deferred(&mut self, action: Deferred) {
        match action {
            Deferred::Commit(value) => {
                if self.state.rounds.commit_time(value) {
                    self.save();
                    self.notify(Notice::info(format!(
                        "Round {}: {} (auto)",
                        self.last_round_label(),
                        time_codec::format(Some(value))
                    )));
                } else {
                    warn!("Dropping auto-commit of unusable time {value}");
                }
            }
            Deferred::Rearm => {
                if self.bridge.rearm(now()) {
                    debug!("Stopwatch re-armed after gate restart");
                }
            }
        }
    }

    fn handle_device_event(&mut self, event: DeviceEvent) {
        debug!("Gate event {:?}", event);
        if let DeviceEvent::TimeReport(value) = event {
            info!("Gate reported {}", time_codec::format(Some(value)));
        }
        if let Some(action) = self.bridge.handle(event, now(), self.state.auto_commit) {
            self.schedule(action);
        }
    }

    fn on_link_lost(&mut self) {
        self.device_events = None;
        self.notify(Notice::warning(format!(
            "Lost link to timing gate {}",
            self.device.describe()
        )));
    }

    fn on_clock_tick(&mut self) {
        if self.round_clock.tick() == ClockTick::TimeUp {
            self.notify(Notice::warning("Time up!"));
        }
    }

    async fn connect_device(&mut self) -> Result<()> {
        if self.device_events.is_some() && self.device.is_connected() {
            self.notify(Notice::info("Timing gate already connected"));
            return Ok(());
        }
        self.device.connect().await?;
        self.device_events = Some(self.device.subscribe());
        self.notify(Notice::info(format!(
            "Timing gate connected ({})",
            self.device.describe()
        )));
        Ok(())
    }

    async fn disconnect_device(&mut self) -> Result<()> {
        self.device_events = None;
        self.device.disconnect().await?;
        self.notify(Notice::info("Timing gate disconnected"));
        Ok(())
    }

    fn commit_received(&mut self) -> Result<()> {
        let Some(time) = self.bridge.received_time() else {
            self.notify(Notice::warning("No time received yet"));
            return Ok(());
        };
        if !self.state.rounds.commit_time(time) {
            return Err(PitboardError::Format(time_codec::format(Some(time))));
        }
        self.save();
        self.notify(Notice::info(format!(
            "Round {}: {}",
            self.last_round_label(),
            time_codec::format(Some(time))
        )));
        Ok(())
    }

    fn next_entrant(&mut self) -> Result<()> {
        let entrant = self.state.rotate()?.clone();
        self.start_fresh_entrant();
        self.notify(Notice::info(format!(
            "Now timing {} {}",
            entrant.number, entrant.name
        )));
        Ok(())
    }

    async fn load_roster(&mut self, path: PathBuf) -> Result<()> {
        let import = FileEntrySource::new(path).read().await?;
        let skipped = import.diagnostics.len();
        self.state.roster = import.roster;
        self.state.entrant = self.state.roster.current();
        self.state.rounds.clear_all();
        self.start_fresh_entrant();

        let mut message = format!("Loaded {} entrants", self.state.roster.len());
        if skipped > 0 {
            message.push_str(&format!(", skipped {skipped} rows"));
        }
        self.notify(Notice::info(message));
        Ok(())
    }

    fn start_fresh_entrant(&mut self) {
        self.round_clock.reset();
        self.bridge.set_received(None);
        self.save();
    }

    fn schedule(&self, action: BridgeAction) {
        let (after, input) = match action {
            BridgeAction::ScheduleCommit { value, after } => {
                (after, Input::Deferred(Deferred::Commit(value)))
            }
            BridgeAction::ScheduleRestart { after } => (after, Input::Deferred(Deferred::Rearm)),
        };
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if tx.send(input).await.is_err() {
                debug!("Console gone before deferred action fired");
            }
        });
    }

    fn last_round_label(&self) -> u32 {
        self.state
            .rounds
            .records()
            .last()
            .map_or(0, |record| record.round)
    }

    fn save(&mut self) {
        if let Err(err) = self.persistence.save(&self.state) {
            self.report(err);
        }
    }

    fn report(&self, err: PitboardError) {
        if err.is_recoverable() {
            self.notify(Notice::warning(err.to_string()));
        } else {
            self.notify(Notice::error(err.to_string()));
        }
    }

    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!("{}", notice.message),
            NoticeLevel::Warning => warn!("{}", notice.message),
            NoticeLevel::Error => error!("{}", notice.message),
        }
        self.hub.publish(SystemEvent::notice(notice));
    }

    fn publish_view(&self) {
        self.hub.publish(SystemEvent::view(self.view()));
    }
}

fn ticker(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

fn now() -> std::time::Instant {
    Instant::now().into_std()
}

async fn next_device_event(
    events: &mut Option<BoxStream<'static, DeviceEvent>>,
) -> Option<DeviceEvent> {
    match events.as_mut() {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

pub fn console_error(message: impl Into<String>) -> PitboardError {
    PitboardError::Console(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use pitboard_device::{DeviceInjector, LocalDevice};
    use pitboard_ops::MemoryStore;
    use pitboard_types::{events::EventPayload, view::TimerTone};
    use tokio::{task::JoinHandle, time::sleep};

    struct Harness {
        handle: ConsoleHandle,
        gate: DeviceInjector,
        store: MemoryStore,
        events: BoxStream<'static, SystemEvent>,
        task: JoinHandle<Result<SessionState>>,
    }

    impl Harness {
        fn start(settings: ConsoleSettings, state: SessionState) -> Self {
            let device = LocalDevice::new();
            let gate = device.injector();
            let store = MemoryStore::new();
            let console = Console::new(
                settings,
                state,
                device,
                PersistenceGateway::new(store.clone()),
            );
            let handle = console.handle();
            let events = handle.subscribe();
            let task = tokio::spawn(console.run());
            Self {
                handle,
                gate,
                store,
                events,
                task,
            }
        }

        async fn send(&self, command: ConsoleCommand) {
            self.handle.send(command).await.expect("console running");
            settle().await;
        }

        async fn connected(state: SessionState) -> Self {
            let harness = Self::start(ConsoleSettings::default(), state);
            harness.send(ConsoleCommand::ConnectDevice).await;
            harness
        }

        fn stored(&self) -> SessionState {
            PersistenceGateway::new(self.store.clone()).load()
        }

        /// Drains everything published so far.
        fn drain(&mut self) -> (Option<ConsoleView>, Vec<Notice>) {
            let mut view = None;
            let mut notices = Vec::new();
            while let Some(Some(event)) = self.events.next().now_or_never() {
                match event.payload {
                    EventPayload::View(latest) => view = Some(*latest),
                    EventPayload::Notice(notice) => notices.push(notice),
                    EventPayload::Lifecycle(_) => {}
                }
            }
            (view, notices)
        }

        async fn finish(self) -> SessionState {
            self.handle
                .send(ConsoleCommand::Shutdown)
                .await
                .expect("console running");
            self.task.await.expect("join").expect("run")
        }
    }

    async fn settle() {
        sleep(Duration::from_millis(1)).await;
    }

    fn auto_commit_state() -> SessionState {
        SessionState {
            auto_commit: true,
            ..SessionState::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn auto_commit_lands_after_delay() {
        let harness = Harness::connected(auto_commit_state()).await;
        harness.gate.send(DeviceEvent::TimeReport(12.5));

        sleep(Duration::from_millis(400)).await;
        assert!(harness.stored().rounds.is_empty());

        sleep(Duration::from_millis(200)).await;
        let stored = harness.stored();
        assert_eq!(stored.rounds.len(), 1);
        assert_eq!(stored.rounds.best_time(), Some(12.5));

        harness.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn manual_commit_before_deferred_keeps_both() {
        let harness = Harness::connected(auto_commit_state()).await;
        harness.gate.send(DeviceEvent::TimeReport(12.0));
        settle().await;
        harness.send(ConsoleCommand::CommitReceived).await;
        sleep(Duration::from_millis(600)).await;

        let state = harness.finish().await;
        let rounds: Vec<(u32, Option<f64>)> = state
            .rounds
            .records()
            .iter()
            .map(|record| (record.round, record.time))
            .collect();
        assert_eq!(rounds, vec![(1, Some(12.0)), (2, Some(12.0))]);
    }

    #[tokio::test(start_paused = true)]
    async fn time_report_without_auto_commit_only_sets_received() {
        let mut harness = Harness::connected(SessionState::default()).await;
        harness.gate.send_signal("TIME:01:02.500").expect("signal");
        sleep(Duration::from_secs(1)).await;

        let (view, _) = harness.drain();
        let view = view.expect("view");
        assert_eq!(view.received_time, Some(62.5));
        assert_eq!(view.live.tone, TimerTone::Final);
        assert!(view.records.is_empty());
        assert_eq!(view.connection, ConnectionStatus::Connected);
        harness.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn restart_rearms_stopwatch() {
        let mut harness = Harness::connected(SessionState::default()).await;
        harness.gate.send(DeviceEvent::Start);
        settle().await;
        harness.gate.send(DeviceEvent::Restart);
        settle().await;
        let (view, _) = harness.drain();
        let view = view.expect("view");
        assert!(!view.stopwatch_running);
        assert_eq!(view.live.seconds, 0.0);

        sleep(Duration::from_millis(600)).await;
        let (view, _) = harness.drain();
        let view = view.expect("view");
        assert!(view.stopwatch_running);
        assert_eq!(view.live.tone, TimerTone::Running);
        harness.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn ready_after_restart_still_rearms() {
        let mut harness = Harness::connected(SessionState::default()).await;
        harness.gate.send(DeviceEvent::Start);
        settle().await;
        harness.gate.send(DeviceEvent::Restart);
        settle().await;
        sleep(Duration::from_millis(50)).await;
        harness.gate.send(DeviceEvent::Ready);
        settle().await;
        let (view, _) = harness.drain();
        let view = view.expect("view");
        assert_eq!(view.live.tone, TimerTone::Ready);
        assert!(!view.stopwatch_running);

        sleep(Duration::from_millis(700)).await;
        let (view, _) = harness.drain();
        let view = view.expect("view");
        assert!(view.stopwatch_running);
        assert_eq!(view.live.tone, TimerTone::Running);
        harness.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn ready_keeps_run_going() {
        let mut harness = Harness::connected(SessionState::default()).await;
        harness.gate.send(DeviceEvent::Start);
        settle().await;
        harness.gate.send(DeviceEvent::Ready);
        settle().await;
        let (view, _) = harness.drain();
        assert!(view.expect("view").stopwatch_running);
        harness.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn live_display_follows_stopwatch() {
        let mut harness = Harness::start(ConsoleSettings::default(), SessionState::default());
        harness.send(ConsoleCommand::ToggleStopwatch).await;
        sleep(Duration::from_millis(1500)).await;

        let (view, _) = harness.drain();
        let live = view.expect("view").live;
        assert!(live.seconds > 1.4 && live.seconds < 1.6, "{}", live.seconds);

        harness.send(ConsoleCommand::ToggleStopwatch).await;
        let (view, _) = harness.drain();
        let view = view.expect("view");
        assert!(!view.stopwatch_running);
        assert_eq!(view.live.tone, TimerTone::Idle);
        assert!(view.live.seconds >= live.seconds);

        // No frames while stopped.
        sleep(Duration::from_secs(1)).await;
        assert!(harness.drain().0.is_none());
        harness.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn round_clock_runs_out() {
        let settings = ConsoleSettings {
            round_clock_secs: 3,
            ..ConsoleSettings::default()
        };
        let mut harness = Harness::start(settings, SessionState::default());
        harness.send(ConsoleCommand::ToggleRoundClock).await;
        sleep(Duration::from_millis(1500)).await;
        let (view, _) = harness.drain();
        assert_eq!(view.expect("view").round_clock_secs, 2);

        sleep(Duration::from_secs(2)).await;
        let (view, notices) = harness.drain();
        let view = view.expect("view");
        assert_eq!(view.round_clock_secs, 0);
        assert!(!view.round_clock_running);
        assert!(notices.iter().any(|notice| notice.message == "Time up!"));

        harness.send(ConsoleCommand::ToggleRoundClock).await;
        let (_, notices) = harness.drain();
        assert_eq!(notices[0].level, NoticeLevel::Warning);
        harness.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn every_mutation_is_saved() {
        let harness = Harness::start(ConsoleSettings::default(), SessionState::default());
        harness.send(ConsoleCommand::EnterTime("10.5".into())).await;
        harness.send(ConsoleCommand::CommitReceived).await;
        assert_eq!(harness.stored().rounds.best_time(), Some(10.5));

        harness.send(ConsoleCommand::Retire).await;
        assert_eq!(harness.stored().rounds.len(), 2);

        harness.send(ConsoleCommand::ToggleAutoCommit).await;
        assert!(harness.stored().auto_commit);

        harness.send(ConsoleCommand::UpdateLeaderboard).await;
        assert_eq!(harness.stored().leaderboard.len(), 1);

        harness.send(ConsoleCommand::RemoveRecord(0)).await;
        let stored = harness.stored();
        assert_eq!(stored.rounds.len(), 1);
        assert_eq!(stored.rounds.records()[0].round, 2);

        harness.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn rotation_resets_entrant_scope() {
        let settings = ConsoleSettings {
            round_clock_secs: 10,
            ..ConsoleSettings::default()
        };
        let mut harness = Harness::start(settings, SessionState::default());
        harness.send(ConsoleCommand::EnterTime("9.9".into())).await;
        harness.send(ConsoleCommand::CommitReceived).await;
        harness.send(ConsoleCommand::UpdateLeaderboard).await;
        harness.send(ConsoleCommand::ToggleRoundClock).await;
        sleep(Duration::from_millis(2500)).await;

        harness.send(ConsoleCommand::NextEntrant).await;
        let (view, _) = harness.drain();
        let view = view.expect("view");
        assert_eq!(view.entrant.number, "#002");
        assert!(view.records.is_empty());
        assert_eq!(view.received_time, None);
        assert_eq!(view.round_clock_secs, 10);
        assert!(!view.round_clock_running);
        assert_eq!(view.standings.len(), 1);

        let stored = harness.stored();
        assert_eq!(stored.entrant.number, "#002");
        assert_eq!(stored.roster.index(), 1);
        harness.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_inputs_become_warnings() {
        let mut harness = Harness::start(ConsoleSettings::default(), SessionState::default());
        harness.send(ConsoleCommand::EnterTime("abc".into())).await;
        harness.send(ConsoleCommand::RemoveRecord(3)).await;
        harness.send(ConsoleCommand::UpdateLeaderboard).await;
        harness.send(ConsoleCommand::CommitReceived).await;

        let (view, notices) = harness.drain();
        assert_eq!(notices.len(), 4);
        assert!(notices
            .iter()
            .all(|notice| notice.level == NoticeLevel::Warning));
        let view = view.expect("view");
        assert!(view.records.is_empty());
        assert!(view.standings.is_empty());
        assert_eq!(view.received_time, None);
        harness.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn leaderboard_position_and_clear() {
        let mut harness = Harness::start(ConsoleSettings::default(), SessionState::default());
        harness.send(ConsoleCommand::EnterTime("00:12.000".into())).await;
        harness.send(ConsoleCommand::CommitReceived).await;
        harness.send(ConsoleCommand::UpdateLeaderboard).await;
        harness.send(ConsoleCommand::NextEntrant).await;
        harness.send(ConsoleCommand::EnterTime("11".into())).await;
        harness.send(ConsoleCommand::CommitReceived).await;

        let (view, _) = harness.drain();
        assert_eq!(view.expect("view").position, Some(1));

        harness.send(ConsoleCommand::UpdateLeaderboard).await;
        let (view, _) = harness.drain();
        let view = view.expect("view");
        assert_eq!(view.standings[0].number, "#002");
        assert_eq!(view.standings[1].number, "#001");

        harness.send(ConsoleCommand::ClearLeaderboard).await;
        assert!(harness.stored().leaderboard.is_empty());
        harness.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn load_roster_replaces_entrants() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("entry_lists.csv");
        std::fs::write(&path, "No,Name,Robot\n7,Grace,Zip\n8,Alan\nbroken\n").expect("write");

        let mut harness = Harness::start(ConsoleSettings::default(), SessionState::default());
        harness.send(ConsoleCommand::LoadRoster(path)).await;

        let (view, notices) = harness.drain();
        let view = view.expect("view");
        assert_eq!(view.roster_len, 2);
        assert_eq!(view.entrant.number, "#007");
        assert!(notices
            .iter()
            .any(|notice| notice.message == "Loaded 2 entrants, skipped 1 rows"));

        harness
            .send(ConsoleCommand::LoadRoster(dir.path().join("missing.csv")))
            .await;
        assert_eq!(harness.stored().roster.len(), 2);
        harness.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_returns_final_state() {
        let harness = Harness::start(ConsoleSettings::default(), SessionState::default());
        harness
            .send(ConsoleCommand::EditEntrant(Entrant::new("#042", "Ada", "Byte")))
            .await;
        let state = harness.finish().await;
        assert_eq!(state.entrant.number, "#042");
        assert_eq!(state.entrant.robot_name, "Byte");
    }
}
