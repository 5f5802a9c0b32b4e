mod ui;

use std::{
    path::{Path, PathBuf},
    sync::mpsc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use pitboard_console::{Console, ConsoleCommand, ConsoleSettings};
use pitboard_device::device_from_config;
use pitboard_entries::{placeholder_import, FileEntrySource};
use pitboard_ops::{
    ensure_data_dir, init_tracing, FileStore, KeyValueStore, LogTarget, PersistenceGateway,
};
use pitboard_types::{
    config::{DeviceKind, PitboardConfig},
    session::SessionState,
    time_codec,
};
use tracing::info;
use ui::UiMessage;

const DEFAULT_CONFIG_PATH: &str = "pitboard.toml";

#[derive(Parser)]
#[command(name = "pitboard", version, about = "Race timing console for robot time trials")]
struct Cli {
    /// Config file; falls back to ./pitboard.toml, then built-in defaults.
    #[arg(short, long, env = "PITBOARD_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Open the timing console (default).
    Run,
    /// Replace the stored roster with an entry list file.
    Import { path: PathBuf },
    /// Print the stored leaderboard.
    Standings,
    /// Forget the current session; standings are kept unless --all is given.
    Reset {
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    let command = cli.command.unwrap_or(Command::Run);

    let target = match command {
        Command::Run => LogTarget::File,
        _ => LogTarget::Stdout,
    };
    init_tracing(&config.ops, target)?;

    let data_dir = ensure_data_dir(&config.storage.data_dir)?;
    let mut persistence = PersistenceGateway::new(FileStore::new(data_dir)?);

    match command {
        Command::Run => run_console(&config, persistence).await,
        Command::Import { path } => import_roster(&mut persistence, &path).await,
        Command::Standings => {
            print_standings(&persistence);
            Ok(())
        }
        Command::Reset { all } => {
            persistence.reset_session()?;
            if all {
                persistence.reset_leaderboard()?;
            }
            println!("Session reset{}", if all { " (standings cleared)" } else { "" });
            Ok(())
        }
    }
}

async fn run_console<S>(config: &PitboardConfig, persistence: PersistenceGateway<S>) -> Result<()>
where
    S: KeyValueStore + 'static,
{
    let state = initial_state(config, &persistence).await;
    let device = device_from_config(&config.device)?;
    let summary = format!("{} · {}", device.describe(), config.storage.data_dir);
    let console = Console::new(
        ConsoleSettings::from_config(config),
        state,
        device,
        persistence,
    );
    let handle = console.handle();

    let (ui_tx, ui_rx) = mpsc::channel();
    let closer = ui_tx.clone();
    let mut events = handle.subscribe();
    let forward = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            if ui_tx.send(UiMessage::Event(event)).is_err() {
                break;
            }
        }
    });

    let ui_handle = handle.clone();
    let ui = tokio::task::spawn_blocking(move || {
        let result = ui::run(ui_rx, ui_handle.clone(), summary);
        // Ignored when the console already stopped.
        let _ = ui_handle.blocking_send(ConsoleCommand::Shutdown);
        result
    });

    if config.device.kind != DeviceKind::None {
        handle.send(ConsoleCommand::ConnectDevice).await?;
    }

    let final_state = console.run().await?;
    let _ = closer.send(UiMessage::Shutdown);
    forward.abort();
    ui.await.context("terminal UI panicked")??;

    info!(
        "Session closed on {} {} with {} records",
        final_state.entrant.number,
        final_state.entrant.name,
        final_state.rounds.len()
    );
    Ok(())
}

/// Stored session when there is one, otherwise a fresh session on the
/// configured entry list.
async fn initial_state<S: KeyValueStore>(
    config: &PitboardConfig,
    persistence: &PersistenceGateway<S>,
) -> SessionState {
    let mut state = persistence.load();
    if persistence.has_session() {
        return state;
    }
    let import = match &config.roster.source {
        Some(path) => FileEntrySource::new(path).read_or_placeholder().await,
        None => placeholder_import(),
    };
    state.roster = import.roster;
    state.entrant = state.roster.current();
    state
}

async fn import_roster<S: KeyValueStore>(
    persistence: &mut PersistenceGateway<S>,
    path: &Path,
) -> Result<()> {
    let import = FileEntrySource::new(path).read().await?;
    for diagnostic in &import.diagnostics {
        println!("skipped line {}: {}", diagnostic.line, diagnostic.reason);
    }

    let mut state = persistence.load();
    state.roster = import.roster;
    state.entrant = state.roster.current();
    state.rounds.clear_all();
    persistence.save(&state)?;

    println!(
        "Imported {} entrants from {} ({})",
        state.roster.len(),
        path.display(),
        import
            .encoding
            .map(|encoding| encoding.to_string())
            .unwrap_or_default()
    );
    Ok(())
}

fn print_standings<S: KeyValueStore>(persistence: &PersistenceGateway<S>) {
    let leaderboard = persistence.load().leaderboard;
    if leaderboard.is_empty() {
        println!("No standings yet");
        return;
    }
    for (rank, entry) in leaderboard.entries().iter().enumerate() {
        println!(
            "{:>3}. {:<32} {}",
            rank + 1,
            entry.display_name(),
            time_codec::format(Some(entry.best_time))
        );
    }
}

fn load_config(explicit: Option<&Path>) -> PitboardConfig {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => PathBuf::from(DEFAULT_CONFIG_PATH),
        None => return PitboardConfig::default(),
    };
    match PitboardConfig::from_file(&path) {
        Ok(cfg) => {
            if let Err(err) = cfg.validate() {
                eprintln!(
                    "Invalid config in '{}': {err}. Falling back to internal defaults.",
                    path.display()
                );
                PitboardConfig::default()
            } else {
                cfg
            }
        }
        Err(err) => {
            eprintln!(
                "Failed to load config from '{}': {err}. Falling back to internal defaults.",
                path.display()
            );
            PitboardConfig::default()
        }
    }
}
