//! Operational helpers: logging and session persistence.

pub mod persistence;

use std::{fs::OpenOptions, path::PathBuf, sync::Mutex};

use pitboard_types::{config::OpsConfig, PitboardError, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub use persistence::{FileStore, KeyValueStore, MemoryStore, PersistenceGateway};

/// Where log lines go. The terminal UI owns stdout, so it logs to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    File,
}

pub fn init_tracing(config: &OpsConfig, target: LogTarget) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| ops_error(format!("failed to create log filter: {err}")))?;

    match (target, config.log_file.as_deref()) {
        (LogTarget::File, Some(path)) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| ops_error(format!("unable to open log file {path}: {err}")))?;
            fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        (LogTarget::File, None) => fmt()
            .with_env_filter(filter)
            .with_writer(std::io::sink)
            .try_init(),
        (LogTarget::Stdout, _) => fmt().with_env_filter(filter).try_init(),
    }
    .map_err(|err| ops_error(format!("tracing init error: {err}")))?;
    Ok(())
}

pub fn ensure_data_dir(path: &str) -> Result<PathBuf> {
    let dir = PathBuf::from(path);
    std::fs::create_dir_all(&dir)
        .map_err(|err| ops_error(format!("failed to create data dir: {err}")))?;
    info!("Data directory ready at {:?}", dir);
    Ok(dir)
}

pub fn ops_error(message: impl Into<String>) -> PitboardError {
    PitboardError::Ops(message.into())
}
