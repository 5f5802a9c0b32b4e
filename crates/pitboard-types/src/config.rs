use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{clock::DEFAULT_ROUND_CLOCK_SECS, PitboardError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// No gate attached; times are entered by hand.
    #[default]
    None,
    /// Line-oriented signals from a TCP bridge in front of the gate.
    Tcp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub kind: DeviceKind,
    pub address: Option<String>,
    pub auto_commit_delay_ms: u64,
    pub restart_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    pub round_clock_secs: u32,
    pub live_refresh_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsConfig {
    pub log_level: String,
    pub log_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PitboardConfig {
    pub device: DeviceConfig,
    pub timing: TimingConfig,
    pub roster: RosterConfig,
    pub storage: StorageConfig,
    pub ops: OpsConfig,
}

impl PitboardConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            PitboardError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            PitboardError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.device.kind == DeviceKind::Tcp
            && self
                .device
                .address
                .as_deref()
                .map_or(true, |addr| addr.trim().is_empty())
        {
            return Err(PitboardError::Configuration(
                "device.address is required when device.kind = \"tcp\"".into(),
            ));
        }
        if self.device.auto_commit_delay_ms == 0 {
            return Err(PitboardError::Configuration(
                "device.auto_commit_delay_ms must be greater than zero".into(),
            ));
        }
        if self.device.restart_delay_ms == 0 {
            return Err(PitboardError::Configuration(
                "device.restart_delay_ms must be greater than zero".into(),
            ));
        }
        if self.timing.round_clock_secs == 0 {
            return Err(PitboardError::Configuration(
                "timing.round_clock_secs must be greater than zero".into(),
            ));
        }
        if self.timing.live_refresh_ms == 0 {
            return Err(PitboardError::Configuration(
                "timing.live_refresh_ms must be greater than zero".into(),
            ));
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err(PitboardError::Configuration(
                "storage.data_dir must not be empty".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PitboardConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig {
                kind: DeviceKind::None,
                address: None,
                auto_commit_delay_ms: 500,
                restart_delay_ms: 500,
            },
            timing: TimingConfig {
                round_clock_secs: DEFAULT_ROUND_CLOCK_SECS,
                live_refresh_ms: 16,
            },
            roster: RosterConfig {
                source: Some("entry_lists.csv".into()),
            },
            storage: StorageConfig {
                data_dir: "pitboard-data".into(),
            },
            ops: OpsConfig {
                log_level: "info".into(),
                log_file: Some("pitboard.log".into()),
            },
        }
    }
}
