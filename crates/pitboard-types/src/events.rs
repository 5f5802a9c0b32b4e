use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{time_codec, view::ConsoleView, PitboardError, Result};

/// Signals pushed by the timing gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DeviceEvent {
    Start,
    TimeReport(f64),
    Restart,
    Ready,
}

impl DeviceEvent {
    pub const START: &'static str = "START";
    pub const TIME_PREFIX: &'static str = "TIME:";
    pub const RESTART: &'static str = "RESTART";
    pub const READY: &'static str = "READY";

    /// Parses one textual notification payload (`START`, `TIME:12.345`, ...).
    pub fn parse(signal: &str) -> Result<Self> {
        let signal = signal.trim();
        match signal {
            Self::START => Ok(DeviceEvent::Start),
            Self::RESTART => Ok(DeviceEvent::Restart),
            Self::READY => Ok(DeviceEvent::Ready),
            other => match other.strip_prefix(Self::TIME_PREFIX) {
                Some(value) => time_codec::parse(value).map(DeviceEvent::TimeReport),
                None => Err(PitboardError::Device(format!(
                    "unknown device signal '{other}'"
                ))),
            },
        }
    }

    pub fn to_signal(&self) -> String {
        match self {
            DeviceEvent::Start => Self::START.to_string(),
            DeviceEvent::TimeReport(value) => format!("{}{value:.3}", Self::TIME_PREFIX),
            DeviceEvent::Restart => Self::RESTART.to_string(),
            DeviceEvent::Ready => Self::READY.to_string(),
        }
    }
}

/// High-level kinds of messages published by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Lifecycle,
    View,
    Notice,
}

/// Immutable event envelope handed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Lifecycle(LifecycleEvent),
    View(Box<ConsoleView>),
    Notice(Notice),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub phase: LifecyclePhase,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LifecyclePhase {
    Boot,
    Ready,
    Shutdown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Operator-facing message (confirmation, warning or failure).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl SystemEvent {
    pub fn new(kind: EventKind, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn view(view: ConsoleView) -> Self {
        Self::new(EventKind::View, EventPayload::View(Box::new(view)))
    }

    pub fn notice(notice: Notice) -> Self {
        Self::new(EventKind::Notice, EventPayload::Notice(notice))
    }

    pub fn lifecycle(phase: LifecyclePhase, details: impl Into<String>) -> Self {
        Self::new(
            EventKind::Lifecycle,
            EventPayload::Lifecycle(LifecycleEvent {
                phase,
                details: Some(details.into()),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_device_signals() {
        assert_eq!(DeviceEvent::parse("START").unwrap(), DeviceEvent::Start);
        assert_eq!(DeviceEvent::parse("RESTART\r\n").unwrap(), DeviceEvent::Restart);
        assert_eq!(DeviceEvent::parse(" READY").unwrap(), DeviceEvent::Ready);
        assert_eq!(
            DeviceEvent::parse("TIME:12.345").unwrap(),
            DeviceEvent::TimeReport(12.345)
        );
    }

    #[test]
    fn reject_unknown_or_malformed_signals() {
        assert!(matches!(
            DeviceEvent::parse("HELLO"),
            Err(PitboardError::Device(_))
        ));
        assert!(matches!(
            DeviceEvent::parse("TIME:abc"),
            Err(PitboardError::Format(_))
        ));
    }

    #[test]
    fn signal_text_round_trips() {
        let event = DeviceEvent::TimeReport(9.5);
        assert_eq!(event.to_signal(), "TIME:9.500");
        assert_eq!(DeviceEvent::parse(&event.to_signal()).unwrap(), event);
    }
}
