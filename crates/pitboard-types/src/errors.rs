use thiserror::Error;

pub type Result<T, E = PitboardError> = std::result::Result<T, E>;

/// Unified error type covering common failure scenarios across subsystems.
#[derive(Debug, Error)]
pub enum PitboardError {
    #[error("invalid time value: {0}")]
    Format(String),
    #[error("record index {index} out of range (records: {len})")]
    Index { index: usize, len: usize },
    #[error("no valid time records for the current entrant")]
    NoValidRecords,
    #[error("entry roster is empty")]
    EmptyRoster,
    #[error("entry source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("entry source encoding error: {0}")]
    Encoding(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("device error: {0}")]
    Device(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error("console error: {0}")]
    Console(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PitboardError {
    /// Validation and empty-precondition failures leave state untouched and
    /// are shown to the operator as a warning rather than an error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PitboardError::Format(_)
                | PitboardError::Index { .. }
                | PitboardError::NoValidRecords
                | PitboardError::EmptyRoster
                | PitboardError::SourceUnavailable(_)
                | PitboardError::Encoding(_)
        )
    }
}
