//! Conversion between elapsed seconds and the `MM:SS.mmm` display form.

use crate::{PitboardError, Result};

/// Shown wherever a time has not been recorded yet.
pub const NO_TIME: &str = "--:--.---";

/// Formats seconds as `MM:SS.mmm`, or [`NO_TIME`] when absent.
///
/// Rounding happens on whole milliseconds before splitting into minutes, so
/// values just below a minute boundary roll over instead of printing `60.000`.
pub fn format(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds.filter(|s| s.is_finite() && *s >= 0.0) else {
        return NO_TIME.to_string();
    };
    let total_ms = (seconds * 1000.0).round() as u64;
    let minutes = total_ms / 60_000;
    let rem = total_ms % 60_000;
    format!("{:02}:{:02}.{:03}", minutes, rem / 1000, rem % 1000)
}

/// Bare `SS.mmm` form used by the live stopwatch readout.
pub fn format_seconds(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "00.000".to_string();
    }
    let total_ms = (seconds * 1000.0).round() as u64;
    format!("{:02}.{:03}", total_ms / 1000, total_ms % 1000)
}

/// Formats whole seconds as `MM:SS` for the round clock.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Parses either `MM:SS.mmm` (split on the first colon) or bare seconds.
pub fn parse(display: &str) -> Result<f64> {
    let trimmed = display.trim();
    if trimmed.is_empty() {
        return Err(PitboardError::Format("empty time value".into()));
    }

    let seconds = match trimmed.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes = parse_component(minutes, display)?;
            let seconds = parse_component(seconds, display)?;
            minutes * 60.0 + seconds
        }
        None => parse_component(trimmed, display)?,
    };
    Ok(seconds)
}

fn parse_component(part: &str, input: &str) -> Result<f64> {
    let value: f64 = part
        .trim()
        .parse()
        .map_err(|_| PitboardError::Format(format!("'{input}' is not a time")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(PitboardError::Format(format!(
            "'{input}' is out of range"
        )));
    }
    Ok(value)
}
