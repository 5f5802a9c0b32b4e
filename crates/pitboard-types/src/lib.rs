//! Shared domain types for the Pitboard race timing console.

pub mod clock;
pub mod config;
pub mod events;
pub mod leaderboard;
pub mod roster;
pub mod rounds;
pub mod session;
pub mod time_codec;
pub mod view;

mod errors;

pub use errors::{PitboardError, Result};
