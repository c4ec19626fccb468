//! Game session driven by explicit input commands.

pub mod commands;
pub mod handlers;
pub mod visibility;

pub use commands::{Command, DisplayUpdate, RoundSetup};
pub use handlers::{handle, SessionState};
pub use visibility::{StatsView, Visibility, VisibilityBuffer};
