//! Core simulation services
//!
//! Contains the clock, configuration, event plumbing and tick statistics
//! shared by every agent in a session.

mod config;
mod events;
mod stats;
mod time;

pub use config::{ConfigError, NavConfig};
pub use events::{BotEvent, EventQueue, PathFailure};
pub use stats::TickStats;
pub use time::{Countdown, SimClock, Stopwatch, UpdateTimer};
