//! Simulation harness: a session owning the clock, the entity store
//! and a registry of agents, stepped at a fixed interval.
//!
//! Sessions are plain values. A host embedding the crate builds one per
//! match or per test, ticks it, and drops it; there is no global
//! registry to reset between runs.

mod registry;
mod session;

pub use registry::{BotId, BotRegistry};
pub use session::Simulation;
