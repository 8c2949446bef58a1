//! World boundaries
//!
//! Traits through which agents see the host game (collision traces,
//! entity lookup, decision-layer judgment), plus the bundled
//! implementations of each.

mod entities;
mod policy;
mod rapier;
mod trace;
mod view;

pub use entities::{
    ActorInfo, EntityClass, EntityDirectory, EntityInfo, HecsDirectory, Name, Team, Transform,
    Velocity,
};
pub use policy::{DecisionPolicy, DefaultPolicy, ThreatPick};
pub use rapier::{ObstacleHandle, RapierTraceWorld};
pub use trace::{ClearTrace, Contact, Hull, SweepResult, TraceService};
pub use view::WorldView;
