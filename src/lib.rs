//! Autonomous agent navigation for real-time 3D simulation
//!
//! This crate provides:
//! - Perception with reaction-time recognition and known-entity memory
//! - A* path planning over a walkable-area graph, with geometric
//!   detail passes for drops, climbs, gaps and ladders
//! - A phased path follower driving steering, avoidance and jumps
//! - An agent framework wiring vision, intention, locomotion and body
//!   capabilities together through queued events
//! - A fixed-tick simulation session with hecs-backed world state

pub mod agent;
pub mod core;
pub mod loco;
pub mod nav;
pub mod path;
pub mod sim;
pub mod world;

// Re-exports for convenience
pub use glam;
pub use hecs;
pub use rapier3d;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::agent::{
        Body, Bot, BotBuilder, BotCtx, BotVision, Intention, KnownEntity, PursueIntention,
        StandardBody, Vision,
    };
    pub use crate::core::{BotEvent, EventQueue, NavConfig, PathFailure, SimClock, TickStats};
    pub use crate::loco::{GroundLocomotion, Locomotion};
    pub use crate::nav::{AreaId, AreaMesh, Dir, NavGraph};
    pub use crate::path::{MoverCaps, Path, PathFollower, ShortestPathCost};
    pub use crate::sim::{BotId, Simulation};
    pub use crate::world::{
        ClearTrace, Name, RapierTraceWorld, Team, TraceService, Transform, Velocity, WorldView,
    };
    pub use glam::{Quat, Vec2, Vec3};
    pub use hecs::Entity;
}
