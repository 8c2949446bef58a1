//! Locomotion
//!
//! Movement primitives for agents: approach steering, ledge climbs,
//! gap jumps, ladders, and the stuck monitor. Commands accumulate
//! intent; the per-tick [`Locomotion::integrate`] step resolves intent
//! into an actual position change, so no command ever blocks.
//!
//! # Design Principles
//!
//! - **Intent, then integration**: `approach` and friends only record
//!   what the agent wants. Movement happens once per tick, in order.
//! - **Queries are cheap**: callers poll ground/stuck/action state
//!   every tick; all queries read cached state.
//! - **Probes are stateless**: geometry probes take the world view as
//!   an argument and leave no residue in the component.

mod ground;

pub use ground::GroundLocomotion;

use glam::Vec3;
use hecs::Entity;

use crate::agent::{Body, BotCtx};
use crate::core::BotEvent;
use crate::nav::LadderId;
use crate::path::MoverCaps;
use crate::world::WorldView;

// ============================================================================
// Probe Results
// ============================================================================

/// How soon a blocked route must open up.
///
/// Immediate urgency treats breakable obstacles as solid; eventual
/// urgency assumes the agent will smash or open them on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Immediate,
    Eventual,
}

/// Outcome of a traversability probe.
#[derive(Debug, Clone, Copy)]
pub struct Traversability {
    /// The probe hull fits the whole way.
    pub clear: bool,
    /// Fraction of the sweep completed before blocking.
    pub fraction: f32,
}

impl Traversability {
    pub const CLEAR: Traversability = Traversability {
        clear: true,
        fraction: 1.0,
    };
}

// ============================================================================
// Locomotion Trait
// ============================================================================

/// Movement capability of an agent.
///
/// Command methods record intent. Per tick the owning agent calls
/// `update` (stuck monitoring, action progression) and then
/// `integrate` (intent becomes displacement). Queries reflect the
/// state after the most recent integration.
pub trait Locomotion {
    /// Capability name for logging.
    fn name(&self) -> &'static str;

    /// Drops all intent, action state and stuck tracking.
    fn reset(&mut self);

    /// Per-tick bookkeeping: action timeouts and the stuck monitor.
    fn update(&mut self, ctx: &mut BotCtx<'_>);

    /// Reacts to agent events.
    fn on_event(&mut self, _ctx: &mut BotCtx<'_>, _event: &BotEvent) {}

    /// Resolves accumulated intent into the new feet position.
    fn integrate(&mut self, view: WorldView<'_>, pos: Vec3, dt: f32) -> Vec3;

    // ===== Movement primitives =====

    /// Accumulates a movement request toward `goal`, blended by
    /// `weight` against other requests this tick.
    fn approach(&mut self, goal: Vec3, weight: f32);

    /// Authoritative placement at the next integration.
    fn drive_to(&mut self, pos: Vec3);

    /// Turns the agent toward `target` over the coming ticks.
    fn face_towards(&mut self, target: Vec3);

    /// Most recent facing request, if any.
    fn face_target(&self) -> Option<Vec3>;

    /// Starts an immediate vertical jump.
    fn jump(&mut self);

    /// Starts a jump-and-climb to a ledge top. Returns false if the
    /// locomotor cannot climb right now.
    fn climb_ledge(&mut self, top: Vec3, forward: Vec3) -> bool;

    /// Starts a running jump aimed at `landing`.
    fn jump_across_gap(&mut self, landing: Vec3, forward: Vec3);

    /// Attaches to a ladder and begins ascending or descending.
    fn mount_ladder(&mut self, ladder: LadderId, ascending: bool);

    fn set_desired_speed(&mut self, speed: f32);

    /// Clears movement intent for this tick.
    fn stop(&mut self);

    // ===== State queries =====

    /// Current horizontal speed.
    fn speed(&self) -> f32;

    fn desired_speed(&self) -> f32;

    /// Current velocity, valid after the last integration.
    fn velocity(&self) -> Vec3;

    /// Unit direction of accumulated movement intent.
    fn desired_motion(&self) -> Vec3;

    fn is_on_ground(&self) -> bool;

    fn ground_normal(&self) -> Vec3;

    /// True during ledge climbs, gap jumps and plain jumps.
    fn is_climbing_or_jumping(&self) -> bool;

    fn is_on_ladder(&self) -> bool;

    fn is_stuck(&self) -> bool;

    /// Seconds spent stuck, zero when unstuck.
    fn stuck_duration(&self, now: f64) -> f32;

    /// Forgives the current stuck state and re-anchors the monitor.
    fn clear_stuck(&mut self, now: f64);

    // ===== Capabilities =====

    fn run_speed(&self) -> f32;

    fn walk_speed(&self) -> f32;

    fn max_acceleration(&self) -> f32;

    fn max_deceleration(&self) -> f32;

    /// Tallest rise the agent steps over without jumping.
    fn step_height(&self) -> f32;

    /// Tallest ledge the agent can jump-climb.
    fn max_jump_height(&self) -> f32;

    /// Tallest fall the agent survives.
    fn death_drop_height(&self) -> f32;

    // ===== Geometry probes =====

    /// Would a probe hull clear the route from `from` to `to`?
    fn is_potentially_traversable(
        &self,
        view: WorldView<'_>,
        from: Vec3,
        to: Vec3,
        urgency: Urgency,
    ) -> Traversability;

    /// Is there a drop at `pos` too deep to step down?
    fn is_gap(&self, view: WorldView<'_>, pos: Vec3) -> bool;

    /// Can the agent pass through or past this entity, eventually or
    /// right now?
    fn is_entity_traversable(&self, view: WorldView<'_>, entity: Entity, urgency: Urgency) -> bool;
}

/// Movement capabilities for path computation, read off the live
/// locomotion and body.
#[must_use]
pub fn mover_caps(loco: &dyn Locomotion, body: &dyn Body) -> MoverCaps {
    MoverCaps::new(
        body.stand_hull(),
        loco.step_height(),
        loco.max_jump_height(),
        loco.death_drop_height(),
    )
}

// ============================================================================
// Null Locomotion
// ============================================================================

/// Immobile stand-in for agents that never move.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLocomotion;

impl Locomotion for NullLocomotion {
    fn name(&self) -> &'static str {
        "null locomotion"
    }

    fn reset(&mut self) {}

    fn update(&mut self, _ctx: &mut BotCtx<'_>) {}

    fn integrate(&mut self, _view: WorldView<'_>, pos: Vec3, _dt: f32) -> Vec3 {
        pos
    }

    fn approach(&mut self, _goal: Vec3, _weight: f32) {}

    fn drive_to(&mut self, _pos: Vec3) {}

    fn face_towards(&mut self, _target: Vec3) {}

    fn face_target(&self) -> Option<Vec3> {
        None
    }

    fn jump(&mut self) {}

    fn climb_ledge(&mut self, _top: Vec3, _forward: Vec3) -> bool {
        false
    }

    fn jump_across_gap(&mut self, _landing: Vec3, _forward: Vec3) {}

    fn mount_ladder(&mut self, _ladder: LadderId, _ascending: bool) {}

    fn set_desired_speed(&mut self, _speed: f32) {}

    fn stop(&mut self) {}

    fn speed(&self) -> f32 {
        0.0
    }

    fn desired_speed(&self) -> f32 {
        0.0
    }

    fn velocity(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn desired_motion(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn is_on_ground(&self) -> bool {
        true
    }

    fn ground_normal(&self) -> Vec3 {
        Vec3::Y
    }

    fn is_climbing_or_jumping(&self) -> bool {
        false
    }

    fn is_on_ladder(&self) -> bool {
        false
    }

    fn is_stuck(&self) -> bool {
        false
    }

    fn stuck_duration(&self, _now: f64) -> f32 {
        0.0
    }

    fn clear_stuck(&mut self, _now: f64) {}

    fn run_speed(&self) -> f32 {
        0.0
    }

    fn walk_speed(&self) -> f32 {
        0.0
    }

    fn max_acceleration(&self) -> f32 {
        0.0
    }

    fn max_deceleration(&self) -> f32 {
        0.0
    }

    fn step_height(&self) -> f32 {
        0.0
    }

    fn max_jump_height(&self) -> f32 {
        0.0
    }

    fn death_drop_height(&self) -> f32 {
        0.0
    }

    fn is_potentially_traversable(
        &self,
        _view: WorldView<'_>,
        _from: Vec3,
        _to: Vec3,
        _urgency: Urgency,
    ) -> Traversability {
        Traversability::CLEAR
    }

    fn is_gap(&self, _view: WorldView<'_>, _pos: Vec3) -> bool {
        false
    }

    fn is_entity_traversable(
        &self,
        _view: WorldView<'_>,
        _entity: Entity,
        _urgency: Urgency,
    ) -> bool {
        true
    }
}
