//! Collision trace boundary.
//!
//! Locomotion probes, ledge detection and obstacle avoidance all reduce
//! to a handful of geometric queries. This module defines those queries
//! as the [`TraceService`] trait; [`RapierTraceWorld`](super::RapierTraceWorld)
//! answers them against real collision geometry, and [`ClearTrace`] is
//! the empty-world stand-in for tests.
//!
//! Hull positions are *feet* positions: the bottom-center of the box.

use glam::Vec3;
use hecs::Entity;

/// Axis-aligned collision box, square in cross-section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hull {
    pub width: f32,
    pub height: f32,
}

impl Hull {
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Half-extents of the box.
    #[must_use]
    pub fn half_extents(&self) -> Vec3 {
        Vec3::new(self.width * 0.5, self.height * 0.5, self.width * 0.5)
    }

    /// Offset from feet to box center.
    #[must_use]
    pub fn center_offset(&self) -> Vec3 {
        Vec3::new(0.0, self.height * 0.5, 0.0)
    }

    /// Reduced hull for permissive reachability probes.
    #[must_use]
    pub fn probe(&self) -> Hull {
        Hull::new(self.width * 0.5, self.height * 0.5)
    }
}

/// What a sweep ran into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Entity owning the hit geometry, `None` for world geometry.
    pub entity: Option<Entity>,
    /// World-space contact point.
    pub point: Vec3,
    /// Contact normal, pointing back along the sweep.
    pub normal: Vec3,
}

/// Result of sweeping a hull along a movement delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepResult {
    /// Fraction of the delta covered before the hit; 1.0 means clear.
    pub fraction: f32,
    pub contact: Option<Contact>,
}

impl SweepResult {
    /// A sweep that covered the full delta.
    #[must_use]
    pub fn clear() -> Self {
        Self {
            fraction: 1.0,
            contact: None,
        }
    }

    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.contact.is_none()
    }

    /// Feet position where the sweep stopped.
    #[must_use]
    pub fn end_position(&self, start: Vec3, delta: Vec3) -> Vec3 {
        start + delta * self.fraction
    }
}

/// Geometric queries agents put to the collision world.
pub trait TraceService {
    /// Sweeps `hull` from the feet position `start` along `delta`.
    fn sweep_hull(&self, start: Vec3, delta: Vec3, hull: Hull) -> SweepResult;

    /// Unobstructed straight line between two points (typically eyes to
    /// target center).
    fn line_of_sight(&self, from: Vec3, to: Vec3) -> bool;

    /// True when atmosphere hides `to` from `from` regardless of
    /// geometry.
    fn fog_obscures(&self, from: Vec3, to: Vec3) -> bool;

    /// True when the point is embedded in solid geometry.
    fn point_solid(&self, pos: Vec3) -> bool;
}

/// Trace service for an empty world: every query comes back clear.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClearTrace;

impl TraceService for ClearTrace {
    fn sweep_hull(&self, _start: Vec3, _delta: Vec3, _hull: Hull) -> SweepResult {
        SweepResult::clear()
    }

    fn line_of_sight(&self, _from: Vec3, _to: Vec3) -> bool {
        true
    }

    fn fog_obscures(&self, _from: Vec3, _to: Vec3) -> bool {
        false
    }

    fn point_solid(&self, _pos: Vec3) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hull_extents() {
        let hull = Hull::new(26.0, 68.0);
        assert_eq!(hull.half_extents(), Vec3::new(13.0, 34.0, 13.0));
        assert_eq!(hull.center_offset(), Vec3::new(0.0, 34.0, 0.0));

        let probe = hull.probe();
        assert!((probe.width - 13.0).abs() < f32::EPSILON);
        assert!((probe.height - 34.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_sweep_result_end_position() {
        let result = SweepResult {
            fraction: 0.5,
            contact: Some(Contact {
                entity: None,
                point: Vec3::ZERO,
                normal: Vec3::X,
            }),
        };
        let end = result.end_position(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0));
        assert_eq!(end, Vec3::new(50.0, 0.0, 0.0));
        assert!(!result.is_clear());
    }

    #[test]
    fn test_clear_trace_answers() {
        let trace = ClearTrace;
        let sweep = trace.sweep_hull(Vec3::ZERO, Vec3::X * 100.0, Hull::new(26.0, 68.0));
        assert!(sweep.is_clear());
        assert!((sweep.fraction - 1.0).abs() < f32::EPSILON);
        assert!(trace.line_of_sight(Vec3::ZERO, Vec3::new(0.0, 0.0, -500.0)));
        assert!(!trace.fog_obscures(Vec3::ZERO, Vec3::X));
        assert!(!trace.point_solid(Vec3::ZERO));
    }
}
