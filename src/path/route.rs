//! The computed route container.
//!
//! A [`Path`] is a bounded, ordered run of [`Segment`]s plus a cursor
//! for interpolated distance-along-path queries. Paths are owned by the
//! follower that computed them and are emptied (invalidated) rather
//! than destroyed on failure, so there is never a dangling route.

use glam::Vec3;
use hecs::Entity;

use super::segment::{PathCursor, Segment};

/// Hard cap on segments per path; the final slot is reserved for the
/// literal goal position.
pub const MAX_SEGMENTS: usize = 256;

/// Ordered segment list with a distance cursor.
#[derive(Debug, Default)]
pub struct Path {
    segments: Vec<Segment>,
    /// Distance along the path for interpolated queries.
    cursor: f32,
    /// Clock time the path was built.
    built_at: f64,
    /// Entity this path was computed toward, if any.
    target: Option<Entity>,
}

impl Path {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs freshly computed segments, resetting cursor and age.
    pub(crate) fn assign(&mut self, segments: Vec<Segment>, now: f64) {
        debug_assert!(segments.len() <= MAX_SEGMENTS);
        self.segments = segments;
        self.cursor = 0.0;
        self.built_at = now;
        self.finish();
    }

    /// Empties the path. Queries on an invalid path return `None`.
    pub fn invalidate(&mut self) {
        self.segments.clear();
        self.cursor = 0.0;
        self.target = None;
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.segments.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn first(&self) -> Option<&Segment> {
        self.segments.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    #[must_use]
    pub fn start_position(&self) -> Option<Vec3> {
        self.first().map(|s| s.pos)
    }

    #[must_use]
    pub fn end_position(&self) -> Option<Vec3> {
        self.last().map(|s| s.pos)
    }

    /// Total distance covered by the path.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.last().map_or(0.0, |s| s.distance_from_start)
    }

    /// Seconds since the path was built.
    #[must_use]
    pub fn age(&self, now: f64) -> f32 {
        if self.is_valid() {
            (now - self.built_at).max(0.0) as f32
        } else {
            0.0
        }
    }

    #[must_use]
    pub fn target(&self) -> Option<Entity> {
        self.target
    }

    pub fn set_target(&mut self, target: Option<Entity>) {
        self.target = target;
    }

    // ===== Cursor =====

    #[must_use]
    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    /// Places the cursor at an absolute distance along the path.
    pub fn set_cursor(&mut self, distance: f32) {
        self.cursor = distance.clamp(0.0, self.length());
    }

    /// Moves the cursor forward (or backward) by a relative distance.
    pub fn advance_cursor(&mut self, delta: f32) {
        self.set_cursor(self.cursor + delta);
    }

    /// Interpolated sample at the cursor.
    #[must_use]
    pub fn cursor_data(&self) -> Option<PathCursor> {
        self.sample(self.cursor)
    }

    /// Index of the segment containing a distance along the path.
    #[must_use]
    pub fn segment_index_at(&self, distance: f32) -> Option<usize> {
        if !self.is_valid() {
            return None;
        }
        let distance = distance.clamp(0.0, self.length());
        let mut index = 0;
        while index + 1 < self.segments.len()
            && self.segments[index + 1].distance_from_start <= distance
        {
            index += 1;
        }
        Some(index)
    }

    /// Interpolated position/direction/curvature at a distance along
    /// the path.
    #[must_use]
    pub fn sample(&self, distance: f32) -> Option<PathCursor> {
        let index = self.segment_index_at(distance)?;
        let seg = &self.segments[index];

        if index + 1 >= self.segments.len() || seg.length <= 1.0e-6 {
            return Some(PathCursor {
                pos: seg.pos,
                forward: seg.forward,
                curvature: seg.curvature,
            });
        }

        let next = &self.segments[index + 1];
        let t = ((distance.clamp(0.0, self.length()) - seg.distance_from_start) / seg.length)
            .clamp(0.0, 1.0);
        Some(PathCursor {
            pos: seg.pos.lerp(next.pos, t),
            forward: seg.forward,
            curvature: seg.curvature * (1.0 - t) + next.curvature * t,
        })
    }

    // ===== Finishing pass =====

    /// Fills the derived per-segment fields: forward vectors, lengths,
    /// cumulative distances and turn curvature.
    pub(crate) fn finish(&mut self) {
        let n = self.segments.len();
        if n == 0 {
            return;
        }

        // Forward and length per hop; the final segment inherits the
        // direction of the hop arriving at it.
        for i in 0..n - 1 {
            let delta = self.segments[i + 1].pos - self.segments[i].pos;
            let length = delta.length();
            self.segments[i].length = length;
            self.segments[i].forward = if length > 1.0e-6 {
                delta / length
            } else {
                Vec3::ZERO
            };
        }
        if n >= 2 {
            self.segments[n - 1].forward = self.segments[n - 2].forward;
        }
        self.segments[n - 1].length = 0.0;

        let mut total = 0.0;
        for seg in &mut self.segments {
            seg.distance_from_start = total;
            total += seg.length;
        }

        // Signed turn sharpness at interior vertices.
        self.segments[0].curvature = 0.0;
        self.segments[n - 1].curvature = 0.0;
        for i in 1..n.saturating_sub(1) {
            let into = flatten(self.segments[i].pos - self.segments[i - 1].pos);
            let out = flatten(self.segments[i + 1].pos - self.segments[i].pos);
            self.segments[i].curvature = if into == Vec3::ZERO || out == Vec3::ZERO {
                0.0
            } else {
                let sign = if into.cross(out).y >= 0.0 { 1.0 } else { -1.0 };
                sign * 0.5 * (1.0 - into.dot(out))
            };
        }
    }
}

fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z).normalize_or_zero()
}

// ============================================================================
// Tests
// ============================================================================
