//! Path segments.

use glam::Vec3;

use crate::nav::{AreaId, Dir, LadderId};

/// How a segment is traversed once reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Plain walking.
    Ground,
    /// Step off a ledge taller than step height.
    DropDown,
    /// Jump-and-climb up a wall no taller than max jump height.
    ClimbUp,
    /// Jump across a horizontal break in the ground.
    JumpGap,
    /// Ascend a ladder.
    LadderUp,
    /// Descend a ladder.
    LadderDown,
}

/// One hop of a computed path.
///
/// Produced in bulk by path computation; `forward`, `length`,
/// `distance_from_start` and `curvature` are filled by the finishing
/// pass and stay fixed until the next recompute.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    /// Area this hop lands in.
    pub area: AreaId,
    /// Direction the hop leaves the previous area through, when it
    /// crosses a portal.
    pub dir: Option<Dir>,
    /// World position of the hop.
    pub pos: Vec3,
    /// Ladder used, for ladder hops.
    pub ladder: Option<LadderId>,
    pub kind: SegmentKind,
    /// Unit direction toward the next segment.
    pub forward: Vec3,
    /// Distance to the next segment.
    pub length: f32,
    /// Distance accumulated from the start of the path.
    pub distance_from_start: f32,
    /// Signed turn sharpness at this segment: 0 straight, ±1 reversal,
    /// positive turning left.
    pub curvature: f32,
}

impl Segment {
    /// A raw hop awaiting the finishing pass.
    #[must_use]
    pub fn new(area: AreaId, pos: Vec3, kind: SegmentKind) -> Self {
        Self {
            area,
            dir: None,
            pos,
            ladder: None,
            kind,
            forward: Vec3::ZERO,
            length: 0.0,
            distance_from_start: 0.0,
            curvature: 0.0,
        }
    }

    #[must_use]
    pub fn with_dir(mut self, dir: Dir) -> Self {
        self.dir = Some(dir);
        self
    }

    #[must_use]
    pub fn with_ladder(mut self, ladder: LadderId) -> Self {
        self.ladder = Some(ladder);
        self
    }

    /// Forward direction flattened to the ground plane.
    #[must_use]
    pub fn forward_flat(&self) -> Vec3 {
        Vec3::new(self.forward.x, 0.0, self.forward.z).normalize_or_zero()
    }
}

/// Interpolated sample along a path, produced by cursor queries.
#[derive(Debug, Clone, Copy)]
pub struct PathCursor {
    pub pos: Vec3,
    pub forward: Vec3,
    pub curvature: f32,
}
