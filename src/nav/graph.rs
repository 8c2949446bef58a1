//! Navigation graph boundary.
//!
//! The walkable-area graph belongs to the host game; agents only read it.
//! Everything here is the read-only vocabulary shared across that
//! boundary: area and ladder records, adjacency directions, attribute
//! flags, and the [`NavGraph`] trait a host implements to expose its
//! mesh. [`AreaMesh`](crate::nav::AreaMesh) is the bundled in-memory
//! implementation.
//!
//! Coordinates are Y-up. Areas are axis-aligned rectangles in the XZ
//! plane with a flat floor height.

use std::fmt;

use bitflags::bitflags;
use glam::Vec3;
use smallvec::SmallVec;

// ============================================================================
// Identifiers
// ============================================================================

/// Stable handle to a walkable area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AreaId(pub u32);

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "area#{}", self.0)
    }
}

/// Stable handle to a ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LadderId(pub u32);

impl fmt::Display for LadderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ladder#{}", self.0)
    }
}

// ============================================================================
// Directions
// ============================================================================

/// Cardinal adjacency direction in the XZ plane.
///
/// North is -Z, matching the engine's forward convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dir {
    North,
    East,
    South,
    West,
}

impl Dir {
    pub const COUNT: usize = 4;

    #[must_use]
    pub fn all() -> [Dir; 4] {
        [Dir::North, Dir::East, Dir::South, Dir::West]
    }

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Dir::North => 0,
            Dir::East => 1,
            Dir::South => 2,
            Dir::West => 3,
        }
    }

    #[must_use]
    pub fn opposite(self) -> Dir {
        match self {
            Dir::North => Dir::South,
            Dir::East => Dir::West,
            Dir::South => Dir::North,
            Dir::West => Dir::East,
        }
    }

    /// Unit vector pointing along this direction.
    #[must_use]
    pub fn vector(self) -> Vec3 {
        match self {
            Dir::North => Vec3::new(0.0, 0.0, -1.0),
            Dir::East => Vec3::new(1.0, 0.0, 0.0),
            Dir::South => Vec3::new(0.0, 0.0, 1.0),
            Dir::West => Vec3::new(-1.0, 0.0, 0.0),
        }
    }
}

bitflags! {
    /// Attribute flags carried by walkable areas.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AreaFlags: u32 {
        /// Hull must crouch to fit.
        const CROUCH = 1 << 0;
        /// Follow the area centerline closely.
        const PRECISE = 1 << 1;
        /// Never initiate jumps while inside.
        const NO_JUMP = 1 << 2;
        /// Come to a stop before leaving.
        const STOP = 1 << 3;
        /// Always run through.
        const RUN = 1 << 4;
        /// Always walk through.
        const WALK = 1 << 5;
        /// Route around unless there is no alternative.
        const AVOID = 1 << 6;
        /// Stairway; sloped travel between floors is expected here.
        const STAIRS = 1 << 7;
    }
}

// ============================================================================
// Areas and Ladders
// ============================================================================

/// One walkable rectangle of the navigation graph.
#[derive(Debug, Clone)]
pub struct Area {
    id: AreaId,
    mins: Vec3,
    maxs: Vec3,
    flags: AreaFlags,
    /// Outgoing adjacency per direction, indexed by [`Dir::index`].
    neighbors: [SmallVec<[AreaId; 4]>; 4],
    ladders_up: SmallVec<[LadderId; 2]>,
    ladders_down: SmallVec<[LadderId; 2]>,
}

impl Area {
    /// Creates a flat area spanning `mins..maxs` in XZ with its floor at
    /// `mins.y`.
    #[must_use]
    pub fn new(id: AreaId, mins: Vec3, maxs: Vec3) -> Self {
        Self {
            id,
            mins: mins.min(maxs),
            maxs: maxs.max(mins),
            flags: AreaFlags::empty(),
            neighbors: Default::default(),
            ladders_up: SmallVec::new(),
            ladders_down: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> AreaId {
        self.id
    }

    #[must_use]
    pub fn mins(&self) -> Vec3 {
        self.mins
    }

    #[must_use]
    pub fn maxs(&self) -> Vec3 {
        self.maxs
    }

    /// Floor height of the area.
    #[must_use]
    pub fn floor(&self) -> f32 {
        self.mins.y
    }

    /// Center of the area at floor height.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        let mid = (self.mins + self.maxs) * 0.5;
        Vec3::new(mid.x, self.floor(), mid.z)
    }

    #[must_use]
    pub fn flags(&self) -> AreaFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: AreaFlags) {
        self.flags = flags;
    }

    #[must_use]
    pub fn has_flag(&self, flag: AreaFlags) -> bool {
        self.flags.contains(flag)
    }

    /// True if `pos` lies over the area footprint, ignoring height.
    #[must_use]
    pub fn contains_xz(&self, pos: Vec3) -> bool {
        pos.x >= self.mins.x && pos.x <= self.maxs.x && pos.z >= self.mins.z && pos.z <= self.maxs.z
    }

    /// Closest point to `pos` inside the footprint, at floor height.
    #[must_use]
    pub fn clamp_xz(&self, pos: Vec3) -> Vec3 {
        Vec3::new(
            pos.x.clamp(self.mins.x, self.maxs.x),
            self.floor(),
            pos.z.clamp(self.mins.z, self.maxs.z),
        )
    }

    /// Squared horizontal distance from `pos` to the footprint.
    #[must_use]
    pub fn distance_sq_xz(&self, pos: Vec3) -> f32 {
        let closest = self.clamp_xz(pos);
        let dx = pos.x - closest.x;
        let dz = pos.z - closest.z;
        dx * dx + dz * dz
    }

    /// Neighbor areas reachable by walking out the given side.
    #[must_use]
    pub fn neighbors(&self, dir: Dir) -> &[AreaId] {
        &self.neighbors[dir.index()]
    }

    /// Iterates `(direction, neighbor)` over all four sides.
    pub fn neighbor_iter(&self) -> impl Iterator<Item = (Dir, AreaId)> + '_ {
        Dir::all()
            .into_iter()
            .flat_map(move |dir| self.neighbors(dir).iter().map(move |&id| (dir, id)))
    }

    /// Ladders whose bottom is in this area.
    #[must_use]
    pub fn ladders_up(&self) -> &[LadderId] {
        &self.ladders_up
    }

    /// Ladders whose top is in this area.
    #[must_use]
    pub fn ladders_down(&self) -> &[LadderId] {
        &self.ladders_down
    }

    pub fn add_neighbor(&mut self, dir: Dir, id: AreaId) {
        let slot = &mut self.neighbors[dir.index()];
        if !slot.contains(&id) {
            slot.push(id);
        }
    }

    pub fn add_ladder_up(&mut self, id: LadderId) {
        if !self.ladders_up.contains(&id) {
            self.ladders_up.push(id);
        }
    }

    pub fn add_ladder_down(&mut self, id: LadderId) {
        if !self.ladders_down.contains(&id) {
            self.ladders_down.push(id);
        }
    }
}

/// A climbable connection between a lower and an upper area.
#[derive(Debug, Clone)]
pub struct Ladder {
    id: LadderId,
    /// Mount point at the foot of the ladder.
    bottom: Vec3,
    /// Dismount point at the top.
    top: Vec3,
    /// Horizontal direction an agent faces while climbing.
    facing: Dir,
    bottom_area: AreaId,
    top_area: AreaId,
}

impl Ladder {
    #[must_use]
    pub fn new(
        id: LadderId,
        bottom: Vec3,
        top: Vec3,
        facing: Dir,
        bottom_area: AreaId,
        top_area: AreaId,
    ) -> Self {
        Self {
            id,
            bottom,
            top,
            facing,
            bottom_area,
            top_area,
        }
    }

    #[must_use]
    pub fn id(&self) -> LadderId {
        self.id
    }

    #[must_use]
    pub fn bottom(&self) -> Vec3 {
        self.bottom
    }

    #[must_use]
    pub fn top(&self) -> Vec3 {
        self.top
    }

    #[must_use]
    pub fn facing(&self) -> Dir {
        self.facing
    }

    #[must_use]
    pub fn bottom_area(&self) -> AreaId {
        self.bottom_area
    }

    #[must_use]
    pub fn top_area(&self) -> AreaId {
        self.top_area
    }

    /// Vertical rise from bottom to top.
    #[must_use]
    pub fn length(&self) -> f32 {
        (self.top.y - self.bottom.y).max(0.0)
    }
}

// ============================================================================
// Portals and Ground Queries
// ============================================================================

/// Opening along the shared boundary of two adjacent areas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Portal {
    /// Midpoint of the opening, at the source area's floor height.
    pub pos: Vec3,
    /// Half-extent of the opening along the boundary.
    pub half_width: f32,
}

impl Portal {
    /// Picks the crossing point nearest `toward`, keeping `margin` of
    /// clearance from the portal ends so a hull fits through.
    #[must_use]
    pub fn crossing(&self, dir: Dir, toward: Vec3, margin: f32) -> Vec3 {
        let half = (self.half_width - margin).max(0.0);
        match dir {
            // North/South boundaries run along X; East/West along Z.
            Dir::North | Dir::South => {
                let x = self.pos.x + (toward.x - self.pos.x).clamp(-half, half);
                Vec3::new(x, self.pos.y, self.pos.z)
            }
            Dir::East | Dir::West => {
                let z = self.pos.z + (toward.z - self.pos.z).clamp(-half, half);
                Vec3::new(self.pos.x, self.pos.y, z)
            }
        }
    }
}

/// Computes the opening between two areas adjacent along `dir`.
///
/// Degenerate adjacency (no overlap along the boundary) yields a
/// zero-width portal at the midpoint between the two extents.
#[must_use]
pub fn compute_portal(from: &Area, to: &Area, dir: Dir) -> Portal {
    let (lo, hi, boundary) = match dir {
        Dir::North => (
            from.mins().x.max(to.mins().x),
            from.maxs().x.min(to.maxs().x),
            from.mins().z,
        ),
        Dir::South => (
            from.mins().x.max(to.mins().x),
            from.maxs().x.min(to.maxs().x),
            from.maxs().z,
        ),
        Dir::East => (
            from.mins().z.max(to.mins().z),
            from.maxs().z.min(to.maxs().z),
            from.maxs().x,
        ),
        Dir::West => (
            from.mins().z.max(to.mins().z),
            from.maxs().z.min(to.maxs().z),
            from.mins().x,
        ),
    };

    let mid = (lo + hi) * 0.5;
    let half_width = ((hi - lo) * 0.5).max(0.0);
    let pos = match dir {
        Dir::North | Dir::South => Vec3::new(mid, from.floor(), boundary),
        Dir::East | Dir::West => Vec3::new(boundary, from.floor(), mid),
    };
    Portal { pos, half_width }
}

/// Result of a ground-height query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundInfo {
    /// Floor height at the queried point.
    pub height: f32,
    /// Surface normal, unit length.
    pub normal: Vec3,
    /// Area supplying the answer.
    pub area: AreaId,
}

// ============================================================================
// Graph Boundary
// ============================================================================

/// Read-only view of the host's walkable-area graph.
pub trait NavGraph {
    /// Looks up an area by id.
    fn area(&self, id: AreaId) -> Option<&Area>;

    /// Looks up a ladder by id.
    fn ladder(&self, id: LadderId) -> Option<&Ladder>;

    /// Number of areas in the graph.
    fn area_count(&self) -> usize;

    /// Area best matching a world position, if any is close enough.
    fn nearest_area(&self, pos: Vec3) -> Option<AreaId>;

    /// Walkable ground under (or near) a world position.
    fn ground_height(&self, pos: Vec3) -> Option<GroundInfo>;

    /// Opening between two areas adjacent along `dir`.
    fn portal(&self, from: AreaId, to: AreaId, dir: Dir) -> Option<Portal> {
        let from = self.area(from)?;
        let to = self.area(to)?;
        Some(compute_portal(from, to, dir))
    }
}

// ============================================================================
// Tests
// ============================================================================
