//! In-memory walkable-area mesh.
//!
//! A small hand-buildable [`NavGraph`] implementation, used by the demo
//! binary and the test suites. Hosts with their own navigation data
//! implement [`NavGraph`] directly instead.

use glam::Vec3;

use super::graph::{Area, AreaFlags, AreaId, Dir, GroundInfo, Ladder, LadderId, NavGraph};

/// Vertical weighting applied when matching a position to an area.
/// Height mismatches count more than horizontal ones, so an agent on a
/// bridge does not match the tunnel below it.
const HEIGHT_WEIGHT: f32 = 4.0;

/// Hand-built collection of walkable areas and ladders.
///
/// # Example
///
/// ```
/// use botnav::nav::{AreaMesh, Dir, NavGraph};
/// use glam::Vec3;
///
/// let mut mesh = AreaMesh::new();
/// let a = mesh.add_area(Vec3::new(0.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 100.0));
/// let b = mesh.add_area(Vec3::new(100.0, 0.0, 0.0), Vec3::new(200.0, 0.0, 100.0));
/// mesh.connect_two_way(a, b, Dir::East);
/// assert_eq!(mesh.nearest_area(Vec3::new(150.0, 0.0, 50.0)), Some(b));
/// ```
#[derive(Debug, Default)]
pub struct AreaMesh {
    areas: Vec<Area>,
    ladders: Vec<Ladder>,
}

impl AreaMesh {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a flat rectangular area with its floor at `mins.y`.
    pub fn add_area(&mut self, mins: Vec3, maxs: Vec3) -> AreaId {
        let id = AreaId(self.areas.len() as u32);
        self.areas.push(Area::new(id, mins, maxs));
        id
    }

    /// Replaces the attribute flags of an area.
    pub fn set_flags(&mut self, id: AreaId, flags: AreaFlags) {
        match self.area_index(id) {
            Some(index) => self.areas[index].set_flags(flags),
            None => log::warn!("set_flags on unknown {id}"),
        }
    }

    /// Adds a one-way walk connection leaving `from` through its `dir` side.
    pub fn connect(&mut self, from: AreaId, to: AreaId, dir: Dir) {
        if self.area_index(to).is_none() {
            log::warn!("connect to unknown {to}");
            return;
        }
        match self.area_index(from) {
            Some(index) => self.areas[index].add_neighbor(dir, to),
            None => log::warn!("connect from unknown {from}"),
        }
    }

    /// Adds matching connections in both directions.
    pub fn connect_two_way(&mut self, a: AreaId, b: AreaId, dir: Dir) {
        self.connect(a, b, dir);
        self.connect(b, a, dir.opposite());
    }

    /// Adds a ladder and wires it into both end areas.
    pub fn add_ladder(
        &mut self,
        bottom: Vec3,
        top: Vec3,
        facing: Dir,
        bottom_area: AreaId,
        top_area: AreaId,
    ) -> LadderId {
        let id = LadderId(self.ladders.len() as u32);
        self.ladders
            .push(Ladder::new(id, bottom, top, facing, bottom_area, top_area));
        if let Some(index) = self.area_index(bottom_area) {
            self.areas[index].add_ladder_up(id);
        } else {
            log::warn!("ladder bottom in unknown {bottom_area}");
        }
        if let Some(index) = self.area_index(top_area) {
            self.areas[index].add_ladder_down(id);
        } else {
            log::warn!("ladder top in unknown {top_area}");
        }
        id
    }

    fn area_index(&self, id: AreaId) -> Option<usize> {
        let index = id.0 as usize;
        (index < self.areas.len()).then_some(index)
    }
}

impl NavGraph for AreaMesh {
    fn area(&self, id: AreaId) -> Option<&Area> {
        self.area_index(id).map(|index| &self.areas[index])
    }

    fn ladder(&self, id: LadderId) -> Option<&Ladder> {
        self.ladders.get(id.0 as usize)
    }

    fn area_count(&self) -> usize {
        self.areas.len()
    }

    fn nearest_area(&self, pos: Vec3) -> Option<AreaId> {
        // Containing areas win, resolved by closest floor height.
        let mut best: Option<(AreaId, f32)> = None;
        for area in &self.areas {
            let score = if area.contains_xz(pos) {
                let dy = pos.y - area.floor();
                dy * dy * HEIGHT_WEIGHT
            } else {
                let dy = pos.y - area.floor();
                area.distance_sq_xz(pos) + dy * dy * HEIGHT_WEIGHT
            };
            if best.is_none_or(|(_, b)| score < b) {
                best = Some((area.id(), score));
            }
        }
        best.map(|(id, _)| id)
    }

    fn ground_height(&self, pos: Vec3) -> Option<GroundInfo> {
        // Only areas directly under the point count; a position over a
        // void has no ground even if an area is nearby.
        let mut best: Option<&Area> = None;
        for area in &self.areas {
            if !area.contains_xz(pos) {
                continue;
            }
            let dy = (pos.y - area.floor()).abs();
            if best.is_none_or(|b| dy < (pos.y - b.floor()).abs()) {
                best = Some(area);
            }
        }
        best.map(|area| GroundInfo {
            height: area.floor(),
            normal: Vec3::Y,
            area: area.id(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
