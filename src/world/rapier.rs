//! Trace service backed by rapier3d.
//!
//! Holds a static collider set (world geometry plus entity-tagged
//! obstacles) and answers the [`TraceService`] queries with shape casts
//! and ray casts. Nothing here steps a dynamics pipeline; agents are
//! integrated kinematically outside the collision world.

use glam::Vec3;
use hecs::Entity;
use rapier3d::na;
use rapier3d::parry::query::ShapeCastOptions;
use rapier3d::parry::shape::Cuboid;
use rapier3d::prelude::{
    ColliderBuilder, ColliderSet, IslandManager, QueryFilter, QueryPipeline, Ray, RigidBodySet,
};

use super::trace::{Contact, Hull, SweepResult, TraceService};

/// Handle to an obstacle registered with the trace world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObstacleHandle(pub rapier3d::geometry::ColliderHandle);

/// Convert a glam vector to nalgebra
fn to_na(v: Vec3) -> na::Vector3<f32> {
    na::Vector3::new(v.x, v.y, v.z)
}

/// Convert a glam vector to an nalgebra point
fn to_point(v: Vec3) -> na::Point3<f32> {
    na::Point3::new(v.x, v.y, v.z)
}

fn from_na(v: na::Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

/// Static collision world answering trace queries.
///
/// Entity-owned geometry carries the entity id in the collider's user
/// data, so sweeps can report who they ran into.
pub struct RapierTraceWorld {
    /// Rigid body set (stays empty; queries require one)
    bodies: RigidBodySet,
    /// Collider set holding all registered geometry
    colliders: ColliderSet,
    /// Island manager (only consulted when removing geometry)
    islands: IslandManager,
    /// Query acceleration structure
    query_pipeline: QueryPipeline,
    /// Visibility cutoff distance, if the map has fog
    fog_range: Option<f32>,
}

impl RapierTraceWorld {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            islands: IslandManager::new(),
            query_pipeline: QueryPipeline::new(),
            fog_range: None,
        }
    }

    /// Sets the distance beyond which fog hides everything.
    pub fn set_fog_range(&mut self, range: Option<f32>) {
        self.fog_range = range;
    }

    /// Registers an axis-aligned box of world geometry.
    pub fn add_box(&mut self, center: Vec3, half_extents: Vec3) -> ObstacleHandle {
        self.insert_box(center, half_extents, 0)
    }

    /// Registers an axis-aligned box owned by a game entity.
    pub fn add_entity_box(
        &mut self,
        entity: Entity,
        center: Vec3,
        half_extents: Vec3,
    ) -> ObstacleHandle {
        self.insert_box(center, half_extents, u128::from(entity.to_bits().get()))
    }

    /// Registers a floor slab whose walkable top sits at `top_y`.
    pub fn add_floor(&mut self, mins_xz: Vec3, maxs_xz: Vec3, top_y: f32) -> ObstacleHandle {
        const SLAB_THICKNESS: f32 = 10.0;
        let half = Vec3::new(
            (maxs_xz.x - mins_xz.x) * 0.5,
            SLAB_THICKNESS * 0.5,
            (maxs_xz.z - mins_xz.z) * 0.5,
        );
        let center = Vec3::new(
            (mins_xz.x + maxs_xz.x) * 0.5,
            top_y - SLAB_THICKNESS * 0.5,
            (mins_xz.z + maxs_xz.z) * 0.5,
        );
        self.add_box(center, half)
    }

    /// Removes previously registered geometry.
    pub fn remove(&mut self, handle: ObstacleHandle) {
        self.colliders
            .remove(handle.0, &mut self.islands, &mut self.bodies, false);
        self.query_pipeline.update(&self.colliders);
    }

    fn insert_box(&mut self, center: Vec3, half_extents: Vec3, user_data: u128) -> ObstacleHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(to_na(center))
            .user_data(user_data)
            .build();
        let handle = ObstacleHandle(self.colliders.insert(collider));
        // Mutations are build-time rare; keep queries borrow-free by
        // refreshing eagerly here.
        self.query_pipeline.update(&self.colliders);
        handle
    }

    fn entity_of(&self, handle: rapier3d::geometry::ColliderHandle) -> Option<Entity> {
        let bits = self.colliders.get(handle)?.user_data;
        if bits == 0 {
            return None;
        }
        Entity::from_bits(bits as u64)
    }
}

impl Default for RapierTraceWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceService for RapierTraceWorld {
    fn sweep_hull(&self, start: Vec3, delta: Vec3, hull: Hull) -> SweepResult {
        if delta.length_squared() < 1.0e-8 {
            return SweepResult::clear();
        }

        let shape = Cuboid::new(to_na(hull.half_extents()));
        let center = start + hull.center_offset();
        let shape_pos = na::Isometry3::translation(center.x, center.y, center.z);
        let shape_vel = to_na(delta);
        let options = ShapeCastOptions {
            max_time_of_impact: 1.0,
            target_distance: 0.0,
            stop_at_penetration: true,
            compute_impact_geometry_on_penetration: true,
        };

        match self.query_pipeline.cast_shape(
            &self.bodies,
            &self.colliders,
            &shape_pos,
            &shape_vel,
            &shape,
            options,
            QueryFilter::default(),
        ) {
            Some((handle, hit)) => {
                let fraction = hit.time_of_impact.clamp(0.0, 1.0);
                let normal = from_na(hit.normal2.into_inner()).normalize_or_zero();
                SweepResult {
                    fraction,
                    contact: Some(Contact {
                        entity: self.entity_of(handle),
                        point: center + delta * fraction,
                        normal,
                    }),
                }
            }
            None => SweepResult::clear(),
        }
    }

    fn line_of_sight(&self, from: Vec3, to: Vec3) -> bool {
        let delta = to - from;
        let distance = delta.length();
        if distance < 1.0e-4 {
            return true;
        }
        let ray = Ray::new(to_point(from), to_na(delta / distance));
        self.query_pipeline
            .cast_ray(
                &self.bodies,
                &self.colliders,
                &ray,
                distance,
                true,
                QueryFilter::default(),
            )
            .is_none()
    }

    fn fog_obscures(&self, from: Vec3, to: Vec3) -> bool {
        match self.fog_range {
            Some(range) => from.distance(to) > range,
            None => false,
        }
    }

    fn point_solid(&self, pos: Vec3) -> bool {
        let mut solid = false;
        self.query_pipeline.intersections_with_point(
            &self.bodies,
            &self.colliders,
            &to_point(pos),
            QueryFilter::default(),
            |_| {
                solid = true;
                false
            },
        );
        solid
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hull() -> Hull {
        Hull::new(26.0, 68.0)
    }

    #[test]
    fn test_sweep_clear_in_empty_world() {
        let world = RapierTraceWorld::new();
        let result = world.sweep_hull(Vec3::ZERO, Vec3::new(200.0, 0.0, 0.0), hull());
        assert!(result.is_clear());
    }

    #[test]
    fn test_sweep_stops_at_wall() {
        let mut world = RapierTraceWorld::new();
        world.add_box(Vec3::new(100.0, 50.0, 0.0), Vec3::new(10.0, 50.0, 100.0));

        let result = world.sweep_hull(Vec3::ZERO, Vec3::new(200.0, 0.0, 0.0), hull());
        assert!(!result.is_clear());
        // Hull face (13 wide) meets the wall face at x = 90.
        let stopped = result.end_position(Vec3::ZERO, Vec3::new(200.0, 0.0, 0.0));
        assert!((stopped.x - 77.0).abs() < 1.0, "stopped at {}", stopped.x);

        let contact = result.contact.unwrap();
        assert!(contact.entity.is_none(), "world geometry has no entity");
        assert!(contact.normal.x < -0.9, "normal faces back along the sweep");
    }

    #[test]
    fn test_sweep_reports_entity() {
        let mut world = hecs::World::new();
        let door = world.spawn(());

        let mut trace = RapierTraceWorld::new();
        trace.add_entity_box(door, Vec3::new(0.0, 40.0, -60.0), Vec3::new(40.0, 40.0, 5.0));

        let result = trace.sweep_hull(Vec3::ZERO, Vec3::new(0.0, 0.0, -120.0), hull());
        let contact = result.contact.expect("sweep should hit the door");
        assert_eq!(contact.entity, Some(door));
    }

    #[test]
    fn test_line_of_sight_blocked_by_wall() {
        let mut world = RapierTraceWorld::new();
        let eye = Vec3::new(0.0, 60.0, 0.0);
        let target = Vec3::new(300.0, 60.0, 0.0);
        assert!(world.line_of_sight(eye, target));

        world.add_box(Vec3::new(150.0, 50.0, 0.0), Vec3::new(5.0, 100.0, 100.0));
        assert!(!world.line_of_sight(eye, target));
    }

    #[test]
    fn test_point_solid() {
        let mut world = RapierTraceWorld::new();
        world.add_box(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 10.0, 10.0));
        assert!(world.point_solid(Vec3::new(5.0, 5.0, 5.0)));
        assert!(!world.point_solid(Vec3::new(50.0, 5.0, 5.0)));
    }

    #[test]
    fn test_fog_range() {
        let mut world = RapierTraceWorld::new();
        assert!(!world.fog_obscures(Vec3::ZERO, Vec3::new(5000.0, 0.0, 0.0)));

        world.set_fog_range(Some(1000.0));
        assert!(world.fog_obscures(Vec3::ZERO, Vec3::new(5000.0, 0.0, 0.0)));
        assert!(!world.fog_obscures(Vec3::ZERO, Vec3::new(500.0, 0.0, 0.0)));
    }

    #[test]
    fn test_floor_top_surface() {
        let mut world = RapierTraceWorld::new();
        world.add_floor(Vec3::new(-100.0, 0.0, -100.0), Vec3::new(100.0, 0.0, 100.0), 0.0);

        // Falling hull lands on the slab top.
        let result = world.sweep_hull(Vec3::new(0.0, 50.0, 0.0), Vec3::new(0.0, -100.0, 0.0), hull());
        assert!(!result.is_clear());
        let feet = result.end_position(Vec3::new(0.0, 50.0, 0.0), Vec3::new(0.0, -100.0, 0.0));
        assert!(feet.y.abs() < 1.0, "feet settle at the top, got {}", feet.y);
    }
}
