//! Entity directory boundary.
//!
//! Agents never hold direct references to game entities; they carry
//! [`Entity`] ids and resolve them through an [`EntityDirectory`] each
//! tick. A dangling id simply resolves to `None`, which is what drives
//! known-entity eviction.

use glam::{Quat, Vec3};
use hecs::Entity;

// ============================================================================
// Components
// ============================================================================

/// Transform component for position and orientation
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    /// Position in world space (feet for characters)
    pub position: Vec3,
    /// Rotation as a quaternion
    pub rotation: Quat,
}

impl Transform {
    /// Create a transform with just a position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Get the forward direction (negative Z in local space)
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Face along a horizontal direction
    pub fn face_along(&mut self, dir: Vec3) {
        let flat = Vec3::new(dir.x, 0.0, dir.z);
        if flat.length_squared() > 1.0e-8 {
            self.rotation = Quat::from_rotation_arc(Vec3::NEG_Z, flat.normalize());
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Velocity component
#[derive(Debug, Clone, Copy, Default)]
pub struct Velocity {
    pub linear: Vec3,
}

/// Name component for debugging and logs
#[derive(Debug, Clone)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Team tag. Team 0 is neutral and hostile to nobody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Team(pub u8);

impl Team {
    pub const NEUTRAL: Team = Team(0);

    /// True when the two teams fight each other.
    #[must_use]
    pub fn is_hostile_to(self, other: Team) -> bool {
        self != Team::NEUTRAL && other != Team::NEUTRAL && self != other
    }
}

/// Coarse behavioral class of a world entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityClass {
    /// A character; perceivable, never walked through.
    Actor,
    /// Assumed openable; traversable when planning.
    Door,
    /// Destructible clutter; passable given enough urgency.
    Breakable,
    /// Non-solid decorative geometry; always passable.
    Brush,
    /// Solid immovable object.
    Prop,
}

/// Marker component describing how navigation treats an entity.
#[derive(Debug, Clone, Copy)]
pub struct ActorInfo {
    pub class: EntityClass,
    pub team: Team,
    pub alive: bool,
    /// Half-extents of the entity's bounding box.
    pub half_extents: Vec3,
}

impl ActorInfo {
    pub const DEFAULT_HALF_EXTENTS: Vec3 = Vec3::new(16.0, 36.0, 16.0);

    #[must_use]
    pub fn new(class: EntityClass, team: Team) -> Self {
        Self {
            class,
            team,
            alive: true,
            half_extents: Self::DEFAULT_HALF_EXTENTS,
        }
    }

    #[must_use]
    pub fn with_half_extents(mut self, half_extents: Vec3) -> Self {
        self.half_extents = half_extents;
        self
    }
}

// ============================================================================
// Directory Boundary
// ============================================================================

/// Snapshot of one entity, resolved through the directory.
#[derive(Debug, Clone, Copy)]
pub struct EntityInfo {
    pub entity: Entity,
    pub class: EntityClass,
    pub team: Team,
    pub alive: bool,
    pub position: Vec3,
    pub velocity: Vec3,
    pub half_extents: Vec3,
}

impl EntityInfo {
    /// Center of the bounding box.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        self.position + Vec3::new(0.0, self.half_extents.y, 0.0)
    }

    #[must_use]
    pub fn mins(&self) -> Vec3 {
        self.center() - self.half_extents
    }

    #[must_use]
    pub fn maxs(&self) -> Vec3 {
        self.center() + self.half_extents
    }
}

/// Read-only lookup of live game entities.
pub trait EntityDirectory {
    /// Resolves an entity id, or `None` once it is gone.
    fn info(&self, entity: Entity) -> Option<EntityInfo>;

    /// All living actor-class entities, the default perception
    /// candidate set.
    fn actors(&self) -> Vec<Entity>;

    fn contains(&self, entity: Entity) -> bool {
        self.info(entity).is_some()
    }
}

/// Directory view over a [`hecs::World`].
///
/// Borrowed fresh each tick; holding one across world mutations is not
/// possible by construction.
pub struct HecsDirectory<'a> {
    world: &'a hecs::World,
}

impl<'a> HecsDirectory<'a> {
    #[must_use]
    pub fn new(world: &'a hecs::World) -> Self {
        Self { world }
    }
}

impl EntityDirectory for HecsDirectory<'_> {
    fn info(&self, entity: Entity) -> Option<EntityInfo> {
        let entity_ref = self.world.entity(entity).ok()?;
        let transform = entity_ref.get::<&Transform>()?;
        let velocity = entity_ref
            .get::<&Velocity>()
            .map(|v| v.linear)
            .unwrap_or(Vec3::ZERO);
        // Entities without an ActorInfo tag count as plain solid props.
        let info = entity_ref
            .get::<&ActorInfo>()
            .map(|i| *i)
            .unwrap_or_else(|| ActorInfo::new(EntityClass::Prop, Team::NEUTRAL));

        Some(EntityInfo {
            entity,
            class: info.class,
            team: info.team,
            alive: info.alive,
            position: transform.position,
            velocity,
            half_extents: info.half_extents,
        })
    }

    fn actors(&self) -> Vec<Entity> {
        self.world
            .query::<&ActorInfo>()
            .iter()
            .filter(|(_, info)| info.class == EntityClass::Actor && info.alive)
            .map(|(entity, _)| entity)
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
