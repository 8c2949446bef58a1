//! Known-entity memory records.

use glam::Vec3;
use hecs::Entity;

/// What an agent remembers about one entity it has perceived.
///
/// A record is created the moment the entity first enters perception
/// and is updated on every vision scan. The position is a *memory*:
/// while the entity is out of sight it stays frozen at the last place
/// the agent knew about, which is where search behaviors should look.
#[derive(Debug, Clone, Copy)]
pub struct KnownEntity {
    entity: Entity,
    last_position: Vec3,
    /// When the record was created.
    when_became_known: f64,
    /// When the position was last refreshed.
    when_last_known: f64,
    visible: bool,
    when_became_visible: f64,
    ever_visible: bool,
    /// Visible long enough to pass the reaction delay.
    recognized: bool,
}

impl KnownEntity {
    /// Starts remembering an entity at `position`. The new record is
    /// not visible and not recognized yet.
    #[must_use]
    pub fn new(entity: Entity, position: Vec3, now: f64) -> Self {
        Self {
            entity,
            last_position: position,
            when_became_known: now,
            when_last_known: now,
            visible: false,
            when_became_visible: 0.0,
            ever_visible: false,
            recognized: false,
        }
    }

    #[must_use]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Where the entity was last perceived. Stale while out of sight.
    #[must_use]
    pub fn last_known_position(&self) -> Vec3 {
        self.last_position
    }

    pub fn update_position(&mut self, position: Vec3, now: f64) {
        self.last_position = position;
        self.when_last_known = now;
    }

    /// Seconds since the position was last refreshed.
    #[must_use]
    pub fn time_since_last_known(&self, now: f64) -> f32 {
        (now - self.when_last_known).max(0.0) as f32
    }

    /// Seconds since the record was created.
    #[must_use]
    pub fn time_since_became_known(&self, now: f64) -> f32 {
        (now - self.when_became_known).max(0.0) as f32
    }

    // ===== Visibility =====

    pub fn mark_visible(&mut self, now: f64) {
        if !self.visible {
            self.visible = true;
            self.when_became_visible = now;
        }
        self.ever_visible = true;
    }

    pub fn mark_hidden(&mut self) {
        self.visible = false;
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Seconds of continuous visibility, zero while hidden.
    #[must_use]
    pub fn time_since_became_visible(&self, now: f64) -> f32 {
        if self.visible {
            (now - self.when_became_visible).max(0.0) as f32
        } else {
            0.0
        }
    }

    #[must_use]
    pub fn was_ever_visible(&self) -> bool {
        self.ever_visible
    }

    // ===== Recognition =====

    pub fn mark_recognized(&mut self) {
        self.recognized = true;
    }

    /// True once the entity has stayed visible past the reaction
    /// delay. Recognition survives losing sight.
    #[must_use]
    pub fn is_recognized(&self) -> bool {
        self.recognized
    }

    /// True when the memory is old enough to discard.
    #[must_use]
    pub fn is_obsolete(&self, now: f64, horizon: f32) -> bool {
        self.time_since_last_known(now) > horizon
    }
}

// ============================================================================
// Tests
// ============================================================================
