//! Perception.
//!
//! Vision keeps a memory of *known entities*: every actor the bot has
//! seen, where it last saw them, and whether the sighting has lasted
//! long enough to count. Recognition is gated by a reaction delay, so a
//! target that ducks back into cover before the delay runs out is never
//! noticed at all. Records of entities that drop out of view persist at
//! their last seen position until a forget horizon passes, so intentions
//! can chase a target they can no longer see.

use std::collections::hash_map::Entry;

use glam::Vec3;
use hecs::Entity;
use rustc_hash::FxHashMap;

use crate::core::{BotEvent, NavConfig, UpdateTimer};
use crate::world::{ThreatPick, TraceService};

use super::body::EYE_RATIO;
use super::bot::BotCtx;
use super::known::KnownEntity;

// ============================================================================
// Trait
// ============================================================================

/// Perception capability: visibility scanning and entity memory.
pub trait Vision {
    fn name(&self) -> &'static str;

    fn reset(&mut self);

    /// Rescans the world and updates entity memory.
    fn update(&mut self, ctx: &mut BotCtx<'_>);

    fn on_event(&mut self, _ctx: &mut BotCtx<'_>, _event: &BotEvent) {}

    /// Plants a memory record without a sighting, as from a sound cue
    /// or a scripted tip-off. Idempotent; an existing record is untouched.
    /// The entity stays unrecognized until a real sighting outlasts the
    /// reaction delay.
    fn introduce(&mut self, _entity: Entity, _position: Vec3, _now: f64) {}

    /// Memory record for one entity, if any.
    fn known(&self, entity: Entity) -> Option<&KnownEntity>;

    /// Snapshot of every remembered entity.
    fn known_entities(&self) -> Vec<KnownEntity>;

    fn known_count(&self) -> usize;

    /// The recognized hostile the decision policy ranks most pressing,
    /// ties going to the nearer last known position.
    fn primary_threat(&self, ctx: &BotCtx<'_>) -> Option<KnownEntity>;

    /// True once the reaction delay for `entity` has run out.
    fn is_aware_of(&self, entity: Entity) -> bool {
        self.known(entity).is_some_and(KnownEntity::is_recognized)
    }
}

// ============================================================================
// Standard implementation
// ============================================================================

/// Scanning vision with a field-of-view cone, line-of-sight tests and
/// fog culling.
///
/// Scans run at the configured interval rather than every tick; between
/// scans all queries answer from memory.
pub struct BotVision {
    timer: UpdateTimer,
    known: FxHashMap<Entity, KnownEntity>,
    range: f32,
    fov_cos: f32,
    reaction_time: f32,
    horizon: f32,
    eye_height: f32,
}

impl BotVision {
    #[must_use]
    pub fn new(config: &NavConfig) -> Self {
        Self {
            timer: UpdateTimer::new(config.vision_interval),
            known: FxHashMap::default(),
            range: config.vision_range,
            fov_cos: (config.fov_deg.to_radians() * 0.5).cos(),
            reaction_time: config.reaction_time,
            horizon: config.known_horizon,
            eye_height: config.stand_height * EYE_RATIO,
        }
    }

    /// Full visibility test from an eye point: range, field of view,
    /// fog, then geometry.
    fn can_see(&self, eye: Vec3, facing: Vec3, target: Vec3, trace: &dyn TraceService) -> bool {
        let to = target - eye;
        if to.length() > self.range {
            return false;
        }
        // The cone test is flat; height differences never push a target
        // out of view on their own.
        if let Some(dir) = Vec3::new(to.x, 0.0, to.z).try_normalize() {
            let forward = Vec3::new(facing.x, 0.0, facing.z).normalize_or_zero();
            if forward != Vec3::ZERO && forward.dot(dir) < self.fov_cos {
                return false;
            }
        }
        if trace.fog_obscures(eye, target) {
            return false;
        }
        trace.line_of_sight(eye, target)
    }

    fn scan(&mut self, ctx: &mut BotCtx<'_>) {
        let eye = ctx.position + Vec3::Y * self.eye_height;

        for entity in ctx.view.directory.actors() {
            if ctx.me == Some(entity) {
                continue;
            }
            let Some(info) = ctx.view.directory.info(entity) else {
                continue;
            };
            if !info.alive {
                continue;
            }

            let visible = self.can_see(eye, ctx.facing, info.center(), ctx.view.trace);
            match self.known.entry(entity) {
                Entry::Occupied(mut slot) => {
                    let record = slot.get_mut();
                    if visible {
                        let resighted = !record.is_visible();
                        record.update_position(info.position, ctx.now);
                        record.mark_visible(ctx.now);
                        if resighted && record.is_recognized() {
                            ctx.events.push(BotEvent::Sighted { entity });
                        }
                    } else if record.is_visible() {
                        record.mark_hidden();
                        if record.is_recognized() {
                            log::debug!("lost sight of {entity:?}");
                            ctx.events.push(BotEvent::LostSight { entity });
                        }
                    }
                }
                Entry::Vacant(slot) => {
                    if visible {
                        let mut record = KnownEntity::new(entity, info.position, ctx.now);
                        record.mark_visible(ctx.now);
                        slot.insert(record);
                    }
                }
            }
        }

        // A sighting that has outlasted the reaction delay becomes a
        // recognized entity.
        for (entity, record) in &mut self.known {
            if record.is_visible()
                && !record.is_recognized()
                && record.time_since_became_visible(ctx.now) >= self.reaction_time
            {
                record.mark_recognized();
                log::debug!("sighted {entity:?}");
                ctx.events.push(BotEvent::Sighted { entity: *entity });
            }
        }

        // Forget the despawned, the dead and the stale.
        let horizon = self.horizon;
        let now = ctx.now;
        self.known.retain(|entity, record| {
            match ctx.view.directory.info(*entity) {
                Some(info) if info.alive => !record.is_obsolete(now, horizon),
                _ => false,
            }
        });
    }
}

impl Vision for BotVision {
    fn name(&self) -> &'static str {
        "bot vision"
    }

    fn reset(&mut self) {
        self.timer.reset();
        self.known.clear();
    }

    fn update(&mut self, ctx: &mut BotCtx<'_>) {
        if self.timer.due_at(ctx.now, ctx.dt).is_some() {
            self.scan(ctx);
        }
    }

    fn introduce(&mut self, entity: Entity, position: Vec3, now: f64) {
        self.known
            .entry(entity)
            .or_insert_with(|| KnownEntity::new(entity, position, now));
    }

    fn known(&self, entity: Entity) -> Option<&KnownEntity> {
        self.known.get(&entity)
    }

    fn known_entities(&self) -> Vec<KnownEntity> {
        self.known.values().copied().collect()
    }

    fn known_count(&self) -> usize {
        self.known.len()
    }

    fn primary_threat(&self, ctx: &BotCtx<'_>) -> Option<KnownEntity> {
        let mut best: Option<KnownEntity> = None;
        for record in self.known.values() {
            if !record.is_recognized() {
                continue;
            }
            let Some(info) = ctx.view.directory.info(record.entity()) else {
                continue;
            };
            if !info.alive || !ctx.team.is_hostile_to(info.team) {
                continue;
            }
            best = Some(match best {
                None => *record,
                Some(current) => match ctx.view.policy.compare_threats(&current, record) {
                    ThreatPick::First => current,
                    ThreatPick::Second => *record,
                    ThreatPick::Tie => {
                        let held = current.last_known_position().distance_squared(ctx.position);
                        let offered = record.last_known_position().distance_squared(ctx.position);
                        if offered < held { *record } else { current }
                    }
                },
            });
        }
        best
    }
}

// ============================================================================
// Null implementation
// ============================================================================

/// Vision that perceives nothing. Keeps sightless agents cheap.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVision;

impl Vision for NullVision {
    fn name(&self) -> &'static str {
        "null vision"
    }

    fn reset(&mut self) {}

    fn update(&mut self, _ctx: &mut BotCtx<'_>) {}

    fn known(&self, _entity: Entity) -> Option<&KnownEntity> {
        None
    }

    fn known_entities(&self) -> Vec<KnownEntity> {
        Vec::new()
    }

    fn known_count(&self) -> usize {
        0
    }

    fn primary_threat(&self, _ctx: &BotCtx<'_>) -> Option<KnownEntity> {
        None
    }
}

// ============================================================================
// Tests
// ============================================================================
