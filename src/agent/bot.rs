//! The agent chassis.
//!
//! A [`Bot`] is a table of capabilities (vision, intention, locomotion,
//! body) driven in a fixed order once per tick. The bot
//! owns its event queue: events pushed during one tick are frozen at
//! the start of the next and fanned out to every capability before any
//! of them updates, so all capabilities see the same batch regardless
//! of update order.
//!
//! # Design Principles
//!
//! - **Composition over inheritance**: behavior comes from the
//!   capabilities installed at build time, not from subclassing.
//! - **Explicit wiring**: every capability is passed in through the
//!   builder; nothing is discovered or registered behind the scenes.
//! - **One context**: capabilities receive a [`BotCtx`] snapshot
//!   instead of reaching back into the bot that owns them.

use glam::{Quat, Vec3};
use hecs::Entity;
use smallvec::SmallVec;

use crate::core::{BotEvent, Countdown, EventQueue, NavConfig, SimClock, Stopwatch};
use crate::loco::{Locomotion, NullLocomotion};
use crate::path::{MoverCaps, PathCtx};
use crate::world::{Team, WorldView};

use super::body::{Activity, Body, NullBody};
use super::intention::{Intention, NullIntention};
use super::vision::{NullVision, Vision};

/// Radians per second the bot may turn its facing.
const TURN_RATE: f32 = std::f32::consts::TAU;

/// Movement below this radius across a full sampling window counts as
/// holding still.
const IMMOBILE_RADIUS: f32 = 8.0;

/// Seconds between immobility samples.
const IMMOBILE_CHECK_INTERVAL: f32 = 1.0;

// ============================================================================
// Context
// ============================================================================

/// Everything a capability may read or touch during one tick.
///
/// Holds copies of the bot's kinematic state plus borrowed access to
/// the world and the bot's event queue. Pushing an event here queues it
/// for dispatch at the start of the *next* tick.
pub struct BotCtx<'a> {
    pub view: WorldView<'a>,
    pub config: &'a NavConfig,
    pub events: &'a mut EventQueue,
    /// World entity this bot is mirrored by, if any.
    pub me: Option<Entity>,
    pub team: Team,
    /// Feet position at the start of the tick.
    pub position: Vec3,
    pub velocity: Vec3,
    /// Unit facing direction in the ground plane.
    pub facing: Vec3,
    pub now: f64,
    pub dt: f32,
}

impl<'a> BotCtx<'a> {
    /// Assembles a path-computation context for the given mover.
    ///
    /// The result borrows from the world view, not from this context,
    /// so it can be held alongside `self.events`.
    #[must_use]
    pub fn path_ctx(&self, caps: MoverCaps) -> PathCtx<'a> {
        PathCtx {
            graph: self.view.graph,
            trace: self.view.trace,
            config: self.config,
            caps,
            now: self.now,
        }
    }
}

// ============================================================================
// Bot
// ============================================================================

/// An autonomous agent: kinematic state plus a capability table.
pub struct Bot {
    name: String,
    entity: Option<Entity>,
    team: Team,
    position: Vec3,
    velocity: Vec3,
    facing: Vec3,
    events: EventQueue,
    /// Dispatched events, held for the embedding game to drain.
    outbox: Vec<BotEvent>,
    immobile_anchor: Vec3,
    immobile_check: Countdown,
    immobile_since: Stopwatch,
    vision: Box<dyn Vision>,
    intention: Box<dyn Intention>,
    locomotion: Box<dyn Locomotion>,
    body: Box<dyn Body>,
}

impl Bot {
    /// Starts building a bot with null capabilities.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> BotBuilder {
        BotBuilder::new(name)
    }

    /// Runs one simulation tick.
    ///
    /// Order: immobility tracking, then last tick's events are
    /// dispatched to every capability, then vision, intention,
    /// locomotion and body update, and finally locomotion intent is
    /// integrated into the new position.
    pub fn update(&mut self, view: WorldView<'_>, config: &NavConfig, clock: &SimClock) {
        self.track_immobility(clock.now());

        let Self {
            name,
            entity,
            team,
            position,
            velocity,
            facing,
            events,
            outbox,
            vision,
            intention,
            locomotion,
            body,
            ..
        } = self;

        let now = clock.now();
        let dt = clock.delta();

        // Freeze the queue; events pushed below wait for the next tick.
        events.swap();
        let batch: SmallVec<[BotEvent; 8]> = events.drain().collect();

        let mut ctx = BotCtx {
            view,
            config,
            events,
            me: *entity,
            team: *team,
            position: *position,
            velocity: *velocity,
            facing: *facing,
            now,
            dt,
        };

        for event in &batch {
            log::debug!("{name}: {event:?}");
            vision.on_event(&mut ctx, event);
            intention.on_event(&mut ctx, event);
            locomotion.on_event(&mut ctx, event);
            body.on_event(&mut ctx, event);
        }
        outbox.extend(batch.iter().copied());

        vision.update(&mut ctx);
        intention.update(&mut ctx, vision.as_ref(), locomotion.as_mut(), body.as_mut());
        locomotion.update(&mut ctx);
        body.update(&mut ctx);

        // ===== Integration =====

        *position = locomotion.integrate(view, *position, dt);
        *velocity = locomotion.velocity();

        let desired = locomotion
            .face_target()
            .map_or(*velocity, |target| target - *position);
        let flat = Vec3::new(desired.x, 0.0, desired.z);
        if let Some(dir) = flat.try_normalize() {
            *facing = rotate_towards(*facing, dir, TURN_RATE * dt);
        }

        body.set_activity(if locomotion.is_on_ladder() {
            Activity::OnLadder
        } else if locomotion.is_climbing_or_jumping() {
            Activity::Climb
        } else if !locomotion.is_on_ground() {
            Activity::Jump
        } else if locomotion.speed() > 1.0 {
            Activity::Move
        } else {
            Activity::Idle
        });
    }

    /// Samples position against a fixed anchor once per check window.
    /// Staying inside a small radius for a whole window starts the
    /// immobile clock; breaking out resets both anchor and clock.
    fn track_immobility(&mut self, now: f64) {
        if !self.immobile_check.has_started() {
            self.immobile_check.start(now, IMMOBILE_CHECK_INTERVAL);
            self.immobile_anchor = self.position;
            return;
        }
        if !self.immobile_check.is_elapsed(now) {
            return;
        }
        self.immobile_check.start(now, IMMOBILE_CHECK_INTERVAL);
        if self.position.distance(self.immobile_anchor) > IMMOBILE_RADIUS {
            self.immobile_anchor = self.position;
            self.immobile_since.reset();
        } else if !self.immobile_since.is_running() {
            self.immobile_since.start(now);
        }
    }

    /// Clears all capability state and pending events.
    pub fn reset(&mut self) {
        self.events = EventQueue::new();
        self.outbox.clear();
        self.immobile_check.invalidate();
        self.immobile_since.reset();
        self.vision.reset();
        self.intention.reset();
        self.locomotion.reset();
        self.body.reset();
        self.velocity = Vec3::ZERO;
    }

    /// Queues an event for dispatch at the start of the next tick.
    pub fn notify(&mut self, event: BotEvent) {
        self.events.push(event);
    }

    /// Events already fanned out to the capabilities, in dispatch
    /// order, for the embedding game to consume.
    pub fn drain_outbox(&mut self) -> Vec<BotEvent> {
        std::mem::take(&mut self.outbox)
    }

    #[must_use]
    pub fn outbox(&self) -> &[BotEvent] {
        &self.outbox
    }

    /// True once a full check window passed without real movement.
    #[must_use]
    pub fn is_immobile(&self) -> bool {
        self.immobile_since.is_running()
    }

    /// Seconds spent holding still, zero while mobile.
    #[must_use]
    pub fn immobile_duration(&self, now: f64) -> f32 {
        self.immobile_since.elapsed(now)
    }

    // ===== Accessors =====

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn entity(&self) -> Option<Entity> {
        self.entity
    }

    pub fn set_entity(&mut self, entity: Option<Entity>) {
        self.entity = entity;
    }

    #[must_use]
    pub fn team(&self) -> Team {
        self.team
    }

    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Teleports the bot. Locomotion state is left to catch up on the
    /// next integration.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    #[must_use]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    #[must_use]
    pub fn facing(&self) -> Vec3 {
        self.facing
    }

    #[must_use]
    pub fn vision(&self) -> &dyn Vision {
        self.vision.as_ref()
    }

    pub fn vision_mut(&mut self) -> &mut dyn Vision {
        self.vision.as_mut()
    }

    #[must_use]
    pub fn intention(&self) -> &dyn Intention {
        self.intention.as_ref()
    }

    pub fn intention_mut(&mut self) -> &mut dyn Intention {
        self.intention.as_mut()
    }

    #[must_use]
    pub fn locomotion(&self) -> &dyn Locomotion {
        self.locomotion.as_ref()
    }

    pub fn locomotion_mut(&mut self) -> &mut dyn Locomotion {
        self.locomotion.as_mut()
    }

    #[must_use]
    pub fn body(&self) -> &dyn Body {
        self.body.as_ref()
    }

    pub fn body_mut(&mut self) -> &mut dyn Body {
        self.body.as_mut()
    }
}

/// Rotates a ground-plane direction toward another by at most
/// `max_angle` radians.
fn rotate_towards(from: Vec3, to: Vec3, max_angle: f32) -> Vec3 {
    let Some(flat) = Vec3::new(from.x, 0.0, from.z).try_normalize() else {
        return to;
    };
    let angle = flat.dot(to).clamp(-1.0, 1.0).acos();
    if angle <= max_angle {
        return to;
    }
    let sign = if flat.cross(to).y >= 0.0 { 1.0 } else { -1.0 };
    Quat::from_rotation_y(sign * max_angle) * flat
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles a [`Bot`] one capability at a time.
///
/// # Example
///
/// ```
/// use botnav::agent::{Bot, StandardBody};
/// use botnav::core::NavConfig;
/// use botnav::loco::GroundLocomotion;
/// use botnav::world::Team;
///
/// let config = NavConfig::default();
/// let bot = Bot::builder("sentry")
///     .team(Team(2))
///     .locomotion(GroundLocomotion::new(&config))
///     .body(StandardBody::new(&config))
///     .build();
/// assert_eq!(bot.name(), "sentry");
/// ```
pub struct BotBuilder {
    name: String,
    entity: Option<Entity>,
    team: Team,
    position: Vec3,
    facing: Vec3,
    vision: Box<dyn Vision>,
    intention: Box<dyn Intention>,
    locomotion: Box<dyn Locomotion>,
    body: Box<dyn Body>,
}

impl BotBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity: None,
            team: Team::NEUTRAL,
            position: Vec3::ZERO,
            facing: Vec3::NEG_Z,
            vision: Box::new(NullVision),
            intention: Box::new(NullIntention),
            locomotion: Box::new(NullLocomotion),
            body: Box::new(NullBody),
        }
    }

    #[must_use]
    pub fn entity(mut self, entity: Entity) -> Self {
        self.entity = Some(entity);
        self
    }

    #[must_use]
    pub fn team(mut self, team: Team) -> Self {
        self.team = team;
        self
    }

    #[must_use]
    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn facing(mut self, facing: Vec3) -> Self {
        self.facing = Vec3::new(facing.x, 0.0, facing.z).normalize_or(Vec3::NEG_Z);
        self
    }

    #[must_use]
    pub fn vision(mut self, vision: impl Vision + 'static) -> Self {
        self.vision = Box::new(vision);
        self
    }

    #[must_use]
    pub fn intention(mut self, intention: impl Intention + 'static) -> Self {
        self.intention = Box::new(intention);
        self
    }

    #[must_use]
    pub fn locomotion(mut self, locomotion: impl Locomotion + 'static) -> Self {
        self.locomotion = Box::new(locomotion);
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Body + 'static) -> Self {
        self.body = Box::new(body);
        self
    }

    #[must_use]
    pub fn build(self) -> Bot {
        Bot {
            name: self.name,
            entity: self.entity,
            team: self.team,
            position: self.position,
            velocity: Vec3::ZERO,
            facing: self.facing,
            events: EventQueue::new(),
            outbox: Vec::new(),
            immobile_anchor: self.position,
            immobile_check: Countdown::default(),
            immobile_since: Stopwatch::default(),
            vision: self.vision,
            intention: self.intention,
            locomotion: self.locomotion,
            body: self.body,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::agent::KnownEntity;
    use crate::core::PathFailure;
    use crate::nav::AreaMesh;
    use crate::world::{ClearTrace, DefaultPolicy, HecsDirectory};

    macro_rules! view {
        ($mesh:expr, $world:expr) => {
            WorldView {
                graph: $mesh,
                trace: &ClearTrace,
                directory: &HecsDirectory::new($world),
                policy: &DefaultPolicy,
            }
        };
    }

    /// Vision double that records every event it is handed.
    struct RecordingVision {
        seen: Rc<RefCell<Vec<BotEvent>>>,
    }

    impl Vision for RecordingVision {
        fn name(&self) -> &'static str {
            "recording"
        }
        fn reset(&mut self) {
            self.seen.borrow_mut().clear();
        }
        fn update(&mut self, _ctx: &mut BotCtx<'_>) {}
        fn on_event(&mut self, _ctx: &mut BotCtx<'_>, event: &BotEvent) {
            self.seen.borrow_mut().push(*event);
        }
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

    #[test]
    fn test_builder_defaults() {
        let bot = Bot::builder("idle").build();
        assert_eq!(bot.name(), "idle");
        assert_eq!(bot.team(), Team::NEUTRAL);
        assert_eq!(bot.position(), Vec3::ZERO);
        assert!((bot.facing() - Vec3::NEG_Z).length() < 1.0e-6);
        assert!(bot.entity().is_none());
    }

    #[test]
    fn test_events_dispatch_on_next_tick() {
        let mesh = AreaMesh::new();
        let world = hecs::World::new();
        let config = NavConfig::default();
        let clock = SimClock::default();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bot = Bot::builder("listener")
            .vision(RecordingVision {
                seen: Rc::clone(&seen),
            })
            .build();

        bot.notify(BotEvent::MoveFailure {
            reason: PathFailure::NoPath,
        });
        assert!(seen.borrow().is_empty(), "dispatch waits for the tick");

        bot.update(view!(&mesh, &world), &config, &clock);
        assert_eq!(
            seen.borrow().as_slice(),
            &[BotEvent::MoveFailure {
                reason: PathFailure::NoPath
            }]
        );

        // The batch is consumed; a quiet tick redelivers nothing.
        bot.update(view!(&mesh, &world), &config, &clock);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_dispatched_events_land_in_outbox() {
        let mesh = AreaMesh::new();
        let world = hecs::World::new();
        let config = NavConfig::default();
        let clock = SimClock::default();

        let mut bot = Bot::builder("courier").build();
        bot.notify(BotEvent::MoveSuccess);
        assert!(bot.outbox().is_empty(), "nothing dispatched yet");

        bot.update(view!(&mesh, &world), &config, &clock);
        assert_eq!(bot.drain_outbox(), vec![BotEvent::MoveSuccess]);
        assert!(bot.drain_outbox().is_empty(), "drain empties the outbox");
    }

    #[test]
    fn test_immobility_clock_starts_after_full_window() {
        let mesh = AreaMesh::new();
        let world = hecs::World::new();
        let config = NavConfig::default();
        let mut clock = SimClock::new(0.5);

        let mut bot = Bot::builder("statue").build();
        for _ in 0..3 {
            bot.update(view!(&mesh, &world), &config, &clock);
            clock.advance();
        }
        // Updates ran at t = 0.0, 0.5, 1.0; the 1.0 sample found the
        // bot still inside the anchor radius.
        assert!(bot.is_immobile());
        assert!(bot.immobile_duration(clock.now()) > 0.0);

        // A real displacement clears the state at the next sample.
        bot.set_position(Vec3::new(100.0, 0.0, 0.0));
        bot.update(view!(&mesh, &world), &config, &clock);
        clock.advance();
        bot.update(view!(&mesh, &world), &config, &clock);
        assert!(!bot.is_immobile());
        assert!(bot.immobile_duration(clock.now()).abs() < 1.0e-6);
    }

    #[test]
    fn test_facing_turns_toward_face_target() {
        let mesh = AreaMesh::new();
        let world = hecs::World::new();
        let config = NavConfig::default();
        let clock = SimClock::default();

        let mut bot = Bot::builder("turner")
            .locomotion(crate::loco::GroundLocomotion::new(&config))
            .body(crate::agent::StandardBody::new(&config))
            .facing(Vec3::NEG_Z)
            .build();
        bot.locomotion_mut().face_towards(Vec3::new(100.0, 0.0, 0.0));

        bot.update(view!(&mesh, &world), &config, &clock);

        let facing = bot.facing();
        assert!(facing.x > 0.05, "should have begun turning east: {facing}");
        assert!(
            facing.dot(Vec3::NEG_Z) > 0.9,
            "one tick is not enough for the full turn: {facing}"
        );
    }

    #[test]
    fn test_rotate_towards_clamps_angle() {
        let quarter = std::f32::consts::FRAC_PI_2;
        let turned = rotate_towards(Vec3::NEG_Z, Vec3::X, quarter * 0.5);
        let angle_left = turned.dot(Vec3::X).clamp(-1.0, 1.0).acos();
        assert!((angle_left - quarter * 0.5).abs() < 1.0e-3);

        // Within the clamp the target is reached exactly.
        let snapped = rotate_towards(Vec3::NEG_Z, Vec3::X, quarter * 2.0);
        assert!((snapped - Vec3::X).length() < 1.0e-5);
    }

    #[test]
    fn test_reset_clears_velocity() {
        let config = NavConfig::default();
        let mut bot = Bot::builder("resettable")
            .locomotion(crate::loco::GroundLocomotion::new(&config))
            .build();
        bot.reset();
        assert_eq!(bot.velocity(), Vec3::ZERO);
    }
}
