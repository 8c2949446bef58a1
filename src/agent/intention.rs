//! Intentions.
//!
//! The intention capability is the agent's decision seat: it reads
//! perception, picks a destination, and drives the path follower. The
//! crate ships only a null intention and a simple pursuer, because goal
//! selection belongs to the embedding game. Hosts hang their own
//! planners and behavior trees off this trait.

use glam::Vec3;
use hecs::Entity;

use crate::core::{BotEvent, NavConfig, PathFailure, UpdateTimer};
use crate::loco::{mover_caps, Locomotion};
use crate::path::{PathFollower, ShortestPathCost};

use super::body::Body;
use super::bot::BotCtx;
use super::known::KnownEntity;
use super::vision::Vision;

/// Seconds between route recomputations while pursuing.
const REPATH_INTERVAL: f32 = 0.5;

// ============================================================================
// Trait
// ============================================================================

/// Decision capability: turns perception into movement orders.
pub trait Intention {
    fn name(&self) -> &'static str;

    fn reset(&mut self);

    /// Decides and steers for one tick. Runs after vision has updated
    /// and before locomotion integrates.
    fn update(
        &mut self,
        ctx: &mut BotCtx<'_>,
        vision: &dyn Vision,
        locomotion: &mut dyn Locomotion,
        body: &mut dyn Body,
    );

    fn on_event(&mut self, _ctx: &mut BotCtx<'_>, _event: &BotEvent) {}
}

// ============================================================================
// Null implementation
// ============================================================================

/// Intention that wants nothing. The agent stands wherever it is.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIntention;

impl Intention for NullIntention {
    fn name(&self) -> &'static str {
        "null intention"
    }

    fn reset(&mut self) {}

    fn update(
        &mut self,
        _ctx: &mut BotCtx<'_>,
        _vision: &dyn Vision,
        _locomotion: &mut dyn Locomotion,
        _body: &mut dyn Body,
    ) {
    }
}

// ============================================================================
// Pursue
// ============================================================================

/// Chases an entity by way of its last known position.
///
/// With an explicit target set it hunts that entity, falling back to
/// the live directory position until vision has built a memory of it.
/// Without one it asks vision for the primary threat every tick. Routes
/// recompute on a fixed cadence; a stuck or fell-off failure, or fresh
/// sighting news, forces the next tick to recompute immediately. An
/// unreachable quarry retries at the normal cadence only, so `NoPath`
/// events stay throttled.
pub struct PursueIntention {
    follower: PathFollower,
    target: Option<Entity>,
    repath: UpdateTimer,
}

impl PursueIntention {
    #[must_use]
    pub fn new(config: &NavConfig) -> Self {
        Self {
            follower: PathFollower::new(config),
            target: None,
            repath: UpdateTimer::new(REPATH_INTERVAL),
        }
    }

    /// Locks the pursuit onto one entity.
    #[must_use]
    pub fn with_target(mut self, target: Entity) -> Self {
        self.target = Some(target);
        self
    }

    pub fn set_target(&mut self, target: Option<Entity>) {
        self.target = target;
        self.repath.reset();
    }

    #[must_use]
    pub fn target(&self) -> Option<Entity> {
        self.target
    }

    #[must_use]
    pub fn follower(&self) -> &PathFollower {
        &self.follower
    }

    pub fn follower_mut(&mut self) -> &mut PathFollower {
        &mut self.follower
    }

    /// Who to chase and where they were last: the explicit target if
    /// one is set and still alive, otherwise vision's primary threat.
    fn quarry(&self, ctx: &BotCtx<'_>, vision: &dyn Vision) -> Option<(Entity, Vec3)> {
        if let Some(entity) = self.target {
            let info = ctx.view.directory.info(entity).filter(|info| info.alive)?;
            let pos = vision
                .known(entity)
                .map_or(info.position, KnownEntity::last_known_position);
            return Some((entity, pos));
        }
        vision
            .primary_threat(ctx)
            .map(|threat| (threat.entity(), threat.last_known_position()))
    }
}

impl Intention for PursueIntention {
    fn name(&self) -> &'static str {
        "pursue"
    }

    fn reset(&mut self) {
        self.follower.abandon();
        self.repath.reset();
    }

    fn update(
        &mut self,
        ctx: &mut BotCtx<'_>,
        vision: &dyn Vision,
        locomotion: &mut dyn Locomotion,
        body: &mut dyn Body,
    ) {
        let Some((entity, goal)) = self.quarry(ctx, vision) else {
            if self.follower.is_following() {
                log::debug!("pursue: quarry gone, dropping route");
                self.follower.abandon();
            }
            return;
        };

        // Contact: hold position and keep eyes on the quarry.
        if goal.distance(ctx.position) <= ctx.config.goal_tolerance {
            if self.follower.is_following() {
                self.follower.abandon();
            }
            locomotion.face_towards(goal);
            return;
        }

        if self.repath.due_at(ctx.now, ctx.dt).is_some() {
            let caps = mover_caps(locomotion, body);
            let cost = ShortestPathCost::new(caps);
            let path_ctx = ctx.path_ctx(caps);
            let result = self.follower.compute_to_entity(
                &path_ctx,
                ctx.events,
                ctx.position,
                entity,
                goal,
                &cost,
                0.0,
            );
            log::debug!("pursue: route to {entity:?} -> {result:?}");
        }

        self.follower.update(ctx, locomotion, body);
    }

    fn on_event(&mut self, _ctx: &mut BotCtx<'_>, event: &BotEvent) {
        match event {
            BotEvent::MoveFailure {
                reason: PathFailure::Stuck | PathFailure::FellOff,
            }
            | BotEvent::Sighted { .. } => {
                self.repath.reset();
            }
            _ => {}
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{BotVision, NullVision, StandardBody};
    use crate::core::EventQueue;
    use crate::loco::GroundLocomotion;
    use crate::nav::AreaMesh;
    use crate::world::{
        ActorInfo, ClearTrace, DefaultPolicy, EntityClass, HecsDirectory, Team, Transform,
        WorldView,
    };

    struct Rig {
        mesh: AreaMesh,
        world: hecs::World,
        config: NavConfig,
        events: EventQueue,
        position: Vec3,
    }

    impl Rig {
        fn new() -> Self {
            let mut mesh = AreaMesh::new();
            mesh.add_area(Vec3::new(0.0, 0.0, 0.0), Vec3::new(400.0, 0.0, 100.0));
            Self {
                mesh,
                world: hecs::World::new(),
                config: NavConfig::default(),
                events: EventQueue::new(),
                position: Vec3::new(50.0, 0.0, 50.0),
            }
        }

        fn spawn_actor(&mut self, team: Team, pos: Vec3) -> Entity {
            self.world.spawn((
                ActorInfo::new(EntityClass::Actor, team),
                Transform::from_position(pos),
            ))
        }

        fn drive(
            &mut self,
            intention: &mut PursueIntention,
            vision: &dyn Vision,
            loco: &mut GroundLocomotion,
            body: &mut StandardBody,
            now: f64,
        ) {
            let directory = HecsDirectory::new(&self.world);
            let mut ctx = BotCtx {
                view: WorldView {
                    graph: &self.mesh,
                    trace: &ClearTrace,
                    directory: &directory,
                    policy: &DefaultPolicy,
                },
                config: &self.config,
                events: &mut self.events,
                me: None,
                team: Team(1),
                position: self.position,
                velocity: Vec3::ZERO,
                facing: Vec3::X,
                now,
                dt: 1.0 / 60.0,
            };
            intention.update(&mut ctx, vision, loco, body);
        }
    }

    #[test]
    fn test_pursues_explicit_target_through_directory() {
        let mut rig = Rig::new();
        let target = rig.spawn_actor(Team(2), Vec3::new(350.0, 0.0, 50.0));
        let mut intention = PursueIntention::new(&rig.config).with_target(target);
        let mut loco = GroundLocomotion::new(&rig.config);
        let mut body = StandardBody::new(&rig.config);

        rig.drive(&mut intention, &NullVision, &mut loco, &mut body, 0.0);

        assert!(intention.follower().is_following());
        assert_eq!(intention.follower().path().target(), Some(target));
        let face = loco.face_target().expect("steering at the route goal");
        assert!((face.x - 350.0).abs() < 1.0, "goal sits at the target: {face}");
        assert!(
            (loco.desired_speed() - rig.config.run_speed).abs() < 1.0e-3,
            "straight route runs at full speed"
        );
    }

    #[test]
    fn test_pursues_primary_threat_from_vision_memory() {
        let mut rig = Rig::new();
        let threat = rig.spawn_actor(Team(2), Vec3::new(300.0, 0.0, 50.0));
        let mut vision = BotVision::new(&rig.config);
        vision.introduce(threat, Vec3::new(300.0, 0.0, 50.0), 0.0);
        let mut intention = PursueIntention::new(&rig.config);
        let mut loco = GroundLocomotion::new(&rig.config);
        let mut body = StandardBody::new(&rig.config);

        // An introduced-but-unrecognized entity is not yet a threat.
        rig.drive(&mut intention, &vision, &mut loco, &mut body, 0.0);
        assert!(!intention.follower().is_following());

        // Two scans carry the sighting past the reaction delay.
        {
            let directory = HecsDirectory::new(&rig.world);
            let mut ctx = BotCtx {
                view: WorldView {
                    graph: &rig.mesh,
                    trace: &ClearTrace,
                    directory: &directory,
                    policy: &DefaultPolicy,
                },
                config: &rig.config,
                events: &mut rig.events,
                me: None,
                team: Team(1),
                position: Vec3::new(50.0, 0.0, 50.0),
                velocity: Vec3::ZERO,
                facing: Vec3::X,
                now: 0.0,
                dt: 1.0 / 60.0,
            };
            vision.update(&mut ctx);
            ctx.now = 0.2;
            vision.update(&mut ctx);
        }
        assert!(vision.is_aware_of(threat));

        rig.drive(&mut intention, &vision, &mut loco, &mut body, 0.3);
        assert!(intention.follower().is_following());
        assert_eq!(intention.follower().path().target(), Some(threat));
    }

    #[test]
    fn test_contact_range_holds_position() {
        let mut rig = Rig::new();
        rig.position = Vec3::new(100.0, 0.0, 50.0);
        let quarry_pos = Vec3::new(110.0, 0.0, 50.0);
        let target = rig.spawn_actor(Team(2), quarry_pos);
        let mut intention = PursueIntention::new(&rig.config).with_target(target);
        let mut loco = GroundLocomotion::new(&rig.config);
        let mut body = StandardBody::new(&rig.config);

        rig.drive(&mut intention, &NullVision, &mut loco, &mut body, 0.0);

        assert!(!intention.follower().is_following(), "no route at contact");
        assert_eq!(loco.face_target(), Some(quarry_pos));
        assert!(loco.desired_speed().abs() < 1.0e-6);
    }

    #[test]
    fn test_dead_quarry_drops_the_route() {
        let mut rig = Rig::new();
        let target = rig.spawn_actor(Team(2), Vec3::new(350.0, 0.0, 50.0));
        let mut intention = PursueIntention::new(&rig.config).with_target(target);
        let mut loco = GroundLocomotion::new(&rig.config);
        let mut body = StandardBody::new(&rig.config);

        rig.drive(&mut intention, &NullVision, &mut loco, &mut body, 0.0);
        assert!(intention.follower().is_following());

        rig.world.despawn(target).expect("spawned above");
        rig.drive(&mut intention, &NullVision, &mut loco, &mut body, 0.1);
        assert!(!intention.follower().is_following());
    }

    #[test]
    fn test_repath_honors_cadence() {
        let mut rig = Rig::new();
        let target = rig.spawn_actor(Team(2), Vec3::new(350.0, 0.0, 50.0));
        let mut intention = PursueIntention::new(&rig.config).with_target(target);
        let mut loco = GroundLocomotion::new(&rig.config);
        let mut body = StandardBody::new(&rig.config);

        rig.drive(&mut intention, &NullVision, &mut loco, &mut body, 0.0);
        rig.drive(&mut intention, &NullVision, &mut loco, &mut body, 0.1);
        assert!(
            (intention.follower().path().age(0.1) - 0.1).abs() < 1.0e-6,
            "within the cadence the route is kept"
        );

        rig.drive(&mut intention, &NullVision, &mut loco, &mut body, 0.6);
        assert!(
            intention.follower().path().age(0.6).abs() < 1.0e-6,
            "past the cadence the route is rebuilt"
        );
    }
}
