//! Simulation session.

use std::time::Instant;

use glam::Vec3;
use hecs::Entity;

use crate::agent::Bot;
use crate::core::{BotEvent, NavConfig, SimClock, TickStats};
use crate::nav::NavGraph;
use crate::world::{
    ActorInfo, DecisionPolicy, DefaultPolicy, EntityClass, HecsDirectory, Name, Team, TraceService,
    Transform, Velocity, WorldView,
};

use super::registry::{BotId, BotRegistry};

/// A self-contained simulation: clock, environment services, entity
/// store and every registered agent. Dropping the session tears all of
/// it down; nothing leaks into process-wide state.
///
/// `tick` advances the clock, updates each bot against a fresh world
/// view, then mirrors bot positions back into the entity store. That
/// mirroring stands in for the host game's physics step.
pub struct Simulation {
    clock: SimClock,
    config: NavConfig,
    graph: Box<dyn NavGraph>,
    trace: Box<dyn TraceService>,
    policy: Box<dyn DecisionPolicy>,
    world: hecs::World,
    registry: BotRegistry,
    stats: TickStats,
}

impl Simulation {
    #[must_use]
    pub fn new(config: NavConfig, graph: Box<dyn NavGraph>, trace: Box<dyn TraceService>) -> Self {
        Self {
            clock: SimClock::new(config.tick_interval),
            config,
            graph,
            trace,
            policy: Box::new(DefaultPolicy),
            world: hecs::World::new(),
            registry: BotRegistry::new(),
            stats: TickStats::new(),
        }
    }

    /// Swaps in a host decision policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Box<dyn DecisionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    // ===== Population =====

    /// Spawns a plain world actor (a perception target, not an agent).
    pub fn spawn_actor(&mut self, name: &str, team: Team, position: Vec3) -> Entity {
        let entity = self.world.spawn((
            Name::new(name),
            ActorInfo::new(EntityClass::Actor, team),
            Transform::from_position(position),
            Velocity::default(),
        ));
        log::info!(
            "spawned actor {name} at ({:.0}, {:.0}, {:.0})",
            position.x,
            position.y,
            position.z
        );
        entity
    }

    /// Registers a bot with the session. A bot arriving without a world
    /// entity gets an actor mirror spawned for it, so other agents can
    /// perceive it.
    pub fn spawn_bot(&mut self, mut bot: Bot) -> BotId {
        if bot.entity().is_none() {
            let entity = self.world.spawn((
                Name::new(bot.name()),
                ActorInfo::new(EntityClass::Actor, bot.team()),
                Transform::from_position(bot.position()),
                Velocity::default(),
            ));
            bot.set_entity(Some(entity));
        }
        log::info!("registered bot {}", bot.name());
        self.registry.insert(bot)
    }

    /// Unregisters a bot and despawns its world mirror.
    pub fn remove_bot(&mut self, id: BotId) -> Option<Bot> {
        let bot = self.registry.remove(id)?;
        if let Some(entity) = bot.entity() {
            if self.world.despawn(entity).is_err() {
                log::warn!("bot {} mirror was already gone", bot.name());
            }
        }
        Some(bot)
    }

    // ===== Tick =====

    /// Runs one simulation step for every registered bot.
    pub fn tick(&mut self) {
        let started = Instant::now();
        self.clock.advance();

        for (_, bot) in self.registry.iter_mut() {
            let directory = HecsDirectory::new(&self.world);
            let view = WorldView {
                graph: self.graph.as_ref(),
                trace: self.trace.as_ref(),
                directory: &directory,
                policy: self.policy.as_ref(),
            };
            bot.update(view, &self.config, &self.clock);
        }

        self.sync_mirrors();
        self.stats.record_tick(started.elapsed());
    }

    /// Writes each bot's integrated position back to its entity mirror.
    fn sync_mirrors(&mut self) {
        for (_, bot) in self.registry.iter() {
            let Some(entity) = bot.entity() else {
                continue;
            };
            match self.world.get::<&mut Transform>(entity) {
                Ok(mut transform) => {
                    transform.position = bot.position();
                    transform.face_along(bot.facing());
                }
                Err(_) => {
                    log::warn!("bot {} lost its world entity", bot.name());
                    continue;
                }
            }
            if let Ok(mut velocity) = self.world.get::<&mut Velocity>(entity) {
                velocity.linear = bot.velocity();
            }
        }
    }

    /// Drains a bot's dispatched events for host-side consumption.
    pub fn drain_events(&mut self, id: BotId) -> Vec<BotEvent> {
        self.registry
            .get_mut(id)
            .map(Bot::drain_outbox)
            .unwrap_or_default()
    }

    // ===== Accessors =====

    #[must_use]
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    #[must_use]
    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    #[must_use]
    pub fn graph(&self) -> &dyn NavGraph {
        self.graph.as_ref()
    }

    #[must_use]
    pub fn world(&self) -> &hecs::World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut hecs::World {
        &mut self.world
    }

    #[must_use]
    pub fn bot(&self, id: BotId) -> Option<&Bot> {
        self.registry.get(id)
    }

    pub fn bot_mut(&mut self, id: BotId) -> Option<&mut Bot> {
        self.registry.get_mut(id)
    }

    #[must_use]
    pub fn bot_count(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn stats(&self) -> &TickStats {
        &self.stats
    }
}

// ============================================================================
// Tests
// ============================================================================
