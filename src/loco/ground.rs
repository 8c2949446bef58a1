//! Ground-based locomotion.
//!
//! Kinematic character movement: steering toward accumulated intent
//! under acceleration limits, gravity and ground snapping, wall sweeps
//! through the trace service, and scripted motions for ledge climbs,
//! gap jumps and ladders. Progress is watched by a stuck monitor that
//! raises [`BotEvent::Stuck`] / [`BotEvent::Unstuck`].

use glam::Vec3;
use hecs::Entity;

use crate::agent::BotCtx;
use crate::core::{BotEvent, NavConfig};
use crate::nav::LadderId;
use crate::world::{EntityClass, Hull, WorldView};

use super::{Locomotion, Traversability, Urgency};

/// Downward acceleration while airborne, world units per second squared.
const GRAVITY: f32 = 800.0;

/// Vertical climb rate during a ledge climb.
const CLIMB_RATE: f32 = 250.0;

/// Scripted actions that run out of time snap to their target.
const ACTION_TIMEOUT: f32 = 2.0;

// ============================================================================
// Stuck Monitor
// ============================================================================

/// Movement must beat this radius from the anchor to count as progress.
const STUCK_RADIUS: f32 = 100.0;

/// Minimum spacing between repeated stuck notifications.
const STUCK_EVENT_INTERVAL: f64 = 1.0;

/// A movement request older than this no longer counts as trying to move.
const MOVE_REQUEST_GRACE: f64 = 0.25;

/// State transition reported by one stuck-monitor sample.
#[derive(Debug, Clone, Copy, PartialEq)]
enum StuckChange {
    BecameStuck { position: Vec3 },
    StillStuck { position: Vec3, duration: f32 },
    Escaped,
}

/// Watches for lack of progress while movement is being requested.
///
/// An anchor is dropped wherever the agent last made progress. If the
/// agent keeps requesting movement but stays within [`STUCK_RADIUS`] of
/// the anchor for longer than the escape window, it is declared stuck.
/// The window scales with requested speed: a fast mover is expected to
/// clear the radius quickly, a slow one gets more patience.
#[derive(Debug, Clone)]
struct StuckMonitor {
    anchor: Vec3,
    anchor_time: f64,
    stuck: bool,
    stuck_since: f64,
    last_event: f64,
    last_request: f64,
}

impl StuckMonitor {
    fn new() -> Self {
        Self {
            anchor: Vec3::ZERO,
            anchor_time: 0.0,
            stuck: false,
            stuck_since: 0.0,
            last_event: 0.0,
            last_request: f64::NEG_INFINITY,
        }
    }

    /// Worst-case seconds allowed to clear the anchor radius.
    fn escape_time(desired_speed: f32) -> f32 {
        let min_move_speed = 0.1 * desired_speed.max(0.0) + 0.5;
        STUCK_RADIUS / min_move_speed
    }

    fn note_request(&mut self, now: f64) {
        self.last_request = now;
    }

    fn re_anchor(&mut self, pos: Vec3, now: f64) {
        self.anchor = pos;
        self.anchor_time = now;
    }

    fn duration(&self, now: f64) -> f32 {
        if self.stuck {
            (now - self.stuck_since) as f32
        } else {
            0.0
        }
    }

    fn clear(&mut self, pos: Vec3, now: f64) {
        self.stuck = false;
        self.re_anchor(pos, now);
    }

    fn sample(&mut self, pos: Vec3, desired_speed: f32, now: f64) -> Option<StuckChange> {
        if now - self.last_request > MOVE_REQUEST_GRACE {
            // Not trying to move; standing still is not being stuck.
            self.stuck = false;
            self.re_anchor(pos, now);
            return None;
        }

        if pos.distance(self.anchor) > STUCK_RADIUS {
            let escaped = self.stuck;
            self.stuck = false;
            self.re_anchor(pos, now);
            return escaped.then_some(StuckChange::Escaped);
        }

        if self.stuck {
            if now - self.last_event >= STUCK_EVENT_INTERVAL {
                self.last_event = now;
                return Some(StuckChange::StillStuck {
                    position: self.anchor,
                    duration: self.duration(now),
                });
            }
            return None;
        }

        if now - self.anchor_time > f64::from(Self::escape_time(desired_speed)) {
            self.stuck = true;
            self.stuck_since = now;
            self.last_event = now;
            return Some(StuckChange::BecameStuck {
                position: self.anchor,
            });
        }
        None
    }
}

// ============================================================================
// Ground Locomotion
// ============================================================================

/// In-flight scripted motion.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    None,
    /// Ballistic hop; resolved by the normal gravity/landing path.
    Jump,
    Climb {
        top: Vec3,
        time_left: f32,
    },
    GapJump {
        landing: Vec3,
        time_left: f32,
    },
    Ladder {
        id: LadderId,
        ascending: bool,
    },
}

/// Walking, falling, jumping and climbing over nav-mesh ground.
///
/// Horizontal movement accelerates toward the weighted average of all
/// `approach` goals issued this tick, swept against world geometry so
/// walls actually stop the agent. Vertical movement snaps to ground
/// within step height and free-falls otherwise.
#[derive(Debug)]
pub struct GroundLocomotion {
    // ===== Capabilities =====
    run_speed: f32,
    walk_speed: f32,
    max_accel: f32,
    max_decel: f32,
    step_height: f32,
    max_jump_height: f32,
    death_drop_height: f32,
    hull: Hull,

    // ===== Per-tick intent =====
    intent_sum: Vec3,
    intent_weight: f32,
    desired_speed: f32,
    face: Option<Vec3>,
    teleport: Option<Vec3>,
    move_requested: bool,

    // ===== Motion state =====
    velocity: Vec3,
    last_motion: Vec3,
    on_ground: bool,
    ground_normal: Vec3,
    action: Action,
    stuck: StuckMonitor,
}

impl GroundLocomotion {
    #[must_use]
    pub fn new(config: &NavConfig) -> Self {
        Self {
            run_speed: config.run_speed,
            walk_speed: config.walk_speed,
            max_accel: config.max_accel,
            max_decel: config.max_decel,
            step_height: config.step_height,
            max_jump_height: config.max_jump_height,
            death_drop_height: config.death_drop_height,
            hull: Hull::new(config.hull_width, config.stand_height),

            intent_sum: Vec3::ZERO,
            intent_weight: 0.0,
            desired_speed: 0.0,
            face: None,
            teleport: None,
            move_requested: false,

            velocity: Vec3::ZERO,
            last_motion: Vec3::ZERO,
            on_ground: true,
            ground_normal: Vec3::Y,
            action: Action::None,
            stuck: StuckMonitor::new(),
        }
    }

    /// Upward launch speed that tops out at `max_jump_height`.
    fn jump_impulse(&self) -> f32 {
        (2.0 * GRAVITY * self.max_jump_height).sqrt()
    }

    fn clear_intent(&mut self) {
        self.intent_sum = Vec3::ZERO;
        self.intent_weight = 0.0;
    }

    fn land(&mut self, normal: Vec3) {
        self.on_ground = true;
        self.ground_normal = normal;
        self.velocity.y = 0.0;
        if self.action == Action::Jump {
            self.action = Action::None;
        }
    }

    fn finish_action(&mut self, pos: Vec3, prev: Vec3, dt: f32) {
        self.action = Action::None;
        self.on_ground = true;
        self.ground_normal = Vec3::Y;
        self.velocity = if dt > 0.0 {
            (pos - prev) / dt
        } else {
            Vec3::ZERO
        };
        self.velocity.y = 0.0;
    }

    /// One tick of ordinary walking: steer, sweep, fall or snap.
    fn step_ground(&mut self, view: WorldView<'_>, pos: Vec3, dt: f32) -> Vec3 {
        // Steer the horizontal velocity toward the requested motion.
        let mut horizontal = Vec3::new(self.velocity.x, 0.0, self.velocity.z);
        let target_vel = if self.intent_weight > 0.0 && self.desired_speed > 0.0 {
            let goal = self.intent_sum / self.intent_weight;
            let to_goal = Vec3::new(goal.x - pos.x, 0.0, goal.z - pos.z);
            match to_goal.try_normalize() {
                Some(dir) => {
                    self.last_motion = dir;
                    dir * self.desired_speed
                }
                None => Vec3::ZERO,
            }
        } else {
            Vec3::ZERO
        };
        let rate = if target_vel.length_squared() >= horizontal.length_squared() {
            self.max_accel
        } else {
            self.max_decel
        };
        horizontal += (target_vel - horizontal).clamp_length_max(rate * dt);
        self.velocity.x = horizontal.x;
        self.velocity.z = horizontal.z;

        // Horizontal sweep, raised half a step so floor contact and
        // curbs below step height do not register as walls.
        let mut next = pos;
        let delta = horizontal * dt;
        if delta.length_squared() > 0.0 {
            let lift = Vec3::Y * (self.step_height * 0.5);
            let sweep = view.trace.sweep_hull(next + lift, delta, self.hull);
            next = sweep.end_position(next + lift, delta) - lift;
            if let Some(contact) = sweep.contact {
                let wall = Vec3::new(contact.normal.x, 0.0, contact.normal.z);
                if let Some(wall) = wall.try_normalize() {
                    let into = self.velocity.dot(wall);
                    if into < 0.0 {
                        self.velocity -= wall * into;
                    }
                }
            }
        }

        // Vertical resolve against the nav mesh.
        let floor = view.graph.ground_height(next).map(|g| (g.height, g.normal));
        let within_step =
            floor.is_some_and(|(height, _)| (next.y - height).abs() <= self.step_height + 0.1);

        if self.velocity.y <= 0.0 && within_step {
            if let Some((height, normal)) = floor {
                next.y = height;
                self.land(normal);
            }
        } else {
            self.on_ground = false;
            self.velocity.y -= GRAVITY * dt;
            let start_y = next.y;
            next.y += self.velocity.y * dt;
            if self.velocity.y <= 0.0 {
                if let Some((height, normal)) = floor {
                    // Land only when this tick actually crossed the floor
                    // plane from above.
                    if next.y <= height && start_y >= height - 0.1 {
                        next.y = height;
                        self.land(normal);
                    }
                }
            }
        }
        next
    }

    fn step_climb(&mut self, top: Vec3, mut time_left: f32, pos: Vec3, dt: f32) -> Vec3 {
        time_left -= dt;
        if time_left <= 0.0 {
            self.finish_action(top, pos, dt);
            return top;
        }

        let mut next = pos;
        if pos.y < top.y - 0.5 {
            next.y = (pos.y + CLIMB_RATE * dt).min(top.y);
        } else {
            let to_top = Vec3::new(top.x - pos.x, 0.0, top.z - pos.z);
            let dist = to_top.length();
            let advance = self.run_speed * dt;
            if dist <= advance.max(1.0) {
                self.finish_action(top, pos, dt);
                return top;
            }
            next += to_top / dist * advance;
        }
        self.action = Action::Climb { top, time_left };
        self.on_ground = false;
        self.velocity = (next - pos) / dt;
        next
    }

    fn step_gap_jump(&mut self, landing: Vec3, mut time_left: f32, pos: Vec3, dt: f32) -> Vec3 {
        time_left -= dt;
        if time_left <= 0.0 {
            self.finish_action(landing, pos, dt);
            return landing;
        }

        let to_landing = landing - pos;
        let dist = to_landing.length();
        let speed = self.run_speed.max(1.0) * 1.25;
        let advance = speed * dt;
        if dist <= advance.max(1.0) {
            self.finish_action(landing, pos, dt);
            return landing;
        }
        self.action = Action::GapJump { landing, time_left };
        self.on_ground = false;
        self.velocity = to_landing / dist * speed;
        pos + to_landing / dist * advance
    }

    fn step_ladder(
        &mut self,
        view: WorldView<'_>,
        id: LadderId,
        ascending: bool,
        pos: Vec3,
        dt: f32,
    ) -> Vec3 {
        let Some(ladder) = view.graph.ladder(id) else {
            log::warn!("ladder {id:?} vanished mid-climb");
            self.action = Action::None;
            return pos;
        };
        let (target, exit_dir) = if ascending {
            (ladder.top(), ladder.facing().vector())
        } else {
            (ladder.bottom(), ladder.facing().opposite().vector())
        };

        // Hold the rail; ladders are treated as vertical lines.
        let mut next = Vec3::new(target.x, pos.y, target.z);
        let remaining = target.y - next.y;
        let climb = self.walk_speed * dt;
        if remaining.abs() <= climb.max(0.5) {
            let exit = Vec3::new(
                target.x + exit_dir.x * self.hull.width * 0.75,
                target.y,
                target.z + exit_dir.z * self.hull.width * 0.75,
            );
            self.finish_action(exit, pos, dt);
            return exit;
        }
        next.y += climb * remaining.signum();
        self.on_ground = false;
        self.velocity = (next - pos) / dt;
        next
    }
}

impl Locomotion for GroundLocomotion {
    fn name(&self) -> &'static str {
        "ground locomotion"
    }

    fn reset(&mut self) {
        self.clear_intent();
        self.desired_speed = 0.0;
        self.face = None;
        self.teleport = None;
        self.move_requested = false;
        self.velocity = Vec3::ZERO;
        self.last_motion = Vec3::ZERO;
        self.on_ground = true;
        self.ground_normal = Vec3::Y;
        self.action = Action::None;
        self.stuck = StuckMonitor::new();
    }

    fn update(&mut self, ctx: &mut BotCtx<'_>) {
        if self.move_requested {
            self.stuck.note_request(ctx.now);
            self.move_requested = false;
        }

        match self.stuck.sample(ctx.position, self.desired_speed, ctx.now) {
            Some(StuckChange::BecameStuck { position }) => {
                log::debug!(
                    "locomotion stuck at ({:.0}, {:.0}, {:.0})",
                    position.x,
                    position.y,
                    position.z
                );
                ctx.events.push(BotEvent::Stuck {
                    position,
                    duration: 0.0,
                });
            }
            Some(StuckChange::StillStuck { position, duration }) => {
                ctx.events.push(BotEvent::Stuck { position, duration });
            }
            Some(StuckChange::Escaped) => {
                log::debug!("locomotion unstuck");
                ctx.events.push(BotEvent::Unstuck);
            }
            None => {}
        }
    }

    fn integrate(&mut self, view: WorldView<'_>, pos: Vec3, dt: f32) -> Vec3 {
        if dt <= 0.0 {
            return pos;
        }
        if let Some(target) = self.teleport.take() {
            self.velocity = Vec3::ZERO;
            self.action = Action::None;
            self.on_ground = view
                .graph
                .ground_height(target)
                .is_some_and(|g| (target.y - g.height).abs() <= self.step_height);
            self.clear_intent();
            return target;
        }

        let next = match self.action {
            Action::None | Action::Jump => self.step_ground(view, pos, dt),
            Action::Climb { top, time_left } => self.step_climb(top, time_left, pos, dt),
            Action::GapJump { landing, time_left } => {
                self.step_gap_jump(landing, time_left, pos, dt)
            }
            Action::Ladder { id, ascending } => self.step_ladder(view, id, ascending, pos, dt),
        };
        self.clear_intent();
        next
    }

    fn approach(&mut self, goal: Vec3, weight: f32) {
        if weight <= 0.0 {
            return;
        }
        self.intent_sum += goal * weight;
        self.intent_weight += weight;
        self.move_requested = true;
    }

    fn drive_to(&mut self, pos: Vec3) {
        self.teleport = Some(pos);
        self.move_requested = true;
    }

    fn face_towards(&mut self, target: Vec3) {
        self.face = Some(target);
    }

    fn face_target(&self) -> Option<Vec3> {
        self.face
    }

    fn jump(&mut self) {
        if !self.on_ground || self.action != Action::None {
            return;
        }
        self.velocity.y = self.jump_impulse();
        self.on_ground = false;
        self.action = Action::Jump;
    }

    fn climb_ledge(&mut self, top: Vec3, forward: Vec3) -> bool {
        if self.is_climbing_or_jumping() || self.is_on_ladder() {
            return false;
        }
        log::debug!("climbing ledge to y={:.0}", top.y);
        self.action = Action::Climb {
            top,
            time_left: ACTION_TIMEOUT,
        };
        self.on_ground = false;
        self.velocity = Vec3::ZERO;
        self.face = Some(top + forward);
        self.move_requested = true;
        true
    }

    fn jump_across_gap(&mut self, landing: Vec3, forward: Vec3) {
        if self.is_climbing_or_jumping() || self.is_on_ladder() {
            return;
        }
        log::debug!(
            "gap jump to ({:.0}, {:.0}, {:.0})",
            landing.x,
            landing.y,
            landing.z
        );
        self.action = Action::GapJump {
            landing,
            time_left: ACTION_TIMEOUT,
        };
        self.on_ground = false;
        self.face = Some(landing + forward);
        self.move_requested = true;
    }

    fn mount_ladder(&mut self, ladder: LadderId, ascending: bool) {
        self.action = Action::Ladder {
            id: ladder,
            ascending,
        };
        self.on_ground = false;
        self.move_requested = true;
    }

    fn set_desired_speed(&mut self, speed: f32) {
        self.desired_speed = speed.max(0.0);
    }

    fn stop(&mut self) {
        self.clear_intent();
        self.desired_speed = 0.0;
    }

    fn speed(&self) -> f32 {
        Vec3::new(self.velocity.x, 0.0, self.velocity.z).length()
    }

    fn desired_speed(&self) -> f32 {
        self.desired_speed
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn desired_motion(&self) -> Vec3 {
        self.last_motion
    }

    fn is_on_ground(&self) -> bool {
        self.on_ground
    }

    fn ground_normal(&self) -> Vec3 {
        self.ground_normal
    }

    fn is_climbing_or_jumping(&self) -> bool {
        matches!(
            self.action,
            Action::Jump | Action::Climb { .. } | Action::GapJump { .. }
        )
    }

    fn is_on_ladder(&self) -> bool {
        matches!(self.action, Action::Ladder { .. })
    }

    fn is_stuck(&self) -> bool {
        self.stuck.stuck
    }

    fn stuck_duration(&self, now: f64) -> f32 {
        self.stuck.duration(now)
    }

    fn clear_stuck(&mut self, now: f64) {
        self.stuck.clear(self.stuck.anchor, now);
    }

    fn run_speed(&self) -> f32 {
        self.run_speed
    }

    fn walk_speed(&self) -> f32 {
        self.walk_speed
    }

    fn max_acceleration(&self) -> f32 {
        self.max_accel
    }

    fn max_deceleration(&self) -> f32 {
        self.max_decel
    }

    fn step_height(&self) -> f32 {
        self.step_height
    }

    fn max_jump_height(&self) -> f32 {
        self.max_jump_height
    }

    fn death_drop_height(&self) -> f32 {
        self.death_drop_height
    }

    fn is_potentially_traversable(
        &self,
        view: WorldView<'_>,
        from: Vec3,
        to: Vec3,
        urgency: Urgency,
    ) -> Traversability {
        let lift = Vec3::Y * self.step_height;
        let delta = to - from;
        if delta.length_squared() < 1.0e-6 {
            return Traversability::CLEAR;
        }
        let sweep = view.trace.sweep_hull(from + lift, delta, self.hull.probe());
        if sweep.is_clear() {
            return Traversability::CLEAR;
        }
        let passable = sweep
            .contact
            .as_ref()
            .and_then(|contact| contact.entity)
            .is_some_and(|entity| self.is_entity_traversable(view, entity, urgency));
        Traversability {
            clear: passable,
            fraction: sweep.fraction,
        }
    }

    fn is_gap(&self, view: WorldView<'_>, pos: Vec3) -> bool {
        match view.graph.ground_height(pos) {
            Some(ground) => pos.y - ground.height > self.step_height,
            None => true,
        }
    }

    fn is_entity_traversable(&self, view: WorldView<'_>, entity: Entity, urgency: Urgency) -> bool {
        let Some(info) = view.directory.info(entity) else {
            return true;
        };
        if !info.alive {
            return true;
        }
        match info.class {
            EntityClass::Door | EntityClass::Brush => true,
            EntityClass::Breakable => urgency == Urgency::Eventual,
            EntityClass::Actor | EntityClass::Prop => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
