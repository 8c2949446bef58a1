//! Path following.
//!
//! Drives locomotion along a computed [`Path`] one tick at a time.
//! Each update runs a fixed sequence of phases: honor a polite wait,
//! handle ladders, shape speed to the upcoming turn, advance past
//! reached goals, climb ledges, jump gaps, detect falling off the
//! route, sidestep local obstructions, and finally steer at the
//! adjusted goal. The follower never recomputes a path on its own;
//! when a route stops working it raises an event and invalidates,
//! leaving the decision to the layer that asked for the move.

use glam::Vec3;
use hecs::Entity;
use rand::Rng;

use crate::agent::{Body, BotCtx, Posture};
use crate::core::{BotEvent, Countdown, EventQueue, NavConfig, PathFailure};
use crate::loco::{Locomotion, Urgency};
use crate::nav::AreaFlags;
use crate::world::{SweepResult, WorldView};

use super::compute::{ComputeResult, CostPolicy, GoalSelector, PathCtx};
use super::route::{Path, MAX_SEGMENTS};
use super::segment::{Segment, SegmentKind};

/// Seconds of continuous stuck state before the route is abandoned.
const STUCK_GIVE_UP: f32 = 1.0;

/// Minimum spacing between avoidance sweeps.
const AVOID_INTERVAL: f32 = 0.5;

/// Bounds for the randomized hindrance wait.
const HINDRANCE_WAIT_MIN: f32 = 0.25;
const HINDRANCE_WAIT_MAX: f32 = 1.0;

/// Half-hull strides probed when searching for the far side of a gap.
const GAP_MARCH_STEPS: usize = 8;

/// Steers an agent along an owned [`Path`].
///
/// The follower owns its route: computing through the wrapper methods
/// both fills the path and resets following state, so a stale goal
/// index can never outlive the route it indexed into.
///
/// # Example
///
/// ```no_run
/// use botnav::core::{EventQueue, NavConfig};
/// use botnav::path::{PathCtx, PathFollower, ShortestPathCost};
///
/// # fn demo(ctx: &PathCtx<'_>, start: glam::Vec3, goal: glam::Vec3) {
/// let config = NavConfig::default();
/// let mut follower = PathFollower::new(&config);
/// let mut events = EventQueue::new();
/// let cost = ShortestPathCost::new(ctx.caps);
/// follower.compute_to_point(ctx, &mut events, start, goal, &cost, 0.0, false);
/// # }
/// ```
#[derive(Debug)]
pub struct PathFollower {
    path: Path,
    goal_index: usize,

    // ===== Tuning =====
    goal_tolerance: f32,
    min_lookahead: f32,
    hull_width: f32,

    // ===== Per-route state =====
    hindrance_wait: Countdown,
    waiting_on: Option<Entity>,
    avoid_timer: Countdown,
    avoid_offset: Vec3,
}

impl PathFollower {
    #[must_use]
    pub fn new(config: &NavConfig) -> Self {
        Self {
            path: Path::new(),
            goal_index: 0,
            goal_tolerance: config.goal_tolerance,
            min_lookahead: config.min_lookahead,
            hull_width: config.hull_width,
            hindrance_wait: Countdown::default(),
            waiting_on: None,
            avoid_timer: Countdown::default(),
            avoid_offset: Vec3::ZERO,
        }
    }

    // ===== Route management =====

    /// Computes a route to a fixed point and restarts following.
    ///
    /// A `NoPath` outcome additionally pushes a [`BotEvent::MoveFailure`]
    /// so the decision layer hears about it without polling.
    pub fn compute_to_point(
        &mut self,
        ctx: &PathCtx<'_>,
        events: &mut EventQueue,
        start: Vec3,
        goal: Vec3,
        cost_policy: &dyn CostPolicy,
        max_path_length: f32,
        include_goal_on_failure: bool,
    ) -> ComputeResult {
        let result = self.path.compute_to_point(
            ctx,
            start,
            goal,
            cost_policy,
            max_path_length,
            include_goal_on_failure,
        );
        self.restart();
        self.report_no_path(events, result);
        result
    }

    /// Computes a route to an entity's position and restarts following.
    pub fn compute_to_entity(
        &mut self,
        ctx: &PathCtx<'_>,
        events: &mut EventQueue,
        start: Vec3,
        target: Entity,
        target_pos: Vec3,
        cost_policy: &dyn CostPolicy,
        max_path_length: f32,
    ) -> ComputeResult {
        let result =
            self.path
                .compute_to_entity(ctx, start, target, target_pos, cost_policy, max_path_length);
        self.restart();
        self.report_no_path(events, result);
        result
    }

    /// Computes a route to the best area a selector picks and restarts
    /// following.
    pub fn compute_open_goal(
        &mut self,
        ctx: &PathCtx<'_>,
        events: &mut EventQueue,
        start: Vec3,
        cost_policy: &dyn CostPolicy,
        selector: &mut dyn GoalSelector,
        max_search_cost: f32,
    ) -> ComputeResult {
        let result =
            self.path
                .compute_open_goal(ctx, start, cost_policy, selector, max_search_cost);
        self.restart();
        self.report_no_path(events, result);
        result
    }

    fn report_no_path(&self, events: &mut EventQueue, result: ComputeResult) {
        if result == ComputeResult::NoPath {
            events.push(BotEvent::MoveFailure {
                reason: PathFailure::NoPath,
            });
        }
    }

    /// Resets following state to the start of the current path.
    ///
    /// Required after editing the path through [`Self::path_mut`].
    pub fn restart(&mut self) {
        self.goal_index = usize::from(self.path.len() > 1);
        self.path.set_cursor(0.0);
        self.hindrance_wait.invalidate();
        self.waiting_on = None;
        self.avoid_timer.invalidate();
        self.avoid_offset = Vec3::ZERO;
    }

    /// Drops the current route without raising any event.
    pub fn abandon(&mut self) {
        self.path.invalidate();
        self.restart();
    }

    #[must_use]
    pub fn is_following(&self) -> bool {
        self.path.is_valid()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn path_mut(&mut self) -> &mut Path {
        &mut self.path
    }

    /// The segment currently being moved toward.
    #[must_use]
    pub fn goal(&self) -> Option<&Segment> {
        self.path.segment(self.goal_index)
    }

    #[must_use]
    pub fn goal_index(&self) -> usize {
        self.goal_index
    }

    /// The actor currently being politely waited on, if any.
    #[must_use]
    pub fn waiting_on(&self) -> Option<Entity> {
        self.waiting_on
    }

    pub fn set_lookahead(&mut self, distance: f32) {
        self.min_lookahead = distance.max(0.0);
    }

    // ===== Per-tick update =====

    /// Runs one tick of path following.
    ///
    /// Safe to call with an invalid path; it simply does nothing.
    pub fn update(&mut self, ctx: &mut BotCtx<'_>, loco: &mut dyn Locomotion, body: &mut dyn Body) {
        if !self.path.is_valid() {
            return;
        }

        // Phase 1: an armed wait timer freezes us until it elapses.
        if self.hindrance_wait.has_started() {
            if !self.hindrance_wait.is_elapsed(ctx.now) {
                loco.stop();
                return;
            }
            self.hindrance_wait.invalidate();
            self.waiting_on = None;
        }

        // Stuck beyond forgiveness: this route is not working.
        if loco.is_stuck() && loco.stuck_duration(ctx.now) > STUCK_GIVE_UP {
            log::info!(
                "abandoning route: stuck for {:.1}s",
                loco.stuck_duration(ctx.now)
            );
            loco.clear_stuck(ctx.now);
            ctx.events.push(BotEvent::MoveFailure {
                reason: PathFailure::Stuck,
            });
            self.path.invalidate();
            return;
        }

        let Some(goal) = self.path.segment(self.goal_index).copied() else {
            self.path.invalidate();
            return;
        };

        // Phase 2: ladder goals get dedicated handling.
        if matches!(goal.kind, SegmentKind::LadderUp | SegmentKind::LadderDown)
            && self.update_ladder(ctx, loco, &goal)
        {
            return;
        }

        // Phase 3: speed shaped by the turn ahead.
        loco.set_desired_speed(self.shape_speed(ctx, loco, &goal));

        // Phase 4: advance past reached goals; may finish the path.
        let Some(goal) = self.check_progress(ctx, loco) else {
            return;
        };

        // Phase 5 and 6: surmount ledges, leap gaps.
        let climbing = self.try_ledge_climb(ctx, loco, body, &goal);
        if !climbing {
            self.try_gap_jump(ctx, loco, &goal);
        }

        // Phase 7: dropped below a route we cannot rejoin?
        if self.check_fell_off(ctx, loco, &goal) {
            return;
        }

        // Phase 8: local obstruction handling.
        if self.update_avoidance(ctx, loco, body, &goal) {
            return;
        }

        // Phase 9: steer at the laterally adjusted goal.
        let target = goal.pos + self.avoid_offset;
        loco.face_towards(target);
        loco.approach(target, 1.0);
        if loco.is_climbing_or_jumping() || loco.is_on_ladder() {
            body.set_posture(Posture::Stand);
        }
    }

    // ===== Phase 2: ladders =====

    /// Returns true when the ladder logic has fully handled this tick.
    fn update_ladder(
        &mut self,
        ctx: &mut BotCtx<'_>,
        loco: &mut dyn Locomotion,
        goal: &Segment,
    ) -> bool {
        let Some(ladder_id) = goal.ladder else {
            return false;
        };
        if loco.is_on_ladder() {
            // Locomotion owns the motion until it dismounts.
            return true;
        }
        let Some(ladder) = ctx.view.graph.ladder(ladder_id) else {
            log::warn!("route references missing ladder {ladder_id:?}");
            ctx.events.push(BotEvent::MoveFailure {
                reason: PathFailure::NoPath,
            });
            self.path.invalidate();
            return true;
        };

        let ascending = goal.kind == SegmentKind::LadderUp;
        let arrived = if ascending {
            ctx.position.y >= ladder.top().y - loco.step_height()
        } else {
            ctx.position.y <= ladder.bottom().y + loco.step_height()
        };
        if arrived {
            self.advance_goal(ctx.view, ctx.position, loco);
            return true;
        }

        let mount = if ascending {
            ladder.bottom()
        } else {
            ladder.top()
        };
        let reach = Vec3::new(mount.x - ctx.position.x, 0.0, mount.z - ctx.position.z);
        if reach.length() <= self.goal_tolerance {
            log::debug!("mounting ladder {ladder_id:?}");
            loco.mount_ladder(ladder_id, ascending);
            loco.face_towards(mount + ladder.facing().vector() * 10.0);
            return true;
        }
        // Not there yet; normal steering walks us to the mount point.
        false
    }

    // ===== Phase 3: speed shaping =====

    fn shape_speed(&self, ctx: &BotCtx<'_>, loco: &dyn Locomotion, goal: &Segment) -> f32 {
        // Gap approaches and mid-air travel get full speed so the jump
        // clears.
        if goal.kind == SegmentKind::JumpGap || !loco.is_on_ground() {
            return loco.run_speed();
        }
        let run = loco.run_speed();
        let walk = loco.walk_speed();
        let mut speed = run - (run - walk) * (3.0 * goal.curvature.abs()).min(1.0);

        // Explicit area hints override the turn shaping.
        if let Some(area) = ctx.view.graph.area(goal.area) {
            if area.flags().contains(AreaFlags::RUN) {
                speed = run;
            } else if area.flags().contains(AreaFlags::WALK) {
                speed = speed.min(walk);
            }
        }
        speed
    }

    // ===== Phase 4: progress =====

    /// Advances past every goal already satisfied. Returns the segment
    /// to keep steering toward, or `None` once the path is finished.
    fn check_progress(&mut self, ctx: &mut BotCtx<'_>, loco: &mut dyn Locomotion) -> Option<Segment> {
        for _ in 0..MAX_SEGMENTS {
            let Some(goal) = self.path.segment(self.goal_index).copied() else {
                self.path.invalidate();
                return None;
            };
            if !self.goal_reached(ctx.position, loco, self.goal_index, &goal) {
                return Some(goal);
            }
            if self.goal_index + 1 >= self.path.len() {
                if loco.is_on_ground() {
                    log::info!("route complete after {:.0} units", self.path.length());
                    loco.stop();
                    ctx.events.push(BotEvent::MoveSuccess);
                    self.path.invalidate();
                    return None;
                }
                // Reached the end mid-air; hold the goal until we land.
                return Some(goal);
            }
            self.advance_goal(ctx.view, ctx.position, loco);
        }
        self.path.segment(self.goal_index).copied()
    }

    fn goal_reached(
        &self,
        position: Vec3,
        loco: &dyn Locomotion,
        index: usize,
        goal: &Segment,
    ) -> bool {
        let to_goal = goal.pos - position;
        match goal.kind {
            // Ladder goals sit at the mount point and are advanced by
            // the ladder phase once the climb arrives, never by
            // proximity to the mount.
            SegmentKind::LadderUp | SegmentKind::LadderDown => false,
            // A climb is done once we have risen to the ledge.
            SegmentKind::ClimbUp => position.y > goal.pos.y - loco.step_height(),
            // A drop is done once we are down at the landing height.
            SegmentKind::DropDown => {
                let landing_y = self
                    .path
                    .segment(index + 1)
                    .map_or(goal.pos.y, |next| next.pos.y);
                position.y <= landing_y + loco.step_height()
            }
            // A gap is done only once we are past the lip and grounded
            // again; plain proximity to the lip must not count.
            SegmentKind::JumpGap => {
                let forward = goal.forward_flat();
                loco.is_on_ground() && forward != Vec3::ZERO && to_goal.dot(forward) <= 0.0
            }
            _ => {
                let flat = Vec3::new(to_goal.x, 0.0, to_goal.z);
                if flat.length() <= self.goal_tolerance {
                    return true;
                }
                let forward = goal.forward_flat();
                forward != Vec3::ZERO && to_goal.dot(forward) <= 0.0
            }
        }
    }

    /// Moves to the next goal, then pulls it further forward across
    /// flat, directly walkable ground inside the lookahead.
    fn advance_goal(&mut self, view: WorldView<'_>, position: Vec3, loco: &dyn Locomotion) {
        self.goal_index += 1;

        loop {
            let Some(current) = self.path.segment(self.goal_index).copied() else {
                break;
            };
            let Some(next) = self.path.segment(self.goal_index + 1).copied() else {
                break;
            };
            if current.kind != SegmentKind::Ground || next.kind != SegmentKind::Ground {
                break;
            }
            if position.distance(next.pos) > self.min_lookahead {
                break;
            }
            // Only level or downhill ground may be skipped across.
            if next.pos.y > position.y + loco.step_height() {
                break;
            }
            if !loco
                .is_potentially_traversable(view, position, next.pos, Urgency::Immediate)
                .clear
            {
                break;
            }
            if self.line_has_gap(view, loco, position, next.pos) {
                break;
            }
            self.goal_index += 1;
        }

        if let Some(goal) = self.path.segment(self.goal_index) {
            self.path.set_cursor(goal.distance_from_start);
        }
    }

    fn line_has_gap(
        &self,
        view: WorldView<'_>,
        loco: &dyn Locomotion,
        from: Vec3,
        to: Vec3,
    ) -> bool {
        let flat = Vec3::new(to.x - from.x, 0.0, to.z - from.z);
        let dist = flat.length();
        if dist < 1.0 {
            return false;
        }
        let stride = (self.hull_width * 0.5).max(1.0);
        let samples = ((dist / stride).ceil() as usize).clamp(1, 16);
        let height = from.y.max(to.y) + loco.step_height() * 0.5;
        for i in 1..=samples {
            let t = i as f32 / samples as f32;
            let p = Vec3::new(from.x + flat.x * t, height, from.z + flat.z * t);
            if loco.is_gap(view, p) {
                return true;
            }
        }
        false
    }

    // ===== Phase 5: ledge climbing =====

    /// Returns true while a climb is running or was just started.
    fn try_ledge_climb(
        &self,
        ctx: &BotCtx<'_>,
        loco: &mut dyn Locomotion,
        body: &dyn Body,
        goal: &Segment,
    ) -> bool {
        if loco.is_climbing_or_jumping() {
            return true;
        }
        if !loco.is_on_ground() || loco.is_on_ladder() {
            return false;
        }
        let to_goal = Vec3::new(goal.pos.x - ctx.position.x, 0.0, goal.pos.z - ctx.position.z);
        let Some(forward) = to_goal.try_normalize() else {
            return false;
        };

        // Fast path: a declared climb close ahead trusts the route's
        // landing height instead of probing for it.
        if goal.kind == SegmentKind::ClimbUp && to_goal.length() <= ctx.config.ledge_lookahead {
            let top = goal.pos + forward * (body.hull().width * 0.5);
            return loco.climb_ledge(top, forward);
        }

        if ctx.config.ledge_lookahead <= 0.0 {
            return false;
        }

        // Geometric scan: a shin-height sweep that hits a wall means
        // something the planner did not know about is in the way.
        let view = ctx.view;
        let hull = body.hull();
        let ahead = forward * ctx.config.ledge_lookahead;
        let step = loco.step_height();
        let low = view
            .trace
            .sweep_hull(ctx.position + Vec3::Y * step, ahead, hull);
        if self.sweep_open(view, loco, &low) {
            return false;
        }

        // Raise the sweep in step increments until the hull clears,
        // then verify there is actual ledge to stand on.
        let mut raise = step * 2.0;
        while raise <= loco.max_jump_height() + 0.1 {
            let sweep = view
                .trace
                .sweep_hull(ctx.position + Vec3::Y * raise, ahead, hull);
            if sweep.is_clear() {
                let over = ctx.position + Vec3::Y * raise + ahead;
                let Some(ground) = view.graph.ground_height(over) else {
                    return false;
                };
                let rise = ground.height - ctx.position.y;
                if rise <= step || rise > loco.max_jump_height() {
                    return false;
                }
                let lip = Vec3::new(over.x, ground.height + step, over.z);
                let depth = view
                    .trace
                    .sweep_hull(lip, forward * ctx.config.min_ledge_depth, hull);
                if !depth.is_clear() {
                    return false;
                }
                let top = Vec3::new(over.x, ground.height, over.z);
                log::debug!("unplanned ledge ahead; climbing to y={:.0}", top.y);
                return loco.climb_ledge(top, forward);
            }
            raise += step;
        }
        false
    }

    // ===== Phase 6: gap jumping =====

    fn try_gap_jump(&self, ctx: &BotCtx<'_>, loco: &mut dyn Locomotion, goal: &Segment) -> bool {
        if loco.is_climbing_or_jumping() || loco.is_on_ladder() || !loco.is_on_ground() {
            return false;
        }
        let view = ctx.view;
        let to_goal = Vec3::new(goal.pos.x - ctx.position.x, 0.0, goal.pos.z - ctx.position.z);
        let Some(forward) = to_goal.try_normalize() else {
            return false;
        };

        // Fast path: launch a declared gap once it is in range.
        if goal.kind == SegmentKind::JumpGap {
            if to_goal.length() <= ctx.config.gap_jump_lookahead {
                let landing = self
                    .path
                    .segment(self.goal_index + 1)
                    .map_or(goal.pos, |next| next.pos);
                loco.jump_across_gap(landing, forward);
                return true;
            }
            return false;
        }

        // Unexpected hole right at our feet?
        let step = loco.step_height();
        let probe = ctx.position + forward * (self.hull_width * 0.5 + 2.0) + Vec3::Y * (step * 0.5);
        if !loco.is_gap(view, probe) {
            return false;
        }
        // March forward in half-hull strides hunting for the far side.
        let stride = (self.hull_width * 0.5).max(1.0);
        for i in 1..=GAP_MARCH_STEPS {
            let sample = probe + forward * (stride * i as f32);
            if loco.is_gap(view, sample) {
                continue;
            }
            if let Some(ground) = view.graph.ground_height(sample) {
                let landing = Vec3::new(sample.x, ground.height, sample.z);
                log::debug!("unplanned gap ahead; jumping {:.0} units", stride * i as f32);
                loco.jump_across_gap(landing, forward);
                return true;
            }
        }
        false
    }

    // ===== Phase 7: fell off the route =====

    fn check_fell_off(
        &mut self,
        ctx: &mut BotCtx<'_>,
        loco: &mut dyn Locomotion,
        goal: &Segment,
    ) -> bool {
        if loco.is_climbing_or_jumping() || loco.is_on_ladder() || !loco.is_on_ground() {
            return false;
        }
        // A ladder goal towers overhead by construction.
        if goal.ladder.is_some() {
            return false;
        }
        // Stairs legitimately sit far below their goal for a while.
        if let Some(area_id) = ctx.view.graph.nearest_area(ctx.position) {
            if let Some(area) = ctx.view.graph.area(area_id) {
                if area.flags().contains(AreaFlags::STAIRS) {
                    return false;
                }
            }
        }
        let rise = goal.pos.y - ctx.position.y;
        if rise <= loco.max_jump_height() {
            return false;
        }
        let flat = Vec3::new(goal.pos.x - ctx.position.x, 0.0, goal.pos.z - ctx.position.z);
        if !(loco.is_stuck() || flat.length() <= self.goal_tolerance) {
            return false;
        }
        // If the goal after this one is still reachable, normal
        // progress will recover; only bail when both are overhead.
        if let Some(next) = self.path.segment(self.goal_index + 1) {
            if next.pos.y - ctx.position.y <= loco.max_jump_height() {
                return false;
            }
        }

        log::info!("fell off the route: goal is {rise:.0} units overhead");
        loco.clear_stuck(ctx.now);
        ctx.events.push(BotEvent::MoveFailure {
            reason: PathFailure::FellOff,
        });
        self.path.invalidate();
        true
    }

    // ===== Phase 8: avoidance =====

    /// Returns true when a polite wait was started this tick.
    fn update_avoidance(
        &mut self,
        ctx: &mut BotCtx<'_>,
        loco: &mut dyn Locomotion,
        body: &dyn Body,
        goal: &Segment,
    ) -> bool {
        let view = ctx.view;
        let to_goal = Vec3::new(goal.pos.x - ctx.position.x, 0.0, goal.pos.z - ctx.position.z);
        let Some(forward) = to_goal.try_normalize() else {
            return false;
        };

        // An actor parked in the lane earns a short randomized wait
        // rather than a shove.
        if let Some(blocker) = self.find_hindrance(ctx, forward) {
            let wait = rand::thread_rng().gen_range(HINDRANCE_WAIT_MIN..HINDRANCE_WAIT_MAX);
            log::debug!("waiting {wait:.2}s for a blocking actor");
            self.waiting_on = Some(blocker);
            self.hindrance_wait.start(ctx.now, wait);
            loco.stop();
            return true;
        }

        // The sidestep offset is refreshed at a low rate and reused
        // between sweeps.
        if !self.avoid_timer.is_elapsed(ctx.now) {
            return false;
        }
        self.avoid_timer.start(ctx.now, AVOID_INTERVAL);
        self.avoid_offset = Vec3::ZERO;
        if !loco.is_on_ground() || loco.is_climbing_or_jumping() {
            return false;
        }

        let left_dir = Vec3::Y.cross(forward).normalize_or_zero();
        if left_dir == Vec3::ZERO {
            return false;
        }
        let hull = body.hull().probe();
        let lift = Vec3::Y * loco.step_height();
        let side = self.hull_width * 0.5;
        let ahead = forward * ctx.config.avoid_lookahead;

        let left = view
            .trace
            .sweep_hull(ctx.position + lift + left_dir * side, ahead, hull);
        let right = view
            .trace
            .sweep_hull(ctx.position + lift - left_dir * side, ahead, hull);
        let left_open = self.sweep_open(view, loco, &left);
        let right_open = self.sweep_open(view, loco, &right);

        self.avoid_offset = match (left_open, right_open) {
            (true, true) => Vec3::ZERO,
            // Left lane blocked: lean right, harder the closer it is.
            (false, true) => -left_dir * self.hull_width * (1.0 - left.fraction),
            (true, false) => left_dir * self.hull_width * (1.0 - right.fraction),
            (false, false) => {
                let side_dir = if left.fraction < right.fraction {
                    -left_dir
                } else {
                    left_dir
                };
                side_dir * self.hull_width * (1.0 - left.fraction.max(right.fraction))
            }
        };
        false
    }

    fn sweep_open(&self, view: WorldView<'_>, loco: &dyn Locomotion, sweep: &SweepResult) -> bool {
        if sweep.is_clear() {
            return true;
        }
        sweep
            .contact
            .as_ref()
            .and_then(|contact| contact.entity)
            .is_some_and(|entity| loco.is_entity_traversable(view, entity, Urgency::Immediate))
    }

    fn find_hindrance(&self, ctx: &BotCtx<'_>, forward: Vec3) -> Option<Entity> {
        let view = ctx.view;
        let range = ctx.config.hindrance_range;
        for entity in view.directory.actors() {
            if ctx.me == Some(entity) {
                continue;
            }
            let Some(info) = view.directory.info(entity) else {
                continue;
            };
            if !info.alive {
                continue;
            }
            let to = info.position - ctx.position;
            if to.y.abs() > ctx.config.stand_height {
                continue;
            }
            let flat = Vec3::new(to.x, 0.0, to.z);
            let along = flat.dot(forward);
            if along <= 0.0 || along > range {
                continue;
            }
            let lateral = (flat - forward * along).length();
            if lateral > self.hull_width * 0.5 + info.half_extents.x {
                continue;
            }
            if view.policy.should_wait_for(ctx.team, &info) {
                return Some(entity);
            }
        }
        None
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::compute::{MoverCaps, ShortestPathCost};
    use crate::agent::StandardBody;
    use crate::core::EventQueue;
    use crate::loco::Traversability;
    use crate::nav::{AreaMesh, Dir, LadderId};
    use crate::world::{
        ActorInfo, ClearTrace, DefaultPolicy, EntityClass, HecsDirectory, Team, Transform,
    };

    const DT: f32 = 1.0 / 60.0;

    /// Locomotion double that records commands instead of moving.
    #[derive(Debug, Default)]
    struct ScriptLoco {
        approached: Option<Vec3>,
        faced: Option<Vec3>,
        desired: f32,
        stopped: bool,
        climbs: Vec<Vec3>,
        gap_jumps: Vec<(Vec3, Vec3)>,
        ladders: Vec<(LadderId, bool)>,
        airborne: bool,
        climbing: bool,
        stuck: bool,
        stuck_for: f32,
        cleared_stuck: bool,
        sees_gaps: bool,
    }

    impl Locomotion for ScriptLoco {
        fn name(&self) -> &'static str {
            "script"
        }
        fn reset(&mut self) {
            *self = Self::default();
        }
        fn update(&mut self, _ctx: &mut BotCtx<'_>) {}
        fn integrate(&mut self, _view: WorldView<'_>, pos: Vec3, _dt: f32) -> Vec3 {
            pos
        }
        fn approach(&mut self, goal: Vec3, _weight: f32) {
            self.approached = Some(goal);
            self.stopped = false;
        }
        fn drive_to(&mut self, _pos: Vec3) {}
        fn face_towards(&mut self, target: Vec3) {
            self.faced = Some(target);
        }
        fn face_target(&self) -> Option<Vec3> {
            self.faced
        }
        fn jump(&mut self) {}
        fn climb_ledge(&mut self, top: Vec3, _forward: Vec3) -> bool {
            self.climbs.push(top);
            self.climbing = true;
            true
        }
        fn jump_across_gap(&mut self, landing: Vec3, forward: Vec3) {
            self.gap_jumps.push((landing, forward));
            self.climbing = true;
        }
        fn mount_ladder(&mut self, ladder: LadderId, ascending: bool) {
            self.ladders.push((ladder, ascending));
        }
        fn set_desired_speed(&mut self, speed: f32) {
            self.desired = speed;
        }
        fn stop(&mut self) {
            self.stopped = true;
        }
        fn speed(&self) -> f32 {
            0.0
        }
        fn desired_speed(&self) -> f32 {
            self.desired
        }
        fn velocity(&self) -> Vec3 {
            Vec3::ZERO
        }
        fn desired_motion(&self) -> Vec3 {
            Vec3::ZERO
        }
        fn is_on_ground(&self) -> bool {
            !self.airborne
        }
        fn ground_normal(&self) -> Vec3 {
            Vec3::Y
        }
        fn is_climbing_or_jumping(&self) -> bool {
            self.climbing
        }
        fn is_on_ladder(&self) -> bool {
            false
        }
        fn is_stuck(&self) -> bool {
            self.stuck
        }
        fn stuck_duration(&self, _now: f64) -> f32 {
            self.stuck_for
        }
        fn clear_stuck(&mut self, _now: f64) {
            self.cleared_stuck = true;
            self.stuck = false;
        }
        fn run_speed(&self) -> f32 {
            150.0
        }
        fn walk_speed(&self) -> f32 {
            75.0
        }
        fn max_acceleration(&self) -> f32 {
            500.0
        }
        fn max_deceleration(&self) -> f32 {
            800.0
        }
        fn step_height(&self) -> f32 {
            18.0
        }
        fn max_jump_height(&self) -> f32 {
            60.0
        }
        fn death_drop_height(&self) -> f32 {
            200.0
        }
        fn is_potentially_traversable(
            &self,
            _view: WorldView<'_>,
            _from: Vec3,
            _to: Vec3,
            _urgency: Urgency,
        ) -> Traversability {
            Traversability::CLEAR
        }
        fn is_gap(&self, _view: WorldView<'_>, _pos: Vec3) -> bool {
            self.sees_gaps
        }
        fn is_entity_traversable(
            &self,
            _view: WorldView<'_>,
            _entity: Entity,
            _urgency: Urgency,
        ) -> bool {
            false
        }
    }

    fn config() -> NavConfig {
        NavConfig::default()
    }

    fn corridor_mesh() -> AreaMesh {
        let mut mesh = AreaMesh::new();
        let a = mesh.add_area(Vec3::new(0.0, 0.0, 0.0), Vec3::new(200.0, 0.0, 100.0));
        let b = mesh.add_area(Vec3::new(200.0, 0.0, 0.0), Vec3::new(400.0, 0.0, 100.0));
        let c = mesh.add_area(Vec3::new(400.0, 0.0, 0.0), Vec3::new(600.0, 0.0, 100.0));
        mesh.connect_two_way(a, b, Dir::East);
        mesh.connect_two_way(b, c, Dir::East);
        mesh
    }

    fn compute<'a>(
        follower: &mut PathFollower,
        mesh: &'a AreaMesh,
        config: &'a NavConfig,
        start: Vec3,
        goal: Vec3,
    ) -> ComputeResult {
        let ctx = PathCtx {
            graph: mesh,
            trace: &ClearTrace,
            config,
            caps: MoverCaps::from_config(config),
            now: 0.0,
        };
        let cost = ShortestPathCost::new(ctx.caps);
        let mut events = EventQueue::new();
        follower.compute_to_point(&ctx, &mut events, start, goal, &cost, 0.0, false)
    }

    macro_rules! bot_ctx {
        ($view:expr, $config:expr, $events:expr, $pos:expr, $now:expr) => {
            BotCtx {
                view: $view,
                config: $config,
                events: $events,
                me: None,
                team: Team(1),
                position: $pos,
                velocity: Vec3::ZERO,
                facing: Vec3::X,
                now: $now,
                dt: DT,
            }
        };
    }

    macro_rules! view {
        ($mesh:expr, $world:expr) => {{
            WorldView {
                graph: $mesh,
                trace: &ClearTrace,
                directory: &HecsDirectory::new($world),
                policy: &DefaultPolicy,
            }
        }};
    }

    #[test]
    fn test_update_steers_toward_first_goal() {
        let mesh = corridor_mesh();
        let world = hecs::World::new();
        let config = config();
        let mut follower = PathFollower::new(&config);
        let result = compute(
            &mut follower,
            &mesh,
            &config,
            Vec3::new(50.0, 0.0, 50.0),
            Vec3::new(550.0, 0.0, 50.0),
        );
        assert_eq!(result, ComputeResult::Complete);
        assert!(follower.is_following());
        assert_eq!(follower.goal_index(), 1);

        let mut events = EventQueue::new();
        let view = view!(&mesh, &world);
        let mut ctx = bot_ctx!(view, &config, &mut events, Vec3::new(50.0, 0.0, 50.0), 0.1);
        let mut loco = ScriptLoco::default();
        let mut body = StandardBody::new(&config);
        follower.update(&mut ctx, &mut loco, &mut body);

        let target = loco.approached.expect("follower should steer");
        assert!(target.x > 50.0, "steering backwards: {target}");
        assert!((loco.desired - 150.0).abs() < 0.01, "straight corridor runs");
        assert!(loco.faced.is_some());
        assert!(follower.is_following());
    }

    #[test]
    fn test_goals_advance_and_path_completes() {
        let mesh = corridor_mesh();
        let world = hecs::World::new();
        let config = config();
        let mut follower = PathFollower::new(&config);
        compute(
            &mut follower,
            &mesh,
            &config,
            Vec3::new(50.0, 0.0, 50.0),
            Vec3::new(550.0, 0.0, 50.0),
        );

        let mut events = EventQueue::new();
        let view = view!(&mesh, &world);
        let mut loco = ScriptLoco::default();
        let mut body = StandardBody::new(&config);

        // Past the first boundary: the goal index moves up.
        let mut ctx = bot_ctx!(view, &config, &mut events, Vec3::new(390.0, 0.0, 50.0), 0.1);
        follower.update(&mut ctx, &mut loco, &mut body);
        assert!(follower.is_following());
        let goal = follower.goal().expect("still following");
        assert!(goal.pos.x > 400.0, "goal did not advance: {:?}", goal.pos);

        // Standing at the end while grounded finishes the route.
        let mut ctx = bot_ctx!(view, &config, &mut events, Vec3::new(540.0, 0.0, 50.0), 0.2);
        follower.update(&mut ctx, &mut loco, &mut body);
        assert!(!follower.is_following());

        events.swap();
        assert!(
            events.iter().any(|e| matches!(e, BotEvent::MoveSuccess)),
            "no success event"
        );
    }

    #[test]
    fn test_completion_waits_for_ground() {
        let mesh = corridor_mesh();
        let world = hecs::World::new();
        let config = config();
        let mut follower = PathFollower::new(&config);
        compute(
            &mut follower,
            &mesh,
            &config,
            Vec3::new(50.0, 0.0, 50.0),
            Vec3::new(550.0, 0.0, 50.0),
        );

        let mut events = EventQueue::new();
        let view = view!(&mesh, &world);
        let mut loco = ScriptLoco {
            airborne: true,
            ..Default::default()
        };
        let mut body = StandardBody::new(&config);
        let mut ctx = bot_ctx!(view, &config, &mut events, Vec3::new(545.0, 0.0, 50.0), 0.1);
        follower.update(&mut ctx, &mut loco, &mut body);

        assert!(follower.is_following(), "path dropped while airborne");
        assert!((loco.desired - 150.0).abs() < 0.01, "mid-air forces run speed");
        events.swap();
        assert!(events.iter().next().is_none(), "no events expected yet");
    }

    #[test]
    fn test_prolonged_stuck_abandons_route() {
        let mesh = corridor_mesh();
        let world = hecs::World::new();
        let config = config();
        let mut follower = PathFollower::new(&config);
        compute(
            &mut follower,
            &mesh,
            &config,
            Vec3::new(50.0, 0.0, 50.0),
            Vec3::new(550.0, 0.0, 50.0),
        );

        let mut events = EventQueue::new();
        let view = view!(&mesh, &world);
        let mut loco = ScriptLoco {
            stuck: true,
            stuck_for: 2.0,
            ..Default::default()
        };
        let mut body = StandardBody::new(&config);
        let mut ctx = bot_ctx!(view, &config, &mut events, Vec3::new(100.0, 0.0, 50.0), 5.0);
        follower.update(&mut ctx, &mut loco, &mut body);

        assert!(!follower.is_following());
        assert!(loco.cleared_stuck);
        events.swap();
        assert!(events.iter().any(|e| matches!(
            e,
            BotEvent::MoveFailure {
                reason: PathFailure::Stuck
            }
        )));
    }

    #[test]
    fn test_fresh_stuck_is_tolerated() {
        let mesh = corridor_mesh();
        let world = hecs::World::new();
        let config = config();
        let mut follower = PathFollower::new(&config);
        compute(
            &mut follower,
            &mesh,
            &config,
            Vec3::new(50.0, 0.0, 50.0),
            Vec3::new(550.0, 0.0, 50.0),
        );

        let mut events = EventQueue::new();
        let view = view!(&mesh, &world);
        let mut loco = ScriptLoco {
            stuck: true,
            stuck_for: 0.4,
            ..Default::default()
        };
        let mut body = StandardBody::new(&config);
        let mut ctx = bot_ctx!(view, &config, &mut events, Vec3::new(100.0, 0.0, 50.0), 5.0);
        follower.update(&mut ctx, &mut loco, &mut body);

        assert!(follower.is_following(), "gave up too early");
        assert!(loco.approached.is_some(), "should keep pushing");
    }

    #[test]
    fn test_hindrance_starts_polite_wait() {
        let mesh = corridor_mesh();
        let mut world = hecs::World::new();
        // A friendly actor parked squarely in the lane.
        let friend = world.spawn((
            Transform::from_position(Vec3::new(120.0, 0.0, 50.0)),
            ActorInfo::new(EntityClass::Actor, Team(1)),
        ));
        let config = config();
        let mut follower = PathFollower::new(&config);
        compute(
            &mut follower,
            &mesh,
            &config,
            Vec3::new(50.0, 0.0, 50.0),
            Vec3::new(550.0, 0.0, 50.0),
        );

        let mut events = EventQueue::new();
        let view = view!(&mesh, &world);
        let mut loco = ScriptLoco::default();
        let mut body = StandardBody::new(&config);
        let mut ctx = bot_ctx!(view, &config, &mut events, Vec3::new(50.0, 0.0, 50.0), 1.0);
        follower.update(&mut ctx, &mut loco, &mut body);

        assert!(loco.stopped, "should halt for the blocker");
        assert!(loco.approached.is_none());
        assert_eq!(follower.waiting_on(), Some(friend));
        assert!(follower.is_following());

        // Still inside the minimum wait window: frozen.
        let mut ctx = bot_ctx!(view, &config, &mut events, Vec3::new(50.0, 0.0, 50.0), 1.1);
        follower.update(&mut ctx, &mut loco, &mut body);
        assert!(loco.approached.is_none());

        // Blocker gone and the wait elapsed: movement resumes.
        world.despawn(friend).unwrap();
        let view = view!(&mesh, &world);
        let mut ctx = bot_ctx!(view, &config, &mut events, Vec3::new(50.0, 0.0, 50.0), 2.5);
        follower.update(&mut ctx, &mut loco, &mut body);
        assert!(loco.approached.is_some(), "wait never expired");
        assert_eq!(follower.waiting_on(), None);
    }

    #[test]
    fn test_hostile_actor_is_not_waited_for() {
        let mesh = corridor_mesh();
        let mut world = hecs::World::new();
        let _enemy = world.spawn((
            Transform::from_position(Vec3::new(120.0, 0.0, 50.0)),
            ActorInfo::new(EntityClass::Actor, Team(2)),
        ));
        let config = config();
        let mut follower = PathFollower::new(&config);
        compute(
            &mut follower,
            &mesh,
            &config,
            Vec3::new(50.0, 0.0, 50.0),
            Vec3::new(550.0, 0.0, 50.0),
        );

        let mut events = EventQueue::new();
        let view = view!(&mesh, &world);
        let mut loco = ScriptLoco::default();
        let mut body = StandardBody::new(&config);
        let mut ctx = bot_ctx!(view, &config, &mut events, Vec3::new(50.0, 0.0, 50.0), 1.0);
        follower.update(&mut ctx, &mut loco, &mut body);

        assert!(loco.approached.is_some(), "enemies do not earn a wait");
        assert_eq!(follower.waiting_on(), None);
    }

    #[test]
    fn test_climb_segment_triggers_ledge_climb() {
        let mut mesh = AreaMesh::new();
        let low = mesh.add_area(Vec3::new(0.0, 0.0, 0.0), Vec3::new(200.0, 0.0, 100.0));
        let high = mesh.add_area(Vec3::new(200.0, 50.0, 0.0), Vec3::new(400.0, 50.0, 100.0));
        mesh.connect_two_way(low, high, Dir::East);
        let world = hecs::World::new();
        let config = config();
        let mut follower = PathFollower::new(&config);
        let result = compute(
            &mut follower,
            &mesh,
            &config,
            Vec3::new(50.0, 0.0, 50.0),
            Vec3::new(350.0, 50.0, 50.0),
        );
        assert_eq!(result, ComputeResult::Complete);
        let climb = follower
            .path()
            .segments()
            .iter()
            .find(|s| s.kind == SegmentKind::ClimbUp)
            .copied()
            .expect("route should contain a climb");

        let mut events = EventQueue::new();
        let view = view!(&mesh, &world);
        let mut loco = ScriptLoco::default();
        let mut body = StandardBody::new(&config);
        // Stand just short of the wall, inside the ledge lookahead.
        let start = Vec3::new(climb.pos.x - 15.0, 0.0, 50.0);
        let mut ctx = bot_ctx!(view, &config, &mut events, start, 0.1);
        follower.update(&mut ctx, &mut loco, &mut body);

        let top = loco.climbs.first().expect("climb should start");
        assert!((top.y - 50.0).abs() < 0.01, "climb aims at the ledge: {top}");
        assert!(top.x >= climb.pos.x, "climb lands past the lip: {top}");
    }

    #[test]
    fn test_gap_segment_triggers_jump_at_range() {
        let mut mesh = AreaMesh::new();
        let a = mesh.add_area(Vec3::new(0.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 100.0));
        let b = mesh.add_area(Vec3::new(140.0, 0.0, 0.0), Vec3::new(240.0, 0.0, 100.0));
        mesh.connect_two_way(a, b, Dir::East);
        let world = hecs::World::new();
        let config = config();
        let mut follower = PathFollower::new(&config);
        let result = compute(
            &mut follower,
            &mesh,
            &config,
            Vec3::new(50.0, 0.0, 50.0),
            Vec3::new(200.0, 0.0, 50.0),
        );
        assert_eq!(result, ComputeResult::Complete);
        let gap_index = follower
            .path()
            .segments()
            .iter()
            .position(|s| s.kind == SegmentKind::JumpGap)
            .expect("route should contain a gap jump");
        let landing = follower.path().segment(gap_index + 1).copied().unwrap();

        let mut events = EventQueue::new();
        let view = view!(&mesh, &world);
        let mut loco = ScriptLoco::default();
        let mut body = StandardBody::new(&config);
        let mut ctx = bot_ctx!(view, &config, &mut events, Vec3::new(80.0, 0.0, 50.0), 0.1);
        follower.update(&mut ctx, &mut loco, &mut body);

        // Approaching a gap segment forces run speed.
        assert!((loco.desired - 150.0).abs() < 0.01);
        let (jump_landing, forward) = loco.gap_jumps.first().expect("jump should launch");
        assert!((jump_landing.x - landing.pos.x).abs() < 0.01, "aims at the landing");
        assert!(forward.x > 0.99, "jumps along the route");

        // Once the flight ends on the far side, the gap goal is behind
        // us and progress resumes toward the route's end.
        loco.climbing = false;
        let past_gap = Vec3::new(landing.pos.x + 10.0, 0.0, 50.0);
        let mut ctx = bot_ctx!(view, &config, &mut events, past_gap, 0.2);
        follower.update(&mut ctx, &mut loco, &mut body);
        let goal = follower.goal().expect("route continues past the gap");
        assert!(
            (goal.pos.x - 200.0).abs() < 0.01,
            "goal should be the route end, got {:?}",
            goal.pos
        );
    }

    #[test]
    fn test_fell_off_route_raises_failure() {
        // The route runs along a floor 100 units overhead; an agent
        // that dropped to the ground beneath it can never rejoin.
        let mut mesh = AreaMesh::new();
        let a = mesh.add_area(Vec3::new(0.0, 100.0, 0.0), Vec3::new(200.0, 100.0, 100.0));
        let b = mesh.add_area(Vec3::new(200.0, 100.0, 0.0), Vec3::new(400.0, 100.0, 100.0));
        mesh.connect_two_way(a, b, Dir::East);
        let world = hecs::World::new();
        let config = config();
        let mut follower = PathFollower::new(&config);
        let result = compute(
            &mut follower,
            &mesh,
            &config,
            Vec3::new(50.0, 100.0, 50.0),
            Vec3::new(350.0, 100.0, 50.0),
        );
        assert_eq!(result, ComputeResult::Complete);

        let mut events = EventQueue::new();
        let view = view!(&mesh, &world);
        // Below the route, making no progress; not yet stuck long
        // enough for the stuck bailout to claim the failure instead.
        let mut loco = ScriptLoco {
            stuck: true,
            stuck_for: 0.5,
            ..Default::default()
        };
        let mut body = StandardBody::new(&config);
        let mut ctx = bot_ctx!(view, &config, &mut events, Vec3::new(200.0, 0.0, 50.0), 5.0);
        follower.update(&mut ctx, &mut loco, &mut body);

        assert!(!follower.is_following());
        assert!(loco.cleared_stuck);
        events.swap();
        assert!(events.iter().any(|e| matches!(
            e,
            BotEvent::MoveFailure {
                reason: PathFailure::FellOff
            }
        )));
    }

    #[test]
    fn test_ladder_mounts_when_close() {
        let mut mesh = AreaMesh::new();
        let low = mesh.add_area(Vec3::new(0.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 100.0));
        let high = mesh.add_area(Vec3::new(0.0, 120.0, 100.0), Vec3::new(100.0, 120.0, 200.0));
        let ladder = mesh.add_ladder(
            Vec3::new(50.0, 0.0, 98.0),
            Vec3::new(50.0, 120.0, 102.0),
            Dir::South,
            low,
            high,
        );
        let world = hecs::World::new();
        let config = config();
        let mut follower = PathFollower::new(&config);
        let result = compute(
            &mut follower,
            &mesh,
            &config,
            Vec3::new(50.0, 0.0, 20.0),
            Vec3::new(50.0, 120.0, 150.0),
        );
        assert_eq!(result, ComputeResult::Complete);
        assert!(follower
            .path()
            .segments()
            .iter()
            .any(|s| s.kind == SegmentKind::LadderUp));

        let mut events = EventQueue::new();
        let view = view!(&mesh, &world);
        let mut loco = ScriptLoco::default();
        let mut body = StandardBody::new(&config);

        // Too far from the ladder: walk toward its base instead.
        let mut ctx = bot_ctx!(view, &config, &mut events, Vec3::new(50.0, 0.0, 30.0), 0.1);
        follower.update(&mut ctx, &mut loco, &mut body);
        assert!(loco.ladders.is_empty());
        assert!(loco.approached.is_some());

        // Within mounting range: attach and ascend.
        let mut ctx = bot_ctx!(view, &config, &mut events, Vec3::new(50.0, 0.0, 90.0), 0.2);
        follower.update(&mut ctx, &mut loco, &mut body);
        assert_eq!(loco.ladders.first().copied(), Some((ladder, true)));
    }

    #[test]
    fn test_sharp_turn_slows_to_walk() {
        let config = config();
        let mut follower = PathFollower::new(&config);
        // Straight east then a hard left; the corner carries maximum
        // curvature.
        follower.path_mut().assign(
            vec![
                Segment::new(crate::nav::AreaId(0), Vec3::new(0.0, 0.0, 0.0), SegmentKind::Ground),
                Segment::new(
                    crate::nav::AreaId(0),
                    Vec3::new(100.0, 0.0, 0.0),
                    SegmentKind::Ground,
                ),
                Segment::new(
                    crate::nav::AreaId(0),
                    Vec3::new(100.0, 0.0, -100.0),
                    SegmentKind::Ground,
                ),
            ],
            0.0,
        );
        follower.restart();

        let mesh = AreaMesh::new();
        let world = hecs::World::new();
        let mut events = EventQueue::new();
        let view = view!(&mesh, &world);
        let mut loco = ScriptLoco::default();
        let mut body = StandardBody::new(&config);
        let mut ctx = bot_ctx!(view, &config, &mut events, Vec3::new(60.0, 0.0, 0.0), 0.1);
        follower.update(&mut ctx, &mut loco, &mut body);

        assert!(
            (loco.desired - 75.0).abs() < 0.01,
            "90-degree corner should slow to walk speed, got {}",
            loco.desired
        );
    }

    #[test]
    fn test_abandon_drops_route_silently() {
        let mesh = corridor_mesh();
        let config = config();
        let mut follower = PathFollower::new(&config);
        compute(
            &mut follower,
            &mesh,
            &config,
            Vec3::new(50.0, 0.0, 50.0),
            Vec3::new(550.0, 0.0, 50.0),
        );
        assert!(follower.is_following());

        follower.abandon();
        assert!(!follower.is_following());
        assert!(follower.goal().is_none());
    }
}
