//! Path computation over the walkable-area graph.
//!
//! A* over area adjacency (walk edges and ladders), followed by detail
//! passes that turn the coarse area chain into followable geometry:
//! portal crossing points, drop-down and landing segments, climb-up and
//! jump-gap markers, an optional redundancy prune, and the finishing
//! pass that fills per-segment derived data.
//!
//! Costing is delegated to a [`CostPolicy`]; a negative cost vetoes an
//! edge outright. Goal-less searches rank candidate areas through a
//! [`GoalSelector`] instead.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::Vec3;
use hecs::Entity;
use rustc_hash::FxHashMap;

use crate::core::NavConfig;
use crate::nav::{Area, AreaFlags, AreaId, Dir, Ladder, LadderId, NavGraph};
use crate::world::{Hull, TraceService};

use super::route::{Path, MAX_SEGMENTS};
use super::segment::{Segment, SegmentKind};

// ============================================================================
// Compute Context
// ============================================================================

/// Movement capabilities of the agent a path is computed for.
#[derive(Debug, Clone, Copy)]
pub struct MoverCaps {
    pub hull: Hull,
    pub step_height: f32,
    pub max_jump_height: f32,
    pub death_drop_height: f32,
}

impl MoverCaps {
    #[must_use]
    pub fn new(hull: Hull, step_height: f32, max_jump_height: f32, death_drop_height: f32) -> Self {
        Self {
            hull,
            step_height,
            max_jump_height,
            death_drop_height,
        }
    }

    /// Caps for a standing agent straight from the config.
    #[must_use]
    pub fn from_config(config: &NavConfig) -> Self {
        Self::new(
            Hull::new(config.hull_width, config.stand_height),
            config.step_height,
            config.max_jump_height,
            config.death_drop_height,
        )
    }
}

/// Everything path computation reads.
pub struct PathCtx<'a> {
    pub graph: &'a dyn NavGraph,
    pub trace: &'a dyn TraceService,
    pub config: &'a NavConfig,
    pub caps: MoverCaps,
    /// Clock time, stamped on the produced path for age queries.
    pub now: f64,
}

/// Outcome of a path computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeResult {
    /// The goal was reached exactly.
    Complete,
    /// The path ends at the closest reachable point instead.
    Partial,
    /// Nothing usable; the path is left invalid.
    NoPath,
}

impl ComputeResult {
    /// True when the path can be followed at all.
    #[must_use]
    pub fn is_usable(self) -> bool {
        !matches!(self, ComputeResult::NoPath)
    }
}

// ============================================================================
// Cost and Goal Policies
// ============================================================================

/// One candidate edge offered to a [`CostPolicy`].
pub struct CostRequest<'a> {
    /// Area the edge enters.
    pub to: &'a Area,
    /// Area the edge leaves, `None` only for the search start.
    pub from: Option<&'a Area>,
    /// Ladder carrying the edge, if any.
    pub ladder: Option<&'a Ladder>,
    /// Geometric length of the edge.
    pub length: f32,
}

/// Prices a single traversal edge. Returning a negative cost vetoes the
/// edge entirely.
pub trait CostPolicy {
    fn cost(&self, req: &CostRequest<'_>) -> f32;
}

impl<F> CostPolicy for F
where
    F: Fn(&CostRequest<'_>) -> f32,
{
    fn cost(&self, req: &CostRequest<'_>) -> f32 {
        self(req)
    }
}

/// Distance-based costing with sane vetoes for the given mover:
/// lethal drops and unjumpable rises are rejected, avoid-flagged areas
/// are heavily taxed.
#[derive(Debug, Clone, Copy)]
pub struct ShortestPathCost {
    caps: MoverCaps,
}

impl ShortestPathCost {
    const AVOID_PENALTY: f32 = 20.0;

    #[must_use]
    pub fn new(caps: MoverCaps) -> Self {
        Self { caps }
    }
}

impl CostPolicy for ShortestPathCost {
    fn cost(&self, req: &CostRequest<'_>) -> f32 {
        let Some(from) = req.from else {
            return 0.0;
        };

        // Ladders carry any rise; walk edges must be survivable.
        if req.ladder.is_none() {
            let rise = req.to.floor() - from.floor();
            if rise > self.caps.max_jump_height {
                return -1.0;
            }
            if rise > self.caps.step_height && from.has_flag(AreaFlags::NO_JUMP) {
                return -1.0;
            }
            if -rise > self.caps.death_drop_height {
                return -1.0;
            }
        }

        let mut cost = req.length;
        if req.to.has_flag(AreaFlags::AVOID) {
            cost *= Self::AVOID_PENALTY;
        }
        cost
    }
}

/// Ranks areas for goal-less searches.
///
/// The search may offer the same area more than once; implementations
/// should be pure functions of the two areas.
pub trait GoalSelector {
    /// True when `candidate` beats the incumbent `best`.
    fn better(&mut self, graph: &dyn NavGraph, candidate: &Area, best: &Area) -> bool;
}

/// Picks the reachable area farthest from a point. The bundled retreat
/// selector.
#[derive(Debug, Clone, Copy)]
pub struct FarthestFrom {
    pub from: Vec3,
}

impl GoalSelector for FarthestFrom {
    fn better(&mut self, _graph: &dyn NavGraph, candidate: &Area, best: &Area) -> bool {
        candidate.center().distance_squared(self.from) > best.center().distance_squared(self.from)
    }
}

// ============================================================================
// Search Internals
// ============================================================================

/// How the search entered an area.
#[derive(Debug, Clone, Copy)]
enum HopKind {
    Walk(Dir),
    LadderUp(LadderId),
    LadderDown(LadderId),
}

/// A* node for the priority queue
#[derive(Debug, Clone)]
struct Node {
    area: AreaId,
    g_cost: f32,
    f_cost: f32,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.area == other.area
    }
}

impl Eq for Node {}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Zero means unbounded.
#[derive(Debug, Clone, Copy)]
struct SearchLimits {
    max_path_length: f32,
    max_search_cost: f32,
}

/// Open set plus per-area bookkeeping shared by both search modes.
struct SearchState {
    open: BinaryHeap<Node>,
    g_score: FxHashMap<AreaId, f32>,
    dist_score: FxHashMap<AreaId, f32>,
    parents: FxHashMap<AreaId, (AreaId, HopKind)>,
}

impl SearchState {
    fn seeded(start: AreaId) -> Self {
        let mut state = Self {
            open: BinaryHeap::new(),
            g_score: FxHashMap::default(),
            dist_score: FxHashMap::default(),
            parents: FxHashMap::default(),
        };
        state.g_score.insert(start, 0.0);
        state.dist_score.insert(start, 0.0);
        state.open.push(Node {
            area: start,
            g_cost: 0.0,
            f_cost: 0.0,
        });
        state
    }
}

/// Expands one settled area, pushing any neighbor the edge improves.
fn expand(
    ctx: &PathCtx,
    area: &Area,
    g: f32,
    dist: f32,
    cost_policy: &dyn CostPolicy,
    limits: SearchLimits,
    heuristic: &dyn Fn(&Area) -> f32,
    state: &mut SearchState,
) {
    let mut offer = |to_id: AreaId, hop: HopKind, ladder: Option<&Ladder>, length: f32| {
        let Some(to_area) = ctx.graph.area(to_id) else {
            return;
        };
        let edge_cost = cost_policy.cost(&CostRequest {
            to: to_area,
            from: Some(area),
            ladder,
            length,
        });
        if edge_cost < 0.0 {
            return;
        }

        let tentative_g = g + edge_cost;
        let tentative_dist = dist + length;
        if limits.max_path_length > 0.0 && tentative_dist > limits.max_path_length {
            return;
        }
        if limits.max_search_cost > 0.0 && tentative_g > limits.max_search_cost {
            return;
        }

        if tentative_g < *state.g_score.get(&to_id).unwrap_or(&f32::MAX) {
            state.parents.insert(to_id, (area.id(), hop));
            state.g_score.insert(to_id, tentative_g);
            state.dist_score.insert(to_id, tentative_dist);
            state.open.push(Node {
                area: to_id,
                g_cost: tentative_g,
                f_cost: tentative_g + heuristic(to_area),
            });
        }
    };

    for dir in Dir::all() {
        for &next in area.neighbors(dir) {
            let Some(to_area) = ctx.graph.area(next) else {
                continue;
            };
            let length = area.center().distance(to_area.center());
            offer(next, HopKind::Walk(dir), None, length);
        }
    }
    for &ladder_id in area.ladders_up() {
        if let Some(ladder) = ctx.graph.ladder(ladder_id) {
            offer(
                ladder.top_area(),
                HopKind::LadderUp(ladder_id),
                Some(ladder),
                ladder.length().max(1.0),
            );
        }
    }
    for &ladder_id in area.ladders_down() {
        if let Some(ladder) = ctx.graph.ladder(ladder_id) {
            offer(
                ladder.bottom_area(),
                HopKind::LadderDown(ladder_id),
                Some(ladder),
                ladder.length().max(1.0),
            );
        }
    }
}

/// A* toward a specific goal area. Tracks the best-heuristic area
/// settled so far so failed searches can still yield a partial route.
fn search_to(
    ctx: &PathCtx,
    start_area: AreaId,
    goal_area: AreaId,
    goal_pos: Vec3,
    cost_policy: &dyn CostPolicy,
    max_path_length: f32,
) -> (SearchState, Option<AreaId>, Option<AreaId>) {
    let heuristic = |area: &Area| -> f32 { area.center().distance(goal_pos) };
    let limits = SearchLimits {
        max_path_length,
        max_search_cost: 0.0,
    };

    let mut state = SearchState::seeded(start_area);
    let mut closest: Option<(AreaId, f32)> = None;

    while let Some(current) = state.open.pop() {
        let Some(area) = ctx.graph.area(current.area) else {
            continue;
        };

        let h = heuristic(area);
        if closest.is_none_or(|(_, best)| h < best) {
            closest = Some((current.area, h));
        }

        if current.area == goal_area {
            return (state, Some(goal_area), Some(goal_area));
        }

        let dist = *state.dist_score.get(&current.area).unwrap_or(&0.0);
        expand(
            ctx,
            area,
            current.g_cost,
            dist,
            cost_policy,
            limits,
            &heuristic,
            &mut state,
        );
    }

    let closest = closest.map(|(id, _)| id);
    (state, None, closest)
}

/// Dijkstra over everything reachable within a cost budget, folding the
/// best area through the selector.
fn search_open(
    ctx: &PathCtx,
    start_area: AreaId,
    cost_policy: &dyn CostPolicy,
    selector: &mut dyn GoalSelector,
    max_search_cost: f32,
) -> (SearchState, Option<AreaId>) {
    let limits = SearchLimits {
        max_path_length: 0.0,
        max_search_cost,
    };

    let mut state = SearchState::seeded(start_area);
    let mut best: Option<AreaId> = None;

    while let Some(current) = state.open.pop() {
        let Some(area) = ctx.graph.area(current.area) else {
            continue;
        };

        let incumbent = best.and_then(|id| ctx.graph.area(id));
        best = match incumbent {
            Some(b) if !selector.better(ctx.graph, area, b) => best,
            _ => Some(current.area),
        };

        let dist = *state.dist_score.get(&current.area).unwrap_or(&0.0);
        expand(
            ctx,
            area,
            current.g_cost,
            dist,
            cost_policy,
            limits,
            &|_: &Area| 0.0,
            &mut state,
        );
    }

    (state, best)
}

/// Walks the parent map back from `end` to `start`.
fn chain_to(state: &SearchState, start: AreaId, end: AreaId) -> Vec<(AreaId, HopKind)> {
    let mut chain = Vec::new();
    let mut cursor = end;
    while cursor != start {
        let Some(&(parent, hop)) = state.parents.get(&cursor) else {
            break;
        };
        chain.push((cursor, hop));
        cursor = parent;
    }
    chain.reverse();
    chain
}

// ============================================================================
// Segment Assembly and Detail Passes
// ============================================================================

/// Builds the raw segment list: clamped start, one hop per chain entry,
/// and optionally the literal goal. Returns `(segments, truncated)`.
fn assemble(
    ctx: &PathCtx,
    start: Vec3,
    start_area: AreaId,
    mut chain: Vec<(AreaId, HopKind)>,
    literal_goal: Option<Vec3>,
    force_goal: bool,
) -> (Vec<Segment>, bool) {
    let max_chain = MAX_SEGMENTS - 2;
    let truncated = chain.len() > max_chain;
    if truncated {
        chain.truncate(max_chain);
    }

    let mut segments = Vec::with_capacity(chain.len() + 2);

    let start_pos = match ctx.graph.area(start_area) {
        Some(area) => area.clamp_xz(start),
        None => start,
    };
    segments.push(Segment::new(start_area, start_pos, SegmentKind::Ground));

    for &(area_id, hop) in &chain {
        let seg = match hop {
            HopKind::Walk(dir) => {
                // Placeholder position; the portal pass moves it onto
                // the shared boundary.
                let pos = ctx.graph.area(area_id).map_or(start_pos, |a| a.center());
                Segment::new(area_id, pos, SegmentKind::Ground).with_dir(dir)
            }
            HopKind::LadderUp(ladder_id) => {
                let pos = ctx
                    .graph
                    .ladder(ladder_id)
                    .map_or(start_pos, |l| l.bottom());
                Segment::new(area_id, pos, SegmentKind::LadderUp).with_ladder(ladder_id)
            }
            HopKind::LadderDown(ladder_id) => {
                let pos = ctx.graph.ladder(ladder_id).map_or(start_pos, |l| l.top());
                Segment::new(area_id, pos, SegmentKind::LadderDown).with_ladder(ladder_id)
            }
        };
        segments.push(seg);
    }

    // The final slot is reserved for the literal goal position; a
    // truncated chain only spends it when forced to.
    if let Some(goal) = literal_goal {
        if !truncated || force_goal {
            let goal_area = chain.last().map_or(start_area, |&(id, _)| id);
            let mut pos = goal;
            if let Some(ground) = ctx.graph.ground_height(goal) {
                pos.y = ground.height;
            } else if let Some(area) = ctx.graph.area(goal_area) {
                pos.y = area.floor();
            }
            segments.push(Segment::new(goal_area, pos, SegmentKind::Ground));
        }
    }

    (segments, truncated)
}

/// Horizontal separation between two areas along a travel direction;
/// positive means the footprints do not touch.
fn separation(from: &Area, to: &Area, dir: Dir) -> f32 {
    match dir {
        Dir::North => from.mins().z - to.maxs().z,
        Dir::South => to.mins().z - from.maxs().z,
        Dir::East => to.mins().x - from.maxs().x,
        Dir::West => from.mins().x - to.maxs().x,
    }
}

/// Moves walk-hop positions onto their portal crossings, keeping hull
/// clearance from the portal ends.
fn resolve_portals(ctx: &PathCtx, segments: &mut [Segment]) {
    let margin = ctx.caps.hull.width * 0.5;
    for i in 1..segments.len() {
        let Some(dir) = segments[i].dir else {
            continue;
        };
        let prev = segments[i - 1];
        let Some(portal) = ctx.graph.portal(prev.area, segments[i].area, dir) else {
            continue;
        };
        segments[i].pos = portal.crossing(dir, prev.pos, margin);
    }
}

/// Converts step-off ledges into drop-down segments with explicit
/// landings. Runs after portal resolution.
fn insert_drop_downs(ctx: &PathCtx, segments: &mut Vec<Segment>) {
    let hull = ctx.caps.hull;
    let step = ctx.caps.step_height;

    let mut i = 1;
    while i < segments.len() {
        let cur = segments[i];
        let (Some(dir), SegmentKind::Ground) = (cur.dir, cur.kind) else {
            i += 1;
            continue;
        };
        let prev = segments[i - 1];
        let (Some(from_area), Some(to_area)) =
            (ctx.graph.area(prev.area), ctx.graph.area(cur.area))
        else {
            i += 1;
            continue;
        };
        // Horizontal breaks belong to the gap pass.
        if separation(from_area, to_area, dir) > ctx.config.gap_tolerance {
            i += 1;
            continue;
        }
        let drop = from_area.floor() - to_area.floor();
        if drop <= step {
            i += 1;
            continue;
        }

        match find_drop_lane(ctx, cur.pos, dir, from_area.floor(), to_area.floor()) {
            Some(edge) => {
                let forward = dir.vector();
                let launch = edge + forward * (hull.width * 0.5 + 1.0);
                segments[i].kind = SegmentKind::DropDown;
                segments[i].pos = Vec3::new(edge.x, from_area.floor(), edge.z);

                if segments.len() < MAX_SEGMENTS {
                    let landing = Segment::new(
                        cur.area,
                        Vec3::new(launch.x, to_area.floor(), launch.z),
                        SegmentKind::Ground,
                    );
                    segments.insert(i + 1, landing);
                    i += 1;
                }
            }
            None => {
                log::debug!(
                    "no clear drop lane from {} into {}, leaving walk hop",
                    prev.area,
                    cur.area
                );
            }
        }
        i += 1;
    }
}

/// Searches sideways from the crossing point (up to twice the hull
/// width) for a spot where the full hull can fall cleanly onto real
/// ground.
fn find_drop_lane(
    ctx: &PathCtx,
    crossing: Vec3,
    dir: Dir,
    from_floor: f32,
    to_floor: f32,
) -> Option<Vec3> {
    let hull = ctx.caps.hull;
    let forward = dir.vector();
    let lateral = Vec3::Y.cross(forward).normalize_or_zero();
    let half = hull.width * 0.5;
    let offsets = [
        0.0,
        half,
        -half,
        hull.width,
        -hull.width,
        2.0 * hull.width,
        -2.0 * hull.width,
    ];

    for offset in offsets {
        let edge = Vec3::new(crossing.x, from_floor, crossing.z) + lateral * offset;
        let over = edge + forward * (half + 1.0);

        // Real ground below, near the destination floor.
        let Some(ground) = ctx.graph.ground_height(Vec3::new(over.x, to_floor, over.z)) else {
            continue;
        };
        if (ground.height - to_floor).abs() > ctx.caps.step_height {
            continue;
        }

        // The hull must fall the whole lane without clipping anything.
        let fall = Vec3::new(0.0, to_floor - from_floor, 0.0);
        let sweep = ctx
            .trace
            .sweep_hull(Vec3::new(over.x, from_floor, over.z), fall, hull);
        if sweep.is_clear() || sweep.fraction > 0.95 {
            return Some(edge);
        }
    }
    None
}

/// Second pass: marks climb-ups and inserts jump-gap launch segments.
fn insert_jumps_and_climbs(ctx: &PathCtx, segments: &mut Vec<Segment>) {
    let step = ctx.caps.step_height;
    let max_jump = ctx.caps.max_jump_height;

    let mut i = 1;
    while i < segments.len() {
        let cur = segments[i];
        let (Some(dir), SegmentKind::Ground) = (cur.dir, cur.kind) else {
            i += 1;
            continue;
        };
        let prev = segments[i - 1];
        let (Some(from_area), Some(to_area)) =
            (ctx.graph.area(prev.area), ctx.graph.area(cur.area))
        else {
            i += 1;
            continue;
        };

        let gap = separation(from_area, to_area, dir);
        if gap > ctx.config.gap_tolerance {
            // Launch from the lip of the source area, land well inside
            // the destination.
            let forward = dir.vector();
            let launch = Vec3::new(cur.pos.x, from_area.floor(), cur.pos.z);
            let over = forward * (gap + ctx.caps.hull.width * 0.5);
            segments[i].pos =
                launch + over + Vec3::new(0.0, to_area.floor() - from_area.floor(), 0.0);

            if segments.len() < MAX_SEGMENTS {
                let jump = Segment::new(prev.area, launch, SegmentKind::JumpGap);
                segments.insert(i, jump);
                i += 1;
            }
            i += 1;
            continue;
        }

        let rise = to_area.floor() - from_area.floor();
        if rise > step && rise <= max_jump {
            segments[i].kind = SegmentKind::ClimbUp;
            segments[i].pos.y = to_area.floor();
        }
        i += 1;
    }
}

/// Removes interior ground hops that can be walked past directly.
fn prune_redundant(ctx: &PathCtx, segments: &mut Vec<Segment>) {
    let probe = ctx.caps.hull.probe();
    let step = ctx.caps.step_height;

    let mut i = 1;
    while i + 1 < segments.len() {
        let (before, mid, after) = (segments[i - 1], segments[i], segments[i + 1]);
        let all_ground = before.kind == SegmentKind::Ground
            && mid.kind == SegmentKind::Ground
            && after.kind == SegmentKind::Ground;
        let level = (after.pos.y - before.pos.y).abs() <= step;
        if !(all_ground && level) {
            i += 1;
            continue;
        }

        let start = before.pos + Vec3::new(0.0, step, 0.0);
        let delta = after.pos - before.pos;
        if ctx.trace.sweep_hull(start, delta, probe).is_clear() {
            segments.remove(i);
        } else {
            i += 1;
        }
    }
}

/// Runs the geometric detail passes over freshly assembled segments.
fn run_detail_passes(ctx: &PathCtx, segments: &mut Vec<Segment>) {
    resolve_portals(ctx, segments);
    insert_drop_downs(ctx, segments);
    insert_jumps_and_climbs(ctx, segments);
    if ctx.config.prune_paths {
        prune_redundant(ctx, segments);
    }
}

// ============================================================================
// Path Computation Entry Points
// ============================================================================

impl Path {
    /// Computes a route from `start` to the literal position `goal`.
    ///
    /// Truncated and goal-unreachable routes come back
    /// [`ComputeResult::Partial`]; `include_goal_on_failure` keeps the
    /// literal goal as the final segment even then.
    pub fn compute_to_point(
        &mut self,
        ctx: &PathCtx,
        start: Vec3,
        goal: Vec3,
        cost_policy: &dyn CostPolicy,
        max_path_length: f32,
        include_goal_on_failure: bool,
    ) -> ComputeResult {
        self.invalidate();

        let Some(start_area) = ctx.graph.nearest_area(start) else {
            log::debug!("path compute: start position is off the graph");
            return ComputeResult::NoPath;
        };
        let Some(goal_area) = ctx.graph.nearest_area(goal) else {
            log::debug!("path compute: goal position is off the graph");
            return ComputeResult::NoPath;
        };

        // Trivial route inside one area: start and goal only.
        if start_area == goal_area {
            let (segments, _) = assemble(ctx, start, start_area, Vec::new(), Some(goal), true);
            self.assign(segments, ctx.now);
            return ComputeResult::Complete;
        }

        let (state, reached, closest) =
            search_to(ctx, start_area, goal_area, goal, cost_policy, max_path_length);

        let (end_area, complete) = match (reached, closest) {
            (Some(reached), _) => (reached, true),
            (None, Some(closest)) if closest != start_area => (closest, false),
            (None, Some(_)) if include_goal_on_failure => {
                // Nowhere to route through; head straight at the goal.
                let (segments, _) = assemble(ctx, start, start_area, Vec::new(), Some(goal), true);
                self.assign(segments, ctx.now);
                return ComputeResult::Partial;
            }
            _ => return ComputeResult::NoPath,
        };

        let chain = chain_to(&state, start_area, end_area);
        let literal_goal = if complete || include_goal_on_failure {
            Some(goal)
        } else {
            None
        };
        let (mut segments, truncated) = assemble(
            ctx,
            start,
            start_area,
            chain,
            literal_goal,
            include_goal_on_failure,
        );
        if segments.len() < 2 {
            return ComputeResult::NoPath;
        }

        run_detail_passes(ctx, &mut segments);
        self.assign(segments, ctx.now);

        if complete && !truncated {
            ComputeResult::Complete
        } else {
            ComputeResult::Partial
        }
    }

    /// Computes a route to a target entity's current position and
    /// remembers the entity for staleness checks.
    pub fn compute_to_entity(
        &mut self,
        ctx: &PathCtx,
        start: Vec3,
        target: Entity,
        target_pos: Vec3,
        cost_policy: &dyn CostPolicy,
        max_path_length: f32,
    ) -> ComputeResult {
        let result =
            self.compute_to_point(ctx, start, target_pos, cost_policy, max_path_length, true);
        if result.is_usable() {
            self.set_target(Some(target));
        }
        result
    }

    /// Explores outward from `start` within a cost budget and routes to
    /// whichever reachable area the selector ranks best.
    pub fn compute_open_goal(
        &mut self,
        ctx: &PathCtx,
        start: Vec3,
        cost_policy: &dyn CostPolicy,
        selector: &mut dyn GoalSelector,
        max_search_cost: f32,
    ) -> ComputeResult {
        self.invalidate();

        let Some(start_area) = ctx.graph.nearest_area(start) else {
            log::debug!("open-goal compute: start position is off the graph");
            return ComputeResult::NoPath;
        };

        let (state, best) = search_open(ctx, start_area, cost_policy, selector, max_search_cost);
        let Some(best) = best else {
            return ComputeResult::NoPath;
        };

        let goal = match ctx.graph.area(best) {
            Some(area) => area.center(),
            None => return ComputeResult::NoPath,
        };
        let chain = chain_to(&state, start_area, best);
        let (mut segments, truncated) = assemble(ctx, start, start_area, chain, Some(goal), true);
        if segments.len() < 2 {
            return ComputeResult::NoPath;
        }

        run_detail_passes(ctx, &mut segments);
        self.assign(segments, ctx.now);

        if truncated {
            ComputeResult::Partial
        } else {
            ComputeResult::Complete
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::AreaMesh;
    use crate::world::ClearTrace;

    fn ctx<'a>(graph: &'a AreaMesh, config: &'a NavConfig) -> PathCtx<'a> {
        PathCtx {
            graph,
            trace: &ClearTrace,
            config,
            caps: MoverCaps::from_config(config),
            now: 0.0,
        }
    }

    /// Three flat areas in a row along +X.
    fn corridor() -> (AreaMesh, [AreaId; 3]) {
        let mut mesh = AreaMesh::new();
        let a = mesh.add_area(Vec3::new(0.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 100.0));
        let b = mesh.add_area(Vec3::new(100.0, 0.0, 0.0), Vec3::new(200.0, 0.0, 100.0));
        let c = mesh.add_area(Vec3::new(200.0, 0.0, 0.0), Vec3::new(300.0, 0.0, 100.0));
        mesh.connect_two_way(a, b, Dir::East);
        mesh.connect_two_way(b, c, Dir::East);
        (mesh, [a, b, c])
    }

    #[test]
    fn test_same_area_path_is_two_segments() {
        let (mesh, [a, _, _]) = corridor();
        let config = NavConfig::default();
        let pctx = ctx(&mesh, &config);

        let mut path = Path::new();
        let result = path.compute_to_point(
            &pctx,
            Vec3::new(10.0, 0.0, 50.0),
            Vec3::new(90.0, 5.0, 50.0),
            &ShortestPathCost::new(pctx.caps),
            0.0,
            true,
        );

        assert_eq!(result, ComputeResult::Complete);
        assert_eq!(path.len(), 2, "same-area path is exactly start and goal");
        assert_eq!(path.segment(0).unwrap().area, a);
        assert_eq!(path.segment(1).unwrap().area, a);
        // Both endpoints sit on the area's ground.
        assert!(path.segment(0).unwrap().pos.y.abs() < 1.0e-4);
        assert!(path.segment(1).unwrap().pos.y.abs() < 1.0e-4);
    }

    #[test]
    fn test_corridor_path_distances_monotone() {
        let (mesh, [a, _, c]) = corridor();
        let config = NavConfig::default();
        let pctx = ctx(&mesh, &config);

        let mut path = Path::new();
        let result = path.compute_to_point(
            &pctx,
            Vec3::new(10.0, 0.0, 50.0),
            Vec3::new(290.0, 0.0, 50.0),
            &ShortestPathCost::new(pctx.caps),
            0.0,
            true,
        );

        assert_eq!(result, ComputeResult::Complete);
        assert_eq!(path.first().unwrap().area, a);
        assert_eq!(path.last().unwrap().area, c);

        let mut prev = -1.0;
        for seg in path.segments() {
            assert!(seg.distance_from_start > prev);
            prev = seg.distance_from_start;
        }
        assert!((path.last().unwrap().distance_from_start - path.length()).abs() < 1.0e-4);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let (mesh, _) = corridor();
        let config = NavConfig::default();
        let pctx = ctx(&mesh, &config);
        let cost = ShortestPathCost::new(pctx.caps);

        let start = Vec3::new(10.0, 0.0, 50.0);
        let goal = Vec3::new(290.0, 0.0, 50.0);

        let mut path = Path::new();
        path.compute_to_point(&pctx, start, goal, &cost, 0.0, true);
        let first: Vec<Vec3> = path.segments().iter().map(|s| s.pos).collect();

        path.compute_to_point(&pctx, start, goal, &cost, 0.0, true);
        let second: Vec<Vec3> = path.segments().iter().map(|s| s.pos).collect();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert!((*a - *b).length() < 1.0e-4);
        }
    }

    #[test]
    fn test_portal_crossing_keeps_hull_margin() {
        // Narrow doorway between two rooms.
        let mut mesh = AreaMesh::new();
        let a = mesh.add_area(Vec3::new(0.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 100.0));
        let b = mesh.add_area(Vec3::new(100.0, 0.0, 40.0), Vec3::new(200.0, 0.0, 60.0));
        mesh.connect_two_way(a, b, Dir::East);

        let config = NavConfig::default();
        let pctx = ctx(&mesh, &config);
        let mut path = Path::new();
        path.compute_to_point(
            &pctx,
            Vec3::new(10.0, 0.0, 5.0),
            Vec3::new(190.0, 0.0, 50.0),
            &ShortestPathCost::new(pctx.caps),
            0.0,
            true,
        );

        let crossing = path.segment(1).unwrap();
        assert!((crossing.pos.x - 100.0).abs() < 1.0e-3, "on the boundary");
        // Portal spans z 40..60; the hull margin pulls the crossing
        // well inside even though the start hugs z = 5.
        assert!(crossing.pos.z >= 40.0);
        assert!(crossing.pos.z <= 60.0);
    }

    #[test]
    fn test_drop_down_gets_landing_segment() {
        let mut mesh = AreaMesh::new();
        let top = mesh.add_area(Vec3::new(0.0, 40.0, 0.0), Vec3::new(100.0, 40.0, 100.0));
        let low = mesh.add_area(Vec3::new(100.0, 0.0, 0.0), Vec3::new(200.0, 0.0, 100.0));
        mesh.connect(top, low, Dir::East);

        let config = NavConfig::default();
        let pctx = ctx(&mesh, &config);
        let mut path = Path::new();
        let result = path.compute_to_point(
            &pctx,
            Vec3::new(50.0, 40.0, 50.0),
            Vec3::new(150.0, 0.0, 50.0),
            &ShortestPathCost::new(pctx.caps),
            0.0,
            true,
        );
        assert_eq!(result, ComputeResult::Complete);

        let drop_index = path
            .segments()
            .iter()
            .position(|s| s.kind == SegmentKind::DropDown)
            .expect("drop-down segment inserted");
        let drop = path.segment(drop_index).unwrap();
        let landing = path
            .segment(drop_index + 1)
            .expect("landing follows the drop");

        // Drop goal sits on the upper lip; landing sits on the lower
        // floor, displaced in the direction of travel.
        assert!((drop.pos.y - 40.0).abs() < 1.0e-3);
        assert_eq!(landing.kind, SegmentKind::Ground);
        assert!(landing.pos.y.abs() < 1.0e-3);
        assert!(landing.pos.x > drop.pos.x, "landing lies ahead of the lip");
    }

    #[test]
    fn test_climb_up_marks_destination_height() {
        let mut mesh = AreaMesh::new();
        let low = mesh.add_area(Vec3::new(0.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 100.0));
        let high = mesh.add_area(Vec3::new(100.0, 40.0, 0.0), Vec3::new(200.0, 40.0, 100.0));
        mesh.connect(low, high, Dir::East);

        let config = NavConfig::default();
        let pctx = ctx(&mesh, &config);
        let mut path = Path::new();
        path.compute_to_point(
            &pctx,
            Vec3::new(50.0, 0.0, 50.0),
            Vec3::new(150.0, 40.0, 50.0),
            &ShortestPathCost::new(pctx.caps),
            0.0,
            true,
        );

        let climb = path
            .segments()
            .iter()
            .find(|s| s.kind == SegmentKind::ClimbUp)
            .expect("climb-up segment marked");
        assert!(
            (climb.pos.y - 40.0).abs() < 1.0e-3,
            "goal at the top of the rise"
        );
    }

    #[test]
    fn test_gap_insertion_adds_launch_point() {
        let mut mesh = AreaMesh::new();
        let a = mesh.add_area(Vec3::new(0.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 100.0));
        let b = mesh.add_area(Vec3::new(140.0, 0.0, 0.0), Vec3::new(240.0, 0.0, 100.0));
        mesh.connect_two_way(a, b, Dir::East);

        let config = NavConfig::default();
        let pctx = ctx(&mesh, &config);
        let mut path = Path::new();
        path.compute_to_point(
            &pctx,
            Vec3::new(50.0, 0.0, 50.0),
            Vec3::new(200.0, 0.0, 50.0),
            &ShortestPathCost::new(pctx.caps),
            0.0,
            true,
        );

        let jump_index = path
            .segments()
            .iter()
            .position(|s| s.kind == SegmentKind::JumpGap)
            .expect("gap wider than tolerance inserts a jump segment");
        let jump = path.segment(jump_index).unwrap();
        let landing = path.segment(jump_index + 1).unwrap();

        assert_eq!(jump.area, a, "launch belongs to the source area");
        assert!(
            (jump.pos.x - 100.0).abs() < 1.0e-3,
            "launch on the source lip"
        );
        assert!(landing.pos.x >= 140.0, "landing clears the gap");
    }

    #[test]
    fn test_cost_veto_blocks_route() {
        let (mesh, [_, b, _]) = corridor();
        let config = NavConfig::default();
        let pctx = ctx(&mesh, &config);

        // Veto the middle area; the corridor has no alternative.
        let veto = move |req: &CostRequest<'_>| -> f32 {
            if req.to.id() == b {
                -1.0
            } else {
                req.length
            }
        };

        let mut path = Path::new();
        let result = path.compute_to_point(
            &pctx,
            Vec3::new(10.0, 0.0, 50.0),
            Vec3::new(290.0, 0.0, 50.0),
            &veto,
            0.0,
            false,
        );
        assert_eq!(result, ComputeResult::NoPath);
        assert!(!path.is_valid(), "failed compute leaves the path invalid");
    }

    #[test]
    fn test_partial_path_toward_disconnected_goal() {
        let mut mesh = AreaMesh::new();
        let a = mesh.add_area(Vec3::new(0.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 100.0));
        let b = mesh.add_area(Vec3::new(100.0, 0.0, 0.0), Vec3::new(200.0, 0.0, 100.0));
        // Island with no connections.
        let _island = mesh.add_area(Vec3::new(400.0, 0.0, 0.0), Vec3::new(500.0, 0.0, 100.0));
        mesh.connect_two_way(a, b, Dir::East);

        let config = NavConfig::default();
        let pctx = ctx(&mesh, &config);
        let mut path = Path::new();
        let result = path.compute_to_point(
            &pctx,
            Vec3::new(10.0, 0.0, 50.0),
            Vec3::new(450.0, 0.0, 50.0),
            &ShortestPathCost::new(pctx.caps),
            0.0,
            true,
        );

        assert_eq!(result, ComputeResult::Partial);
        assert!(path.is_valid());
        // The route walks toward the island as far as the graph allows,
        // then keeps the literal goal as the final position.
        let last = path.last().unwrap();
        assert!((last.pos.x - 450.0).abs() < 1.0e-3, "literal goal kept");
        assert_eq!(last.area, b, "goal anchored to the closest reachable area");
        let through: Vec<AreaId> = path.segments().iter().map(|s| s.area).collect();
        assert!(through.contains(&b), "walks the reachable stretch first");
    }

    #[test]
    fn test_max_length_bounds_search() {
        let (mesh, _) = corridor();
        let config = NavConfig::default();
        let pctx = ctx(&mesh, &config);

        let mut path = Path::new();
        let result = path.compute_to_point(
            &pctx,
            Vec3::new(10.0, 0.0, 50.0),
            Vec3::new(290.0, 0.0, 50.0),
            &ShortestPathCost::new(pctx.caps),
            120.0,
            false,
        );
        assert_eq!(result, ComputeResult::Partial);
        assert!(path.is_valid());
        assert!(path.last().unwrap().pos.x < 290.0);
    }

    #[test]
    fn test_avoid_flag_picks_longer_route() {
        // Two routes from a to d: short through b (avoid-flagged) or
        // long through c.
        let mut mesh = AreaMesh::new();
        let a = mesh.add_area(Vec3::new(0.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 100.0));
        let b = mesh.add_area(Vec3::new(100.0, 0.0, 0.0), Vec3::new(200.0, 0.0, 100.0));
        let c = mesh.add_area(Vec3::new(0.0, 0.0, 100.0), Vec3::new(220.0, 0.0, 300.0));
        let d = mesh.add_area(Vec3::new(200.0, 0.0, 0.0), Vec3::new(300.0, 0.0, 100.0));
        mesh.connect_two_way(a, b, Dir::East);
        mesh.connect_two_way(b, d, Dir::East);
        mesh.connect_two_way(a, c, Dir::South);
        mesh.connect_two_way(c, d, Dir::North);
        mesh.set_flags(b, AreaFlags::AVOID);

        let config = NavConfig::default();
        let pctx = ctx(&mesh, &config);
        let mut path = Path::new();
        path.compute_to_point(
            &pctx,
            Vec3::new(50.0, 0.0, 50.0),
            Vec3::new(250.0, 0.0, 50.0),
            &ShortestPathCost::new(pctx.caps),
            0.0,
            true,
        );

        let through: Vec<AreaId> = path.segments().iter().map(|s| s.area).collect();
        assert!(through.contains(&c), "route detours through the long way");
        assert!(!through.contains(&b), "avoid-flagged area is skipped");
    }

    #[test]
    fn test_death_drop_vetoed_by_default_cost() {
        let mut mesh = AreaMesh::new();
        let top = mesh.add_area(Vec3::new(0.0, 300.0, 0.0), Vec3::new(100.0, 300.0, 100.0));
        let low = mesh.add_area(Vec3::new(100.0, 0.0, 0.0), Vec3::new(200.0, 0.0, 100.0));
        mesh.connect(top, low, Dir::East);

        let config = NavConfig::default();
        let pctx = ctx(&mesh, &config);
        let mut path = Path::new();
        let result = path.compute_to_point(
            &pctx,
            Vec3::new(50.0, 300.0, 50.0),
            Vec3::new(150.0, 0.0, 50.0),
            &ShortestPathCost::new(pctx.caps),
            0.0,
            false,
        );
        assert_eq!(result, ComputeResult::NoPath, "a 300 unit fall is lethal");
    }

    #[test]
    fn test_ladder_route_uses_ladder_segments() {
        let mut mesh = AreaMesh::new();
        let low = mesh.add_area(Vec3::new(0.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 100.0));
        let high = mesh.add_area(Vec3::new(0.0, 120.0, 100.0), Vec3::new(100.0, 120.0, 200.0));
        let ladder = mesh.add_ladder(
            Vec3::new(50.0, 0.0, 100.0),
            Vec3::new(50.0, 120.0, 105.0),
            Dir::South,
            low,
            high,
        );

        let config = NavConfig::default();
        let pctx = ctx(&mesh, &config);
        let mut path = Path::new();
        let result = path.compute_to_point(
            &pctx,
            Vec3::new(50.0, 0.0, 50.0),
            Vec3::new(50.0, 120.0, 150.0),
            &ShortestPathCost::new(pctx.caps),
            0.0,
            true,
        );
        assert_eq!(result, ComputeResult::Complete);

        let ladder_seg = path
            .segments()
            .iter()
            .find(|s| s.kind == SegmentKind::LadderUp)
            .expect("route climbs the ladder");
        assert_eq!(ladder_seg.ladder, Some(ladder));
        assert!(ladder_seg.pos.y.abs() < 1.0e-3, "goal is the mount point");
    }

    #[test]
    fn test_open_goal_picks_farthest_area() {
        let (mesh, [_, _, c]) = corridor();
        let config = NavConfig::default();
        let pctx = ctx(&mesh, &config);

        let start = Vec3::new(10.0, 0.0, 50.0);
        let mut selector = FarthestFrom { from: start };
        let mut path = Path::new();
        let result = path.compute_open_goal(
            &pctx,
            start,
            &ShortestPathCost::new(pctx.caps),
            &mut selector,
            0.0,
        );

        assert_eq!(result, ComputeResult::Complete);
        assert_eq!(path.last().unwrap().area, c);
        let center = mesh.area(c).unwrap().center();
        assert!((path.end_position().unwrap() - center).length() < 1.0e-3);
    }

    #[test]
    fn test_open_goal_respects_cost_budget() {
        let (mesh, [a, b, _]) = corridor();
        let config = NavConfig::default();
        let pctx = ctx(&mesh, &config);

        let start = Vec3::new(10.0, 0.0, 50.0);
        let mut selector = FarthestFrom { from: start };
        let mut path = Path::new();
        // Budget covers one hop (area centers are 100 apart).
        path.compute_open_goal(
            &pctx,
            start,
            &ShortestPathCost::new(pctx.caps),
            &mut selector,
            150.0,
        );

        let end = path.last().unwrap().area;
        assert!(end == a || end == b, "far area is beyond the budget");
    }

    #[test]
    fn test_truncation_respects_segment_cap() {
        // A long chain of tiny areas, far more hops than a path holds.
        let mut mesh = AreaMesh::new();
        let mut ids = Vec::new();
        for i in 0..300 {
            let x = i as f32 * 10.0;
            ids.push(mesh.add_area(Vec3::new(x, 0.0, 0.0), Vec3::new(x + 10.0, 0.0, 10.0)));
        }
        for pair in ids.windows(2) {
            mesh.connect_two_way(pair[0], pair[1], Dir::East);
        }

        let config = NavConfig::default();
        let pctx = ctx(&mesh, &config);
        let goal = Vec3::new(2995.0, 0.0, 5.0);

        let mut path = Path::new();
        let result = path.compute_to_point(
            &pctx,
            Vec3::new(5.0, 0.0, 5.0),
            goal,
            &ShortestPathCost::new(pctx.caps),
            0.0,
            true,
        );

        assert_eq!(
            result,
            ComputeResult::Partial,
            "truncated routes are partial"
        );
        assert_eq!(path.len(), MAX_SEGMENTS);
        // The reserved final slot still carries the literal goal.
        assert!((path.last().unwrap().pos.x - goal.x).abs() < 1.0e-3);

        let mut without_goal = Path::new();
        without_goal.compute_to_point(
            &pctx,
            Vec3::new(5.0, 0.0, 5.0),
            goal,
            &ShortestPathCost::new(pctx.caps),
            0.0,
            false,
        );
        assert!(without_goal.len() < MAX_SEGMENTS);
    }

    #[test]
    fn test_prune_collapses_straight_runs() {
        let (mesh, _) = corridor();
        let config = NavConfig::default().with_pruning(true);
        let pctx = ctx(&mesh, &config);

        let mut path = Path::new();
        path.compute_to_point(
            &pctx,
            Vec3::new(10.0, 0.0, 50.0),
            Vec3::new(290.0, 0.0, 50.0),
            &ShortestPathCost::new(pctx.caps),
            0.0,
            true,
        );

        // With an empty collision world every interior hop is walkable
        // directly; only the endpoints survive.
        assert_eq!(path.len(), 2);
    }
}
