//! Path planning and following.
//!
//! [`Path`] computation searches the navigation graph with A* and then
//! runs geometric detail passes that add drop-down, climb, gap-jump
//! and ladder segments. [`PathFollower`] owns a computed path and
//! drives a locomotion capability along it tick by tick.

mod compute;
mod follow;
mod route;
mod segment;

pub use compute::{
    ComputeResult, CostPolicy, CostRequest, FarthestFrom, GoalSelector, MoverCaps, PathCtx,
    ShortestPathCost,
};
pub use follow::PathFollower;
pub use route::{Path, MAX_SEGMENTS};
pub use segment::{PathCursor, Segment, SegmentKind};
