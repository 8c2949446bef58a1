//! Walkable-area navigation graph
//!
//! Data model and boundary trait for the host's navigation mesh, plus a
//! small in-memory implementation for demos and tests.

mod graph;
mod mesh;

pub use graph::{
    compute_portal, Area, AreaFlags, AreaId, Dir, GroundInfo, Ladder, LadderId, NavGraph, Portal,
};
pub use mesh::AreaMesh;
