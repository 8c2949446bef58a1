//! Bundled read access to the world services.

use crate::nav::NavGraph;

use super::entities::EntityDirectory;
use super::policy::DecisionPolicy;
use super::trace::TraceService;

/// Everything an agent reads from its surroundings: the walkable-area
/// graph, the collision trace service, the entity directory and the
/// decision layer. Copyable so it can be handed around per tick.
#[derive(Clone, Copy)]
pub struct WorldView<'a> {
    pub graph: &'a dyn NavGraph,
    pub trace: &'a dyn TraceService,
    pub directory: &'a dyn EntityDirectory,
    pub policy: &'a dyn DecisionPolicy,
}
