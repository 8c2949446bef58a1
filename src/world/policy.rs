//! Decision layer boundary.
//!
//! Judgment calls the navigation stack refuses to make itself, like who
//! is the bigger threat or who deserves a polite wait, are delegated
//! through [`DecisionPolicy`] so the host game can answer them.

use crate::agent::KnownEntity;

use super::entities::{EntityClass, EntityInfo, Team};

/// Outcome of a pairwise threat comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreatPick {
    First,
    Second,
    /// No preference; the caller falls back to the nearer entity.
    Tie,
}

/// Host-supplied judgment calls.
pub trait DecisionPolicy {
    /// Should an agent of `my_team` stop and wait for this blocking
    /// entity to move, instead of shoving past it?
    fn should_wait_for(&self, my_team: Team, blocker: &EntityInfo) -> bool;

    /// Which of two known hostiles matters more.
    fn compare_threats(&self, _a: &KnownEntity, _b: &KnownEntity) -> ThreatPick {
        ThreatPick::Tie
    }
}

/// Reasonable defaults: wait for living friendly actors, rank threats
/// purely by distance.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPolicy;

impl DecisionPolicy for DefaultPolicy {
    fn should_wait_for(&self, my_team: Team, blocker: &EntityInfo) -> bool {
        blocker.class == EntityClass::Actor
            && blocker.alive
            && !my_team.is_hostile_to(blocker.team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn actor_info(team: Team) -> EntityInfo {
        let mut world = hecs::World::new();
        let entity = world.spawn(());
        EntityInfo {
            entity,
            class: EntityClass::Actor,
            team,
            alive: true,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            half_extents: Vec3::new(16.0, 36.0, 16.0),
        }
    }

    #[test]
    fn test_default_waits_for_friends_only() {
        let policy = DefaultPolicy;
        assert!(policy.should_wait_for(Team(1), &actor_info(Team(1))));
        assert!(policy.should_wait_for(Team(1), &actor_info(Team::NEUTRAL)));
        assert!(!policy.should_wait_for(Team(1), &actor_info(Team(2))));
    }

    #[test]
    fn test_default_never_waits_for_dead() {
        let policy = DefaultPolicy;
        let mut info = actor_info(Team(1));
        info.alive = false;
        assert!(!policy.should_wait_for(Team(1), &info));
    }
}
