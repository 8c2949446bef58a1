//! Body capability: hulls, posture and gross activity.

use glam::Vec3;

use crate::core::{BotEvent, NavConfig};
use crate::world::Hull;

use super::bot::BotCtx;

/// Requested stance of the collision hull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Posture {
    Stand,
    Crouch,
}

/// Coarse description of what the body is doing, for animation and
/// debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Idle,
    Move,
    Jump,
    Climb,
    OnLadder,
}

/// Physical presence of an agent.
///
/// The body owns hull dimensions and stance; locomotion asks it for
/// the hull to sweep, path computation for the standing hull to plan
/// with.
pub trait Body {
    /// Capability name for logging.
    fn name(&self) -> &'static str;

    fn reset(&mut self);

    /// Per-tick bookkeeping.
    fn update(&mut self, ctx: &mut BotCtx<'_>);

    /// Reacts to agent events.
    fn on_event(&mut self, _ctx: &mut BotCtx<'_>, _event: &BotEvent) {}

    fn set_posture(&mut self, posture: Posture);

    fn posture(&self) -> Posture;

    /// Collision hull for the current posture.
    fn hull(&self) -> Hull;

    fn stand_hull(&self) -> Hull;

    fn crouch_hull(&self) -> Hull;

    /// Eye height above the feet for the current posture.
    fn eye_height(&self) -> f32;

    /// World-space eye position for a feet position.
    fn eye_position(&self, feet: Vec3) -> Vec3 {
        feet + Vec3::new(0.0, self.eye_height(), 0.0)
    }

    fn set_activity(&mut self, activity: Activity);

    fn activity(&self) -> Activity;
}

// ============================================================================
// Standard Body
// ============================================================================

/// Eyes sit at this fraction of hull height.
pub(crate) const EYE_RATIO: f32 = 0.9;

/// Box-hulled biped body sized from the config.
#[derive(Debug, Clone)]
pub struct StandardBody {
    stand: Hull,
    crouch: Hull,
    posture: Posture,
    activity: Activity,
}

impl StandardBody {
    #[must_use]
    pub fn new(config: &NavConfig) -> Self {
        Self {
            stand: Hull::new(config.hull_width, config.stand_height),
            crouch: Hull::new(config.hull_width, config.crouch_height),
            posture: Posture::Stand,
            activity: Activity::Idle,
        }
    }
}

impl Body for StandardBody {
    fn name(&self) -> &'static str {
        "body"
    }

    fn reset(&mut self) {
        self.posture = Posture::Stand;
        self.activity = Activity::Idle;
    }

    fn update(&mut self, _ctx: &mut BotCtx<'_>) {}

    fn set_posture(&mut self, posture: Posture) {
        if self.posture != posture {
            log::trace!("posture -> {posture:?}");
            self.posture = posture;
        }
    }

    fn posture(&self) -> Posture {
        self.posture
    }

    fn hull(&self) -> Hull {
        match self.posture {
            Posture::Stand => self.stand,
            Posture::Crouch => self.crouch,
        }
    }

    fn stand_hull(&self) -> Hull {
        self.stand
    }

    fn crouch_hull(&self) -> Hull {
        self.crouch
    }

    fn eye_height(&self) -> f32 {
        self.hull().height * EYE_RATIO
    }

    fn set_activity(&mut self, activity: Activity) {
        self.activity = activity;
    }

    fn activity(&self) -> Activity {
        self.activity
    }
}

// ============================================================================
// Null Body
// ============================================================================

/// Bodiless stand-in for agents that need no physical presence.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBody;

impl Body for NullBody {
    fn name(&self) -> &'static str {
        "null body"
    }

    fn reset(&mut self) {}

    fn update(&mut self, _ctx: &mut BotCtx<'_>) {}

    fn set_posture(&mut self, _posture: Posture) {}

    fn posture(&self) -> Posture {
        Posture::Stand
    }

    fn hull(&self) -> Hull {
        Hull::new(1.0, 1.0)
    }

    fn stand_hull(&self) -> Hull {
        Hull::new(1.0, 1.0)
    }

    fn crouch_hull(&self) -> Hull {
        Hull::new(1.0, 1.0)
    }

    fn eye_height(&self) -> f32 {
        1.0
    }

    fn set_activity(&mut self, _activity: Activity) {}

    fn activity(&self) -> Activity {
        Activity::Idle
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posture_selects_hull() {
        let mut body = StandardBody::new(&NavConfig::default());
        assert_eq!(body.posture(), Posture::Stand);
        assert!((body.hull().height - 68.0).abs() < f32::EPSILON);

        body.set_posture(Posture::Crouch);
        assert!((body.hull().height - 32.0).abs() < f32::EPSILON);
        assert!((body.stand_hull().height - 68.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_eye_height_follows_posture() {
        let mut body = StandardBody::new(&NavConfig::default());
        let standing = body.eye_height();
        body.set_posture(Posture::Crouch);
        assert!(body.eye_height() < standing);

        let eyes = body.eye_position(Vec3::new(10.0, 5.0, 0.0));
        assert!((eyes.y - (5.0 + body.eye_height())).abs() < 1.0e-6);
        assert!((eyes.x - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut body = StandardBody::new(&NavConfig::default());
        body.set_posture(Posture::Crouch);
        body.set_activity(Activity::Climb);
        body.reset();
        assert_eq!(body.posture(), Posture::Stand);
        assert_eq!(body.activity(), Activity::Idle);
    }
}
