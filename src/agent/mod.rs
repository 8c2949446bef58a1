//! Agents
//!
//! The agent framework: a [`Bot`] is a capability table (vision,
//! intention, locomotion, body) assembled explicitly through
//! [`BotBuilder`] and driven once per tick. Capabilities communicate
//! through queued [`crate::core::BotEvent`]s rather than calling each
//! other, and everything an agent owns dies with it.

mod body;
mod bot;
mod intention;
mod known;
mod vision;

pub use body::{Activity, Body, NullBody, Posture, StandardBody};
pub use bot::{Bot, BotBuilder, BotCtx};
pub use intention::{Intention, NullIntention, PursueIntention};
pub use known::KnownEntity;
pub use vision::{BotVision, NullVision, Vision};
