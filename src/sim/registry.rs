//! Agent registry.
//!
//! Session-scoped bookkeeping of live bots. Handles are issued once per
//! session and never reused within it; there is no global registry, so
//! two sessions never see each other's agents.

use crate::agent::Bot;

/// Opaque session-scoped bot handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BotId(pub u32);

/// Owns every bot registered with a session, in registration order.
#[derive(Default)]
pub struct BotRegistry {
    bots: Vec<(BotId, Bot)>,
    next: u32,
}

impl BotRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of a bot and issues its handle.
    pub fn insert(&mut self, bot: Bot) -> BotId {
        let id = BotId(self.next);
        self.next += 1;
        self.bots.push((id, bot));
        id
    }

    /// Removes a bot, returning it so the caller can tear down its
    /// world mirror.
    pub fn remove(&mut self, id: BotId) -> Option<Bot> {
        let index = self.bots.iter().position(|(bot_id, _)| *bot_id == id)?;
        Some(self.bots.remove(index).1)
    }

    #[must_use]
    pub fn get(&self, id: BotId) -> Option<&Bot> {
        self.bots
            .iter()
            .find(|(bot_id, _)| *bot_id == id)
            .map(|(_, bot)| bot)
    }

    pub fn get_mut(&mut self, id: BotId) -> Option<&mut Bot> {
        self.bots
            .iter_mut()
            .find(|(bot_id, _)| *bot_id == id)
            .map(|(_, bot)| bot)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }

    /// Bots in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (BotId, &Bot)> {
        self.bots.iter().map(|(id, bot)| (*id, bot))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BotId, &mut Bot)> {
        self.bots.iter_mut().map(|(id, bot)| (*id, bot))
    }
}

// ============================================================================
// Tests
// ============================================================================
