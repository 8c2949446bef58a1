//! Agent Event Queue
//!
//! This module provides a type-safe, double-buffered event queue that carries
//! notifications between an agent's capabilities and out to the embedding
//! game. Events raised during one tick are dispatched at the end of that
//! tick; events raised *while dispatching* land in the back buffer and go
//! out on the next tick, so a handler can never recurse into itself.
//!
//! # Design Principles
//!
//! - **Type Safety**: All events are strongly typed via the `BotEvent` enum
//! - **Double Buffering**: Dispatch sees a frozen batch (no mid-tick mutation)
//! - **Explicit Fan-Out**: The owning bot walks its capability list once per
//!   event instead of relying on a responder hierarchy
//!
//! # Example
//!
//! ```
//! use botnav::core::{BotEvent, EventQueue, PathFailure};
//!
//! let mut queue = EventQueue::new();
//! queue.push(BotEvent::MoveFailure {
//!     reason: PathFailure::NoPath,
//! });
//! queue.swap();
//! assert_eq!(queue.len(), 1);
//! ```

use std::collections::VecDeque;

use glam::Vec3;
use hecs::Entity;

// ============================================================================
// Event Types
// ============================================================================

/// Reason a navigation attempt was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathFailure {
    /// The search produced no route at all.
    NoPath,
    /// Locomotion reported no progress for too long.
    Stuck,
    /// The agent dropped below its route with no way back up.
    FellOff,
}

/// Notifications raised by an agent's capabilities.
///
/// Events flow from producers (vision, locomotion, path following) to
/// consumers (usually the intention layer) without direct coupling.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum BotEvent {
    // -------------------------------------------------------------------------
    // Perception Events
    // -------------------------------------------------------------------------
    /// An entity became recognized after the reaction-time delay.
    Sighted {
        /// The entity that entered view
        entity: Entity,
    },

    /// A previously recognized entity left view.
    LostSight {
        /// The entity that left view
        entity: Entity,
    },

    // -------------------------------------------------------------------------
    // Locomotion Events
    // -------------------------------------------------------------------------
    /// Movement made no progress for the computed escape window.
    Stuck {
        /// Where the agent was anchored when it got stuck
        position: Vec3,
        /// How long it has been stuck, in seconds
        duration: f32,
    },

    /// Movement resumed after being stuck.
    Unstuck,

    // -------------------------------------------------------------------------
    // Path Following Events
    // -------------------------------------------------------------------------
    /// The final path segment was reached while on the ground.
    MoveSuccess,

    /// The current path was abandoned.
    MoveFailure {
        /// Why the path was abandoned
        reason: PathFailure,
    },
}

// ============================================================================
// Event Queue
// ============================================================================

/// Double-buffered event queue for tick-consistent dispatch.
///
/// Events pushed during tick N are visible to readers during tick N's
/// dispatch phase (after `swap()`), never earlier. This keeps the batch a
/// handler iterates independent of anything the handler itself pushes.
///
/// # Performance
///
/// - Push: O(1) amortized
/// - Iteration: O(n)
/// - Swap: O(1)
#[derive(Debug)]
pub struct EventQueue {
    /// Events being written this tick
    pending: VecDeque<BotEvent>,
    /// Frozen batch ready for dispatch
    processing: VecDeque<BotEvent>,
}

impl EventQueue {
    /// Default initial capacity for event queues.
    const DEFAULT_CAPACITY: usize = 16;

    /// Create a new event queue with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a new event queue with specified initial capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            processing: VecDeque::with_capacity(capacity),
        }
    }

    /// Push an event for the next dispatch.
    ///
    /// Events are not visible to iterators until `swap()` runs.
    #[inline]
    pub fn push(&mut self, event: BotEvent) {
        self.pending.push_back(event);
    }

    /// Swap the pending and processing queues.
    ///
    /// After swapping, `iter()` and `drain()` return the events pushed
    /// since the previous swap, and `push()` writes to a fresh buffer.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Iterate over the frozen batch.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &BotEvent> {
        self.processing.iter()
    }

    /// Drain the frozen batch, leaving pending events untouched.
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = BotEvent> + '_ {
        self.processing.drain(..)
    }

    /// Check whether the frozen batch is empty.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    /// Number of events in the frozen batch.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    /// Number of events waiting behind the next swap.
    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Clear all events (both pending and processing).
    ///
    /// Used when a bot is reset or despawned.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.processing.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
