//! Subscriber types for the reactive system.
//!
//! A subscriber is any computation that reads observed state and must
//! re-run when that state changes: render functions, user watch
//! expressions, derived values.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::dep::Dep;

/// Unique identifier for a subscriber.
///
/// Each subscriber gets a unique ID when created. IDs increase in
/// creation order and key the dedup bookkeeping on both sides of the
/// subscription handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A computation that depends on observed values.
///
/// Implementors are registered on each [`Dep`] they read while active and
/// are re-run through [`update`](Subscriber::update) when one of those
/// deps notifies.
pub trait Subscriber: Send + Sync {
    /// The subscriber's unique ID.
    fn id(&self) -> SubscriberId;

    /// Record that this subscriber read `dep` during its current
    /// evaluation.
    ///
    /// Returns `true` when the dep is not yet tracked from a previous
    /// evaluation and should register this subscriber back via
    /// [`Dep::add_subscriber`]. Deduplication lives on the subscriber
    /// side, so a dep read twice in one pass subscribes once.
    fn add_dep(&self, dep: &Arc<Dep>) -> bool;

    /// Re-run after one of the tracked deps changed.
    fn update(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn subscriber_ids_increase_in_creation_order() {
        let earlier = SubscriberId::new();
        let later = SubscriberId::new();

        assert!(earlier < later);
    }
}
