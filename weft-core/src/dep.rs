//! Dependency Subject
//!
//! A `Dep` is the subject half of the observer pattern: it holds the list
//! of subscribers that read the value it guards and notifies them when
//! that value changes.
//!
//! # How Deps Work
//!
//! 1. Every reactive property owns a dep, and every observed container
//!    owns one more for whole-container changes.
//!
//! 2. When the guarded value is read under an active subscriber,
//!    [`Dep::depend`] offers this dep to that subscriber. The subscriber
//!    decides whether the dep is newly tracked; only then is it appended
//!    here.
//!
//! 3. When the guarded value changes, [`Dep::notify`] re-runs every live
//!    subscriber in registration order.
//!
//! # Thread Safety
//!
//! The subscriber list sits behind a `parking_lot::RwLock`, and the lock
//! is never held while subscriber callbacks run: `notify` iterates a
//! snapshot taken at call time, so a subscriber may add or remove
//! subscriptions (including its own) mid-notification.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::context;
use crate::subscriber::{Subscriber, SubscriberId};

/// Counter for generating unique dep IDs.
static DEP_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique dep ID.
fn next_dep_id() -> u64 {
    DEP_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A registered subscription: the subscriber's id plus a weak handle.
///
/// Weak, so a dropped watcher never stays alive through the deps it read.
/// Dead entries are pruned on the next notify.
struct Subscription {
    id: SubscriberId,
    subscriber: Weak<dyn Subscriber>,
}

/// An observable subject: the subscribers interested in one value.
///
/// # Example
///
/// ```rust,ignore
/// let dep = Arc::new(Dep::new());
///
/// // Inside a tracking scope, reads register the active subscriber:
/// dep.depend();
///
/// // Writes re-run everything that registered:
/// dep.notify();
/// ```
pub struct Dep {
    /// Unique identifier, used by subscribers for dedup bookkeeping.
    id: u64,

    /// Registered subscriptions, in registration order. Most properties
    /// have a handful of subscribers, hence the inline capacity.
    subs: RwLock<SmallVec<[Subscription; 4]>>,
}

impl Dep {
    /// Create a new, empty dep.
    pub fn new() -> Self {
        Self {
            id: next_dep_id(),
            subs: RwLock::new(SmallVec::new()),
        }
    }

    /// The dep's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Append a subscriber.
    ///
    /// Callers are expected to have deduplicated already (see
    /// [`Subscriber::add_dep`]); the list itself accepts duplicates.
    pub fn add_subscriber(&self, subscriber: &Arc<dyn Subscriber>) {
        self.subs.write().push(Subscription {
            id: subscriber.id(),
            subscriber: Arc::downgrade(subscriber),
        });
    }

    /// Remove the subscription with the given id. No-op if absent.
    pub fn remove_subscriber(&self, id: SubscriberId) {
        self.subs.write().retain(|s| s.id != id);
    }

    /// Register the currently active subscriber, if any, with this dep.
    ///
    /// The subscriber is offered the dep first; it reports whether the
    /// dep is newly tracked in this evaluation.
    pub fn depend(self: &Arc<Self>) {
        if let Some(active) = context::active_subscriber() {
            if active.add_dep(self) {
                self.add_subscriber(&active);
            }
        }
    }

    /// Notify every live subscriber that the guarded value changed.
    ///
    /// Dead subscriptions are pruned along the way. Updates run in
    /// registration order, synchronously, with no lock held, so a
    /// subscriber is free to mutate this dep's list from inside `update`.
    pub fn notify(&self) {
        let mut live: Vec<Arc<dyn Subscriber>> = Vec::new();
        {
            let mut subs = self.subs.write();
            subs.retain(|s| match s.subscriber.upgrade() {
                Some(strong) => {
                    live.push(strong);
                    true
                }
                None => false,
            });
        }

        for subscriber in live {
            subscriber.update();
        }
    }

    /// The number of registered subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subs.read().len()
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
