//! Tracking Context
//!
//! Per-thread ambient state for the reactive engine. The central piece is
//! the active-subscriber stack: while a subscriber evaluates, it sits on
//! top of the stack and every observed read registers against it. The
//! module also owns the observation toggle, the server-rendering flag,
//! and the render-node exclusion predicate consulted by
//! [`observe`](crate::observe).
//!
//! # Implementation
//!
//! All of it is thread-local. Reactivity is a cooperative, same-thread
//! protocol: a subscriber evaluation, the reads it performs, and the
//! notifications its writes trigger all share one call stack. Nested
//! evaluations (a derived value read while a render evaluates) push and
//! pop in LIFO order, enforced by the RAII guard.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use crate::subscriber::{Subscriber, SubscriberId};
use crate::value::Value;

/// Predicate deciding whether a value must never be wrapped by an
/// observer. Supplied by the rendering layer to exclude its node types.
pub type NodeFilter = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

thread_local! {
    /// Stack of currently evaluating subscribers. Top is the active one.
    static SUBSCRIBER_STACK: RefCell<Vec<Arc<dyn Subscriber>>> = RefCell::new(Vec::new());

    /// Whether `observe` may attach observers on this thread.
    static OBSERVING: Cell<bool> = Cell::new(true);

    /// Whether this thread is rendering on the server. Observation is
    /// skipped entirely in that mode.
    static SERVER_RENDERING: Cell<bool> = Cell::new(false);

    /// Values matching this predicate are never observed.
    static NODE_FILTER: RefCell<Option<NodeFilter>> = RefCell::new(None);
}

/// Guard marking a subscriber as the active one for the current thread.
///
/// Reads of observed state performed while the guard is alive register
/// the subscriber on the deps they touch. Dropping the guard restores
/// the previously active subscriber, so scopes nest.
pub struct TrackingScope {
    id: SubscriberId,
}

impl TrackingScope {
    /// Push `subscriber` onto the stack, making it the active subscriber
    /// until the returned guard is dropped.
    pub fn enter(subscriber: Arc<dyn Subscriber>) -> Self {
        let id = subscriber.id();
        SUBSCRIBER_STACK.with(|stack| stack.borrow_mut().push(subscriber));
        Self { id }
    }
}

impl Drop for TrackingScope {
    fn drop(&mut self) {
        SUBSCRIBER_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Catch mismatched enter/drop pairs early in debug builds.
            if let Some(subscriber) = popped {
                debug_assert_eq!(
                    subscriber.id(),
                    self.id,
                    "TrackingScope mismatch: expected {:?}, got {:?}",
                    self.id,
                    subscriber.id()
                );
            }
        });
    }
}

/// Whether a subscriber is currently evaluating on this thread.
pub fn is_tracking() -> bool {
    SUBSCRIBER_STACK.with(|stack| !stack.borrow().is_empty())
}

/// The currently active subscriber, if any.
pub fn active_subscriber() -> Option<Arc<dyn Subscriber>> {
    SUBSCRIBER_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Enable or disable observer attachment on this thread, returning the
/// previous setting.
///
/// Callers doing bulk internal reconstruction disable observation, run,
/// and restore:
///
/// ```rust,ignore
/// let prev = toggle_observing(false);
/// // ... build transient structures ...
/// toggle_observing(prev);
/// ```
pub fn toggle_observing(value: bool) -> bool {
    OBSERVING.with(|flag| flag.replace(value))
}

/// Whether `observe` may currently attach observers on this thread.
pub fn should_observe() -> bool {
    OBSERVING.with(|flag| flag.get())
}

/// Mark this thread as server-rendering (or not).
pub fn set_server_rendering(value: bool) {
    SERVER_RENDERING.with(|flag| flag.set(value));
}

/// Whether this thread is in server-rendering mode.
pub fn is_server_rendering() -> bool {
    SERVER_RENDERING.with(|flag| flag.get())
}

/// Install the render-node exclusion predicate for this thread.
pub fn set_node_filter<F>(filter: F)
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    NODE_FILTER.with(|slot| *slot.borrow_mut() = Some(Arc::new(filter)));
}

/// Remove the render-node exclusion predicate.
pub fn clear_node_filter() {
    NODE_FILTER.with(|slot| *slot.borrow_mut() = None);
}

/// Whether `value` is excluded from observation by the installed filter.
pub(crate) fn is_excluded_node(value: &Value) -> bool {
    NODE_FILTER.with(|slot| match slot.borrow().as_ref() {
        Some(filter) => filter(value),
        None => false,
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
