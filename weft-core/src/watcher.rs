//! Watchers
//!
//! A [`Watcher`] is the subscriber side of the tracking handshake. It
//! runs a closure with itself installed as the active subscriber, so
//! every tracked read inside lands the watcher on that property's dep;
//! when any of those deps notifies, the closure reruns and the
//! dependency set is collected afresh.
//!
//! # How a Run Works
//!
//! 1. The watcher pushes itself onto the thread's subscriber stack and
//!    invokes the closure.
//! 2. Deps encountered during the run go into the new-deps set, deduped
//!    by dep id. A dep already present from the previous run does not
//!    re-register the watcher.
//! 3. After the run, deps from the previous set that were not touched
//!    this time drop their subscription, and the new set becomes
//!    current. A branch that stopped being read stops triggering.
//!
//! # Thread Safety
//!
//! The dependency sets live behind locks of their own, and no dep lock
//! is held while watcher state is updated (or the reverse). Updates run
//! synchronously on whichever thread triggered the notify.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::context::{self, TrackingScope};
use crate::dep::Dep;
use crate::subscriber::{Subscriber, SubscriberId};
use crate::value::Value;

/// A reactive computation that reruns when its dependencies change.
///
/// ```rust,ignore
/// let state = Object::new();
/// state.insert("count", 0.0);
/// observe(&Value::from(state.clone()), false);
///
/// let reader = state.clone();
/// let watcher = Watcher::new(move || {
///     println!("count is {:?}", reader.get("count"));
/// });
///
/// state.set("count", 1.0); // closure runs again
/// watcher.teardown();
/// ```
pub struct Watcher {
    id: SubscriberId,
    this: Weak<Watcher>,
    run_fn: Arc<dyn Fn() + Send + Sync>,
    deps: RwLock<Vec<Arc<Dep>>>,
    dep_ids: RwLock<HashSet<u64>>,
    new_deps: RwLock<Vec<Arc<Dep>>>,
    new_dep_ids: RwLock<HashSet<u64>>,
    active: AtomicBool,
    runs: AtomicUsize,
}

impl Watcher {
    /// Create a watcher and run it immediately to collect its initial
    /// dependency set.
    pub fn new<F>(run: F) -> Arc<Watcher>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let watcher = Arc::new_cyclic(|this| Watcher {
            id: SubscriberId::new(),
            this: this.clone(),
            run_fn: Arc::new(run),
            deps: RwLock::new(Vec::new()),
            dep_ids: RwLock::new(HashSet::new()),
            new_deps: RwLock::new(Vec::new()),
            new_dep_ids: RwLock::new(HashSet::new()),
            active: AtomicBool::new(true),
            runs: AtomicUsize::new(0),
        });
        watcher.run();
        watcher
    }

    /// Run the closure under tracking and swap in the freshly collected
    /// dependency set. No-op after [`teardown`](Watcher::teardown).
    pub fn run(&self) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        let Some(this) = self.this.upgrade() else {
            return;
        };
        {
            let _scope = TrackingScope::enter(this);
            (self.run_fn)();
        }
        self.cleanup_deps();
        self.runs.fetch_add(1, Ordering::SeqCst);
    }

    fn cleanup_deps(&self) {
        let stale: Vec<Arc<Dep>> = {
            let deps = self.deps.read();
            let new_dep_ids = self.new_dep_ids.read();
            deps.iter()
                .filter(|dep| !new_dep_ids.contains(&dep.id()))
                .cloned()
                .collect()
        };
        for dep in stale {
            dep.remove_subscriber(self.id);
        }

        let mut deps = self.deps.write();
        let mut dep_ids = self.dep_ids.write();
        let mut new_deps = self.new_deps.write();
        let mut new_dep_ids = self.new_dep_ids.write();
        *deps = std::mem::take(&mut *new_deps);
        *dep_ids = std::mem::take(&mut *new_dep_ids);
    }

    /// Deactivate the watcher and drop all of its subscriptions. Safe to
    /// call more than once.
    pub fn teardown(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        let deps = std::mem::take(&mut *self.deps.write());
        self.dep_ids.write().clear();
        self.new_deps.write().clear();
        self.new_dep_ids.write().clear();
        for dep in deps {
            dep.remove_subscriber(self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// How many times the closure has completed.
    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Size of the current dependency set.
    pub fn dep_count(&self) -> usize {
        self.deps.read().len()
    }
}

impl Subscriber for Watcher {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn add_dep(&self, dep: &Arc<Dep>) -> bool {
        let id = dep.id();
        {
            let mut new_dep_ids = self.new_dep_ids.write();
            if new_dep_ids.contains(&id) {
                return false;
            }
            new_dep_ids.insert(id);
        }
        self.new_deps.write().push(dep.clone());
        // Register with the dep only if the previous run did not already.
        !self.dep_ids.read().contains(&id)
    }

    fn update(&self) {
        self.run();
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .field("runs", &self.run_count())
            .field("deps", &self.dep_count())
            .finish()
    }
}

/// Recursively read every property of `value` so the active subscriber
/// registers on the whole graph. Cycles are cut by remembering visited
/// container dep ids; frozen and filtered containers are skipped.
pub fn traverse(value: &Value) {
    let mut seen = HashSet::new();
    traverse_value(value, &mut seen);
}

fn traverse_value(value: &Value, seen: &mut HashSet<u64>) {
    if context::is_excluded_node(value) {
        return;
    }
    match value {
        Value::Object(object) => {
            if !object.is_extensible() {
                return;
            }
            if let Some(observer) = object.observer() {
                if !seen.insert(observer.dep().id()) {
                    return;
                }
            }
            for key in object.keys() {
                if let Some(child) = object.get(&key) {
                    traverse_value(&child, seen);
                }
            }
        }
        Value::Array(array) => {
            if !array.is_extensible() {
                return;
            }
            if let Some(observer) = array.observer() {
                if !seen.insert(observer.dep().id()) {
                    return;
                }
            }
            for element in array.to_vec() {
                traverse_value(&element, seen);
            }
        }
        _ => {}
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
