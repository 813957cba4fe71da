//! Observer Attachment
//!
//! An [`Observer`] is the per-container marker that makes a value graph
//! live. [`observe`] attaches one to an eligible object or array and
//! returns it; containers that already carry a marker return the
//! existing one, so a graph shared between several roots is converted
//! exactly once.
//!
//! # How Attachment Works
//!
//! 1. Primitives and filtered values are rejected outright.
//! 2. A container with a marker returns it unchanged, even when the
//!    eligibility rules would reject it today.
//! 3. Otherwise eligibility is checked: observation enabled on this
//!    thread, not server rendering, container extensible, and not a
//!    component instance.
//! 4. Objects get every key converted with
//!    [`define_reactive`](crate::define_reactive); arrays get their
//!    mutators rebound to the observing table and their elements
//!    observed. The marker is installed before the walk, which is what
//!    lets cyclic graphs terminate.
//!
//! # Thread Safety
//!
//! Attachment races install one marker; losers adopt the winner. The
//! eligibility flags are thread-local, so disabling observation on one
//! thread does not disturb another.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use crate::array::{Array, ArrayInner};
use crate::context;
use crate::dep::Dep;
use crate::object::{Object, ObjectInner};
use crate::property::define_reactive;
use crate::value::Value;

enum Target {
    Object(Weak<ObjectInner>),
    Array(Weak<ArrayInner>),
}

/// Marker attached to an observed container.
///
/// Holds the container-level dep, the one notified by array mutations
/// and by key addition or removal through [`set`](crate::set) and
/// [`delete`](crate::delete).
pub struct Observer {
    target: Target,
    dep: Arc<Dep>,
    root_bindings: AtomicUsize,
}

impl Observer {
    /// The container-level dep.
    pub fn dep(&self) -> &Arc<Dep> {
        &self.dep
    }

    /// The observed container, if it is still alive.
    pub fn value(&self) -> Option<Value> {
        match &self.target {
            Target::Object(weak) => weak.upgrade().map(|inner| Value::Object(Object::from_inner(inner))),
            Target::Array(weak) => weak.upgrade().map(|inner| Value::Array(Array::from_inner(inner))),
        }
    }

    /// How many roots this container serves as state for.
    pub fn root_bindings(&self) -> usize {
        self.root_bindings.load(Ordering::Relaxed)
    }

    pub(crate) fn bind_root(&self) {
        self.root_bindings.fetch_add(1, Ordering::Relaxed);
    }

    /// Observe each of `items` as a non-root value.
    pub(crate) fn observe_items(&self, items: &[Value]) {
        for item in items {
            observe(item, false);
        }
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("dep", &self.dep.id())
            .field("root_bindings", &self.root_bindings())
            .finish()
    }
}

fn attach_object(target: &Object) -> Arc<Observer> {
    let observer = Arc::new(Observer {
        target: Target::Object(target.downgrade()),
        dep: Arc::new(Dep::new()),
        root_bindings: AtomicUsize::new(0),
    });
    // Marker first, walk second: a cycle reaching back here finds the
    // marker and stops.
    if let Some(existing) = target.install_observer(observer.clone()) {
        return existing;
    }
    for key in target.keys() {
        define_reactive(target, &key, None, None, false);
    }
    observer
}

fn attach_array(target: &Array) -> Arc<Observer> {
    let observer = Arc::new(Observer {
        target: Target::Array(target.downgrade()),
        dep: Arc::new(Dep::new()),
        root_bindings: AtomicUsize::new(0),
    });
    if let Some(existing) = target.install_observer(observer.clone()) {
        return existing;
    }
    target.rebind_mutations();
    observer.observe_items(&target.raw_snapshot());
    observer
}

fn eligible(value: &Value) -> bool {
    if !context::should_observe() || context::is_server_rendering() {
        return false;
    }
    match value {
        Value::Object(object) => object.is_extensible() && !object.is_component_instance(),
        Value::Array(array) => array.is_extensible(),
        _ => false,
    }
}

/// Attach an observer to `value` if it is an eligible container,
/// returning the marker. A container observed earlier returns its
/// existing marker regardless of current eligibility. With
/// `as_root_data` the marker's root binding count is incremented.
pub fn observe(value: &Value, as_root_data: bool) -> Option<Arc<Observer>> {
    if !value.is_container() || context::is_excluded_node(value) {
        return None;
    }

    let observer = if let Some(existing) = value.observer() {
        Some(existing)
    } else if eligible(value) {
        match value {
            Value::Object(object) => Some(attach_object(object)),
            Value::Array(array) => Some(attach_array(array)),
            _ => None,
        }
    } else {
        None
    };

    if as_root_data {
        if let Some(observer) = &observer {
            observer.bind_root();
        }
    }
    observer
}

/// Register the active subscriber on every observed element of `target`,
/// recursing through nested arrays. Index reads are not intercepted, so
/// a tracked read of an array property pulls in the element deps here.
/// Observed elements are visited once by dep id, so walks through
/// shared or self-referential arrays terminate.
pub(crate) fn depend_array(target: &Array) {
    let mut seen = HashSet::new();
    depend_array_inner(target, &mut seen);
}

fn depend_array_inner(target: &Array, seen: &mut HashSet<u64>) {
    for element in target.raw_snapshot() {
        if let Some(observer) = element.observer() {
            if !seen.insert(observer.dep().id()) {
                continue;
            }
            observer.dep().depend();
        }
        if let Value::Array(nested) = &element {
            depend_array_inner(nested, seen);
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
