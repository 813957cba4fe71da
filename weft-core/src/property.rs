//! Reactive Property Definition
//!
//! [`define_reactive`] converts one object key into a tracked property:
//! reads register the active subscriber on the key's dep, accepted writes
//! notify it. This is the primitive the observer walk applies to every
//! key of an observed object, and the one [`set`](crate::set) uses to
//! make a late-added key reactive.
//!
//! # How a Key Becomes Reactive
//!
//! 1. The key's current descriptor is probed. A non-configurable key is
//!    left untouched.
//! 2. The starting value is resolved: an explicit `initial` wins,
//!    otherwise the stored data value, otherwise the result of an
//!    existing getter. A getter with no setter is not invoked at
//!    definition time.
//! 3. Unless `shallow`, the starting value is observed, producing the
//!    child observer the get path also registers.
//! 4. The dep, child observer and write hook are installed on the
//!    property. An existing accessor pair stays in place and keeps
//!    running under the interception.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::dep::Dep;
use crate::object::{Object, Probe};
use crate::observer::{observe, Observer};
use crate::value::Value;

/// Debug-build hook invoked before an accepted reactive write lands.
pub type WriteHook = Arc<dyn Fn() + Send + Sync>;

/// Per-property tracking state shared by the get and set paths.
pub(crate) struct ReactiveState {
    /// Subscribers of this property.
    pub(crate) dep: Arc<Dep>,
    /// Observer of the current value, refreshed on every accepted write.
    pub(crate) child: RwLock<Option<Arc<Observer>>>,
    /// When set, values assigned to this property are not observed.
    pub(crate) shallow: bool,
    pub(crate) write_hook: Option<WriteHook>,
}

/// Make `key` on `target` a reactive property.
///
/// `initial` overrides whatever the key currently holds; `write_hook`
/// runs on accepted writes in debug builds; `shallow` skips observation
/// of the value and of values assigned later.
///
/// Defining an already-reactive key installs a fresh dep, dropping the
/// subscribers collected by the old one.
pub fn define_reactive(
    target: &Object,
    key: &str,
    initial: Option<Value>,
    write_hook: Option<WriteHook>,
    shallow: bool,
) {
    let resolved = match target.probe(key) {
        Probe::Locked => return,
        Probe::Missing => initial.unwrap_or(Value::Null),
        Probe::Data { value } => initial.unwrap_or(value),
        Probe::Accessor { get, set } => match initial {
            Some(value) => value,
            // Only a full accessor pair is read here. A lone getter is
            // deferred until the property is actually accessed.
            None if set.is_some() => get(),
            None => Value::Null,
        },
    };

    let child = if shallow {
        None
    } else {
        observe(&resolved, false)
    };

    let state = Arc::new(ReactiveState {
        dep: Arc::new(Dep::new()),
        child: RwLock::new(child),
        shallow,
        write_hook,
    });
    target.install_reactive(key, resolved, state);
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
