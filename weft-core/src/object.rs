//! Observed Object
//!
//! `Object` is the map-shaped container of the value model: string keys
//! to property slots, in insertion order. A slot holds plain data or a
//! pre-defined accessor pair. Once a key has been made reactive (see
//! [`define_reactive`](crate::define_reactive)), reads of it register the
//! active subscriber and accepted writes notify.
//!
//! Handles are cheap to clone and share the underlying storage, so an
//! object reached from two places is one object, observed once.
//!
//! # Raw vs. tracked mutation
//!
//! [`Object::insert`] and [`Object::remove`] are the raw paths: on an
//! already-observed object they do not create reactivity and notify
//! nobody. Keys added after the initial walk go through
//! [`set`](crate::set) and [`delete`](crate::delete) instead.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::context;
use crate::observer::{depend_array, observe, Observer};
use crate::property::ReactiveState;
use crate::value::Value;

/// Computed read half of an accessor property.
pub type Getter = Arc<dyn Fn() -> Value + Send + Sync>;
/// Write half of an accessor property.
pub type Setter = Arc<dyn Fn(Value) + Send + Sync>;

/// Storage for one property: plain data or an accessor pair.
#[derive(Clone)]
pub(crate) enum Slot {
    Data(Value),
    Accessor { get: Getter, set: Option<Setter> },
}

/// One property: its slot, the reactive state once installed, and whether
/// it may still be reconfigured.
pub(crate) struct Property {
    slot: Slot,
    reactive: Option<Arc<ReactiveState>>,
    configurable: bool,
}

impl Property {
    fn plain(slot: Slot) -> Self {
        Self {
            slot,
            reactive: None,
            configurable: true,
        }
    }
}

/// Snapshot of a property descriptor. Taken under the map lock, used
/// after releasing it.
pub(crate) enum Probe {
    Missing,
    Locked,
    Data { value: Value },
    Accessor { get: Getter, set: Option<Setter> },
}

pub(crate) struct ObjectInner {
    entries: RwLock<IndexMap<String, Property>>,
    observer: OnceLock<Arc<Observer>>,
    extensible: AtomicBool,
    component_instance: AtomicBool,
}

/// Shared handle to an observation-capable object.
#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

impl Object {
    /// Create a new, empty object.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                entries: RwLock::new(IndexMap::new()),
                observer: OnceLock::new(),
                extensible: AtomicBool::new(true),
                component_instance: AtomicBool::new(false),
            }),
        }
    }

    /// Identity comparison: do both handles alias the same storage?
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<ObjectInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Arc<ObjectInner>) -> Self {
        Self { inner }
    }

    /// The observer attached to this object, if any.
    pub fn observer(&self) -> Option<Arc<Observer>> {
        self.inner.observer.get().cloned()
    }

    /// Install `observer` as this object's marker. The slot is set
    /// exactly once; if another observer is already installed, that one
    /// is returned instead.
    pub(crate) fn install_observer(&self, observer: Arc<Observer>) -> Option<Arc<Observer>> {
        if self.inner.observer.set(observer).is_ok() {
            None
        } else {
            self.inner.observer.get().cloned()
        }
    }

    /// Forbid observation of this object.
    pub fn prevent_extensions(&self) {
        self.inner.extensible.store(false, Ordering::Relaxed);
    }

    pub fn is_extensible(&self) -> bool {
        self.inner.extensible.load(Ordering::Relaxed)
    }

    /// Flag this object as a component instance. Component instances are
    /// never observed and reject runtime key addition.
    pub fn mark_component_instance(&self) {
        self.inner.component_instance.store(true, Ordering::Relaxed);
    }

    pub fn is_component_instance(&self) -> bool {
        self.inner.component_instance.load(Ordering::Relaxed)
    }

    /// Insert or redefine a property as plain data, dropping any reactive
    /// state it had. Raw path: nothing is notified.
    pub fn insert(&self, key: &str, value: impl Into<Value>) {
        self.inner
            .entries
            .write()
            .insert(key.to_string(), Property::plain(Slot::Data(value.into())));
    }

    /// Remove a property, returning its data value. Raw path: nothing is
    /// notified. Accessor properties yield `Null`.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner
            .entries
            .write()
            .shift_remove(key)
            .map(|property| match property.slot {
                Slot::Data(value) => value,
                Slot::Accessor { .. } => Value::Null,
            })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.entries.read().contains_key(key)
    }

    /// The keys, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    /// Define a computed read-only property.
    pub fn define_getter<G>(&self, key: &str, get: G)
    where
        G: Fn() -> Value + Send + Sync + 'static,
    {
        self.inner.entries.write().insert(
            key.to_string(),
            Property::plain(Slot::Accessor {
                get: Arc::new(get),
                set: None,
            }),
        );
    }

    /// Define an accessor property with both halves.
    pub fn define_accessor<G, S>(&self, key: &str, get: G, set: S)
    where
        G: Fn() -> Value + Send + Sync + 'static,
        S: Fn(Value) + Send + Sync + 'static,
    {
        self.inner.entries.write().insert(
            key.to_string(),
            Property::plain(Slot::Accessor {
                get: Arc::new(get),
                set: Some(Arc::new(set)),
            }),
        );
    }

    /// Mark a property (non-)configurable. Non-configurable keys are
    /// skipped by [`define_reactive`](crate::define_reactive).
    pub fn set_configurable(&self, key: &str, configurable: bool) {
        if let Some(property) = self.inner.entries.write().get_mut(key) {
            property.configurable = configurable;
        }
    }

    /// Snapshot the descriptor for `key`.
    pub(crate) fn probe(&self, key: &str) -> Probe {
        let entries = self.inner.entries.read();
        match entries.get(key) {
            None => Probe::Missing,
            Some(property) if !property.configurable => Probe::Locked,
            Some(property) => match &property.slot {
                Slot::Data(value) => Probe::Data {
                    value: value.clone(),
                },
                Slot::Accessor { get, set } => Probe::Accessor {
                    get: get.clone(),
                    set: set.clone(),
                },
            },
        }
    }

    /// Attach reactive state to `key`, preserving an existing accessor
    /// pair and replacing a data slot with `resolved`.
    pub(crate) fn install_reactive(&self, key: &str, resolved: Value, state: Arc<ReactiveState>) {
        let mut entries = self.inner.entries.write();
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Property::plain(Slot::Data(Value::Null)));
        if let Slot::Data(_) = entry.slot {
            entry.slot = Slot::Data(resolved);
        }
        entry.reactive = Some(state);
    }

    /// Read a property.
    ///
    /// For reactive keys this is the intercepted get path: under an
    /// active subscriber it registers the property's dep and, when the
    /// value is an observed container, the child observer's dep as well
    /// (including every observed descendant of an array). Accessor
    /// properties return the getter's result.
    pub fn get(&self, key: &str) -> Option<Value> {
        let (slot, reactive) = {
            let entries = self.inner.entries.read();
            let property = entries.get(key)?;
            (property.slot.clone(), property.reactive.clone())
        };

        let value = match slot {
            Slot::Data(value) => value,
            Slot::Accessor { get, .. } => get(),
        };

        if let Some(state) = reactive {
            if context::is_tracking() {
                state.dep.depend();
                let child = state.child.read().clone();
                if let Some(child) = child {
                    child.dep().depend();
                    if let Value::Array(array) = &value {
                        depend_array(array);
                    }
                }
            }
        }

        Some(value)
    }

    /// Write a property.
    ///
    /// For reactive keys this is the intercepted set path: a write of the
    /// same value (identity for containers, `NaN` equal to `NaN`) is
    /// suppressed; otherwise the new value is re-observed and the
    /// property's dep notifies. A reactive getter-only accessor ignores
    /// the write. Assigning to an absent key inserts plain data, like the
    /// raw path.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();

        let probe = {
            let entries = self.inner.entries.read();
            entries
                .get(key)
                .map(|property| (property.slot.clone(), property.reactive.clone()))
        };

        let Some((slot, reactive)) = probe else {
            self.insert(key, value);
            return;
        };

        let Some(state) = reactive else {
            match slot {
                Slot::Data(_) => self.store_data(key, value),
                Slot::Accessor { set: Some(set), .. } => set(value),
                Slot::Accessor { set: None, .. } => {}
            }
            return;
        };

        let current = match &slot {
            Slot::Data(value) => value.clone(),
            Slot::Accessor { get, .. } => get(),
        };
        if value.same_as(&current) {
            return;
        }
        if cfg!(debug_assertions) {
            if let Some(hook) = &state.write_hook {
                hook();
            }
        }
        match slot {
            // A reactive getter without a setter accepts and ignores the
            // write.
            Slot::Accessor { set: None, .. } => return,
            Slot::Accessor { set: Some(set), .. } => set(value.clone()),
            Slot::Data(_) => self.store_data(key, value.clone()),
        }
        if !state.shallow {
            *state.child.write() = observe(&value, false);
        }
        state.dep.notify();
    }

    /// Overwrite the data slot for `key`, leaving reactive state intact.
    fn store_data(&self, key: &str, value: Value) {
        if let Some(property) = self.inner.entries.write().get_mut(key) {
            if let Slot::Data(_) = property.slot {
                property.slot = Slot::Data(value);
            }
        }
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Raw reads: Debug must never register dependencies.
        let entries = self.inner.entries.read();
        let mut map = f.debug_map();
        for (key, property) in entries.iter() {
            match &property.slot {
                Slot::Data(value) => map.entry(key, value),
                Slot::Accessor { .. } => map.entry(key, &"<accessor>"),
            };
        }
        map.finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
