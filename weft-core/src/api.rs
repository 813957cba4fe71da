//! Reactive Mutation API
//!
//! Property interception only covers keys that existed when a container
//! was observed. [`set`] and [`delete`] are the escape hatch: they add or
//! remove entries on an already-observed container and notify its
//! observer dep, so subscribers of the container pick the change up.
//! On plain containers they degrade to ordinary mutation.
//!
//! Misuse warnings (mutating a primitive, adding keys to a component
//! instance or root state) are emitted through `tracing` in debug builds
//! and compiled out of release builds.

use crate::array::Array;
use crate::object::Object;
use crate::observer::Observer;
use crate::property::define_reactive;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Key into a container: an array index or an object property name.
///
/// A `Name` that parses as an integer addresses an array index, so
/// `set(&list, "3", v)` and `set(&list, 3, v)` behave the same.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Index(usize),
    Name(String),
}

impl Key {
    fn as_array_index(&self) -> Option<usize> {
        match self {
            Key::Index(index) => Some(*index),
            Key::Name(name) => name.parse().ok(),
        }
    }

    fn into_name(self) -> String {
        match self {
            Key::Index(index) => index.to_string(),
            Key::Name(name) => name,
        }
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(index) => write!(f, "{index}"),
            Key::Name(name) => f.write_str(name),
        }
    }
}

fn dev_warn(message: &str) {
    if cfg!(debug_assertions) {
        tracing::warn!("{message}");
    }
}

/// Component instances and containers serving as root state reject
/// runtime key addition and removal.
fn is_guarded(object: &Object, observer: Option<&Arc<Observer>>) -> bool {
    object.is_component_instance()
        || observer.map(|observer| observer.root_bindings() > 0).unwrap_or(false)
}

fn set_array_index(target: &Array, key: &Key, value: Value) -> Value {
    let Some(index) = key.as_array_index() else {
        dev_warn("cannot set a non-index key on an array");
        return value;
    };
    // Growing first makes out-of-range splices land at the index.
    target.grow_to(index);
    target.splice(index, 1, vec![value.clone()]);
    value
}

/// Set `key` on `target` to `value`, returning the value.
///
/// An existing object key or in-range array index goes through the
/// ordinary intercepted write. A new object key on an observed object is
/// defined reactive and the object's observer dep notifies; on a plain
/// object it is inserted as plain data. An out-of-range array index
/// grows the array with nulls.
///
/// Primitives cannot take keys, and component instances and root state
/// reject new keys; both warn in debug builds (the root-state write
/// still lands, as plain data).
pub fn set(target: &Value, key: impl Into<Key>, value: impl Into<Value>) -> Value {
    let key = key.into();
    let value = value.into();

    let object = match target {
        Value::Array(array) => return set_array_index(array, &key, value),
        Value::Object(object) => object,
        _ => {
            dev_warn("cannot set a reactive property on a primitive value");
            return value;
        }
    };

    let name = key.into_name();
    if object.contains_key(&name) {
        object.set(&name, value.clone());
        return value;
    }

    let observer = object.observer();
    if is_guarded(object, observer.as_ref()) {
        dev_warn(
            "avoid adding reactive keys to a component instance or its root state at runtime; \
             declare them when the root is first observed",
        );
        object.insert(&name, value.clone());
        return value;
    }

    let Some(observer) = observer else {
        object.insert(&name, value.clone());
        return value;
    };

    define_reactive(object, &name, Some(value.clone()), None, false);
    observer.dep().notify();
    value
}

/// Remove `key` from `target`.
///
/// An array index is spliced out through the interceptor. An object key
/// is removed and the object's observer dep notifies; removing a missing
/// key does nothing. Component instances and root state warn in debug
/// builds but the removal still happens.
pub fn delete(target: &Value, key: impl Into<Key>) {
    let key = key.into();

    let object = match target {
        Value::Array(array) => {
            // A valid index always goes through the interceptor, which
            // notifies even when the cut removes nothing.
            if let Some(index) = key.as_array_index() {
                array.splice(index, 1, Vec::new());
            } else {
                dev_warn("cannot delete a non-index key from an array");
            }
            return;
        }
        Value::Object(object) => object,
        _ => {
            dev_warn("cannot delete a reactive property from a primitive value");
            return;
        }
    };

    let observer = object.observer();
    if is_guarded(object, observer.as_ref()) {
        dev_warn(
            "avoid deleting keys from a component instance or its root state; \
             set the value to null instead",
        );
    }

    let name = key.into_name();
    if !object.contains_key(&name) {
        return;
    }
    object.remove(&name);
    if let Some(observer) = observer {
        observer.dep().notify();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
