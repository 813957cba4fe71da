//! Integration Tests for the Reactive Engine
//!
//! These tests verify that observation, tracking, watchers and the
//! structural mutation API work together across module boundaries.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use weft_core::{delete, observe, set, traverse, Array, Object, Value, Watcher};

fn observed_object(entries: &[(&str, Value)]) -> Object {
    let object = Object::new();
    for (key, value) in entries {
        object.insert(key, value.clone());
    }
    observe(&Value::from(object.clone()), false).unwrap();
    object
}

/// Test the full chain: observe, read under a watcher, write, rerun.
#[test]
fn write_reruns_a_watcher_exactly_once() {
    let state = observed_object(&[("count", Value::from(1.0))]);
    let seen = Arc::new(AtomicI32::new(0));

    let reader = state.clone();
    let sink = seen.clone();
    let watcher = Watcher::new(move || {
        let count = reader.get("count").unwrap().as_f64().unwrap_or(0.0);
        sink.store(count as i32, Ordering::SeqCst);
    });

    // Ran once on creation, capturing the initial value
    assert_eq!(watcher.run_count(), 1);
    assert_eq!(seen.load(Ordering::SeqCst), 1);

    state.set("count", 2.0);
    assert_eq!(watcher.run_count(), 2);
    assert_eq!(seen.load(Ordering::SeqCst), 2);

    // Writing the same value again is suppressed
    state.set("count", 2.0);
    assert_eq!(watcher.run_count(), 2);
}

/// Test that NaN-to-NaN writes do not ping subscribers.
#[test]
fn nan_writes_are_suppressed_end_to_end() {
    let state = observed_object(&[("ratio", Value::from(f64::NAN))]);

    let reader = state.clone();
    let watcher = Watcher::new(move || {
        reader.get("ratio");
    });

    state.set("ratio", f64::NAN);
    assert_eq!(watcher.run_count(), 1);

    state.set("ratio", 0.5);
    assert_eq!(watcher.run_count(), 2);
}

/// Test that replacing a nested container keeps the chain live: the new
/// container is observed on write and tracked after the rerun.
#[test]
fn replaced_containers_stay_reactive() {
    let profile = Object::new();
    profile.insert("name", "ada");
    let state = observed_object(&[("profile", Value::from(profile.clone()))]);

    let seen = Arc::new(RwLock::new(String::new()));
    let reader = state.clone();
    let sink = seen.clone();
    let watcher = Watcher::new(move || {
        let profile = reader.get("profile").unwrap();
        let name = profile
            .as_object()
            .and_then(|profile| profile.get("name"))
            .and_then(|name| name.as_str().map(str::to_string))
            .unwrap_or_default();
        *sink.write() = name;
    });
    assert_eq!(*seen.read(), "ada");

    // Deep write through the original container
    profile.set("name", "grace");
    assert_eq!(watcher.run_count(), 2);
    assert_eq!(*seen.read(), "grace");

    // Replace the container wholesale
    let replacement = Object::new();
    replacement.insert("name", "edsger");
    state.set("profile", replacement.clone());
    assert_eq!(watcher.run_count(), 3);
    assert_eq!(*seen.read(), "edsger");

    // The replacement was observed and is tracked after the rerun
    assert!(replacement.observer().is_some());
    replacement.set("name", "barbara");
    assert_eq!(watcher.run_count(), 4);
    assert_eq!(*seen.read(), "barbara");

    // The detached container no longer triggers
    profile.set("name", "ignored");
    assert_eq!(watcher.run_count(), 4);
}

/// Test that reading an array property registers on the array itself, so
/// mutator calls rerun the reader.
#[test]
fn array_mutations_reach_property_readers() {
    let items = Array::from_vec(vec![Value::from(1.0)]);
    let state = observed_object(&[("items", Value::from(items.clone()))]);

    let reader = state.clone();
    let watcher = Watcher::new(move || {
        reader.get("items");
    });
    assert_eq!(watcher.run_count(), 1);

    items.push(2.0);
    assert_eq!(watcher.run_count(), 2);

    items.splice(0, 1, vec![Value::from(9.0)]);
    assert_eq!(watcher.run_count(), 3);

    items.pop();
    assert_eq!(watcher.run_count(), 4);
}

/// Test that objects pushed into an observed array become reactive.
#[test]
fn pushed_elements_join_the_graph() {
    let items = Array::new();
    observe(&Value::from(items.clone()), false).unwrap();

    let element = Object::new();
    element.insert("done", false);
    items.push(element.clone());
    assert!(element.observer().is_some());

    let reader = element.clone();
    let watcher = Watcher::new(move || {
        reader.get("done");
    });

    element.set("done", true);
    assert_eq!(watcher.run_count(), 2);
}

/// Test key addition and removal through the structural API.
#[test]
fn structural_changes_notify_container_readers() {
    let bag = Object::new();
    bag.insert("kept", 1.0);
    let state = observed_object(&[("bag", Value::from(bag.clone()))]);

    // Reading the property registers on the bag's own observer dep
    let reader = state.clone();
    let watcher = Watcher::new(move || {
        reader.get("bag");
    });
    assert_eq!(watcher.run_count(), 1);

    let bag_value = Value::from(bag.clone());
    set(&bag_value, "added", 2.0);
    assert_eq!(watcher.run_count(), 2);
    assert_eq!(bag.get("added").unwrap().as_f64(), Some(2.0));

    delete(&bag_value, "added");
    assert_eq!(watcher.run_count(), 3);
    assert!(!bag.contains_key("added"));

    // Deleting a key that is not there stays silent
    delete(&bag_value, "absent");
    assert_eq!(watcher.run_count(), 3);
}

/// Test that `set` on an out-of-range index grows the array with nulls.
#[test]
fn set_grows_a_sparse_array() {
    let items = Array::from_vec(vec![
        Value::from(1.0),
        Value::from(2.0),
        Value::from(3.0),
    ]);
    observe(&Value::from(items.clone()), false).unwrap();

    let reader = items.clone();
    let watcher = Watcher::new(move || {
        reader.len();
    });

    set(&Value::from(items.clone()), 5usize, 7.0);
    assert_eq!(items.len(), 6);
    assert!(items.get(3).unwrap().is_null());
    assert!(items.get(4).unwrap().is_null());
    assert_eq!(items.get(5).unwrap().as_f64(), Some(7.0));
    assert_eq!(watcher.run_count(), 2);
}

/// Test that root state refuses late reactive keys but keeps the data.
#[test]
fn root_state_rejects_late_reactive_keys() {
    let root = Object::new();
    root.insert("declared", 1.0);
    observe(&Value::from(root.clone()), true).unwrap();

    set(&Value::from(root.clone()), "late", 2.0);

    // The assignment landed, but as plain data
    assert_eq!(root.get("late").unwrap().as_f64(), Some(2.0));
    let reader = root.clone();
    let watcher = Watcher::new(move || {
        reader.get("late");
    });
    root.set("late", 3.0);
    assert_eq!(watcher.run_count(), 1);

    // Declared keys keep working
    let declared_reader = root.clone();
    let declared_watcher = Watcher::new(move || {
        declared_reader.get("declared");
    });
    root.set("declared", 4.0);
    assert_eq!(declared_watcher.run_count(), 2);
}

/// Test that a computed accessor picks up the dependencies its getter
/// reads, through the watcher running it.
#[test]
fn computed_accessor_tracks_its_sources() {
    let state = Object::new();
    state.insert("base", 2.0);

    let source = state.clone();
    state.define_getter("double", move || {
        let base = source.get("base").and_then(|v| v.as_f64()).unwrap_or(0.0);
        Value::from(base * 2.0)
    });
    observe(&Value::from(state.clone()), false).unwrap();

    let seen = Arc::new(AtomicI32::new(0));
    let reader = state.clone();
    let sink = seen.clone();
    let watcher = Watcher::new(move || {
        let double = reader.get("double").unwrap().as_f64().unwrap_or(0.0);
        sink.store(double as i32, Ordering::SeqCst);
    });
    assert_eq!(seen.load(Ordering::SeqCst), 4);

    // Writing the source reruns the watcher through the getter
    state.set("base", 5.0);
    assert_eq!(watcher.run_count(), 2);
    assert_eq!(seen.load(Ordering::SeqCst), 10);
}

/// Test that traverse makes one watcher cover a whole subtree.
#[test]
fn traverse_watches_a_whole_subtree() {
    let leaf = Object::new();
    leaf.insert("value", 1.0);
    let items = Array::from_vec(vec![Value::from(leaf.clone())]);
    let state = observed_object(&[("items", Value::from(items.clone()))]);

    let deep = state.clone();
    let watcher = Watcher::new(move || {
        traverse(&Value::from(deep.clone()));
    });
    assert_eq!(watcher.run_count(), 1);

    // A write three levels down reruns the traversing watcher
    leaf.set("value", 2.0);
    assert_eq!(watcher.run_count(), 2);

    // So does an array mutation
    items.push(3.0);
    assert_eq!(watcher.run_count(), 3);
}

/// Test that disabling observation produces a plain, silent graph.
#[test]
fn disabled_observation_builds_plain_state() {
    let previous = weft_core::toggle_observing(false);
    let state = Object::new();
    state.insert("count", 1.0);
    let skipped = observe(&Value::from(state.clone()), false);
    weft_core::toggle_observing(previous);

    assert!(skipped.is_none());
    assert!(state.observer().is_none());

    let reader = state.clone();
    let watcher = Watcher::new(move || {
        reader.get("count");
    });
    state.set("count", 2.0);
    assert_eq!(watcher.run_count(), 1);
}

/// Test teardown in the middle of a stream of updates.
#[test]
fn teardown_stops_a_live_watcher() {
    let state = observed_object(&[("count", Value::from(0.0))]);

    let reader = state.clone();
    let watcher = Watcher::new(move || {
        reader.get("count");
    });

    state.set("count", 1.0);
    assert_eq!(watcher.run_count(), 2);

    watcher.teardown();
    state.set("count", 2.0);
    state.set("count", 3.0);
    assert_eq!(watcher.run_count(), 2);
    assert_eq!(state.get("count").unwrap().as_f64(), Some(3.0));
}

/// Test that a graph parsed from JSON can be observed, mutated and
/// serialized back with the changes in place.
#[test]
fn json_round_trip_through_an_observed_graph() {
    let root = Value::from_json(r#"{"user":{"name":"ada","tags":["math"]}}"#).unwrap();
    observe(&root, false).unwrap();

    let user = root
        .as_object()
        .and_then(|root| root.get("user"))
        .and_then(|user| user.as_object().cloned())
        .unwrap();

    let seen = Arc::new(RwLock::new(String::new()));
    let reader = user.clone();
    let sink = seen.clone();
    let watcher = Watcher::new(move || {
        let name = reader
            .get("name")
            .and_then(|name| name.as_str().map(str::to_string))
            .unwrap_or_default();
        *sink.write() = name;
    });
    assert_eq!(*seen.read(), "ada");

    user.set("name", "grace");
    assert_eq!(watcher.run_count(), 2);
    assert_eq!(*seen.read(), "grace");

    let serialized = root.to_json().unwrap();
    assert!(serialized.contains(r#""name":"grace""#));
    assert!(serialized.contains(r#""tags":["math"]"#));
}

/// Test that writes from another thread reach a watcher created here.
#[test]
fn writes_cross_threads() {
    let state = observed_object(&[("count", Value::from(0.0))]);

    let seen = Arc::new(AtomicI32::new(-1));
    let reader = state.clone();
    let sink = seen.clone();
    let watcher = Watcher::new(move || {
        let count = reader.get("count").unwrap().as_f64().unwrap_or(0.0);
        sink.store(count as i32, Ordering::SeqCst);
    });
    assert_eq!(seen.load(Ordering::SeqCst), 0);

    let writer = state.clone();
    std::thread::spawn(move || {
        writer.set("count", 42.0);
    })
    .join()
    .unwrap();

    // The update ran synchronously on the writer thread
    assert_eq!(watcher.run_count(), 2);
    assert_eq!(seen.load(Ordering::SeqCst), 42);
}
