//! # Weft Core
//!
//! Reactive dependency-tracking engine for the Weft UI framework: the
//! layer that turns a plain value graph into one whose reads register
//! subscribers and whose writes notify them.
//!
//! - **Observation**: [`observe`] walks an object or array, converts
//!   every key into a tracked property and rebinds array mutators, so
//!   the whole graph becomes live at once.
//! - **Tracking**: a [`Watcher`] runs a closure with itself installed as
//!   the active subscriber; tracked reads inside register it on each
//!   property's [`Dep`], and later writes rerun the closure.
//! - **Structural changes**: [`set`] and [`delete`] add and remove keys
//!   on observed containers, the operations interception cannot see.
//! - **Deep watching**: [`traverse`] reads a whole subgraph so one
//!   watcher covers every nested property.
//!
//! Rendering, component lifecycle and update scheduling live in the
//! layers above; this crate only decides *when* something changed and
//! *who* needs to hear about it, synchronously.
//!
//! # Architecture
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`value`] | `Value` model: primitives plus shared `Object`/`Array` handles |
//! | [`dep`] | Per-property subscriber lists |
//! | [`subscriber`] | The subscriber trait and id space |
//! | [`context`] | Thread-local tracking stack and observation flags |
//! | [`object`] / [`array`] | Containers with intercepted access paths |
//! | [`property`] | `define_reactive`, the one-key conversion |
//! | [`observer`] | Graph walk, eligibility rules, per-container dep |
//! | [`watcher`] | The standard subscriber and `traverse` |
//! | [`api`] | `set` / `delete` for structural changes |
//!
//! # Example
//!
//! ```rust,ignore
//! use weft_core::{observe, set, Object, Value, Watcher};
//!
//! let state = Object::new();
//! state.insert("count", 0.0);
//! observe(&Value::from(state.clone()), true);
//!
//! let reader = state.clone();
//! let watcher = Watcher::new(move || {
//!     println!("count = {:?}", reader.get("count"));
//! });
//!
//! state.set("count", 1.0);                       // watcher reruns
//! set(&Value::from(state.clone()), "label", "hi"); // warns: root state
//! watcher.teardown();
//! ```

pub mod api;
pub mod array;
pub mod context;
pub mod dep;
pub mod object;
pub mod observer;
pub mod property;
pub mod subscriber;
pub mod value;
pub mod watcher;

pub use api::{delete, set, Key};
pub use array::Array;
pub use context::{
    active_subscriber, clear_node_filter, is_server_rendering, is_tracking, set_node_filter,
    set_server_rendering, should_observe, toggle_observing, NodeFilter, TrackingScope,
};
pub use dep::Dep;
pub use object::{Getter, Object, Setter};
pub use observer::{observe, Observer};
pub use property::{define_reactive, WriteHook};
pub use subscriber::{Subscriber, SubscriberId};
pub use value::Value;
pub use watcher::{traverse, Watcher};
