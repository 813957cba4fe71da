//! Dynamic Value Model
//!
//! `Value` is the unit of observed state: either a primitive or a shared
//! handle to a container. Containers clone by reference, so two `Value`s
//! can alias the same underlying object or array, and observing one
//! observes the other.
//!
//! Two equality notions coexist. `PartialEq` is structural for primitives
//! and identity for containers. [`Value::same_as`] is the change-detection
//! predicate used by the write paths: the same, except `NaN` counts as
//! equal to `NaN`, so overwriting one `NaN` with another never notifies.

use std::fmt;
use std::sync::Arc;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::array::Array;
use crate::object::Object;
use crate::observer::Observer;

/// A dynamic value: primitive, or shared container handle.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Str(Arc<str>),
    Object(Object),
    Array(Array),
}

impl Value {
    /// Whether this value is a container (object or array).
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The observer attached to this value, if it is an observed
    /// container.
    pub fn observer(&self) -> Option<Arc<Observer>> {
        match self {
            Value::Object(o) => o.observer(),
            Value::Array(a) => a.observer(),
            _ => None,
        }
    }

    /// Change-detection equality.
    ///
    /// Containers compare by identity (same underlying storage),
    /// primitives by value, and `NaN` is the same as `NaN`.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => self == other,
        }
    }

    /// Parse a JSON document into a plain (unobserved) value.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON.
    ///
    /// Under an active subscriber this reads every property through the
    /// tracked path, like any other deep read.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Object(o) => fmt::Debug::fmt(o, f),
            Value::Array(a) => fmt::Debug::fmt(a, f),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v.into())
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Value::Object(v)
    }
}

impl From<Array> for Value {
    fn from(v: Array) -> Self {
        Value::Array(v)
    }
}

// ----------------------------------------------------------------------------
// JSON codec
// ----------------------------------------------------------------------------

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Object(o) => o.serialize(serializer),
            Value::Array(a) => a.serialize(serializer),
        }
    }
}

impl Serialize for Object {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let keys = self.keys();
        let mut map = serializer.serialize_map(Some(keys.len()))?;
        for key in keys {
            // Tracked read: accessor properties serialize their computed
            // result, and serializing under a subscriber registers deps.
            let value = self.get(&key).unwrap_or(Value::Null);
            map.serialize_entry(&key, &value)?;
        }
        map.end()
    }
}

impl Serialize for Array {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let items = self.to_vec();
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in &items {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("any JSON value")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E: de::Error>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
                Ok(Value::Bool(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
                Ok(Value::Number(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
                Ok(Value::Number(v as f64))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
                Ok(Value::Number(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
                Ok(Value::Str(Arc::from(v)))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
                Ok(Value::Str(v.into()))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element::<Value>()? {
                    items.push(item);
                }
                Ok(Value::Array(Array::from_vec(items)))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let object = Object::new();
                while let Some((key, value)) = map.next_entry::<String, Value>()? {
                    object.insert(&key, value);
                }
                Ok(Value::Object(object))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_as_treats_nan_as_equal() {
        let a = Value::Number(f64::NAN);
        let b = Value::Number(f64::NAN);

        assert!(a != b);
        assert!(a.same_as(&b));
        assert!(!a.same_as(&Value::Number(1.0)));
    }

    #[test]
    fn primitive_equality_is_structural() {
        assert_eq!(Value::from(1.0), Value::from(1.0));
        assert_eq!(Value::from("hi"), Value::from("hi"));
        assert_ne!(Value::from(1.0), Value::from("1"));
        assert_eq!(Value::Null, Value::Null);
    }

    #[test]
    fn container_equality_is_identity() {
        let object = Object::new();
        object.insert("a", 1.0);

        let same = Value::Object(object.clone());
        let other = Object::new();
        other.insert("a", 1.0);

        assert_eq!(Value::Object(object.clone()), same);
        assert!(Value::Object(object).same_as(&same));
        assert_ne!(same, Value::Object(other));
    }

    #[test]
    fn from_conversions_cover_primitives() {
        assert!(matches!(Value::from(true), Value::Bool(true)));
        assert!(matches!(Value::from(3_i32), Value::Number(n) if n == 3.0));
        assert!(matches!(Value::from(3_usize), Value::Number(n) if n == 3.0));
        assert_eq!(Value::from("abc").as_str(), Some("abc"));
        assert_eq!(Value::from(String::from("abc")).as_str(), Some("abc"));
    }

    #[test]
    fn json_parse_builds_plain_graph() {
        let value = Value::from_json(r#"{"a": 1, "items": [true, null, "x"]}"#).unwrap();

        let object = value.as_object().unwrap();
        assert_eq!(object.get("a").unwrap().as_f64(), Some(1.0));

        let items = object.get("items").unwrap();
        let items = items.as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items.get(0).unwrap().as_bool(), Some(true));
        assert!(items.get(1).unwrap().is_null());
        assert_eq!(items.get(2).unwrap().as_str(), Some("x"));

        // Parsing never observes.
        assert!(value.observer().is_none());
        assert!(items.observer().is_none());
    }

    #[test]
    fn json_serialize_preserves_key_order() {
        let object = Object::new();
        object.insert("zeta", 1.0);
        object.insert("alpha", 2.0);

        let json = Value::Object(object).to_json().unwrap();
        let zeta = json.find("zeta").unwrap();
        let alpha = json.find("alpha").unwrap();
        assert!(zeta < alpha);
    }

    #[test]
    fn value_handles_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Value>();
        assert_send_sync::<Object>();
        assert_send_sync::<Array>();
    }
}
