//! Host value model.
//!
//! Everything that crosses the loader boundary (module exports, substitutes,
//! global bindings) is a [`Value`]. Objects expose their attributes as explicit
//! [`PropertyDescriptor`]s so the guard can snapshot and patch them without
//! runtime reflection. Functions and objects are reference types and compare
//! by identity.

mod function;
mod object;

pub use function::{FunctionHandle, NativeFn};
pub use object::{ObjectHandle, PropertyDescriptor, PropertyKey};

use std::fmt;
use std::sync::Arc;

/// A value owned by the host.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    Function(FunctionHandle),
    Object(ObjectHandle),
}

impl Value {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_object(&self) -> Option<&ObjectHandle> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionHandle> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Object(_) => "object",
        }
    }

    /// Identity-aware equality where two NaNs are the same value.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => (a.is_nan() && b.is_nan()) || a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Build a value from JSON. Arrays become objects keyed by index with a
    /// `length` property; every JSON object becomes a fresh host object.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::string(s.as_str()),
            serde_json::Value::Array(items) => {
                let obj = ObjectHandle::new();
                for (i, item) in items.iter().enumerate() {
                    obj.insert(i.to_string(), Value::from_json(item));
                }
                obj.insert("length", Value::Number(items.len() as f64));
                Value::Object(obj)
            }
            serde_json::Value::Object(map) => {
                let obj = ObjectHandle::new();
                for (k, v) in map {
                    obj.insert(k.as_str(), Value::from_json(v));
                }
                Value::Object(obj)
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Function(func) => write!(f, "{func:?}"),
            Value::Object(obj) => write!(f, "{obj:?}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<ObjectHandle> for Value {
    fn from(o: ObjectHandle) -> Self {
        Value::Object(o)
    }
}

impl From<FunctionHandle> for Value {
    fn from(f: FunctionHandle) -> Self {
        Value::Function(f)
    }
}
