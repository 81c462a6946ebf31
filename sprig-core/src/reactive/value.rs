//! Dynamic data model for tracked objects.
//!
//! Plain data placed under observation is represented as [`Object`]: an
//! insertion-ordered map from field names to [`Value`]s. Objects are shared
//! through `Rc`, so nesting one object inside another shares it rather than
//! copying it, and identity is pointer identity.

use std::cell::{Cell, Ref as CellRef, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::proxy::{forget_proxies, Reactive};
use super::runtime::Runtime;
use super::subscriber::TargetId;

/// A value stored in, or read from, a tracked object.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    /// A raw, unobserved object.
    Object(Rc<Object>),
    /// A proxy over an object. Reads of nested objects through a proxy
    /// produce this variant; writes store the underlying raw object.
    Reactive(Reactive),
}

impl Value {
    /// Identity comparison used to decide whether a write is a change.
    ///
    /// Scalars compare by value, strings by content, objects by identity
    /// (a proxy and its raw object are the same object). Floats compare by
    /// bit pattern, so `NaN` equals itself and `0.0` differs from `-0.0`.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => {
                a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => match (self.object_ptr(), other.object_ptr()) {
                (Some(a), Some(b)) => Rc::ptr_eq(&a, &b),
                _ => false,
            },
        }
    }

    fn object_ptr(&self) -> Option<Rc<Object>> {
        match self {
            Value::Object(object) => Some(object.clone()),
            Value::Reactive(proxy) => Some(proxy.to_raw()),
            _ => None,
        }
    }

    /// Strip any proxy, leaving raw data suitable for storage.
    pub fn into_raw(self) -> Value {
        match self {
            Value::Reactive(proxy) => Value::Object(proxy.to_raw()),
            other => other,
        }
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

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(&**s),
            _ => None,
        }
    }

    /// The proxy, if this value was read through one.
    pub fn as_reactive(&self) -> Option<&Reactive> {
        match self {
            Value::Reactive(proxy) => Some(proxy),
            _ => None,
        }
    }

    /// Display form used when a value is rendered as text.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.to_string(),
            Value::Object(_) | Value::Reactive(_) => "[object]".to_string(),
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
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Object(o) => write!(f, "Object(#{})", o.id().raw()),
            Value::Reactive(p) => write!(f, "Reactive(#{})", p.id().raw()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value.into())
    }
}

impl From<Rc<Object>> for Value {
    fn from(value: Rc<Object>) -> Self {
        Value::Object(value)
    }
}

impl From<Reactive> for Value {
    fn from(value: Reactive) -> Self {
        Value::Reactive(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A plain structured object. This is the raw side of a [`Reactive`] proxy:
/// reads and writes made directly on an `Object` are never tracked.
pub struct Object {
    id: TargetId,
    fields: RefCell<IndexMap<Rc<str>, Value>>,
    frozen: Cell<bool>,
}

impl Object {
    /// Create an empty object.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            id: TargetId::new(),
            fields: RefCell::new(IndexMap::new()),
            frozen: Cell::new(false),
        })
    }

    /// Create an object from `(field, value)` pairs.
    pub fn from_fields<K, V, I>(fields: I) -> Rc<Self>
    where
        K: Into<Rc<str>>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let object = Self::new();
        {
            let mut map = object.fields.borrow_mut();
            for (key, value) in fields {
                map.insert(key.into(), value.into().into_raw());
            }
        }
        object
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    /// Read a field without tracking.
    pub fn get_raw(&self, key: &str) -> Option<Value> {
        self.fields.borrow().get(key).cloned()
    }

    /// Write a field without triggering. Returns the previous value.
    pub(crate) fn insert_raw(&self, key: Rc<str>, value: Value) -> Option<Value> {
        self.fields.borrow_mut().insert(key, value)
    }

    pub(crate) fn remove_raw(&self, key: &str) -> Option<Value> {
        self.fields.borrow_mut().shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.borrow().contains_key(key)
    }

    /// Field names in insertion order, without tracking.
    pub fn keys_raw(&self) -> Vec<Rc<str>> {
        self.fields.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.fields.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.borrow().is_empty()
    }

    /// Borrow the fields for inspection.
    pub fn fields(&self) -> CellRef<'_, IndexMap<Rc<str>, Value>> {
        self.fields.borrow()
    }

    /// Reject every later write through a proxy.
    pub fn freeze(&self) {
        self.frozen.set(true);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }
}

impl Drop for Object {
    fn drop(&mut self) {
        Runtime::forget_target(self.id);
        forget_proxies(self.id);
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        if let Ok(fields) = self.fields.try_borrow() {
            map.entries(fields.iter());
        }
        map.finish()
    }
}
