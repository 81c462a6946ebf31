//! Reactive Proxies
//!
//! A [`Reactive`] is an accessor over an [`Object`] that routes every read
//! through [`Runtime::track`] and every write through [`Runtime::trigger`].
//! It is the explicit stand-in for transparent property interception.
//!
//! # Identity
//!
//! Each object has at most one deep proxy and one shallow proxy. A per-thread
//! memo table maps the object's [`TargetId`] to a weak reference to its
//! proxy, so observing the same object twice returns the same proxy and the
//! table never keeps a proxy (or its object) alive.
//!
//! # Laziness
//!
//! Nested objects are not wrapped up front. A deep proxy wraps a nested
//! object when it is read, so work stays proportional to the data actually
//! reached.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::runtime::{Runtime, TrackKey};
use super::subscriber::TargetId;
use super::value::{Object, Value};
use crate::error::{Result, SprigError};

struct ProxyInner {
    target: Rc<Object>,
    shallow: bool,
}

thread_local! {
    static PROXY_MAP: RefCell<HashMap<(TargetId, bool), Weak<ProxyInner>>> =
        RefCell::new(HashMap::new());
}

fn create_reactive_object(target: &Rc<Object>, shallow: bool) -> Reactive {
    let slot = (target.id(), shallow);

    let existing = PROXY_MAP.with(|map| map.borrow().get(&slot).and_then(Weak::upgrade));
    if let Some(inner) = existing {
        return Reactive { inner };
    }

    let inner = Rc::new(ProxyInner {
        target: target.clone(),
        shallow,
    });
    PROXY_MAP.with(|map| map.borrow_mut().insert(slot, Rc::downgrade(&inner)));
    Reactive { inner }
}

/// Remove memo entries for a destroyed object.
pub(crate) fn forget_proxies(id: TargetId) {
    let _ = PROXY_MAP.try_with(|map| {
        if let Ok(mut map) = map.try_borrow_mut() {
            map.remove(&(id, false));
            map.remove(&(id, true));
        }
    });
}

/// Observe `target` deeply.
pub fn reactive(target: &Rc<Object>) -> Reactive {
    create_reactive_object(target, false)
}

/// Observe only the top-level fields of `target`; nested objects are
/// returned raw.
pub fn shallow_reactive(target: &Rc<Object>) -> Reactive {
    create_reactive_object(target, true)
}

/// Wrap an object value in its proxy; anything else is returned unchanged.
/// Already-wrapped values are returned as they are.
pub fn to_reactive(value: Value) -> Value {
    match value {
        Value::Object(object) => Value::Reactive(reactive(&object)),
        other => other,
    }
}

/// Whether `value` was read through (or is) a proxy.
pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Reactive(_))
}

/// Number of live memo entries. Dead weak entries are pruned first.
pub fn proxy_count() -> usize {
    PROXY_MAP.with(|map| {
        let mut map = map.borrow_mut();
        map.retain(|_, weak| weak.strong_count() > 0);
        map.len()
    })
}

/// Tracked accessor over an [`Object`].
///
/// # Example
///
/// ```rust,ignore
/// let state = reactive(&Object::from_fields([("count", 0)]));
///
/// let s = state.clone();
/// Effect::new(move || println!("{:?}", s.get("count")));
///
/// state.set("count", 1)?; // effect re-runs
/// ```
#[derive(Clone)]
pub struct Reactive {
    inner: Rc<ProxyInner>,
}

impl Reactive {
    /// The tracked object's ID.
    pub fn id(&self) -> TargetId {
        self.inner.target.id()
    }

    /// The underlying raw object.
    pub fn to_raw(&self) -> Rc<Object> {
        self.inner.target.clone()
    }

    pub fn is_shallow(&self) -> bool {
        self.inner.shallow
    }

    /// Whether two handles are the same proxy.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read a field, tracking the read. Nested objects come back wrapped
    /// (unless this proxy is shallow).
    pub fn get(&self, key: &str) -> Option<Value> {
        Runtime::track(self.id(), TrackKey::Field(key.into()));
        let value = self.inner.target.get_raw(key)?;
        if self.inner.shallow {
            return Some(value);
        }
        Some(to_reactive(value))
    }

    /// Read a field, treating a missing field as [`Value::Null`].
    pub fn get_or_null(&self, key: &str) -> Value {
        self.get(key).unwrap_or(Value::Null)
    }

    /// Whether the field exists. Tracks the field.
    pub fn has(&self, key: &str) -> bool {
        Runtime::track(self.id(), TrackKey::Field(key.into()));
        self.inner.target.contains_key(key)
    }

    /// Field names, tracking the key set.
    pub fn keys(&self) -> Vec<Rc<str>> {
        Runtime::track(self.id(), TrackKey::Iterate);
        self.inner.target.keys_raw()
    }

    /// Number of fields, tracking the key set.
    pub fn len(&self) -> usize {
        Runtime::track(self.id(), TrackKey::Iterate);
        self.inner.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write a field and notify dependents.
    ///
    /// Writing a value identical to the stored one notifies nobody. Writing
    /// to a frozen object fails and notifies nobody.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let target = &self.inner.target;
        if target.is_frozen() {
            return Err(SprigError::FrozenTarget { key: key.to_string() });
        }

        let value = value.into().into_raw();
        let had_key = target.contains_key(key);
        if had_key
            && target
                .get_raw(key)
                .is_some_and(|old| old.same_value(&value))
        {
            return Ok(());
        }

        let key: Rc<str> = key.into();
        let previous = target.insert_raw(key.clone(), value);
        Runtime::trigger(self.id(), &TrackKey::Field(key));
        if !had_key {
            Runtime::trigger(self.id(), &TrackKey::Iterate);
        }
        drop(previous);
        Ok(())
    }

    /// Remove a field and notify dependents. Returns the removed raw value.
    pub fn remove(&self, key: &str) -> Result<Option<Value>> {
        let target = &self.inner.target;
        if target.is_frozen() {
            return Err(SprigError::FrozenTarget { key: key.to_string() });
        }

        let removed = target.remove_raw(key);
        if removed.is_some() {
            Runtime::trigger(self.id(), &TrackKey::Field(key.into()));
            Runtime::trigger(self.id(), &TrackKey::Iterate);
        }
        Ok(removed)
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("id", &self.id())
            .field("shallow", &self.inner.shallow)
            .field("target", &self.inner.target)
            .finish()
    }
}
