//! Ref Implementation
//!
//! A ref is a single tracked value. It is the smallest reactive target:
//! one dependency entry (`TrackKey::Value`) shared by everything that reads
//! it.
//!
//! # How Refs Work
//!
//! 1. `get()` records the running computation as a dependent, then returns
//!    a clone of the value.
//!
//! 2. `set()` compares the new value with the current one. Only an actual
//!    change is stored and triggered; writing the same value is silent.
//!
//! 3. `get_untracked()` reads without creating a dependency.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::runtime::{Runtime, TrackKey};
use super::subscriber::TargetId;

struct RefInner<T> {
    id: TargetId,
    value: RefCell<T>,
}

impl<T> Drop for RefInner<T> {
    fn drop(&mut self) {
        Runtime::forget_target(self.id);
    }
}

/// A reactive value container.
///
/// Cloning a `Ref` shares the same underlying value.
///
/// # Example
///
/// ```rust,ignore
/// let count = Ref::new(0);
/// assert_eq!(count.get(), 0);
///
/// count.set(5);
/// assert_eq!(count.get(), 5);
///
/// count.update(|n| *n += 1);
/// assert_eq!(count.get(), 6);
/// ```
pub struct Ref<T: 'static> {
    inner: Rc<RefInner<T>>,
}

impl<T: Clone + PartialEq + 'static> Ref<T> {
    /// Create a new ref with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefInner {
                id: TargetId::new(),
                value: RefCell::new(value),
            }),
        }
    }

    /// Get the target ID for this ref.
    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    /// Get the current value, tracking the read.
    pub fn get(&self) -> T {
        Runtime::track(self.inner.id, TrackKey::Value);
        self.inner.value.borrow().clone()
    }

    /// Get the current value without creating a dependency.
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the value, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        Runtime::track(self.inner.id, TrackKey::Value);
        f(&*self.inner.value.borrow())
    }

    /// Set a new value. Dependents are notified only if it differs from the
    /// current one.
    pub fn set(&self, value: T) {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return;
            }
            *current = value;
        }
        Runtime::trigger(self.inner.id, &TrackKey::Value);
    }

    /// Update the value in place. Dependents are notified only if the
    /// update changed it.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let changed = {
            let mut current = self.inner.value.borrow_mut();
            let before = current.clone();
            f(&mut *current);
            *current != before
        };
        if changed {
            Runtime::trigger(self.inner.id, &TrackKey::Value);
        }
    }

    /// Number of computations that currently depend on this ref.
    pub fn subscriber_count(&self) -> usize {
        Runtime::dependent_count(self.inner.id, &TrackKey::Value)
    }
}

impl<T: 'static> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Ref");
        s.field("id", &self.inner.id);
        match self.inner.value.try_borrow() {
            Ok(value) => s.field("value", &*value),
            Err(_) => s.field("value", &"<borrowed>"),
        };
        s.finish()
    }
}

/// Create a new ref.
pub fn ref_value<T: Clone + PartialEq + 'static>(value: T) -> Ref<T> {
    Ref::new(value)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
