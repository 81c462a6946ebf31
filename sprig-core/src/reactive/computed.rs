//! Computed Implementation
//!
//! A computed value is a cached derivation that re-evaluates only when one
//! of the values it read has changed, and only when someone asks for it.
//!
//! # How Computed Values Work
//!
//! 1. The computed starts dirty. On first access it runs its getter inside
//!    its own effect (so the getter's reads are tracked) and caches the
//!    result.
//!
//! 2. When a dependency changes, the runtime notifies the computed's effect
//!    in the first trigger pass. Instead of recomputing, its scheduler marks
//!    the computed dirty and, if it was clean, triggers the computed's own
//!    dependents.
//!
//! 3. The next access sees the dirty flag, clears it, and recomputes.
//!
//! A computed that is never read after a change never recomputes.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::effect::ReactiveEffect;
use super::runtime::{EffectKind, Runtime, TrackKey};
use super::subscriber::TargetId;
use crate::error::{Result, SprigError};

struct ComputedInner<T: 'static> {
    id: TargetId,
    getter: Box<dyn Fn() -> T>,
    value: RefCell<Option<T>>,
    dirty: Cell<bool>,
    effect: ReactiveEffect,
}

impl<T: 'static> ComputedInner<T> {
    fn recompute(&self) {
        let value = (self.getter)();
        *self.value.borrow_mut() = Some(value);
    }

    fn invalidate(&self) {
        if !self.dirty.replace(true) {
            Runtime::trigger(self.id, &TrackKey::Value);
        }
    }
}

impl<T: 'static> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        self.effect.stop();
        Runtime::forget_target(self.id);
    }
}

/// A cached derived value.
///
/// Cloning shares the cache.
///
/// # Example
///
/// ```rust,ignore
/// let count = Ref::new(2);
///
/// let c = count.clone();
/// let doubled = Computed::new(move || c.get() * 2);
/// assert_eq!(doubled.get(), 4);
///
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Computed<T: 'static> {
    inner: Rc<ComputedInner<T>>,
}

impl<T: Clone + 'static> Computed<T> {
    /// Create a computed value. The getter does not run until first access.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let inner = Rc::new_cyclic(|weak: &Weak<ComputedInner<T>>| {
            let body = weak.clone();
            let scheduler = weak.clone();
            let effect = ReactiveEffect::new_cyclic(EffectKind::Derived, move |_| {
                let run: Box<dyn Fn()> = Box::new(move || {
                    if let Some(inner) = body.upgrade() {
                        inner.recompute();
                    }
                });
                let schedule: Rc<dyn Fn()> = Rc::new(move || {
                    if let Some(inner) = scheduler.upgrade() {
                        inner.invalidate();
                    }
                });
                (run, Some(schedule))
            });

            ComputedInner {
                id: TargetId::new(),
                getter: Box::new(getter),
                value: RefCell::new(None),
                dirty: Cell::new(true),
                effect,
            }
        });
        Self { inner }
    }

    /// Get the target ID dependents track this computed under.
    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    /// Read the value, recomputing it first if it is dirty.
    ///
    /// Fails with [`SprigError::ComputedCycle`] if the getter reads this
    /// computed before a first value exists.
    pub fn try_get(&self) -> Result<T> {
        Runtime::track(self.inner.id, TrackKey::Value);
        if self.inner.dirty.replace(false) {
            self.inner.effect.run();
        }
        self.inner
            .value
            .borrow()
            .clone()
            .ok_or(SprigError::ComputedCycle)
    }

    /// Read the value, recomputing it first if it is dirty.
    ///
    /// # Panics
    ///
    /// Panics on a cyclic first read; see [`Computed::try_get`].
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Whether the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Whether a value has been computed yet.
    pub fn has_value(&self) -> bool {
        self.inner.value.borrow().is_some()
    }

    /// Number of computations that currently depend on this computed.
    pub fn dependent_count(&self) -> usize {
        Runtime::dependent_count(self.inner.id, &TrackKey::Value)
    }

    /// Number of times the getter has run.
    pub fn compute_count(&self) -> usize {
        self.inner.effect.run_count()
    }
}

impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Computed");
        s.field("id", &self.inner.id);
        s.field("dirty", &self.inner.dirty.get());
        if let Ok(value) = self.inner.value.try_borrow() {
            s.field("value", &*value);
        }
        s.finish()
    }
}

/// Create a computed value.
pub fn computed<T, F>(getter: F) -> Computed<T>
where
    T: Clone + 'static,
    F: Fn() -> T + 'static,
{
    Computed::new(getter)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Effect, Ref};

    #[test]
    fn computed_computes_on_first_access() {
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let value = Computed::new(move || {
            c.set(c.get() + 1);
            42
        });

        assert_eq!(calls.get(), 0);
        assert!(value.is_dirty());
        assert!(!value.has_value());

        assert_eq!(value.get(), 42);
        assert_eq!(calls.get(), 1);
        assert!(!value.is_dirty());
    }

    #[test]
    fn computed_caches_value_when_clean() {
        let count = Ref::new(1);
        let c = count.clone();
        let doubled = Computed::new(move || c.get() * 2);

        assert_eq!(doubled.get(), 2);
        assert_eq!(doubled.get(), 2);
        assert_eq!(doubled.compute_count(), 1);
    }

    #[test]
    fn computed_is_lazy_after_a_change() {
        let count = Ref::new(1);
        let c = count.clone();
        let doubled = Computed::new(move || c.get() * 2);
        doubled.get();

        count.set(2);
        count.set(3);
        assert!(doubled.is_dirty());
        assert_eq!(doubled.compute_count(), 1);

        assert_eq!(doubled.get(), 6);
        assert_eq!(doubled.compute_count(), 2);
    }

    #[test]
    fn effect_sees_fresh_computed_value() {
        let count = Ref::new(1);
        let c = count.clone();
        let doubled = Computed::new(move || c.get() * 2);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let (d, c, s) = (doubled.clone(), count.clone(), seen.clone());
        // Reads the ref before the computed, so the effect is subscribed to
        // the ref first. The computed must still be invalidated before the
        // effect re-runs.
        let _effect = Effect::new(move || {
            let raw = c.get();
            s.borrow_mut().push((raw, d.get()));
        });

        count.set(5);
        let seen = seen.borrow();
        assert!(seen.iter().all(|&(raw, doubled)| doubled == raw * 2), "stale read: {seen:?}");
        assert_eq!(seen.last(), Some(&(5, 10)));
    }

    #[test]
    fn chained_computed_values() {
        let count = Ref::new(1);
        let c = count.clone();
        let plus_one = Computed::new(move || c.get() + 1);
        let p = plus_one.clone();
        let times_ten = Computed::new(move || p.get() * 10);

        assert_eq!(times_ten.get(), 20);
        count.set(4);
        assert_eq!(times_ten.get(), 50);
    }

    #[test]
    fn dependents_are_notified_once_per_invalidation() {
        let count = Ref::new(0);
        let c = count.clone();
        let parity = Computed::new(move || c.get() % 2);

        let runs = Rc::new(Cell::new(0));
        let (p, r) = (parity.clone(), runs.clone());
        let _effect = Effect::new(move || {
            p.get();
            r.set(r.get() + 1);
        });
        assert_eq!(parity.dependent_count(), 1);

        count.set(1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn self_referencing_getter_is_a_cycle() {
        let slot: Rc<RefCell<Option<Computed<i32>>>> = Rc::new(RefCell::new(None));
        let s = slot.clone();
        let looped = Computed::new(move || {
            let me = s.borrow().clone();
            me.map_or(Ok(0), |c| c.try_get()).unwrap_or(-1)
        });
        *slot.borrow_mut() = Some(looped.clone());

        assert_eq!(looped.get(), -1);
        slot.borrow_mut().take();
    }

    #[test]
    fn dropping_the_last_handle_stops_tracking() {
        let count = Ref::new(0);
        let c = count.clone();
        let doubled = Computed::new(move || c.get() * 2);
        doubled.get();
        assert_eq!(count.subscriber_count(), 1);

        drop(doubled);
        assert_eq!(count.subscriber_count(), 0);
    }
}
