//! Watchers
//!
//! A watcher runs a getter under tracking and calls a callback with the new
//! and previous result whenever a change to something the getter read is
//! flushed. Unlike a plain effect, a watcher never re-runs in place: its
//! effect's scheduler enqueues the watcher's job on the batching scheduler,
//! so a burst of writes costs one callback.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use super::effect::ReactiveEffect;
use super::proxy::Reactive;
use super::runtime::EffectKind;
use super::subscriber::TargetId;
use super::value::Value;
use crate::scheduler::{queue_job, Job};

/// Options accepted by [`watch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Call the callback right away with no previous value.
    pub immediate: bool,

    /// Call the callback on every flushed change, even if the getter's
    /// result compares equal to the previous one. Use with a getter that
    /// [`traverse`]s nested data.
    pub deep: bool,
}

impl WatchOptions {
    pub fn immediate() -> Self {
        Self {
            immediate: true,
            deep: false,
        }
    }

    pub fn deep() -> Self {
        Self {
            immediate: false,
            deep: true,
        }
    }
}

/// Handle returned by [`watch`].
#[derive(Clone)]
pub struct WatchHandle {
    effect: ReactiveEffect,
}

impl WatchHandle {
    /// Stop watching. A job already queued does nothing when it runs.
    pub fn stop(&self) {
        self.effect.stop();
    }

    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }

    /// The effect tracking the getter.
    pub fn effect(&self) -> &ReactiveEffect {
        &self.effect
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WatchHandle").field(&self.effect).finish()
    }
}

struct WatchState<T, C> {
    previous: Option<T>,
    callback: C,
}

/// Watch the result of `getter`.
///
/// `callback` receives the new value and the previous one (`None` on an
/// immediate first call). Unless `options.deep` is set it only fires when
/// the result changed.
///
/// # Example
///
/// ```rust,ignore
/// let count = Ref::new(0);
/// let c = count.clone();
/// let handle = watch(
///     move || c.get(),
///     |new, old| println!("{old:?} -> {new}"),
///     WatchOptions::default(),
/// );
///
/// count.set(1);
/// flush_jobs(); // prints "Some(0) -> 1"
/// ```
pub fn watch<T, G, C>(getter: G, callback: C, options: WatchOptions) -> WatchHandle
where
    T: Clone + PartialEq + 'static,
    G: Fn() -> T + 'static,
    C: FnMut(&T, Option<&T>) + 'static,
{
    let getter: Rc<dyn Fn() -> T> = Rc::new(getter);
    let state = Rc::new(RefCell::new(WatchState {
        previous: None,
        callback,
    }));
    let force = options.deep;

    let mut job_slot: Option<Job> = None;
    let body_getter = getter.clone();
    let effect = ReactiveEffect::new_cyclic(EffectKind::Effect, |weak| {
        let weak = weak.clone();
        let job_getter = getter.clone();
        let job_state = state.clone();
        let job: Job = Rc::new(move || {
            let Some(effect) = weak.upgrade() else {
                return;
            };
            if !effect.is_active() {
                return;
            }
            let next = effect.run_with(|| job_getter());
            let mut state = job_state.borrow_mut();
            let changed = force || state.previous.as_ref() != Some(&next);
            if changed {
                let WatchState { previous, callback } = &mut *state;
                callback(&next, previous.as_ref());
                *previous = Some(next);
            }
        });
        job_slot = Some(job.clone());

        let body: Box<dyn Fn()> = Box::new(move || {
            body_getter();
        });
        let scheduler: Rc<dyn Fn()> = Rc::new(move || queue_job(job.clone()));
        (body, Some(scheduler))
    });

    match job_slot {
        Some(job) if options.immediate => job(),
        _ => {
            let initial = effect.run_with(|| getter());
            state.borrow_mut().previous = Some(initial);
        }
    }

    WatchHandle { effect }
}

/// Watch every field reachable from `source`, at any depth.
///
/// The callback fires on each flushed change anywhere in the tree.
pub fn watch_reactive<C>(source: &Reactive, mut callback: C, options: WatchOptions) -> WatchHandle
where
    C: FnMut(&Reactive) + 'static,
{
    let root = source.clone();
    let reported = source.clone();
    watch(
        move || {
            let value = Value::Reactive(root.clone());
            traverse(&value);
            value
        },
        move |_, _| callback(&reported),
        WatchOptions {
            immediate: options.immediate,
            deep: true,
        },
    )
}

/// Read every field reachable from `value` through proxies so that the
/// running computation depends on all of them.
pub fn traverse(value: &Value) {
    let mut seen = HashSet::new();
    traverse_inner(value, &mut seen);
}

fn traverse_inner(value: &Value, seen: &mut HashSet<TargetId>) {
    let Value::Reactive(proxy) = value else {
        return;
    };
    if !seen.insert(proxy.id()) {
        return;
    }
    for key in proxy.keys() {
        if let Some(field) = proxy.get(&key) {
            traverse_inner(&field, seen);
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
