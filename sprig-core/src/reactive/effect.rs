//! Effect Implementation
//!
//! An effect is a re-runnable computation that runs again whenever one of
//! the values it read changes.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its body immediately (unless it is lazy)
//!    to establish its initial dependencies.
//!
//! 2. When any dependency changes, the effect either re-runs synchronously
//!    or, if it was given a scheduler, hands the re-run to that scheduler.
//!
//! 3. Before re-running, the effect detaches from every entry it was
//!    registered in, then re-tracks whatever the body reads this time. A
//!    branch that is no longer taken stops being a dependency.
//!
//! # Lifetime
//!
//! The runtime holds every live effect. Dropping the handle does not stop
//! it; [`ReactiveEffect::stop`] does. A stopped effect can still be run by
//! hand, it simply no longer tracks anything.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::runtime::{DepKey, EffectKind, Runtime, Subscriber};
use super::subscriber::SubscriberId;

/// Callback that takes over re-running an effect when its dependencies change.
pub type EffectScheduler = Rc<dyn Fn()>;

/// Options accepted by [`effect`].
#[derive(Clone, Default)]
pub struct EffectOptions {
    /// Don't run the body on creation.
    pub lazy: bool,

    /// Called instead of re-running the body when a dependency changes.
    pub scheduler: Option<EffectScheduler>,
}

impl EffectOptions {
    pub fn lazy() -> Self {
        Self {
            lazy: true,
            scheduler: None,
        }
    }

    pub fn with_scheduler(scheduler: impl Fn() + 'static) -> Self {
        Self {
            lazy: false,
            scheduler: Some(Rc::new(scheduler)),
        }
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("lazy", &self.lazy)
            .field("scheduler", &self.scheduler.is_some())
            .finish()
    }
}

struct EffectInner {
    id: SubscriberId,
    kind: EffectKind,
    body: Box<dyn Fn()>,
    scheduler: Option<EffectScheduler>,
    active: Cell<bool>,
    dependencies: RefCell<SmallVec<[DepKey; 4]>>,
    run_count: Cell<usize>,
}

impl EffectInner {
    fn run_with<R>(&self, f: impl FnOnce() -> R) -> R {
        if !self.active.get() {
            return f();
        }

        self.cleanup();
        let _ctx = ReactiveContext::enter(self.id);
        let result = f();
        self.run_count.set(self.run_count.get() + 1);
        result
    }

    fn cleanup(&self) {
        let deps = std::mem::take(&mut *self.dependencies.borrow_mut());
        Runtime::remove_dependencies(self.id, &deps);
    }
}

impl Subscriber for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    fn kind(&self) -> EffectKind {
        self.kind
    }

    fn record_dependency(&self, dep: DepKey) {
        self.dependencies.borrow_mut().push(dep);
    }

    fn notify(&self) {
        match &self.scheduler {
            Some(scheduler) => scheduler(),
            None => self.run_with(|| (self.body)()),
        }
    }
}

/// Handle to an effect registered with the runtime.
///
/// Cloning shares the same underlying effect.
#[derive(Clone)]
pub struct ReactiveEffect {
    inner: Rc<EffectInner>,
}

/// Non-owning handle to a [`ReactiveEffect`].
#[derive(Clone)]
pub struct WeakEffect {
    inner: Weak<EffectInner>,
}

impl WeakEffect {
    pub fn upgrade(&self) -> Option<ReactiveEffect> {
        self.inner.upgrade().map(|inner| ReactiveEffect { inner })
    }
}

impl ReactiveEffect {
    /// Create and register a plain effect. The body is not run.
    pub fn new(body: impl Fn() + 'static, scheduler: Option<EffectScheduler>) -> Self {
        Self::new_cyclic(EffectKind::Effect, move |_| {
            (Box::new(body) as Box<dyn Fn()>, scheduler)
        })
    }

    /// Create and register an effect whose body or scheduler needs a handle
    /// back to the effect itself (watch jobs, render effects).
    pub fn new_cyclic<F>(kind: EffectKind, build: F) -> Self
    where
        F: FnOnce(&WeakEffect) -> (Box<dyn Fn()>, Option<EffectScheduler>),
    {
        let inner = Rc::new_cyclic(|weak: &Weak<EffectInner>| {
            let (body, scheduler) = build(&WeakEffect {
                inner: weak.clone(),
            });
            EffectInner {
                id: SubscriberId::new(),
                kind,
                body,
                scheduler,
                active: Cell::new(true),
                dependencies: RefCell::new(SmallVec::new()),
                run_count: Cell::new(0),
            }
        });
        Runtime::register(inner.clone());
        Self { inner }
    }

    /// Get the subscriber ID for this effect.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.id
    }

    pub fn kind(&self) -> EffectKind {
        self.inner.kind
    }

    /// Run the body inside this effect's tracking context.
    pub fn run(&self) {
        self.inner.run_with(|| (self.inner.body)());
    }

    /// Run `f` as if it were this effect's body and return its result.
    pub fn run_with<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.run_with(f)
    }

    /// Detach from every dependency entry and leave the runtime.
    ///
    /// Idempotent.
    pub fn stop(&self) {
        if !self.inner.active.replace(false) {
            return;
        }
        let deps = std::mem::take(&mut *self.inner.dependencies.borrow_mut());
        let slot = Runtime::unregister(self.inner.id, &deps);
        tracing::trace!(target: "sprig::reactive", id = ?self.inner.id, "effect stopped");
        drop(slot);
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Number of tracked runs so far.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Number of dependency entries this effect is registered in.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.borrow().len()
    }

    pub fn downgrade(&self) -> WeakEffect {
        WeakEffect {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ReactiveEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveEffect")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("active", &self.is_active())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .finish()
    }
}

/// A side-effecting computation that re-runs when its dependencies change.
///
/// # Example
///
/// ```rust,ignore
/// let count = Ref::new(0);
///
/// let c = count.clone();
/// let runner = Effect::new(move || println!("count is {}", c.get()));
///
/// count.set(5); // prints "count is 5"
/// runner.stop();
/// ```
pub struct Effect<T: 'static = ()> {
    raw: ReactiveEffect,
    body: Rc<RefCell<dyn FnMut() -> T>>,
}

impl<T: 'static> Effect<T> {
    /// Create an effect and run it immediately.
    pub fn new<F>(body: F) -> Self
    where
        F: FnMut() -> T + 'static,
    {
        Self::with_options(body, EffectOptions::default())
    }

    /// Create an effect without running it.
    pub fn new_lazy<F>(body: F) -> Self
    where
        F: FnMut() -> T + 'static,
    {
        Self::with_options(body, EffectOptions::lazy())
    }

    pub fn with_options<F>(body: F, options: EffectOptions) -> Self
    where
        F: FnMut() -> T + 'static,
    {
        let body: Rc<RefCell<dyn FnMut() -> T>> = Rc::new(RefCell::new(body));
        let erased = body.clone();
        let raw = ReactiveEffect::new(
            move || {
                (&mut *erased.borrow_mut())();
            },
            options.scheduler,
        );
        let effect = Self { raw, body };
        if !options.lazy {
            effect.run();
        }
        effect
    }

    /// Run the body now, tracking its reads, and return its result.
    pub fn run(&self) -> T {
        self.raw.run_with(|| (&mut *self.body.borrow_mut())())
    }

    pub fn stop(&self) {
        self.raw.stop();
    }

    pub fn is_active(&self) -> bool {
        self.raw.is_active()
    }

    pub fn run_count(&self) -> usize {
        self.raw.run_count()
    }

    pub fn dependency_count(&self) -> usize {
        self.raw.dependency_count()
    }

    /// The untyped effect behind this handle.
    pub fn raw(&self) -> &ReactiveEffect {
        &self.raw
    }
}

impl<T: 'static> Clone for Effect<T> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            body: Rc::clone(&self.body),
        }
    }
}

impl<T: 'static> fmt::Debug for Effect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Effect").field(&self.raw).finish()
    }
}

/// Create an effect with the given options.
pub fn effect<T, F>(body: F, options: EffectOptions) -> Effect<T>
where
    T: 'static,
    F: FnMut() -> T + 'static,
{
    Effect::with_options(body, options)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Ref;

    #[test]
    fn effect_runs_on_creation() {
        let runs = Rc::new(Cell::new(0));
        let r = runs.clone();

        let _effect = Effect::new(move || r.set(r.get() + 1));

        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn effect_lazy_does_not_run_on_creation() {
        let runs = Rc::new(Cell::new(0));
        let r = runs.clone();

        let effect = Effect::new_lazy(move || r.set(r.get() + 1));

        assert_eq!(runs.get(), 0);
        assert_eq!(effect.run_count(), 0);

        effect.run();
        assert_eq!(runs.get(), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn run_returns_the_body_result() {
        let count = Ref::new(20);
        let c = count.clone();
        let effect = Effect::new_lazy(move || c.get() + 1);

        assert_eq!(effect.run(), 21);
    }

    #[test]
    fn effect_reruns_when_dependency_changes() {
        let count = Ref::new(0);
        let seen = Rc::new(Cell::new(-1));

        let (c, s) = (count.clone(), seen.clone());
        let effect = Effect::new(move || s.set(c.get()));
        assert_eq!(seen.get(), 0);

        count.set(7);
        assert_eq!(seen.get(), 7);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn scheduler_replaces_the_rerun() {
        let count = Ref::new(0);
        let scheduled = Rc::new(Cell::new(0));
        let runs = Rc::new(Cell::new(0));

        let s = scheduled.clone();
        let (c, r) = (count.clone(), runs.clone());
        let effect = Effect::with_options(
            move || {
                c.get();
                r.set(r.get() + 1);
            },
            EffectOptions::with_scheduler(move || s.set(s.get() + 1)),
        );
        assert_eq!(runs.get(), 1);

        count.set(1);
        assert_eq!(scheduled.get(), 1);
        assert_eq!(runs.get(), 1);

        effect.run();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn stopped_effect_no_longer_tracks() {
        let count = Ref::new(0);
        let runs = Rc::new(Cell::new(0));

        let (c, r) = (count.clone(), runs.clone());
        let effect = Effect::new(move || {
            c.get();
            r.set(r.get() + 1);
        });
        assert_eq!(count.subscriber_count(), 1);

        effect.stop();
        assert!(!effect.is_active());
        assert_eq!(count.subscriber_count(), 0);

        count.set(1);
        assert_eq!(runs.get(), 1);

        // Manual runs still execute the body, untracked.
        effect.run();
        assert_eq!(runs.get(), 2);
        assert_eq!(count.subscriber_count(), 0);
    }

    #[test]
    fn dependencies_are_retracked_each_run() {
        let flag = Ref::new(true);
        let a = Ref::new(1);
        let b = Ref::new(2);
        let runs = Rc::new(Cell::new(0));

        let (f, a2, b2, r) = (flag.clone(), a.clone(), b.clone(), runs.clone());
        let _effect = Effect::new(move || {
            r.set(r.get() + 1);
            if f.get() {
                a2.get()
            } else {
                b2.get()
            }
        });
        assert_eq!(a.subscriber_count(), 1);
        assert_eq!(b.subscriber_count(), 0);

        flag.set(false);
        assert_eq!(a.subscriber_count(), 0);
        assert_eq!(b.subscriber_count(), 1);

        a.set(10);
        assert_eq!(runs.get(), 2);
        b.set(20);
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn effect_writing_its_own_dependency_does_not_loop() {
        let count = Ref::new(0);
        let c = count.clone();
        let effect = Effect::new(move || {
            let next = c.get() + 1;
            c.set(next);
        });

        assert_eq!(count.get_untracked(), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_clone_shares_state() {
        let effect1 = Effect::new(|| {});
        let effect2 = effect1.clone();

        assert_eq!(effect1.run_count(), 1);
        effect1.run();
        assert_eq!(effect2.run_count(), 2);

        effect1.stop();
        assert!(!effect2.is_active());
    }
}
