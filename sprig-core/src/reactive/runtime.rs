//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects tracked targets and
//! the computations that read them. It owns the dependency graph: a map from
//! `(target, key)` pairs to the set of subscribers interested in them.
//!
//! # How It Works
//!
//! 1. When an effect is created, it registers with the runtime.
//!
//! 2. When a tracked value is read while an effect is running, the runtime
//!    records the dependency (creating the entry on first use) and tells the
//!    effect about it so the effect can detach itself later.
//!
//! 3. When a tracked value changes, the runtime:
//!    a. Snapshots the entry's subscribers
//!    b. Notifies the units backing computed values first
//!    c. Then notifies plain effects
//!
//! Notifying computed units first means their dirty flags are already set
//! by the time an ordinary effect re-runs and reads them, so it never sees a
//! stale cached value for the same trigger.
//!
//! # Threading
//!
//! The graph is a thread-local singleton. Everything reactive is confined to
//! the thread that created it, which is why none of this needs a lock.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexSet;

use super::context::ReactiveContext;
use super::subscriber::{SubscriberId, TargetId};

/// The property of a target a dependency is recorded against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackKey {
    /// The single value held by a ref or computed.
    Value,
    /// The key set of an object (iteration, `keys`, additions, removals).
    Iterate,
    /// A named field of an object.
    Field(Rc<str>),
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKey::Value => f.write_str("<value>"),
            TrackKey::Iterate => f.write_str("<iterate>"),
            TrackKey::Field(name) => f.write_str(name),
        }
    }
}

/// Identity of one dependency entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DepKey {
    pub target: TargetId,
    pub key: TrackKey,
}

impl DepKey {
    pub fn new(target: TargetId, key: TrackKey) -> Self {
        Self { target, key }
    }
}

/// What kind of computation a subscriber is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    /// Backs a computed value. Notified in the first trigger pass.
    Derived,
    /// A plain effect, watcher or render effect. Notified in the second pass.
    Effect,
}

/// A computation the runtime can notify.
pub trait Subscriber {
    /// Get the subscriber ID.
    fn subscriber_id(&self) -> SubscriberId;

    /// Whether this subscriber backs a computed value.
    fn kind(&self) -> EffectKind;

    /// Remember that this subscriber was added to `dep`.
    fn record_dependency(&self, dep: DepKey);

    /// React to a change in one of the subscriber's dependencies.
    fn notify(&self);
}

/// Per-thread dependency graph.
#[derive(Default)]
struct Graph {
    /// Registered subscribers. Strong: a computation is only released by
    /// stopping it, never because nobody holds its handle.
    registry: HashMap<SubscriberId, Rc<dyn Subscriber>>,

    /// target -> key -> subscribers, in first-tracked order.
    targets: HashMap<TargetId, HashMap<TrackKey, IndexSet<SubscriberId>>>,
}

thread_local! {
    static GRAPH: RefCell<Graph> = RefCell::new(Graph::default());
}

/// The reactive runtime for the current thread.
pub struct Runtime;

impl Runtime {
    /// Register a subscriber so triggers can reach it.
    pub fn register(subscriber: Rc<dyn Subscriber>) {
        let id = subscriber.subscriber_id();
        GRAPH.with(|graph| graph.borrow_mut().registry.insert(id, subscriber));
    }

    /// Remove a subscriber from the registry and from the given entries.
    ///
    /// Returns the subscriber's registry slot so the caller controls when it
    /// is dropped (never while the graph is borrowed).
    pub fn unregister(id: SubscriberId, deps: &[DepKey]) -> Option<Rc<dyn Subscriber>> {
        Self::remove_dependencies(id, deps);
        GRAPH.with(|graph| graph.borrow_mut().registry.remove(&id))
    }

    /// Whether a subscriber is currently registered.
    pub fn is_registered(id: SubscriberId) -> bool {
        GRAPH.with(|graph| graph.borrow().registry.contains_key(&id))
    }

    /// Record that the running computation, if any, depends on
    /// `(target, key)`.
    pub fn track(target: TargetId, key: TrackKey) {
        let Some(subscriber_id) = ReactiveContext::current_subscriber() else {
            return;
        };

        let newly_tracked = GRAPH.with(|graph| {
            let mut graph = graph.borrow_mut();
            let subscriber = graph.registry.get(&subscriber_id).cloned()?;
            let inserted = graph
                .targets
                .entry(target)
                .or_default()
                .entry(key.clone())
                .or_default()
                .insert(subscriber_id);
            inserted.then_some(subscriber)
        });

        if let Some(subscriber) = newly_tracked {
            tracing::trace!(
                target: "sprig::reactive",
                target_id = target.raw(),
                %key,
                ?subscriber_id,
                "track"
            );
            subscriber.record_dependency(DepKey::new(target, key));
        }
    }

    /// Notify everything that depends on `(target, key)`.
    pub fn trigger(target: TargetId, key: &TrackKey) {
        let subscribers: Vec<Rc<dyn Subscriber>> = GRAPH.with(|graph| {
            let graph = graph.borrow();
            graph
                .targets
                .get(&target)
                .and_then(|keys| keys.get(key))
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| graph.registry.get(id).cloned())
                        .collect()
                })
                .unwrap_or_default()
        });

        if subscribers.is_empty() {
            return;
        }

        tracing::trace!(
            target: "sprig::reactive",
            target_id = target.raw(),
            %key,
            count = subscribers.len(),
            "trigger"
        );

        Self::notify_all(&subscribers);
    }

    /// Two-pass notification: derived units first, then plain effects.
    fn notify_all(subscribers: &[Rc<dyn Subscriber>]) {
        for pass in [EffectKind::Derived, EffectKind::Effect] {
            for subscriber in subscribers.iter().filter(|s| s.kind() == pass) {
                let id = subscriber.subscriber_id();
                // A computation never re-triggers itself while it runs.
                if ReactiveContext::is_running(id) {
                    continue;
                }
                // An earlier notification in this batch may have stopped it.
                if !Self::is_registered(id) {
                    tracing::debug!(target: "sprig::reactive", ?id, "skipping stopped subscriber");
                    continue;
                }
                subscriber.notify();
            }
        }
    }

    /// Detach a subscriber from the given entries.
    ///
    /// Empty entries are removed so the graph only holds live dependencies.
    pub fn remove_dependencies(id: SubscriberId, deps: &[DepKey]) {
        if deps.is_empty() {
            return;
        }
        GRAPH.with(|graph| {
            let mut graph = graph.borrow_mut();
            for dep in deps {
                let Some(keys) = graph.targets.get_mut(&dep.target) else {
                    continue;
                };
                if let Some(set) = keys.get_mut(&dep.key) {
                    set.shift_remove(&id);
                    if set.is_empty() {
                        keys.remove(&dep.key);
                    }
                }
                if keys.is_empty() {
                    graph.targets.remove(&dep.target);
                }
            }
        });
    }

    /// Drop every entry recorded against `target`.
    ///
    /// Called when a target is destroyed. Safe to call during thread teardown.
    pub fn forget_target(target: TargetId) {
        let _ = GRAPH.try_with(|graph| {
            if let Ok(mut graph) = graph.try_borrow_mut() {
                graph.targets.remove(&target);
            }
        });
    }

    /// Number of subscribers currently depending on `(target, key)`.
    pub fn dependent_count(target: TargetId, key: &TrackKey) -> usize {
        GRAPH.with(|graph| {
            graph
                .borrow()
                .targets
                .get(&target)
                .and_then(|keys| keys.get(key))
                .map_or(0, IndexSet::len)
        })
    }

    /// Number of live dependency entries across all targets.
    pub fn entry_count() -> usize {
        GRAPH.with(|graph| graph.borrow().targets.values().map(HashMap::len).sum())
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if we're inside a tracking context.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}
