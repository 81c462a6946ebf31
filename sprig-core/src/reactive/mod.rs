//! Reactive Primitives
//!
//! This module implements the dependency-tracking engine: refs, reactive
//! objects, effects, computed values and watchers.
//!
//! # Concepts
//!
//! ## Targets
//!
//! Anything that can be read under tracking is a target: a [`Ref`], an
//! [`Object`] observed through a [`Reactive`] proxy, or a [`Computed`].
//! A dependency entry is a `(target, key)` pair; objects have one entry per
//! field plus one for their key set.
//!
//! ## Effects
//!
//! An [`Effect`] is a computation that re-runs whenever an entry it read is
//! triggered. An effect created with a scheduler hands the re-run to the
//! scheduler instead; watchers and component renders use that to batch work
//! through [`crate::scheduler`].
//!
//! ## Computed Values
//!
//! A [`Computed`] caches the result of its getter. A change marks it dirty
//! and notifies its own dependents; the getter only runs again on the next
//! read.
//!
//! # Implementation Notes
//!
//! The graph and the tracking context are thread-local. A read checks
//! whether a computation is running and, if so, records the dependency in
//! both directions: the graph learns the subscriber, and the subscriber
//! learns the entry so it can detach before its next run.

mod computed;
mod context;
mod effect;
mod proxy;
mod refs;
mod runtime;
mod subscriber;
mod value;
mod watch;

pub use computed::{computed, Computed};
pub use context::{untracked, ReactiveContext};
pub use effect::{effect, Effect, EffectOptions, EffectScheduler, ReactiveEffect, WeakEffect};
pub use proxy::{is_reactive, proxy_count, reactive, shallow_reactive, to_reactive, Reactive};
pub use refs::{ref_value, Ref};
pub use runtime::{DepKey, EffectKind, Runtime, Subscriber, TrackKey};
pub use subscriber::{SubscriberId, TargetId};
pub use value::{Object, Value};
pub use watch::{traverse, watch, watch_reactive, WatchHandle, WatchOptions};
