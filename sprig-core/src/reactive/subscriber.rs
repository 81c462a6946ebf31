//! Identifier types for the reactive system.
//!
//! A subscriber is any computation that depends on reactive values: plain
//! effects, the units backing computed values, watchers and component render
//! effects. A target is anything that can be depended on: a tracked object,
//! a ref, or a computed value.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a subscriber.
///
/// Each subscriber gets a unique ID when created. This ID is what dependency
/// entries store, so an entry never keeps a computation alive on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a tracked target.
///
/// Dependency entries are keyed by `(TargetId, TrackKey)`. Using a stable ID
/// instead of the target's address keeps the graph independent of where the
/// target lives and lets the graph drop a target's entries when it goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    /// Generate a new unique target ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}
