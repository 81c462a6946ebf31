//! Runtime Configuration
//!
//! Per-thread knobs for the reactive runtime. The defaults match what a host
//! event loop that drives flushing by hand expects; hosts built on a tokio
//! `LocalSet` can switch the flush strategy to [`FlushStrategy::LocalTask`].
//!
//! ```rust,ignore
//! let config = RuntimeConfig::from_json(r#"{ "flush": "local_task" }"#)?;
//! sprig_core::configure(config);
//! ```

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How a requested flush is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushStrategy {
    /// The host loop calls [`flush_jobs`](crate::scheduler::flush_jobs) after
    /// each turn (or awaits [`next_tick`](crate::scheduler::next_tick)).
    #[default]
    Manual,

    /// The flush is spawned with `tokio::task::spawn_local`. Must be used from
    /// inside a `tokio::task::LocalSet`.
    LocalTask,
}

/// Configuration for the reactive runtime on the current thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How deferred flushes are driven.
    pub flush: FlushStrategy,

    /// Upper bound on passes made by `flush_until_idle` before it reports
    /// [`SprigError::SchedulerOverflow`](crate::SprigError::SchedulerOverflow).
    pub max_flush_passes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            flush: FlushStrategy::Manual,
            max_flush_passes: 100,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

thread_local! {
    static CONFIG: RefCell<RuntimeConfig> = RefCell::new(RuntimeConfig::default());
}

/// Install `config` for the current thread.
pub fn configure(config: RuntimeConfig) {
    tracing::debug!(target: "sprig::config", ?config, "runtime configured");
    CONFIG.with(|slot| *slot.borrow_mut() = config);
}

/// The configuration active on the current thread.
pub fn current_config() -> RuntimeConfig {
    CONFIG.with(|slot| slot.borrow().clone())
}
