//! Sprig Core
//!
//! This crate provides the core runtime for the Sprig reactive UI framework.
//! It implements:
//!
//! - Reactive primitives (refs, reactive objects, computed values, effects,
//!   watchers)
//! - A job scheduler that batches re-renders and watcher callbacks
//! - Virtual nodes and a keyed reconciler over an abstract host
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: dependency tracking and the reactive primitives
//! - `scheduler`: deduplicating job queue and flush control
//! - `render`: virtual nodes, reconciliation, components and host adapters
//! - `config`: runtime configuration
//! - `error`: the crate error type
//!
//! Everything is single-threaded. The reactive graph and the job queue are
//! thread-local, so separate threads are separate runtimes.
//!
//! # Example
//!
//! ```rust,ignore
//! use sprig_core::reactive::{computed, effect, ref_value, EffectOptions};
//!
//! let count = ref_value(0);
//! let doubled = computed({
//!     let count = count.clone();
//!     move || count.get() * 2
//! });
//!
//! let _log = effect(
//!     move || println!("doubled: {}", doubled.get()),
//!     EffectOptions::default(),
//! );
//!
//! count.set(5);
//! // prints "doubled: 10"
//! ```

pub mod config;
pub mod error;
pub mod reactive;
pub mod render;
pub mod scheduler;

pub use config::{configure, current_config, FlushStrategy, RuntimeConfig};
pub use error::{Result, SprigError};
pub use render::{create_app, h, App, ComponentDef, MemoryHost, Renderer, VNode};
pub use scheduler::{flush_jobs, flush_until_idle, next_tick, queue_job};
