//! Rendering Pipeline
//!
//! Render functions describe the desired output as a tree of [`VNode`]s.
//! The [`Renderer`] reconciles each new tree with the previous one and
//! applies the minimal set of operations to a host through [`HostAdapter`].
//!
//! # Modules
//!
//! - `vnode` / `h`: virtual nodes and their builders
//! - `renderer`: mount, patch and unmount
//! - `keyed`: the keyed children diff
//! - `sequence`: longest increasing subsequence, used to minimize moves
//! - `component`: component definitions and their render effects
//! - `memory`: an in-memory host that logs every operation
//! - `app`: mounting a root component

mod app;
mod component;
mod h;
mod host;
mod keyed;
mod memory;
mod renderer;
mod sequence;
mod shape;
mod vnode;

pub use app::{create_app, App};
pub use component::{ComponentDef, ComponentInstance, RenderFn};
pub use h::{comment, component, fragment, h, normalize_class, text};
pub use host::{HostAdapter, HostId};
pub use memory::{HostOp, MemoryHost, MemoryNodeKind};
pub use renderer::{ErrorReporter, Renderer};
pub use sequence::longest_increasing_subsequence;
pub use shape::ShapeFlags;
pub use vnode::{
    event_name, event_prop_name, Children, EventHandler, Key, NodeType, PropValue, Props,
    StyleMap, VNode,
};
