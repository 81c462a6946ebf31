//! Host Adapter
//!
//! The reconciler never touches a real output tree. Everything it does to
//! the host goes through [`HostAdapter`]: create a handle, set its text or
//! properties, insert it before an optional anchor, remove it. Handles are
//! opaque [`HostId`]s compared by value.

use std::fmt;

use serde::Serialize;

use super::vnode::PropValue;

/// Opaque handle to a node in the host tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct HostId(u64);

impl HostId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Primitive operations the reconciler needs from a host tree.
pub trait HostAdapter {
    /// Create a detached element.
    fn create_element(&mut self, tag: &str) -> HostId;

    /// Create a detached text node.
    fn create_text(&mut self, text: &str) -> HostId;

    /// Create a detached comment node.
    fn create_comment(&mut self, text: &str) -> HostId;

    /// Replace all of an element's children with `text`.
    fn set_element_text(&mut self, el: HostId, text: &str);

    /// Change the content of a text node.
    fn set_text(&mut self, node: HostId, text: &str);

    /// Apply one property change. `next == None` removes the property.
    fn patch_prop(&mut self, el: HostId, key: &str, prev: Option<&PropValue>, next: Option<&PropValue>);

    /// Insert `child` into `parent` before `anchor`, or at the end when
    /// `anchor` is `None`. An attached child is moved.
    fn insert(&mut self, child: HostId, parent: HostId, anchor: Option<HostId>);

    /// Detach `child` from its parent.
    fn remove(&mut self, child: HostId);

    fn parent_node(&self, node: HostId) -> Option<HostId>;

    fn next_sibling(&self, node: HostId) -> Option<HostId>;
}
