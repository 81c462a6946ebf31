//! In-Memory Host
//!
//! [`MemoryHost`] is a host tree kept in an arena. Every mutation the
//! reconciler makes is appended to an operation log, so tests (and tools)
//! can assert on exactly what was done: how many nodes were created, which
//! were moved, which props were set.
//!
//! Removing a node frees it and its whole subtree from the arena; the
//! handles must not be used again. Nodes detached by a text overwrite stay
//! in the arena until they are removed.
//!
//! # Prop Semantics
//!
//! - `class` replaces the class list.
//! - `style` takes a [`StyleMap`]; declarations missing from the new map are
//!   removed.
//! - `on*` props bind event listeners. Replacing a handler swaps it inside
//!   the existing listener instead of unbinding and rebinding.
//! - Anything else is an attribute. `false` or removal unsets it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;

use super::host::{HostAdapter, HostId};
use super::vnode::{event_name, EventHandler, PropValue, StyleMap};

/// One logged host mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostOp {
    Create { id: HostId, kind: String },
    SetElementText { el: HostId, text: String },
    SetText { node: HostId, text: String },
    SetAttribute { el: HostId, name: String, value: Option<String> },
    SetStyle { el: HostId, name: String, value: Option<String> },
    AddListener { el: HostId, event: String },
    RemoveListener { el: HostId, event: String },
    Insert { child: HostId, parent: HostId, anchor: Option<HostId> },
    Move { child: HostId, parent: HostId, anchor: Option<HostId> },
    Remove { child: HostId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryNodeKind {
    Root,
    Element(String),
    Text(String),
    Comment(String),
}

/// A listener slot. The handler inside is swapped on update.
type Invoker = Rc<RefCell<EventHandler>>;

#[derive(Debug)]
struct MemoryNode {
    kind: MemoryNodeKind,
    parent: Option<HostId>,
    children: Vec<HostId>,
    text: String,
    class: Option<String>,
    style: IndexMap<String, String>,
    attributes: IndexMap<String, String>,
    listeners: IndexMap<String, Invoker>,
}

impl MemoryNode {
    fn new(kind: MemoryNodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            text: String::new(),
            class: None,
            style: IndexMap::new(),
            attributes: IndexMap::new(),
            listeners: IndexMap::new(),
        }
    }
}

/// Arena-backed host tree with an operation log.
#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: HashMap<HostId, MemoryNode>,
    next_id: u64,
    ops: Vec<HostOp>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, kind: MemoryNodeKind) -> HostId {
        self.next_id += 1;
        let id = HostId::new(self.next_id);
        self.nodes.insert(id, MemoryNode::new(kind));
        id
    }

    fn log_create(&mut self, id: HostId, kind: &str) {
        self.ops.push(HostOp::Create {
            id,
            kind: kind.to_string(),
        });
    }

    /// Create a container to render into. Not logged.
    pub fn create_root(&mut self) -> HostId {
        self.alloc(MemoryNodeKind::Root)
    }

    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    /// Take the log, leaving it empty.
    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// The log as JSON.
    pub fn ops_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.ops)
    }

    /// Number of logged moves of already-attached nodes.
    pub fn moves(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, HostOp::Move { .. })).count()
    }

    /// Number of logged node creations.
    pub fn creates(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, HostOp::Create { .. })).count()
    }

    /// Number of logged removals.
    pub fn removals(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, HostOp::Remove { .. })).count()
    }

    pub fn kind(&self, id: HostId) -> Option<&MemoryNodeKind> {
        self.nodes.get(&id).map(|node| &node.kind)
    }

    pub fn children(&self, id: HostId) -> &[HostId] {
        match self.nodes.get(&id) {
            Some(node) => node.children.as_slice(),
            None => &[],
        }
    }

    pub fn attribute(&self, el: HostId, name: &str) -> Option<&str> {
        self.nodes.get(&el)?.attributes.get(name).map(String::as_str)
    }

    pub fn class(&self, el: HostId) -> Option<&str> {
        self.nodes.get(&el)?.class.as_deref()
    }

    pub fn style(&self, el: HostId, name: &str) -> Option<&str> {
        self.nodes.get(&el)?.style.get(name).map(String::as_str)
    }

    /// The handler currently bound for `event` on `el`.
    pub fn listener(&self, el: HostId, event: &str) -> Option<EventHandler> {
        let invoker = self.nodes.get(&el)?.listeners.get(event)?;
        Some(invoker.borrow().clone())
    }

    /// Number of live nodes, roots included. Removed subtrees are freed.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether `node` is attached under `ancestor`.
    pub fn contains(&self, ancestor: HostId, node: HostId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    /// Render the subtree under `id` as markup. Text content of elements is
    /// printed before their child nodes. Empty text nodes print nothing.
    pub fn serialize(&self, id: HostId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    /// The markup of `id`'s children, without `id` itself.
    pub fn inner_html(&self, id: HostId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, &mut out);
        }
        out
    }

    fn write_node(&self, id: HostId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        match &node.kind {
            MemoryNodeKind::Root => {
                for &child in &node.children {
                    self.write_node(child, out);
                }
            }
            MemoryNodeKind::Text(text) => out.push_str(text),
            MemoryNodeKind::Comment(text) => {
                let _ = write!(out, "<!--{text}-->");
            }
            MemoryNodeKind::Element(tag) => {
                let _ = write!(out, "<{tag}");
                if let Some(class) = &node.class {
                    let _ = write!(out, " class=\"{class}\"");
                }
                if !node.style.is_empty() {
                    let style: Vec<String> = node
                        .style
                        .iter()
                        .map(|(name, value)| format!("{name}: {value}"))
                        .collect();
                    let _ = write!(out, " style=\"{}\"", style.join("; "));
                }
                for (name, value) in &node.attributes {
                    if value.is_empty() {
                        let _ = write!(out, " {name}");
                    } else {
                        let _ = write!(out, " {name}=\"{value}\"");
                    }
                }
                out.push('>');
                out.push_str(&node.text);
                for &child in &node.children {
                    self.write_node(child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    /// Drop `id` and everything under it from the arena.
    fn release(&mut self, id: HostId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            if let Some(node) = self.nodes.remove(&id) {
                pending.extend(node.children);
            }
        }
    }

    fn detach(&mut self, child: HostId) -> bool {
        let Some(parent) = self.nodes.get_mut(&child).and_then(|n| n.parent.take()) else {
            return false;
        };
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.children.retain(|&c| c != child);
        }
        true
    }

    fn patch_style(&mut self, el: HostId, prev: Option<&PropValue>, next: Option<&PropValue>) {
        let empty = StyleMap::new();
        let prev = match prev {
            Some(PropValue::Style(map)) => map,
            _ => &empty,
        };
        let next = match next {
            Some(PropValue::Style(map)) => map,
            _ => &empty,
        };

        let mut changes = Vec::new();
        for (name, value) in next {
            if prev.get(name) != Some(value) {
                changes.push((name.to_string(), Some(value.to_string())));
            }
        }
        for name in prev.keys() {
            if !next.contains_key(name) {
                changes.push((name.to_string(), None));
            }
        }

        let Some(node) = self.nodes.get_mut(&el) else {
            return;
        };
        for (name, value) in changes {
            match &value {
                Some(v) => {
                    node.style.insert(name.clone(), v.clone());
                }
                None => {
                    node.style.shift_remove(&name);
                }
            }
            self.ops.push(HostOp::SetStyle { el, name, value });
        }
    }

    fn patch_event(&mut self, el: HostId, event: String, next: Option<&PropValue>) {
        let Some(node) = self.nodes.get_mut(&el) else {
            return;
        };
        let existing = node.listeners.get(&event).cloned();
        match (next, existing) {
            (Some(PropValue::Handler(handler)), Some(invoker)) => {
                *invoker.borrow_mut() = handler.clone();
            }
            (Some(PropValue::Handler(handler)), None) => {
                node.listeners
                    .insert(event.clone(), Rc::new(RefCell::new(handler.clone())));
                self.ops.push(HostOp::AddListener { el, event });
            }
            (_, Some(_)) => {
                node.listeners.shift_remove(&event);
                self.ops.push(HostOp::RemoveListener { el, event });
            }
            (_, None) => {}
        }
    }

    fn patch_attribute(&mut self, el: HostId, name: &str, next: Option<&PropValue>) {
        let value = match next {
            None | Some(PropValue::Bool(false)) => None,
            Some(PropValue::Bool(true)) => Some(String::new()),
            Some(other) => other.to_attribute(),
        };
        let Some(node) = self.nodes.get_mut(&el) else {
            return;
        };
        match &value {
            Some(v) => {
                node.attributes.insert(name.to_string(), v.clone());
            }
            None => {
                node.attributes.shift_remove(name);
            }
        }
        self.ops.push(HostOp::SetAttribute {
            el,
            name: name.to_string(),
            value,
        });
    }
}

impl HostAdapter for MemoryHost {
    fn create_element(&mut self, tag: &str) -> HostId {
        let id = self.alloc(MemoryNodeKind::Element(tag.to_string()));
        self.log_create(id, tag);
        id
    }

    fn create_text(&mut self, text: &str) -> HostId {
        let id = self.alloc(MemoryNodeKind::Text(text.to_string()));
        self.log_create(id, "#text");
        id
    }

    fn create_comment(&mut self, text: &str) -> HostId {
        let id = self.alloc(MemoryNodeKind::Comment(text.to_string()));
        self.log_create(id, "#comment");
        id
    }

    fn set_element_text(&mut self, el: HostId, text: &str) {
        let children = match self.nodes.get_mut(&el) {
            Some(node) => {
                node.text = text.to_string();
                std::mem::take(&mut node.children)
            }
            None => return,
        };
        for child in children {
            if let Some(node) = self.nodes.get_mut(&child) {
                node.parent = None;
            }
        }
        self.ops.push(HostOp::SetElementText {
            el,
            text: text.to_string(),
        });
    }

    fn set_text(&mut self, node: HostId, text: &str) {
        if let Some(MemoryNode {
            kind: MemoryNodeKind::Text(content) | MemoryNodeKind::Comment(content),
            ..
        }) = self.nodes.get_mut(&node)
        {
            *content = text.to_string();
        }
        self.ops.push(HostOp::SetText {
            node,
            text: text.to_string(),
        });
    }

    fn patch_prop(&mut self, el: HostId, key: &str, prev: Option<&PropValue>, next: Option<&PropValue>) {
        if key == "class" {
            let class = next.and_then(PropValue::to_attribute);
            if let Some(node) = self.nodes.get_mut(&el) {
                node.class = class.clone();
            }
            self.ops.push(HostOp::SetAttribute {
                el,
                name: "class".to_string(),
                value: class,
            });
        } else if key == "style" {
            self.patch_style(el, prev, next);
        } else if let Some(event) = event_name(key) {
            self.patch_event(el, event, next);
        } else {
            self.patch_attribute(el, key, next);
        }
    }

    fn insert(&mut self, child: HostId, parent: HostId, anchor: Option<HostId>) {
        let was_attached = self.detach(child);

        let Some(parent_node) = self.nodes.get_mut(&parent) else {
            return;
        };
        let index = anchor
            .and_then(|a| parent_node.children.iter().position(|&c| c == a))
            .unwrap_or(parent_node.children.len());
        parent_node.children.insert(index, child);
        // A parent holding child nodes no longer shows its text content.
        parent_node.text.clear();
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }

        self.ops.push(if was_attached {
            HostOp::Move { child, parent, anchor }
        } else {
            HostOp::Insert { child, parent, anchor }
        });
    }

    fn remove(&mut self, child: HostId) {
        self.detach(child);
        self.release(child);
        self.ops.push(HostOp::Remove { child });
    }

    fn parent_node(&self, node: HostId) -> Option<HostId> {
        self.nodes.get(&node)?.parent
    }

    fn next_sibling(&self, node: HostId) -> Option<HostId> {
        let parent = self.nodes.get(&node)?.parent?;
        let siblings = &self.nodes.get(&parent)?.children;
        let index = siblings.iter().position(|&c| c == node)?;
        siblings.get(index + 1).copied()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn insert_before_anchor_and_move() {
        let mut host = MemoryHost::new();
        let root = host.create_root();
        let a = host.create_text("a");
        let b = host.create_text("b");
        let c = host.create_text("c");

        host.insert(a, root, None);
        host.insert(c, root, None);
        host.insert(b, root, Some(c));
        assert_eq!(host.serialize(root), "abc");
        assert_eq!(host.moves(), 0);

        host.insert(c, root, Some(a));
        assert_eq!(host.serialize(root), "cab");
        assert_eq!(host.moves(), 1);
        assert_eq!(host.next_sibling(c), Some(a));
        assert_eq!(host.next_sibling(b), None);
        assert_eq!(host.parent_node(b), Some(root));
    }

    #[test]
    fn removal_frees_the_subtree() {
        let mut host = MemoryHost::new();
        let root = host.create_root();
        let ul = host.create_element("ul");
        let li = host.create_element("li");
        let text = host.create_text("x");
        host.insert(text, li, None);
        host.insert(li, ul, None);
        host.insert(ul, root, None);
        assert_eq!(host.node_count(), 4);

        host.remove(ul);
        assert_eq!(host.node_count(), 1);
        assert!(host.kind(li).is_none());
        assert!(host.children(root).is_empty());
        assert_eq!(host.removals(), 1);
    }

    #[test]
    fn element_markup() {
        let mut host = MemoryHost::new();
        let root = host.create_root();
        let div = host.create_element("div");
        host.patch_prop(div, "class", None, Some(&PropValue::from("box")));
        host.patch_prop(div, "id", None, Some(&PropValue::from("main")));
        host.patch_prop(div, "hidden", None, Some(&PropValue::from(true)));
        host.set_element_text(div, "hi");
        host.insert(div, root, None);

        assert_eq!(host.serialize(root), r#"<div class="box" id="main" hidden>hi</div>"#);
    }

    #[test]
    fn style_diff_removes_dropped_declarations() {
        let mut host = MemoryHost::new();
        let el = host.create_element("p");
        let mut first = StyleMap::new();
        first.insert("color".into(), "red".into());
        first.insert("margin".into(), "0".into());
        let mut second = StyleMap::new();
        second.insert("color".into(), "blue".into());

        let (first, second) = (PropValue::Style(first), PropValue::Style(second));
        host.patch_prop(el, "style", None, Some(&first));
        host.patch_prop(el, "style", Some(&first), Some(&second));

        assert_eq!(host.style(el, "color"), Some("blue"));
        assert_eq!(host.style(el, "margin"), None);
    }

    #[test]
    fn false_attribute_is_removed() {
        let mut host = MemoryHost::new();
        let el = host.create_element("input");
        host.patch_prop(el, "disabled", None, Some(&PropValue::from(true)));
        assert_eq!(host.attribute(el, "disabled"), Some(""));

        host.patch_prop(el, "disabled", None, Some(&PropValue::from(false)));
        assert_eq!(host.attribute(el, "disabled"), None);
    }

    #[test]
    fn listener_update_reuses_the_binding() {
        let mut host = MemoryHost::new();
        let el = host.create_element("button");
        let hits = Rc::new(Cell::new(0));

        let h1 = hits.clone();
        let first = PropValue::Handler(EventHandler::new(move || h1.set(h1.get() + 1)));
        let h2 = hits.clone();
        let second = PropValue::Handler(EventHandler::new(move || h2.set(h2.get() + 10)));

        host.patch_prop(el, "onClick", None, Some(&first));
        host.patch_prop(el, "onClick", Some(&first), Some(&second));
        let adds = host
            .ops()
            .iter()
            .filter(|op| matches!(op, HostOp::AddListener { .. }))
            .count();
        assert_eq!(adds, 1);

        host.listener(el, "click").unwrap().call();
        assert_eq!(hits.get(), 10);

        host.patch_prop(el, "onClick", Some(&second), None);
        assert!(host.listener(el, "click").is_none());
    }

    #[test]
    fn set_element_text_detaches_children() {
        let mut host = MemoryHost::new();
        let ul = host.create_element("ul");
        let li = host.create_element("li");
        host.insert(li, ul, None);

        host.set_element_text(ul, "empty");
        assert!(host.children(ul).is_empty());
        assert_eq!(host.parent_node(li), None);
        assert_eq!(host.serialize(ul), "<ul>empty</ul>");
    }

    #[test]
    fn ops_serialize_to_json() {
        let mut host = MemoryHost::new();
        let root = host.create_root();
        let t = host.create_text("x");
        host.insert(t, root, None);

        let json = host.ops_json().unwrap();
        assert!(json.contains(r#""op":"create""#));
        assert!(json.contains(r#""op":"insert""#));
    }
}
