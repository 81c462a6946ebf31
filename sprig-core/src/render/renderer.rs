//! Renderer
//!
//! The renderer turns virtual trees into host trees and keeps them in sync.
//! [`Renderer::render`] compares the new tree for a container with the one
//! rendered there last time and applies the difference through the
//! [`HostAdapter`].
//!
//! # How Patching Works
//!
//! `patch(old, new, container, anchor)` is the single entry point:
//!
//! 1. The same node object on both sides: nothing to do.
//! 2. Not the same node (type or key differ): the old node is unmounted
//!    entirely and the new one is mounted where the old one was.
//! 3. Otherwise dispatch on the node type. Text nodes update their content,
//!    comments are left alone, fragments diff their children between their
//!    two anchors, elements patch children then props in place, and
//!    component nodes carry their instance over (a component re-renders
//!    through its own effect, never through its parent's patch).
//!
//! Mounting an element creates it, fills in its children, applies its props
//! and only then inserts it, so the host sees one insertion per subtree.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::app::App;
use super::component::ComponentDef;
use super::host::{HostAdapter, HostId};
use super::keyed::{check_unique_keys, validate_keys};
use super::memory::MemoryHost;
use super::shape::ShapeFlags;
use super::vnode::{NodeType, Props, VNode};
use crate::error::{Result, SprigError};

/// Hook receiving render failures caught at component boundaries.
pub type ErrorReporter = Rc<dyn Fn(&SprigError)>;

fn default_reporter() -> ErrorReporter {
    Rc::new(|err: &SprigError| {
        tracing::error!(target: "sprig::render", error = %err, "render failed");
    })
}

pub(crate) struct RendererInner<H> {
    pub(crate) host: RefCell<H>,
    roots: RefCell<HashMap<HostId, Rc<VNode>>>,
    reporter: RefCell<ErrorReporter>,
}

impl<H: HostAdapter + 'static> RendererInner<H> {
    pub(crate) fn report(&self, err: &SprigError) {
        let reporter = self.reporter.borrow().clone();
        reporter(err);
    }

    /// Reconcile `old` (if any) into `new`.
    pub(crate) fn patch(
        self: &Rc<Self>,
        old: Option<&VNode>,
        new: &VNode,
        container: HostId,
        anchor: Option<HostId>,
    ) -> Result<()> {
        let mut old = old;
        let mut anchor = anchor;

        if let Some(prev) = old {
            if std::ptr::eq(prev, new) {
                return Ok(());
            }
            if !prev.is_same_node(new) {
                anchor = self.next_host_node(prev).or(anchor);
                self.unmount(prev, true);
                old = None;
            }
        }

        match &new.node_type {
            NodeType::Text => self.process_text(old, new, container, anchor),
            NodeType::Comment => self.process_comment(old, new, container, anchor),
            NodeType::Fragment => self.process_fragment(old, new, container, anchor),
            NodeType::Element(tag) => match old {
                None => self.mount_element(tag, new, container, anchor),
                Some(prev) => self.patch_element(prev, new),
            },
            NodeType::Component(_) => self.process_component(old, new, container, anchor),
        }
    }

    fn process_text(
        &self,
        old: Option<&VNode>,
        new: &VNode,
        container: HostId,
        anchor: Option<HostId>,
    ) -> Result<()> {
        let content = new.text_content().unwrap_or_default();
        match old {
            None => {
                let mut host = self.host.borrow_mut();
                let el = host.create_text(content);
                new.el.set(Some(el));
                host.insert(el, container, anchor);
            }
            Some(prev) => {
                let el = prev.el.get().ok_or(SprigError::MissingHandle)?;
                new.el.set(Some(el));
                if prev.text_content() != new.text_content() {
                    self.host.borrow_mut().set_text(el, content);
                }
            }
        }
        Ok(())
    }

    fn process_comment(
        &self,
        old: Option<&VNode>,
        new: &VNode,
        container: HostId,
        anchor: Option<HostId>,
    ) -> Result<()> {
        match old {
            None => {
                let mut host = self.host.borrow_mut();
                let el = host.create_comment(new.text_content().unwrap_or_default());
                new.el.set(Some(el));
                host.insert(el, container, anchor);
            }
            Some(prev) => new.el.set(prev.el.get()),
        }
        Ok(())
    }

    fn process_fragment(
        self: &Rc<Self>,
        old: Option<&VNode>,
        new: &VNode,
        container: HostId,
        anchor: Option<HostId>,
    ) -> Result<()> {
        match old {
            None => {
                let end = {
                    let mut host = self.host.borrow_mut();
                    let start = host.create_text("");
                    let end = host.create_text("");
                    new.el.set(Some(start));
                    new.anchor.set(Some(end));
                    host.insert(start, container, anchor);
                    host.insert(end, container, anchor);
                    end
                };
                self.mount_children(new.child_nodes(), container, Some(end))
            }
            Some(prev) => {
                let start = prev.el.get().ok_or(SprigError::MissingHandle)?;
                let end = prev.anchor.get().ok_or(SprigError::MissingHandle)?;
                new.el.set(Some(start));
                new.anchor.set(Some(end));
                self.patch_children(prev, new, container, Some(end))
            }
        }
    }

    fn process_component(
        self: &Rc<Self>,
        old: Option<&VNode>,
        new: &VNode,
        container: HostId,
        anchor: Option<HostId>,
    ) -> Result<()> {
        let carried = old.and_then(|prev| prev.component.borrow_mut().take());
        match carried {
            Some(instance) => {
                *new.component.borrow_mut() = Some(instance);
                Ok(())
            }
            None => self.mount_component(new, container, anchor),
        }
    }

    fn mount_element(
        self: &Rc<Self>,
        tag: &str,
        vnode: &VNode,
        container: HostId,
        anchor: Option<HostId>,
    ) -> Result<()> {
        let el = self.host.borrow_mut().create_element(tag);
        vnode.el.set(Some(el));

        if vnode.shape.contains(ShapeFlags::TEXT_CHILDREN) {
            let text = vnode.text_content().unwrap_or_default();
            self.host.borrow_mut().set_element_text(el, text);
        } else if vnode.shape.contains(ShapeFlags::ARRAY_CHILDREN) {
            self.mount_children(vnode.child_nodes(), el, None)?;
        }

        let mut host = self.host.borrow_mut();
        for (key, value) in &vnode.props {
            host.patch_prop(el, key, None, Some(value));
        }
        host.insert(el, container, anchor);
        Ok(())
    }

    fn patch_element(self: &Rc<Self>, old: &VNode, new: &VNode) -> Result<()> {
        let el = old.el.get().ok_or(SprigError::MissingHandle)?;
        new.el.set(Some(el));

        self.patch_children(old, new, el, None)?;
        self.patch_props(el, &old.props, &new.props);
        Ok(())
    }

    fn patch_props(&self, el: HostId, old: &Props, new: &Props) {
        let mut host = self.host.borrow_mut();
        for (key, next) in new {
            let prev = old.get(key);
            if prev != Some(next) {
                host.patch_prop(el, key, prev, Some(next));
            }
        }
        for (key, prev) in old {
            if !new.contains_key(key) {
                host.patch_prop(el, key, Some(prev), None);
            }
        }
    }

    pub(crate) fn mount_children(
        self: &Rc<Self>,
        children: &[VNode],
        container: HostId,
        anchor: Option<HostId>,
    ) -> Result<()> {
        check_unique_keys(children)?;
        for child in children {
            self.patch(None, child, container, anchor)?;
        }
        Ok(())
    }

    fn patch_children(
        self: &Rc<Self>,
        old: &VNode,
        new: &VNode,
        container: HostId,
        anchor: Option<HostId>,
    ) -> Result<()> {
        let prev_shape = old.shape;
        let shape = new.shape;

        if shape.contains(ShapeFlags::TEXT_CHILDREN) {
            if prev_shape.contains(ShapeFlags::ARRAY_CHILDREN) {
                self.unmount_children(old.child_nodes());
            }
            if old.text_content() != new.text_content() {
                let text = new.text_content().unwrap_or_default();
                self.host.borrow_mut().set_element_text(container, text);
            }
        } else if prev_shape.contains(ShapeFlags::ARRAY_CHILDREN) {
            if shape.contains(ShapeFlags::ARRAY_CHILDREN) {
                self.patch_keyed_children(old.child_nodes(), new.child_nodes(), container, anchor)?;
            } else {
                self.unmount_children(old.child_nodes());
            }
        } else {
            if prev_shape.contains(ShapeFlags::TEXT_CHILDREN) {
                self.host.borrow_mut().set_element_text(container, "");
            }
            if shape.contains(ShapeFlags::ARRAY_CHILDREN) {
                self.mount_children(new.child_nodes(), container, anchor)?;
            }
        }
        Ok(())
    }

    fn unmount_children(&self, children: &[VNode]) {
        for child in children {
            self.unmount(child, true);
        }
    }

    /// Tear down `vnode`. Component effects below it are always stopped;
    /// host nodes are only detached when `remove` is set (a removed element
    /// takes its descendants with it).
    pub(crate) fn unmount(&self, vnode: &VNode, remove: bool) {
        match &vnode.node_type {
            NodeType::Component(_) => {
                let instance = vnode.component.borrow_mut().take();
                if let Some(instance) = instance {
                    instance.stop();
                    tracing::debug!(
                        target: "sprig::render",
                        component = instance.name(),
                        uid = instance.uid(),
                        "component unmounted"
                    );
                    if let Some(sub_tree) = instance.sub_tree() {
                        self.unmount(&sub_tree, remove);
                    }
                }
            }
            NodeType::Fragment => {
                for child in vnode.child_nodes() {
                    self.unmount(child, remove);
                }
                if remove {
                    let mut host = self.host.borrow_mut();
                    for anchor in [vnode.el.get(), vnode.anchor.get()].into_iter().flatten() {
                        host.remove(anchor);
                    }
                }
            }
            NodeType::Element(_) => {
                for child in vnode.child_nodes() {
                    self.unmount(child, false);
                }
                if let (true, Some(el)) = (remove, vnode.el.get()) {
                    self.host.borrow_mut().remove(el);
                }
            }
            NodeType::Text | NodeType::Comment => {
                if let (true, Some(el)) = (remove, vnode.el.get()) {
                    self.host.borrow_mut().remove(el);
                }
            }
        }
    }

    /// Move every host node of an already-patched `vnode` before `anchor`.
    pub(crate) fn move_node(&self, vnode: &VNode, container: HostId, anchor: Option<HostId>) {
        match &vnode.node_type {
            NodeType::Component(_) => {
                if let Some(sub_tree) = vnode.component_instance().and_then(|i| i.sub_tree()) {
                    self.move_node(&sub_tree, container, anchor);
                }
            }
            NodeType::Fragment => {
                if let Some(start) = vnode.el.get() {
                    self.host.borrow_mut().insert(start, container, anchor);
                }
                for child in vnode.child_nodes() {
                    self.move_node(child, container, anchor);
                }
                if let Some(end) = vnode.anchor.get() {
                    self.host.borrow_mut().insert(end, container, anchor);
                }
            }
            _ => {
                if let Some(el) = vnode.el.get() {
                    self.host.borrow_mut().insert(el, container, anchor);
                }
            }
        }
    }

    /// First host node of `vnode`, usable as an insertion anchor.
    pub(crate) fn host_el(&self, vnode: &VNode) -> Option<HostId> {
        match &vnode.node_type {
            NodeType::Component(_) => {
                let sub_tree = vnode.component_instance()?.sub_tree()?;
                self.host_el(&sub_tree)
            }
            _ => vnode.el.get(),
        }
    }

    /// Host node right after everything `vnode` rendered.
    fn next_host_node(&self, vnode: &VNode) -> Option<HostId> {
        match &vnode.node_type {
            NodeType::Component(_) => {
                let sub_tree = vnode.component_instance()?.sub_tree()?;
                self.next_host_node(&sub_tree)
            }
            NodeType::Fragment => self.host.borrow().next_sibling(vnode.anchor.get()?),
            _ => self.host.borrow().next_sibling(vnode.el.get()?),
        }
    }
}

/// Renders virtual trees into a host.
///
/// Cloning shares the host and the per-container root trees.
///
/// # Example
///
/// ```rust,ignore
/// let mut host = MemoryHost::new();
/// let root = host.create_root();
/// let renderer = Renderer::new(host);
///
/// renderer.render(Some(h("p").text("hello")), root)?;
/// renderer.render(Some(h("p").text("bye")), root)?; // one set_element_text
/// renderer.render(None, root)?;                     // unmount
/// ```
pub struct Renderer<H: HostAdapter + 'static> {
    inner: Rc<RendererInner<H>>,
}

impl<H: HostAdapter + 'static> Renderer<H> {
    pub fn new(host: H) -> Self {
        Self {
            inner: Rc::new(RendererInner {
                host: RefCell::new(host),
                roots: RefCell::new(HashMap::new()),
                reporter: RefCell::new(default_reporter()),
            }),
        }
    }

    /// Render `vnode` into `container`, patching against whatever was
    /// rendered there before. `None` unmounts the previous tree.
    ///
    /// Duplicate keys anywhere in `vnode` fail the call before the host is
    /// touched, and the previous tree stays in place.
    pub fn render(&self, vnode: Option<VNode>, container: HostId) -> Result<()> {
        if let Some(next) = &vnode {
            validate_keys(next)?;
        }
        let prev = self.inner.roots.borrow_mut().remove(&container);
        match (vnode, prev) {
            (None, Some(prev)) => {
                self.inner.unmount(&prev, true);
                Ok(())
            }
            (None, None) => Ok(()),
            (Some(next), prev) => {
                let next = Rc::new(next);
                let result = self.inner.patch(prev.as_deref(), &next, container, None);
                self.inner.roots.borrow_mut().insert(container, next);
                result
            }
        }
    }

    /// The tree last rendered into `container`.
    pub fn root(&self, container: HostId) -> Option<Rc<VNode>> {
        self.inner.roots.borrow().get(&container).cloned()
    }

    pub fn with_host<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        f(&self.inner.host.borrow())
    }

    pub fn with_host_mut<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut self.inner.host.borrow_mut())
    }

    /// Replace the render-failure hook. The default logs through `tracing`.
    pub fn on_error(&self, reporter: impl Fn(&SprigError) + 'static) {
        *self.inner.reporter.borrow_mut() = Rc::new(reporter);
    }

    /// Create an app rendering `root` through this renderer.
    pub fn create_app(&self, root: &ComponentDef) -> App<H> {
        App::new(self.clone(), root.clone())
    }
}

impl Renderer<MemoryHost> {
    /// Fire the listener bound for `event` on `el`. The handler runs with
    /// the host released, so it may trigger synchronous re-renders. Returns
    /// whether a listener was bound.
    pub fn dispatch(&self, el: HostId, event: &str) -> bool {
        let handler = self.with_host(|host| host.listener(el, event));
        match handler {
            Some(handler) => {
                handler.call();
                true
            }
            None => false,
        }
    }
}

impl<H: HostAdapter + 'static> Clone for Renderer<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<H: HostAdapter + 'static> fmt::Debug for Renderer<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("roots", &self.inner.roots.borrow().len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
