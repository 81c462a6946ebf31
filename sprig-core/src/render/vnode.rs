//! Virtual Nodes
//!
//! A [`VNode`] describes one node of the desired output tree. Render
//! functions build a fresh tree every time they run; the reconciler compares
//! it with the previous tree and carries host handles over from old nodes to
//! the new ones they match.
//!
//! Two nodes are the *same node* when their type and key both match. Only
//! same nodes are patched in place; anything else is replaced.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::component::{ComponentDef, ComponentInstance};
use super::host::HostId;
use super::shape::ShapeFlags;

/// Stable identity of a child among its siblings.
///
/// Integer and string keys never collide: `key(1)` and `key("1")` are
/// different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    Str(Rc<str>),
}

impl Key {
    /// The key's text, for string keys.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Str(text) => Some(&**text),
            Key::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Key::Int(value) => Some(*value),
            Key::Str(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(value) => write!(f, "{value}"),
            Key::Str(text) => f.write_str(text),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.into())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value.into())
    }
}

macro_rules! key_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Key {
            fn from(value: $ty) -> Self {
                Key::Int(i64::from(value))
            }
        })*
    };
}

key_from_int!(i32, i64, u32);

macro_rules! key_from_wide_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Key {
            fn from(value: $ty) -> Self {
                // Past i64::MAX only the text is left to compare by.
                i64::try_from(value).map_or_else(|_| Key::Str(value.to_string().into()), Key::Int)
            }
        })*
    };
}

key_from_wide_int!(u64, usize);

/// Event listener attached through an `on*` prop. Compared by identity.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn()>);

impl EventHandler {
    pub fn new(handler: impl Fn() + 'static) -> Self {
        Self(Rc::new(handler))
    }

    pub fn call(&self) {
        (self.0)()
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// Style declarations, in declaration order.
pub type StyleMap = IndexMap<Rc<str>, Rc<str>>;

/// A property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Str(Rc<str>),
    Bool(bool),
    Int(i64),
    Float(f64),
    Style(StyleMap),
    Handler(EventHandler),
}

impl PropValue {
    /// Attribute text for scalar values. `None` for styles and handlers.
    pub fn to_attribute(&self) -> Option<String> {
        match self {
            PropValue::Str(s) => Some(s.to_string()),
            PropValue::Bool(b) => Some(b.to_string()),
            PropValue::Int(i) => Some(i.to_string()),
            PropValue::Float(f) => Some(f.to_string()),
            PropValue::Style(_) | PropValue::Handler(_) => None,
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.into())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value.into())
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(value.into())
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<StyleMap> for PropValue {
    fn from(value: StyleMap) -> Self {
        PropValue::Style(value)
    }
}

impl From<EventHandler> for PropValue {
    fn from(value: EventHandler) -> Self {
        PropValue::Handler(value)
    }
}

/// Node properties, in declaration order.
pub type Props = IndexMap<Rc<str>, PropValue>;

/// The kind of a node.
#[derive(Clone)]
pub enum NodeType {
    Element(Rc<str>),
    Text,
    Comment,
    /// A group of siblings without a wrapping host node.
    Fragment,
    Component(ComponentDef),
}

impl NodeType {
    fn same_type(&self, other: &NodeType) -> bool {
        match (self, other) {
            (NodeType::Element(a), NodeType::Element(b)) => a == b,
            (NodeType::Text, NodeType::Text)
            | (NodeType::Comment, NodeType::Comment)
            | (NodeType::Fragment, NodeType::Fragment) => true,
            (NodeType::Component(a), NodeType::Component(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    fn base_shape(&self) -> ShapeFlags {
        match self {
            NodeType::Element(_) => ShapeFlags::ELEMENT,
            NodeType::Component(_) => ShapeFlags::STATEFUL_COMPONENT,
            NodeType::Text | NodeType::Comment | NodeType::Fragment => ShapeFlags::empty(),
        }
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Element(tag) => write!(f, "Element({tag})"),
            NodeType::Text => f.write_str("Text"),
            NodeType::Comment => f.write_str("Comment"),
            NodeType::Fragment => f.write_str("Fragment"),
            NodeType::Component(def) => write!(f, "Component({})", def.name()),
        }
    }
}

/// A node's children.
#[derive(Debug, Default)]
pub enum Children {
    #[default]
    None,
    Text(Rc<str>),
    Nodes(Vec<VNode>),
}

/// One node of a virtual tree.
pub struct VNode {
    pub(crate) node_type: NodeType,
    pub(crate) props: Props,
    pub(crate) children: Children,
    pub(crate) shape: ShapeFlags,
    pub(crate) key: Option<Key>,
    /// Host handle, set once the node is realized. For fragments this is the
    /// start anchor.
    pub(crate) el: Cell<Option<HostId>>,
    /// Fragment end anchor.
    pub(crate) anchor: Cell<Option<HostId>>,
    pub(crate) component: RefCell<Option<Rc<ComponentInstance>>>,
}

impl VNode {
    pub fn new(node_type: NodeType) -> Self {
        let shape = node_type.base_shape();
        Self {
            node_type,
            props: Props::new(),
            children: Children::None,
            shape,
            key: None,
            el: Cell::new(None),
            anchor: Cell::new(None),
            component: RefCell::new(None),
        }
    }

    pub fn element(tag: impl Into<Rc<str>>) -> Self {
        Self::new(NodeType::Element(tag.into()))
    }

    pub fn text_node(content: impl Into<Rc<str>>) -> Self {
        let mut node = Self::new(NodeType::Text);
        node.children = Children::Text(content.into());
        node
    }

    pub fn comment_node(content: impl Into<Rc<str>>) -> Self {
        let mut node = Self::new(NodeType::Comment);
        node.children = Children::Text(content.into());
        node
    }

    pub fn fragment(children: impl IntoIterator<Item = VNode>) -> Self {
        Self::new(NodeType::Fragment).children(children)
    }

    pub fn component(def: &ComponentDef) -> Self {
        Self::new(NodeType::Component(def.clone()))
    }

    /// Set the node's key.
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set a property.
    pub fn prop(mut self, name: impl Into<Rc<str>>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn class(self, class: impl Into<Rc<str>>) -> Self {
        self.prop("class", PropValue::Str(class.into()))
    }

    /// Add one style declaration.
    pub fn style(mut self, name: impl Into<Rc<str>>, value: impl Into<Rc<str>>) -> Self {
        let entry = self
            .props
            .entry(Rc::from("style"))
            .or_insert_with(|| PropValue::Style(StyleMap::new()));
        if !matches!(entry, PropValue::Style(_)) {
            *entry = PropValue::Style(StyleMap::new());
        }
        if let PropValue::Style(map) = entry {
            map.insert(name.into(), value.into());
        }
        self
    }

    /// Attach an event listener. `on("click", ..)` sets the `onClick` prop.
    pub fn on(self, event: &str, handler: impl Fn() + 'static) -> Self {
        self.prop(event_prop_name(event), EventHandler::new(handler))
    }

    /// Append one child.
    pub fn child(mut self, child: impl Into<VNode>) -> Self {
        let child = child.into();
        match &mut self.children {
            Children::Nodes(nodes) => nodes.push(child),
            _ => self.children = Children::Nodes(vec![child]),
        }
        self.refresh_shape();
        self
    }

    /// Replace the children with a list of nodes.
    pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        self.children = Children::Nodes(children.into_iter().collect());
        self.refresh_shape();
        self
    }

    /// Replace the children with text. A fragment gets a single text child
    /// instead, since it has no host element to hold the text.
    pub fn text(mut self, text: impl Into<Rc<str>>) -> Self {
        if matches!(self.node_type, NodeType::Fragment) {
            self.children = Children::Nodes(vec![VNode::text_node(text)]);
        } else {
            self.children = Children::Text(text.into());
        }
        self.refresh_shape();
        self
    }

    fn refresh_shape(&mut self) {
        let children = match (&self.node_type, &self.children) {
            (NodeType::Text | NodeType::Comment, _) => ShapeFlags::empty(),
            (_, Children::Text(_)) => ShapeFlags::TEXT_CHILDREN,
            (_, Children::Nodes(_)) => ShapeFlags::ARRAY_CHILDREN,
            (_, Children::None) => ShapeFlags::empty(),
        };
        self.shape = self.shape.without_children() | children;
    }

    /// Whether the reconciler may patch `self` into `other` in place.
    pub fn is_same_node(&self, other: &VNode) -> bool {
        self.node_type.same_type(&other.node_type) && self.key == other.key
    }

    pub fn node_type(&self) -> &NodeType {
        &self.node_type
    }

    pub fn shape(&self) -> ShapeFlags {
        self.shape
    }

    pub fn key_ref(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Child nodes, or an empty slice for text or no children.
    pub fn child_nodes(&self) -> &[VNode] {
        match &self.children {
            Children::Nodes(nodes) => nodes.as_slice(),
            _ => &[],
        }
    }

    /// Text children, or the content of a text or comment node.
    pub fn text_content(&self) -> Option<&str> {
        match &self.children {
            Children::Text(text) => Some(&**text),
            _ => None,
        }
    }

    /// The realized host handle, if mounted. For a fragment this is its
    /// start anchor; components have none of their own.
    pub fn el(&self) -> Option<HostId> {
        self.el.get()
    }

    /// The component instance, for component nodes that are mounted.
    pub fn component_instance(&self) -> Option<Rc<ComponentInstance>> {
        self.component.borrow().clone()
    }
}

impl From<&str> for VNode {
    fn from(value: &str) -> Self {
        VNode::text_node(value)
    }
}

impl From<String> for VNode {
    fn from(value: String) -> Self {
        VNode::text_node(value)
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("VNode");
        s.field("type", &self.node_type);
        if let Some(key) = &self.key {
            s.field("key", key);
        }
        if !self.props.is_empty() {
            s.field("props", &self.props);
        }
        s.field("children", &self.children);
        if let Some(el) = self.el.get() {
            s.field("el", &el);
        }
        s.finish()
    }
}

/// `"click"` -> `"onClick"`.
pub fn event_prop_name(event: &str) -> String {
    let mut chars = event.chars();
    match chars.next() {
        Some(first) => format!("on{}{}", first.to_uppercase(), chars.as_str()),
        None => String::from("on"),
    }
}

/// `"onClick"` -> `Some("click")`. `None` for keys that are not listeners.
pub fn event_name(prop: &str) -> Option<String> {
    let rest = prop.strip_prefix("on")?;
    let first = rest.chars().next()?;
    if !first.is_ascii_uppercase() {
        return None;
    }
    Some(rest.to_ascii_lowercase())
}
