//! Node builders for render functions.
//!
//! ```rust,ignore
//! h("ul").class(normalize_class([("list", true), ("empty", items.is_empty())]))
//!     .children(items.iter().map(|item| h("li").key(item.id).text(item.label.clone())))
//! ```

use std::rc::Rc;

use super::component::ComponentDef;
use super::vnode::VNode;

/// An element node.
pub fn h(tag: &str) -> VNode {
    VNode::element(tag)
}

/// A text node.
pub fn text(content: impl Into<Rc<str>>) -> VNode {
    VNode::text_node(content)
}

/// A comment node.
pub fn comment(content: impl Into<Rc<str>>) -> VNode {
    VNode::comment_node(content)
}

/// A fragment holding `children`.
pub fn fragment(children: impl IntoIterator<Item = VNode>) -> VNode {
    VNode::fragment(children)
}

/// A node rendering `def`.
pub fn component(def: &ComponentDef) -> VNode {
    VNode::component(def)
}

/// Join the names whose flag is set into a class list, skipping blanks.
pub fn normalize_class<I, S>(entries: I) -> String
where
    I: IntoIterator<Item = (S, bool)>,
    S: AsRef<str>,
{
    let mut class = String::new();
    for (name, enabled) in entries {
        let name = name.as_ref().trim();
        if !enabled || name.is_empty() {
            continue;
        }
        if !class.is_empty() {
            class.push(' ');
        }
        class.push_str(name);
    }
    class
}
