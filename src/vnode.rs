//! Virtual node model
//!
//! The tree shape produced by the template compiler and by component renders,
//! plus the `build_vnode` constructor every element goes through.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::options::DEFAULT_LIBRARY_TAG;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENTS AND CALLBACKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Payload handed to an event callback by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub value: Option<String>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Shared event handler. Two callbacks are equal only if they are the same handler.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&Event) -> Result<()>>);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Event) -> Result<()> + 'static,
    {
        Callback(Rc::new(f))
    }

    pub fn call(&self, event: &Event) -> Result<()> {
        (self.0)(event)
    }
}

impl<F> From<F> for Callback
where
    F: Fn(&Event) -> Result<()> + 'static,
{
    fn from(f: F) -> Self {
        Callback::new(f)
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODES
// ═══════════════════════════════════════════════════════════════════════════════

/// Attributes and event bindings of an element, as handed to `build_vnode`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VNodeProps {
    pub attributes: BTreeMap<String, String>,
    pub events: BTreeMap<String, Callback>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VNode {
    pub tag: String,
    pub library_tag: String,
    /// Namespace URI for foreign content (SVG, MathML); `None` for HTML.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub attributes: BTreeMap<String, String>,
    #[serde(serialize_with = "serialize_event_names")]
    pub events: BTreeMap<String, Callback>,
    pub children: Vec<Child>,
}

/// A child slot. `Empty` stands for an intentionally absent node such as a comment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Child {
    Element(VNode),
    Text(String),
    Empty,
}

fn serialize_event_names<S>(events: &BTreeMap<String, Callback>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.collect_seq(events.keys())
}

/// Build a virtual node from its parts.
pub fn build_vnode(
    tag: &str,
    library_tag: &str,
    props: VNodeProps,
    children: Vec<Child>,
) -> VNode {
    VNode {
        tag: tag.to_string(),
        library_tag: library_tag.to_string(),
        namespace: None,
        attributes: props.attributes,
        events: props.events,
        children,
    }
}

impl VNode {
    /// Start an element with no attributes, events or children.
    pub fn element(tag: &str) -> Self {
        build_vnode(tag, DEFAULT_LIBRARY_TAG, VNodeProps::default(), Vec::new())
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn with_event(mut self, name: &str, callback: Callback) -> Self {
        self.events.insert(name.to_string(), callback);
        self
    }

    pub fn with_child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn event(&self, name: &str) -> Option<&Callback> {
        self.events.get(name)
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Element children only, skipping text and empty slots.
    pub fn element_children(&self) -> impl Iterator<Item = &VNode> {
        self.children.iter().filter_map(Child::as_element)
    }
}

fn collect_text(children: &[Child], out: &mut String) {
    for child in children {
        match child {
            Child::Text(text) => out.push_str(text),
            Child::Element(node) => collect_text(&node.children, out),
            Child::Empty => {}
        }
    }
}

impl Child {
    pub fn as_element(&self) -> Option<&VNode> {
        match self {
            Child::Element(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Child::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<VNode> for Child {
    fn from(node: VNode) -> Self {
        Child::Element(node)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDER OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

/// Output of a template compile or a component render.
///
/// Callers must handle all three shapes: nothing, one node, or a fragment.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Rendered {
    #[default]
    Empty,
    Single(Child),
    Fragment(Vec<Child>),
}

impl Rendered {
    pub fn from_children(mut children: Vec<Child>) -> Self {
        match children.len() {
            0 => Rendered::Empty,
            1 => Rendered::Single(children.remove(0)),
            _ => Rendered::Fragment(children),
        }
    }

    pub fn children(&self) -> &[Child] {
        match self {
            Rendered::Empty => &[],
            Rendered::Single(child) => std::slice::from_ref(child),
            Rendered::Fragment(children) => children,
        }
    }

    pub fn into_children(self) -> Vec<Child> {
        match self {
            Rendered::Empty => Vec::new(),
            Rendered::Single(child) => vec![child],
            Rendered::Fragment(children) => children,
        }
    }

    /// The single top-level element, if that is what was rendered.
    pub fn as_element(&self) -> Option<&VNode> {
        match self {
            Rendered::Single(child) => child.as_element(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Rendered::Empty)
    }
}

impl From<VNode> for Rendered {
    fn from(node: VNode) -> Self {
        Rendered::Single(Child::Element(node))
    }
}
