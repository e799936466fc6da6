//! In-memory platform
//!
//! A minimal element tree implementing [`Materializer`] and [`Container`], used
//! by tests and by hosts that want to render to a string. Elements are
//! immutable once built; a re-render replaces them wholesale.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::trace;

use crate::error::{Error, Result};
use crate::mount::{Container, MaterializeContext, Materializer};
use crate::placeholder::{escape_attr, escape_text};
use crate::vnode::{Callback, Child, Event, VNode};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

// ═══════════════════════════════════════════════════════════════════════════════
// NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub enum DomNode {
    Element(Rc<DomElement>),
    Text(String),
    /// Stands in for an empty child slot.
    Comment(String),
}

#[derive(Debug)]
pub struct DomElement {
    pub tag: String,
    pub namespace: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub listeners: BTreeMap<String, Callback>,
    pub children: Vec<DomNode>,
}

impl DomElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Fire `name` at this element. Listeners registered as `click` or
    /// `onclick` both answer to `click`. Returns whether a listener ran.
    pub fn dispatch(&self, name: &str) -> Result<bool> {
        self.dispatch_event(&Event::new(name))
    }

    pub fn dispatch_event(&self, event: &Event) -> Result<bool> {
        let listener = self
            .listeners
            .get(&event.name)
            .or_else(|| self.listeners.get(&format!("on{}", event.name)))
            .cloned();
        match listener {
            Some(listener) => {
                trace!(tag = %self.tag, event = %event.name, "dispatching event");
                listener.call(event)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// First descendant (or self) with the given tag, depth first.
    pub fn find(self: &Rc<Self>, tag: &str) -> Option<Rc<DomElement>> {
        if self.tag == tag {
            return Some(self.clone());
        }
        find_in(&self.children, tag)
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }
}

impl DomNode {
    pub fn as_element(&self) -> Option<&Rc<DomElement>> {
        match self {
            DomNode::Element(element) => Some(element),
            _ => None,
        }
    }
}

fn find_in(nodes: &[DomNode], tag: &str) -> Option<Rc<DomElement>> {
    nodes
        .iter()
        .filter_map(DomNode::as_element)
        .find_map(|element| element.find(tag))
}

fn collect_text(nodes: &[DomNode], out: &mut String) {
    for node in nodes {
        match node {
            DomNode::Element(element) => collect_text(&element.children, out),
            DomNode::Text(text) => out.push_str(text),
            DomNode::Comment(_) => {}
        }
    }
}

fn write_node(node: &DomNode, out: &mut String) {
    match node {
        DomNode::Element(element) => write_element(element, out),
        DomNode::Text(text) => out.push_str(&escape_text(text)),
        DomNode::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
    }
}

fn write_element(element: &DomElement, out: &mut String) {
    out.push('<');
    out.push_str(&element.tag);
    for (name, value) in &element.attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
    out.push('>');
    if element.namespace.is_none() && VOID_ELEMENTS.contains(&element.tag.as_str()) {
        return;
    }
    for child in &element.children {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}

// ═══════════════════════════════════════════════════════════════════════════════
// MATERIALIZER
// ═══════════════════════════════════════════════════════════════════════════════

/// Builds [`DomNode`]s from virtual nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryDom;

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

impl MemoryDom {
    fn build_element(&self, node: &VNode, ctx: &MaterializeContext) -> Result<DomElement> {
        if !is_valid_name(&node.tag) {
            return Err(Error::Materialize(format!(
                "invalid tag name {:?} in instance {}",
                node.tag, ctx.instance
            )));
        }
        if let Some(name) = node.attributes.keys().find(|name| !is_valid_name(name)) {
            return Err(Error::Materialize(format!(
                "invalid attribute name {:?} on <{}>",
                name, node.tag
            )));
        }

        let children = node
            .children
            .iter()
            .map(|child| self.materialize(child, ctx))
            .collect::<Result<Vec<_>>>()?;

        Ok(DomElement {
            tag: node.tag.clone(),
            namespace: node.namespace.clone(),
            attributes: node.attributes.clone(),
            listeners: node.events.clone(),
            children,
        })
    }
}

impl Materializer for MemoryDom {
    type Element = DomNode;

    fn materialize(&self, node: &Child, ctx: &MaterializeContext) -> Result<DomNode> {
        match node {
            Child::Element(vnode) => Ok(DomNode::Element(Rc::new(self.build_element(vnode, ctx)?))),
            Child::Text(text) => Ok(DomNode::Text(text.clone())),
            Child::Empty => Ok(DomNode::Comment(String::new())),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTAINER
// ═══════════════════════════════════════════════════════════════════════════════

/// Shared handle to an in-memory mount point. Clones see the same content.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    children: Rc<RefCell<Vec<DomNode>>>,
    generation: Rc<Cell<u64>>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn children(&self) -> Vec<DomNode> {
        self.children.borrow().clone()
    }

    /// How many times the content has been cleared, i.e. rebuilt.
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for node in self.children.borrow().iter() {
            write_node(node, &mut out);
        }
        out
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children.borrow(), &mut out);
        out
    }

    pub fn query(&self, tag: &str) -> Option<Rc<DomElement>> {
        find_in(&self.children.borrow(), tag)
    }
}

impl Container for MemoryContainer {
    type Element = DomNode;

    fn clear(&self) {
        self.children.borrow_mut().clear();
        self.generation.set(self.generation.get() + 1);
    }

    fn append(&self, element: DomNode) {
        self.children.borrow_mut().push(element);
    }
}
