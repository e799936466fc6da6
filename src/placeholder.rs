//! Placeholder protocol for template interpolation
//!
//! A markup string cannot carry a node or a closure, so interpolated values that
//! are not plain text are recorded in a [`PlaceholderTable`] and replaced by a
//! sentinel the markup parser passes through untouched:
//!
//! - nodes and node sequences become `<m-placeholder id="m-ph-K-N"></m-placeholder>`
//!   in text content;
//! - callbacks become the attribute value `m-ev-K-N`.
//!
//! `K` is a nonce drawn per table, so markup that happens to look like a
//! sentinel is never mistaken for one. The scanner below tracks where in the
//! markup the next value lands, so the sentinel is always emitted in a position
//! the parser keeps verbatim.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

use crate::error::{Error, Result};
use crate::vnode::{Callback, Child, Rendered, VNode};

pub const PLACEHOLDER_TAG: &str = "m-placeholder";
pub const PLACEHOLDER_ID_PREFIX: &str = "m-ph-";
pub const EVENT_TOKEN_PREFIX: &str = "m-ev-";

lazy_static! {
    static ref PLACEHOLDER_ID_RE: Regex = Regex::new(r"^\s*m-ph-(\d+)-(\d+)\s*$").unwrap();

    /// Attribute value that is exactly an event token.
    static ref EVENT_TOKEN_RE: Regex = Regex::new(r"^\s*m-ev-(\d+)-(\d+)\s*$").unwrap();

    /// Legacy `data-m-event="m-ev-K-N"` form smuggled inside another attribute's value.
    static ref LEGACY_EVENT_RE: Regex = Regex::new(r#"data-m-event=["']?m-ev-(\d+)-(\d+)"#).unwrap();
}

static TABLE_NONCE_COUNTER: AtomicU64 = AtomicU64::new(0);

fn generate_nonce() -> u64 {
    TABLE_NONCE_COUNTER.fetch_add(1, Ordering::SeqCst)
}
// ═══════════════════════════════════════════════════════════════════════════════
// INTERPOLATED VALUES
// ═══════════════════════════════════════════════════════════════════════════════

/// A value interpolated between two template fragments.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Escaped and inlined as text.
    Text(String),
    /// Inlined verbatim, so it is parsed as markup.
    Raw(String),
    Node(VNode),
    Nodes(Vec<Child>),
    Handler(Callback),
    /// Contributes nothing.
    Empty,
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<&String> for Value {
    fn from(text: &String) -> Self {
        Value::Text(text.clone())
    }
}

macro_rules! value_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Text(v.to_string())
                }
            }
        )*
    };
}

value_from_display!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, char);

impl From<VNode> for Value {
    fn from(node: VNode) -> Self {
        Value::Node(node)
    }
}

impl From<Vec<VNode>> for Value {
    fn from(nodes: Vec<VNode>) -> Self {
        Value::Nodes(nodes.into_iter().map(Child::Element).collect())
    }
}

impl From<Vec<Child>> for Value {
    fn from(children: Vec<Child>) -> Self {
        Value::Nodes(children)
    }
}

impl From<Rendered> for Value {
    fn from(rendered: Rendered) -> Self {
        match rendered {
            Rendered::Empty => Value::Empty,
            Rendered::Single(Child::Element(node)) => Value::Node(node),
            other => Value::Nodes(other.into_children()),
        }
    }
}

impl From<Callback> for Value {
    fn from(callback: Callback) -> Self {
        Value::Handler(callback)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Empty, Into::into)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLACEHOLDER TABLE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Placeholder {
    Embedded(Vec<Child>),
    Handler(Callback),
}

/// Values recorded during substitution, keyed by the id written into the markup.
#[derive(Debug)]
pub struct PlaceholderTable {
    nonce: u64,
    entries: Vec<Option<Placeholder>>,
}

impl Default for PlaceholderTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderTable {
    pub fn new() -> Self {
        Self {
            nonce: generate_nonce(),
            entries: Vec::new(),
        }
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn record(&mut self, placeholder: Placeholder) -> usize {
        self.entries.push(Some(placeholder));
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value of a sentinel's `id` attribute for entry `id`.
    pub fn placeholder_id(&self, id: usize) -> String {
        format!("{}{}-{}", PLACEHOLDER_ID_PREFIX, self.nonce, id)
    }

    pub fn event_token(&self, id: usize) -> String {
        format!("{}{}-{}", EVENT_TOKEN_PREFIX, self.nonce, id)
    }

    /// Entry id named by a sentinel's `id` attribute, if it was written by this table.
    pub fn parse_placeholder_id(&self, value: &str) -> Option<usize> {
        PLACEHOLDER_ID_RE
            .captures(value)
            .and_then(|caps| self.own_id(&caps))
    }

    /// Entry id named by an event token in an attribute value, if it was
    /// written by this table.
    pub fn parse_event_token(&self, value: &str) -> Option<usize> {
        EVENT_TOKEN_RE
            .captures(value)
            .or_else(|| LEGACY_EVENT_RE.captures(value))
            .and_then(|caps| self.own_id(&caps))
    }

    fn own_id(&self, caps: &Captures<'_>) -> Option<usize> {
        let nonce: u64 = caps.get(1)?.as_str().parse().ok()?;
        if nonce != self.nonce {
            return None;
        }
        caps.get(2)?.as_str().parse().ok()
    }

    /// Remove the embedded nodes recorded at `id`. Each sentinel resolves once.
    pub fn take_embedded(&mut self, id: usize) -> Result<Vec<Child>> {
        match self.entries.get_mut(id) {
            Some(slot) if matches!(slot, Some(Placeholder::Embedded(_))) => match slot.take() {
                Some(Placeholder::Embedded(children)) => Ok(children),
                _ => Err(Error::UnresolvedPlaceholder { id }),
            },
            _ => Err(Error::UnresolvedPlaceholder { id }),
        }
    }

    /// The callback recorded at `id`.
    ///
    /// Handlers are cloned rather than taken: the tree builder may duplicate an
    /// element (and its attributes) while recovering from misnested markup.
    pub fn handler(&self, id: usize) -> Result<Callback> {
        match self.entries.get(id) {
            Some(Some(Placeholder::Handler(callback))) => Ok(callback.clone()),
            _ => Err(Error::UnresolvedPlaceholder { id }),
        }
    }

    /// Fail on the first embedded value no sentinel claimed. The tree builder
    /// drops unknown elements in some insertion modes (inside `<select>`, for one).
    pub fn ensure_consumed(&self) -> Result<()> {
        match self
            .entries
            .iter()
            .position(|entry| matches!(entry, Some(Placeholder::Embedded(_))))
        {
            Some(id) => Err(Error::UnresolvedPlaceholder { id }),
            None => Ok(()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MARKUP CONTEXT SCANNER
// ═══════════════════════════════════════════════════════════════════════════════

/// Where the end of the markup assembled so far sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupContext {
    Text,
    /// Right after a `<` in text; the next character decides whether a tag opens.
    TagOpen,
    /// Inside a start/end tag, outside any attribute value.
    Tag,
    /// Right after `name=`, before the value starts.
    BeforeValue,
    Unquoted,
    Quoted(char),
    Comment,
}

#[derive(Debug)]
struct Scanner {
    context: MarkupContext,
    /// Last three characters seen, for detecting `<!--` and `-->`.
    tail: [char; 3],
}

impl Scanner {
    fn new() -> Self {
        Self {
            context: MarkupContext::Text,
            tail: [' ', ' ', ' '],
        }
    }

    fn feed(&mut self, fragment: &str) {
        for c in fragment.chars() {
            self.context = match self.context {
                MarkupContext::Text => match c {
                    '<' => MarkupContext::TagOpen,
                    _ => MarkupContext::Text,
                },
                // Same rule as the HTML tokenizer's tag open state.
                MarkupContext::TagOpen => match c {
                    c if c.is_ascii_alphabetic() => MarkupContext::Tag,
                    '/' | '!' | '?' => MarkupContext::Tag,
                    '<' => MarkupContext::TagOpen,
                    _ => MarkupContext::Text,
                },
                MarkupContext::Tag => match c {
                    '-' if self.tail == ['<', '!', '-'] => MarkupContext::Comment,
                    '>' => MarkupContext::Text,
                    '=' => MarkupContext::BeforeValue,
                    _ => MarkupContext::Tag,
                },
                MarkupContext::BeforeValue => match c {
                    '"' | '\'' => MarkupContext::Quoted(c),
                    '>' => MarkupContext::Text,
                    c if c.is_whitespace() => MarkupContext::BeforeValue,
                    _ => MarkupContext::Unquoted,
                },
                MarkupContext::Unquoted => match c {
                    '>' => MarkupContext::Text,
                    c if c.is_whitespace() => MarkupContext::Tag,
                    _ => MarkupContext::Unquoted,
                },
                MarkupContext::Quoted(q) if c == q => MarkupContext::Tag,
                MarkupContext::Quoted(q) => MarkupContext::Quoted(q),
                MarkupContext::Comment => {
                    if c == '>' && self.tail[1..] == ['-', '-'] {
                        MarkupContext::Text
                    } else {
                        MarkupContext::Comment
                    }
                }
            };
            self.tail = [self.tail[1], self.tail[2], c];
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUBSTITUTION PASS
// ═══════════════════════════════════════════════════════════════════════════════

/// Assemble one markup string from fragments and values, recording every
/// non-text value in the returned table.
///
/// Values beyond `fragments.len()` have no slot and are ignored.
pub fn substitute(fragments: &[&str], values: Vec<Value>) -> (String, PlaceholderTable) {
    let mut out = String::new();
    let mut table = PlaceholderTable::new();
    let mut scanner = Scanner::new();
    let mut values = values.into_iter();

    for (i, fragment) in fragments.iter().enumerate() {
        out.push_str(fragment);
        scanner.feed(fragment);

        if i + 1 == fragments.len() {
            break;
        }
        let Some(value) = values.next() else {
            continue;
        };

        let emitted = emit_value(value, scanner.context, &mut table);
        scanner.feed(&emitted);
        out.push_str(&emitted);
    }

    (out, table)
}

fn emit_value(value: Value, context: MarkupContext, table: &mut PlaceholderTable) -> String {
    match (value, context) {
        (Value::Empty, _) => String::new(),

        (Value::Raw(markup), _) => markup,

        (Value::Text(text), MarkupContext::Text) => escape_text(&text),
        // A bare `<` precedes the value; it must stay text.
        (Value::Text(text), MarkupContext::TagOpen) => escape_text_after_lt(&text),
        (Value::Text(text), MarkupContext::BeforeValue) => format!("\"{}\"", escape_attr(&text)),
        (Value::Text(text), MarkupContext::Quoted(_)) => escape_attr(&text),
        (Value::Text(text), MarkupContext::Unquoted) => escape_unquoted(&text),
        // Bare attribute names or comment text
        (Value::Text(text), MarkupContext::Tag | MarkupContext::Comment) => text,

        (Value::Node(node), MarkupContext::Text | MarkupContext::TagOpen) => {
            let id = table.record(Placeholder::Embedded(vec![Child::Element(node)]));
            sentinel_element(table, id)
        }
        (Value::Nodes(children), MarkupContext::Text | MarkupContext::TagOpen) => {
            let id = table.record(Placeholder::Embedded(children));
            sentinel_element(table, id)
        }

        (Value::Handler(callback), MarkupContext::BeforeValue) => {
            let id = table.record(Placeholder::Handler(callback));
            format!("\"{}\"", table.event_token(id))
        }
        (Value::Handler(callback), MarkupContext::Quoted(_)) => {
            let id = table.record(Placeholder::Handler(callback));
            table.event_token(id)
        }

        (value, context) => {
            warn!(
                ?context,
                kind = value_kind(&value),
                "dropping template value that cannot appear at this position"
            );
            String::new()
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Text(_) => "text",
        Value::Raw(_) => "raw",
        Value::Node(_) => "node",
        Value::Nodes(_) => "nodes",
        Value::Handler(_) => "handler",
        Value::Empty => "empty",
    }
}

// html5ever ignores the self-closing flag on non-void elements, so the sentinel
// is always written with an explicit end tag.
fn sentinel_element(table: &PlaceholderTable, id: usize) -> String {
    format!(
        "<{tag} id=\"{id}\"></{tag}>",
        tag = PLACEHOLDER_TAG,
        id = table.placeholder_id(id)
    )
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape text that follows a literal `<`. The first character is written as a
/// character reference so it cannot open a tag.
fn escape_text_after_lt(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => format!("&#{};{}", first as u32, escape_text(chars.as_str())),
        None => String::new(),
    }
}

pub fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_unquoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in escape_attr(text).chars() {
        if c.is_whitespace() {
            out.push_str(&format!("&#{};", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}
