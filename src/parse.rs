//! Parse Module
//!
//! Compiles a template (literal fragments interleaved with values) into a
//! virtual node tree:
//!
//! 1. placeholder substitution (see [`crate::placeholder`]);
//! 2. HTML5 parse of the assembled markup with html5ever;
//! 3. conversion of the parsed DOM into [`VNode`]s, resolving sentinels.

use html5ever::parse_document;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::collections::BTreeMap;
use tendril::TendrilSink;
use tracing::trace;

use crate::error::{Error, Result};
use crate::hooks::template_options;
use crate::options::TemplateOptions;
use crate::placeholder::{substitute, PlaceholderTable, Value, PLACEHOLDER_TAG};
use crate::vnode::{build_vnode, Child, Rendered, VNodeProps};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Compile a template.
///
/// `fragments` are the literal pieces, `values` the interpolations between
/// them (`values[i]` sits after `fragments[i]`). Inside a component render the
/// instance's template options apply, elsewhere the defaults.
pub fn compile_template(fragments: &[&str], values: Vec<Value>) -> Result<Rendered> {
    compile_template_with(&template_options(), fragments, values)
}

pub fn compile_template_with(
    options: &TemplateOptions,
    fragments: &[&str],
    values: Vec<Value>,
) -> Result<Rendered> {
    let (markup, mut table) = substitute(fragments, values);
    trace!(markup = %markup, placeholders = table.len(), "compiling template");

    let dom = parse_markup(&markup)?;

    let mut ctx = ConversionContext {
        table: &mut table,
        options,
        keep_wrappers: markup.to_lowercase().contains("<html"),
    };
    let mut children = Vec::new();
    collect_body_content(&dom.document, &mut ctx, &mut children)?;
    table.ensure_consumed()?;

    Ok(Rendered::from_children(children))
}

/// Compile a template written as one string with `{}` marking each value slot.
/// Write `{{}}` for a literal `{}`.
pub fn compile_template_str(template: &str, values: Vec<Value>) -> Result<Rendered> {
    compile_template_str_with(&template_options(), template, values)
}

pub fn compile_template_str_with(
    options: &TemplateOptions,
    template: &str,
    values: Vec<Value>,
) -> Result<Rendered> {
    let fragments = split_template(template);
    let fragments: Vec<&str> = fragments.iter().map(String::as_str).collect();
    compile_template_with(options, &fragments, values)
}

/// Split on `{}` slots, unescaping `{{}}` to a literal `{}`.
fn split_template(template: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut current = String::new();
    let mut rest = template;
    while let Some(pos) = rest.find("{}") {
        if rest[..pos].ends_with('{') && rest[pos + 2..].starts_with('}') {
            current.push_str(&rest[..pos - 1]);
            current.push_str("{}");
            rest = &rest[pos + 3..];
        } else {
            current.push_str(&rest[..pos]);
            fragments.push(std::mem::take(&mut current));
            rest = &rest[pos + 2..];
        }
    }
    current.push_str(rest);
    fragments.push(current);
    fragments
}

/// Build a tree from markup with interpolated values.
///
/// Each `{}` takes the next value; `{{}}` is a literal `{}`.
///
/// ```ignore
/// let view = html!("<button onclick={}>{}</button>", on_click, label)?;
/// ```
#[macro_export]
macro_rules! html {
    ($template:expr $(, $value:expr)* $(,)?) => {
        $crate::compile_template_str($template, vec![$($crate::Value::from($value)),*])
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// MARKUP PARSE
// ═══════════════════════════════════════════════════════════════════════════════

fn parse_markup(markup: &str) -> Result<RcDom> {
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut markup.as_bytes())
        .map_err(|e| Error::TemplateParse(e.to_string()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// TREE CONVERSION
// ═══════════════════════════════════════════════════════════════════════════════

struct ConversionContext<'a> {
    table: &'a mut PlaceholderTable,
    options: &'a TemplateOptions,
    /// The template spelled out its own `<html>`, so wrappers are real content.
    keep_wrappers: bool,
}

/// Walk the document, flattening the `html`/`head`/`body` wrappers the parser
/// inserts around a fragment. Whitespace-only text between top-level nodes is
/// dropped unless `keep_whitespace` is set, so a single root stays a single root.
fn collect_body_content(
    handle: &Handle,
    ctx: &mut ConversionContext<'_>,
    out: &mut Vec<Child>,
) -> Result<()> {
    match &handle.data {
        NodeData::Document => {
            for child in handle.children.borrow().iter() {
                collect_body_content(child, ctx, out)?;
            }
        }
        NodeData::Element { name, .. } => {
            let tag = name.local.to_string();
            let is_wrapper = tag == "html" || tag == "head" || tag == "body";
            if tag == "html" || (is_wrapper && !ctx.keep_wrappers) {
                for child in handle.children.borrow().iter() {
                    collect_body_content(child, ctx, out)?;
                }
            } else {
                out.extend(convert_node(handle, ctx)?);
            }
        }
        NodeData::Text { contents } => {
            if ctx.options.keep_whitespace || !contents.borrow().trim().is_empty() {
                out.extend(convert_node(handle, ctx)?);
            }
        }
        NodeData::Comment { .. } => {
            out.extend(convert_node(handle, ctx)?);
        }
        _ => {}
    }
    Ok(())
}

/// Convert one parsed node. Sentinels can expand to several children.
fn convert_node(handle: &Handle, ctx: &mut ConversionContext<'_>) -> Result<Vec<Child>> {
    match &handle.data {
        NodeData::Text { contents } => Ok(vec![Child::Text(contents.borrow().to_string())]),

        NodeData::Comment { .. } => Ok(vec![Child::Empty]),

        NodeData::Element { name, attrs, .. } => {
            let tag = name.local.to_string();
            let attributes = attrs.borrow();

            if tag == PLACEHOLDER_TAG {
                let id = attributes
                    .iter()
                    .find(|attr| &*attr.name.local == "id")
                    .and_then(|attr| ctx.table.parse_placeholder_id(&attr.value));
                if let Some(id) = id {
                    return ctx.table.take_embedded(id);
                }
            }

            let mut props = VNodeProps {
                attributes: BTreeMap::new(),
                events: BTreeMap::new(),
            };
            for attr in attributes.iter() {
                let attr_name = match &attr.name.prefix {
                    Some(prefix) => format!("{}:{}", prefix, attr.name.local),
                    None => attr.name.local.to_string(),
                };
                let attr_value = attr.value.to_string();

                if let Some(id) = ctx.table.parse_event_token(&attr_value) {
                    props.events.insert(attr_name, ctx.table.handler(id)?);
                } else {
                    props.attributes.insert(attr_name, attr_value);
                }
            }

            let mut children = Vec::new();
            for child in handle.children.borrow().iter() {
                children.extend(convert_node(child, ctx)?);
            }

            let mut node = build_vnode(&tag, &ctx.options.library_tag, props, children);
            if &*name.ns != HTML_NAMESPACE {
                node.namespace = Some(name.ns.to_string());
            }
            Ok(vec![Child::Element(node)])
        }

        _ => Ok(vec![]),
    }
}
