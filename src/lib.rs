//! # Hooks runtime
//!
//! A small component runtime built around two ideas:
//!
//! 1. **Hooks by call position.** A component is a plain function of its
//!    props. Inside it, [`state`] and [`effect`] are matched to their storage
//!    by the order they are called in, so they must be called unconditionally
//!    and in the same order on every render.
//!
//! 2. **Templates as markup.** [`html!`] and [`compile_template`] turn markup
//!    with interpolated values into a [`VNode`] tree. Interpolated nodes are
//!    spliced in place, handlers in attribute position become event bindings,
//!    and everything else is escaped text.
//!
//! ## Update model
//!
//! - An accepted state change re-renders the whole root component and
//!   rebuilds its container from scratch. There is no diffing.
//! - Setting a value equal to the current one is a no-op.
//! - Effects are queued during render and only run on [`scheduler::flush`].
//! - The runtime is single-threaded: all state lives in thread-locals.

mod dom;
mod error;
pub mod hooks;
mod instance;
mod mount;
mod options;
mod parse;
mod placeholder;
pub mod scheduler;
mod vnode;

#[cfg(test)]
mod parse_tests;

pub use dom::{DomElement, DomNode, MemoryContainer, MemoryDom};
pub use error::*;
pub use hooks::{effect, is_rendering, state, state_with, Cleanup, Deps, Setter};
pub use instance::{empty_props, ComponentInstance, InstanceId, Props};
pub use mount::{mount, mount_with, mounted_roots, Container, MaterializeContext, Materializer};
pub use options::{MountOptions, TemplateOptions, DEFAULT_LIBRARY_TAG, DEFAULT_MAX_RENDER_PASSES};
pub use parse::{
    compile_template, compile_template_str, compile_template_str_with, compile_template_with,
};
pub use placeholder::{substitute, Placeholder, PlaceholderTable, Value};
pub use vnode::{build_vnode, Callback, Child, Event, Rendered, VNode, VNodeProps};
