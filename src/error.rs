use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_INVALID_HOOK_CONTEXT: &str = "HOOK001";
pub const ERR_HOOK_ORDER_MISMATCH: &str = "HOOK002";
pub const ERR_RENDER_LOOP: &str = "HOOK003";
pub const ERR_TEMPLATE_PARSE: &str = "TPL001";
pub const ERR_UNRESOLVED_PLACEHOLDER: &str = "TPL002";
pub const ERR_MATERIALIZE: &str = "MNT001";

/// Every failure the runtime and the template compiler can surface.
///
/// All of them are synchronous and reach the caller of the hook, of
/// `compile_template`, or of `mount` / the state setter that triggered the render.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("`{hook}` must be called while a component is rendering")]
    InvalidHookContext { hook: &'static str },

    #[error("hook #{index} changed between renders (expected a {expected} hook); hooks must be called in the same order on every render")]
    HookOrderMismatch { index: usize, expected: &'static str },

    #[error("component re-rendered more than {limit} times in one update; a state setter is probably called unconditionally during render")]
    RenderLoop { limit: usize },

    #[error("failed to parse template markup: {0}")]
    TemplateParse(String),

    #[error("template placeholder {id} has no recorded value")]
    UnresolvedPlaceholder { id: usize },

    #[error("failed to materialize node: {0}")]
    Materialize(String),
}

impl Error {
    /// Stable code for the error kind, suitable for matching in host code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidHookContext { .. } => ERR_INVALID_HOOK_CONTEXT,
            Error::HookOrderMismatch { .. } => ERR_HOOK_ORDER_MISMATCH,
            Error::RenderLoop { .. } => ERR_RENDER_LOOP,
            Error::TemplateParse(_) => ERR_TEMPLATE_PARSE,
            Error::UnresolvedPlaceholder { .. } => ERR_UNRESOLVED_PLACEHOLDER,
            Error::Materialize(_) => ERR_MATERIALIZE,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
