//! Host-facing configuration.
//!
//! Both structs deserialize from camelCase JSON and fall back to their defaults
//! for missing fields, so a host can ship a partial config object.

use serde::{Deserialize, Serialize};

pub const DEFAULT_LIBRARY_TAG: &str = "hooks";
pub const DEFAULT_MAX_RENDER_PASSES: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateOptions {
    /// Library tag stamped on every node built by the template compiler.
    pub library_tag: String,
    /// Keep whitespace-only text between top-level nodes. Inside elements it is always kept.
    pub keep_whitespace: bool,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            library_tag: DEFAULT_LIBRARY_TAG.to_string(),
            keep_whitespace: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MountOptions {
    pub template: TemplateOptions,
    /// Upper bound on renders per update when state is set during render.
    pub max_render_passes: usize,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            template: TemplateOptions::default(),
            max_render_passes: DEFAULT_MAX_RENDER_PASSES,
        }
    }
}

impl MountOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let opts = MountOptions::from_json(r#"{ "maxRenderPasses": 3 }"#).unwrap();
        assert_eq!(opts.max_render_passes, 3);
        assert_eq!(opts.template.library_tag, DEFAULT_LIBRARY_TAG);
        assert!(!opts.template.keep_whitespace);
    }

    #[test]
    fn test_nested_template_options() {
        let opts =
            MountOptions::from_json(r#"{ "template": { "libraryTag": "ui", "keepWhitespace": true } }"#)
                .unwrap();
        assert_eq!(opts.template.library_tag, "ui");
        assert!(opts.template.keep_whitespace);
        assert_eq!(opts.max_render_passes, DEFAULT_MAX_RENDER_PASSES);
    }
}
