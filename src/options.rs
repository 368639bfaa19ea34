//! Transform configuration.

use crate::error::{CompilerError, Result, ERR_OPTIONS};
use serde::{Deserialize, Serialize};

/// Names of the runtime entry points the emitted code calls into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeNames {
    /// Global runtime object: `Flint.view`, `Flint.style`, `Flint.el`, ...
    pub global: String,
    /// Per-component handle, first parameter of every component body.
    pub view_handle: String,
    /// Event subscription handle, second parameter of every component body.
    pub event_handle: String,
    /// Per-iteration index bound by `repeat`.
    pub index_binding: String,
    /// Property of the view handle holding dynamic styles.
    pub style_registry: String,
    /// Property of the style registry holding static styles.
    pub static_registry: String,
}

impl Default for RuntimeNames {
    fn default() -> Self {
        Self {
            global: "Flint".to_string(),
            view_handle: "__".to_string(),
            event_handle: "on".to_string(),
            index_binding: "_index".to_string(),
            style_registry: "$".to_string(),
            static_registry: "_static".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    pub file_path: String,
    pub typescript: bool,
    pub runtime: RuntimeNames,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            file_path: "<anonymous>".to_string(),
            typescript: false,
            runtime: RuntimeNames::default(),
        }
    }
}

impl TransformOptions {
    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = file_path.into();
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            CompilerError::new(
                ERR_OPTIONS,
                &format!("Invalid transform options: {}", e),
                "<options>",
                e.line() as u32,
                e.column() as u32,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let opts =
            TransformOptions::from_json(r#"{"filePath":"app.js","runtime":{"global":"Rt"}}"#)
                .unwrap();
        assert_eq!(opts.file_path, "app.js");
        assert!(!opts.typescript);
        assert_eq!(opts.runtime.global, "Rt");
        assert_eq!(opts.runtime.view_handle, "__");
        assert_eq!(opts.runtime.index_binding, "_index");
    }

    #[test]
    fn malformed_json_is_config_error() {
        let err = TransformOptions::from_json("{ filePath: ").unwrap_err();
        assert_eq!(err.code, ERR_OPTIONS);
        assert_eq!(err.file, "<options>");
    }
}
