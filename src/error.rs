//! Compiler diagnostics.
//!
//! The transform itself never fails: malformed shapes pass through unchanged.
//! The only fatal conditions are a source the parser rejects and an options
//! payload that cannot be decoded.

#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

/// The parser reported at least one error.
pub const ERR_SYNTAX: &str = "FLINT-ERR-SYNTAX-001";
/// The parser gave up before producing a program.
pub const ERR_PARSER_PANIC: &str = "FLINT-ERR-SYNTAX-002";
/// Options JSON could not be decoded.
pub const ERR_OPTIONS: &str = "FLINT-ERR-CONFIG-001";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
#[error("{code}: {message} ({file}:{line}:{column})")]
pub struct CompilerError {
    pub code: String,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub hints: Vec<String>,
}

pub type Result<T> = std::result::Result<T, CompilerError>;

impl CompilerError {
    pub fn new(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        CompilerError {
            code: code.to_string(),
            message: message.to_string(),
            file: file.to_string(),
            line,
            column,
            hints: vec![],
        }
    }

    /// Builds an error located at a byte offset of `source`.
    pub fn at_offset(code: &str, message: &str, file: &str, source: &str, offset: usize) -> Self {
        let (line, column) = line_column(source, offset);
        Self::new(code, message, file, line, column)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }
}

/// 1-based line and column of a byte offset. Offsets past the end clamp to the last position.
pub fn line_column(source: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut column = 1u32;
    for (index, ch) in source.char_indices() {
        if index >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_column_counts_from_one() {
        let src = "view A {\n  let x = 1\n}";
        assert_eq!(line_column(src, 0), (1, 1));
        assert_eq!(line_column(src, 9), (2, 1));
        assert_eq!(line_column(src, 13), (2, 5));
        assert_eq!(line_column(src, 1000), (3, 2));
    }

    #[test]
    fn display_includes_code_and_location() {
        let err = CompilerError::new(ERR_SYNTAX, "Unexpected token", "app.js", 3, 7)
            .with_hint("Did you close the view?");
        assert_eq!(
            err.to_string(),
            "FLINT-ERR-SYNTAX-001: Unexpected token (app.js:3:7)"
        );
        assert_eq!(err.hints, vec!["Did you close the view?".to_string()]);
    }

    #[test]
    fn serializes_camel_case() {
        let err = CompilerError::new(ERR_OPTIONS, "bad", "x.js", 1, 1);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "FLINT-ERR-CONFIG-001");
        assert!(json["hints"].as_array().unwrap().is_empty());
    }
}
