//! DSL header recognition.
//!
//! `view Name {` and `style {` are not JavaScript. Before parsing, each header
//! is swapped for a placeholder function declaration header of the same
//! line span, and the original header is recorded in a [`DslTable`]. The
//! dispatcher later expands the placeholder declarations into runtime calls.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

pub const PLACEHOLDER_PREFIX: &str = "__flint$";

lazy_static! {
    /// `view Name {`, `view Name.Sub {`, `style {` at the start of a line.
    static ref DSL_HEADER_RE: Regex = Regex::new(
        r"(?m)^(?P<indent>[ \t]*)(?:view[ \t]+(?P<name>[A-Za-z_$][\w$]*)(?:\.(?P<sub>[A-Za-z_$][\w$]*))?|(?P<style>style))[ \t]*\{"
    )
    .unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DslStatement {
    Component {
        name: String,
        sub_name: Option<String>,
    },
    StyleBlock,
}

impl DslStatement {
    /// `Name` or `Name.Sub`; `None` for style blocks.
    pub fn qualified_name(&self) -> Option<String> {
        match self {
            DslStatement::Component { name, sub_name } => Some(match sub_name {
                Some(sub) => format!("{}.{}", name, sub),
                None => name.clone(),
            }),
            DslStatement::StyleBlock => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DslTable {
    statements: Vec<DslStatement>,
}

impl DslTable {
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn is_placeholder(name: &str) -> bool {
        name.strip_prefix(PLACEHOLDER_PREFIX)
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    }

    pub fn lookup(&self, name: &str) -> Option<&DslStatement> {
        if !Self::is_placeholder(name) {
            return None;
        }
        let ordinal: usize = name[PLACEHOLDER_PREFIX.len()..].parse().ok()?;
        self.statements.get(ordinal)
    }

    fn push(&mut self, statement: DslStatement) -> String {
        let placeholder = format!("{}{}", PLACEHOLDER_PREFIX, self.statements.len());
        self.statements.push(statement);
        placeholder
    }
}

#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub source: String,
    pub table: DslTable,
}

pub fn preprocess(source: &str) -> Preprocessed {
    let mut table = DslTable::default();
    let rewritten = DSL_HEADER_RE.replace_all(source, |caps: &Captures| {
        let statement = if caps.name("style").is_some() {
            DslStatement::StyleBlock
        } else {
            DslStatement::Component {
                name: caps["name"].to_string(),
                sub_name: caps.name("sub").map(|m| m.as_str().to_string()),
            }
        };
        let placeholder = table.push(statement);
        format!("{}function {}() {{", &caps["indent"], placeholder)
    });

    Preprocessed {
        source: rewritten.into_owned(),
        table,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_view_and_style_headers_in_order() {
        let out = preprocess("view Main {\n  let a = 1\n}\nstyle {\n}\nview Main.Item {\n}\n");
        assert_eq!(
            out.source,
            "function __flint$0() {\n  let a = 1\n}\nfunction __flint$1() {\n}\nfunction __flint$2() {\n}\n"
        );
        assert_eq!(out.table.len(), 3);
        assert_eq!(
            out.table.lookup("__flint$0").and_then(|s| s.qualified_name()),
            Some("Main".to_string())
        );
        assert_eq!(out.table.lookup("__flint$1"), Some(&DslStatement::StyleBlock));
        assert_eq!(
            out.table.lookup("__flint$2").and_then(|s| s.qualified_name()),
            Some("Main.Item".to_string())
        );
    }

    #[test]
    fn keeps_indentation_and_line_count() {
        let src = "if (x) {\n    view Nested {\n    }\n}";
        let out = preprocess(src);
        assert_eq!(out.source.lines().count(), src.lines().count());
        assert!(out.source.contains("\n    function __flint$0() {\n"));
    }

    #[test]
    fn ignores_identifiers_that_only_contain_the_keywords() {
        let src = "const view = 1;\npreview Foo {}\nlet styles = {};\n";
        let out = preprocess(src);
        assert_eq!(out.source, src);
        assert!(out.table.is_empty());
    }

    #[test]
    fn placeholder_names_are_strict() {
        assert!(DslTable::is_placeholder("__flint$12"));
        assert!(!DslTable::is_placeholder("__flint$"));
        assert!(!DslTable::is_placeholder("__flint$1a"));
        assert!(!DslTable::is_placeholder("main"));
        assert_eq!(DslTable::default().lookup("__flint$0"), None);
    }
}
