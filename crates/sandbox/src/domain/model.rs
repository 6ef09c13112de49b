//! Domain models for directories, sources, variables, and build diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Name/value substitution pair scoped to a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Variables without a name are editor scratch rows and never reach the store.
    pub fn is_unnamed(&self) -> bool {
        self.name.is_empty()
    }
}

/// Named unit of template text within a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    #[serde(default)]
    pub content: String,
}

impl Source {
    pub const PLACEHOLDER_NAME: &'static str = "new";

    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Fresh source appended by "add source": named `new`, empty content.
    pub fn placeholder() -> Self {
        Self::new(Self::PLACEHOLDER_NAME, "")
    }
}

/// Editable directory owning its sources and variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dir {
    pub path: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub vars: Vec<Variable>,
}

impl Dir {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.vars.push(variable);
        self
    }

    /// First source carrying `name`.
    pub fn source(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|source| source.name == name)
    }

    pub(crate) fn source_mut(&mut self, name: &str) -> Option<&mut Source> {
        self.sources.iter_mut().find(|source| source.name == name)
    }

    pub(crate) fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.vars.iter_mut().find(|variable| variable.name == name)
    }

    /// `path/name` label used in logs and titles.
    pub fn qualified_name(&self, source: &Source) -> String {
        format!("{}/{}", self.path, source.name)
    }
}

/// Zero-based line/column position. Columns count bytes from the line start.
///
/// On the wire the pair is `{x, y}` where `x` is the column and `y` the line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct ErrorCoordinate {
    // Field order matters for the derived ordering: line first, then column.
    #[serde(rename = "y")]
    pub line: usize,
    #[serde(rename = "x")]
    pub column: usize,
}

impl ErrorCoordinate {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for ErrorCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.column, self.line)
    }
}

/// Diagnostic reported by a build-check, anchored to a byte range of the checked text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildError {
    pub start_offset: usize,
    pub end_offset: usize,
    pub start_coordinate: ErrorCoordinate,
    pub end_coordinate: ErrorCoordinate,
    pub message: String,
}

impl BuildError {
    /// Single-line rendering shown in the log: `(<col>,<line>): <message>`.
    pub fn summary(&self) -> String {
        format!("{}: {}", self.start_coordinate, self.message)
    }

    /// Whether the zero-based `line` falls inside the reported range.
    pub fn covers_line(&self, line: usize) -> bool {
        line >= self.start_coordinate.line && line <= self.end_coordinate.line
    }
}

/// Severity of an entry in the editor log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Success,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
            LogLevel::Success => "success",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub timestamp: OffsetDateTime,
    pub text: String,
    pub level: LogLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_use_x_for_column_on_the_wire() {
        let coordinate: ErrorCoordinate = serde_json::from_str(r#"{"x": 4, "y": 2}"#).unwrap();
        assert_eq!(coordinate, ErrorCoordinate::new(2, 4));
        assert_eq!(coordinate.to_string(), "(4,2)");
    }

    #[test]
    fn coordinates_order_by_line_then_column() {
        assert!(ErrorCoordinate::new(0, 9) < ErrorCoordinate::new(1, 0));
        assert!(ErrorCoordinate::new(1, 0) < ErrorCoordinate::new(1, 1));
    }

    #[test]
    fn dir_without_sources_or_vars_deserializes_empty() {
        let dir: Dir = serde_json::from_str(r#"{"path": "a"}"#).unwrap();
        assert_eq!(dir, Dir::new("a"));
    }

    #[test]
    fn qualified_name_joins_path_and_source() {
        let dir = Dir::new("a").with_source(Source::new("x", "hi"));
        assert_eq!(dir.qualified_name(&dir.sources[0]), "a/x");
    }

    #[test]
    fn summary_formats_column_before_line() {
        let error = BuildError {
            start_offset: 4,
            end_offset: 5,
            start_coordinate: ErrorCoordinate::new(1, 1),
            end_coordinate: ErrorCoordinate::new(1, 2),
            message: "unknown variable".into(),
        };
        assert_eq!(error.summary(), "(1,1): unknown variable");
        assert!(error.covers_line(1));
        assert!(!error.covers_line(0));
    }
}
