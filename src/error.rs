//! Diagnostics for the RT compiler.
//!
//! Parse and resolution failures are fatal for the input being compiled and
//! carry the line/column of the offending span. Directive warnings are
//! collected on the output and never stop compilation.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::ir::SourceLocation;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_UNTERMINATED_TAG: &str = "RT-PARSE-001";
pub const ERR_MISMATCHED_CLOSE: &str = "RT-PARSE-002";
pub const ERR_UNCLOSED_ELEMENT: &str = "RT-PARSE-003";
pub const ERR_UNTERMINATED_EXPRESSION: &str = "RT-PARSE-004";
pub const ERR_MALFORMED_EXPRESSION: &str = "RT-PARSE-005";
pub const ERR_UNTERMINATED_COMMENT: &str = "RT-PARSE-006";
pub const ERR_MALFORMED_ATTRIBUTE: &str = "RT-PARSE-007";
pub const ERR_EMBEDDED_INTERPOLATION: &str = "RT-PARSE-008";

pub const ERR_NO_ROOT: &str = "RT-RESOLVE-001";
pub const ERR_MULTIPLE_ROOTS: &str = "RT-RESOLVE-002";
pub const ERR_CONFLICTING_IMPORT: &str = "RT-RESOLVE-003";
pub const ERR_DUPLICATE_PROP_TEMPLATE: &str = "RT-RESOLVE-004";
pub const ERR_INVALID_REPEAT: &str = "RT-RESOLVE-005";
pub const ERR_INVALID_SCOPE: &str = "RT-RESOLVE-006";
pub const ERR_INVALID_IMPORT: &str = "RT-RESOLVE-007";
pub const ERR_INVALID_TEMPLATE: &str = "RT-RESOLVE-008";
pub const ERR_INVALID_VIRTUAL: &str = "RT-RESOLVE-009";
pub const ERR_INVALID_HANDLER: &str = "RT-RESOLVE-010";
pub const ERR_DUPLICATE_DIRECTIVE: &str = "RT-RESOLVE-011";
pub const ERR_INVALID_TAG: &str = "RT-RESOLVE-012";

pub const ERR_MISSING_NAME: &str = "RT-CONFIG-001";
pub const ERR_INVALID_OPTIONS: &str = "RT-CONFIG-002";

pub const WARN_UNKNOWN_DIRECTIVE: &str = "RT-WARN-001";
pub const WARN_MISPLACED_DIRECTIVE: &str = "RT-WARN-002";
pub const WARN_UNEMITTED_IMPORT: &str = "RT-WARN-003";

// ═══════════════════════════════════════════════════════════════════════════════
// HINTS
// ═══════════════════════════════════════════════════════════════════════════════

fn get_hint(code: &str) -> Option<&'static str> {
    match code {
        ERR_MISMATCHED_CLOSE => Some("Every opened tag must be closed in reverse order."),
        ERR_UNCLOSED_ELEMENT => Some("Close the element or write it as <tag />."),
        ERR_UNTERMINATED_EXPRESSION => Some("Every '{' opening an expression needs a matching '}'."),
        ERR_NO_ROOT | ERR_MULTIPLE_ROOTS => {
            Some("A template renders exactly one root element; wrap siblings in a container.")
        }
        ERR_CONFLICTING_IMPORT => {
            Some("Each local name may be imported once; rename one of the aliases with 'as'.")
        }
        ERR_DUPLICATE_PROP_TEMPLATE => {
            Some("A component accepts at most one template per prop.")
        }
        ERR_INVALID_REPEAT => Some("Use rt-repeat=\"item in collection\" or \"item, index in collection\"."),
        ERR_INVALID_SCOPE => Some("Use rt-scope=\"expression as alias; other as alias2\"."),
        ERR_INVALID_HANDLER => {
            Some("Event handlers take a lambda '(p1, p2) => body' or an expression in {}.")
        }
        ERR_MISSING_NAME => Some("Set the 'name' option for the amd and none module formats."),
        ERR_EMBEDDED_INTERPOLATION => {
            Some("Embedded templates are compiled statically; move runtime values into {expressions}.")
        }
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
    pub context: Option<String>,
    pub hints: Vec<String>,
}

impl Diagnostic {
    pub fn new(code: &str, message: impl Into<String>, location: SourceLocation) -> Self {
        Diagnostic {
            code: code.to_string(),
            message: message.into(),
            file: None,
            line: location.line,
            column: location.column,
            context: None,
            hints: get_hint(code).map(str::to_string).into_iter().collect(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn in_file(mut self, file: Option<&str>) -> Self {
        if self.file.is_none() {
            self.file = file.map(str::to_string);
        }
        self
    }

    /// Re-anchor a position computed relative to an embedded region.
    fn shifted(mut self, base: SourceLocation) -> Self {
        if self.line <= 1 {
            self.column = base.column + self.column.saturating_sub(1);
        }
        self.line = base.line + self.line.saturating_sub(1);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} (", self.code, self.message)?;
        if let Some(file) = &self.file {
            write!(f, "{}:", file)?;
        }
        write!(f, "{}:{})", self.line, self.column)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILE ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Malformed markup or embedded expression.
    #[error("parse error {0}")]
    Parse(Diagnostic),
    /// Well-formed markup whose directives, imports or options cannot be resolved.
    #[error("resolution error {0}")]
    Resolution(Diagnostic),
}

pub type CompileResult<T> = Result<T, CompileError>;

impl CompileError {
    pub fn parse(code: &str, message: impl Into<String>, location: SourceLocation) -> Self {
        CompileError::Parse(Diagnostic::new(code, message, location))
    }

    pub fn resolution(code: &str, message: impl Into<String>, location: SourceLocation) -> Self {
        CompileError::Resolution(Diagnostic::new(code, message, location))
    }

    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            CompileError::Parse(d) | CompileError::Resolution(d) => d,
        }
    }

    pub fn code(&self) -> &str {
        &self.diagnostic().code
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(self, CompileError::Parse(_))
    }

    pub(crate) fn with_context(self, context: impl Into<String>) -> Self {
        self.map(|d| d.with_context(context))
    }

    pub(crate) fn in_file(self, file: Option<&str>) -> Self {
        self.map(|d| d.in_file(file))
    }

    pub(crate) fn shifted(self, base: SourceLocation) -> Self {
        self.map(|d| d.shifted(base))
    }

    fn map(self, f: impl FnOnce(Diagnostic) -> Diagnostic) -> Self {
        match self {
            CompileError::Parse(d) => CompileError::Parse(f(d)),
            CompileError::Resolution(d) => CompileError::Resolution(f(d)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIRECTIVE WARNING
// ═══════════════════════════════════════════════════════════════════════════════

/// A non-fatal finding; the offending attribute is passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveWarning {
    pub attribute: String,
    pub diagnostic: Diagnostic,
}

impl DirectiveWarning {
    pub fn new(code: &str, attribute: &str, message: impl Into<String>, location: SourceLocation) -> Self {
        DirectiveWarning {
            attribute: attribute.to_string(),
            diagnostic: Diagnostic::new(code, message, location),
        }
    }

    pub fn code(&self) -> &str {
        &self.diagnostic.code
    }

    pub(crate) fn in_file(mut self, file: Option<&str>) -> Self {
        self.diagnostic = self.diagnostic.in_file(file);
        self
    }

    pub(crate) fn shifted(mut self, base: SourceLocation) -> Self {
        self.diagnostic = self.diagnostic.shifted(base);
        self
    }
}

impl fmt::Display for DirectiveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning {}", self.diagnostic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line: u32, column: u32) -> SourceLocation {
        SourceLocation {
            line,
            column,
            offset: 0,
        }
    }

    #[test]
    fn test_display_includes_code_and_position() {
        let err = CompileError::parse(ERR_MISMATCHED_CLOSE, "Expected </div>", loc(3, 7))
            .in_file(Some("list.rt"));
        assert_eq!(
            err.to_string(),
            "parse error [RT-PARSE-002] Expected </div> (list.rt:3:7)"
        );
        assert!(err.is_parse_error());
        assert_eq!(err.diagnostic().hints.len(), 1);
    }

    #[test]
    fn test_shift_first_line_moves_column() {
        let err = CompileError::parse(ERR_MALFORMED_EXPRESSION, "bad", loc(1, 4)).shifted(loc(10, 20));
        assert_eq!((err.diagnostic().line, err.diagnostic().column), (10, 23));
    }

    #[test]
    fn test_shift_later_line_keeps_column() {
        let err = CompileError::resolution(ERR_NO_ROOT, "none", loc(3, 4)).shifted(loc(10, 20));
        assert_eq!((err.diagnostic().line, err.diagnostic().column), (12, 4));
    }

    #[test]
    fn test_in_file_does_not_override() {
        let err = CompileError::resolution(ERR_NO_ROOT, "none", loc(1, 1))
            .in_file(Some("a.rt"))
            .in_file(Some("b.rt"));
        assert_eq!(err.diagnostic().file.as_deref(), Some("a.rt"));
    }
}
