//! Source diagnostics

use std::fmt;

use serde::Serialize;

use crate::span::SourceSpan;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The input cannot be processed as written
    Error,
    /// Suspicious but accepted input
    Warning,
}

/// A problem found in source text
///
/// Codes are stable: `S…` for lexical, `P…` for syntactic, `C…` for
/// compile-time problems and `W…` for warnings.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{span}: {severity}[{code}]: {message}")]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,
    /// Stable short code
    pub code: &'static str,
    /// Human readable message
    pub message: String,
    /// Where the problem is
    pub span: SourceSpan,
}

impl Diagnostic {
    /// Create an error diagnostic
    pub fn error(code: &'static str, message: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            span,
        }
    }

    /// Create a warning diagnostic
    pub fn warning(code: &'static str, message: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            span,
        }
    }

    /// Is this an error
    #[inline]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        })
    }
}

/// Stable diagnostic codes
pub mod codes {
    /// String literal runs into a newline
    pub const UNTERMINATED_STRING_LINE: &str = "S001";
    /// String literal runs into the end of input
    pub const UNTERMINATED_STRING_EOF: &str = "S002";
    /// Block comment runs into the end of input
    pub const UNTERMINATED_COMMENT: &str = "S003";
    /// Character that starts no token
    pub const UNEXPECTED_CHARACTER: &str = "S004";

    /// Expected an expression
    pub const EXPECTED_EXPRESSION: &str = "P001";
    /// Expected a specific token
    pub const EXPECTED_TOKEN: &str = "P002";
    /// Expected an identifier
    pub const EXPECTED_IDENTIFIER: &str = "P003";
    /// Something other than a declaration at file or class level
    pub const EXPECTED_DECLARATION: &str = "P004";
    /// Declaration keyword inside a subroutine body
    pub const MISPLACED_DECLARATION: &str = "P005";
    /// Too many parameters or arguments for the bytecode encoding
    pub const TOO_MANY_ITEMS: &str = "P006";

    /// `new T` without an argument list on a class that has a constructor
    pub const CONSTRUCTOR_NOT_CALLED: &str = "W001";
}
