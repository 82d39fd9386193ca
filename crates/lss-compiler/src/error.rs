//! Compilation errors

use lss_syntax::{Diagnostic, SourceSpan};
use osi_bytecode::BytecodeError;
use thiserror::Error;

/// Semantic errors; each one fails the subroutine being compiled
#[derive(Debug, Error)]
pub enum CompileError {
    /// Name not found in any scope nor in the global table
    #[error("Undefined variable '{name}'")]
    UndefinedVariable {
        /// Variable name
        name: String,
        /// Source location
        span: SourceSpan,
    },

    /// Call to an unknown function or method
    #[error("Undefined function '{name}'")]
    UndefinedFunction {
        /// Function name
        name: String,
        /// Source location
        span: SourceSpan,
    },

    /// Reference to an unknown class
    #[error("Undefined class '{name}'")]
    UndefinedClass {
        /// Class name
        name: String,
        /// Source location
        span: SourceSpan,
    },

    /// Name declared twice in one scope
    #[error("Variable '{name}' is already declared in this scope")]
    DuplicateVariable {
        /// Variable name
        name: String,
        /// Source location
        span: SourceSpan,
    },

    /// Function declared twice
    #[error("Function '{name}' is already declared")]
    DuplicateFunction {
        /// Function name
        name: String,
        /// Source location
        span: SourceSpan,
    },

    /// Class declared twice
    #[error("Class '{name}' is already declared")]
    DuplicateClass {
        /// Class name
        name: String,
        /// Source location
        span: SourceSpan,
    },

    /// Call with the wrong number of arguments
    #[error("'{name}' expects {expected} argument(s), got {found}")]
    WrongArgumentCount {
        /// Called name
        name: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        found: usize,
        /// Source location
        span: SourceSpan,
    },

    /// Numeric literal that no push instruction can encode
    #[error("Literal '{text}' is out of range")]
    LiteralOutOfRange {
        /// Literal text
        text: String,
        /// Source location
        span: SourceSpan,
    },

    /// Assignment to something that is not a place
    #[error("Expression cannot be assigned to")]
    NotAssignable {
        /// Source location
        span: SourceSpan,
    },

    /// `this` outside an instance method
    #[error("'this' is only available inside class methods")]
    InvalidThis {
        /// Source location
        span: SourceSpan,
    },

    /// Call of an expression that does not name a function
    #[error("Expression cannot be called")]
    InvalidCallTarget {
        /// Source location
        span: SourceSpan,
    },

    /// Left side of `::` is not a namespace name
    #[error("Expected a namespace name before '::'")]
    InvalidNamespace {
        /// Source location
        span: SourceSpan,
    },

    /// Class inherits from itself, directly or not
    #[error("Class '{name}' inherits from itself")]
    InheritanceCycle {
        /// Class name
        name: String,
        /// Source location
        span: SourceSpan,
    },

    /// More locals than a slot operand can address
    #[error("Too many local variables in '{name}'")]
    TooManyLocals {
        /// Subroutine name
        name: String,
        /// Source location
        span: SourceSpan,
    },

    /// More arguments or elements than the operand can encode
    #[error("Too many arguments or elements")]
    TooManyArguments {
        /// Source location
        span: SourceSpan,
    },

    /// Branch distance does not fit the 16-bit offset
    #[error("Control structure is too large to branch over")]
    BranchTooFar {
        /// Source location
        span: SourceSpan,
    },

    /// Source file could not be read
    #[error("Cannot read '{path}': {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Bytecode model error (for example a full name table)
    #[error(transparent)]
    Bytecode(#[from] BytecodeError),

    /// Internal compiler error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CompileError {
    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an undefined variable error
    pub fn undefined_variable(name: impl Into<String>, span: SourceSpan) -> Self {
        Self::UndefinedVariable {
            name: name.into(),
            span,
        }
    }

    /// Create an undefined function error
    pub fn undefined_function(name: impl Into<String>, span: SourceSpan) -> Self {
        Self::UndefinedFunction {
            name: name.into(),
            span,
        }
    }

    /// Create an undefined class error
    pub fn undefined_class(name: impl Into<String>, span: SourceSpan) -> Self {
        Self::UndefinedClass {
            name: name.into(),
            span,
        }
    }

    /// Create an argument count error
    pub fn wrong_argument_count(name: impl Into<String>, expected: usize, found: usize, span: SourceSpan) -> Self {
        Self::WrongArgumentCount {
            name: name.into(),
            expected,
            found,
            span,
        }
    }

    /// Stable diagnostic code
    pub fn code(&self) -> &'static str {
        match self {
            Self::UndefinedVariable { .. } => "C001",
            Self::UndefinedFunction { .. } => "C002",
            Self::UndefinedClass { .. } => "C003",
            Self::DuplicateVariable { .. } => "C004",
            Self::DuplicateFunction { .. } => "C005",
            Self::DuplicateClass { .. } => "C006",
            Self::WrongArgumentCount { .. } => "C007",
            Self::LiteralOutOfRange { .. } => "C008",
            Self::NotAssignable { .. } => "C009",
            Self::InvalidThis { .. } => "C010",
            Self::InvalidCallTarget { .. } => "C011",
            Self::InvalidNamespace { .. } => "C012",
            Self::InheritanceCycle { .. } => "C013",
            Self::TooManyLocals { .. } => "C014",
            Self::TooManyArguments { .. } => "C015",
            Self::BranchTooFar { .. } => "C016",
            Self::Io { .. } => "C017",
            Self::Bytecode(_) => "C090",
            Self::Internal(_) => "C099",
        }
    }

    /// Source location, when the error has one
    pub fn span(&self) -> Option<&SourceSpan> {
        match self {
            Self::UndefinedVariable { span, .. }
            | Self::UndefinedFunction { span, .. }
            | Self::UndefinedClass { span, .. }
            | Self::DuplicateVariable { span, .. }
            | Self::DuplicateFunction { span, .. }
            | Self::DuplicateClass { span, .. }
            | Self::WrongArgumentCount { span, .. }
            | Self::LiteralOutOfRange { span, .. }
            | Self::NotAssignable { span }
            | Self::InvalidThis { span }
            | Self::InvalidCallTarget { span }
            | Self::InvalidNamespace { span }
            | Self::InheritanceCycle { span, .. }
            | Self::TooManyLocals { span, .. }
            | Self::TooManyArguments { span }
            | Self::BranchTooFar { span } => Some(span),
            Self::Io { .. } | Self::Bytecode(_) | Self::Internal(_) => None,
        }
    }

    /// Convert into a source diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.code(), self.to_string(), self.span().cloned().unwrap_or_default())
    }
}

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;
