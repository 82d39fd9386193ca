//! # LSS Syntax
//!
//! Front end of the LSS toolchain: scanner, parser, syntax tree, pretty
//! printer and diagnostics.
//!
//! Lexical and syntax errors never abort processing. They are collected as
//! [`Diagnostic`] values while the scanner and parser keep going, so callers
//! always receive a (possibly partial) [`ParsedUnit`].

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod ast;
pub mod diagnostic;
pub mod parser;
pub mod printer;
pub mod scanner;
pub mod span;
pub mod token;

pub use ast::{Block, ClassDecl, Expression, ParsedUnit, Statement, Subroutine};
pub use diagnostic::{Diagnostic, Severity};
pub use parser::{Parser, parse};
pub use printer::PrettyPrinter;
pub use scanner::{Scanner, scan};
pub use span::SourceSpan;
pub use token::{Token, TokenKind};

/// Scan and parse a source text
///
/// Lexical diagnostics come first, followed by syntax diagnostics.
pub fn parse_source(source: &str, filename: Option<&str>) -> (ParsedUnit, Vec<Diagnostic>) {
    let (tokens, mut diagnostics) = scan(source, filename, false);
    let (unit, syntax) = parse(tokens);
    diagnostics.extend(syntax);
    (unit, diagnostics)
}
