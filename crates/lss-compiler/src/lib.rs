//! # LSS Compiler
//!
//! Lowers parsed LSS units into an [`OsiFile`](osi_bytecode::OsiFile).
//!
//! A session first registers every global, function and class across all
//! units, so declarations may be used before (or in another file than) the
//! place they are written. Bodies are then compiled one subroutine at a time;
//! a semantic error fails that subroutine only, the rest are still compiled
//! so that every problem is reported in one pass.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod codegen;
pub mod compiler;
pub mod error;
mod expression;
pub mod hierarchy;
pub mod link;
pub mod scope;
pub mod settings;
pub mod subroutine;

pub use compiler::{Compilation, Compiler, compile, compile_files, compile_source, compile_source_with, compile_units};
pub use error::{CompileError, CompileResult};
pub use expression::{array_builtin, binary_instruction, builtin_instruction, integer_instruction};
pub use scope::{ScopeChain, Variable};
pub use settings::CompilerSettings;
