//! # LSS Decompiler
//!
//! Rebuilds LSS declarations from an [`OsiFile`](osi_bytecode::OsiFile).
//!
//! Each subroutine is decoded on its own: the operand stack is simulated with
//! source expressions in place of values, branches are matched against the
//! shapes the compiler emits for `if`, `while` and `do-while`, and a few
//! clean-up passes restore `foreach` loops and `var` declarations. Classes get
//! their base class back through member-set inclusion.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod control_flow;
pub mod decompiler;
pub mod error;
pub mod inherit;
mod passes;
mod simulate;
pub mod project;
pub mod stack;

pub use decompiler::{Decompilation, DecompileFailure, decompile, decompile_function, decompile_method, decompile_path};
pub use error::{DecompileError, DecompileResult};
pub use inherit::{ClassShape, infer_hierarchy};
pub use project::project;
pub use simulate::{binary_operator, builtin_keyword};
