//! # OSI Bytecode
//!
//! This crate defines the OSI bytecode container consumed by the game's
//! scripting runtime and produced by the LSS compiler.
//!
//! ## Design Principles
//!
//! - **Stack-based**: every instruction pops its operands from and pushes its
//!   result onto a single operand stack
//! - **Sized**: each instruction has a fixed encoded size derived from its
//!   opcode, so branch distances can be computed before encoding
//! - **Interned**: strings, symbols and global names live in append-only tables
//!   and are referenced by 16-bit index

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod file;
pub mod function;
pub mod instruction;
pub mod operand;
pub mod table;

pub use error::{BytecodeError, Result};
pub use file::OsiFile;
pub use function::{ClassInfo, FunctionInfo, MethodInfo};
pub use instruction::{Instruction, Opcode};
pub use operand::{BranchOffset, CodeOffset, Slot, StringIndex, SymbolIndex};
pub use table::NameTable;

/// Magic bytes at the start of every serialized OSI container
pub const OSI_MAGIC: [u8; 4] = *b"OSI\0";

/// Default major version written by the compiler
pub const DEFAULT_VERSION_MAJOR: u16 = 4;

/// Default minor version written by the compiler
pub const DEFAULT_VERSION_MINOR: u16 = 1;
