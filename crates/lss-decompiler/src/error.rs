//! Decompilation errors

use osi_bytecode::BytecodeError;
use thiserror::Error;

/// Errors that abort decompiling one subroutine
#[derive(Debug, Error)]
pub enum DecompileError {
    /// An instruction needed more operands than the stack held
    #[error("Stack underflow at instruction {index}")]
    StackUnderflow {
        /// Instruction index
        index: usize,
    },

    /// Instruction that never appears in this position in compiled code
    #[error("Unexpected {instruction} at instruction {index}")]
    UnexpectedInstruction {
        /// Disassembled instruction
        instruction: String,
        /// Instruction index
        index: usize,
    },

    /// Branches that do not form an `if`, `while` or `do-while`
    #[error("Unstructured control flow at instruction {index}")]
    UnstructuredControlFlow {
        /// Instruction index
        index: usize,
    },

    /// Branch into the middle of an instruction or out of the body
    #[error("Branch at instruction {index} has no valid target")]
    InvalidBranchTarget {
        /// Instruction index
        index: usize,
    },

    /// Static call to an offset where no function starts
    #[error("No function starts at code offset {0}")]
    UnknownCallTarget(u32),

    /// Value left on the stack where a statement must end
    #[error("Dangling value at instruction {index}")]
    DanglingValue {
        /// Instruction index
        index: usize,
    },

    /// Function, class or method index past the end of its table
    #[error("No {table} entry at index {index}")]
    MissingEntry {
        /// Table name
        table: &'static str,
        /// Requested index
        index: usize,
    },

    /// Bytecode model error (bad table index and the like)
    #[error(transparent)]
    Bytecode(#[from] BytecodeError),

    /// Projection I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecompileError {
    /// Create an unexpected instruction error
    pub fn unexpected(instruction: &osi_bytecode::Instruction, index: usize) -> Self {
        Self::UnexpectedInstruction {
            instruction: instruction.to_string(),
            index,
        }
    }
}

/// Result type for decompilation
pub type DecompileResult<T> = Result<T, DecompileError>;
