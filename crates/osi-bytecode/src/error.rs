//! Bytecode errors

use thiserror::Error;

/// Errors that can occur during bytecode operations
#[derive(Debug, Error)]
pub enum BytecodeError {
    /// Invalid magic bytes in an OSI container
    #[error("Invalid magic bytes")]
    InvalidMagic,

    /// Invalid opcode
    #[error("Invalid opcode 0x{opcode:02X} at offset {offset}")]
    InvalidOpcode {
        /// The raw opcode byte
        opcode: u8,
        /// Byte offset of the instruction
        offset: usize,
    },

    /// Unexpected end of bytecode
    #[error("Unexpected end of bytecode at offset {0}")]
    UnexpectedEnd(usize),

    /// A name table ran out of 16-bit indices
    #[error("Name table is full (max 65535 entries)")]
    TableFull,

    /// Table index outside the table
    #[error("Index {index} is out of range for the {table} table")]
    IndexOutOfRange {
        /// Which table was indexed
        table: &'static str,
        /// The offending index
        index: u16,
    },

    /// Static call placeholder left in an instruction stream
    #[error("Unresolved call to '{0}' cannot be encoded")]
    UnresolvedCall(String),

    /// Container text is not valid UTF-8
    #[error("Invalid UTF-8 in name at offset {0}")]
    InvalidUtf8(usize),

    /// A section holds more items than its length prefix can express
    #[error("Too many entries in {0}")]
    TooLarge(&'static str),

    /// IO error during serialization
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON view failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for bytecode operations
pub type Result<T> = std::result::Result<T, BytecodeError>;
