//! Bytecode operands

use std::fmt;

use serde::{Deserialize, Serialize};

/// Flag bit marking a slot as an index into the OSI global table
pub const GLOBAL_SLOT_FLAG: u16 = 0x8000;

/// Variable slot: a local index, or a global index with [`GLOBAL_SLOT_FLAG`] set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Slot(pub u16);

impl Slot {
    /// Create a local slot
    #[inline]
    pub const fn local(index: u16) -> Self {
        Self(index)
    }

    /// Create a slot referring to the global table
    #[inline]
    pub const fn global(index: u16) -> Self {
        Self(index | GLOBAL_SLOT_FLAG)
    }

    /// Does this slot address the global table
    #[inline]
    pub const fn is_global(self) -> bool {
        self.0 & GLOBAL_SLOT_FLAG != 0
    }

    /// Index with the global flag stripped
    #[inline]
    pub const fn index(self) -> u16 {
        self.0 & !GLOBAL_SLOT_FLAG
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_global() {
            write!(f, "global[{}]", self.index())
        } else {
            write!(f, "local[{}]", self.index())
        }
    }
}

/// Index into the symbol table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SymbolIndex(pub u16);

impl SymbolIndex {
    /// Create a new symbol index
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Get index value
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }
}

/// Index into the string table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct StringIndex(pub u16);

impl StringIndex {
    /// Create a new string index
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Get index value
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }
}

/// Relative branch distance in bytes, measured from the end of the branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct BranchOffset(pub i16);

impl BranchOffset {
    /// Create a new branch offset
    #[inline]
    pub const fn new(offset: i16) -> Self {
        Self(offset)
    }

    /// Get offset value
    #[inline]
    pub const fn offset(self) -> i16 {
        self.0
    }
}

/// Absolute byte offset into the container's code segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct CodeOffset(pub u32);

impl CodeOffset {
    /// Create a new code offset
    #[inline]
    pub const fn new(offset: u32) -> Self {
        Self(offset)
    }

    /// Get offset value
    #[inline]
    pub const fn offset(self) -> u32 {
        self.0
    }
}
