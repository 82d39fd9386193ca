//! Interned name tables (strings, symbols, globals)

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{BytecodeError, Result};

/// Append-only, deduplicated table of names
///
/// The position of an entry is its encoding in bytecode, so entries are never
/// removed or reordered once interned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct NameTable {
    entries: Vec<String>,
    index: FxHashMap<String, u16>,
}

impl NameTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a name, returning its index
    ///
    /// Returns the existing index if the name is already present.
    pub fn intern(&mut self, name: &str) -> Result<u16> {
        if let Some(&idx) = self.index.get(name) {
            return Ok(idx);
        }

        let idx = u16::try_from(self.entries.len()).map_err(|_| BytecodeError::TableFull)?;
        if idx == u16::MAX {
            return Err(BytecodeError::TableFull);
        }
        self.entries.push(name.to_string());
        self.index.insert(name.to_string(), idx);
        Ok(idx)
    }

    /// Look up an existing entry without interning
    pub fn find(&self, name: &str) -> Option<u16> {
        self.index.get(name).copied()
    }

    /// Get the name at an index
    pub fn get(&self, index: u16) -> Option<&str> {
        self.entries.get(index as usize).map(String::as_str)
    }

    /// Get the name at an index, or an error naming the table
    pub fn resolve(&self, table: &'static str, index: u16) -> Result<&str> {
        self.get(index)
            .ok_or(BytecodeError::IndexOutOfRange { table, index })
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the table empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in index order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for NameTable {
    /// Later duplicates keep the index of their first occurrence
    fn from(entries: Vec<String>) -> Self {
        let mut index = FxHashMap::default();
        for (i, name) in entries.iter().enumerate() {
            index.entry(name.clone()).or_insert(i as u16);
        }
        Self { entries, index }
    }
}

impl From<NameTable> for Vec<String> {
    fn from(table: NameTable) -> Self {
        table.entries
    }
}

impl PartialEq for NameTable {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for NameTable {}
