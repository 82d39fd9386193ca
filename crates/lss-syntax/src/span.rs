//! Source locations

use std::fmt;
use std::ops::Add;
use std::sync::Arc;

use serde::Serialize;

/// A region of a source file
///
/// Synthetic nodes (built by the decompiler) use [`SourceSpan::default`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SourceSpan {
    /// File name, if the source came from a named file
    pub file: Option<Arc<str>>,
    /// Byte offset of the first character
    pub start_offset: usize,
    /// 1-based line of the first character (0 for synthetic spans)
    pub start_line: usize,
    /// Length in bytes
    pub length: usize,
}

impl SourceSpan {
    /// Create a span
    pub fn new(file: Option<Arc<str>>, start_offset: usize, start_line: usize, length: usize) -> Self {
        Self {
            file,
            start_offset,
            start_line,
            length,
        }
    }

    /// Byte offset one past the last character
    #[inline]
    pub fn end_offset(&self) -> usize {
        self.start_offset + self.length
    }

    /// Does this span come from source text
    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.start_line == 0
    }
}

impl Add for SourceSpan {
    type Output = SourceSpan;

    /// Smallest span covering both operands. A synthetic operand yields the other.
    fn add(self, other: SourceSpan) -> SourceSpan {
        if other.is_synthetic() {
            return self;
        }
        if self.is_synthetic() {
            return other;
        }
        let (first, last) = if self.start_offset <= other.start_offset {
            (self, other)
        } else {
            (other, self)
        };
        let end = first.end_offset().max(last.end_offset());
        SourceSpan {
            length: end - first.start_offset,
            ..first
        }
    }
}

impl Add<&SourceSpan> for &SourceSpan {
    type Output = SourceSpan;

    fn add(self, other: &SourceSpan) -> SourceSpan {
        self.clone() + other.clone()
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{file}:{}", self.start_line),
            None => write!(f, "line {}", self.start_line),
        }
    }
}
