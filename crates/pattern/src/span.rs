//! Source location tracking for diagnostics.
//!
//! The compiler collaborator annotates every instruction with the position
//! quadruple of the source construct it came from. Spans ride along through
//! execution so that syntax errors raised at run time point back at the
//! pattern author's text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Source position of a compiled instruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// 1-based source line.
    pub line: u32,
    /// 1-based source column.
    pub col: u32,
    /// Byte offset of the construct's start.
    pub offset: u32,
    /// Byte length of the construct.
    pub len: u32,
}

impl Span {
    /// Create a new span.
    pub fn new(line: u32, col: u32, offset: u32, len: u32) -> Self {
        Self {
            line,
            col,
            offset,
            len,
        }
    }

    /// A zero-length span at the start of the source.
    pub fn zero() -> Self {
        Self::new(1, 1, 0, 0)
    }

    /// Check if this span covers no source text.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_line_col() {
        let span = Span::new(3, 14, 42, 5);
        assert_eq!(span.to_string(), "3:14");
    }

    #[test]
    fn zero_span_is_empty() {
        assert!(Span::zero().is_empty());
        assert!(!Span::new(1, 1, 0, 2).is_empty());
    }
}
