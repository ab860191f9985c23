//! Byte ranges into statement text.

use serde::Serialize;

/// A byte range in the statement being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Slices the covered text out of `source`.
    #[must_use]
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_slice() {
        let sql = "DEFAULT (uuid())";
        assert_eq!(Span::new(8, 16).slice(sql), "(uuid())");
        assert_eq!(Span::new(8, 99).slice(sql), "");
    }
}
