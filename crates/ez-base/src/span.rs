//! Source location tracking for error reporting.
//!
//! A [`Span`] represents a contiguous region of source text using byte
//! offsets. Every token, AST node, and diagnostic in ez carries a span,
//! enabling precise error messages that point to the exact location of a
//! problem.
//!
//! Spans use byte offsets, not character indices, matching Rust's string
//! slicing semantics: `&source[span.start..span.end]` extracts the text.

/// A byte-offset range in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Byte offset of the first character (inclusive).
    pub start: usize,
    /// Byte offset past the last character (exclusive).
    pub end: usize,
}

impl Span {
    /// Creates a span from byte offsets. No validation is performed.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Creates a span covering from the start of `self` to the end of `other`.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Returns the length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if this span covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Converts this byte-offset span to a 1-based (line, column) pair,
    /// given the full source text it was taken from.
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let mut line = 1usize;
        let mut line_start = 0usize;
        for (i, c) in source.char_indices() {
            if i >= self.start {
                break;
            }
            if c == '\n' {
                line += 1;
                line_start = i + 1;
            }
        }
        let col = self.start.saturating_sub(line_start) + 1;
        (line, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_new_stores_positions() {
        let span = Span::new(5, 10);
        assert_eq!(span.start, 5);
        assert_eq!(span.end, 10);
    }

    #[test]
    fn span_merge_combines_ranges() {
        let a = Span::new(5, 10);
        let b = Span::new(8, 15);
        let merged = a.merge(b);
        assert_eq!(merged.start, 5);
        assert_eq!(merged.end, 15);
    }

    #[test]
    fn span_len_and_empty() {
        let span = Span::new(5, 10);
        assert_eq!(span.len(), 5);
        assert!(!span.is_empty());
        assert!(Span::new(5, 5).is_empty());
    }

    #[test]
    fn line_col_tracks_newlines() {
        let source = "let x = 1\nlet y = 2\n";
        let span = Span::new(11, 14);
        assert_eq!(span.line_col(source), (2, 1));
    }

    #[test]
    fn line_col_first_line() {
        let source = "abc";
        assert_eq!(Span::new(1, 2).line_col(source), (1, 2));
    }
}
