//! Source locations for parse errors.
//!
//! Maps byte offsets back to 1-based line and column numbers and renders
//! the offending line with a caret marker underneath.

use crate::PositionedParseError;
use rowan::{TextRange, TextSize};

/// Line and column lookup for one piece of source text.
#[derive(Debug, Clone)]
pub struct Locator<'a> {
    text: &'a str,
    /// Byte offset of the start of every line.
    line_starts: Vec<usize>,
}

impl<'a> Locator<'a> {
    /// Index the line starts of `text`.
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.char_indices()
                .filter(|&(_, c)| c == '\n')
                .map(|(i, _)| i + 1),
        );
        Self { text, line_starts }
    }

    /// 1-based line and column of a byte offset. Columns count characters.
    pub fn location(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        let start = self.line_starts[line];
        let column = self.text[start..offset].chars().count();
        (line + 1, column + 1)
    }

    /// Build a positioned error at `offset`, spanning `len` bytes.
    pub fn error_at(
        &self,
        message: impl Into<String>,
        offset: usize,
        len: usize,
    ) -> PositionedParseError {
        let offset = offset.min(self.text.len());
        let end = (offset + len).min(self.text.len());
        let (line, column) = self.location(offset);
        PositionedParseError {
            message: message.into(),
            range: TextRange::new(TextSize::from(offset as u32), TextSize::from(end as u32)),
            line,
            column,
        }
    }

    /// Render the line containing `range` with a caret marker below it.
    pub fn snippet(&self, range: TextRange) -> String {
        let start = usize::from(range.start()).min(self.text.len());
        let end = usize::from(range.end()).min(self.text.len()).max(start);

        let line_start = self.text[..start].rfind('\n').map_or(0, |i| i + 1);
        let line_end = self.text[start..]
            .find('\n')
            .map_or(self.text.len(), |i| start + i);
        let line = self.text[line_start..line_end].trim_end_matches('\r');

        let indent = self.text[line_start..start].chars().count();
        let width = self.text[start..end.min(line_end)].chars().count().max(1);
        format!("{}\n{}{}", line, " ".repeat(indent), "^".repeat(width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location() {
        let locator = Locator::new("foo: bar\nbaz: qux\n");
        assert_eq!(locator.location(0), (1, 1));
        assert_eq!(locator.location(4), (1, 5));
        assert_eq!(locator.location(9), (2, 1));
        assert_eq!(locator.location(14), (2, 6));
        assert_eq!(locator.location(100), (3, 1));
    }

    #[test]
    fn test_location_counts_characters() {
        let locator = Locator::new("name: héllo: x\n");
        assert_eq!(locator.location("name: héllo".len()), (1, 12));
    }

    #[test]
    fn test_error_at() {
        let locator = Locator::new("a: 1\nb: c: d\n");
        let err = locator.error_at("mapping values are not allowed in this context", 9, 1);
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 5);
        assert_eq!(err.range, TextRange::new(9.into(), 10.into()));
    }

    #[test]
    fn test_context_snippet() {
        let locator = Locator::new("foo: bar\nbaz qux\nend");
        let snippet = locator.snippet(TextRange::new(TextSize::from(13), TextSize::from(16)));
        assert_eq!(snippet, "baz qux\n    ^^^");
    }

    #[test]
    fn test_snippet_at_end_of_input() {
        let locator = Locator::new("key: 'open");
        let snippet = locator.snippet(TextRange::new(TextSize::from(10), TextSize::from(10)));
        assert_eq!(snippet, "key: 'open\n          ^");
    }
}
