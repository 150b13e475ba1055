//! Streaming document reader.
//!
//! Input is read line by line and cut into chunks at the document markers
//! `---`, `...` and directive lines that start in column 0. Each chunk is
//! parsed on its own, so only one document is held in memory at a time.
//! Comments and blank lines always stay with the chunk before them: a
//! comment above a `---` marker belongs to the preceding document.

use crate::diagnostics::Locator;
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::lex::is_document_marker;
use crate::parse::Parse;
use crate::yaml::{Document, Stream};
use rowan::ast::AstNode;
use std::collections::VecDeque;
use std::io::BufRead;
use tracing::debug;

/// A document together with where it was found in the input.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    document: Document,
    first_line: usize,
}

impl SourceDocument {
    /// The parsed document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// 1-based input line on which the document's text starts, including
    /// any leading comments.
    pub fn first_line(&self) -> usize {
        self.first_line
    }

    /// The manifest identity of the document.
    pub fn identity(&self) -> Identity {
        Identity::from_document(&self.document)
    }

    /// Take the parsed document.
    pub fn into_document(self) -> Document {
        self.document
    }
}

/// How a line of input affects chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineClass {
    /// `---` in column 0
    Start,
    /// `...` in column 0
    End,
    /// `%` in column 0
    Directive,
    /// Blank or comment-only
    Trivia,
    Content,
}

impl LineClass {
    fn of(line: &str) -> Self {
        if is_document_marker(line, "---") {
            return LineClass::Start;
        }
        if is_document_marker(line, "...") {
            return LineClass::End;
        }
        if line.starts_with('%') {
            return LineClass::Directive;
        }
        let rest = line.trim_start_matches([' ', '\t']);
        if rest.trim_end_matches(['\r', '\n']).is_empty() || rest.starts_with('#') {
            LineClass::Trivia
        } else {
            LineClass::Content
        }
    }
}

#[derive(Debug, Default)]
struct Chunk {
    text: String,
    first_line: usize,
    has_start: bool,
    has_content: bool,
    ended: bool,
}

impl Chunk {
    /// Whether a line of class `class` opens the next chunk.
    fn is_split_by(&self, class: LineClass) -> bool {
        if self.text.is_empty() {
            return false;
        }
        match class {
            LineClass::Start | LineClass::Directive => {
                self.has_start || self.has_content || self.ended
            }
            LineClass::Content => self.ended,
            LineClass::End | LineClass::Trivia => false,
        }
    }

    fn push(&mut self, number: usize, class: LineClass, line: &str) {
        if self.text.is_empty() {
            self.first_line = number;
        }
        match class {
            LineClass::Start => self.has_start = true,
            LineClass::End => self.ended = true,
            LineClass::Content => self.has_content = true,
            LineClass::Directive | LineClass::Trivia => {}
        }
        self.text.push_str(line);
    }
}

/// Reads documents one at a time from a buffered input stream.
///
/// The first error ends the stream: afterwards [`DocumentReader::next_document`]
/// returns `Ok(None)`.
pub struct DocumentReader<R> {
    input: R,
    lines_read: usize,
    /// A line that was read but opens the next chunk
    pending: Option<(usize, String)>,
    /// Parsed documents not yet handed out
    ready: VecDeque<SourceDocument>,
    /// Whether the last document was closed with `...`
    previous_ended: bool,
    done: bool,
}

impl<R: BufRead> DocumentReader<R> {
    /// Create a reader over `input`.
    pub fn new(input: R) -> Self {
        Self {
            input,
            lines_read: 0,
            pending: None,
            ready: VecDeque::new(),
            previous_ended: false,
            done: false,
        }
    }

    /// Read and parse the next document.
    ///
    /// Returns `Ok(None)` at the end of the stream. Malformed input gives an
    /// [`Error::Decode`] whose line and column are positions in the whole
    /// stream.
    pub fn next_document(&mut self) -> Result<Option<SourceDocument>> {
        loop {
            if let Some(document) = self.ready.pop_front() {
                return Ok(Some(document));
            }
            if self.done {
                return Ok(None);
            }
            let chunk = match self.read_chunk() {
                Ok(Some(chunk)) => chunk,
                Ok(None) => {
                    self.done = true;
                    return Ok(None);
                }
                Err(err) => {
                    self.done = true;
                    return Err(err);
                }
            };
            if let Err(err) = self.parse_chunk(&chunk) {
                self.done = true;
                return Err(err);
            }
        }
    }

    fn parse_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        let parsed = Parse::<Stream>::parse_chunk(&chunk.text, !self.previous_ended);
        if let Some(err) = parsed.positioned_errors().first() {
            debug!(
                line = chunk.first_line + err.line - 1,
                column = err.column,
                "malformed document:\n{}",
                Locator::new(&chunk.text).snippet(err.range)
            );
            return Err(Error::Decode {
                line: chunk.first_line + err.line - 1,
                column: err.column,
                message: err.message.clone(),
            });
        }
        if let Some(message) = parsed.errors().first() {
            return Err(Error::Decode {
                line: chunk.first_line,
                column: 1,
                message: message.clone(),
            });
        }

        let locator = Locator::new(&chunk.text);
        for document in parsed.tree().documents() {
            let start = usize::from(document.syntax().text_range().start());
            let (line, _) = locator.location(start);
            self.previous_ended = document.has_explicit_end();
            self.ready.push_back(SourceDocument {
                document,
                first_line: chunk.first_line + line - 1,
            });
        }
        Ok(())
    }

    fn read_chunk(&mut self) -> Result<Option<Chunk>> {
        let mut chunk = Chunk::default();
        loop {
            let (number, line) = match self.pending.take() {
                Some(pending) => pending,
                None => match self.read_line()? {
                    Some(line) => line,
                    None => break,
                },
            };
            let class = LineClass::of(&line);
            if chunk.is_split_by(class) {
                self.pending = Some((number, line));
                break;
            }
            chunk.push(number, class, &line);
        }
        Ok((!chunk.text.is_empty()).then_some(chunk))
    }

    fn read_line(&mut self) -> Result<Option<(usize, String)>> {
        let mut buf = Vec::new();
        if self.input.read_until(b'\n', &mut buf).map_err(Error::Read)? == 0 {
            return Ok(None);
        }
        self.lines_read += 1;
        let number = self.lines_read;

        let mut line = String::from_utf8(buf).map_err(|err| {
            let utf8_error = err.utf8_error();
            let valid = &err.as_bytes()[..utf8_error.valid_up_to()];
            let column = std::str::from_utf8(valid).map_or(0, |text| text.chars().count()) + 1;
            let message = match utf8_error.error_len() {
                Some(_) => "invalid leading UTF-8 octet",
                None => "incomplete UTF-8 octet sequence",
            };
            Error::Decode {
                line: number,
                column,
                message: message.to_string(),
            }
        })?;
        if number == 1 && line.starts_with('\u{feff}') {
            line.drain(..'\u{feff}'.len_utf8());
        }
        Ok(Some((number, line)))
    }
}

impl<R: BufRead> Iterator for DocumentReader<R> {
    type Item = Result<SourceDocument>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_document().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Read};

    fn read_all(text: &str) -> Vec<(usize, String)> {
        DocumentReader::new(Cursor::new(text.as_bytes()))
            .map(|document| {
                let document = document.unwrap();
                (document.first_line(), document.document().to_string())
            })
            .collect()
    }

    fn read_error(text: &[u8]) -> Error {
        DocumentReader::new(Cursor::new(text))
            .find_map(|document| document.err())
            .unwrap()
    }

    #[test]
    fn test_line_classes() {
        assert_eq!(LineClass::of("---\n"), LineClass::Start);
        assert_eq!(LineClass::of("--- a\n"), LineClass::Start);
        assert_eq!(LineClass::of("---a\n"), LineClass::Content);
        assert_eq!(LineClass::of("...\r\n"), LineClass::End);
        assert_eq!(LineClass::of("%YAML 1.2\n"), LineClass::Directive);
        assert_eq!(LineClass::of("  # note\n"), LineClass::Trivia);
        assert_eq!(LineClass::of("   \n"), LineClass::Trivia);
        assert_eq!(LineClass::of("  ---\n"), LineClass::Content);
    }

    #[test]
    fn test_split_on_markers() {
        let documents = read_all("a: 1\n---\nb: 2\n--- c\n");
        assert_eq!(
            documents,
            vec![
                (1, "a: 1\n".to_string()),
                (2, "---\nb: 2\n".to_string()),
                (4, "--- c\n".to_string()),
            ]
        );
    }

    #[test]
    fn test_comments_stay_with_preceding_document() {
        let documents = read_all("# head\na: 1\n# about b\n\n---\nb: 2\n");
        assert_eq!(
            documents,
            vec![
                (1, "# head\na: 1\n# about b\n\n".to_string()),
                (5, "---\nb: 2\n".to_string()),
            ]
        );
    }

    #[test]
    fn test_leading_comments_before_first_marker() {
        let documents = read_all("# head\n\n--- a\n");
        assert_eq!(documents, vec![(1, "# head\n\n--- a\n".to_string())]);
    }

    #[test]
    fn test_empty_and_comment_only_input() {
        assert!(read_all("").is_empty());
        assert!(read_all("# nothing here\n\n").is_empty());
    }

    #[test]
    fn test_explicit_end_markers() {
        let documents = read_all("a\n...\n...\n# after\n--- b\n...\n%YAML 1.2\n---\nc\n");
        assert_eq!(
            documents,
            vec![
                (1, "a\n...\n...\n# after\n".to_string()),
                (5, "--- b\n...\n".to_string()),
                (7, "%YAML 1.2\n---\nc\n".to_string()),
            ]
        );
    }

    #[test]
    fn test_directive_after_implicit_end() {
        let documents = read_all("a: 1\n%YAML 1.2\n--- b\n");
        assert_eq!(
            documents,
            vec![(1, "a: 1\n".to_string()), (2, "%YAML 1.2\n--- b\n".to_string())]
        );
    }

    #[test]
    fn test_empty_documents() {
        let documents = read_all("---\n---\n");
        assert_eq!(
            documents,
            vec![(1, "---\n".to_string()), (2, "---\n".to_string())]
        );
    }

    #[test]
    fn test_crlf_input() {
        let documents = read_all("a: 1\r\n---\r\nb: 2\r\n");
        assert_eq!(
            documents,
            vec![(1, "a: 1\r\n".to_string()), (2, "---\r\nb: 2\r\n".to_string())]
        );
    }

    #[test]
    fn test_byte_order_mark_is_stripped() {
        let documents = read_all("\u{feff}kind: Pod\n");
        assert_eq!(documents, vec![(1, "kind: Pod\n".to_string())]);
    }

    #[test]
    fn test_error_position_is_absolute() {
        match read_error(b"a: 1\n---\nb: 2\nc: d: e\n") {
            Error::Decode {
                line,
                column,
                message,
            } => {
                assert_eq!((line, column), (4, 5));
                assert_eq!(message, "mapping values are not allowed in this context");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_content_after_end_marker_needs_a_start() {
        match read_error(b"a\n...\nb\n") {
            Error::Decode { line, message, .. } => {
                assert_eq!(line, 3);
                assert_eq!(message, "did not find expected <document start>");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_documents_before_error_are_returned() {
        let mut reader = DocumentReader::new(Cursor::new(&b"a: 1\n---\n[b\n"[..]));
        assert_eq!(reader.next_document().unwrap().unwrap().first_line(), 1);
        assert!(reader.next_document().unwrap_err().is_decode());
        assert!(reader.next_document().unwrap().is_none());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_invalid_utf8() {
        match read_error(b"a: 1\nb: x\xffy\n") {
            Error::Decode {
                line,
                column,
                message,
            } => {
                assert_eq!((line, column), (2, 5));
                assert_eq!(message, "invalid leading UTF-8 octet");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    struct FailingInput;

    impl Read for FailingInput {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    #[test]
    fn test_read_failure() {
        let mut reader = DocumentReader::new(io::BufReader::new(FailingInput));
        assert!(matches!(reader.next_document(), Err(Error::Read(_))));
        assert!(reader.next_document().unwrap().is_none());
    }

    #[test]
    fn test_identity_of_source_document() {
        let mut reader = DocumentReader::new(Cursor::new(
            &b"apiVersion: v1\nkind: Pod\nmetadata:\n  name: a\n"[..],
        ));
        let document = reader.next_document().unwrap().unwrap();
        assert_eq!(document.identity(), Identity::new("v1", "Pod", "a", ""));
        assert_eq!(document.into_document().to_string().lines().count(), 4);
    }
}
