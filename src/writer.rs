//! Writes documents to the output, normalizing block indentation.
//!
//! Re-indentation works on the lossless syntax tree: every block collection
//! gets a new column derived from its parent, and each output line is
//! placed according to the node that starts it. Everything after the
//! leading indentation of a line is written unchanged, except for the gap
//! after a block `-` or `?` indicator, which becomes one less than the
//! indentation width so that compact collections line up.

use crate::error::{Error, Result};
use crate::lex::SyntaxKind;
use crate::scalar;
use crate::yaml::{self, Document, Scalar, SyntaxNode, SyntaxToken};
use crate::Indentation;
use rowan::ast::AstNode;
use rowan::GreenToken;
use std::collections::HashMap;
use std::io::{BufWriter, Write};

/// Buffered writer for a stream of documents.
///
/// Dropping the writer flushes whatever is buffered; use
/// [`DocumentWriter::finish`] to observe write errors.
pub struct DocumentWriter<W: Write> {
    output: BufWriter<W>,
    indentation: Indentation,
    documents_written: usize,
    /// Whether the last written document ended with `...`
    previous_ended: bool,
    /// Whether the output is at the start of a line
    ends_with_newline: bool,
}

impl<W: Write> DocumentWriter<W> {
    /// Create a writer that formats documents with `indentation`.
    pub fn new(output: W, indentation: Indentation) -> Self {
        Self {
            output: BufWriter::new(output),
            indentation,
            documents_written: 0,
            previous_ended: false,
            ends_with_newline: true,
        }
    }

    /// Number of documents written so far.
    pub fn documents_written(&self) -> usize {
        self.documents_written
    }

    /// Write one document.
    ///
    /// A `---` marker is inserted when the document would otherwise run
    /// into the previous one. A document without a final line break gets
    /// one, and a block scalar at its very end is re-chomped so that its
    /// value stays the same. The line break is left out when no chomping
    /// indicator can keep the value.
    pub fn write_document(&mut self, document: &Document) -> Result<()> {
        let mut terminate = false;
        let rechomped;
        let document = if document.to_string().ends_with('\n') {
            document
        } else {
            match ending(document) {
                Ending::Newline => {
                    terminate = true;
                    document
                }
                Ending::Rechomped(replacement) => {
                    terminate = true;
                    rechomped = replacement;
                    &rechomped
                }
                Ending::Open => document,
            }
        };

        let mut text = match self.indentation {
            Indentation::Preserve => document.to_string(),
            Indentation::Spaces(width) => reindent(document, width as usize),
        };
        if terminate && !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }

        if self.documents_written > 0 {
            if !self.ends_with_newline {
                self.write_str("\n")?;
            }
            if !self.previous_ended && !document.has_explicit_start() {
                self.write_str("---\n")?;
            }
        }
        self.write_str(&text)?;

        if !text.is_empty() {
            self.ends_with_newline = text.ends_with('\n');
        }
        self.previous_ended = document.has_explicit_end();
        self.documents_written += 1;
        Ok(())
    }

    /// Flush buffered output.
    pub fn flush(&mut self) -> Result<()> {
        self.output.flush().map_err(Error::Encode)
    }

    /// Flush the output.
    ///
    /// Every document already ends with a line break unless its trailing
    /// block scalar would change by getting one.
    pub fn finish(mut self) -> Result<()> {
        self.flush()
    }

    fn write_str(&mut self, text: &str) -> Result<()> {
        self.output
            .write_all(text.as_bytes())
            .map_err(Error::Encode)
    }
}

/// How a document that lacks a final line break can be given one.
enum Ending {
    /// Appending a line break keeps every value.
    Newline,
    /// The trailing block scalar needs another chomping indicator first.
    Rechomped(Document),
    /// Any line break would change the trailing block scalar.
    Open,
}

fn ending(document: &Document) -> Ending {
    let tokens: Vec<SyntaxToken> = document
        .syntax()
        .descendants_with_tokens()
        .filter_map(|element| element.into_token())
        .collect();
    let Some(last) = tokens.iter().rposition(|token| {
        !token.text().is_empty()
            && !matches!(token.kind(), SyntaxKind::WHITESPACE | SyntaxKind::INDENT)
    }) else {
        return Ending::Newline;
    };
    let body = &tokens[last];
    if body.kind() != SyntaxKind::BLOCK_TEXT {
        return Ending::Newline;
    }
    let Some(scalar) = body.parent().and_then(Scalar::cast) else {
        return Ending::Newline;
    };
    let Some(header) = scalar
        .syntax()
        .children_with_tokens()
        .filter_map(|element| element.into_token())
        .find(|token| token.kind() == SyntaxKind::BLOCK_HEADER)
    else {
        return Ending::Newline;
    };

    let mut terminated = body.text().to_string();
    for token in &tokens[last + 1..] {
        terminated.push_str(token.text());
    }
    terminated.push('\n');

    match terminated_header(header.text(), body.text(), &terminated, scalar.parent_indent()) {
        Some(chomped) if chomped == header.text() => Ending::Newline,
        Some(chomped) => {
            let green = header.replace_with(GreenToken::new(
                SyntaxKind::BLOCK_HEADER.into(),
                &chomped,
            ));
            SyntaxNode::new_root(green)
                .token_at_offset(header.text_range().start())
                .right_biased()
                .and_then(|token| token.parent())
                .and_then(|parent| parent.ancestors().find_map(Document::cast))
                .map_or(Ending::Open, Ending::Rechomped)
        }
        None => Ending::Open,
    }
}

/// A block scalar header, `header` itself if possible, under which the body
/// `terminated` decodes to the same value as `body` does under `header`.
fn terminated_header(
    header: &str,
    body: &str,
    terminated: &str,
    parent_indent: isize,
) -> Option<String> {
    let value = scalar::decode_block(header, body, parent_indent);
    let (style, indicators) = header.split_at(1);
    let indent: String = indicators.chars().filter(char::is_ascii_digit).collect();
    [
        header.to_string(),
        format!("{}{}-", style, indent),
        format!("{}{}+", style, indent),
    ]
    .into_iter()
    .find(|candidate| scalar::decode_block(candidate, terminated, parent_indent) == value)
}

/// Render `document` with block collections indented by `width` spaces per
/// nesting level.
pub(crate) fn reindent(document: &Document, width: usize) -> String {
    Reindenter::new(document.syntax(), width.max(1)).render()
}

struct Reindenter {
    tokens: Vec<SyntaxToken>,
    width: usize,
    /// Gap written after a block `-` or `?` indicator
    step: usize,
    columns: HashMap<SyntaxNode, usize>,
    deltas: HashMap<SyntaxNode, isize>,
}

impl Reindenter {
    fn new(root: &SyntaxNode, width: usize) -> Self {
        let mut reindenter = Self {
            tokens: root
                .descendants_with_tokens()
                .filter_map(|element| element.into_token())
                .collect(),
            width,
            step: width.saturating_sub(1).max(1),
            columns: HashMap::new(),
            deltas: HashMap::new(),
        };
        reindenter.layout(root);
        reindenter
    }

    /// Assign every block collection its new column, parents first.
    fn layout(&mut self, root: &SyntaxNode) {
        for node in root.descendants().filter(yaml::is_block_collection) {
            let Some(original) = yaml::block_column(&node) else {
                continue;
            };
            let Some(first) = first_entry_token(&node) else {
                continue;
            };
            let parent = enclosing_block_collection(&node);
            let compact = !is_first_on_line(&first);

            let column = match parent {
                None if !compact => 0,
                None => original,
                Some(parent) => {
                    let parent_column = self.columns.get(&parent).copied().unwrap_or(0);
                    let parent_delta = self.deltas.get(&parent).copied().unwrap_or(0);
                    if !compact {
                        parent_column + self.width
                    } else if previous_significant(&first)
                        .map_or(false, |token| is_block_indicator(&token))
                    {
                        parent_column + 1 + self.step
                    } else {
                        shift(original, parent_delta)
                    }
                }
            };
            self.deltas
                .insert(node.clone(), column as isize - original as isize);
            self.columns.insert(node, column);
        }
    }

    fn render(&self) -> String {
        let mut out = String::new();
        let mut index = 0;
        while index < self.tokens.len() {
            let indent = match self.tokens[index].kind() {
                SyntaxKind::INDENT => {
                    index += 1;
                    Some(self.tokens[index - 1].text())
                }
                _ => None,
            };
            let Some(first) = self.tokens.get(index) else {
                out.push_str(indent.unwrap_or_default());
                break;
            };

            match first.kind() {
                SyntaxKind::NEWLINE | SyntaxKind::BLOCK_TEXT | SyntaxKind::WHITESPACE => {
                    out.push_str(indent.unwrap_or_default());
                }
                SyntaxKind::COMMENT => {
                    let column = self.tokens[index..]
                        .iter()
                        .find(|token| !token.kind().is_trivia())
                        .map_or(0, |token| self.line_column(token));
                    push_spaces(&mut out, column);
                }
                _ => push_spaces(&mut out, self.line_column(first)),
            }
            index = self.render_line(&mut out, index);
        }
        out
    }

    /// Write the tokens of the line starting at `index`, returning the index
    /// of the first token of the next line.
    fn render_line(&self, out: &mut String, mut index: usize) -> usize {
        while let Some(token) = self.tokens.get(index) {
            let text = token.text();
            match token.kind() {
                SyntaxKind::WHITESPACE if self.is_indicator_gap(index) => {
                    push_spaces(out, self.step);
                }
                SyntaxKind::PLAIN | SyntaxKind::SINGLE_QUOTED | SyntaxKind::DOUBLE_QUOTED => {
                    push_shifted(out, text, self.delta_of(token), false);
                }
                SyntaxKind::BLOCK_TEXT => push_shifted(out, text, self.delta_of(token), true),
                _ => out.push_str(text),
            }
            index += 1;
            if text.ends_with('\n') {
                break;
            }
        }
        index
    }

    /// Whitespace between a block indicator and content on the same line.
    fn is_indicator_gap(&self, index: usize) -> bool {
        let before = index.checked_sub(1).and_then(|i| self.tokens.get(i));
        let after = self.tokens.get(index + 1);
        before.map_or(false, is_block_indicator)
            && after.map_or(false, |token| {
                !matches!(token.kind(), SyntaxKind::COMMENT | SyntaxKind::NEWLINE)
            })
    }

    /// New column of a token that starts a line.
    fn line_column(&self, token: &SyntaxToken) -> usize {
        let ancestors: Vec<SyntaxNode> = token
            .parent()
            .into_iter()
            .flat_map(|parent| parent.ancestors())
            .collect();

        // The token starts an entry of a block collection.
        for node in &ancestors {
            if !matches!(
                node.kind(),
                SyntaxKind::MAPPING_ENTRY | SyntaxKind::SEQUENCE_ENTRY
            ) {
                continue;
            }
            if let Some(column) = node.parent().and_then(|c| self.columns.get(&c)) {
                if yaml::first_significant_token(node).as_ref() == Some(token) {
                    return *column;
                }
            }
        }

        // The token starts a node that sits on its own line below a key, a
        // value or a sequence entry.
        for node in &ancestors {
            if is_content(node)
                && yaml::first_significant_token(node).as_ref() == Some(token)
            {
                if let Some(column) = holder_collection(node).and_then(|c| self.columns.get(&c)) {
                    return column + self.width;
                }
            }
        }

        shift(yaml::column_of(token), self.delta_of(token))
    }

    /// Shift of the innermost block collection around `token`.
    fn delta_of(&self, token: &SyntaxToken) -> isize {
        token
            .parent()
            .into_iter()
            .flat_map(|parent| parent.ancestors())
            .find_map(|node| self.deltas.get(&node).copied())
            .unwrap_or(0)
    }
}

fn is_content(node: &SyntaxNode) -> bool {
    matches!(
        node.kind(),
        SyntaxKind::MAPPING | SyntaxKind::SEQUENCE | SyntaxKind::SCALAR | SyntaxKind::ALIAS
    )
}

/// The collection owning the key, value or entry that holds `node`.
fn holder_collection(node: &SyntaxNode) -> Option<SyntaxNode> {
    let holder = node.parent()?;
    let entry = match holder.kind() {
        SyntaxKind::KEY | SyntaxKind::VALUE => holder.parent()?,
        SyntaxKind::SEQUENCE_ENTRY => holder,
        _ => return None,
    };
    entry.parent()
}

fn enclosing_block_collection(node: &SyntaxNode) -> Option<SyntaxNode> {
    node.ancestors().skip(1).find(yaml::is_block_collection)
}

fn first_entry_token(collection: &SyntaxNode) -> Option<SyntaxToken> {
    collection
        .children()
        .find(|child| {
            matches!(
                child.kind(),
                SyntaxKind::MAPPING_ENTRY | SyntaxKind::SEQUENCE_ENTRY
            )
        })
        .and_then(|entry| yaml::first_significant_token(&entry))
}

/// A `-` entry indicator or a `?` key indicator of a block mapping.
fn is_block_indicator(token: &SyntaxToken) -> bool {
    match token.kind() {
        SyntaxKind::DASH => true,
        SyntaxKind::QUESTION => token
            .parent()
            .and_then(|key| key.parent())
            .and_then(|entry| entry.parent())
            .map_or(false, |mapping| yaml::is_block_collection(&mapping)),
        _ => false,
    }
}

fn is_first_on_line(token: &SyntaxToken) -> bool {
    let mut current = token.prev_token();
    while let Some(previous) = current {
        if previous.text().ends_with('\n') {
            return true;
        }
        if !matches!(previous.kind(), SyntaxKind::INDENT | SyntaxKind::WHITESPACE) {
            return false;
        }
        current = previous.prev_token();
    }
    true
}

fn previous_significant(token: &SyntaxToken) -> Option<SyntaxToken> {
    let mut current = token.prev_token();
    while let Some(previous) = current {
        if !previous.kind().is_trivia() {
            return Some(previous);
        }
        current = previous.prev_token();
    }
    None
}

fn shift(column: usize, delta: isize) -> usize {
    (column as isize + delta).max(0) as usize
}

fn push_spaces(out: &mut String, count: usize) {
    out.extend(std::iter::repeat(' ').take(count));
}

/// Append `text`, moving each of its lines by `delta` columns. The first
/// line is only moved when `include_first` is set; empty lines never are.
fn push_shifted(out: &mut String, text: &str, delta: isize, include_first: bool) {
    if delta == 0 {
        out.push_str(text);
        return;
    }
    for (index, line) in text.split_inclusive('\n').enumerate() {
        if (index == 0 && !include_first) || line == "\n" || line == "\r\n" {
            out.push_str(line);
            continue;
        }
        if delta > 0 {
            push_spaces(out, delta as usize);
            out.push_str(line);
        } else {
            let spaces = line.len() - line.trim_start_matches(' ').len();
            out.push_str(&line[spaces.min(delta.unsigned_abs())..]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::Stream;
    use std::io;

    fn document(text: &str) -> Document {
        let parsed = Stream::parse(text);
        assert!(!parsed.has_errors(), "{:?}", parsed.errors());
        parsed.tree().documents().next().unwrap()
    }

    fn reindented(text: &str, width: usize) -> String {
        reindent(&document(text), width)
    }

    fn write_all(texts: &[&str], indentation: Indentation) -> String {
        let mut out = Vec::new();
        let mut writer = DocumentWriter::new(&mut out, indentation);
        for text in texts {
            writer.write_document(&document(text)).unwrap();
        }
        writer.finish().unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_nested_mappings_and_sequences() {
        let input = "a:\n    b: 1\n    c:\n        - x\n        - y\n";
        assert_eq!(reindented(input, 2), "a:\n  b: 1\n  c:\n    - x\n    - y\n");
    }

    #[test]
    fn test_indentless_sequence_gets_indented() {
        assert_eq!(
            reindented("items:\n- a\n- b\nnext: 1\n", 2),
            "items:\n  - a\n  - b\nnext: 1\n"
        );
    }

    #[test]
    fn test_compact_mapping_in_sequence() {
        assert_eq!(
            reindented("-   name: a\n    kind: b\n-   name: c\n", 2),
            "- name: a\n  kind: b\n- name: c\n"
        );
    }

    #[test]
    fn test_wider_indentation() {
        assert_eq!(reindented("- - a\n  - b\n", 4), "-   -   a\n    -   b\n");
        assert_eq!(reindented("a:\n  b: 1\n", 4), "a:\n    b: 1\n");
    }

    #[test]
    fn test_comments_follow_the_next_line() {
        let input = "a:\n    # note\n    b: 1\n\n# tail\n";
        assert_eq!(reindented(input, 2), "a:\n  # note\n  b: 1\n\n# tail\n");
    }

    #[test]
    fn test_comment_after_dash_keeps_its_gap() {
        assert_eq!(
            reindented("-   # first\n    key: v\n", 2),
            "-   # first\n  key: v\n"
        );
    }

    #[test]
    fn test_block_scalar_moves_with_its_mapping() {
        let input = "a:\n    script: |\n        echo hi\n          indented\n\n    done: true\n";
        let output = reindented(input, 2);
        assert_eq!(
            output,
            "a:\n  script: |\n      echo hi\n        indented\n\n  done: true\n"
        );
    }

    #[test]
    fn test_multi_line_quoted_scalar() {
        assert_eq!(
            reindented("a:\n    b: \"one\n      two\"\n", 2),
            "a:\n  b: \"one\n    two\"\n"
        );
    }

    #[test]
    fn test_flow_collections_are_untouched() {
        let input = "spec: {a: 1,\n        b: [x,\n   y]}\n";
        assert_eq!(reindented(input, 2), input);
    }

    #[test]
    fn test_value_on_its_own_line() {
        assert_eq!(reindented("key:\n      value\n", 2), "key:\n  value\n");
    }

    #[test]
    fn test_reindent_is_idempotent() {
        let input = "apiVersion: v1\nkind: List\nitems:\n-   metadata:\n         name: a # the name\n    spec:\n          containers:\n          - image: x\n            args: [a,\n              b]\n";
        let once = reindented(input, 2);
        assert_eq!(reindented(&once, 2), once);
        assert!(once.contains("# the name"));
    }

    #[test]
    fn test_root_scalar_and_markers() {
        assert_eq!(reindented("--- hello\n...\n", 2), "--- hello\n...\n");
        assert_eq!(reindented("%YAML 1.2\n---\n  a: 1\n", 2), "%YAML 1.2\n---\na: 1\n");
    }

    #[test]
    fn test_separator_inserted_between_bare_documents() {
        let output = write_all(&["a: 1", "b: 2\n"], Indentation::default());
        assert_eq!(output, "a: 1\n---\nb: 2\n");
    }

    #[test]
    fn test_no_separator_after_end_marker_or_before_start_marker() {
        let output = write_all(&["a: 1\n...\n", "b: 2\n"], Indentation::Preserve);
        assert_eq!(output, "a: 1\n...\nb: 2\n");

        let output = write_all(&["a: 1\n", "--- b\n"], Indentation::Preserve);
        assert_eq!(output, "a: 1\n--- b\n");
    }

    #[test]
    fn test_preserve_is_lossless() {
        let text = "# head\nkey:    value   # trailing\nlist:\n- a\n";
        assert_eq!(write_all(&[text], Indentation::Preserve), text);
    }

    #[test]
    fn test_final_newline_added() {
        assert_eq!(write_all(&["kind: Pod"], Indentation::default()), "kind: Pod\n");
    }

    /// Value of the last block scalar in `text`.
    fn trailing_block_value(text: &str) -> String {
        let parsed = Stream::parse(text);
        assert!(!parsed.has_errors(), "{:?}", parsed.errors());
        parsed
            .tree()
            .syntax()
            .descendants()
            .filter_map(Scalar::cast)
            .last()
            .map(|scalar| scalar.value())
            .unwrap()
    }

    #[test]
    fn test_trailing_block_scalar_is_rechomped() {
        let cases = [
            ("a: |\n  x", "a: |-\n  x\n"),
            ("a: >+\n  x", "a: >-\n  x\n"),
            ("a: |2\n   x", "a: |2-\n   x\n"),
            ("--- |\n  x", "--- |-\n  x\n"),
            ("a: |-\n  x", "a: |-\n  x\n"),
        ];
        for (input, expected) in cases {
            for indentation in [Indentation::default(), Indentation::Preserve] {
                let output = write_all(&[input], indentation);
                assert_eq!(output, expected, "{:?}", input);
                assert_eq!(trailing_block_value(&output), trailing_block_value(input));
            }
        }
    }

    #[test]
    fn test_trailing_block_scalar_in_nested_mapping() {
        let input = "data:\n    script: |\n        echo hi";
        let output = write_all(&[input], Indentation::default());
        assert_eq!(output, "data:\n  script: |-\n      echo hi\n");
        assert_eq!(trailing_block_value(&output), "echo hi");
    }

    #[test]
    fn test_trailing_block_scalar_that_cannot_be_terminated() {
        let input = "a: |+\n  x\n\n  ";
        let output = write_all(&[input], Indentation::Preserve);
        assert_eq!(output, input);
        assert_eq!(trailing_block_value(&output), "x\n\n");
    }

    #[test]
    fn test_terminated_block_scalars_are_untouched() {
        let input = "a: |\n  x\nb: >+\n  y\n\n";
        assert_eq!(write_all(&[input], Indentation::Preserve), input);
        assert_eq!(write_all(&["a: 'x'"], Indentation::Preserve), "a: 'x'\n");
        assert_eq!(write_all(&["a: |  # note"], Indentation::Preserve), "a: |  # note\n");
    }

    #[test]
    fn test_nothing_written() {
        let mut out = Vec::new();
        let writer = DocumentWriter::new(&mut out, Indentation::default());
        assert_eq!(writer.documents_written(), 0);
        writer.finish().unwrap();
        assert!(out.is_empty());
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_an_encode_error() {
        let mut writer = DocumentWriter::new(BrokenPipe, Indentation::default());
        writer.write_document(&document("kind: Pod\n")).unwrap();
        let err = writer.finish().unwrap_err();
        assert!(matches!(err, Error::Encode(_)));
    }
}
