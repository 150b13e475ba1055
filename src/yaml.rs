//! Lossless YAML syntax tree and parser.
//!
//! The parser follows the YAML 1.1 block and flow grammar over the token
//! stream of [`crate::lex`] and records every token it consumes in a rowan
//! green tree, so the text of a [`Stream`] is always identical to its input.

use crate::{
    diagnostics::Locator,
    lex::{lex, LexError, Lexed, SyntaxKind, Token},
    parse::Parse,
    scalar::{self, ScalarStyle},
    PositionedParseError,
};
use rowan::ast::AstNode;
use rowan::GreenNodeBuilder;
use std::collections::HashSet;
use std::str::FromStr;

/// Output of the parser before it is wrapped in a [`Parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedYaml {
    pub green_node: rowan::GreenNode,
    pub errors: Vec<String>,
    pub positioned_errors: Vec<PositionedParseError>,
}

/// YAML language type for rowan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lang {}

impl rowan::Language for Lang {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        assert!(raw.0 <= SyntaxKind::STREAM_END as u16);
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// A node in the YAML syntax tree.
pub type SyntaxNode = rowan::SyntaxNode<Lang>;
/// A token in the YAML syntax tree.
pub type SyntaxToken = rowan::SyntaxToken<Lang>;

/// A macro to create AST node wrappers.
macro_rules! ast_node {
    ($ast:ident, $kind:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, PartialEq, Eq, Hash)]
        pub struct $ast(SyntaxNode);

        impl std::fmt::Debug for $ast {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($ast))
                    .field("syntax", &self.0)
                    .finish()
            }
        }

        impl AstNode for $ast {
            type Language = Lang;

            fn can_cast(kind: SyntaxKind) -> bool {
                kind == SyntaxKind::$kind
            }

            fn cast(syntax: SyntaxNode) -> Option<Self> {
                if Self::can_cast(syntax.kind()) {
                    Some(Self(syntax))
                } else {
                    None
                }
            }

            fn syntax(&self) -> &SyntaxNode {
                &self.0
            }
        }

        impl From<SyntaxNode> for $ast {
            fn from(node: SyntaxNode) -> Self {
                $ast(node)
            }
        }

        impl std::fmt::Display for $ast {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0.text())
            }
        }
    };
}

ast_node!(Stream, ROOT, "A YAML stream holding zero or more documents");
ast_node!(Document, DOCUMENT, "A single YAML document");
ast_node!(Mapping, MAPPING, "A YAML mapping (key-value pairs)");
ast_node!(MappingEntry, MAPPING_ENTRY, "A key-value pair in a YAML mapping");
ast_node!(Sequence, SEQUENCE, "A YAML sequence (list)");
ast_node!(SequenceEntry, SEQUENCE_ENTRY, "An entry in a YAML sequence");
ast_node!(Scalar, SCALAR, "A YAML scalar value");
ast_node!(Alias, ALIAS, "A reference to an anchored node");

impl Stream {
    /// Parse a complete YAML stream.
    pub fn parse(text: &str) -> Parse<Stream> {
        Parse::parse_stream(text)
    }

    /// The documents of the stream, in order.
    pub fn documents(&self) -> impl Iterator<Item = Document> {
        self.0.children().filter_map(Document::cast)
    }
}

impl FromStr for Stream {
    type Err = crate::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stream::parse(s).to_result()
    }
}

impl Document {
    /// The root content node, if the document is not empty.
    pub fn content(&self) -> Option<Node> {
        self.0.children().find_map(Node::cast)
    }

    /// Whether the document starts with a `---` marker.
    pub fn has_explicit_start(&self) -> bool {
        self.has_token(SyntaxKind::DOC_START)
    }

    /// Whether the document is terminated by a `...` marker.
    pub fn has_explicit_end(&self) -> bool {
        self.has_token(SyntaxKind::DOC_END)
    }

    fn has_token(&self, kind: SyntaxKind) -> bool {
        self.0.children_with_tokens().any(|element| element.kind() == kind)
    }

    /// Handles declared with `%TAG` directives, as (handle, prefix) pairs.
    pub fn tag_handles(&self) -> Vec<(String, String)> {
        self.0
            .children_with_tokens()
            .filter_map(|element| element.into_token())
            .filter(|token| token.kind() == SyntaxKind::DIRECTIVE)
            .filter_map(|token| {
                let mut words = token.text().split_whitespace();
                if words.next()? != "%TAG" {
                    return None;
                }
                Some((words.next()?.to_string(), words.next()?.to_string()))
            })
            .collect()
    }
}

/// Any content node: a collection, a scalar or an alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    /// A block or flow mapping
    Mapping(Mapping),
    /// A block or flow sequence
    Sequence(Sequence),
    /// A scalar, possibly empty
    Scalar(Scalar),
    /// An alias of an anchored node
    Alias(Alias),
}

impl Node {
    /// Wrap a syntax node if it is a content node.
    pub fn cast(syntax: SyntaxNode) -> Option<Self> {
        match syntax.kind() {
            SyntaxKind::MAPPING => Some(Node::Mapping(Mapping(syntax))),
            SyntaxKind::SEQUENCE => Some(Node::Sequence(Sequence(syntax))),
            SyntaxKind::SCALAR => Some(Node::Scalar(Scalar(syntax))),
            SyntaxKind::ALIAS => Some(Node::Alias(Alias(syntax))),
            _ => None,
        }
    }

    /// The underlying syntax node.
    pub fn syntax(&self) -> &SyntaxNode {
        match self {
            Node::Mapping(node) => node.syntax(),
            Node::Sequence(node) => node.syntax(),
            Node::Scalar(node) => node.syntax(),
            Node::Alias(node) => node.syntax(),
        }
    }

    /// The resolved short tag of the node. Aliases have no tag.
    pub fn tag(&self) -> String {
        match self {
            Node::Mapping(node) => {
                explicit_tag(node.syntax()).unwrap_or_else(|| scalar::MAP_TAG.to_string())
            }
            Node::Sequence(node) => {
                explicit_tag(node.syntax()).unwrap_or_else(|| scalar::SEQ_TAG.to_string())
            }
            Node::Scalar(node) => node.tag(),
            Node::Alias(_) => String::new(),
        }
    }

    /// The node as a mapping, if it is one.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    /// The node as a scalar, if it is one.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.syntax().text())
    }
}

/// The first node child of `parent`.
fn child_content(parent: &SyntaxNode) -> Option<Node> {
    parent.children().find_map(Node::cast)
}

fn child_tokens(node: &SyntaxNode) -> impl Iterator<Item = SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|element| element.into_token())
}

/// The explicit tag of a node in short form. `!` is non-specific.
fn explicit_tag(node: &SyntaxNode) -> Option<String> {
    let token = child_tokens(node).find(|token| token.kind() == SyntaxKind::TAG)?;
    if token.text() == "!" {
        return None;
    }
    let handles = node
        .ancestors()
        .find_map(Document::cast)
        .map(|document| document.tag_handles())
        .unwrap_or_default();
    let full = scalar::expand_tag(token.text(), &handles)
        .unwrap_or_else(|| token.text().to_string());
    Some(scalar::shorten_tag(&full))
}

/// Whether `node` is a flow collection or nested inside one.
pub(crate) fn is_flow(node: &SyntaxNode) -> bool {
    node.ancestors().any(|ancestor| opens_flow(&ancestor))
}

/// Whether `node` is a collection opened by `{` or `[`.
///
/// Only the tokens ahead of the first child node are looked at: the
/// properties and the bracket itself.
fn opens_flow(node: &SyntaxNode) -> bool {
    matches!(node.kind(), SyntaxKind::MAPPING | SyntaxKind::SEQUENCE)
        && node
            .children_with_tokens()
            .map_while(|element| element.into_token())
            .any(|token| {
                matches!(
                    token.kind(),
                    SyntaxKind::LEFT_BRACE | SyntaxKind::LEFT_BRACKET
                )
            })
}

/// Whether `node` is a block mapping or block sequence.
pub(crate) fn is_block_collection(node: &SyntaxNode) -> bool {
    matches!(node.kind(), SyntaxKind::MAPPING | SyntaxKind::SEQUENCE) && !is_flow(node)
}

/// The first token below `node` that is not trivia.
pub(crate) fn first_significant_token(node: &SyntaxNode) -> Option<SyntaxToken> {
    node.descendants_with_tokens()
        .filter_map(|element| element.into_token())
        .find(|token| !token.kind().is_trivia())
}

/// Column of the start of `token`, counted in characters.
pub(crate) fn column_of(token: &SyntaxToken) -> usize {
    let mut column = 0;
    let mut current = token.prev_token();
    while let Some(previous) = current {
        let text = previous.text();
        if let Some(newline) = text.rfind('\n') {
            return column + text[newline + 1..].chars().count();
        }
        column += text.chars().count();
        current = previous.prev_token();
    }
    column
}

/// Column of a block collection: where its first entry starts.
pub(crate) fn block_column(node: &SyntaxNode) -> Option<usize> {
    let entry = node.children().find(|child| {
        matches!(
            child.kind(),
            SyntaxKind::MAPPING_ENTRY | SyntaxKind::SEQUENCE_ENTRY
        )
    })?;
    first_significant_token(&entry).map(|token| column_of(&token))
}

impl Mapping {
    /// The entries of the mapping, in document order.
    pub fn entries(&self) -> impl Iterator<Item = MappingEntry> {
        self.0.children().filter_map(MappingEntry::cast)
    }

    /// Whether this is a flow mapping (`{...}`) or sits inside one.
    pub fn is_flow(&self) -> bool {
        is_flow(&self.0)
    }

    /// Values of the entries whose key satisfies `key` and whose value
    /// satisfies `value`, in document order.
    ///
    /// Entries without a value node never match.
    pub fn values_for<K, V>(&self, key: K, value: V) -> impl Iterator<Item = Node>
    where
        K: Fn(&Node) -> bool,
        V: Fn(&Node) -> bool,
    {
        self.entries().filter_map(move |entry| {
            let entry_key = entry.key()?;
            let entry_value = entry.value()?;
            (key(&entry_key) && value(&entry_value)).then_some(entry_value)
        })
    }
}

impl MappingEntry {
    /// The key node, absent for an empty key.
    pub fn key(&self) -> Option<Node> {
        self.0
            .children()
            .find(|child| child.kind() == SyntaxKind::KEY)
            .and_then(|key| child_content(&key))
    }

    /// The value node, absent for an empty value.
    pub fn value(&self) -> Option<Node> {
        self.0
            .children()
            .find(|child| child.kind() == SyntaxKind::VALUE)
            .and_then(|value| child_content(&value))
    }
}

impl Sequence {
    /// The entries of the sequence, in document order.
    pub fn entries(&self) -> impl Iterator<Item = SequenceEntry> {
        self.0.children().filter_map(SequenceEntry::cast)
    }

    /// Whether this is a flow sequence (`[...]`) or sits inside one.
    pub fn is_flow(&self) -> bool {
        is_flow(&self.0)
    }
}

impl SequenceEntry {
    /// The entry's node, absent for an empty entry.
    pub fn value(&self) -> Option<Node> {
        child_content(&self.0)
    }
}

impl Scalar {
    fn content_token(&self) -> Option<SyntaxToken> {
        child_tokens(&self.0).find(|token| {
            matches!(
                token.kind(),
                SyntaxKind::PLAIN
                    | SyntaxKind::SINGLE_QUOTED
                    | SyntaxKind::DOUBLE_QUOTED
                    | SyntaxKind::BLOCK_HEADER
            )
        })
    }

    /// How the scalar is written. An empty scalar counts as plain.
    pub fn style(&self) -> ScalarStyle {
        match self.content_token() {
            Some(token) => match token.kind() {
                SyntaxKind::SINGLE_QUOTED => ScalarStyle::SingleQuoted,
                SyntaxKind::DOUBLE_QUOTED => ScalarStyle::DoubleQuoted,
                SyntaxKind::BLOCK_HEADER if token.text().starts_with('|') => ScalarStyle::Literal,
                SyntaxKind::BLOCK_HEADER => ScalarStyle::Folded,
                _ => ScalarStyle::Plain,
            },
            None => ScalarStyle::Plain,
        }
    }

    /// The decoded value.
    pub fn value(&self) -> String {
        let Some(token) = self.content_token() else {
            return String::new();
        };
        match token.kind() {
            SyntaxKind::SINGLE_QUOTED => scalar::decode_single_quoted(token.text()),
            SyntaxKind::DOUBLE_QUOTED => scalar::decode_double_quoted(token.text()),
            SyntaxKind::BLOCK_HEADER => {
                let body = child_tokens(&self.0)
                    .find(|token| token.kind() == SyntaxKind::BLOCK_TEXT)
                    .map(|token| token.text().to_string())
                    .unwrap_or_default();
                scalar::decode_block(token.text(), &body, self.parent_indent())
            }
            _ => scalar::decode_plain(token.text()),
        }
    }

    /// The resolved short tag (`!!str`, `!!int`, `!!null`, ...).
    pub fn tag(&self) -> String {
        if let Some(tag) = explicit_tag(&self.0) {
            return tag;
        }
        if self.style().is_quoted_or_block() {
            scalar::STR_TAG.to_string()
        } else {
            scalar::resolve_plain(&self.value()).to_string()
        }
    }

    /// Whether the scalar resolves to a string.
    pub fn is_string(&self) -> bool {
        self.tag() == scalar::STR_TAG
    }

    /// Column of the innermost enclosing block collection, -1 at the root.
    pub(crate) fn parent_indent(&self) -> isize {
        self.0
            .ancestors()
            .skip(1)
            .find(is_block_collection)
            .and_then(|collection| block_column(&collection))
            .map_or(-1, |column| column as isize)
    }
}

impl Alias {
    /// The name of the referenced anchor.
    pub fn name(&self) -> Option<String> {
        child_tokens(&self.0)
            .find(|token| token.kind() == SyntaxKind::REFERENCE)
            .map(|token| token.text()[1..].to_string())
    }
}

/// Recursive descent parser over the scanner's token stream.
///
/// Parsing stops at the first error; the unparsed rest of the input is
/// kept in an [`SyntaxKind::ERROR`] node so no text is lost.
struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    builder: GreenNodeBuilder<'static>,
    locator: Locator<'a>,
    lex_error: Option<LexError>,
    positioned_errors: Vec<PositionedParseError>,
    /// Anchors defined so far in the current document
    anchors: HashSet<&'a str>,
    /// `%TAG` handles of the current document
    tag_handles: Vec<(String, String)>,
    /// Whether the first document may omit its `---` marker
    implicit_start: bool,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str, implicit_start: bool) -> Self {
        let Lexed { tokens, error } = lex(text);
        Self {
            tokens,
            pos: 0,
            builder: GreenNodeBuilder::new(),
            locator: Locator::new(text),
            lex_error: error,
            positioned_errors: Vec::new(),
            anchors: HashSet::new(),
            tag_handles: Vec::new(),
            implicit_start,
        }
    }

    fn parse(mut self) -> ParsedYaml {
        self.builder.start_node(SyntaxKind::ROOT.into());
        self.parse_stream();

        if !self.failed() {
            if let Some(err) = self.lex_error.take() {
                self.report_lex_error(err);
            }
        }
        if self.failed() {
            self.flush_trivia();
            if self.tokens[self.pos..].iter().any(|t| !t.kind.is_marker()) {
                self.builder.start_node(SyntaxKind::ERROR.into());
                while let Some(token) = self.tokens.get(self.pos) {
                    if !token.kind.is_marker() {
                        self.builder.token(token.kind.into(), token.text);
                    }
                    self.pos += 1;
                }
                self.builder.finish_node();
            }
        } else {
            self.flush_trivia();
        }
        self.builder.finish_node();

        ParsedYaml {
            green_node: self.builder.finish(),
            errors: self
                .positioned_errors
                .iter()
                .map(|err| err.message.clone())
                .collect(),
            positioned_errors: self.positioned_errors,
        }
    }

    fn failed(&self) -> bool {
        !self.positioned_errors.is_empty()
    }

    /// The next token that is not trivia. Markers are included.
    fn peek_token(&self) -> Token<'a> {
        self.tokens[self.pos..]
            .iter()
            .find(|token| !token.kind.is_trivia())
            .or_else(|| self.tokens.last())
            .copied()
            .unwrap_or(Token {
                kind: SyntaxKind::STREAM_END,
                text: "",
                offset: 0,
            })
    }

    fn peek(&self) -> SyntaxKind {
        self.peek_token().kind
    }

    fn at_any(&self, kinds: &[SyntaxKind]) -> bool {
        kinds.contains(&self.peek())
    }

    /// Add pending trivia to the current node.
    fn flush_trivia(&mut self) {
        while let Some(token) = self.tokens.get(self.pos) {
            if !token.kind.is_trivia() {
                break;
            }
            self.builder.token(token.kind.into(), token.text);
            self.pos += 1;
        }
    }

    /// Consume the next significant token. Markers leave no trace in the tree.
    fn bump(&mut self) {
        self.flush_trivia();
        let Some(token) = self.tokens.get(self.pos).copied() else {
            return;
        };
        if token.kind == SyntaxKind::STREAM_END {
            return;
        }
        if !token.kind.is_marker() {
            self.builder.token(token.kind.into(), token.text);
        }
        self.pos += 1;
    }

    fn start_node(&mut self, kind: SyntaxKind) {
        self.flush_trivia();
        self.builder.start_node(kind.into());
    }

    fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    fn report_lex_error(&mut self, err: LexError) {
        let error = self.locator.error_at(err.message, err.offset, 1);
        self.positioned_errors.push(error);
    }

    /// Record an error at the next significant token.
    ///
    /// Running into the unscanned rest of the input reports the scanner's
    /// own error instead.
    fn error_here(&mut self, message: impl Into<String>) {
        if self.failed() {
            return;
        }
        let token = self.peek_token();
        if token.kind == SyntaxKind::INVALID {
            if let Some(err) = self.lex_error.take() {
                self.report_lex_error(err);
                return;
            }
        }
        let error = self
            .locator
            .error_at(message, token.offset, token.text.len().max(1));
        self.positioned_errors.push(error);
    }

    fn parse_stream(&mut self) {
        let mut first = true;
        while !self.failed() && self.peek() != SyntaxKind::STREAM_END {
            self.parse_document(first && self.implicit_start);
            first = false;
        }
    }

    fn parse_document(&mut self, implicit: bool) {
        // Leading trivia belongs to the document.
        self.builder.start_node(SyntaxKind::DOCUMENT.into());
        self.anchors.clear();
        self.tag_handles.clear();

        if implicit
            && !self.at_any(&[
                SyntaxKind::DIRECTIVE,
                SyntaxKind::DOC_START,
                SyntaxKind::STREAM_END,
            ])
        {
            self.parse_node(true, false);
        } else {
            self.parse_directives();
            if !self.failed() {
                if self.peek() == SyntaxKind::DOC_START {
                    self.bump();
                    if !self.at_any(&[
                        SyntaxKind::DIRECTIVE,
                        SyntaxKind::DOC_START,
                        SyntaxKind::DOC_END,
                        SyntaxKind::STREAM_END,
                    ]) {
                        self.parse_node(true, false);
                    }
                } else {
                    self.error_here("did not find expected <document start>");
                }
            }
        }

        if !self.failed() {
            while self.peek() == SyntaxKind::DOC_END {
                self.bump();
            }
            self.flush_trivia();
        }
        self.finish_node();
    }

    fn parse_directives(&mut self) {
        let mut version_seen = false;
        while !self.failed() && self.peek() == SyntaxKind::DIRECTIVE {
            let token = self.peek_token();
            let mut words = token.text[1..].split_whitespace();
            match words.next() {
                Some("YAML") => {
                    if version_seen {
                        return self.error_here("found duplicate %YAML directive");
                    }
                    version_seen = true;
                    let version = words.next().and_then(|version| {
                        let (major, minor) = version.split_once('.')?;
                        Some((major.parse::<u32>().ok()?, minor.parse::<u32>().ok()?))
                    });
                    match version {
                        Some((1, 1 | 2)) => {}
                        Some(_) => return self.error_here("found incompatible YAML document"),
                        None => {
                            return self.error_here("did not find expected digit or '.' character")
                        }
                    }
                }
                Some("TAG") => {
                    let (Some(handle), Some(prefix)) = (words.next(), words.next()) else {
                        return self.error_here("did not find expected whitespace");
                    };
                    if !handle.starts_with('!') || !handle.ends_with('!') {
                        return self.error_here("did not find expected '!'");
                    }
                    if self.tag_handles.iter().any(|(known, _)| known == handle) {
                        return self.error_here("found duplicate %TAG directive");
                    }
                    self.tag_handles
                        .push((handle.to_string(), prefix.to_string()));
                }
                _ => return self.error_here("found unknown directive name"),
            }
            self.bump();
        }
    }

    /// Parse one node with its properties. `block` allows block
    /// collections; `indentless` allows a sequence whose dashes sit at the
    /// column of the enclosing mapping's keys.
    fn parse_node(&mut self, block: bool, indentless: bool) {
        if self.failed() {
            return;
        }
        if self.peek() == SyntaxKind::REFERENCE {
            self.start_node(SyntaxKind::ALIAS);
            let token = self.peek_token();
            let name = &token.text[1..];
            if self.anchors.contains(name) {
                self.bump();
            } else {
                self.error_here(format!("unknown anchor '{}' referenced", name));
            }
            self.finish_node();
            return;
        }

        self.flush_trivia();
        let checkpoint = self.builder.checkpoint();
        let mut has_anchor = false;
        let mut has_tag = false;
        loop {
            let token = self.peek_token();
            match token.kind {
                SyntaxKind::ANCHOR if !has_anchor => {
                    self.anchors.insert(&token.text[1..]);
                    has_anchor = true;
                }
                SyntaxKind::TAG if !has_tag => {
                    if scalar::expand_tag(token.text, &self.tag_handles).is_none() {
                        return self.error_here("found undefined tag handle");
                    }
                    has_tag = true;
                }
                _ => break,
            }
            self.bump();
        }

        match self.peek() {
            SyntaxKind::DASH if indentless => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::SEQUENCE.into());
                self.parse_indentless_sequence();
                self.finish_node();
            }
            SyntaxKind::PLAIN | SyntaxKind::SINGLE_QUOTED | SyntaxKind::DOUBLE_QUOTED => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::SCALAR.into());
                self.bump();
                self.finish_node();
            }
            SyntaxKind::BLOCK_HEADER => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::SCALAR.into());
                self.bump();
                if self.peek() == SyntaxKind::BLOCK_TEXT {
                    self.bump();
                }
                self.finish_node();
            }
            SyntaxKind::LEFT_BRACKET => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::SEQUENCE.into());
                self.parse_flow_sequence();
                self.finish_node();
            }
            SyntaxKind::LEFT_BRACE => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::MAPPING.into());
                self.parse_flow_mapping();
                self.finish_node();
            }
            SyntaxKind::BLOCK_SEQUENCE_START if block => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::SEQUENCE.into());
                self.parse_block_sequence();
                self.finish_node();
            }
            SyntaxKind::BLOCK_MAPPING_START if block => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::MAPPING.into());
                self.parse_block_mapping();
                self.finish_node();
            }
            _ if has_anchor || has_tag => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::SCALAR.into());
                self.finish_node();
            }
            _ => self.error_here("did not find expected node content"),
        }
    }

    fn parse_block_sequence(&mut self) {
        self.bump();
        while !self.failed() {
            match self.peek() {
                SyntaxKind::DASH => {
                    self.start_node(SyntaxKind::SEQUENCE_ENTRY);
                    self.bump();
                    if !self.at_any(&[SyntaxKind::DASH, SyntaxKind::BLOCK_END]) {
                        self.parse_node(true, false);
                    }
                    self.finish_node();
                }
                SyntaxKind::BLOCK_END => {
                    self.bump();
                    break;
                }
                _ => self.error_here("did not find expected '-' indicator"),
            }
        }
    }

    fn parse_indentless_sequence(&mut self) {
        while !self.failed() && self.peek() == SyntaxKind::DASH {
            self.start_node(SyntaxKind::SEQUENCE_ENTRY);
            self.bump();
            if !self.at_any(&[
                SyntaxKind::DASH,
                SyntaxKind::IMPLICIT_KEY,
                SyntaxKind::QUESTION,
                SyntaxKind::COLON,
                SyntaxKind::BLOCK_END,
            ]) {
                self.parse_node(true, false);
            }
            self.finish_node();
        }
    }

    const BLOCK_MAPPING_STOP: &'static [SyntaxKind] = &[
        SyntaxKind::IMPLICIT_KEY,
        SyntaxKind::QUESTION,
        SyntaxKind::COLON,
        SyntaxKind::BLOCK_END,
    ];

    fn parse_block_mapping(&mut self) {
        self.bump();
        while !self.failed() {
            match self.peek() {
                SyntaxKind::IMPLICIT_KEY | SyntaxKind::QUESTION => {
                    self.start_node(SyntaxKind::MAPPING_ENTRY);
                    self.start_node(SyntaxKind::KEY);
                    self.bump();
                    if !self.at_any(Self::BLOCK_MAPPING_STOP) {
                        self.parse_node(true, true);
                    }
                    self.finish_node();
                    self.parse_block_mapping_value();
                    self.finish_node();
                }
                SyntaxKind::COLON => {
                    self.start_node(SyntaxKind::MAPPING_ENTRY);
                    self.start_node(SyntaxKind::KEY);
                    self.finish_node();
                    self.parse_block_mapping_value();
                    self.finish_node();
                }
                SyntaxKind::BLOCK_END => {
                    self.bump();
                    break;
                }
                _ => self.error_here("did not find expected key"),
            }
        }
    }

    fn parse_block_mapping_value(&mut self) {
        if self.failed() || self.peek() != SyntaxKind::COLON {
            return;
        }
        self.bump();
        self.start_node(SyntaxKind::VALUE);
        if !self.at_any(Self::BLOCK_MAPPING_STOP) {
            self.parse_node(true, true);
        }
        self.finish_node();
    }

    fn parse_flow_sequence(&mut self) {
        self.bump();
        let mut first = true;
        while !self.failed() {
            if self.peek() == SyntaxKind::RIGHT_BRACKET {
                self.bump();
                break;
            }
            if !first {
                if self.peek() != SyntaxKind::COMMA {
                    self.error_here("did not find expected ',' or ']'");
                    break;
                }
                self.bump();
                if self.peek() == SyntaxKind::RIGHT_BRACKET {
                    continue;
                }
            }
            first = false;

            self.start_node(SyntaxKind::SEQUENCE_ENTRY);
            if self.at_any(&[SyntaxKind::IMPLICIT_KEY, SyntaxKind::QUESTION]) {
                // A single pair mapping such as `[a: b]`.
                self.start_node(SyntaxKind::MAPPING);
                self.start_node(SyntaxKind::MAPPING_ENTRY);
                self.start_node(SyntaxKind::KEY);
                self.bump();
                if !self.at_any(&[
                    SyntaxKind::COLON,
                    SyntaxKind::COMMA,
                    SyntaxKind::RIGHT_BRACKET,
                ]) {
                    self.parse_node(false, false);
                }
                self.finish_node();
                self.parse_flow_value(SyntaxKind::RIGHT_BRACKET);
                self.finish_node();
                self.finish_node();
            } else {
                self.parse_node(false, false);
            }
            self.finish_node();
        }
    }

    fn parse_flow_mapping(&mut self) {
        self.bump();
        let mut first = true;
        while !self.failed() {
            if self.peek() == SyntaxKind::RIGHT_BRACE {
                self.bump();
                break;
            }
            if !first {
                if self.peek() != SyntaxKind::COMMA {
                    self.error_here("did not find expected ',' or '}'");
                    break;
                }
                self.bump();
                if self.peek() == SyntaxKind::RIGHT_BRACE {
                    continue;
                }
            }
            first = false;

            self.start_node(SyntaxKind::MAPPING_ENTRY);
            self.start_node(SyntaxKind::KEY);
            if self.at_any(&[SyntaxKind::IMPLICIT_KEY, SyntaxKind::QUESTION]) {
                self.bump();
                if !self.at_any(&[
                    SyntaxKind::COLON,
                    SyntaxKind::COMMA,
                    SyntaxKind::RIGHT_BRACE,
                ]) {
                    self.parse_node(false, false);
                }
                self.finish_node();
                self.parse_flow_value(SyntaxKind::RIGHT_BRACE);
            } else {
                self.parse_node(false, false);
                self.finish_node();
            }
            self.finish_node();
        }
    }

    fn parse_flow_value(&mut self, closing: SyntaxKind) {
        if self.failed() || self.peek() != SyntaxKind::COLON {
            return;
        }
        self.bump();
        self.start_node(SyntaxKind::VALUE);
        if !self.at_any(&[SyntaxKind::COMMA, closing]) {
            self.parse_node(false, false);
        }
        self.finish_node();
    }
}

/// Parse a complete YAML stream.
pub fn parse(text: &str) -> ParsedYaml {
    Parser::new(text, true).parse()
}

/// Parse one chunk of a larger stream.
///
/// `implicit_start` is false when the chunk follows a document closed with
/// `...`, in which case the chunk has to open with `---` or directives.
pub(crate) fn parse_chunk(text: &str, implicit_start: bool) -> ParsedYaml {
    Parser::new(text, implicit_start).parse()
}
