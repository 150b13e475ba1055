//! Scanner for YAML streams.
//!
//! The scanner tracks flow level, block indentation and simple key
//! candidates while it tokenizes, so that the parser sees an unambiguous
//! token stream. Structure that has no text of its own (the start and end
//! of block collections, and the start of an implicit key) is reported as
//! zero-width marker tokens. Markers never end up in the syntax tree; every
//! other token is stored verbatim, so the tree reproduces the input exactly.

/// Lexical analysis: the variants are different kinds of "tokens".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    // Structural
    /// Root node of the syntax tree
    ROOT = 0,
    /// A YAML document
    DOCUMENT,
    /// A YAML mapping (key-value pairs)
    MAPPING,
    /// A key-value pair in a mapping
    MAPPING_ENTRY,
    /// The key half of a mapping entry
    KEY,
    /// The value half of a mapping entry
    VALUE,
    /// A YAML sequence (list)
    SEQUENCE,
    /// An entry in a sequence
    SEQUENCE_ENTRY,
    /// A YAML scalar value, including its properties
    SCALAR,
    /// An alias node like '*name'
    ALIAS,
    /// Input that could not be parsed
    ERROR,

    // Indicators
    /// Block sequence entry indicator '-'
    DASH,
    /// Explicit key indicator '?'
    QUESTION,
    /// Value indicator ':'
    COLON,
    /// Flow entry separator ','
    COMMA,
    /// Left bracket '['
    LEFT_BRACKET,
    /// Right bracket ']'
    RIGHT_BRACKET,
    /// Left brace '{'
    LEFT_BRACE,
    /// Right brace '}'
    RIGHT_BRACE,

    // Properties and directives
    /// YAML tag like '!tag' or '!!str'
    TAG,
    /// YAML anchor like '&anchor'
    ANCHOR,
    /// YAML reference like '*reference'
    REFERENCE,
    /// YAML directive like '%YAML 1.2'
    DIRECTIVE,
    /// Document start marker '---'
    DOC_START,
    /// Document end marker '...'
    DOC_END,

    // Scalar content
    /// Plain scalar text, possibly spanning several lines
    PLAIN,
    /// Single quoted scalar including its quotes
    SINGLE_QUOTED,
    /// Double quoted scalar including its quotes
    DOUBLE_QUOTED,
    /// Block scalar header like '|', '>-' or '|2'
    BLOCK_HEADER,
    /// Content lines of a block scalar
    BLOCK_TEXT,

    // Whitespace and formatting
    /// Spaces and tabs
    WHITESPACE,
    /// Newline characters
    NEWLINE,
    /// Leading whitespace that determines structure
    INDENT,
    /// Comments starting with '#'
    COMMENT,
    /// Remaining input after a scanner error
    INVALID,

    // Markers (zero width, never stored in the tree)
    /// Start of a block sequence
    BLOCK_SEQUENCE_START,
    /// Start of a block mapping
    BLOCK_MAPPING_START,
    /// End of the innermost block collection
    BLOCK_END,
    /// Start of an implicit mapping key
    IMPLICIT_KEY,
    /// End of input
    STREAM_END,
}

impl SyntaxKind {
    /// Whether this token carries no structure.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            SyntaxKind::WHITESPACE | SyntaxKind::NEWLINE | SyntaxKind::INDENT | SyntaxKind::COMMENT
        )
    }

    /// Whether this is a zero-width marker produced by the scanner.
    pub fn is_marker(self) -> bool {
        matches!(
            self,
            SyntaxKind::BLOCK_SEQUENCE_START
                | SyntaxKind::BLOCK_MAPPING_START
                | SyntaxKind::BLOCK_END
                | SyntaxKind::IMPLICIT_KEY
                | SyntaxKind::STREAM_END
        )
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

/// A token produced by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// The kind of token
    pub kind: SyntaxKind,
    /// The exact input text of the token, empty for markers
    pub text: &'a str,
    /// Byte offset of the token in the input
    pub offset: usize,
}

/// A scanner error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// Description of the problem
    pub message: String,
    /// Byte offset where the problem was found
    pub offset: usize,
}

impl LexError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Output of the scanner.
///
/// When scanning fails, the unscanned rest of the input is kept as a single
/// [`SyntaxKind::INVALID`] token, followed by the end marker.
#[derive(Debug, Clone)]
pub struct Lexed<'a> {
    /// The tokens, always terminated by [`SyntaxKind::STREAM_END`]
    pub tokens: Vec<Token<'a>>,
    /// The first scanner error, if any
    pub error: Option<LexError>,
}

/// Tokenize a YAML stream.
pub fn lex(input: &str) -> Lexed<'_> {
    Scanner::new(input).run()
}

fn is_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

fn is_blank_or_break(c: char) -> bool {
    c == ' ' || c == '\t' || is_break(c)
}

fn is_blank(c: Option<char>) -> bool {
    matches!(c, Some(' ' | '\t'))
}

fn is_blankz(c: Option<char>) -> bool {
    c.map_or(true, is_blank_or_break)
}

fn is_flow_indicator(c: char) -> bool {
    matches!(c, ',' | '[' | ']' | '{' | '}')
}

fn line_break_len(text: &str) -> Option<usize> {
    if text.starts_with("\r\n") {
        Some(2)
    } else if text.starts_with('\n') || text.starts_with('\r') {
        Some(1)
    } else {
        None
    }
}

/// Whether `text` starts with a `---` or `...` marker followed by a blank.
pub(crate) fn is_document_marker(text: &str, marker: &str) -> bool {
    text.starts_with(marker) && is_blankz(text[marker.len()..].chars().next())
}

/// Byte index of a `#` that starts a comment inside `line`.
fn comment_start(line: &str) -> Option<usize> {
    let mut previous = None;
    for (i, c) in line.char_indices() {
        if c == '#' && is_blank(previous) {
            return Some(i);
        }
        previous = Some(c);
    }
    None
}

#[derive(Debug, Clone, Copy, Default)]
struct SimpleKey {
    possible: bool,
    required: bool,
    token_index: usize,
    offset: usize,
    line: usize,
    column: usize,
}

type ScanResult<T> = Result<T, LexError>;

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token<'a>>,
    flow_level: usize,
    indent: isize,
    indents: Vec<isize>,
    simple_key_allowed: bool,
    /// One slot per flow level, plus the block level.
    simple_keys: Vec<SimpleKey>,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 0,
            tokens: Vec::new(),
            flow_level: 0,
            indent: -1,
            indents: Vec::new(),
            simple_key_allowed: true,
            simple_keys: vec![SimpleKey::default()],
        }
    }

    fn run(mut self) -> Lexed<'a> {
        let error = loop {
            match self.fetch_next_token() {
                Ok(true) => continue,
                Ok(false) => break None,
                Err(err) => break Some(err),
            }
        };
        if error.is_some() {
            let input = self.input;
            if self.pos < input.len() {
                self.tokens.push(Token {
                    kind: SyntaxKind::INVALID,
                    text: &input[self.pos..],
                    offset: self.pos,
                });
                self.pos = input.len();
            }
            self.marker(SyntaxKind::STREAM_END);
        }
        Lexed {
            tokens: self.tokens,
            error,
        }
    }

    fn rest(&self) -> &'a str {
        let input = self.input;
        &input[self.pos..]
    }

    fn error_here(&self, message: &str) -> LexError {
        LexError::new(message, self.pos)
    }

    fn emit(&mut self, kind: SyntaxKind, len: usize) {
        let text = &self.rest()[..len];
        for c in text.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        self.tokens.push(Token {
            kind,
            text,
            offset: self.pos,
        });
        self.pos += len;
    }

    fn marker(&mut self, kind: SyntaxKind) {
        self.tokens.push(Token {
            kind,
            text: "",
            offset: self.pos,
        });
    }

    fn fetch_next_token(&mut self) -> ScanResult<bool> {
        self.scan_to_next_token();
        self.stale_simple_keys()?;
        self.unroll_indent(self.column as isize);

        let rest = self.rest();
        let Some(c) = rest.chars().next() else {
            self.fetch_stream_end()?;
            return Ok(false);
        };
        let next = rest[c.len_utf8()..].chars().next();

        if self.column == 0 {
            if c == '%' {
                self.fetch_directive()?;
                return Ok(true);
            }
            if is_document_marker(rest, "---") {
                self.fetch_document_indicator(SyntaxKind::DOC_START)?;
                return Ok(true);
            }
            if is_document_marker(rest, "...") {
                self.fetch_document_indicator(SyntaxKind::DOC_END)?;
                return Ok(true);
            }
        }

        match c {
            '[' => self.fetch_flow_collection_start(SyntaxKind::LEFT_BRACKET)?,
            '{' => self.fetch_flow_collection_start(SyntaxKind::LEFT_BRACE)?,
            ']' => self.fetch_flow_collection_end(SyntaxKind::RIGHT_BRACKET)?,
            '}' => self.fetch_flow_collection_end(SyntaxKind::RIGHT_BRACE)?,
            ',' => self.fetch_flow_entry()?,
            '-' if is_blankz(next) => self.fetch_block_entry()?,
            '?' if self.flow_level > 0 || is_blankz(next) => self.fetch_key()?,
            ':' if self.flow_level > 0 || is_blankz(next) => self.fetch_value()?,
            '*' => self.fetch_anchor(SyntaxKind::REFERENCE)?,
            '&' => self.fetch_anchor(SyntaxKind::ANCHOR)?,
            '!' => self.fetch_tag()?,
            '|' | '>' if self.flow_level == 0 => self.fetch_block_scalar()?,
            '\'' => self.fetch_quoted(true)?,
            '"' => self.fetch_quoted(false)?,
            _ if self.can_start_plain(c, next) => self.fetch_plain_scalar()?,
            _ => return Err(self.error_here("found character that cannot start any token")),
        }
        Ok(true)
    }

    fn can_start_plain(&self, c: char, next: Option<char>) -> bool {
        let indicator = matches!(
            c,
            '-' | '?'
                | ':'
                | ','
                | '['
                | ']'
                | '{'
                | '}'
                | '#'
                | '&'
                | '*'
                | '!'
                | '|'
                | '>'
                | '\''
                | '"'
                | '%'
                | '@'
                | '`'
        );
        !(is_blank_or_break(c) || indicator)
            || (c == '-' && !is_blank(next))
            || (self.flow_level == 0 && (c == '?' || c == ':') && !is_blankz(next))
    }

    fn scan_to_next_token(&mut self) {
        loop {
            if self.pos == 0 && self.input.starts_with('\u{feff}') {
                // A byte order mark does not move the column.
                let input = self.input;
                let len = '\u{feff}'.len_utf8();
                self.tokens.push(Token {
                    kind: SyntaxKind::WHITESPACE,
                    text: &input[..len],
                    offset: 0,
                });
                self.pos = len;
                continue;
            }

            let rest = self.rest();
            let tabs_allowed = self.flow_level > 0 || !self.simple_key_allowed;
            let blanks = rest
                .find(|c: char| !(c == ' ' || (c == '\t' && tabs_allowed)))
                .unwrap_or(rest.len());
            if blanks > 0 {
                let kind = if self.column == 0 {
                    SyntaxKind::INDENT
                } else {
                    SyntaxKind::WHITESPACE
                };
                self.emit(kind, blanks);
                continue;
            }

            if rest.starts_with('#') {
                let len = rest.find(is_break).unwrap_or(rest.len());
                self.emit(SyntaxKind::COMMENT, len);
                continue;
            }

            if let Some(len) = line_break_len(rest) {
                self.emit(SyntaxKind::NEWLINE, len);
                if self.flow_level == 0 {
                    self.simple_key_allowed = true;
                }
                continue;
            }

            return;
        }
    }

    fn stale_simple_keys(&mut self) -> ScanResult<()> {
        let (line, pos) = (self.line, self.pos);
        for key in self.simple_keys.iter_mut() {
            if key.possible && (key.line < line || key.offset + 1024 < pos) {
                if key.required {
                    return Err(LexError::new("could not find expected ':'", key.offset));
                }
                key.possible = false;
            }
        }
        Ok(())
    }

    fn save_simple_key(&mut self) -> ScanResult<()> {
        let required = self.flow_level == 0 && self.indent == self.column as isize;
        if self.simple_key_allowed {
            self.remove_simple_key()?;
            let key = SimpleKey {
                possible: true,
                required,
                token_index: self.tokens.len(),
                offset: self.pos,
                line: self.line,
                column: self.column,
            };
            if let Some(slot) = self.simple_keys.last_mut() {
                *slot = key;
            }
        }
        Ok(())
    }

    fn remove_simple_key(&mut self) -> ScanResult<()> {
        if let Some(key) = self.simple_keys.last_mut() {
            if key.possible && key.required {
                return Err(LexError::new("could not find expected ':'", key.offset));
            }
            key.possible = false;
        }
        Ok(())
    }

    fn increase_flow_level(&mut self) {
        self.simple_keys.push(SimpleKey::default());
        self.flow_level += 1;
    }

    fn decrease_flow_level(&mut self) {
        if self.flow_level > 0 {
            self.flow_level -= 1;
            self.simple_keys.pop();
        }
    }

    /// Open a block collection at `column` unless one is already open there.
    ///
    /// With `at`, the marker is inserted before an already scanned token.
    fn roll_indent(&mut self, column: usize, at: Option<(usize, usize)>, kind: SyntaxKind) {
        if self.flow_level > 0 {
            return;
        }
        let column = column as isize;
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            match at {
                Some((index, offset)) => self.tokens.insert(
                    index,
                    Token {
                        kind,
                        text: "",
                        offset,
                    },
                ),
                None => self.marker(kind),
            }
        }
    }

    fn unroll_indent(&mut self, column: isize) {
        if self.flow_level > 0 {
            return;
        }
        while self.indent > column {
            self.marker(SyntaxKind::BLOCK_END);
            self.indent = self.indents.pop().unwrap_or(-1);
        }
    }

    fn fetch_stream_end(&mut self) -> ScanResult<()> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        self.marker(SyntaxKind::STREAM_END);
        Ok(())
    }

    fn fetch_directive(&mut self) -> ScanResult<()> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;

        let rest = self.rest();
        let line = &rest[..rest.find(is_break).unwrap_or(rest.len())];
        let end = comment_start(line).unwrap_or(line.len());
        let len = line[..end].trim_end_matches(|c: char| c == ' ' || c == '\t').len();
        self.emit(SyntaxKind::DIRECTIVE, len);
        Ok(())
    }

    fn fetch_document_indicator(&mut self, kind: SyntaxKind) -> ScanResult<()> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        self.emit(kind, 3);
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, kind: SyntaxKind) -> ScanResult<()> {
        self.save_simple_key()?;
        self.increase_flow_level();
        self.simple_key_allowed = true;
        self.emit(kind, 1);
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, kind: SyntaxKind) -> ScanResult<()> {
        self.remove_simple_key()?;
        self.decrease_flow_level();
        self.simple_key_allowed = false;
        self.emit(kind, 1);
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> ScanResult<()> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        self.emit(SyntaxKind::COMMA, 1);
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> ScanResult<()> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return Err(
                    self.error_here("block sequence entries are not allowed in this context")
                );
            }
            self.roll_indent(self.column, None, SyntaxKind::BLOCK_SEQUENCE_START);
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        self.emit(SyntaxKind::DASH, 1);
        Ok(())
    }

    fn fetch_key(&mut self) -> ScanResult<()> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return Err(self.error_here("mapping keys are not allowed in this context"));
            }
            self.roll_indent(self.column, None, SyntaxKind::BLOCK_MAPPING_START);
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = self.flow_level == 0;
        self.emit(SyntaxKind::QUESTION, 1);
        Ok(())
    }

    fn fetch_value(&mut self) -> ScanResult<()> {
        let key = self.simple_keys.last().copied().unwrap_or_default();
        if key.possible {
            self.tokens.insert(
                key.token_index,
                Token {
                    kind: SyntaxKind::IMPLICIT_KEY,
                    text: "",
                    offset: key.offset,
                },
            );
            self.roll_indent(
                key.column,
                Some((key.token_index, key.offset)),
                SyntaxKind::BLOCK_MAPPING_START,
            );
            if let Some(slot) = self.simple_keys.last_mut() {
                slot.possible = false;
            }
            self.simple_key_allowed = false;
        } else {
            if self.flow_level == 0 {
                if !self.simple_key_allowed {
                    return Err(self.error_here("mapping values are not allowed in this context"));
                }
                self.roll_indent(self.column, None, SyntaxKind::BLOCK_MAPPING_START);
            }
            self.simple_key_allowed = self.flow_level == 0;
        }
        self.emit(SyntaxKind::COLON, 1);
        Ok(())
    }

    fn fetch_anchor(&mut self, kind: SyntaxKind) -> ScanResult<()> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;

        let name = &self.rest()[1..];
        let len = name
            .find(|c: char| is_blank_or_break(c) || is_flow_indicator(c))
            .unwrap_or(name.len());
        if len == 0 {
            return Err(self.error_here("did not find expected alphabetic or numeric character"));
        }
        self.emit(kind, 1 + len);
        Ok(())
    }

    fn fetch_tag(&mut self) -> ScanResult<()> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;

        let rest = self.rest();
        let flow = self.flow_level > 0;
        let len = if rest.starts_with("!<") {
            match rest.find(|c: char| c == '>' || is_blank_or_break(c)) {
                Some(end) if rest[end..].starts_with('>') => end + 1,
                _ => return Err(self.error_here("did not find the expected '>'")),
            }
        } else {
            rest.find(|c: char| is_blank_or_break(c) || (flow && is_flow_indicator(c)))
                .unwrap_or(rest.len())
        };
        let after = rest[len..].chars().next();
        if !(is_blankz(after) || (flow && after == Some(','))) {
            return Err(LexError::new(
                "did not find expected whitespace or line break",
                self.pos + len,
            ));
        }
        self.emit(SyntaxKind::TAG, len);
        Ok(())
    }

    fn fetch_block_scalar(&mut self) -> ScanResult<()> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;

        let rest = self.rest();
        let mut len = 1;
        let mut explicit = None;
        let mut chomping = false;
        for c in rest[1..].chars().take(2) {
            match c {
                '+' | '-' if !chomping => chomping = true,
                '0' if explicit.is_none() => {
                    return Err(LexError::new(
                        "found an indentation indicator equal to 0",
                        self.pos + len,
                    ))
                }
                '1'..='9' if explicit.is_none() => explicit = c.to_digit(10),
                _ => break,
            }
            len += 1;
        }
        self.emit(SyntaxKind::BLOCK_HEADER, len);

        let rest = self.rest();
        let blanks = rest
            .find(|c: char| c != ' ' && c != '\t')
            .unwrap_or(rest.len());
        if blanks > 0 {
            self.emit(SyntaxKind::WHITESPACE, blanks);
        }
        let rest = self.rest();
        if rest.starts_with('#') {
            self.emit(
                SyntaxKind::COMMENT,
                rest.find(is_break).unwrap_or(rest.len()),
            );
        }
        let rest = self.rest();
        match line_break_len(rest) {
            Some(n) => self.emit(SyntaxKind::NEWLINE, n),
            None if rest.is_empty() => return Ok(()),
            None => return Err(self.error_here("did not find expected comment or line break")),
        }

        let len = self.block_text_len(explicit.map(|n| n as usize))?;
        if len > 0 {
            self.emit(SyntaxKind::BLOCK_TEXT, len);
        }
        Ok(())
    }

    /// Length of the block scalar content starting at the current line.
    fn block_text_len(&self, explicit: Option<usize>) -> ScanResult<usize> {
        let parent = self.indent;
        let mut indent = explicit.map(|n| if parent >= 0 { parent as usize + n } else { n });
        let rest = self.rest();
        let mut consumed = 0;
        let mut max_indent = 0;

        while consumed < rest.len() {
            let remaining = &rest[consumed..];
            let line_len = remaining.find('\n').map_or(remaining.len(), |i| i + 1);
            let line = &remaining[..line_len];
            let spaces = line.len() - line.trim_start_matches(' ').len();
            let after = &line[spaces..];
            let blank = after.trim_end_matches(is_break).is_empty();

            if after.starts_with('\t') && indent.map_or(true, |i| spaces < i) {
                return Err(LexError::new(
                    "found a tab character where an indentation space is expected",
                    self.pos + consumed + spaces,
                ));
            }

            match indent {
                None if blank => {
                    max_indent = max_indent.max(spaces);
                    consumed += line_len;
                }
                None => {
                    let minimum = (parent + 1).max(1) as usize;
                    indent = Some(max_indent.max(spaces).max(minimum));
                }
                Some(i) if blank || spaces >= i => consumed += line_len,
                Some(_) => break,
            }
        }
        Ok(consumed)
    }

    fn fetch_quoted(&mut self, single: bool) -> ScanResult<()> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let len = self.quoted_len(single)?;
        let kind = if single {
            SyntaxKind::SINGLE_QUOTED
        } else {
            SyntaxKind::DOUBLE_QUOTED
        };
        self.emit(kind, len);
        Ok(())
    }

    fn quoted_len(&self, single: bool) -> ScanResult<usize> {
        let rest = self.rest();
        let mut chars = rest.char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            if rest[..i].ends_with('\n')
                && (is_document_marker(&rest[i..], "---") || is_document_marker(&rest[i..], "..."))
            {
                return Err(LexError::new(
                    "found unexpected document indicator",
                    self.pos + i,
                ));
            }
            match c {
                '\'' if single => {
                    if rest[i + 1..].starts_with('\'') {
                        chars.next();
                    } else {
                        return Ok(i + 1);
                    }
                }
                '"' if !single => return Ok(i + 1),
                '\\' if !single => {
                    let Some((j, escape)) = chars.next() else {
                        break;
                    };
                    let width = match escape {
                        'x' => 2,
                        'u' => 4,
                        'U' => 8,
                        '0' | 'a' | 'b' | 't' | '\t' | 'n' | 'v' | 'f' | 'r' | 'e' | ' ' | '"'
                        | '/' | '\\' | 'N' | '_' | 'L' | 'P' | '\n' | '\r' => 0,
                        _ => {
                            return Err(LexError::new(
                                "found unknown escape character",
                                self.pos + j,
                            ))
                        }
                    };
                    for _ in 0..width {
                        match chars.next() {
                            Some((_, h)) if h.is_ascii_hexdigit() => {}
                            _ => {
                                return Err(LexError::new(
                                    "did not find expected hexdecimal number",
                                    self.pos + j,
                                ))
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        Err(LexError::new(
            "found unexpected end of stream",
            self.pos + rest.len(),
        ))
    }

    fn fetch_plain_scalar(&mut self) -> ScanResult<()> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let len = self.plain_len()?;
        self.emit(SyntaxKind::PLAIN, len);
        Ok(())
    }

    /// Length of the plain scalar at the current position.
    ///
    /// Continuation lines must be indented past the current block
    /// indentation; trailing blanks and breaks are left for the next token.
    fn plain_len(&self) -> ScanResult<usize> {
        let rest = self.rest();
        let flow = self.flow_level > 0;
        let min_indent = self.indent + 1;
        let mut end = 0;
        let mut i = 0;
        let mut column = self.column;
        let mut leading_break = false;

        loop {
            let here = &rest[i..];
            if column == 0 && (is_document_marker(here, "---") || is_document_marker(here, "...")) {
                break;
            }
            if here.starts_with('#') {
                break;
            }

            while let Some(c) = rest[i..].chars().next() {
                if is_blank_or_break(c) {
                    break;
                }
                let next = rest[i + c.len_utf8()..].chars().next();
                if flow && c == ':' && matches!(next, Some(',' | '?' | '[' | ']' | '{' | '}')) {
                    break;
                }
                if (c == ':' && is_blankz(next)) || (flow && is_flow_indicator(c)) {
                    break;
                }
                i += c.len_utf8();
                column += 1;
                end = i;
                leading_break = false;
            }

            match rest[i..].chars().next() {
                Some(c) if is_blank_or_break(c) => {}
                _ => break,
            }

            while let Some(c) = rest[i..].chars().next() {
                if c == ' ' || c == '\t' {
                    if leading_break && c == '\t' && (column as isize) < min_indent {
                        return Err(LexError::new(
                            "found a tab character that violates indentation",
                            self.pos + i,
                        ));
                    }
                    i += 1;
                    column += 1;
                } else if let Some(n) = line_break_len(&rest[i..]) {
                    i += n;
                    column = 0;
                    leading_break = true;
                } else {
                    break;
                }
            }

            if !flow && (column as isize) < min_indent {
                break;
            }
        }
        Ok(end)
    }
}
