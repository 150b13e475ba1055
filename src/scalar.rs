//! Scalar styles, tag resolution and scalar value decoding.
//!
//! Plain scalars are resolved to a short tag (`!!str`, `!!int`, ...) with
//! the YAML 1.1/1.2 core schema rules Kubernetes tooling applies. Quoted and
//! block scalars are always strings.

use once_cell::sync::Lazy;
use regex::Regex;

/// Short tag of null scalars.
pub const NULL_TAG: &str = "!!null";
/// Short tag of boolean scalars.
pub const BOOL_TAG: &str = "!!bool";
/// Short tag of string scalars.
pub const STR_TAG: &str = "!!str";
/// Short tag of integer scalars.
pub const INT_TAG: &str = "!!int";
/// Short tag of floating point scalars.
pub const FLOAT_TAG: &str = "!!float";
/// Short tag of timestamp scalars.
pub const TIMESTAMP_TAG: &str = "!!timestamp";
/// Short tag of the merge key `<<`.
pub const MERGE_TAG: &str = "!!merge";
/// Short tag of mappings.
pub const MAP_TAG: &str = "!!map";
/// Short tag of sequences.
pub const SEQ_TAG: &str = "!!seq";

const YAML_TAG_PREFIX: &str = "tag:yaml.org,2002:";

static FLOAT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?$")
        .expect("hard-coded regular expression to be valid")
});

static DOT_FLOAT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\.[0-9]+([eE][-+]?[0-9]+)?$").expect("hard-coded regular expression to be valid")
});

// Date only, `T` separated with a mandatory zone, or space separated without one.
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^([0-9]{4})-([0-9]{1,2})-([0-9]{1,2})",
        r"(?:[Tt]([0-9]{1,2}):([0-9]{1,2}):([0-9]{1,2})(?:\.[0-9]+)?(?:Z|[-+][0-9]{2}:[0-9]{2})",
        r"| ([0-9]{1,2}):([0-9]{1,2}):([0-9]{1,2})(?:\.[0-9]+)?)?$",
    ))
    .expect("hard-coded regular expression to be valid")
});

/// Style of scalar representation in YAML
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    /// Plain scalar (no quotes)
    Plain,
    /// Single-quoted scalar
    SingleQuoted,
    /// Double-quoted scalar
    DoubleQuoted,
    /// Literal scalar (|)
    Literal,
    /// Folded scalar (>)
    Folded,
}

impl ScalarStyle {
    /// Whether scalars of this style always resolve to `!!str`.
    pub fn is_quoted_or_block(self) -> bool {
        self != ScalarStyle::Plain
    }
}

/// Resolve the short tag of a decoded plain scalar.
pub fn resolve_plain(value: &str) -> &'static str {
    match value {
        "" | "~" | "null" | "Null" | "NULL" => return NULL_TAG,
        "true" | "True" | "TRUE" | "false" | "False" | "FALSE" => return BOOL_TAG,
        ".nan" | ".NaN" | ".NAN" => return FLOAT_TAG,
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" | "-.inf" | "-.Inf" | "-.INF" => {
            return FLOAT_TAG
        }
        "<<" => return MERGE_TAG,
        _ => {}
    }

    match value.as_bytes()[0] {
        b'.' if DOT_FLOAT_REGEX.is_match(value) => FLOAT_TAG,
        b'+' | b'-' | b'0'..=b'9' => {
            if is_timestamp(value) {
                return TIMESTAMP_TAG;
            }
            let plain = value.replace('_', "");
            if parses_as_int(&plain) {
                INT_TAG
            } else if FLOAT_REGEX.is_match(&plain)
                && plain.parse::<f64>().map_or(false, f64::is_finite)
            {
                FLOAT_TAG
            } else {
                STR_TAG
            }
        }
        _ => STR_TAG,
    }
}

/// Whether `text` is an integer literal: optional sign, then decimal,
/// `0x` hex, `0o`/leading-zero octal or `0b` binary digits within 64 bits.
fn parses_as_int(text: &str) -> bool {
    let (sign, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (Some('-'), &text[1..]),
        Some(b'+') => (Some('+'), &text[1..]),
        _ => (None, text),
    };

    let prefixed = |lower: &str, upper: &str| {
        unsigned
            .strip_prefix(lower)
            .or_else(|| unsigned.strip_prefix(upper))
    };
    let (radix, digits) = if let Some(rest) = prefixed("0x", "0X") {
        (16, rest)
    } else if let Some(rest) = prefixed("0o", "0O") {
        (8, rest)
    } else if let Some(rest) = prefixed("0b", "0B") {
        (2, rest)
    } else if unsigned.len() > 1 && unsigned.starts_with('0') {
        (8, &unsigned[1..])
    } else {
        (10, unsigned)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return false;
    }
    match u64::from_str_radix(digits, radix) {
        Ok(magnitude) => match sign {
            Some('-') => magnitude <= 1 << 63,
            Some(_) => magnitude <= i64::MAX as u64,
            None => true,
        },
        Err(_) => false,
    }
}

fn is_timestamp(value: &str) -> bool {
    let Some(captures) = TIMESTAMP_REGEX.captures(value) else {
        return false;
    };
    let number = |index: usize| -> Option<u32> {
        captures.get(index).and_then(|m| m.as_str().parse().ok())
    };
    let (Some(year), Some(month), Some(day)) = (number(1), number(2), number(3)) else {
        return false;
    };
    if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
        return false;
    }

    let time = if captures.get(4).is_some() {
        (number(4), number(5), number(6))
    } else {
        (number(7), number(8), number(9))
    };
    match time {
        (Some(hour), Some(minute), Some(second)) => hour < 24 && minute < 60 && second < 60,
        (None, None, None) => true,
        _ => false,
    }
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Expand the source text of a tag property to its full form.
///
/// `handles` holds the `%TAG` directives of the current document; the
/// primary `!` and secondary `!!` handles fall back to their defaults.
/// Returns `None` when the tag uses a handle nobody declared.
pub fn expand_tag(text: &str, handles: &[(String, String)]) -> Option<String> {
    if let Some(verbatim) = text.strip_prefix("!<").and_then(|t| t.strip_suffix('>')) {
        return Some(verbatim.to_string());
    }
    if text.len() < 2 {
        return Some(text.to_string());
    }

    let named_end = text[1..]
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .map(|i| i + 1)
        .filter(|&i| text[i..].starts_with('!'));
    let (handle, suffix) = match named_end {
        Some(i) => text.split_at(i + 1),
        None => text.split_at(1),
    };

    let prefix = handles
        .iter()
        .find(|(h, _)| h == handle)
        .map(|(_, prefix)| prefix.as_str())
        .or(match handle {
            "!" => Some("!"),
            "!!" => Some(YAML_TAG_PREFIX),
            _ => None,
        })?;
    Some(format!("{}{}", prefix, suffix))
}

/// Shorten a full tag to its `!!` form where possible.
pub fn shorten_tag(tag: &str) -> String {
    match tag.strip_prefix(YAML_TAG_PREFIX) {
        Some(rest) => format!("!!{}", rest),
        None => tag.to_string(),
    }
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Append the separator for a run of `breaks` folded line breaks.
fn push_folded(out: &mut String, breaks: usize) {
    match breaks {
        0 => {}
        1 => out.push(' '),
        n => out.extend(std::iter::repeat('\n').take(n - 1)),
    }
}

/// Decode a plain scalar, folding its line breaks.
pub fn decode_plain(text: &str) -> String {
    let mut lines = text.split('\n').map(|line| line.trim_end_matches('\r'));
    let mut out = lines
        .next()
        .unwrap_or_default()
        .trim_end_matches(is_blank)
        .to_string();
    let mut breaks = 0;
    for line in lines {
        breaks += 1;
        let line = line.trim_matches(is_blank);
        if line.is_empty() {
            continue;
        }
        push_folded(&mut out, breaks);
        breaks = 0;
        out.push_str(line);
    }
    out
}

/// Fold the lines of a quoted scalar body (without its quotes).
fn fold_quoted(inner: &str) -> String {
    let lines: Vec<&str> = inner.split('\n').collect();
    let last = lines.len() - 1;
    let mut out = String::new();
    let mut breaks = 0;
    for (index, line) in lines.into_iter().enumerate() {
        let mut piece = if index < last {
            line.trim_end_matches('\r').trim_end_matches(is_blank)
        } else {
            line
        };
        if index > 0 {
            piece = piece.trim_start_matches(is_blank);
            breaks += 1;
            if piece.is_empty() && index < last {
                continue;
            }
            push_folded(&mut out, breaks);
            breaks = 0;
        }
        out.push_str(piece);
    }
    out
}

fn strip_quotes(text: &str, quote: char) -> &str {
    let text = text.strip_prefix(quote).unwrap_or(text);
    text.strip_suffix(quote).unwrap_or(text)
}

/// Decode a single-quoted scalar including its quotes.
pub fn decode_single_quoted(text: &str) -> String {
    fold_quoted(strip_quotes(text, '\'')).replace("''", "'")
}

/// Decode a double-quoted scalar including its quotes.
pub fn decode_double_quoted(text: &str) -> String {
    let mut out = String::new();
    let mut whitespace = String::new();
    let mut breaks = 0;
    // Blanks after a line break are indentation, not content.
    let mut leading = false;
    let mut escaped_break = false;
    let mut chars = strip_quotes(text, '"').chars().peekable();

    let join = |out: &mut String, whitespace: &mut String, breaks: &mut usize, escaped: &mut bool| {
        if *escaped {
            out.extend(std::iter::repeat('\n').take(*breaks));
        } else if *breaks > 0 {
            push_folded(out, *breaks);
        } else {
            out.push_str(whitespace);
        }
        whitespace.clear();
        *breaks = 0;
        *escaped = false;
    };

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' => {
                if !leading {
                    whitespace.push(c);
                }
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                if leading {
                    breaks += 1;
                } else {
                    whitespace.clear();
                    breaks = 1;
                    leading = true;
                }
            }
            '\\' => {
                let Some(escape) = chars.next() else {
                    break;
                };
                if escape == '\n' || escape == '\r' {
                    if escape == '\r' && chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    join(&mut out, &mut whitespace, &mut breaks, &mut escaped_break);
                    escaped_break = true;
                    leading = true;
                    continue;
                }
                join(&mut out, &mut whitespace, &mut breaks, &mut escaped_break);
                leading = false;
                match escape {
                    '0' => out.push('\0'),
                    'a' => out.push('\x07'),
                    'b' => out.push('\x08'),
                    't' | '\t' => out.push('\t'),
                    'n' => out.push('\n'),
                    'v' => out.push('\x0b'),
                    'f' => out.push('\x0c'),
                    'r' => out.push('\r'),
                    'e' => out.push('\x1b'),
                    'N' => out.push('\u{85}'),
                    '_' => out.push('\u{a0}'),
                    'L' => out.push('\u{2028}'),
                    'P' => out.push('\u{2029}'),
                    'x' | 'u' | 'U' => {
                        let width = match escape {
                            'x' => 2,
                            'u' => 4,
                            _ => 8,
                        };
                        let digits: String = chars.by_ref().take(width).collect();
                        let decoded = u32::from_str_radix(&digits, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .unwrap_or(char::REPLACEMENT_CHARACTER);
                        out.push(decoded);
                    }
                    other => out.push(other),
                }
            }
            _ => {
                join(&mut out, &mut whitespace, &mut breaks, &mut escaped_break);
                leading = false;
                out.push(c);
            }
        }
    }
    join(&mut out, &mut whitespace, &mut breaks, &mut escaped_break);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chomping {
    Strip,
    Clip,
    Keep,
}

/// Decode a block scalar from its header (`|`, `>-`, `|2+`, ...) and body.
///
/// `parent_indent` is the column of the enclosing block collection, or -1
/// for a scalar at the document root.
pub fn decode_block(header: &str, body: &str, parent_indent: isize) -> String {
    let literal = header.starts_with('|');
    let mut chomping = Chomping::Clip;
    let mut explicit = None;
    for c in header.chars().skip(1) {
        match c {
            '-' => chomping = Chomping::Strip,
            '+' => chomping = Chomping::Keep,
            _ => {
                if let Some(digit) = c.to_digit(10) {
                    explicit = Some(digit as usize);
                }
            }
        }
    }

    let lines: Vec<(&str, bool)> = body
        .split_inclusive('\n')
        .map(|line| match line.strip_suffix('\n') {
            Some(content) => (content.trim_end_matches('\r'), true),
            None => (line, false),
        })
        .collect();
    let leading_spaces = |line: &str| line.len() - line.trim_start_matches(' ').len();

    let indent = match explicit {
        Some(n) if parent_indent >= 0 => parent_indent as usize + n,
        Some(n) => n,
        None => {
            let mut blank_max = 0;
            let mut first_content = 0;
            for (line, _) in &lines {
                let spaces = leading_spaces(line);
                if line[spaces..].is_empty() {
                    blank_max = blank_max.max(spaces);
                } else {
                    first_content = spaces;
                    break;
                }
            }
            let minimum = (parent_indent + 1).max(1) as usize;
            blank_max.max(first_content).max(minimum)
        }
    };

    let mut out = String::new();
    let mut leading_break = false;
    let mut leading_blank = false;
    let mut trailing_breaks = 0;
    for (line, has_break) in lines {
        let is_content = line.len() > indent && leading_spaces(line) >= indent;
        if !is_content {
            if has_break {
                trailing_breaks += 1;
            }
            continue;
        }

        let text = &line[indent..];
        let trailing_blank = text.starts_with(is_blank);
        if !literal && leading_break && !leading_blank && !trailing_blank {
            if trailing_breaks == 0 {
                out.push(' ');
            }
        } else if leading_break {
            out.push('\n');
        }
        out.extend(std::iter::repeat('\n').take(trailing_breaks));
        trailing_breaks = 0;

        leading_blank = trailing_blank;
        out.push_str(text);
        leading_break = has_break;
    }

    if chomping != Chomping::Strip && leading_break {
        out.push('\n');
    }
    if chomping == Chomping::Keep {
        out.extend(std::iter::repeat('\n').take(trailing_breaks));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_null_and_bool() {
        for value in ["", "~", "null", "Null", "NULL"] {
            assert_eq!(resolve_plain(value), NULL_TAG, "{:?}", value);
        }
        for value in ["true", "False", "TRUE"] {
            assert_eq!(resolve_plain(value), BOOL_TAG, "{:?}", value);
        }
        assert_eq!(resolve_plain("yes"), STR_TAG);
        assert_eq!(resolve_plain("nULL"), STR_TAG);
    }

    #[test]
    fn test_resolve_numbers() {
        for value in ["0", "42", "-17", "+3", "0x1F", "0o17", "017", "0b101", "1_000"] {
            assert_eq!(resolve_plain(value), INT_TAG, "{:?}", value);
        }
        for value in ["1.5", "-0.5", "1e3", "6.02E+23", ".5", "09", "1.", ".inf", "-.Inf", ".NaN"] {
            assert_eq!(resolve_plain(value), FLOAT_TAG, "{:?}", value);
        }
        for value in ["0x", "1.2.3", "-", "+", "0b102", "12abc", "v1", "1e"] {
            assert_eq!(resolve_plain(value), STR_TAG, "{:?}", value);
        }
    }

    #[test]
    fn test_resolve_integer_range() {
        assert_eq!(resolve_plain("18446744073709551615"), INT_TAG);
        assert_eq!(resolve_plain("-9223372036854775808"), INT_TAG);
        assert_eq!(resolve_plain("+9223372036854775808"), FLOAT_TAG);
        assert_eq!(resolve_plain("18446744073709551616"), FLOAT_TAG);
        assert_eq!(resolve_plain("1e999"), STR_TAG);
    }

    #[test]
    fn test_resolve_timestamps() {
        for value in [
            "2001-12-14",
            "2001-12-14t21:59:43.10-05:00",
            "2001-12-14 21:59:43.10",
            "2024-02-29",
        ] {
            assert_eq!(resolve_plain(value), TIMESTAMP_TAG, "{:?}", value);
        }
        for value in [
            "2001-13-01",
            "2023-02-29",
            "2001-12-14 21:59:43.10 -5",
            "2001-12-14T21:59:43",
        ] {
            assert_eq!(resolve_plain(value), STR_TAG, "{:?}", value);
        }
    }

    #[test]
    fn test_resolve_merge_and_strings() {
        assert_eq!(resolve_plain("<<"), MERGE_TAG);
        assert_eq!(resolve_plain("apps/v1"), STR_TAG);
        assert_eq!(resolve_plain("Deployment"), STR_TAG);
        assert_eq!(resolve_plain("1.2.3.4"), STR_TAG);
    }

    #[test]
    fn test_expand_tag() {
        let handles = vec![("!e!".to_string(), "tag:example.com,2000:".to_string())];
        assert_eq!(expand_tag("!!str", &[]).as_deref(), Some("tag:yaml.org,2002:str"));
        assert_eq!(expand_tag("!local", &[]).as_deref(), Some("!local"));
        assert_eq!(expand_tag("!", &[]).as_deref(), Some("!"));
        assert_eq!(expand_tag("!<tag:x>", &[]).as_deref(), Some("tag:x"));
        assert_eq!(expand_tag("!e!thing", &handles).as_deref(), Some("tag:example.com,2000:thing"));
        assert_eq!(expand_tag("!e!thing", &[]), None);
        assert_eq!(expand_tag("!a/b!c", &[]).as_deref(), Some("!a/b!c"));
    }

    #[test]
    fn test_secondary_handle_override() {
        let handles = vec![("!!".to_string(), "tag:example.com,2000:".to_string())];
        assert_eq!(expand_tag("!!str", &handles).as_deref(), Some("tag:example.com,2000:str"));
    }

    #[test]
    fn test_shorten_tag() {
        assert_eq!(shorten_tag("tag:yaml.org,2002:str"), "!!str");
        assert_eq!(shorten_tag("!local"), "!local");
    }

    #[test]
    fn test_decode_plain() {
        assert_eq!(decode_plain("hello"), "hello");
        assert_eq!(decode_plain("a\n  b"), "a b");
        assert_eq!(decode_plain("a\n\n  b"), "a\nb");
        assert_eq!(decode_plain("a  \n\n\n  b"), "a\n\nb");
    }

    #[test]
    fn test_decode_single_quoted() {
        assert_eq!(decode_single_quoted("'it''s'"), "it's");
        assert_eq!(decode_single_quoted("' padded '"), " padded ");
        assert_eq!(decode_single_quoted("'a\n   b'"), "a b");
        assert_eq!(decode_single_quoted("'a\n\n b'"), "a\nb");
        assert_eq!(decode_single_quoted("''"), "");
    }

    #[test]
    fn test_decode_double_quoted() {
        assert_eq!(decode_double_quoted(r#""a\tb\n""#), "a\tb\n");
        assert_eq!(decode_double_quoted(r#""\x41é\"""#), "Aé\"");
        assert_eq!(decode_double_quoted("\"a \n  b\""), "a b");
        assert_eq!(decode_double_quoted("\"a\n\n  b\""), "a\nb");
        assert_eq!(decode_double_quoted("\"a \\\n  b\""), "a b");
        assert_eq!(decode_double_quoted("\"a\\\n\n  b\""), "a\nb");
        assert_eq!(decode_double_quoted("\"trailing \""), "trailing ");
    }

    #[test]
    fn test_decode_literal_block() {
        assert_eq!(decode_block("|", "  line one\n  line two\n", -1), "line one\nline two\n");
        assert_eq!(decode_block("|-", "  text\n\n", -1), "text");
        assert_eq!(decode_block("|+", "  text\n\n", -1), "text\n\n");
        assert_eq!(decode_block("|", "  a\n\n  b\n", 0), "a\n\nb\n");
        assert_eq!(decode_block("|", "  a\n   b\n", -1), "a\n b\n");
    }

    #[test]
    fn test_decode_folded_block() {
        assert_eq!(decode_block(">", "  one\n  two\n\n  three\n", -1), "one two\nthree\n");
        assert_eq!(decode_block(">", "  one\n    more\n  two\n", -1), "one\n  more\ntwo\n");
        assert_eq!(decode_block(">", "  a\n\n\n  b\n", -1), "a\n\nb\n");
        assert_eq!(decode_block(">-", "  a\n  b\n\n", -1), "a b");
    }

    #[test]
    fn test_decode_block_explicit_indent() {
        assert_eq!(decode_block("|1", "  two spaces kept\n", 0), " two spaces kept\n");
        assert_eq!(decode_block("|2", "    x\n", -1), "  x\n");
    }

    #[test]
    fn test_decode_empty_block() {
        assert_eq!(decode_block("|", "", -1), "");
        assert_eq!(decode_block("|+", "\n\n", -1), "\n\n");
        assert_eq!(decode_block(">", "  last", -1), "last");
    }
}
