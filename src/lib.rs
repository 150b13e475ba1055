#![deny(missing_docs)]
#![allow(clippy::type_complexity)]
#![warn(clippy::unnecessary_to_owned)]
#![warn(clippy::redundant_clone)]
#![warn(clippy::inefficient_to_string)]
#![warn(clippy::manual_string_new)]
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

//! A streaming filter that drops duplicate Kubernetes-style manifests.
//!
//! Documents are parsed into a lossless syntax tree based on the [rowan]
//! library, so surviving documents keep their comments, key order and
//! quoting. Only block indentation is normalized on output.

mod dedup;
mod diagnostics;
mod error;
mod identity;
mod lex;
mod parse;
mod reader;
mod scalar;
mod writer;
mod yaml;

pub use dedup::{filter_stream, DedupFilter, FilterStats, SeenSet, Verdict};
pub use error::{Error, Result};
pub use identity::{is_mapping, is_string, with_string_value, Identity};
pub use lex::SyntaxKind;
pub use parse::Parse;
pub use reader::{DocumentReader, SourceDocument};
pub use rowan::TextRange;
pub use scalar::ScalarStyle;
pub use writer::DocumentWriter;
pub use yaml::{
    Alias, Document, Lang, Mapping, MappingEntry, Node, Scalar, Sequence, SequenceEntry, Stream,
};

/// A positioned parse error containing location information.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionedParseError {
    /// The error message
    pub message: String,
    /// The text range where the error occurred
    pub range: rowan::TextRange,
    /// 1-based line of the start of the range
    pub line: usize,
    /// 1-based column of the start of the range, counted in characters
    pub column: usize,
}

impl std::fmt::Display for PositionedParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for PositionedParseError {}

/// List of encountered syntax errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParseError(pub Vec<String>);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for err in &self.0 {
            writeln!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// The indentation to use when writing documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indentation {
    /// Write every document exactly as it was read.
    Preserve,

    /// The number of spaces per block nesting level.
    Spaces(u32),
}

impl Default for Indentation {
    fn default() -> Self {
        Indentation::Spaces(2)
    }
}

/// Options of a filter run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterConfig {
    /// How block indentation is written.
    pub indentation: Indentation,
}

impl FilterConfig {
    /// A configuration that writes documents unchanged.
    pub fn preserving() -> Self {
        Self {
            indentation: Indentation::Preserve,
        }
    }
}
