//! Error types for manifest-dedup

use std::io;
use thiserror::Error;

/// Errors that end a filter run.
///
/// Documents written before the error stay in the output.
#[derive(Error, Debug)]
pub enum Error {
    /// The input is not valid YAML.
    #[error("yaml: line {line}, column {column}: {message}")]
    Decode {
        /// 1-based line in the whole input stream
        line: usize,
        /// 1-based column, counted in characters
        column: usize,
        /// What the parser expected or found
        message: String,
    },
    /// Reading the input failed.
    #[error("failed to read input")]
    Read(#[source] io::Error),
    /// Writing the output failed.
    #[error("failed to write output")]
    Encode(#[source] io::Error),
}

impl Error {
    /// Whether the error was caused by malformed input.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode { .. })
    }
}

/// Result type for filter operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_decode_display() {
        let err = Error::Decode {
            line: 4,
            column: 7,
            message: "mapping values are not allowed in this context".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "yaml: line 4, column 7: mapping values are not allowed in this context"
        );
        assert!(err.is_decode());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_io_errors_keep_source() {
        let err = Error::Encode(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        assert_eq!(err.to_string(), "failed to write output");
        assert_eq!(
            err.source().map(|source| source.to_string()).as_deref(),
            Some("pipe closed")
        );
        assert!(!err.is_decode());
    }
}
