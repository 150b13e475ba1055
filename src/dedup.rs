//! Duplicate suppression and the filter loop.

use crate::error::Result;
use crate::identity::Identity;
use crate::reader::DocumentReader;
use crate::writer::DocumentWriter;
use crate::FilterConfig;
use std::collections::HashSet;
use std::io::{BufRead, Write};
use tracing::{debug, trace, warn};

/// The identities emitted so far.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    identities: HashSet<Identity>,
}

impl SeenSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `identity`, returning whether it was not seen before.
    pub fn insert(&mut self, identity: Identity) -> bool {
        self.identities.insert(identity)
    }

    /// Whether `identity` was recorded.
    pub fn contains(&self, identity: &Identity) -> bool {
        self.identities.contains(identity)
    }

    /// Number of distinct identities recorded.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Whether nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

/// What to do with a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Write the document.
    Emit,
    /// Drop the document, an earlier one had the same identity.
    Suppress,
}

/// Decides per document whether it is a duplicate.
#[derive(Debug, Clone, Default)]
pub struct DedupFilter {
    seen: SeenSet,
}

impl DedupFilter {
    /// Create a filter that has seen nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide about a document with identity `identity`.
    ///
    /// Complete identities are emitted the first time only. Incomplete ones
    /// are always emitted and never recorded.
    pub fn admit(&mut self, identity: &Identity) -> Verdict {
        if !identity.is_complete() {
            return Verdict::Emit;
        }
        if self.seen.contains(identity) {
            return Verdict::Suppress;
        }
        self.seen.insert(identity.clone());
        Verdict::Emit
    }

    /// The identities emitted so far.
    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }
}

/// Counters of one filter run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Documents decoded from the input
    pub documents_read: usize,
    /// Documents written to the output
    pub emitted: usize,
    /// Duplicates dropped
    pub suppressed: usize,
    /// Distinct complete identities
    pub distinct: usize,
}

/// Copy the documents of `input` to `output`, dropping every document whose
/// complete identity was already written.
///
/// On error the output is flushed first, so documents written before the
/// failure stay in it.
pub fn filter_stream<R: BufRead, W: Write>(
    input: R,
    output: W,
    config: &FilterConfig,
) -> Result<FilterStats> {
    let mut writer = DocumentWriter::new(output, config.indentation);
    match run(DocumentReader::new(input), &mut writer) {
        Ok(stats) => {
            writer.finish()?;
            debug!(
                documents_read = stats.documents_read,
                emitted = stats.emitted,
                suppressed = stats.suppressed,
                distinct = stats.distinct,
                "finished filtering"
            );
            Ok(stats)
        }
        Err(err) => {
            if let Err(flush_err) = writer.flush() {
                warn!(error = %flush_err, "failed to flush output after error");
            }
            Err(err)
        }
    }
}

fn run<R: BufRead, W: Write>(
    reader: DocumentReader<R>,
    writer: &mut DocumentWriter<W>,
) -> Result<FilterStats> {
    let mut filter = DedupFilter::new();
    let mut stats = FilterStats::default();

    for document in reader {
        let document = document?;
        stats.documents_read += 1;

        let identity = document.identity();
        match filter.admit(&identity) {
            Verdict::Emit => {
                trace!(line = document.first_line(), %identity, "emitting document");
                writer.write_document(document.document())?;
                stats.emitted += 1;
            }
            Verdict::Suppress => {
                debug!(line = document.first_line(), %identity, "dropping duplicate");
                stats.suppressed += 1;
            }
        }
    }

    stats.distinct = filter.seen().len();
    Ok(stats)
}
