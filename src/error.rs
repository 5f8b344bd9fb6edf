//! # Error Handling
//!
//! Two layers of errors:
//!
//! - [`SourceError`]: a single pull failed. Sources return it instead of
//!   `Ok(None)`, which is reserved for a clean end-of-stream.
//! - [`MergeError`]: the merge as a whole failed. A source failure is always
//!   fatal; the engine stops, drops any outstanding pulls, never calls
//!   `done()` on the sink, and returns the error.
//!
//! An empty buffer is not an error: `OrderedBuffer::pop_min` returns `None`.

use crate::record::SourceId;
use thiserror::Error;

/// A pull operation failed, as opposed to reporting end-of-stream.
#[derive(Error, Debug)]
pub enum SourceError {
  /// Failure described by a message.
  #[error("{0}")]
  Message(String),
  /// I/O failure while reading the underlying stream.
  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),
}

impl SourceError {
  /// Creates a message-only source error.
  pub fn new(message: impl Into<String>) -> Self {
    Self::Message(message.into())
  }
}

/// Terminal failure of a merge.
#[derive(Error, Debug)]
pub enum MergeError {
  /// A source's pull failed. The records emitted before the failure were
  /// already handed to the sink; no more will be.
  #[error("source {source_id} failed after {emitted} records were emitted: {error}")]
  Source {
    /// Failing source.
    source_id: SourceId,
    /// Records emitted before the failure.
    emitted: u64,
    /// What the source reported.
    #[source]
    error: SourceError,
  },
  /// A second pull was issued against a source that already had one in flight.
  #[error("source {source_id} already has a pull in flight")]
  ConcurrentPull {
    /// Offending source.
    source_id: SourceId,
  },
  /// A pull was issued against a source that already reported end-of-stream.
  #[error("source {source_id} was pulled after reporting end-of-stream")]
  PullAfterEnd {
    /// Offending source.
    source_id: SourceId,
  },
  /// The merge configuration could not be parsed.
  #[error("invalid merge configuration: {0}")]
  Config(#[from] serde_json::Error),
}

impl MergeError {
  /// The source responsible for this error, if any.
  pub fn source_id(&self) -> Option<SourceId> {
    match self {
      Self::Source { source_id, .. }
      | Self::ConcurrentPull { source_id }
      | Self::PullAfterEnd { source_id } => Some(*source_id),
      Self::Config(_) => None,
    }
  }

  /// Whether this is a source failure rather than an internal defect or a
  /// configuration problem.
  pub fn is_source_failure(&self) -> bool {
    matches!(self, Self::Source { .. })
  }
}
