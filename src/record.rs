use crate::time::Timestamped;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of one input source, `0..N` in the order sources were handed to an engine.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct SourceId(pub usize);

impl SourceId {
  /// Returns the raw index.
  #[inline]
  pub const fn index(self) -> usize {
    self.0
  }
}

impl fmt::Display for SourceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<usize> for SourceId {
  fn from(index: usize) -> Self {
    Self(index)
  }
}

/// An entry ingested by an engine, tagged with the source it came from.
///
/// The source id is assigned on ingestion; it is not part of the source's data.
/// Ownership moves source → buffer → sink and the engine keeps nothing after
/// emission.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
  source: SourceId,
  entry: Timestamped<T>,
}

impl<T> Record<T> {
  /// Tags `entry` with its originating source.
  pub fn new(source: SourceId, entry: Timestamped<T>) -> Self {
    Self { source, entry }
  }

  /// The source this record came from.
  pub fn source(&self) -> SourceId {
    self.source
  }

  /// The ordering key.
  pub fn time(&self) -> DateTime<Utc> {
    self.entry.time
  }

  /// The payload.
  pub fn payload(&self) -> &T {
    &self.entry.payload
  }

  /// Borrows the underlying entry.
  pub fn entry(&self) -> &Timestamped<T> {
    &self.entry
  }

  /// Drops the source tag, returning the entry as the source produced it.
  pub fn into_entry(self) -> Timestamped<T> {
    self.entry
  }
}
