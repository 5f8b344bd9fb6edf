use crate::record::SourceId;
use serde::Serialize;
use std::time::Duration;

/// Statistics for a completed merge.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
  /// Records handed to the sink.
  pub emitted: u64,
  /// Records emitted per source, indexed by source id.
  pub per_source: Vec<u64>,
  /// Pull operations issued, including the ones that reported end-of-stream.
  pub pulls: u64,
  /// Largest number of records buffered at once.
  pub peak_buffered: usize,
  /// Largest number of pulls outstanding at once. Always zero for the sync engine.
  pub peak_in_flight: usize,
  /// Wall time from start to `done()`.
  pub elapsed: Duration,
}

impl MergeStats {
  pub(crate) fn for_sources(count: usize) -> Self {
    Self {
      per_source: vec![0; count],
      ..Self::default()
    }
  }

  pub(crate) fn record_emitted(&mut self, source: SourceId) {
    self.emitted += 1;
    if let Some(count) = self.per_source.get_mut(source.index()) {
      *count += 1;
    }
  }

  /// Records emitted by `source`.
  pub fn emitted_by(&self, source: SourceId) -> u64 {
    self.per_source.get(source.index()).copied().unwrap_or(0)
  }

  /// Throughput over the whole merge. Zero if no time elapsed.
  pub fn records_per_second(&self) -> f64 {
    let secs = self.elapsed.as_secs_f64();
    if secs > 0.0 {
      self.emitted as f64 / secs
    } else {
      0.0
    }
  }
}
