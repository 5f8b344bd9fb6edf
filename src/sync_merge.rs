//! # Blocking Merge
//!
//! [`SyncMergeEngine`] merges sources whose pulls complete immediately.
//!
//! ## States
//!
//! - **Init**: pull once from every source. A source that is empty from the
//!   start is marked exhausted and contributes nothing to the buffer.
//! - **Running**: pop the smallest record, print it, then pull from that
//!   record's source. If that source is exhausted, keep pulling from the
//!   lowest-numbered active source until a record arrives or no source is
//!   active.
//! - **Done**: the buffer is empty; `done()` is called once.
//!
//! The buffer holds at most one record per source that was active after init,
//! except that a redirected pull can leave a second record from its target.
//! Every active source always has at least one record buffered, so the popped
//! record is the global minimum.

use crate::buffer::OrderedBuffer;
use crate::config::MergeConfig;
use crate::error::MergeError;
use crate::record::{Record, SourceId};
use crate::registry::SourceRegistry;
use crate::sink::RecordSink;
use crate::source::RecordSource;
use crate::stats::MergeStats;
use std::time::Instant;
use tracing::{debug, error, info, trace};

/// Merges synchronous sources into a sink.
///
/// All state belongs to one merge: build an engine, call [`run`](Self::run),
/// and it is consumed.
pub struct SyncMergeEngine<S: RecordSource> {
  sources: Vec<S>,
  buffer: OrderedBuffer<S::Payload>,
  registry: SourceRegistry,
  stats: MergeStats,
  name: String,
}

impl<S: RecordSource> SyncMergeEngine<S> {
  /// Creates an engine over `sources`. Source ids follow vector order.
  pub fn new(sources: Vec<S>) -> Self {
    Self::with_config(sources, MergeConfig::default())
  }

  /// Creates an engine with an explicit configuration.
  pub fn with_config(sources: Vec<S>, config: MergeConfig) -> Self {
    let count = sources.len();
    Self {
      buffer: OrderedBuffer::with_capacity(count),
      registry: SourceRegistry::new(count),
      stats: MergeStats::for_sources(count),
      name: config.name_or("sync_merge"),
      sources,
    }
  }

  /// Number of sources being merged.
  pub fn source_count(&self) -> usize {
    self.sources.len()
  }

  /// Runs the merge to completion.
  ///
  /// On success every record has been printed, `done()` has been called once,
  /// and the statistics are returned. If a source fails, the records emitted so
  /// far stay with the sink, `done()` is not called, and the failure is returned.
  pub fn run<K>(mut self, sink: &mut K) -> Result<MergeStats, MergeError>
  where
    K: RecordSink<S::Payload> + ?Sized,
  {
    let started = Instant::now();

    for index in 0..self.sources.len() {
      self.pull_into_buffer(SourceId(index))?;
    }
    debug!(
      merge = %self.name,
      active = self.registry.active_count(),
      buffered = self.buffer.len(),
      "initial pull complete"
    );

    while let Some(record) = self.buffer.pop_min() {
      let source = record.source();
      self.registry.note_emitted(source);
      self.stats.record_emitted(source);
      sink.print(record);
      self.refill(source)?;
    }

    self.stats.peak_buffered = self.buffer.peak();
    self.stats.elapsed = started.elapsed();
    sink.done();
    info!(
      merge = %self.name,
      emitted = self.stats.emitted,
      pulls = self.stats.pulls,
      elapsed_ms = self.stats.elapsed.as_millis() as u64,
      "merge complete"
    );
    Ok(self.stats)
  }

  /// Pulls from `source` until a record is buffered, redirecting to the
  /// lowest active source whenever the current one turns out to be exhausted.
  fn refill(&mut self, source: SourceId) -> Result<(), MergeError> {
    let mut next = Some(source).filter(|&id| self.registry.is_active(id));
    while let Some(candidate) = next {
      if self.pull_into_buffer(candidate)? {
        return Ok(());
      }
      next = self.registry.pick_active();
      if let Some(redirect) = next {
        trace!(merge = %self.name, from = %candidate, to = %redirect, "redirecting pull");
      }
    }
    Ok(())
  }

  /// One blocking pull. Returns `true` if a record was buffered and `false`
  /// if the source reported end-of-stream.
  fn pull_into_buffer(&mut self, source: SourceId) -> Result<bool, MergeError> {
    self.stats.pulls += 1;
    match self.sources[source.index()].pull() {
      Ok(Some(entry)) => {
        self.buffer.insert(Record::new(source, entry));
        self.registry.note_buffered(source);
        Ok(true)
      }
      Ok(None) => {
        if self.registry.mark_exhausted(source) {
          debug!(
            merge = %self.name,
            source = %source,
            remaining = self.registry.active_count(),
            "source exhausted"
          );
        }
        Ok(false)
      }
      Err(err) => {
        error!(merge = %self.name, source = %source, error = %err, "source pull failed");
        Err(MergeError::Source {
          source_id: source,
          emitted: self.stats.emitted,
          error: err,
        })
      }
    }
  }
}
