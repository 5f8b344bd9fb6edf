//! # Pipelined Merge
//!
//! [`AsyncMergeEngine`] merges sources whose pulls are futures. It keeps many
//! pulls outstanding at once to hide source latency. It still holds the
//! guarantees of the blocking merge: global timestamp order, per-source order,
//! and no record dropped or duplicated.
//!
//! ## States
//!
//! - **Warmup**: one pull per source, all concurrent. Once every source has
//!   answered, first records enter the buffer in source-index order. Sources
//!   that answered end-of-stream are already exhausted.
//! - **Running**: each cycle tops up speculative pulls, waits until every
//!   active source has a record buffered, then pops the smallest record,
//!   prints it, and pulls again from that record's source.
//! - **Draining**: no source is active; the remaining buffer is printed.
//! - **Done**: `done()` is called once.
//!
//! ## Pull discipline
//!
//! A source is moved into the future of its outstanding pull and moved back
//! when the pull resolves, so no second pull can reach it in the meantime. The
//! [`SourceRegistry`] ticket tracks the same fact for the scheduling decisions.
//!
//! ## Backpressure
//!
//! Speculative pulls are issued only while buffered records plus outstanding
//! pulls stay below the configured high-water mark, and at most
//! `refill_batch` of them per cycle. Pulls that replace an emitted record
//! (the source's own lineage) are issued regardless, so the buffer can
//! exceed the mark by at most one record per source.
//!
//! ## Failure
//!
//! A pull that fails aborts the merge. Outstanding pulls are dropped, `done()`
//! is not called, and [`MergeError::Source`] is returned. A source that never
//! resolves stalls the merge; bounding pull latency is the caller's job.

use crate::buffer::OrderedBuffer;
use crate::config::MergeConfig;
use crate::error::{MergeError, SourceError};
use crate::record::{Record, SourceId};
use crate::registry::{PullTicket, SourceRegistry};
use crate::sink::RecordSink;
use crate::source::{AsyncRecordSource, PullResult};
use crate::stats::MergeStats;
use crate::time::Timestamped;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use std::time::Instant;
use tracing::{debug, error, info, trace};

/// A resolved pull: the ticket it held, the source handed back, and the answer.
type Completion<S> = (
  PullTicket,
  S,
  PullResult<<S as AsyncRecordSource>::Payload>,
);

type Pending<S> = FuturesUnordered<BoxFuture<'static, Completion<S>>>;

/// Merges asynchronous sources into a sink with bounded prefetching.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use sortweave::async_merge::AsyncMergeEngine;
/// use sortweave::config::MergeConfig;
/// use sortweave::sinks::VecSink;
/// use sortweave::sources::VecSource;
/// use sortweave::time::Timestamped;
///
/// # tokio_test::block_on(async {
/// let at = |s| Utc.timestamp_opt(s, 0).unwrap();
/// let sources = vec![
///   VecSource::new(vec![Timestamped::new(1, at(1)), Timestamped::new(9, at(9))]),
///   VecSource::new(vec![Timestamped::new(2, at(2))]),
/// ];
///
/// let mut sink = VecSink::new();
/// let config = MergeConfig::default().with_high_water_mark(4);
/// AsyncMergeEngine::with_config(sources, config).run(&mut sink).await?;
/// assert_eq!(sink.payloads(), vec![1, 2, 9]);
/// # Ok::<(), sortweave::error::MergeError>(())
/// # }).unwrap();
/// ```
pub struct AsyncMergeEngine<S: AsyncRecordSource> {
  /// `None` while the source's pull is outstanding or after it is exhausted.
  slots: Vec<Option<S>>,
  buffer: OrderedBuffer<S::Payload>,
  registry: SourceRegistry,
  stats: MergeStats,
  config: MergeConfig,
  name: String,
  /// Where the next speculative round starts.
  cursor: usize,
}

impl<S> AsyncMergeEngine<S>
where
  S: AsyncRecordSource + 'static,
  S::Payload: 'static,
{
  /// Creates an engine over `sources` with the default configuration.
  pub fn new(sources: Vec<S>) -> Self {
    Self::with_config(sources, MergeConfig::default())
  }

  /// Creates an engine with an explicit configuration.
  pub fn with_config(sources: Vec<S>, config: MergeConfig) -> Self {
    let count = sources.len();
    Self {
      slots: sources.into_iter().map(Some).collect(),
      buffer: OrderedBuffer::with_capacity(count),
      registry: SourceRegistry::new(count),
      stats: MergeStats::for_sources(count),
      name: config.name_or("async_merge"),
      config,
      cursor: 0,
    }
  }

  /// Number of sources being merged.
  pub fn source_count(&self) -> usize {
    self.slots.len()
  }

  /// Runs the merge to completion.
  ///
  /// On success every record has been printed in timestamp order, `done()` has
  /// been called once, and the statistics are returned. On a source failure the
  /// sink keeps what it already received, `done()` is not called, and the
  /// failure is returned.
  pub async fn run<K>(mut self, sink: &mut K) -> Result<MergeStats, MergeError>
  where
    K: RecordSink<S::Payload> + ?Sized,
  {
    let started = Instant::now();
    let mut pending: Pending<S> = FuturesUnordered::new();

    self.warm_up(&mut pending).await?;
    debug!(
      merge = %self.name,
      active = self.registry.active_count(),
      buffered = self.buffer.len(),
      "warmup complete"
    );

    let mut draining = false;
    loop {
      self.prefetch(&mut pending)?;

      // The smallest buffered record is only safe to emit once every active
      // source has something buffered.
      while let Some(starved) = self.registry.starved() {
        if !self.registry.is_in_flight(starved) {
          self.dispatch(starved, &mut pending)?;
        }
        match pending.next().await {
          Some(completion) => self.complete(completion, &mut pending)?,
          None => break,
        }
      }

      let Some(record) = self.buffer.pop_min() else {
        break;
      };
      let source = record.source();
      self.registry.note_emitted(source);
      self.stats.record_emitted(source);
      sink.print(record);

      if self.registry.is_active(source) && !self.registry.is_in_flight(source) {
        self.dispatch(source, &mut pending)?;
      }
      if !self.slots.is_empty() {
        self.cursor = (source.index() + 1) % self.slots.len();
      }

      // Absorb whatever already resolved without yielding.
      while let Some(Some(completion)) = pending.next().now_or_never() {
        self.complete(completion, &mut pending)?;
      }

      if !draining && !self.registry.any_active() {
        draining = true;
        debug!(merge = %self.name, buffered = self.buffer.len(), "all sources exhausted, draining");
      }
    }

    debug_assert!(pending.is_empty(), "merge finished with pulls outstanding");
    self.stats.peak_buffered = self.buffer.peak();
    self.stats.peak_in_flight = self.registry.peak_in_flight();
    self.stats.elapsed = started.elapsed();
    sink.done();
    info!(
      merge = %self.name,
      emitted = self.stats.emitted,
      pulls = self.stats.pulls,
      peak_buffered = self.stats.peak_buffered,
      peak_in_flight = self.stats.peak_in_flight,
      elapsed_ms = self.stats.elapsed.as_millis() as u64,
      "merge complete"
    );
    Ok(self.stats)
  }

  /// Pulls once from every source and waits for all answers.
  async fn warm_up(&mut self, pending: &mut Pending<S>) -> Result<(), MergeError> {
    for index in 0..self.slots.len() {
      self.dispatch(SourceId(index), pending)?;
    }

    let mut first: Vec<Option<Timestamped<S::Payload>>> =
      std::iter::repeat_with(|| None).take(self.slots.len()).collect();
    while let Some((ticket, handle, result)) = pending.next().await {
      let source = self.settle(ticket, handle);
      match result {
        Ok(Some(entry)) => first[source.index()] = Some(entry),
        Ok(None) => self.exhaust(source),
        Err(err) => return Err(self.fail(source, err)),
      }
    }

    // Insertion order decides ties, so insert by source index rather than by
    // completion order.
    for (index, entry) in first.into_iter().enumerate() {
      if let Some(entry) = entry {
        self.accept(SourceId(index), entry);
      }
    }
    Ok(())
  }

  /// Issues speculative pulls while below the high-water mark.
  fn prefetch(&mut self, pending: &mut Pending<S>) -> Result<(), MergeError> {
    let mut budget = self.config.refill_batch;
    while budget > 0
      && self.buffer.len() + self.registry.in_flight_count() < self.config.high_water_mark
    {
      let Some(next) = self.registry.idle_from(SourceId(self.cursor)).next() else {
        break;
      };
      self.dispatch(next, pending)?;
      self.cursor = (next.index() + 1) % self.slots.len();
      budget -= 1;
    }
    Ok(())
  }

  /// Starts a pull against `source`, moving the source into the pull's future.
  fn dispatch(&mut self, source: SourceId, pending: &mut Pending<S>) -> Result<(), MergeError> {
    let ticket = self.registry.begin_pull(source)?;
    let Some(mut handle) = self.slots[source.index()].take() else {
      let _ = self.registry.finish_pull(ticket);
      return Err(MergeError::ConcurrentPull { source_id: source });
    };
    self.stats.pulls += 1;
    trace!(
      merge = %self.name,
      source = %source,
      in_flight = self.registry.in_flight_count(),
      "pull issued"
    );
    pending.push(
      async move {
        let result = handle.pull_async().await;
        (ticket, handle, result)
      }
      .boxed(),
    );
    Ok(())
  }

  /// Applies one resolved pull during the running phase.
  fn complete(
    &mut self,
    (ticket, handle, result): Completion<S>,
    pending: &mut Pending<S>,
  ) -> Result<(), MergeError> {
    let source = self.settle(ticket, handle);
    match result {
      Ok(Some(entry)) => {
        self.accept(source, entry);
        Ok(())
      }
      Ok(None) => {
        self.exhaust(source);
        if let Some(filler) = self.registry.pick_idle() {
          trace!(merge = %self.name, from = %source, to = %filler, "redirecting pull");
          self.dispatch(filler, pending)?;
        }
        Ok(())
      }
      Err(err) => Err(self.fail(source, err)),
    }
  }

  /// Returns the source to its slot and clears its in-flight marker.
  fn settle(&mut self, ticket: PullTicket, handle: S) -> SourceId {
    let source = self.registry.finish_pull(ticket);
    trace!(merge = %self.name, source = %source, "pull resolved");
    self.slots[source.index()] = Some(handle);
    source
  }

  fn accept(&mut self, source: SourceId, entry: Timestamped<S::Payload>) {
    self.buffer.insert(Record::new(source, entry));
    self.registry.note_buffered(source);
  }

  fn exhaust(&mut self, source: SourceId) {
    if self.registry.mark_exhausted(source) {
      self.slots[source.index()] = None;
      debug!(
        merge = %self.name,
        source = %source,
        remaining = self.registry.active_count(),
        "source exhausted"
      );
    }
  }

  fn fail(&self, source: SourceId, err: SourceError) -> MergeError {
    error!(merge = %self.name, source = %source, error = %err, "source pull failed");
    MergeError::Source {
      source_id: source,
      emitted: self.stats.emitted,
      error: err,
    }
  }
}
