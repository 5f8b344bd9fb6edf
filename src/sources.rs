//! Reference sources.
//!
//! - [`VecSource`]: replays a pre-ordered vector, optionally with simulated
//!   latency and an injected failure. Its [`PullProbe`] lets tests watch how
//!   the engine pulls.
//! - [`RandomLogSource`]: a seeded generator of log lines with non-decreasing
//!   timestamps and random async latency.

use crate::error::SourceError;
use crate::source::{AsyncRecordSource, PullResult, RecordSource};
use crate::time::Timestamped;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
struct ProbeCounters {
  pulls: AtomicUsize,
  outstanding: AtomicUsize,
  max_outstanding: AtomicUsize,
  pulls_after_end: AtomicUsize,
}

/// Shared view of how a [`VecSource`] has been pulled.
#[derive(Clone, Debug, Default)]
pub struct PullProbe {
  counters: Arc<ProbeCounters>,
}

impl PullProbe {
  /// Pulls started so far.
  pub fn pulls(&self) -> usize {
    self.counters.pulls.load(Ordering::SeqCst)
  }

  /// Most pulls that were ever outstanding at the same time.
  pub fn max_outstanding(&self) -> usize {
    self.counters.max_outstanding.load(Ordering::SeqCst)
  }

  /// Pulls made after the source had already reported end-of-stream.
  pub fn pulls_after_end(&self) -> usize {
    self.counters.pulls_after_end.load(Ordering::SeqCst)
  }

  fn enter(&self) {
    self.counters.pulls.fetch_add(1, Ordering::SeqCst);
    let now = self.counters.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
    self.counters.max_outstanding.fetch_max(now, Ordering::SeqCst);
  }

  fn leave(&self) {
    self.counters.outstanding.fetch_sub(1, Ordering::SeqCst);
  }
}

/// Source that replays a vector of entries.
#[derive(Debug)]
pub struct VecSource<T> {
  entries: VecDeque<Timestamped<T>>,
  latency: Duration,
  failure: Option<(usize, String)>,
  pulled: usize,
  ended: bool,
  probe: PullProbe,
}

impl<T> VecSource<T> {
  /// Creates a source over `entries`, which must already be in time order.
  pub fn new(entries: Vec<Timestamped<T>>) -> Self {
    Self {
      entries: entries.into(),
      latency: Duration::ZERO,
      failure: None,
      pulled: 0,
      ended: false,
      probe: PullProbe::default(),
    }
  }

  /// A source with no entries.
  pub fn empty() -> Self {
    Self::new(Vec::new())
  }

  /// Makes every async pull wait `latency` before answering.
  #[must_use]
  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = latency;
    self
  }

  /// Makes the pull with zero-based index `pull` fail with `message`.
  #[must_use]
  pub fn failing_at(mut self, pull: usize, message: impl Into<String>) -> Self {
    self.failure = Some((pull, message.into()));
    self
  }

  /// Handle for observing this source's pulls after it is moved into an engine.
  pub fn probe(&self) -> PullProbe {
    self.probe.clone()
  }

  /// Entries not yet pulled.
  pub fn remaining(&self) -> usize {
    self.entries.len()
  }

  fn next_entry(&mut self) -> PullResult<T> {
    let index = self.pulled;
    self.pulled += 1;
    if self.ended {
      self.probe.counters.pulls_after_end.fetch_add(1, Ordering::SeqCst);
      return Ok(None);
    }
    if let Some((at, message)) = &self.failure {
      if *at == index {
        return Err(SourceError::new(message.clone()));
      }
    }
    let entry = self.entries.pop_front();
    self.ended = entry.is_none();
    Ok(entry)
  }
}

impl<T> RecordSource for VecSource<T> {
  type Payload = T;

  fn pull(&mut self) -> PullResult<T> {
    self.probe.enter();
    let result = self.next_entry();
    self.probe.leave();
    result
  }
}

#[async_trait]
impl<T: Send> AsyncRecordSource for VecSource<T> {
  type Payload = T;

  async fn pull_async(&mut self) -> PullResult<T> {
    self.probe.enter();
    if !self.latency.is_zero() {
      tokio::time::sleep(self.latency).await;
    }
    let result = self.next_entry();
    self.probe.leave();
    result
  }
}

/// Seeded generator of log lines.
///
/// Starts a random number of days (up to 40) before its start point and
/// moves forward by a random number of milliseconds on each pull, so
/// timestamps never decrease. The same seed and start point always produce
/// the same lines.
#[derive(Debug)]
pub struct RandomLogSource {
  rng: StdRng,
  label: String,
  remaining: usize,
  produced: usize,
  last: DateTime<Utc>,
  max_latency: Duration,
}

impl RandomLogSource {
  /// Maximum advance between consecutive lines.
  const MAX_STEP_MS: i64 = 10_000_000;

  /// Creates a generator of `count` lines, counting back from now.
  pub fn new(seed: u64, count: usize) -> Self {
    Self::starting_at(seed, count, Utc::now())
  }

  /// Creates a generator of `count` lines, counting back from `origin`.
  pub fn starting_at(seed: u64, count: usize, origin: DateTime<Utc>) -> Self {
    let mut rng = StdRng::seed_from_u64(seed);
    let days_back = rng.gen_range(0..=40);
    Self {
      rng,
      label: format!("source-{seed}"),
      remaining: count,
      produced: 0,
      last: origin - ChronoDuration::days(days_back),
      max_latency: Duration::ZERO,
    }
  }

  /// Makes every async pull wait a random time up to `max_latency`.
  #[must_use]
  pub fn with_max_latency(mut self, max_latency: Duration) -> Self {
    self.max_latency = max_latency;
    self
  }

  /// Sets the label written into each line.
  #[must_use]
  pub fn with_label(mut self, label: impl Into<String>) -> Self {
    self.label = label.into();
    self
  }

  fn generate(&mut self) -> Option<Timestamped<String>> {
    if self.remaining == 0 {
      return None;
    }
    self.remaining -= 1;
    self.produced += 1;
    let step = self.rng.gen_range(0..=Self::MAX_STEP_MS);
    self.last += ChronoDuration::milliseconds(step);
    let message = format!("{} event #{}", self.label, self.produced);
    Some(Timestamped::new(message, self.last))
  }
}

impl RecordSource for RandomLogSource {
  type Payload = String;

  fn pull(&mut self) -> PullResult<String> {
    Ok(self.generate())
  }
}

#[async_trait]
impl AsyncRecordSource for RandomLogSource {
  type Payload = String;

  async fn pull_async(&mut self) -> PullResult<String> {
    let max_ms = self.max_latency.as_millis() as u64;
    if max_ms > 0 {
      let delay = self.rng.gen_range(0..=max_ms);
      tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    Ok(self.generate())
  }
}
