//! Reference sinks.
//!
//! - [`VecSink`]: collects records in memory; clones share the same storage.
//! - [`ConsoleSink`]: writes one line per record and a throughput summary on
//!   `done()`.

use crate::record::Record;
use crate::sink::RecordSink;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Display;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::warn;

/// Sink that collects every record it is handed.
#[derive(Debug)]
pub struct VecSink<T> {
  records: Arc<Mutex<Vec<Record<T>>>>,
  done_calls: Arc<AtomicUsize>,
}

impl<T> Clone for VecSink<T> {
  fn clone(&self) -> Self {
    Self {
      records: Arc::clone(&self.records),
      done_calls: Arc::clone(&self.done_calls),
    }
  }
}

impl<T> Default for VecSink<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> VecSink<T> {
  /// Creates an empty sink.
  pub fn new() -> Self {
    Self {
      records: Arc::new(Mutex::new(Vec::new())),
      done_calls: Arc::new(AtomicUsize::new(0)),
    }
  }

  // A panicking test thread can poison the lock; the data is still usable.
  fn lock(&self) -> MutexGuard<'_, Vec<Record<T>>> {
    self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Number of records received.
  pub fn len(&self) -> usize {
    self.lock().len()
  }

  /// Whether no record was received.
  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  /// How many times `done()` was called.
  pub fn done_calls(&self) -> usize {
    self.done_calls.load(Ordering::SeqCst)
  }

  /// Takes the collected records, leaving the sink empty.
  pub fn take(&self) -> Vec<Record<T>> {
    std::mem::take(&mut *self.lock())
  }

  /// Timestamps of the collected records, in arrival order.
  pub fn times(&self) -> Vec<DateTime<Utc>> {
    self.lock().iter().map(Record::time).collect()
  }
}

impl<T: Clone> VecSink<T> {
  /// Copies of the collected records, in arrival order.
  pub fn records(&self) -> Vec<Record<T>> {
    self.lock().clone()
  }

  /// Payloads of the collected records, in arrival order.
  pub fn payloads(&self) -> Vec<T> {
    self.lock().iter().map(|record| record.payload().clone()).collect()
  }
}

impl<T> RecordSink<T> for VecSink<T> {
  fn print(&mut self, record: Record<T>) {
    self.lock().push(record);
  }

  fn done(&mut self) {
    self.done_calls.fetch_add(1, Ordering::SeqCst);
  }
}

/// Sink that writes records as text lines.
///
/// Each record becomes `<rfc3339 time> [source N] <payload>`. On `done()` the
/// sink writes how many records it printed, the time since its first record,
/// and the resulting rate. Write failures are logged and otherwise ignored.
pub struct ConsoleSink<W: Write = io::Stdout> {
  out: W,
  printed: u64,
  started: Option<Instant>,
  last: Option<DateTime<Utc>>,
}

impl ConsoleSink<io::Stdout> {
  /// Writes to standard output.
  pub fn stdout() -> Self {
    Self::new(io::stdout())
  }
}

impl<W: Write> ConsoleSink<W> {
  /// Writes to `out`.
  pub fn new(out: W) -> Self {
    Self {
      out,
      printed: 0,
      started: None,
      last: None,
    }
  }

  /// Records printed so far.
  pub fn printed(&self) -> u64 {
    self.printed
  }

  /// Consumes the sink, returning the writer.
  pub fn into_inner(self) -> W {
    self.out
  }

  fn write_summary(&mut self) -> io::Result<()> {
    let secs = self
      .started
      .map(|started| started.elapsed().as_secs_f64())
      .unwrap_or(0.0);
    let rate = if secs > 0.0 {
      self.printed as f64 / secs
    } else {
      0.0
    };
    writeln!(self.out, "***********************************")?;
    writeln!(self.out, "Logs printed:\t {}", self.printed)?;
    writeln!(self.out, "Time taken (s):\t {secs:.3}")?;
    writeln!(self.out, "Logs/s:\t\t {rate:.1}")?;
    writeln!(self.out, "***********************************")?;
    self.out.flush()
  }
}

impl<T: Display, W: Write> RecordSink<T> for ConsoleSink<W> {
  fn print(&mut self, record: Record<T>) {
    self.started.get_or_insert_with(Instant::now);
    if self.last.is_some_and(|last| record.time() < last) {
      warn!(source = %record.source(), "record printed out of timestamp order");
    }
    self.last = Some(record.time());
    self.printed += 1;
    let line = writeln!(
      self.out,
      "{} [source {}] {}",
      record.time().to_rfc3339_opts(SecondsFormat::Millis, true),
      record.source(),
      record.payload()
    );
    if let Err(err) = line {
      warn!(error = %err, "failed to write record");
    }
  }

  fn done(&mut self) {
    if let Err(err) = self.write_summary() {
      warn!(error = %err, "failed to write summary");
    }
  }
}
