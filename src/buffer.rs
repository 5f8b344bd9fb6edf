//! Timestamp-ordered buffer of records waiting to be emitted.
//!
//! [`OrderedBuffer`] is a min-heap keyed by `(timestamp, insertion sequence)`.
//! The sequence number makes ties first-in, first-out, so a merge over the
//! same inputs always emits equal timestamps in the same order.

use crate::record::Record;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Heap slot. Ordering is reversed so `BinaryHeap` pops the smallest key.
#[derive(Debug)]
struct Slot<T> {
  time: DateTime<Utc>,
  seq: u64,
  record: Record<T>,
}

impl<T> PartialEq for Slot<T> {
  fn eq(&self, other: &Self) -> bool {
    self.time == other.time && self.seq == other.seq
  }
}

impl<T> Eq for Slot<T> {}

impl<T> PartialOrd for Slot<T> {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl<T> Ord for Slot<T> {
  fn cmp(&self, other: &Self) -> Ordering {
    other
      .time
      .cmp(&self.time)
      .then_with(|| other.seq.cmp(&self.seq))
  }
}

/// Multiset of records ordered by timestamp, ties broken by insertion order.
///
/// `insert` and `pop_min` are O(log n). Popping an empty buffer returns
/// `None`; the engines use that to detect termination.
#[derive(Debug)]
pub struct OrderedBuffer<T> {
  heap: BinaryHeap<Slot<T>>,
  next_seq: u64,
  peak: usize,
}

impl<T> Default for OrderedBuffer<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> OrderedBuffer<T> {
  /// Creates an empty buffer.
  pub fn new() -> Self {
    Self {
      heap: BinaryHeap::new(),
      next_seq: 0,
      peak: 0,
    }
  }

  /// Creates an empty buffer with room for `capacity` records.
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      heap: BinaryHeap::with_capacity(capacity),
      next_seq: 0,
      peak: 0,
    }
  }

  /// Adds a record.
  pub fn insert(&mut self, record: Record<T>) {
    let seq = self.next_seq;
    self.next_seq += 1;
    self.heap.push(Slot {
      time: record.time(),
      seq,
      record,
    });
    self.peak = self.peak.max(self.heap.len());
  }

  /// Removes and returns the record with the smallest timestamp, or `None`
  /// when the buffer is empty.
  pub fn pop_min(&mut self) -> Option<Record<T>> {
    self.heap.pop().map(|slot| slot.record)
  }

  /// The record `pop_min` would return next.
  pub fn peek_min(&self) -> Option<&Record<T>> {
    self.heap.peek().map(|slot| &slot.record)
  }

  /// Number of buffered records.
  pub fn len(&self) -> usize {
    self.heap.len()
  }

  /// Whether the buffer holds no records.
  pub fn is_empty(&self) -> bool {
    self.heap.is_empty()
  }

  /// Largest size the buffer has reached.
  pub fn peak(&self) -> usize {
    self.peak
  }
}
