use crate::buffer::OrderedBuffer;
use crate::record::{Record, SourceId};
use crate::time::Timestamped;
use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

fn at(secs: i64) -> DateTime<Utc> {
  Utc.timestamp_opt(secs, 0).unwrap()
}

fn record(source: usize, secs: i64, payload: &'static str) -> Record<&'static str> {
  Record::new(SourceId(source), Timestamped::new(payload, at(secs)))
}

#[test]
fn test_pop_empty_returns_none() {
  let mut buffer: OrderedBuffer<i32> = OrderedBuffer::new();
  assert!(buffer.is_empty());
  assert_eq!(buffer.pop_min(), None);
  assert_eq!(buffer.len(), 0);
}

#[test]
fn test_pops_smallest_timestamp_first() {
  let mut buffer = OrderedBuffer::new();
  buffer.insert(record(0, 9, "c"));
  buffer.insert(record(1, 1, "a"));
  buffer.insert(record(2, 5, "b"));

  assert_eq!(buffer.peek_min().map(|r| *r.payload()), Some("a"));
  let order: Vec<_> = std::iter::from_fn(|| buffer.pop_min())
    .map(|r| *r.payload())
    .collect();
  assert_eq!(order, vec!["a", "b", "c"]);
}

#[test]
fn test_equal_timestamps_pop_in_insertion_order() {
  let mut buffer = OrderedBuffer::new();
  buffer.insert(record(1, 5, "first"));
  buffer.insert(record(0, 5, "second"));
  buffer.insert(record(2, 5, "third"));

  assert_eq!(buffer.pop_min().map(|r| r.source()), Some(SourceId(1)));
  assert_eq!(buffer.pop_min().map(|r| r.source()), Some(SourceId(0)));
  assert_eq!(buffer.pop_min().map(|r| r.source()), Some(SourceId(2)));
  assert!(buffer.pop_min().is_none());
}

#[test]
fn test_peak_tracks_largest_size() {
  let mut buffer = OrderedBuffer::new();
  buffer.insert(record(0, 1, "a"));
  buffer.insert(record(0, 2, "b"));
  buffer.pop_min();
  buffer.insert(record(0, 3, "c"));
  buffer.pop_min();
  buffer.pop_min();
  assert_eq!(buffer.peak(), 2);
  assert!(buffer.is_empty());
}

proptest! {
  #[test]
  fn test_drain_is_sorted_and_stable(times in prop::collection::vec(0i64..50, 0..200)) {
    let mut buffer = OrderedBuffer::new();
    for (index, secs) in times.iter().enumerate() {
      buffer.insert(Record::new(SourceId(0), Timestamped::new(index, at(*secs))));
    }

    let drained: Vec<_> = std::iter::from_fn(|| buffer.pop_min()).collect();
    prop_assert_eq!(drained.len(), times.len());
    for pair in drained.windows(2) {
      let (a, b) = (&pair[0], &pair[1]);
      prop_assert!(a.time() <= b.time());
      if a.time() == b.time() {
        prop_assert!(a.payload() < b.payload());
      }
    }
  }
}
