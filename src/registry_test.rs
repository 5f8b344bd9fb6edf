use crate::error::MergeError;
use crate::record::SourceId;
use crate::registry::SourceRegistry;

#[test]
fn test_new_registry_has_every_source_active() {
  let registry = SourceRegistry::new(3);
  assert_eq!(registry.len(), 3);
  assert_eq!(registry.active_count(), 3);
  assert!(registry.any_active());
  assert!((0..3).all(|i| registry.is_active(SourceId(i))));
  assert_eq!(registry.pick_active(), Some(SourceId(0)));
}

#[test]
fn test_empty_registry() {
  let registry = SourceRegistry::new(0);
  assert!(registry.is_empty());
  assert!(!registry.any_active());
  assert_eq!(registry.pick_active(), None);
  assert_eq!(registry.idle_from(SourceId(0)).count(), 0);
}

#[test]
fn test_mark_exhausted_is_idempotent() {
  let mut registry = SourceRegistry::new(2);
  assert!(registry.mark_exhausted(SourceId(0)));
  assert!(!registry.mark_exhausted(SourceId(0)));
  assert!(!registry.mark_exhausted(SourceId(7)));
  assert_eq!(registry.active_count(), 1);
  assert!(!registry.is_active(SourceId(0)));
  assert_eq!(registry.pick_active(), Some(SourceId(1)));

  assert!(registry.mark_exhausted(SourceId(1)));
  assert!(!registry.any_active());
  assert_eq!(registry.pick_active(), None);
}

#[test]
fn test_pull_ticket_round_trip() {
  let mut registry = SourceRegistry::new(3);
  let ticket = registry.begin_pull(SourceId(1)).unwrap();
  assert_eq!(ticket.source(), SourceId(1));
  assert!(registry.is_in_flight(SourceId(1)));
  assert_eq!(registry.in_flight_count(), 1);
  assert_eq!(registry.pick_idle(), Some(SourceId(0)));

  assert_eq!(registry.finish_pull(ticket), SourceId(1));
  assert!(!registry.is_in_flight(SourceId(1)));
  assert_eq!(registry.in_flight_count(), 0);
  assert_eq!(registry.peak_in_flight(), 1);
}

#[test]
#[cfg_attr(debug_assertions, should_panic(expected = "second concurrent pull"))]
fn test_second_pull_on_same_source_is_rejected() {
  let mut registry = SourceRegistry::new(2);
  let _ticket = registry.begin_pull(SourceId(0)).unwrap();
  let second = registry.begin_pull(SourceId(0));
  assert!(matches!(
    second,
    Err(MergeError::ConcurrentPull { source_id }) if source_id == SourceId(0)
  ));
  assert_eq!(registry.in_flight_count(), 1);
}

#[test]
#[cfg_attr(debug_assertions, should_panic(expected = "exhausted source"))]
fn test_pull_after_end_is_rejected() {
  let mut registry = SourceRegistry::new(1);
  registry.mark_exhausted(SourceId(0));
  let result = registry.begin_pull(SourceId(0));
  assert!(matches!(result, Err(MergeError::PullAfterEnd { .. })));
}

#[test]
fn test_idle_from_wraps_and_skips_busy_sources() {
  let mut registry = SourceRegistry::new(5);
  let _busy = registry.begin_pull(SourceId(3)).unwrap();
  registry.mark_exhausted(SourceId(0));

  let order: Vec<_> = registry.idle_from(SourceId(2)).map(|s| s.index()).collect();
  assert_eq!(order, vec![2, 4, 1]);
}

#[test]
fn test_starved_tracks_buffered_counts() {
  let mut registry = SourceRegistry::new(2);
  assert_eq!(registry.starved(), Some(SourceId(0)));

  registry.note_buffered(SourceId(0));
  assert_eq!(registry.starved(), Some(SourceId(1)));
  registry.note_buffered(SourceId(1));
  registry.note_buffered(SourceId(1));
  assert_eq!(registry.starved(), None);
  assert_eq!(registry.buffered(SourceId(1)), 2);

  registry.note_emitted(SourceId(0));
  assert_eq!(registry.starved(), Some(SourceId(0)));
  registry.mark_exhausted(SourceId(0));
  assert_eq!(registry.starved(), None);
}
