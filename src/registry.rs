//! Per-source bookkeeping shared by both engines.
//!
//! [`SourceRegistry`] tracks three things per source:
//!
//! - **Active**: the source has not yet reported end-of-stream. A source
//!   leaves the active set exactly once and never comes back.
//! - **In flight**: a pull has been issued and not yet resolved (async engine).
//!   A source is in flight for at most one pull at a time; the only way to
//!   start a pull is [`SourceRegistry::begin_pull`], which hands out a
//!   [`PullTicket`] that must be returned through
//!   [`SourceRegistry::finish_pull`].
//! - **Buffered**: how many of the source's records sit in the ordered buffer.

use crate::error::MergeError;
use crate::record::SourceId;

/// Proof that a pull against one source is outstanding.
///
/// Tickets are not `Clone`; exactly one exists per in-flight source.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an in-flight pull must be finished with SourceRegistry::finish_pull"]
pub struct PullTicket {
  source: SourceId,
}

impl PullTicket {
  /// The source this pull targets.
  pub fn source(&self) -> SourceId {
    self.source
  }
}

#[derive(Clone, Debug)]
struct SourceState {
  active: bool,
  in_flight: bool,
  buffered: usize,
}

impl Default for SourceState {
  fn default() -> Self {
    Self {
      active: true,
      in_flight: false,
      buffered: 0,
    }
  }
}

/// Active set, in-flight set and buffered counts for one merge invocation.
#[derive(Clone, Debug)]
pub struct SourceRegistry {
  states: Vec<SourceState>,
  active: usize,
  in_flight: usize,
  peak_in_flight: usize,
}

impl SourceRegistry {
  /// Creates a registry with sources `0..count`, all active.
  pub fn new(count: usize) -> Self {
    Self {
      states: vec![SourceState::default(); count],
      active: count,
      in_flight: 0,
      peak_in_flight: 0,
    }
  }

  /// Number of sources the registry was created with.
  pub fn len(&self) -> usize {
    self.states.len()
  }

  /// Whether the registry tracks no sources at all.
  pub fn is_empty(&self) -> bool {
    self.states.is_empty()
  }

  /// Removes `source` from the active set. Returns `true` the first time,
  /// `false` on every later call.
  pub fn mark_exhausted(&mut self, source: SourceId) -> bool {
    match self.states.get_mut(source.index()) {
      Some(state) if state.active => {
        state.active = false;
        self.active -= 1;
        true
      }
      _ => false,
    }
  }

  /// Whether `source` has not yet reported end-of-stream.
  pub fn is_active(&self, source: SourceId) -> bool {
    self
      .states
      .get(source.index())
      .is_some_and(|state| state.active)
  }

  /// Whether any source is still active.
  pub fn any_active(&self) -> bool {
    self.active > 0
  }

  /// Number of active sources.
  pub fn active_count(&self) -> usize {
    self.active
  }

  /// Lowest-numbered active source.
  pub fn pick_active(&self) -> Option<SourceId> {
    self
      .states
      .iter()
      .position(|state| state.active)
      .map(SourceId)
  }

  /// Lowest-numbered active source with no pull in flight.
  pub fn pick_idle(&self) -> Option<SourceId> {
    self
      .states
      .iter()
      .position(|state| state.active && !state.in_flight)
      .map(SourceId)
  }

  /// Active sources with no pull in flight, starting at `start` and wrapping
  /// around once.
  pub fn idle_from(&self, start: SourceId) -> impl Iterator<Item = SourceId> + '_ {
    let count = self.states.len();
    (0..count)
      .map(move |offset| (start.index() + offset) % count)
      .filter(move |&index| {
        let state = &self.states[index];
        state.active && !state.in_flight
      })
      .map(SourceId)
  }

  /// Lowest-numbered active source with nothing buffered.
  ///
  /// While such a source exists the smallest buffered record is not yet known
  /// to be the global minimum.
  pub fn starved(&self) -> Option<SourceId> {
    self
      .states
      .iter()
      .position(|state| state.active && state.buffered == 0)
      .map(SourceId)
  }

  /// Marks `source` as having a pull in flight.
  ///
  /// Fails with [`MergeError::ConcurrentPull`] if one is already outstanding
  /// and with [`MergeError::PullAfterEnd`] if the source is exhausted. Both
  /// are logic defects in the caller.
  pub fn begin_pull(&mut self, source: SourceId) -> Result<PullTicket, MergeError> {
    let state = match self.states.get_mut(source.index()) {
      Some(state) if state.active => state,
      _ => {
        debug_assert!(false, "pull issued against exhausted source {source}");
        return Err(MergeError::PullAfterEnd { source_id: source });
      }
    };
    if state.in_flight {
      debug_assert!(false, "second concurrent pull issued against source {source}");
      return Err(MergeError::ConcurrentPull { source_id: source });
    }
    state.in_flight = true;
    self.in_flight += 1;
    self.peak_in_flight = self.peak_in_flight.max(self.in_flight);
    Ok(PullTicket { source })
  }

  /// Clears the in-flight marker held by `ticket`.
  pub fn finish_pull(&mut self, ticket: PullTicket) -> SourceId {
    let source = ticket.source;
    if let Some(state) = self.states.get_mut(source.index()) {
      if state.in_flight {
        state.in_flight = false;
        self.in_flight -= 1;
      }
    }
    source
  }

  /// Whether `source` has a pull outstanding.
  pub fn is_in_flight(&self, source: SourceId) -> bool {
    self
      .states
      .get(source.index())
      .is_some_and(|state| state.in_flight)
  }

  /// Number of outstanding pulls.
  pub fn in_flight_count(&self) -> usize {
    self.in_flight
  }

  /// Largest number of simultaneously outstanding pulls seen.
  pub fn peak_in_flight(&self) -> usize {
    self.peak_in_flight
  }

  /// Records that one of `source`'s records entered the buffer.
  pub fn note_buffered(&mut self, source: SourceId) {
    if let Some(state) = self.states.get_mut(source.index()) {
      state.buffered += 1;
    }
  }

  /// Records that one of `source`'s records left the buffer.
  pub fn note_emitted(&mut self, source: SourceId) {
    if let Some(state) = self.states.get_mut(source.index()) {
      state.buffered = state.buffered.saturating_sub(1);
    }
  }

  /// How many of `source`'s records are buffered.
  pub fn buffered(&self, source: SourceId) -> usize {
    self
      .states
      .get(source.index())
      .map_or(0, |state| state.buffered)
  }
}
