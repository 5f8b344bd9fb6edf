//! Timestamped entries produced by sources.
//!
//! A source yields [`Timestamped<T>`] values in non-decreasing time order.
//! The timestamp is wall-clock event time (`chrono::DateTime<Utc>`), the key
//! every merge orders by. The payload is opaque to the engines.
//!
//! ## Ordering contract
//!
//! - **Per source**: a source must yield non-decreasing timestamps. The engines
//!   do not check this; a source that violates it produces an unordered merge.
//! - **Across sources**: equal timestamps are emitted in the order the engine
//!   inserted them into its buffer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A payload with an attached event timestamp.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Timestamped<T> {
  /// When the entry occurred. This is the merge ordering key.
  pub time: DateTime<Utc>,
  /// The payload.
  pub payload: T,
}

impl<T> Timestamped<T> {
  /// Creates a new timestamped entry.
  #[inline]
  pub const fn new(payload: T, time: DateTime<Utc>) -> Self {
    Self { time, payload }
  }

  /// Returns a reference to the payload.
  #[inline]
  pub const fn payload(&self) -> &T {
    &self.payload
  }

  /// Returns the timestamp.
  #[inline]
  pub const fn time(&self) -> DateTime<Utc> {
    self.time
  }

  /// Consumes the entry, returning the payload.
  #[inline]
  pub fn into_payload(self) -> T {
    self.payload
  }
}

/// Trait for payload types that carry their own event time.
///
/// Lets a source wrap domain values without the caller extracting the time by
/// hand.
///
/// # Example
///
/// ```rust
/// use chrono::{DateTime, TimeZone, Utc};
/// use sortweave::time::{HasEventTime, Timestamped};
///
/// struct LoginEvent {
///   user: String,
///   at: DateTime<Utc>,
/// }
///
/// impl HasEventTime for LoginEvent {
///   fn event_time(&self) -> DateTime<Utc> {
///     self.at
///   }
/// }
///
/// let event = LoginEvent { user: "ada".into(), at: Utc.timestamp_opt(7, 0).unwrap() };
/// let entry = Timestamped::from_event(event);
/// assert_eq!(entry.time().timestamp(), 7);
/// ```
pub trait HasEventTime {
  /// Returns when this event occurred.
  fn event_time(&self) -> DateTime<Utc>;
}

impl<T: HasEventTime> Timestamped<T> {
  /// Wraps an event, taking the timestamp from the event itself.
  pub fn from_event(event: T) -> Self {
    let time = event.event_time();
    Self::new(event, time)
  }
}
