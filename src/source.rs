//! Source capabilities.
//!
//! A source is a pull-based stream of [`Timestamped`] entries in
//! non-decreasing time order. Each pull answers with one of:
//!
//! - `Ok(Some(entry))`: the next entry.
//! - `Ok(None)`: end-of-stream. The engines never pull that source again.
//! - `Err(SourceError)`: the pull failed. The merge aborts.

use crate::error::SourceError;
use crate::time::Timestamped;
use async_trait::async_trait;

/// Result of one pull: an entry, end-of-stream (`None`), or a failure.
pub type PullResult<T> = Result<Option<Timestamped<T>>, SourceError>;

/// A source whose pulls complete immediately.
pub trait RecordSource {
  /// Payload type carried by the entries.
  type Payload;

  /// Returns the next entry, `None` at end-of-stream.
  fn pull(&mut self) -> PullResult<Self::Payload>;
}

/// A source whose pulls complete asynchronously.
///
/// The async engine moves the source into the pull's future for as long as
/// the pull is outstanding, so a second pull against the same source cannot
/// be started until the first resolves.
#[async_trait]
pub trait AsyncRecordSource: Send {
  /// Payload type carried by the entries.
  type Payload: Send;

  /// Resolves to the next entry, `None` at end-of-stream.
  async fn pull_async(&mut self) -> PullResult<Self::Payload>;
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
  type Payload = S::Payload;

  fn pull(&mut self) -> PullResult<Self::Payload> {
    (**self).pull()
  }
}

#[async_trait]
impl<S: AsyncRecordSource + ?Sized> AsyncRecordSource for Box<S> {
  type Payload = S::Payload;

  async fn pull_async(&mut self) -> PullResult<Self::Payload> {
    (**self).pull_async().await
  }
}
