//! # SortWeave
//!
//! Incremental k-way merge of independently time-ordered record sources.
//!
//! Every source yields [`Timestamped`](time::Timestamped) entries in
//! non-decreasing time order. The engines merge them into one globally
//! ordered stream and hand each [`Record`](record::Record) to a
//! [`RecordSink`](sink::RecordSink) as soon as it is safe to do so, never
//! materializing the full output.
//!
//! ## Engines
//!
//! - [`SyncMergeEngine`](sync_merge::SyncMergeEngine): sources answer
//!   immediately; the engine alternates "emit smallest" and "refill from the
//!   source just drained".
//! - [`AsyncMergeEngine`](async_merge::AsyncMergeEngine): sources answer
//!   through futures; the engine pipelines pulls across sources, keeps at most
//!   one pull outstanding per source, and bounds speculative prefetching with a
//!   high-water mark.
//!
//! A pull that fails is never mistaken for end-of-stream: the merge stops and
//! the [`MergeError`](error::MergeError) is returned to the caller.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use sortweave::sinks::VecSink;
//! use sortweave::sources::VecSource;
//! use sortweave::sync_merge::SyncMergeEngine;
//! use sortweave::time::Timestamped;
//!
//! let at = |s| Utc.timestamp_opt(s, 0).unwrap();
//! let a = VecSource::new(vec![Timestamped::new("a1", at(1)), Timestamped::new("a2", at(5))]);
//! let b = VecSource::new(vec![Timestamped::new("b1", at(2))]);
//!
//! let mut sink = VecSink::new();
//! let stats = SyncMergeEngine::new(vec![a, b]).run(&mut sink)?;
//! assert_eq!(stats.emitted, 3);
//! assert_eq!(sink.payloads(), vec!["a1", "b1", "a2"]);
//! # Ok::<(), sortweave::error::MergeError>(())
//! ```

// Documentation enforcement - treat missing docs as errors
#![deny(missing_docs)]

/// Pipelined merge over asynchronous sources.
pub mod async_merge;
/// Timestamp-ordered buffer of in-flight records.
pub mod buffer;
/// Engine configuration.
pub mod config;
/// Error types for sources and merges.
pub mod error;
/// Records tagged with their originating source.
pub mod record;
/// Per-source exhaustion and in-flight bookkeeping.
pub mod registry;
/// Sink capability consumed by the engines.
pub mod sink;
/// Reference sinks.
pub mod sinks;
/// Source capabilities consumed by the engines.
pub mod source;
/// Reference sources and test fixtures.
pub mod sources;
/// Statistics reported by a completed merge.
pub mod stats;
/// Blocking merge over synchronous sources.
pub mod sync_merge;
/// Timestamped entries produced by sources.
pub mod time;

#[cfg(test)]
mod buffer_test;
#[cfg(test)]
mod registry_test;

pub use async_merge::AsyncMergeEngine;
pub use config::MergeConfig;
pub use error::{MergeError, SourceError};
pub use record::{Record, SourceId};
pub use sink::RecordSink;
pub use source::{AsyncRecordSource, PullResult, RecordSource};
pub use stats::MergeStats;
pub use sync_merge::SyncMergeEngine;
pub use time::Timestamped;
