//! Engine configuration.
//!
//! ```rust
//! use sortweave::config::MergeConfig;
//!
//! let config = MergeConfig::default()
//!   .with_name("audit_logs")
//!   .with_high_water_mark(1_024)
//!   .with_refill_batch(8);
//! assert_eq!(config.high_water_mark(), 1_024);
//!
//! let parsed = MergeConfig::from_json(r#"{ "high_water_mark": 64 }"#)?;
//! assert_eq!(parsed.refill_batch(), 50);
//! # Ok::<(), sortweave::error::MergeError>(())
//! ```

use crate::error::MergeError;
use serde::{Deserialize, Serialize};

/// Default buffer occupancy above which no speculative pulls are issued.
pub const DEFAULT_HIGH_WATER_MARK: usize = 10_000_000;

/// Default cap on speculative pulls issued in one refill cycle.
pub const DEFAULT_REFILL_BATCH: usize = 50;

/// Configuration shared by both engines. The sync engine only reads `name`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
  /// Name used in log fields.
  pub name: Option<String>,
  /// Buffer size at or above which the async engine stops prefetching.
  pub high_water_mark: usize,
  /// Maximum speculative pulls issued per refill cycle.
  pub refill_batch: usize,
}

impl Default for MergeConfig {
  fn default() -> Self {
    Self {
      name: None,
      high_water_mark: DEFAULT_HIGH_WATER_MARK,
      refill_batch: DEFAULT_REFILL_BATCH,
    }
  }
}

impl MergeConfig {
  /// Parses a JSON document; missing fields take their defaults.
  pub fn from_json(json: &str) -> Result<Self, MergeError> {
    Ok(serde_json::from_str(json)?)
  }

  /// Sets the name used in log fields.
  #[must_use]
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// Sets the backpressure threshold.
  #[must_use]
  pub fn with_high_water_mark(mut self, high_water_mark: usize) -> Self {
    self.high_water_mark = high_water_mark;
    self
  }

  /// Sets the speculative pull cap per cycle. Zero disables prefetching.
  #[must_use]
  pub fn with_refill_batch(mut self, refill_batch: usize) -> Self {
    self.refill_batch = refill_batch;
    self
  }

  /// Name used in log fields.
  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  /// Backpressure threshold.
  pub fn high_water_mark(&self) -> usize {
    self.high_water_mark
  }

  /// Speculative pull cap per cycle.
  pub fn refill_batch(&self) -> usize {
    self.refill_batch
  }

  pub(crate) fn name_or(&self, default: &str) -> String {
    self.name.clone().unwrap_or_else(|| default.to_string())
  }
}
