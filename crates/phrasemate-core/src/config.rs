//! Tunables for the scheduling engine.

use serde::Deserialize;

/// Scheduling configuration, usually nested under `[scheduling]` in the
/// server's config file. Every key is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
  /// Accepted reviews after which a session is closed.
  pub session_size:      u32,
  /// An interval at or above this many days retires the phrase as mastered.
  pub max_interval_days: u32,
  /// Page size used when the selector walks due reviews and new phrases.
  pub selection_batch:   usize,
}

impl Default for SchedulingConfig {
  fn default() -> Self {
    Self {
      session_size:      20,
      max_interval_days: 180,
      selection_batch:   20,
    }
  }
}
