use serde::{Deserialize, Serialize};

/// A declared retry rule: which error kinds it matches and the backoff
/// schedule applied to them.
///
/// Defaults mirror the usual declaration (`1s` initial interval, rate `2.0`,
/// `3` attempts) so a rule can name only its error kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryDef {
  /// Error-kind names this rule matches, or `["*"]` to match anything.
  pub errors: Vec<String>,

  /// Initial delay before the first retry.
  #[serde(default = "default_interval_ms")]
  pub interval_ms: u64,

  /// Multiplier applied to the delay on each further attempt.
  #[serde(default = "default_backoff_rate")]
  pub backoff_rate: f64,

  /// Total attempts allowed for a matched error, the first one included.
  #[serde(default = "default_max_attempts")]
  pub max_attempts: u32,
}

fn default_interval_ms() -> u64 {
  1000
}

fn default_backoff_rate() -> f64 {
  2.0
}

fn default_max_attempts() -> u32 {
  3
}
