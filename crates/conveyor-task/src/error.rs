//! Task error taxonomy.
//!
//! Backends report failures through a small enumerated vocabulary instead of
//! backend-specific exception names; retry rules in workflow definitions
//! match against the same vocabulary. The mapping from a backend's own
//! failure signals to a kind happens inside the backend, which keeps the
//! retry controller decoupled from any particular service's error strings.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a task failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  /// The invocation exceeded its timeout.
  Timeout,
  /// The backend rejected the call due to rate limiting.
  Throttled,
  /// The backend failed internally.
  Service,
  /// The call never reached the backend.
  Network,
  /// The caller is not allowed to invoke this backend.
  Authorization,
  /// The request document was malformed or named an unknown resource.
  Validation,
  /// User-supplied task logic failed.
  Task,
}

impl ErrorKind {
  /// Whether failures of this kind are worth retrying when a rule matches.
  pub fn is_transient(&self) -> bool {
    matches!(
      self,
      Self::Timeout | Self::Throttled | Self::Service | Self::Network
    )
  }

  /// Map an error-kind name (as written in workflow definitions) to a kind.
  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "timeout" => Some(Self::Timeout),
      "throttled" => Some(Self::Throttled),
      "service" => Some(Self::Service),
      "network" => Some(Self::Network),
      "authorization" => Some(Self::Authorization),
      "validation" => Some(Self::Validation),
      "task" => Some(Self::Task),
      _ => None,
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      Self::Timeout => "timeout",
      Self::Throttled => "throttled",
      Self::Service => "service",
      Self::Network => "network",
      Self::Authorization => "authorization",
      Self::Validation => "validation",
      Self::Task => "task",
    }
  }
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// A failed task invocation.
#[derive(Debug, Clone, Error)]
#[error("{kind} error: {message}")]
pub struct TaskError {
  pub kind: ErrorKind,
  pub message: String,
}

impl TaskError {
  pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
    Self {
      kind,
      message: message.into(),
    }
  }

  pub fn timeout(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::Timeout, message)
  }

  pub fn service(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::Service, message)
  }

  pub fn validation(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::Validation, message)
  }

  pub fn task(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::Task, message)
  }
}
