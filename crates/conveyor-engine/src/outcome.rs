//! Terminal outcome of an execution.

use std::fmt;

use conveyor_path::PathError;
use conveyor_task::{ErrorKind, TaskError};
use serde::Serialize;
use serde_json::Value;

/// Result of a completed execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutcome {
  pub execution_id: String,
  pub status: ExecutionStatus,
  /// Final context: the terminal document on success, the last good context
  /// on failure.
  pub context: Value,
  /// Per-state trace in execution order; states never entered are absent.
  pub records: Vec<StateRecord>,
}

impl ExecutionOutcome {
  pub fn is_succeeded(&self) -> bool {
    matches!(self.status, ExecutionStatus::Succeeded)
  }

  /// Trace record for a state, if the execution entered it.
  pub fn record(&self, state: &str) -> Option<&StateRecord> {
    self.records.iter().find(|r| r.state == state)
  }
}

/// Terminal status of an execution.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionStatus {
  Succeeded,
  Failed(FailureDetail),
}

/// What failed, where.
#[derive(Debug, Clone, Serialize)]
pub struct FailureDetail {
  /// Name of the state the execution failed in.
  pub state: String,
  pub kind: FailureKind,
  pub message: String,
}

impl FailureDetail {
  pub fn task(state: &str, error: &TaskError) -> Self {
    Self {
      state: state.to_string(),
      kind: FailureKind::Task(error.kind),
      message: error.to_string(),
    }
  }

  pub fn context(state: &str, error: &PathError) -> Self {
    Self {
      state: state.to_string(),
      kind: FailureKind::Context,
      message: error.to_string(),
    }
  }

  pub fn cancelled(state: &str) -> Self {
    Self {
      state: state.to_string(),
      kind: FailureKind::Cancelled,
      message: "execution cancelled".to_string(),
    }
  }
}

impl fmt::Display for FailureDetail {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "state '{}': {}", self.state, self.message)
  }
}

/// Classification of an execution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
  /// A task failed and the retry rules did not (or could no longer) cover it.
  Task(ErrorKind),
  /// A required path could not be resolved or a merge target conflicted.
  Context,
  /// The execution's cancellation hook fired.
  Cancelled,
}

/// Trace of one state the execution entered.
#[derive(Debug, Clone, Serialize)]
pub struct StateRecord {
  pub state: String,
  /// Task attempts made in this state, retries included.
  pub attempts: u32,
  /// The shaped task output (after `result_selector`, before merge).
  pub output: Value,
}
