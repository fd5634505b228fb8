use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::retry::RetryDef;

/// One pipeline stage in a workflow definition.
///
/// `parameters` and `result_selector` are raw template documents; object keys
/// ending in `.$` mark dynamic fields (path references or `format(...)`
/// calls). They are parsed into typed templates when the workflow is locked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDef {
  /// Opaque identifier of the task backend this state invokes.
  pub resource: String,

  /// Template for the task request document. Absent means an empty request.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parameters: Option<Value>,

  /// Projection applied to the raw task output before it is merged.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub result_selector: Option<Value>,

  /// Where the (shaped) task output is merged into the context.
  /// Absent discards the output; `$` replaces the whole context.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub result_path: Option<String>,

  /// Narrows the context to this subtree before the next state sees it.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output_path: Option<String>,

  /// Retry rules, first match wins. No rules means single-attempt semantics.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub retry: Vec<RetryDef>,

  /// Per-invocation timeout. Falls back to the engine default when absent.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub comment: Option<String>,

  /// Name of the state entered after this one completes.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub next: Option<String>,

  /// Marks the single terminal state of the pipeline.
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub end: bool,
}
