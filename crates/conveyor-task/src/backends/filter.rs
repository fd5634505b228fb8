//! Confidence-threshold label filtering.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backends::detector::Label;
use crate::error::TaskError;
use crate::invoker::TaskBackend;

/// Response: label names at or above the threshold, deduplicated,
/// first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredLabels {
  pub labels: Vec<String>,
}

/// Function backend that filters detected labels by confidence.
///
/// Invoked with the whole execution context wrapped as `{ "payload": ... }`
/// and reads the detection output at `payload.detection.labels`. Pure, and
/// therefore idempotent under retry.
#[derive(Debug, Clone)]
pub struct FilterLabels {
  threshold: f64,
}

impl FilterLabels {
  pub const DEFAULT_THRESHOLD: f64 = 90.0;

  pub fn new(threshold: f64) -> Self {
    Self { threshold }
  }
}

impl Default for FilterLabels {
  fn default() -> Self {
    Self::new(Self::DEFAULT_THRESHOLD)
  }
}

#[async_trait]
impl TaskBackend for FilterLabels {
  async fn invoke(&self, request: &Value) -> Result<Value, TaskError> {
    let labels = request
      .pointer("/payload/detection/labels")
      .ok_or_else(|| TaskError::task("no detection labels at 'payload.detection.labels'"))?;
    let labels: Vec<Label> = serde_json::from_value(labels.clone())
      .map_err(|e| TaskError::task(format!("malformed detection labels: {}", e)))?;

    let mut kept = Vec::new();
    for label in labels {
      if label.confidence >= self.threshold && !kept.contains(&label.name) {
        kept.push(label.name);
      }
    }

    let response = FilteredLabels { labels: kept };
    serde_json::to_value(&response)
      .map_err(|e| TaskError::service(format!("failed to encode filter response: {}", e)))
  }
}
