//! Label detection backend.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TaskError;
use crate::invoker::TaskBackend;

/// Request: which stored object to run detection on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectRequest {
  pub image: ImageRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
  pub bucket: String,
  pub key: String,
}

/// Response: unordered labels with confidence scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectResponse {
  pub labels: Vec<Label>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
  pub name: String,
  pub confidence: f64,
}

impl Label {
  pub fn new(name: impl Into<String>, confidence: f64) -> Self {
    Self {
      name: name.into(),
      confidence,
    }
  }
}

/// A detection backend answering from a fixture table keyed by object key.
///
/// Stands in for a hosted vision service during local runs and tests; the
/// request/response contract is the real one.
#[derive(Debug, Default)]
pub struct FixtureDetector {
  fixtures: HashMap<String, Vec<Label>>,
}

impl FixtureDetector {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_map(fixtures: HashMap<String, Vec<Label>>) -> Self {
    Self { fixtures }
  }

  /// Register the labels returned for an object key.
  pub fn insert(&mut self, key: impl Into<String>, labels: Vec<Label>) {
    self.fixtures.insert(key.into(), labels);
  }

  pub fn with_labels(mut self, key: impl Into<String>, labels: Vec<Label>) -> Self {
    self.insert(key, labels);
    self
  }
}

#[async_trait]
impl TaskBackend for FixtureDetector {
  async fn invoke(&self, request: &Value) -> Result<Value, TaskError> {
    let request: DetectRequest = serde_json::from_value(request.clone())
      .map_err(|e| TaskError::validation(format!("malformed detection request: {}", e)))?;

    let labels = self.fixtures.get(&request.image.key).ok_or_else(|| {
      TaskError::validation(format!(
        "no detection fixture for object '{}'",
        request.image.key
      ))
    })?;

    let response = DetectResponse {
      labels: labels.clone(),
    };
    serde_json::to_value(&response)
      .map_err(|e| TaskError::service(format!("failed to encode detection response: {}", e)))
  }
}
