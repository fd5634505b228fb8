//! Object storage backend.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::TaskError;
use crate::invoker::TaskBackend;

/// Request: destination and body of the write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PutRequest {
  pub bucket: String,
  pub key: String,
  pub body: Value,
}

/// Acknowledgement of a completed write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PutAck {
  pub bucket: String,
  pub key: String,
}

/// A filesystem-backed object store: buckets are directories under a root,
/// keys are file paths inside them.
///
/// Writes overwrite, so a redelivered trigger event that re-runs the whole
/// pipeline lands on the same destination without duplicating output. This
/// backend is the pipeline's only durable side effect and the shipped
/// definitions give its state no retry rules.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
  root: PathBuf,
}

impl FsObjectStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  fn destination(&self, bucket: &str, key: &str) -> Result<PathBuf, TaskError> {
    for raw in [bucket, key] {
      let rejected = Path::new(raw)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
      if rejected || raw.is_empty() {
        return Err(TaskError::validation(format!(
          "invalid storage location '{}'",
          raw
        )));
      }
    }
    Ok(self.root.join(bucket).join(key))
  }
}

#[async_trait]
impl TaskBackend for FsObjectStore {
  async fn invoke(&self, request: &Value) -> Result<Value, TaskError> {
    let request: PutRequest = serde_json::from_value(request.clone())
      .map_err(|e| TaskError::validation(format!("malformed storage request: {}", e)))?;

    let destination = self.destination(&request.bucket, &request.key)?;
    let parent = destination
      .parent()
      .ok_or_else(|| TaskError::validation("storage destination has no parent"))?;

    let body = serde_json::to_vec_pretty(&request.body)
      .map_err(|e| TaskError::service(format!("failed to encode body: {}", e)))?;

    tokio::fs::create_dir_all(parent)
      .await
      .map_err(|e| TaskError::service(format!("failed to create bucket directory: {}", e)))?;
    tokio::fs::write(&destination, body)
      .await
      .map_err(|e| TaskError::service(format!("failed to write object: {}", e)))?;

    info!(
      bucket = %request.bucket,
      key = %request.key,
      "object_written"
    );

    let ack = PutAck {
      bucket: request.bucket,
      key: request.key,
    };
    serde_json::to_value(&ack)
      .map_err(|e| TaskError::service(format!("failed to encode ack: {}", e)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[tokio::test]
  async fn test_writes_object_under_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::new(dir.path());

    let ack = store
      .invoke(&json!({"bucket": "out", "key": "photo.json", "body": {"summary": "ok"}}))
      .await
      .unwrap();
    assert_eq!(ack, json!({"bucket": "out", "key": "photo.json"}));

    let written = std::fs::read_to_string(dir.path().join("out/photo.json")).unwrap();
    let body: Value = serde_json::from_str(&written).unwrap();
    assert_eq!(body, json!({"summary": "ok"}));
  }

  #[tokio::test]
  async fn test_overwrite_replaces_body() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::new(dir.path());

    for body in [json!({"v": 1}), json!({"v": 2})] {
      store
        .invoke(&json!({"bucket": "out", "key": "photo.json", "body": body}))
        .await
        .unwrap();
    }

    let written = std::fs::read_to_string(dir.path().join("out/photo.json")).unwrap();
    let body: Value = serde_json::from_str(&written).unwrap();
    assert_eq!(body, json!({"v": 2}));
  }

  #[tokio::test]
  async fn test_traversal_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::new(dir.path());

    let err = store
      .invoke(&json!({"bucket": "out", "key": "../escape.json", "body": {}}))
      .await
      .unwrap_err();
    assert_eq!(err.kind, crate::ErrorKind::Validation);
  }
}
