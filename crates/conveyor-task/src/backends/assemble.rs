//! Output assembly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TaskError;
use crate::invoker::TaskBackend;

/// The final document the pipeline persists.
///
/// The original event identity is nested under `source` so the storage state
/// can derive its destination key (`<file>.json`) from the assembled output
/// alone, even after the context has been narrowed to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledOutput {
  pub summary: String,
  pub source: SourceRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
  pub bucket: String,
  /// Original object key with its extension stripped.
  pub file: String,
}

/// Function backend that assembles the final output document.
///
/// Invoked with the whole execution context wrapped as `{ "payload": ... }`;
/// reads the generated summary at `payload.model.output_text` and the
/// triggering object identity at `payload.detail`. Pure, and therefore
/// idempotent under retry.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput;

impl BuildOutput {
  pub fn new() -> Self {
    Self
  }
}

#[async_trait]
impl TaskBackend for BuildOutput {
  async fn invoke(&self, request: &Value) -> Result<Value, TaskError> {
    let summary = string_at(request, "/payload/model/output_text")?;
    let bucket = string_at(request, "/payload/detail/bucket/name")?;
    let key = string_at(request, "/payload/detail/object/key")?;

    let file = key
      .rsplit_once('.')
      .map(|(stem, _)| stem)
      .unwrap_or(&key)
      .to_string();

    let response = AssembledOutput {
      summary,
      source: SourceRef { bucket, file },
    };
    serde_json::to_value(&response)
      .map_err(|e| TaskError::service(format!("failed to encode assembled output: {}", e)))
  }
}

fn string_at(doc: &Value, pointer: &str) -> Result<String, TaskError> {
  doc
    .pointer(pointer)
    .and_then(Value::as_str)
    .map(str::to_string)
    .ok_or_else(|| TaskError::task(format!("missing string field at '{}'", pointer)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn context() -> Value {
    json!({
      "detail": {"bucket": {"name": "in"}, "object": {"key": "photo.jpg"}},
      "detection": {"labels": [{"name": "Dog", "confidence": 97.0}]},
      "model": {"output_text": "A photo of a dog."}
    })
  }

  #[tokio::test]
  async fn test_assembles_summary_and_source() {
    let response = BuildOutput::new()
      .invoke(&json!({"payload": context()}))
      .await
      .unwrap();
    assert_eq!(
      response,
      json!({
        "summary": "A photo of a dog.",
        "source": {"bucket": "in", "file": "photo"}
      })
    );
  }

  #[tokio::test]
  async fn test_key_without_extension_is_kept_whole() {
    let mut ctx = context();
    ctx["detail"]["object"]["key"] = json!("photo");
    let response = BuildOutput::new()
      .invoke(&json!({"payload": ctx}))
      .await
      .unwrap();
    assert_eq!(response["source"]["file"], json!("photo"));
  }

  #[tokio::test]
  async fn test_nested_key_keeps_prefix() {
    let mut ctx = context();
    ctx["detail"]["object"]["key"] = json!("uploads/photo.jpg");
    let response = BuildOutput::new()
      .invoke(&json!({"payload": ctx}))
      .await
      .unwrap();
    assert_eq!(response["source"]["file"], json!("uploads/photo"));
  }

  #[tokio::test]
  async fn test_missing_summary_fails() {
    let mut ctx = context();
    ctx.as_object_mut().unwrap().remove("model");
    let err = BuildOutput::new()
      .invoke(&json!({"payload": ctx}))
      .await
      .unwrap_err();
    assert_eq!(err.kind, crate::ErrorKind::Task);
  }
}
