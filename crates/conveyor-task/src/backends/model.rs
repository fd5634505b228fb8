//! Generative text inference backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TaskError;
use crate::invoker::TaskBackend;

/// Request: model identifier, prompt, and sampling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
  pub model_id: String,
  pub body: ModelBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBody {
  pub input_text: String,
  pub sampling: SamplingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
  pub temperature: f64,
  pub top_p: f64,
  pub max_token_count: u32,
}

/// Response: the generated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
  pub output_text: String,
}

/// An inference backend that answers every prompt with configured text.
///
/// Stands in for a hosted text-generation service during local runs and
/// tests. Generation has no side effects beyond the call itself, so retrying
/// it is safe even though it is not idempotent.
#[derive(Debug, Clone)]
pub struct StaticTextModel {
  text: String,
}

impl StaticTextModel {
  pub fn new(text: impl Into<String>) -> Self {
    Self { text: text.into() }
  }
}

#[async_trait]
impl TaskBackend for StaticTextModel {
  async fn invoke(&self, request: &Value) -> Result<Value, TaskError> {
    let request: ModelRequest = serde_json::from_value(request.clone())
      .map_err(|e| TaskError::validation(format!("malformed model request: {}", e)))?;

    if request.body.input_text.trim().is_empty() {
      return Err(TaskError::validation("empty prompt"));
    }

    let response = ModelResponse {
      output_text: self.text.clone(),
    };
    serde_json::to_value(&response)
      .map_err(|e| TaskError::service(format!("failed to encode model response: {}", e)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn request(input_text: &str) -> Value {
    json!({
      "model_id": "text-premier",
      "body": {
        "input_text": input_text,
        "sampling": {"temperature": 0.7, "top_p": 0.9, "max_token_count": 512}
      }
    })
  }

  #[tokio::test]
  async fn test_returns_configured_text() {
    let model = StaticTextModel::new("A photo of a dog.");
    let response = model.invoke(&request("describe: [\"Dog\"]")).await.unwrap();
    assert_eq!(response, json!({"output_text": "A photo of a dog."}));
  }

  #[tokio::test]
  async fn test_empty_prompt_is_rejected() {
    let model = StaticTextModel::new("unused");
    let err = model.invoke(&request("  ")).await.unwrap_err();
    assert_eq!(err.kind, crate::ErrorKind::Validation);
  }

  #[tokio::test]
  async fn test_sampling_config_is_required() {
    let model = StaticTextModel::new("unused");
    let err = model
      .invoke(&json!({"model_id": "m", "body": {"input_text": "hi"}}))
      .await
      .unwrap_err();
    assert_eq!(err.kind, crate::ErrorKind::Validation);
  }
}
