//! Uniform task invocation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use crate::error::{ErrorKind, TaskError};

/// An external task a workflow state can invoke.
///
/// Implementations take a request document and return a response document.
/// Backends invoked by states that declare retry rules must be idempotent
/// under retry; the one storage-writing backend relies on overwrite
/// semantics instead and is never retried by the shipped definitions.
#[async_trait]
pub trait TaskBackend: Send + Sync {
  async fn invoke(&self, request: &Value) -> Result<Value, TaskError>;
}

/// Registry of task backends, keyed by the opaque resource identifier that
/// workflow states name.
///
/// The engine funnels every state's task call through [`TaskInvoker::invoke`],
/// which enforces the per-call timeout uniformly across backends.
#[derive(Default)]
pub struct TaskInvoker {
  backends: HashMap<String, Arc<dyn TaskBackend>>,
}

impl TaskInvoker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a backend under a resource identifier.
  pub fn register(&mut self, resource: impl Into<String>, backend: Arc<dyn TaskBackend>) {
    self.backends.insert(resource.into(), backend);
  }

  /// Builder-style registration, for wiring a whole pipeline in one chain.
  pub fn with_backend(
    mut self,
    resource: impl Into<String>,
    backend: Arc<dyn TaskBackend>,
  ) -> Self {
    self.register(resource, backend);
    self
  }

  /// Invoke the backend registered under `resource` with a timeout.
  ///
  /// Exceeding the timeout yields a [`TaskError`] of kind `timeout`; an
  /// unregistered resource yields kind `validation`.
  #[instrument(name = "task_invoke", skip(self, request), fields(resource = %resource))]
  pub async fn invoke(
    &self,
    resource: &str,
    request: &Value,
    timeout: Duration,
  ) -> Result<Value, TaskError> {
    let backend = self.backends.get(resource).ok_or_else(|| {
      TaskError::validation(format!("unknown task resource '{}'", resource))
    })?;

    match tokio::time::timeout(timeout, backend.invoke(request)).await {
      Ok(result) => result,
      Err(_) => Err(TaskError::new(
        ErrorKind::Timeout,
        format!(
          "task '{}' did not answer within {}ms",
          resource,
          timeout.as_millis()
        ),
      )),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  struct Echo;

  #[async_trait]
  impl TaskBackend for Echo {
    async fn invoke(&self, request: &Value) -> Result<Value, TaskError> {
      Ok(request.clone())
    }
  }

  struct Stuck;

  #[async_trait]
  impl TaskBackend for Stuck {
    async fn invoke(&self, _request: &Value) -> Result<Value, TaskError> {
      std::future::pending().await
    }
  }

  #[tokio::test]
  async fn test_invoke_dispatches_by_resource() {
    let invoker = TaskInvoker::new().with_backend("echo", Arc::new(Echo));
    let response = invoker
      .invoke("echo", &json!({"x": 1}), Duration::from_secs(1))
      .await
      .unwrap();
    assert_eq!(response, json!({"x": 1}));
  }

  #[tokio::test]
  async fn test_unknown_resource_is_a_validation_error() {
    let invoker = TaskInvoker::new();
    let err = invoker
      .invoke("nope", &json!({}), Duration::from_secs(1))
      .await
      .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
  }

  #[tokio::test(start_paused = true)]
  async fn test_slow_backend_times_out() {
    let invoker = TaskInvoker::new().with_backend("stuck", Arc::new(Stuck));
    let err = invoker
      .invoke("stuck", &json!({}), Duration::from_secs(30))
      .await
      .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Timeout);
  }
}
