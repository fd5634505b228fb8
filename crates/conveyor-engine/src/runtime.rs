//! Workflow runtime.

use std::sync::Arc;
use std::time::Duration;

use conveyor_task::TaskInvoker;
use conveyor_workflow::Workflow;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::events::{ExecutionNotifier, NoopNotifier};
use crate::execution::WorkflowExecution;

/// Configuration for the workflow runtime.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Task timeout applied when a state declares none.
  pub default_timeout: Duration,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      default_timeout: Duration::from_secs(30),
    }
  }
}

/// The workflow runtime.
///
/// Owns a locked workflow, the task-backend registry, and the engine
/// configuration. One runtime serves any number of concurrent executions;
/// it holds no per-execution state.
///
/// Generic over `N: ExecutionNotifier` to allow different notification
/// strategies. Use `WorkflowRuntime::new()` for a runtime with no-op
/// notifications, or `WorkflowRuntime::with_notifier()` to observe events.
pub struct WorkflowRuntime<N: ExecutionNotifier = NoopNotifier> {
  pub(crate) config: EngineConfig,
  pub(crate) workflow: Workflow,
  pub(crate) invoker: TaskInvoker,
  pub(crate) notifier: N,
}

impl WorkflowRuntime<NoopNotifier> {
  /// Create a new runtime with no-op notifications.
  pub fn new(config: EngineConfig, workflow: Workflow, invoker: TaskInvoker) -> Self {
    Self::with_notifier(config, workflow, invoker, NoopNotifier)
  }
}

impl<N: ExecutionNotifier> WorkflowRuntime<N> {
  /// Create a new runtime with a custom notifier.
  pub fn with_notifier(
    config: EngineConfig,
    workflow: Workflow,
    invoker: TaskInvoker,
    notifier: N,
  ) -> Self {
    Self {
      config,
      workflow,
      invoker,
      notifier,
    }
  }

  /// Start an execution over a seed context.
  ///
  /// Returns a `WorkflowExecution` handle. Call `.wait()` to run the
  /// execution and get the outcome. The handle owns an `Arc` of the runtime,
  /// so executions can be spawned onto independent tasks.
  pub fn start(
    self: &Arc<Self>,
    context: Value,
    cancel: CancellationToken,
  ) -> WorkflowExecution<N> {
    let execution_id = uuid::Uuid::new_v4().to_string();
    WorkflowExecution::new(Arc::clone(self), execution_id, context, cancel)
  }

  /// The locked workflow this runtime interprets.
  pub fn workflow(&self) -> &Workflow {
    &self.workflow
  }
}
