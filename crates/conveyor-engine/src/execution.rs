//! Workflow execution.

use std::sync::Arc;

use conveyor_path::{merge, narrow};
use conveyor_retry::RetryDecision;
use conveyor_workflow::{State, Transition};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::events::{ExecutionEvent, ExecutionNotifier};
use crate::outcome::{ExecutionOutcome, ExecutionStatus, FailureDetail, StateRecord};
use crate::runtime::WorkflowRuntime;

/// A handle to a workflow execution.
///
/// Call `.wait()` to run the execution and get the outcome.
pub struct WorkflowExecution<N: ExecutionNotifier> {
  runtime: Arc<WorkflowRuntime<N>>,
  execution_id: String,
  context: Value,
  cancel: CancellationToken,
}

impl<N: ExecutionNotifier> WorkflowExecution<N> {
  pub(crate) fn new(
    runtime: Arc<WorkflowRuntime<N>>,
    execution_id: String,
    context: Value,
    cancel: CancellationToken,
  ) -> Self {
    Self {
      runtime,
      execution_id,
      context,
      cancel,
    }
  }

  pub fn execution_id(&self) -> &str {
    &self.execution_id
  }

  /// Run the execution to its terminal status.
  #[instrument(
    name = "execution",
    skip(self),
    fields(
      workflow = %self.runtime.workflow.name,
      execution_id = %self.execution_id,
    )
  )]
  pub async fn wait(mut self) -> ExecutionOutcome {
    info!(context = %self.context, "execution_started");
    self.notify(ExecutionEvent::ExecutionStarted {
      execution_id: self.execution_id.clone(),
      workflow: self.runtime.workflow.name.clone(),
    });

    let mut records = Vec::with_capacity(self.runtime.workflow.chain().len());
    let status = self.run_chain(&mut records).await;

    match &status {
      ExecutionStatus::Succeeded => {
        info!("execution_succeeded");
        self.notify(ExecutionEvent::ExecutionSucceeded {
          execution_id: self.execution_id.clone(),
        });
      }
      ExecutionStatus::Failed(detail) => {
        error!(state = %detail.state, error = %detail.message, "execution_failed");
        self.notify(ExecutionEvent::ExecutionFailed {
          execution_id: self.execution_id.clone(),
          state: detail.state.clone(),
          error: detail.message.clone(),
        });
      }
    }

    ExecutionOutcome {
      execution_id: self.execution_id,
      status,
      context: self.context,
      records,
    }
  }

  /// Walk the chain from the start state to a terminal status.
  async fn run_chain(&mut self, records: &mut Vec<StateRecord>) -> ExecutionStatus {
    let mut current = self.runtime.workflow.start_at.clone();
    loop {
      if self.cancel.is_cancelled() {
        warn!(state = %current, "execution cancelled");
        return ExecutionStatus::Failed(FailureDetail::cancelled(&current));
      }

      // The lock guarantees every chain entry resolves; clone the state so
      // the step may mutate the context freely.
      let Some(state) = self.runtime.workflow.state(&current).cloned() else {
        return ExecutionStatus::Failed(FailureDetail {
          state: current,
          kind: crate::outcome::FailureKind::Context,
          message: "state missing from locked workflow".to_string(),
        });
      };

      self.notify(ExecutionEvent::StateStarted {
        execution_id: self.execution_id.clone(),
        state: current.clone(),
      });

      match self.step(&state, records).await {
        Ok(Transition::End) => return ExecutionStatus::Succeeded,
        Ok(Transition::Next(next)) => current = next,
        Err(detail) => return ExecutionStatus::Failed(detail),
      }
    }
  }

  /// Run one state: resolve parameters, invoke with retries, shape and merge
  /// the result, narrow the context.
  async fn step(
    &mut self,
    state: &State,
    records: &mut Vec<StateRecord>,
  ) -> Result<Transition, FailureDetail> {
    let request = match &state.parameters {
      Some(template) => template
        .resolve(&self.context)
        .map_err(|e| FailureDetail::context(&state.name, &e))?,
      None => Value::Object(serde_json::Map::new()),
    };

    let (raw, attempts) = self.invoke_with_retries(state, &request).await?;

    let shaped = match &state.result_selector {
      Some(selector) => selector
        .resolve(&raw)
        .map_err(|e| FailureDetail::context(&state.name, &e))?,
      None => raw,
    };

    self.context = merge(self.context.clone(), shaped.clone(), state.result_path.as_ref())
      .map_err(|e| FailureDetail::context(&state.name, &e))?;

    if let Some(output_path) = &state.output_path {
      self.context =
        narrow(&self.context, output_path).map_err(|e| FailureDetail::context(&state.name, &e))?;
    }

    info!(state = %state.name, attempts, "state_completed");
    records.push(StateRecord {
      state: state.name.clone(),
      attempts,
      output: shaped,
    });
    self.notify(ExecutionEvent::StateCompleted {
      execution_id: self.execution_id.clone(),
      state: state.name.clone(),
      attempts,
    });

    Ok(state.transition.clone())
  }

  /// Invoke the state's task until it succeeds, its retry schedule is
  /// exhausted, or the execution is cancelled.
  ///
  /// The attempt counter is local to this call, so it resets whenever the
  /// execution enters a new state. Retry delays suspend this future only -
  /// no worker thread sleeps.
  async fn invoke_with_retries(
    &self,
    state: &State,
    request: &Value,
  ) -> Result<(Value, u32), FailureDetail> {
    let timeout = state.timeout.unwrap_or(self.runtime.config.default_timeout);
    let mut attempts: u32 = 0;

    loop {
      attempts += 1;
      let invocation = self.runtime.invoker.invoke(&state.resource, request, timeout);
      let result = tokio::select! {
        result = invocation => result,
        _ = self.cancel.cancelled() => {
          warn!(state = %state.name, "cancelled during task invocation");
          return Err(FailureDetail::cancelled(&state.name));
        }
      };

      let err = match result {
        Ok(response) => return Ok((response, attempts)),
        Err(err) => err,
      };

      match conveyor_retry::decide(&state.retry, err.kind, attempts) {
        RetryDecision::Retry { delay } => {
          warn!(
            state = %state.name,
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "task_retry_scheduled"
          );
          self.notify(ExecutionEvent::RetryScheduled {
            execution_id: self.execution_id.clone(),
            state: state.name.clone(),
            attempt: attempts,
            delay_ms: delay.as_millis() as u64,
            error: err.to_string(),
          });

          tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.cancel.cancelled() => {
              warn!(state = %state.name, "cancelled during retry delay");
              return Err(FailureDetail::cancelled(&state.name));
            }
          }
        }
        RetryDecision::Fail => {
          error!(state = %state.name, attempts, error = %err, "task_failed");
          return Err(FailureDetail::task(&state.name, &err));
        }
      }
    }
  }

  fn notify(&self, event: ExecutionEvent) {
    self.runtime.notifier.notify(event);
  }
}
