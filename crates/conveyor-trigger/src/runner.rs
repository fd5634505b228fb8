//! Channel-based trigger handling.
//!
//! The `TriggerRunner` owns an mpsc channel for receiving storage events and
//! starts one workflow execution per event. Executions run as independent
//! tasks - a slow pipeline run never delays the intake of further events.

use std::sync::Arc;

use conveyor_engine::{
  ExecutionNotifier, ExecutionOutcome, NoopNotifier, WorkflowExecution, WorkflowRuntime,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::event::ObjectCreated;

/// The runner's channel is closed; no further events can be delivered.
#[derive(Debug, Error)]
#[error("trigger runner channel closed")]
pub struct ChannelClosed;

/// Maps storage events onto workflow executions.
pub struct TriggerAdapter<N: ExecutionNotifier = NoopNotifier> {
  runtime: Arc<WorkflowRuntime<N>>,
}

impl<N: ExecutionNotifier> TriggerAdapter<N> {
  pub fn new(runtime: Arc<WorkflowRuntime<N>>) -> Self {
    Self { runtime }
  }

  /// Start an execution for one event.
  ///
  /// Returns the execution handle; call `.wait()` to run it. The event seeds
  /// the context under `$.detail`.
  pub fn start_execution(
    &self,
    event: ObjectCreated,
    cancel: CancellationToken,
  ) -> WorkflowExecution<N> {
    self.runtime.start(event.seed_context(), cancel)
  }

  pub fn runtime(&self) -> &WorkflowRuntime<N> {
    &self.runtime
  }
}

/// A runner that executes the workflow in response to storage events.
///
/// # Usage
///
/// ```ignore
/// let runner = TriggerRunner::new(runtime);
///
/// // Hand the sender to the event source (bus subscription, webhook, ...).
/// let sender = runner.sender();
///
/// // Start the intake loop.
/// let cancel = CancellationToken::new();
/// runner.start(cancel).await;
/// ```
pub struct TriggerRunner<N: ExecutionNotifier + 'static = NoopNotifier> {
  sender: mpsc::Sender<ObjectCreated>,
  receiver: mpsc::Receiver<ObjectCreated>,
  adapter: TriggerAdapter<N>,
}

impl<N: ExecutionNotifier + 'static> TriggerRunner<N> {
  pub fn new(runtime: Arc<WorkflowRuntime<N>>) -> Self {
    Self::with_buffer_size(runtime, 100)
  }

  pub fn with_buffer_size(runtime: Arc<WorkflowRuntime<N>>, buffer_size: usize) -> Self {
    let (sender, receiver) = mpsc::channel(buffer_size);
    Self {
      sender,
      receiver,
      adapter: TriggerAdapter::new(runtime),
    }
  }

  /// Get a sender handle for delivering events.
  pub fn sender(&self) -> mpsc::Sender<ObjectCreated> {
    self.sender.clone()
  }

  /// Deliver an event through the channel.
  pub async fn notify(&self, event: ObjectCreated) -> Result<(), ChannelClosed> {
    self.sender.send(event).await.map_err(|_| ChannelClosed)
  }

  /// Run the intake loop.
  ///
  /// Each received event starts an independent execution on its own task.
  /// Cancellation stops the intake and propagates to in-flight executions
  /// through child tokens; the loop drains them before returning.
  pub async fn start(self, cancel: CancellationToken) {
    // Drop the runner's own sender so the channel closes once every handle
    // returned by `sender()` is gone.
    let Self {
      sender,
      mut receiver,
      adapter,
    } = self;
    drop(sender);

    info!(
      workflow = %adapter.runtime().workflow().name,
      "starting trigger runner"
    );

    let mut executions: JoinSet<ExecutionOutcome> = JoinSet::new();
    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          info!("trigger runner cancelled");
          break;
        }
        event = receiver.recv() => {
          match event {
            Some(event) => {
              info!(
                bucket = %event.bucket.name,
                key = %event.object.key,
                "trigger_event_received"
              );
              let execution = adapter.start_execution(event, cancel.child_token());
              executions.spawn(execution.wait());
            }
            None => {
              info!("trigger runner channel closed");
              break;
            }
          }
        }
        Some(joined) = executions.join_next(), if !executions.is_empty() => {
          report(joined);
        }
      }
    }

    while let Some(joined) = executions.join_next().await {
      report(joined);
    }
  }
}

fn report(joined: Result<ExecutionOutcome, tokio::task::JoinError>) {
  match joined {
    Ok(outcome) if outcome.is_succeeded() => {
      info!(
        execution_id = %outcome.execution_id,
        states_executed = outcome.records.len(),
        "execution completed"
      );
    }
    Ok(outcome) => {
      error!(
        execution_id = %outcome.execution_id,
        status = ?outcome.status,
        "execution failed"
      );
    }
    Err(e) => {
      error!(error = %e, "execution task panicked");
    }
  }
}
