//! Execution events and notifiers for observability.
//!
//! Events are emitted as an execution progresses so consumers can observe
//! state transitions, persist traces, or stream progress to UIs.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during one workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionEvent {
  /// The execution has started interpreting the chain.
  ExecutionStarted {
    execution_id: String,
    workflow: String,
  },

  /// A state has started (first attempt about to be made).
  StateStarted {
    execution_id: String,
    state: String,
  },

  /// A failed attempt will be retried after a delay.
  RetryScheduled {
    execution_id: String,
    state: String,
    attempt: u32,
    delay_ms: u64,
    error: String,
  },

  /// A state completed and its result was merged.
  StateCompleted {
    execution_id: String,
    state: String,
    attempts: u32,
  },

  /// The execution reached the terminal state.
  ExecutionSucceeded { execution_id: String },

  /// The execution failed.
  ExecutionFailed {
    execution_id: String,
    state: String,
    error: String,
  },
}

/// Trait for receiving execution events.
///
/// The engine calls `notify` for each event - implementations decide what to
/// do with them (persist, broadcast, log, ignore, etc.).
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {
    // Intentionally empty
  }
}

/// A notifier that sends events to an unbounded channel.
///
/// Unbounded so a slow consumer never stalls the engine; event volume is a
/// handful per state, so buffering is not a practical concern.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
