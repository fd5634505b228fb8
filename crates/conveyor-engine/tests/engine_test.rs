//! Engine semantics: context shaping, retry behavior, cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use conveyor_config::WorkflowDef;
use conveyor_engine::{
  ChannelNotifier, EngineConfig, ExecutionEvent, ExecutionStatus, FailureKind, WorkflowRuntime,
};
use conveyor_task::{ErrorKind, TaskBackend, TaskError, TaskInvoker};
use conveyor_workflow::Workflow;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Backend that always answers with a fixed document.
struct StaticBackend(Value);

#[async_trait]
impl TaskBackend for StaticBackend {
  async fn invoke(&self, _request: &Value) -> Result<Value, TaskError> {
    Ok(self.0.clone())
  }
}

/// Backend that echoes the request document back.
struct EchoBackend;

#[async_trait]
impl TaskBackend for EchoBackend {
  async fn invoke(&self, request: &Value) -> Result<Value, TaskError> {
    Ok(request.clone())
  }
}

/// Backend that fails its first `fail_first` calls, then answers.
struct FlakyBackend {
  calls: AtomicU32,
  fail_first: u32,
  kind: ErrorKind,
  response: Value,
}

impl FlakyBackend {
  fn new(fail_first: u32, kind: ErrorKind, response: Value) -> Arc<Self> {
    Arc::new(Self {
      calls: AtomicU32::new(0),
      fail_first,
      kind,
      response,
    })
  }

  fn calls(&self) -> u32 {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl TaskBackend for FlakyBackend {
  async fn invoke(&self, _request: &Value) -> Result<Value, TaskError> {
    let call = self.calls.fetch_add(1, Ordering::SeqCst);
    if call < self.fail_first {
      Err(TaskError::new(self.kind, "induced failure"))
    } else {
      Ok(self.response.clone())
    }
  }
}

/// Backend that never answers its first `stall_first` calls; the invoker's
/// timeout is the only way past them.
struct StallingBackend {
  calls: AtomicU32,
  stall_first: u32,
  response: Value,
}

impl StallingBackend {
  fn new(stall_first: u32, response: Value) -> Arc<Self> {
    Arc::new(Self {
      calls: AtomicU32::new(0),
      stall_first,
      response,
    })
  }
}

#[async_trait]
impl TaskBackend for StallingBackend {
  async fn invoke(&self, _request: &Value) -> Result<Value, TaskError> {
    let call = self.calls.fetch_add(1, Ordering::SeqCst);
    if call < self.stall_first {
      std::future::pending().await
    } else {
      Ok(self.response.clone())
    }
  }
}

fn lock(raw: Value) -> Workflow {
  let def: WorkflowDef = serde_json::from_value(raw).expect("definition parses");
  Workflow::lock(def).expect("definition locks")
}

fn runtime(workflow: Workflow, invoker: TaskInvoker) -> Arc<WorkflowRuntime> {
  Arc::new(WorkflowRuntime::new(EngineConfig::default(), workflow, invoker))
}

/// One-state workflow invoking `task` with the given shaping fields.
fn single_state(shaping: Value) -> Workflow {
  let mut state = json!({"resource": "task", "end": true});
  for (key, value) in shaping.as_object().unwrap() {
    state[key] = value.clone();
  }
  lock(json!({
    "name": "single",
    "start_at": "only",
    "states": {"only": state}
  }))
}

#[tokio::test]
async fn test_result_path_root_replaces_context() {
  let workflow = single_state(json!({"result_path": "$"}));
  let invoker =
    TaskInvoker::new().with_backend("task", Arc::new(StaticBackend(json!({"fresh": true}))));

  let outcome = runtime(workflow, invoker)
    .start(json!({"old": 1}), CancellationToken::new())
    .wait()
    .await;

  assert!(outcome.is_succeeded());
  assert_eq!(outcome.context, json!({"fresh": true}));
}

#[tokio::test]
async fn test_absent_result_path_discards_result() {
  let workflow = single_state(json!({}));
  let invoker =
    TaskInvoker::new().with_backend("task", Arc::new(StaticBackend(json!({"ignored": true}))));

  let seed = json!({"kept": 1});
  let outcome = runtime(workflow, invoker)
    .start(seed.clone(), CancellationToken::new())
    .wait()
    .await;

  assert!(outcome.is_succeeded());
  assert_eq!(outcome.context, seed);
  // The trace still records what the task produced.
  assert_eq!(outcome.record("only").unwrap().output, json!({"ignored": true}));
}

#[tokio::test]
async fn test_nested_result_path_preserves_unrelated_fields() {
  let workflow = single_state(json!({"result_path": "$.task"}));
  let invoker =
    TaskInvoker::new().with_backend("task", Arc::new(StaticBackend(json!({"n": 2}))));

  let outcome = runtime(workflow, invoker)
    .start(json!({"a": 1}), CancellationToken::new())
    .wait()
    .await;

  assert!(outcome.is_succeeded());
  assert_eq!(outcome.context, json!({"a": 1, "task": {"n": 2}}));
}

#[tokio::test]
async fn test_result_selector_projects_raw_output() {
  let workflow = single_state(json!({
    "result_selector": {"labels.$": "$.labels"},
    "result_path": "$.detection"
  }));
  let invoker = TaskInvoker::new().with_backend(
    "task",
    Arc::new(StaticBackend(json!({"labels": ["Dog"], "metadata": {"ms": 12}}))),
  );

  let outcome = runtime(workflow, invoker)
    .start(json!({}), CancellationToken::new())
    .wait()
    .await;

  assert!(outcome.is_succeeded());
  assert_eq!(outcome.context, json!({"detection": {"labels": ["Dog"]}}));
}

#[tokio::test]
async fn test_output_path_narrows_context_for_downstream_states() {
  // First state narrows to $.payload; the second state's parameters resolve
  // against the narrowed document, so `$.source.file` is visible.
  let workflow = lock(json!({
    "name": "narrowing",
    "start_at": "produce",
    "states": {
      "produce": {
        "resource": "produce",
        "result_path": "$.payload",
        "output_path": "$.payload",
        "next": "consume"
      },
      "consume": {
        "resource": "echo",
        "parameters": {"file.$": "$.source.file"},
        "result_path": "$",
        "end": true
      }
    }
  }));
  let invoker = TaskInvoker::new()
    .with_backend(
      "produce",
      Arc::new(StaticBackend(json!({"source": {"file": "photo"}}))),
    )
    .with_backend("echo", Arc::new(EchoBackend));

  let outcome = runtime(workflow, invoker)
    .start(json!({"noise": true}), CancellationToken::new())
    .wait()
    .await;

  assert!(outcome.is_succeeded());
  assert_eq!(outcome.context, json!({"file": "photo"}));
}

#[tokio::test]
async fn test_unknown_resource_fails_execution() {
  let workflow = single_state(json!({}));
  let outcome = runtime(workflow, TaskInvoker::new())
    .start(json!({}), CancellationToken::new())
    .wait()
    .await;

  let ExecutionStatus::Failed(detail) = &outcome.status else {
    panic!("expected failure");
  };
  assert_eq!(detail.state, "only");
  assert_eq!(detail.kind, FailureKind::Task(ErrorKind::Validation));
}

#[tokio::test]
async fn test_unresolvable_parameter_fails_with_context_detail() {
  let workflow = single_state(json!({"parameters": {"key.$": "$.absent.path"}}));
  let invoker = TaskInvoker::new().with_backend("task", Arc::new(EchoBackend));

  let outcome = runtime(workflow, invoker)
    .start(json!({}), CancellationToken::new())
    .wait()
    .await;

  let ExecutionStatus::Failed(detail) = &outcome.status else {
    panic!("expected failure");
  };
  assert_eq!(detail.kind, FailureKind::Context);
  assert!(outcome.records.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_retry_until_success() {
  let workflow = single_state(json!({
    "result_path": "$",
    "retry": [{"errors": ["service"], "interval_ms": 1000, "backoff_rate": 2.0, "max_attempts": 3}]
  }));
  let backend = FlakyBackend::new(2, ErrorKind::Service, json!({"ok": true}));
  let invoker = TaskInvoker::new().with_backend("task", backend.clone());

  let outcome = runtime(workflow, invoker)
    .start(json!({}), CancellationToken::new())
    .wait()
    .await;

  assert!(outcome.is_succeeded());
  assert_eq!(backend.calls(), 3);
  assert_eq!(outcome.record("only").unwrap().attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_fail_with_last_error_kind() {
  let workflow = single_state(json!({
    "retry": [{"errors": ["throttled"], "interval_ms": 100, "backoff_rate": 2.0, "max_attempts": 2}]
  }));
  let backend = FlakyBackend::new(u32::MAX, ErrorKind::Throttled, json!({}));
  let invoker = TaskInvoker::new().with_backend("task", backend.clone());

  let outcome = runtime(workflow, invoker)
    .start(json!({}), CancellationToken::new())
    .wait()
    .await;

  let ExecutionStatus::Failed(detail) = &outcome.status else {
    panic!("expected failure");
  };
  assert_eq!(detail.kind, FailureKind::Task(ErrorKind::Throttled));
  assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_unmatched_error_kind_is_not_retried() {
  let workflow = single_state(json!({
    "retry": [{"errors": ["timeout"], "interval_ms": 100, "backoff_rate": 2.0, "max_attempts": 3}]
  }));
  let backend = FlakyBackend::new(u32::MAX, ErrorKind::Authorization, json!({}));
  let invoker = TaskInvoker::new().with_backend("task", backend.clone());

  let outcome = runtime(workflow, invoker)
    .start(json!({}), CancellationToken::new())
    .wait()
    .await;

  let ExecutionStatus::Failed(detail) = &outcome.status else {
    panic!("expected failure");
  };
  assert_eq!(detail.kind, FailureKind::Task(ErrorKind::Authorization));
  assert_eq!(backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeouts_retry_and_succeed_on_third_attempt() {
  // The backend stalls twice; the invoker timeout turns each stall into a
  // timeout error, which the rule covers for three attempts total.
  let workflow = single_state(json!({
    "result_path": "$",
    "timeout_ms": 5000,
    "retry": [{"errors": ["timeout"], "interval_ms": 1000, "backoff_rate": 2.0, "max_attempts": 3}]
  }));
  let backend = StallingBackend::new(2, json!({"labels": ["Dog"]}));
  let invoker = TaskInvoker::new().with_backend("task", backend.clone());

  let outcome = runtime(workflow, invoker)
    .start(json!({}), CancellationToken::new())
    .wait()
    .await;

  assert!(outcome.is_succeeded());
  assert_eq!(outcome.record("only").unwrap().attempts, 3);
  assert_eq!(outcome.context, json!({"labels": ["Dog"]}));
}

#[tokio::test]
async fn test_state_without_rules_fails_on_first_error() {
  // Single-attempt semantics for the terminal write: one failure, no retry.
  let workflow = single_state(json!({}));
  let backend = FlakyBackend::new(u32::MAX, ErrorKind::Service, json!({}));
  let invoker = TaskInvoker::new().with_backend("task", backend.clone());

  let outcome = runtime(workflow, invoker)
    .start(json!({}), CancellationToken::new())
    .wait()
    .await;

  let ExecutionStatus::Failed(detail) = &outcome.status else {
    panic!("expected failure");
  };
  assert_eq!(detail.state, "only");
  assert_eq!(detail.kind, FailureKind::Task(ErrorKind::Service));
  assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_cancelled_before_start_invokes_nothing() {
  let workflow = single_state(json!({}));
  let backend = FlakyBackend::new(0, ErrorKind::Service, json!({}));
  let invoker = TaskInvoker::new().with_backend("task", backend.clone());

  let cancel = CancellationToken::new();
  cancel.cancel();
  let outcome = runtime(workflow, invoker).start(json!({}), cancel).wait().await;

  let ExecutionStatus::Failed(detail) = &outcome.status else {
    panic!("expected failure");
  };
  assert_eq!(detail.kind, FailureKind::Cancelled);
  assert_eq!(backend.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_during_retry_delay() {
  let workflow = single_state(json!({
    "retry": [{"errors": ["service"], "interval_ms": 60000, "backoff_rate": 2.0, "max_attempts": 5}]
  }));
  let backend = FlakyBackend::new(u32::MAX, ErrorKind::Service, json!({}));
  let invoker = TaskInvoker::new().with_backend("task", backend.clone());

  let (sender, mut events) = tokio::sync::mpsc::unbounded_channel();
  let runtime = Arc::new(WorkflowRuntime::with_notifier(
    EngineConfig::default(),
    workflow,
    invoker,
    ChannelNotifier::new(sender),
  ));

  let cancel = CancellationToken::new();
  let execution = runtime.start(json!({}), cancel.clone());
  let handle = tokio::spawn(execution.wait());

  // Cancel once the first retry has been scheduled; the engine is parked in
  // its backoff delay at that point.
  while let Some(event) = events.recv().await {
    if matches!(event, ExecutionEvent::RetryScheduled { .. }) {
      cancel.cancel();
      break;
    }
  }

  let outcome = handle.await.unwrap();
  let ExecutionStatus::Failed(detail) = &outcome.status else {
    panic!("expected failure");
  };
  assert_eq!(detail.kind, FailureKind::Cancelled);
  assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_events_are_emitted_in_order() {
  let workflow = single_state(json!({"result_path": "$"}));
  let invoker = TaskInvoker::new().with_backend("task", Arc::new(StaticBackend(json!({}))));

  let (sender, mut events) = tokio::sync::mpsc::unbounded_channel();
  let runtime = Arc::new(WorkflowRuntime::with_notifier(
    EngineConfig::default(),
    workflow,
    invoker,
    ChannelNotifier::new(sender),
  ));

  let outcome = runtime
    .start(json!({}), CancellationToken::new())
    .wait()
    .await;
  assert!(outcome.is_succeeded());

  let mut seen = Vec::new();
  while let Ok(event) = events.try_recv() {
    seen.push(event);
  }
  assert!(matches!(seen[0], ExecutionEvent::ExecutionStarted { .. }));
  assert!(matches!(seen[1], ExecutionEvent::StateStarted { .. }));
  assert!(matches!(seen[2], ExecutionEvent::StateCompleted { .. }));
  assert!(matches!(seen[3], ExecutionEvent::ExecutionSucceeded { .. }));
}
