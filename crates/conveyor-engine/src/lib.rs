//! Conveyor Engine
//!
//! This crate interprets locked workflows: it walks the state chain, resolves
//! each state's parameters against the execution context, invokes the task
//! backend, applies retry decisions, and shapes the context with the state's
//! selector, result path, and output path.
//!
//! # Architecture
//!
//! ```text
//! WorkflowRuntime
//! ├── new(config, workflow, invoker) - owns the locked workflow + backends
//! └── start(context, cancel) -> WorkflowExecution
//!
//! WorkflowExecution
//! └── wait() - per-state loop: resolve → invoke (retry) → select → merge → narrow
//! ```
//!
//! Each execution owns its context outright; nothing is shared between
//! executions, so any number can run concurrently on one runtime. Task
//! failures never surface as `Err` — the returned [`ExecutionOutcome`]
//! carries the terminal status, including the failing state and error detail.
//!
//! # Usage
//!
//! ```ignore
//! use conveyor_engine::{EngineConfig, WorkflowRuntime};
//!
//! let runtime = Arc::new(WorkflowRuntime::new(EngineConfig::default(), workflow, invoker));
//! let outcome = runtime.start(seed, CancellationToken::new()).wait().await;
//! assert!(outcome.is_succeeded());
//! ```

mod events;
mod execution;
mod outcome;
mod runtime;

pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use execution::WorkflowExecution;
pub use outcome::{ExecutionOutcome, ExecutionStatus, FailureDetail, FailureKind, StateRecord};
pub use runtime::{EngineConfig, WorkflowRuntime};
