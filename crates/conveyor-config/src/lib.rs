//! Conveyor Config
//!
//! This crate contains the serializable workflow definition types for
//! conveyor. These types represent a workflow as authored — a JSON document
//! with named states, raw parameter templates, and retry declarations —
//! before it is locked and validated for execution.
//!
//! Definitions can be loaded from:
//! - JSON files (via CLI with `conveyor run workflow.json`)
//! - Embedded documents (tests build them with `serde_json::json!`)
//!
//! Locking (template parsing, chain validation, error-kind mapping) lives in
//! `conveyor-workflow`; nothing is diagnosed here beyond serde shape.

mod retry;
mod state;
mod workflow;

pub use retry::RetryDef;
pub use state::StateDef;
pub use workflow::WorkflowDef;
