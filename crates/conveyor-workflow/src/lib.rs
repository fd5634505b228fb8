//! Conveyor Workflow
//!
//! This crate provides the "locked" workflow representation for conveyor.
//! A locked workflow is the validated, compiled form of a definition,
//! ready for execution.
//!
//! Key differences from `conveyor-config`:
//! - The linear chain is validated (start declared, every `next` resolves,
//!   exactly one terminal state, every state reachable exactly once)
//! - Parameter and selector templates are parsed into typed trees
//! - Result/output paths are parsed
//! - Retry rules carry enumerated error kinds and checked schedules
//!
//! Locking happens once at load time; after that the workflow is immutable
//! for the lifetime of the engine process, and execution never re-parses a
//! path or template.

mod chain;
mod error;
mod state;
mod workflow;

pub use chain::Chain;
pub use error::DefinitionError;
pub use state::{ErrorMatcher, RetryRule, State, Transition};
pub use workflow::Workflow;
