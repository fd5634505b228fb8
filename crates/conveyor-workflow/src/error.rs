use conveyor_path::PathError;
use thiserror::Error;

/// Errors found while locking a workflow definition.
///
/// All of these are load-time failures; a successfully locked workflow never
/// produces one at runtime.
#[derive(Debug, Error)]
pub enum DefinitionError {
  #[error("start state '{0}' is not declared")]
  UnknownStartState(String),

  #[error("state '{state}' transitions to undeclared state '{target}'")]
  UnknownNextState { state: String, target: String },

  #[error("state '{state}' declares both 'next' and 'end'")]
  ConflictingTransition { state: String },

  #[error("state '{state}' is non-terminal but declares no 'next'")]
  MissingTransition { state: String },

  #[error("state '{state}' is entered twice; workflows must be linear chains")]
  RepeatedState { state: String },

  #[error("states unreachable from '{start}': {states:?}")]
  UnreachableStates { start: String, states: Vec<String> },

  #[error("state '{state}', retry rule {index}: {message}")]
  InvalidRetryRule {
    state: String,
    index: usize,
    message: String,
  },

  #[error("state '{state}', {field}: {source}")]
  InvalidTemplate {
    state: String,
    field: &'static str,
    #[source]
    source: PathError,
  },
}
