use std::collections::HashMap;
use std::time::Duration;

use conveyor_config::{RetryDef, StateDef, WorkflowDef};
use conveyor_path::{Path, TemplateValue};
use conveyor_task::ErrorKind;

use crate::chain::Chain;
use crate::error::DefinitionError;
use crate::state::{ErrorMatcher, RetryRule, State, Transition};

/// A locked workflow ready for execution.
#[derive(Debug, Clone)]
pub struct Workflow {
  pub name: String,
  pub start_at: String,
  pub states: HashMap<String, State>,
  chain: Chain,
}

impl Workflow {
  /// Validate a definition and compile it into its locked form.
  pub fn lock(def: WorkflowDef) -> Result<Self, DefinitionError> {
    let mut states = HashMap::with_capacity(def.states.len());
    for (name, state_def) in def.states {
      let state = lock_state(&name, state_def)?;
      states.insert(name, state);
    }

    let chain = walk_chain(&def.start_at, &states)?;

    Ok(Self {
      name: def.name,
      start_at: def.start_at,
      states,
      chain,
    })
  }

  /// Get a locked state by name.
  pub fn state(&self, name: &str) -> Option<&State> {
    self.states.get(name)
  }

  /// The linear traversal order.
  pub fn chain(&self) -> &Chain {
    &self.chain
  }
}

/// Walk the chain from the start state, certifying linearity: every state
/// entered exactly once, exactly one terminal state reachable.
fn walk_chain(
  start_at: &str,
  states: &HashMap<String, State>,
) -> Result<Chain, DefinitionError> {
  if !states.contains_key(start_at) {
    return Err(DefinitionError::UnknownStartState(start_at.to_string()));
  }

  let mut order: Vec<String> = Vec::with_capacity(states.len());
  let mut current = start_at.to_string();
  loop {
    if order.contains(&current) {
      return Err(DefinitionError::RepeatedState { state: current });
    }
    order.push(current.clone());

    let state = &states[&current];
    match &state.transition {
      Transition::End => break,
      Transition::Next(target) => {
        if !states.contains_key(target) {
          return Err(DefinitionError::UnknownNextState {
            state: current,
            target: target.clone(),
          });
        }
        current = target.clone();
      }
    }
  }

  if order.len() != states.len() {
    let mut unreachable: Vec<String> = states
      .keys()
      .filter(|name| !order.contains(name))
      .cloned()
      .collect();
    unreachable.sort();
    return Err(DefinitionError::UnreachableStates {
      start: start_at.to_string(),
      states: unreachable,
    });
  }

  Ok(Chain::new(order))
}

fn lock_state(name: &str, def: StateDef) -> Result<State, DefinitionError> {
  let transition = match (def.next, def.end) {
    (Some(_), true) => {
      return Err(DefinitionError::ConflictingTransition {
        state: name.to_string(),
      });
    }
    (Some(target), false) => Transition::Next(target),
    (None, true) => Transition::End,
    (None, false) => {
      return Err(DefinitionError::MissingTransition {
        state: name.to_string(),
      });
    }
  };

  let parameters = lock_template(name, "parameters", def.parameters.as_ref())?;
  let result_selector = lock_template(name, "result_selector", def.result_selector.as_ref())?;
  let result_path = lock_path(name, "result_path", def.result_path.as_deref())?;
  let output_path = lock_path(name, "output_path", def.output_path.as_deref())?;

  let mut retry = Vec::with_capacity(def.retry.len());
  for (index, rule) in def.retry.into_iter().enumerate() {
    retry.push(lock_retry_rule(name, index, rule)?);
  }

  Ok(State {
    name: name.to_string(),
    resource: def.resource,
    parameters,
    result_selector,
    result_path,
    output_path,
    retry,
    timeout: def.timeout_ms.map(Duration::from_millis),
    transition,
  })
}

fn lock_template(
  state: &str,
  field: &'static str,
  raw: Option<&serde_json::Value>,
) -> Result<Option<TemplateValue>, DefinitionError> {
  raw
    .map(TemplateValue::parse)
    .transpose()
    .map_err(|source| DefinitionError::InvalidTemplate {
      state: state.to_string(),
      field,
      source,
    })
}

fn lock_path(
  state: &str,
  field: &'static str,
  raw: Option<&str>,
) -> Result<Option<Path>, DefinitionError> {
  raw
    .map(Path::parse)
    .transpose()
    .map_err(|source| DefinitionError::InvalidTemplate {
      state: state.to_string(),
      field,
      source,
    })
}

fn lock_retry_rule(
  state: &str,
  index: usize,
  def: RetryDef,
) -> Result<RetryRule, DefinitionError> {
  let invalid = |message: String| DefinitionError::InvalidRetryRule {
    state: state.to_string(),
    index,
    message,
  };

  if def.max_attempts == 0 {
    return Err(invalid("max_attempts must be positive".to_string()));
  }
  if !def.backoff_rate.is_finite() || def.backoff_rate <= 0.0 {
    return Err(invalid("backoff_rate must be positive".to_string()));
  }
  if def.interval_ms == 0 {
    return Err(invalid("interval_ms must be positive".to_string()));
  }
  if def.errors.is_empty() {
    return Err(invalid("at least one error kind is required".to_string()));
  }

  let matcher = if def.errors.iter().any(|e| e == "*") {
    if def.errors.len() > 1 {
      return Err(invalid(
        "'*' cannot be combined with named error kinds".to_string(),
      ));
    }
    ErrorMatcher::Any
  } else {
    let mut kinds = Vec::with_capacity(def.errors.len());
    for raw in &def.errors {
      let kind = ErrorKind::from_name(raw)
        .ok_or_else(|| invalid(format!("unknown error kind '{}'", raw)))?;
      kinds.push(kind);
    }
    ErrorMatcher::Kinds(kinds)
  };

  Ok(RetryRule {
    matcher,
    interval: Duration::from_millis(def.interval_ms),
    backoff_rate: def.backoff_rate,
    max_attempts: def.max_attempts,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn definition(raw: serde_json::Value) -> WorkflowDef {
    serde_json::from_value(raw).unwrap()
  }

  fn two_state_definition() -> serde_json::Value {
    json!({
      "name": "test",
      "start_at": "first",
      "states": {
        "first": {
          "resource": "a",
          "parameters": {"key.$": "$.detail.object.key"},
          "result_path": "$.first",
          "retry": [{"errors": ["timeout"], "interval_ms": 100, "backoff_rate": 2.0, "max_attempts": 3}],
          "next": "last"
        },
        "last": {"resource": "b", "end": true}
      }
    })
  }

  #[test]
  fn test_locks_valid_chain() {
    let workflow = Workflow::lock(definition(two_state_definition())).unwrap();

    assert_eq!(workflow.chain().order(), ["first", "last"]);
    let first = workflow.state("first").unwrap();
    assert!(first.parameters.is_some());
    assert_eq!(first.transition, Transition::Next("last".to_string()));
    assert_eq!(first.retry.len(), 1);
    assert_eq!(first.retry[0].interval, Duration::from_millis(100));
    assert!(workflow.state("last").unwrap().is_terminal());
  }

  #[test]
  fn test_unknown_start_state() {
    let mut raw = two_state_definition();
    raw["start_at"] = json!("missing");
    assert!(matches!(
      Workflow::lock(definition(raw)),
      Err(DefinitionError::UnknownStartState(s)) if s == "missing"
    ));
  }

  #[test]
  fn test_unknown_next_target() {
    let mut raw = two_state_definition();
    raw["states"]["first"]["next"] = json!("nowhere");
    assert!(matches!(
      Workflow::lock(definition(raw)),
      Err(DefinitionError::UnknownNextState { target, .. }) if target == "nowhere"
    ));
  }

  #[test]
  fn test_state_with_next_and_end_conflicts() {
    let mut raw = two_state_definition();
    raw["states"]["first"]["end"] = json!(true);
    assert!(matches!(
      Workflow::lock(definition(raw)),
      Err(DefinitionError::ConflictingTransition { state }) if state == "first"
    ));
  }

  #[test]
  fn test_state_without_transition_fails() {
    let raw = json!({
      "name": "test",
      "start_at": "only",
      "states": {"only": {"resource": "a"}}
    });
    assert!(matches!(
      Workflow::lock(definition(raw)),
      Err(DefinitionError::MissingTransition { state }) if state == "only"
    ));
  }

  #[test]
  fn test_cycle_is_rejected() {
    let raw = json!({
      "name": "test",
      "start_at": "first",
      "states": {
        "first": {"resource": "a", "next": "second"},
        "second": {"resource": "b", "next": "first"}
      }
    });
    assert!(matches!(
      Workflow::lock(definition(raw)),
      Err(DefinitionError::RepeatedState { state }) if state == "first"
    ));
  }

  #[test]
  fn test_unreachable_state_is_rejected() {
    // Two terminal states: only one is reachable from start.
    let raw = json!({
      "name": "test",
      "start_at": "first",
      "states": {
        "first": {"resource": "a", "end": true},
        "orphan": {"resource": "b", "end": true}
      }
    });
    assert!(matches!(
      Workflow::lock(definition(raw)),
      Err(DefinitionError::UnreachableStates { states, .. }) if states == ["orphan"]
    ));
  }

  #[test]
  fn test_retry_rule_zero_attempts_is_rejected() {
    let mut raw = two_state_definition();
    raw["states"]["first"]["retry"][0]["max_attempts"] = json!(0);
    assert!(matches!(
      Workflow::lock(definition(raw)),
      Err(DefinitionError::InvalidRetryRule { .. })
    ));
  }

  #[test]
  fn test_retry_rule_non_positive_backoff_is_rejected() {
    let mut raw = two_state_definition();
    raw["states"]["first"]["retry"][0]["backoff_rate"] = json!(0.0);
    assert!(matches!(
      Workflow::lock(definition(raw)),
      Err(DefinitionError::InvalidRetryRule { .. })
    ));
  }

  #[test]
  fn test_retry_rule_unknown_error_kind_is_rejected() {
    let mut raw = two_state_definition();
    raw["states"]["first"]["retry"][0]["errors"] = json!(["Lambda.ServiceException"]);
    assert!(matches!(
      Workflow::lock(definition(raw)),
      Err(DefinitionError::InvalidRetryRule { .. })
    ));
  }

  #[test]
  fn test_retry_rule_catch_all() {
    let mut raw = two_state_definition();
    raw["states"]["first"]["retry"][0]["errors"] = json!(["*"]);
    let workflow = Workflow::lock(definition(raw)).unwrap();
    assert_eq!(
      workflow.state("first").unwrap().retry[0].matcher,
      ErrorMatcher::Any
    );
  }

  #[test]
  fn test_retry_rule_catch_all_cannot_mix() {
    let mut raw = two_state_definition();
    raw["states"]["first"]["retry"][0]["errors"] = json!(["*", "timeout"]);
    assert!(matches!(
      Workflow::lock(definition(raw)),
      Err(DefinitionError::InvalidRetryRule { .. })
    ));
  }

  #[test]
  fn test_malformed_template_fails_lock() {
    let mut raw = two_state_definition();
    raw["states"]["first"]["parameters"] = json!({"key.$": "detail.no.dollar"});
    assert!(matches!(
      Workflow::lock(definition(raw)),
      Err(DefinitionError::InvalidTemplate { field: "parameters", .. })
    ));
  }
}
