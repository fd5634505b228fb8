use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::state::StateDef;

/// A workflow definition as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  pub name: String,
  /// Name of the state the pipeline enters first.
  pub start_at: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub comment: Option<String>,
  pub states: HashMap<String, StateDef>,
}

impl WorkflowDef {
  /// Get a state definition by name.
  pub fn get_state(&self, name: &str) -> Option<&StateDef> {
    self.states.get(name)
  }
}
