//! Run history records and user variables.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The action one step took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub params: Value,
}

impl ActionRecord {
    pub fn new(kind: impl Into<String>, params: Value) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }
}

/// How a step ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub success: bool,
    pub message: String,
}

impl StepOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// One completed agent step. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    pub index: usize,
    pub thoughts: String,
    pub memory: String,
    pub action: ActionRecord,
    pub outcome: StepOutcome,
}

/// Append-only step history, retained for the whole run.
///
/// Nothing here trims: rendering applies the display window, the record
/// itself stays complete.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AgentHistory {
    steps: Vec<AgentStep>,
}

impl AgentHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: AgentStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[AgentStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A user-provided variable, echoed into the context each step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub description: String,
    pub value: Value,
}

impl Variable {
    pub fn new(key: impl Into<String>, description: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            value,
        }
    }
}
