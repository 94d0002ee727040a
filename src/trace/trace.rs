use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::agent::agent_model::Action;
use crate::state::state_model::StateFingerprint;

/// One line of the JSONL run trace.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,

    /// "learn", "validate" or "run"
    pub mode: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,

    pub step: usize,
    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<StateFingerprint>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<StateFingerprint>,

    pub outcome: String,
}

impl TraceEvent {
    pub fn now(mode: &'static str, step: usize, description: impl ToString) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            mode,
            scenario: None,
            step,
            description: description.to_string(),
            action: None,
            from: None,
            to: None,
            outcome: String::new(),
        }
    }

    pub fn with_scenario(mut self, scenario: &str) -> Self {
        self.scenario = Some(scenario.to_string());
        self
    }

    pub fn with_action(mut self, action: &Action) -> Self {
        self.action = Some(action.clone());
        self
    }

    pub fn with_transition(mut self, from: &StateFingerprint, to: &StateFingerprint) -> Self {
        self.from = Some(from.clone());
        self.to = Some(to.clone());
        self
    }

    pub fn with_outcome(mut self, outcome: impl ToString) -> Self {
        self.outcome = outcome.to_string();
        self
    }
}
