use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scenario::scenario_model::{Step, Target};

/// A resolved, executable action.
///
/// Serialized in the exchange format shared with the oracle and the graph
/// file: `{"action": "click", "selector": "#login"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Synthetic action recorded for the first observed surface
    InitialLoad,

    Click {
        selector: String,
    },

    Fill {
        selector: String,
        #[serde(default)]
        value: String,
    },
}

impl Action {
    pub fn click(selector: impl Into<String>) -> Self {
        Action::Click {
            selector: selector.into(),
        }
    }

    pub fn fill(selector: impl Into<String>, value: impl Into<String>) -> Self {
        Action::Fill {
            selector: selector.into(),
            value: value.into(),
        }
    }

    /// The action a step describes on its own, when it carries an explicit
    /// selector. Other steps need the oracle.
    pub fn from_step(step: &Step) -> Option<Action> {
        match step {
            Step::Fill {
                target: Target::Selector(selector),
                value,
            } => Some(Action::fill(selector.clone(), value.clone())),
            Step::Click {
                target: Target::Selector(selector),
            } => Some(Action::click(selector.clone())),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::InitialLoad => "initial_load",
            Action::Click { .. } => "click",
            Action::Fill { .. } => "fill",
        }
    }

    pub fn selector(&self) -> Option<&str> {
        match self {
            Action::InitialLoad => None,
            Action::Click { selector } | Action::Fill { selector, .. } => Some(selector.as_str()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::InitialLoad => f.write_str("initial_load"),
            Action::Click { selector } => write!(f, "click {}", selector),
            Action::Fill { selector, value } => write!(f, "fill {} with \"{}\"", selector, value),
        }
    }
}
