use serde::{Deserialize, Serialize};

use crate::controller::learn::LearningReport;
use crate::controller::runner::RunReport;
use crate::controller::validate::ValidationReport;

// ============================================================================
// Outcome of one scenario (or one graph replay)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub passed: bool,

    /// Steps executed, or transitions replayed for validation
    pub steps: usize,

    /// New edges written to the workflow graph (learning only)
    pub edges_recorded: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScenarioOutcome {
    pub fn failed(name: &str, error: impl ToString) -> Self {
        ScenarioOutcome {
            name: name.to_string(),
            passed: false,
            steps: 0,
            edges_recorded: 0,
            error: Some(error.to_string()),
        }
    }
}

impl From<&LearningReport> for ScenarioOutcome {
    fn from(report: &LearningReport) -> Self {
        ScenarioOutcome {
            name: report.scenario.clone(),
            passed: true,
            steps: report.steps_executed,
            edges_recorded: report.edges_recorded,
            error: None,
        }
    }
}

impl From<&RunReport> for ScenarioOutcome {
    fn from(report: &RunReport) -> Self {
        ScenarioOutcome {
            name: report.scenario.clone(),
            passed: true,
            steps: report.steps_executed,
            edges_recorded: 0,
            error: None,
        }
    }
}

impl From<&ValidationReport> for ScenarioOutcome {
    fn from(report: &ValidationReport) -> Self {
        ScenarioOutcome {
            name: report.app_name.clone(),
            passed: true,
            steps: report.steps_replayed,
            edges_recorded: 0,
            error: None,
        }
    }
}

// ============================================================================
// Suite report, aggregates the outcomes of one CLI invocation
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    /// "learn", "validate" or "run"
    pub mode: String,

    pub total: usize,
    pub passed: usize,
    pub failed: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,

    pub outcomes: Vec<ScenarioOutcome>,
}

impl SuiteReport {
    pub fn from_outcomes(mode: &str, outcomes: Vec<ScenarioOutcome>) -> Self {
        let total = outcomes.len();
        let passed = outcomes.iter().filter(|o| o.passed).count();
        Self {
            mode: mode.to_string(),
            total,
            passed,
            failed: total - passed,
            duration_ms: None,
            outcomes,
        }
    }

    pub fn with_duration(mut self, duration_ms: u128) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn edges_recorded(&self) -> usize {
        self.outcomes.iter().map(|o| o.edges_recorded).sum()
    }
}
