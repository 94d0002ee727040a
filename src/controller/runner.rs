use tracing::{info, warn};

use crate::agent::agent_model::Action;
use crate::agent::memory::SelectorMemory;
use crate::agent::resolver::IntentResolver;
use crate::browser::driver::AutomationDriver;
use crate::controller::execute::{
    ScenarioError, Timeouts, action_with_selector, failure_context, perform, resolve_step,
};
use crate::scenario::scenario_model::{Scenario, Step};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub scenario: String,
    pub steps_executed: usize,
    pub actions_performed: usize,
    /// Actions whose selector came from memory instead of the resolver
    pub recalled: usize,
}

/// Executes scenarios without recording a graph.
///
/// Named targets are looked up in selector memory first; the resolver is
/// only asked when nothing is remembered or the remembered selector fails.
pub struct ScenarioRunner<'a> {
    driver: &'a mut dyn AutomationDriver,
    resolver: &'a dyn IntentResolver,
    memory: Option<&'a SelectorMemory>,
    tracer: Option<&'a TraceLogger>,
    timeouts: Timeouts,
    last_error: Option<String>,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(driver: &'a mut dyn AutomationDriver, resolver: &'a dyn IntentResolver) -> Self {
        ScenarioRunner {
            driver,
            resolver,
            memory: None,
            tracer: None,
            timeouts: Timeouts::default(),
            last_error: None,
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_memory(mut self, memory: &'a SelectorMemory) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_tracer(mut self, tracer: &'a TraceLogger) -> Self {
        self.tracer = Some(tracer);
        self
    }

    fn trace(
        &self,
        scenario: &Scenario,
        index: usize,
        step: &Step,
        action: Option<&Action>,
        outcome: &str,
    ) {
        if let Some(tracer) = self.tracer {
            let mut event = TraceEvent::now("run", index, step)
                .with_scenario(&scenario.name)
                .with_outcome(outcome);
            if let Some(action) = action {
                event = event.with_action(action);
            }
            tracer.log(&event);
        }
    }

    pub fn run(
        &mut self,
        scenario: &Scenario,
        start_url: &str,
    ) -> Result<RunReport, ScenarioError> {
        let url = scenario.start_url.as_deref().unwrap_or(start_url);
        info!(scenario = %scenario.name, %url, "Running scenario");

        self.driver
            .load_surface(url, self.timeouts.navigation)
            .map_err(|source| ScenarioError::Navigation {
                url: url.to_string(),
                source,
            })?;

        let mut report = RunReport {
            scenario: scenario.name.clone(),
            ..Default::default()
        };

        for (offset, step) in scenario.steps.iter().enumerate() {
            let index = offset + 1;
            info!(step = index, %step, "Executing step");

            match step {
                Step::Wait { target_name } => {
                    let waited = self.driver.wait_for_visible(target_name, self.timeouts.wait);
                    let outcome = if waited.is_ok() { "visible" } else { "timeout" };
                    self.trace(scenario, index, step, None, outcome);
                    waited.map_err(|source| ScenarioError::WaitFailed {
                        index,
                        step: step.to_string(),
                        target: target_name.clone(),
                        source,
                    })?;
                }
                _ => {
                    let recalled = self.run_step(scenario, index, step)?;
                    report.actions_performed += 1;
                    if recalled {
                        report.recalled += 1;
                    }
                }
            }

            report.steps_executed += 1;
        }

        info!(scenario = %scenario.name, actions = report.actions_performed, "Scenario passed");
        Ok(report)
    }

    /// Perform one action step. Returns true when a remembered selector was
    /// used.
    fn run_step(
        &mut self,
        scenario: &Scenario,
        index: usize,
        step: &Step,
    ) -> Result<bool, ScenarioError> {
        if let Some(action) = Action::from_step(step) {
            return self.execute(scenario, index, step, action, false).map(|_| false);
        }

        let url = self.driver.current_url().unwrap_or_default();

        if let Some(action) = self.recall(&url, step) {
            info!(%action, "Using remembered selector");
            match perform(self.driver, &action, &self.timeouts) {
                Ok(()) => {
                    self.trace(scenario, index, step, Some(&action), "recalled");
                    return Ok(true);
                }
                Err(e) => {
                    warn!(%action, error = %e, "Remembered selector failed, asking resolver");
                    self.last_error = Some(failure_context(step, &action, &e));
                }
            }
        }

        let snapshot = match self.driver.content_snapshot() {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "Content snapshot failed");
                None
            }
        };
        let page_url = snapshot
            .as_ref()
            .map(|s| s.url.clone())
            .filter(|u| !u.is_empty())
            .unwrap_or(url);

        let action = resolve_step(
            self.resolver,
            step,
            snapshot.as_ref(),
            &page_url,
            self.last_error.take(),
        )
        .map_err(|source| {
            self.trace(scenario, index, step, None, "resolution failed");
            ScenarioError::Resolution {
                index,
                step: step.to_string(),
                source,
            }
        })?;

        self.execute(scenario, index, step, action.clone(), true)?;

        if let (Some(memory), Some(name), Some(selector)) =
            (self.memory, step.target_name(), action.selector())
        {
            if let Err(e) = memory.remember(&page_url, name, selector) {
                warn!(error = %e, "Could not persist selector memory");
            }
        }

        Ok(false)
    }

    fn recall(&self, url: &str, step: &Step) -> Option<Action> {
        let memory = self.memory?;
        let selector = memory.recall(url, step.target_name()?)?;
        action_with_selector(step, &selector)
    }

    fn execute(
        &mut self,
        scenario: &Scenario,
        index: usize,
        step: &Step,
        action: Action,
        resolved: bool,
    ) -> Result<(), ScenarioError> {
        match perform(self.driver, &action, &self.timeouts) {
            Ok(()) => {
                let outcome = if resolved { "resolved" } else { "explicit" };
                self.trace(scenario, index, step, Some(&action), outcome);
                Ok(())
            }
            Err(source) => {
                warn!(step = index, %action, error = %source, "Action failed");
                self.last_error = Some(failure_context(step, &action, &source));
                self.trace(scenario, index, step, Some(&action), "action failed");
                Err(ScenarioError::Action {
                    index,
                    step: step.to_string(),
                    action,
                    source,
                })
            }
        }
    }
}
