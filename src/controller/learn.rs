use tracing::{info, warn};

use crate::agent::agent_model::Action;
use crate::agent::memory::SelectorMemory;
use crate::agent::resolver::IntentResolver;
use crate::browser::driver::AutomationDriver;
use crate::controller::execute::{
    ScenarioError, Timeouts, failure_context, observe, perform, resolve_step,
};
use crate::graph::graph_model::app_name_from_url;
use crate::graph::store::GraphStore;
use crate::scenario::scenario_model::{Scenario, Step};
use crate::state::fingerprint::FingerprintEngine;
use crate::state::state_model::StateFingerprint;
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;

/// Summary of one learned scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningReport {
    pub scenario: String,
    pub app_name: String,
    pub steps_executed: usize,
    pub edges_recorded: usize,
    pub final_state: StateFingerprint,
}

/// Runs scenarios step by step and records every observed transition in
/// the workflow graph.
pub struct LearningController<'a> {
    driver: &'a mut dyn AutomationDriver,
    resolver: &'a dyn IntentResolver,
    engine: &'a FingerprintEngine,
    store: &'a GraphStore,
    memory: Option<&'a SelectorMemory>,
    tracer: Option<&'a TraceLogger>,
    timeouts: Timeouts,
    last_error: Option<String>,
}

impl<'a> LearningController<'a> {
    pub fn new(
        driver: &'a mut dyn AutomationDriver,
        resolver: &'a dyn IntentResolver,
        engine: &'a FingerprintEngine,
        store: &'a GraphStore,
    ) -> Self {
        LearningController {
            driver,
            resolver,
            engine,
            store,
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

    /// Failure text waiting to be handed to the next resolver call.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn trace(&self, event: TraceEvent) {
        if let Some(tracer) = self.tracer {
            tracer.log(&event);
        }
    }

    /// Learn `scenario`, starting at its own start URL or `base_url`.
    ///
    /// The graph is always the one named after `base_url`, so validation
    /// against the same base URL finds it. Edges recorded before a failure
    /// stay in the graph.
    pub fn learn(
        &mut self,
        scenario: &Scenario,
        base_url: &str,
    ) -> Result<LearningReport, ScenarioError> {
        let url = scenario.start_url.as_deref().unwrap_or(base_url);
        let app_name = app_name_from_url(base_url);
        let mut graph = self.store.load(&app_name)?;
        if graph.start_url.is_none() {
            graph.start_url = Some(url.to_string());
        }

        info!(scenario = %scenario.name, %url, app = %app_name, "Learning scenario");

        self.driver
            .load_surface(url, self.timeouts.navigation)
            .map_err(|source| ScenarioError::Navigation {
                url: url.to_string(),
                source,
            })?;

        let start = StateFingerprint::start();
        let initial = observe(self.driver, self.engine);
        let mut edges_recorded = 0;

        if self
            .store
            .insert_edge(&mut graph, &start, &initial.fingerprint, &Action::InitialLoad)?
        {
            edges_recorded += 1;
        }
        self.trace(
            TraceEvent::now("learn", 0, "initial load")
                .with_scenario(&scenario.name)
                .with_action(&Action::InitialLoad)
                .with_transition(&start, &initial.fingerprint)
                .with_outcome("observed"),
        );

        let mut current = initial.fingerprint;

        for (offset, step) in scenario.steps.iter().enumerate() {
            let index = offset + 1;
            info!(step = index, %step, "Executing step");

            if let Step::Wait { target_name } = step {
                let waited = self.driver.wait_for_visible(target_name, self.timeouts.wait);
                self.trace(
                    TraceEvent::now("learn", index, step)
                        .with_scenario(&scenario.name)
                        .with_outcome(if waited.is_ok() { "visible" } else { "timeout" }),
                );
                waited.map_err(|source| ScenarioError::WaitFailed {
                    index,
                    step: step.to_string(),
                    target: target_name.clone(),
                    source,
                })?;
                continue;
            }

            let before = observe(self.driver, self.engine);

            let (action, resolved) = match Action::from_step(step) {
                Some(action) => {
                    info!(%action, "Explicit selector, skipping resolver");
                    (action, false)
                }
                None => {
                    let action = resolve_step(
                        self.resolver,
                        step,
                        before.snapshot.as_ref(),
                        &before.url,
                        self.last_error.take(),
                    )
                    .map_err(|source| {
                        warn!(step = index, error = %source, "Resolution failed");
                        self.trace(
                            TraceEvent::now("learn", index, step)
                                .with_scenario(&scenario.name)
                                .with_outcome(format!("resolution failed: {}", source)),
                        );
                        ScenarioError::Resolution {
                            index,
                            step: step.to_string(),
                            source,
                        }
                    })?;
                    (action, true)
                }
            };

            if let Err(source) = perform(self.driver, &action, &self.timeouts) {
                warn!(step = index, %action, error = %source, "Action failed");
                self.last_error = Some(failure_context(step, &action, &source));
                self.trace(
                    TraceEvent::now("learn", index, step)
                        .with_scenario(&scenario.name)
                        .with_action(&action)
                        .with_outcome(format!("action failed: {}", source.headline())),
                );
                return Err(ScenarioError::Action {
                    index,
                    step: step.to_string(),
                    action,
                    source,
                });
            }

            if resolved {
                self.remember(&before.url, step, &action);
            }

            let after = observe(self.driver, self.engine);
            let inserted = self.store.insert_edge(
                &mut graph,
                &before.fingerprint,
                &after.fingerprint,
                &action,
            )?;

            if inserted {
                edges_recorded += 1;
            } else if before.fingerprint == after.fingerprint {
                info!(
                    step = index,
                    state = %after.fingerprint.short(),
                    "State unchanged, no edge recorded"
                );
            } else {
                info!(step = index, "Transition already known");
            }

            self.trace(
                TraceEvent::now("learn", index, step)
                    .with_scenario(&scenario.name)
                    .with_action(&action)
                    .with_transition(&before.fingerprint, &after.fingerprint)
                    .with_outcome(if inserted { "recorded" } else { "unchanged" }),
            );

            current = after.fingerprint;
        }

        info!(scenario = %scenario.name, edges_recorded, "Scenario learned");

        Ok(LearningReport {
            scenario: scenario.name.clone(),
            app_name,
            steps_executed: scenario.steps.len(),
            edges_recorded,
            final_state: current,
        })
    }

    fn remember(&self, url: &str, step: &Step, action: &Action) {
        let (Some(memory), Some(name), Some(selector)) =
            (self.memory, step.target_name(), action.selector())
        else {
            return;
        };

        if let Err(e) = memory.remember(url, name, selector) {
            warn!(error = %e, "Could not persist selector memory");
        }
    }
}
