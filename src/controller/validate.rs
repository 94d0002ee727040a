use thiserror::Error;
use tracing::{error, info};

use crate::agent::agent_model::Action;
use crate::agent::error::DriverError;
use crate::browser::driver::AutomationDriver;
use crate::controller::execute::{Timeouts, observe, perform};
use crate::graph::graph_model::app_name_from_url;
use crate::graph::store::{GraphStore, StoreError};
use crate::state::fingerprint::FingerprintEngine;
use crate::state::state_model::StateFingerprint;
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;

pub const DEFAULT_MAX_STEPS: usize = 100;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("no learned workflow for {app}")]
    EmptyGraph { app: String },

    #[error("could not load {url}: {source}")]
    Navigation {
        url: String,
        #[source]
        source: DriverError,
    },

    #[error("initial surface is {actual}, expected {expected}")]
    InitialStateMismatch {
        expected: StateFingerprint,
        actual: StateFingerprint,
    },

    #[error("step {step}: {action} led to {actual}, expected {expected}")]
    StateMismatch {
        step: usize,
        action: Action,
        expected: StateFingerprint,
        actual: StateFingerprint,
    },

    #[error("step {step}: {action} failed: {source}")]
    Action {
        step: usize,
        action: Action,
        #[source]
        source: DriverError,
    },

    #[error("step limit of {max_steps} exceeded at {state} (cyclic graph?)")]
    StepLimitExceeded {
        max_steps: usize,
        state: StateFingerprint,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub app_name: String,
    pub steps_replayed: usize,
    /// States visited after START, in order
    pub path: Vec<StateFingerprint>,
}

/// Replays a learned workflow graph from START and checks that every
/// action reproduces its recorded target state.
pub struct ValidationController<'a> {
    driver: &'a mut dyn AutomationDriver,
    engine: &'a FingerprintEngine,
    store: &'a GraphStore,
    tracer: Option<&'a TraceLogger>,
    timeouts: Timeouts,
    max_steps: usize,
}

impl<'a> ValidationController<'a> {
    pub fn new(
        driver: &'a mut dyn AutomationDriver,
        engine: &'a FingerprintEngine,
        store: &'a GraphStore,
    ) -> Self {
        ValidationController {
            driver,
            engine,
            store,
            tracer: None,
            timeouts: Timeouts::default(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_tracer(mut self, tracer: &'a TraceLogger) -> Self {
        self.tracer = Some(tracer);
        self
    }

    fn trace(&self, event: TraceEvent) {
        if let Some(tracer) = self.tracer {
            tracer.log(&event);
        }
    }

    /// Replay the graph learned for `base_url`, starting at the page the
    /// graph was learned from.
    ///
    /// The application's graph lock is held shared for the whole replay, so
    /// no learning session can change the graph underneath it.
    pub fn validate(&mut self, base_url: &str) -> Result<ValidationReport, ValidationError> {
        let app_name = app_name_from_url(base_url);
        let lock = self.store.lock_for(&app_name)?;
        let _guard = lock.read().map_err(|_| StoreError::Poisoned)?;

        let graph = self.store.read_graph(&app_name);
        if graph.is_empty() {
            return Err(ValidationError::EmptyGraph { app: app_name });
        }

        info!(app = %app_name, edges = graph.edges.len(), "Validating workflow");

        let start_url = graph.start_url.as_deref().unwrap_or(base_url);
        self.driver
            .load_surface(start_url, self.timeouts.navigation)
            .map_err(|source| ValidationError::Navigation {
                url: start_url.to_string(),
                source,
            })?;

        let mut current = StateFingerprint::start();
        let mut path = Vec::new();

        loop {
            let Some(edge) = graph.next_edge(&current) else {
                info!(state = %current.short(), "End of learned path");
                break;
            };

            if path.len() >= self.max_steps {
                error!(max_steps = self.max_steps, state = %current.short(), "Step limit exceeded");
                return Err(ValidationError::StepLimitExceeded {
                    max_steps: self.max_steps,
                    state: current,
                });
            }

            let step = path.len() + 1;

            if edge.action != Action::InitialLoad {
                if let Err(source) = perform(self.driver, &edge.action, &self.timeouts) {
                    error!(step, action = %edge.action, error = %source, "Replay action failed");
                    self.trace(
                        TraceEvent::now("validate", step, &edge.action)
                            .with_action(&edge.action)
                            .with_outcome(format!("action failed: {}", source.headline())),
                    );
                    return Err(ValidationError::Action {
                        step,
                        action: edge.action.clone(),
                        source,
                    });
                }
            }

            let actual = observe(self.driver, self.engine).fingerprint;

            self.trace(
                TraceEvent::now("validate", step, &edge.action)
                    .with_action(&edge.action)
                    .with_transition(&current, &actual)
                    .with_outcome(if actual == edge.to { "match" } else { "mismatch" }),
            );

            if actual != edge.to {
                error!(
                    step,
                    expected = %edge.to.short(),
                    actual = %actual.short(),
                    "State divergence"
                );
                return Err(match edge.action {
                    Action::InitialLoad => ValidationError::InitialStateMismatch {
                        expected: edge.to.clone(),
                        actual,
                    },
                    _ => ValidationError::StateMismatch {
                        step,
                        action: edge.action.clone(),
                        expected: edge.to.clone(),
                        actual,
                    },
                });
            }

            info!(step, state = %actual.short(), "State matches");
            current = actual;
            path.push(current.clone());
        }

        Ok(ValidationReport {
            app_name,
            steps_replayed: path.len(),
            path,
        })
    }
}
