use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::agent::agent_model::Action;
use crate::agent::error::{DriverError, ResolveError};
use crate::agent::resolver::{IntentResolver, ResolutionRequest};
use crate::browser::driver::AutomationDriver;
use crate::graph::store::StoreError;
use crate::scenario::scenario_model::Step;
use crate::screen::screen_model::Snapshot;
use crate::state::fingerprint::FingerprintEngine;
use crate::state::state_model::StateFingerprint;

/// Bounds for every blocking driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub navigation: Duration,
    pub action: Duration,
    pub wait: Duration,
    /// Pause after each action before the surface is observed again
    pub settle: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            navigation: Duration::from_millis(60_000),
            action: Duration::from_millis(5_000),
            wait: Duration::from_millis(15_000),
            settle: Duration::from_millis(500),
        }
    }
}

/// Failures that end a learning or direct run of one scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("could not load {url}: {source}")]
    Navigation {
        url: String,
        #[source]
        source: DriverError,
    },

    #[error("step {index} ({step}): \"{target}\" never became visible: {source}")]
    WaitFailed {
        index: usize,
        step: String,
        target: String,
        #[source]
        source: DriverError,
    },

    #[error("step {index} ({step}): could not resolve an action: {source}")]
    Resolution {
        index: usize,
        step: String,
        #[source]
        source: ResolveError,
    },

    #[error("step {index} ({step}): {action} failed: {source}")]
    Action {
        index: usize,
        step: String,
        action: Action,
        #[source]
        source: DriverError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the controllers know about the surface at one point in time.
#[derive(Debug, Clone)]
pub struct Observation {
    pub fingerprint: StateFingerprint,
    pub snapshot: Option<Snapshot>,
    pub url: String,
}

/// Snapshot and fingerprint the current surface.
///
/// Never fails: when the snapshot cannot be taken, the failure text is
/// fingerprinted instead.
pub fn observe(driver: &mut dyn AutomationDriver, engine: &FingerprintEngine) -> Observation {
    match driver.content_snapshot() {
        Ok(snapshot) => {
            let fingerprint = engine.fingerprint(&snapshot);
            let url = if snapshot.url.is_empty() {
                driver.current_url().unwrap_or_default()
            } else {
                snapshot.url.clone()
            };
            debug!(state = %fingerprint.short(), %url, "Observed surface");
            Observation {
                fingerprint,
                snapshot: Some(snapshot),
                url,
            }
        }
        Err(e) => {
            warn!(error = %e, "Content snapshot failed, fingerprinting the failure");
            Observation {
                fingerprint: engine.fingerprint_failure(&e.headline()),
                snapshot: None,
                url: driver.current_url().unwrap_or_default(),
            }
        }
    }
}

/// Execute `action` with the action timeout, then let the surface settle.
pub fn perform(
    driver: &mut dyn AutomationDriver,
    action: &Action,
    timeouts: &Timeouts,
) -> Result<(), DriverError> {
    match action {
        Action::InitialLoad => return Ok(()),
        Action::Click { selector } => driver.click(selector, timeouts.action)?,
        Action::Fill { selector, value } => driver.fill(selector, value, timeouts.action)?,
    }

    if let Err(e) = driver.settle(timeouts.settle) {
        debug!(error = %e, "Settle pause failed");
    }
    Ok(())
}

/// Ask the oracle for the action of `step` on the captured surface.
pub fn resolve_step(
    resolver: &dyn IntentResolver,
    step: &Step,
    snapshot: Option<&Snapshot>,
    url: &str,
    last_error: Option<String>,
) -> Result<Action, ResolveError> {
    let snapshot = snapshot.ok_or_else(|| ResolveError::NoSnapshot(url.to_string()))?;

    let request = ResolutionRequest::new(step, snapshot, last_error);
    let action = resolver.resolve(&request)?;
    debug!(goal = %request.goal, %action, "Resolver proposed action");
    Ok(action)
}

/// The action `step` stands for once a selector is known.
pub fn action_with_selector(step: &Step, selector: &str) -> Option<Action> {
    match step {
        Step::Fill { value, .. } => Some(Action::fill(selector, value.clone())),
        Step::Click { .. } | Step::ClickFirstInList { .. } => Some(Action::click(selector)),
        Step::Wait { .. } => None,
    }
}

/// Failure text handed to the next resolver call.
pub fn failure_context(step: &Step, action: &Action, error: &DriverError) -> String {
    format!(
        "{} (for step: {}) failed: {}",
        action,
        step.goal(),
        error.headline()
    )
}
