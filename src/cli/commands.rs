use std::time::Instant;

use tracing::{error, info};

use crate::agent::ai_model::{OllamaResolver, OpenAiResolver};
use crate::agent::memory::SelectorMemory;
use crate::agent::resolver::IntentResolver;
use crate::browser::session::BrowserSession;
use crate::cli::config::{ConfigError, OracleSettings, Settings};
use crate::controller::learn::LearningController;
use crate::controller::runner::ScenarioRunner;
use crate::controller::validate::ValidationController;
use crate::graph::store::GraphStore;
use crate::report::console::format_console_report;
use crate::report::report_model::{ScenarioOutcome, SuiteReport};
use crate::scenario::discovery::{DiscoveryError, discover_scenarios};
use crate::scenario::parser::{ParseError, parse_scenario};
use crate::scenario::scenario_model::Scenario;
use crate::trace::logger::TraceLogger;

/// A scenario name and what parsing it produced.
pub type LoadedScenario = (String, Result<Scenario, ParseError>);

// ============================================================================
// learn subcommand
// ============================================================================

/// Learn every selected scenario and return whether all succeeded.
pub fn cmd_learn(
    settings: &Settings,
    feature: &str,
    only: Option<&str>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let scenarios = load_scenarios(feature, only)?;
    if scenarios.is_empty() {
        eprintln!("No scenarios found at: {}", feature);
        return Ok(true);
    }

    let resolver = build_resolver(&settings.oracle);
    let store = GraphStore::new(&settings.workflow_dir);
    let memory = SelectorMemory::open(&settings.memory_file);
    let tracer = TraceLogger::new(&settings.trace_file);
    let mut session = BrowserSession::launch(&settings.browser_script)?;
    let start = Instant::now();

    let mut controller =
        LearningController::new(&mut session, resolver.as_ref(), &settings.engine, &store)
            .with_timeouts(settings.timeouts)
            .with_memory(&memory)
            .with_tracer(&tracer);

    let mut outcomes = Vec::new();
    for (name, parsed) in scenarios {
        let outcome = match parsed {
            Err(e) => ScenarioOutcome::failed(&name, e),
            Ok(scenario) => match graph_url_for(settings, &scenario) {
                None => ScenarioOutcome::failed(&name, ConfigError::MissingBaseUrl),
                Some(url) => match controller.learn(&scenario, &url) {
                    Ok(report) => ScenarioOutcome::from(&report),
                    Err(e) => {
                        error!(scenario = %name, error = %e, "Learning failed");
                        ScenarioOutcome::failed(&name, e)
                    }
                },
            },
        };
        outcomes.push(outcome);
    }

    let report =
        SuiteReport::from_outcomes("learn", outcomes).with_duration(start.elapsed().as_millis());
    info!(edges = report.edges_recorded(), "Learning finished");
    print!("{}", format_console_report(&report));
    Ok(report.all_passed())
}

// ============================================================================
// validate subcommand
// ============================================================================

pub fn cmd_validate(settings: &Settings) -> Result<bool, Box<dyn std::error::Error>> {
    let base_url = settings.require_base_url()?;
    let store = GraphStore::new(&settings.workflow_dir);
    let tracer = TraceLogger::new(&settings.trace_file);
    let mut session = BrowserSession::launch(&settings.browser_script)?;
    let start = Instant::now();

    let result = ValidationController::new(&mut session, &settings.engine, &store)
        .with_timeouts(settings.timeouts)
        .with_max_steps(settings.max_steps)
        .with_tracer(&tracer)
        .validate(base_url);

    let outcome = match result {
        Ok(report) => ScenarioOutcome::from(&report),
        Err(e) => {
            error!(error = %e, "Validation failed");
            ScenarioOutcome::failed(base_url, e)
        }
    };

    let report = SuiteReport::from_outcomes("validate", vec![outcome])
        .with_duration(start.elapsed().as_millis());
    print!("{}", format_console_report(&report));
    Ok(report.all_passed())
}

// ============================================================================
// run subcommand
// ============================================================================

pub fn cmd_run(
    settings: &Settings,
    feature: &str,
    only: Option<&str>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let scenarios = load_scenarios(feature, only)?;
    if scenarios.is_empty() {
        eprintln!("No scenarios found at: {}", feature);
        return Ok(true);
    }

    let resolver = build_resolver(&settings.oracle);
    let memory = SelectorMemory::open(&settings.memory_file);
    let tracer = TraceLogger::new(&settings.trace_file);
    let mut session = BrowserSession::launch(&settings.browser_script)?;
    let start = Instant::now();

    let mut runner = ScenarioRunner::new(&mut session, resolver.as_ref())
        .with_timeouts(settings.timeouts)
        .with_memory(&memory)
        .with_tracer(&tracer);

    let mut outcomes = Vec::new();
    for (name, parsed) in scenarios {
        let outcome = match parsed {
            Err(e) => ScenarioOutcome::failed(&name, e),
            Ok(scenario) => match start_url_for(settings, &scenario) {
                None => ScenarioOutcome::failed(&name, ConfigError::MissingBaseUrl),
                Some(url) => match runner.run(&scenario, &url) {
                    Ok(report) => ScenarioOutcome::from(&report),
                    Err(e) => {
                        error!(scenario = %name, error = %e, "Scenario failed");
                        ScenarioOutcome::failed(&name, e)
                    }
                },
            },
        };
        outcomes.push(outcome);
    }

    let report =
        SuiteReport::from_outcomes("run", outcomes).with_duration(start.elapsed().as_millis());
    print!("{}", format_console_report(&report));
    Ok(report.all_passed())
}

// ============================================================================
// list subcommand
// ============================================================================

pub fn cmd_list(feature: &str) -> Result<(), Box<dyn std::error::Error>> {
    for found in discover_scenarios(feature)? {
        println!("{}: {}", found.file.display(), found.name);
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Parse the scenarios found at `feature`, or only the one named `only`.
///
/// A requested name that no file declares comes back as
/// `ParseError::ScenarioNotFound`.
pub fn load_scenarios(
    feature: &str,
    only: Option<&str>,
) -> Result<Vec<LoadedScenario>, DiscoveryError> {
    let found = discover_scenarios(feature)?;

    let Some(wanted) = only else {
        return Ok(found
            .into_iter()
            .map(|f| {
                let parsed = parse_scenario(&f.text, &f.name);
                (f.name, parsed)
            })
            .collect());
    };

    let parsed = found
        .iter()
        .find(|f| f.name == wanted.trim())
        .map(|f| parse_scenario(&f.text, &f.name))
        .unwrap_or_else(|| Err(ParseError::ScenarioNotFound(wanted.to_string())));

    Ok(vec![(wanted.to_string(), parsed)])
}

/// The oracle adapter for the resolved settings.
pub fn build_resolver(oracle: &OracleSettings) -> Box<dyn IntentResolver> {
    match oracle {
        OracleSettings::Ollama { endpoint, model } => {
            Box::new(OllamaResolver::new(endpoint, model))
        }
        OracleSettings::OpenAi {
            api_key,
            base_url,
            model,
        } => Box::new(
            OpenAiResolver::new(api_key)
                .with_base_url(base_url)
                .with_model(model),
        ),
    }
}

/// Graphs are named after the configured base URL, so `validate` finds
/// them. A scenario's own start URL stands in when none is configured.
fn graph_url_for(settings: &Settings, scenario: &Scenario) -> Option<String> {
    settings
        .base_url
        .clone()
        .or_else(|| scenario.start_url.clone())
}

/// A scenario's own start URL wins over the configured base URL.
fn start_url_for(settings: &Settings, scenario: &Scenario) -> Option<String> {
    scenario
        .start_url
        .clone()
        .or_else(|| settings.base_url.clone())
}
