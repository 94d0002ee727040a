use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use clap::Parser;
use tempfile::tempdir;
use workflow_learner::agent::ai_model::{DEFAULT_OLLAMA_ENDPOINT, DEFAULT_OLLAMA_MODEL};
use workflow_learner::cli::commands::load_scenarios;
use workflow_learner::cli::config::{
    AppConfig, Cli, Commands, ConfigError, OracleSettings, Settings, load_config,
};
use workflow_learner::scenario::discovery::discover_scenarios;
use workflow_learner::scenario::parser::ParseError;

fn cli(args: &[&str]) -> Cli {
    let mut argv = vec!["workflow-learner"];
    argv.extend_from_slice(args);
    Cli::parse_from(argv)
}

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

fn no_env(_: &str) -> Option<String> {
    None
}

fn config_from(yaml: &str) -> AppConfig {
    serde_yaml::from_str(yaml).unwrap()
}

// ============================================================================
// CLI Argument Parsing Tests
// ============================================================================

#[test]
fn cli_parse_learn() {
    let cli = cli(&["learn", "--feature", "features/login.feature"]);
    match cli.command {
        Commands::Learn { feature, scenario } => {
            assert_eq!(feature, "features/login.feature");
            assert_eq!(scenario, None);
        }
        _ => panic!("Expected Learn command"),
    }
    assert_eq!(cli.verbose, 0);
    assert_eq!(cli.url, None);
}

#[test]
fn cli_parse_learn_single_scenario() {
    let cli = cli(&["learn", "--feature", "features", "--scenario", "Sign in"]);
    match cli.command {
        Commands::Learn { scenario, .. } => assert_eq!(scenario.as_deref(), Some("Sign in")),
        _ => panic!("Expected Learn command"),
    }
}

#[test]
fn cli_parse_validate_with_global_flags() {
    let cli = cli(&[
        "validate",
        "--url",
        "https://app.test/login",
        "-vv",
        "--oracle",
        "openai",
        "--config",
        "custom.yaml",
    ]);
    assert!(matches!(cli.command, Commands::Validate));
    assert_eq!(cli.url.as_deref(), Some("https://app.test/login"));
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.oracle.as_deref(), Some("openai"));
    assert_eq!(cli.config.as_deref(), Some("custom.yaml"));
}

#[test]
fn cli_parse_run_and_list() {
    let run = cli(&["run", "--feature", "a.feature", "--ollama-model", "llama3"]);
    assert!(matches!(run.command, Commands::Run { ref feature, .. } if feature == "a.feature"));
    assert_eq!(run.ollama_model.as_deref(), Some("llama3"));

    let list = cli(&["list", "--feature", "features"]);
    assert!(matches!(list.command, Commands::List { ref feature } if feature == "features"));
}

#[test]
fn cli_requires_a_feature_for_learn() {
    assert!(Cli::try_parse_from(["workflow-learner", "learn"]).is_err());
    assert!(Cli::try_parse_from(["workflow-learner", "explore"]).is_err());
}

// ============================================================================
// Config File Tests
// ============================================================================

#[test]
fn load_config_missing_file_returns_defaults() {
    let config = load_config(Some("/nonexistent/path/workflow-learner.yaml"));
    assert_eq!(config.target.base_url, None);
    assert_eq!(config.timeouts.navigation_ms, 60_000);
    assert_eq!(config.validation.max_steps, 100);
    assert_eq!(config.store.workflow_dir, "workflows");
    assert_eq!(config.store.memory_file, "ai_memory.json");
    assert_eq!(config.browser.script, "node/browser_server.js");
}

#[test]
fn load_config_reads_yaml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("workflow-learner.yaml");
    fs::write(
        &path,
        r##"
target:
  base_url: https://app.test/login
fingerprint:
  stable_regions:
    - div#nav-belt
    - "div#leftNav"
timeouts:
  action_ms: 2000
validation:
  max_steps: 25
store:
  workflow_dir: graphs
"##,
    )
    .unwrap();

    let config = load_config(path.to_str());
    assert_eq!(config.target.base_url.as_deref(), Some("https://app.test/login"));
    assert_eq!(
        config.fingerprint.stable_regions,
        Some(vec!["div#nav-belt".to_string(), "div#leftNav".to_string()])
    );
    assert_eq!(config.timeouts.action_ms, 2000);
    assert_eq!(config.timeouts.wait_ms, 15_000);
    assert_eq!(config.validation.max_steps, 25);
    assert_eq!(config.store.workflow_dir, "graphs");
    assert_eq!(config.store.trace_file, "workflow_trace.jsonl");
}

#[test]
fn load_config_malformed_file_returns_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "target: [this is: not valid").unwrap();

    let config = load_config(path.to_str());
    assert_eq!(config.target.base_url, None);
    assert_eq!(config.validation.max_steps, 100);
}

#[test]
fn timeouts_config_converts_to_durations() {
    let config = config_from("timeouts:\n  navigation_ms: 1000\n  settle_ms: 0\n");
    let timeouts = config.timeouts.to_timeouts();
    assert_eq!(timeouts.navigation, Duration::from_millis(1000));
    assert_eq!(timeouts.action, Duration::from_millis(5000));
    assert_eq!(timeouts.settle, Duration::ZERO);
}

// ============================================================================
// Settings precedence
// ============================================================================

#[test]
fn defaults_when_nothing_is_configured() {
    let settings = Settings::resolve(&cli(&["validate"]), &AppConfig::default(), no_env).unwrap();

    assert_eq!(settings.base_url, None);
    assert!(settings.stable_regions.is_empty());
    assert!(settings.engine.regions().is_empty());
    assert_eq!(settings.max_steps, 100);
    assert_eq!(
        settings.oracle,
        OracleSettings::Ollama {
            endpoint: DEFAULT_OLLAMA_ENDPOINT.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
        }
    );
    assert!(matches!(
        settings.require_base_url(),
        Err(ConfigError::MissingBaseUrl)
    ));
}

#[test]
fn base_url_prefers_cli_then_config_then_env() {
    let config = config_from("target:\n  base_url: https://config.test/\n");
    let env = env_of(&[("BASE_URL", "https://env.test/")]);

    let from_cli = Settings::resolve(&cli(&["validate", "--url", "https://cli.test/"]), &config, &env);
    assert_eq!(from_cli.unwrap().base_url.as_deref(), Some("https://cli.test/"));

    let from_config = Settings::resolve(&cli(&["validate"]), &config, &env);
    assert_eq!(from_config.unwrap().base_url.as_deref(), Some("https://config.test/"));

    let from_env = Settings::resolve(&cli(&["validate"]), &AppConfig::default(), &env).unwrap();
    assert_eq!(from_env.require_base_url().unwrap(), "https://env.test/");
}

#[test]
fn stable_regions_from_env_are_comma_separated() {
    let env = env_of(&[("STABLE_REGIONS", " div#nav-belt , div#leftNav ,")]);
    let settings = Settings::resolve(&cli(&["validate"]), &AppConfig::default(), env).unwrap();

    assert_eq!(settings.stable_regions, vec!["div#nav-belt", "div#leftNav"]);
    assert_eq!(settings.engine.regions().len(), 2);
}

#[test]
fn config_regions_override_env_regions() {
    let config = config_from("fingerprint:\n  stable_regions: [\"form#login-form\"]\n");
    let env = env_of(&[("STABLE_REGIONS", "div#nav-belt")]);
    let settings = Settings::resolve(&cli(&["validate"]), &config, env).unwrap();

    assert_eq!(settings.stable_regions, vec!["form#login-form"]);
}

#[test]
fn invalid_region_locator_is_a_config_error() {
    let env = env_of(&[("STABLE_REGIONS", "div#ok,div > span")]);
    let result = Settings::resolve(&cli(&["validate"]), &AppConfig::default(), env);

    assert!(matches!(
        result,
        Err(ConfigError::InvalidLocator { ref locator, .. }) if locator == "div > span"
    ));
}

#[test]
fn ollama_settings_prefer_cli_over_config_and_env() {
    let config = config_from("oracle:\n  provider: ollama\n  model: from-config\n");
    let env = env_of(&[
        ("OLLAMA_ENDPOINT", "http://env:11434/api/generate"),
        ("OLLAMA_MODEL", "from-env"),
    ]);
    let settings = Settings::resolve(
        &cli(&["validate", "--ollama-model", "from-cli"]),
        &config,
        env,
    )
    .unwrap();

    assert_eq!(
        settings.oracle,
        OracleSettings::Ollama {
            endpoint: "http://env:11434/api/generate".to_string(),
            model: "from-cli".to_string(),
        }
    );
}

#[test]
fn openai_requires_an_api_key() {
    let result = Settings::resolve(&cli(&["validate", "--oracle", "openai"]), &AppConfig::default(), no_env);
    assert!(matches!(
        result,
        Err(ConfigError::MissingCredential("OPENAI_API_KEY"))
    ));
}

#[test]
fn openai_settings_from_env() {
    let env = env_of(&[
        ("OPENAI_API_KEY", "sk-test"),
        ("OPENAI_BASE_URL", "http://localhost:8000/v1"),
    ]);
    let config = config_from("oracle:\n  provider: OpenAI\n");
    let settings = Settings::resolve(&cli(&["validate"]), &config, env).unwrap();

    assert_eq!(
        settings.oracle,
        OracleSettings::OpenAi {
            api_key: "sk-test".to_string(),
            base_url: "http://localhost:8000/v1".to_string(),
            model: "gpt-4-turbo".to_string(),
        }
    );
}

#[test]
fn unknown_oracle_provider_is_rejected() {
    let result = Settings::resolve(&cli(&["validate", "--oracle", "magic"]), &AppConfig::default(), no_env);
    assert!(matches!(result, Err(ConfigError::UnknownProvider(ref p)) if p == "magic"));
}

// ============================================================================
// Scenario discovery
// ============================================================================

const CHECKOUT: &str = "Feature: Checkout\n\n  Scenario: Pay\n    When I click \"Pay\"\n\n  Scenario: Empty\n    Given the basket is empty\n";
const ACCOUNTS: &str = "Feature: Accounts\n\n  Scenario: Sign in\n    When I click \"Sign in\"\n";

fn feature_dir() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("b_checkout.feature"), CHECKOUT).unwrap();
    fs::write(dir.path().join("a_accounts.feature"), ACCOUNTS).unwrap();
    fs::write(dir.path().join("notes.txt"), "Scenario: Not a feature\n").unwrap();
    dir
}

#[test]
fn discovery_visits_feature_files_in_name_order() {
    let dir = feature_dir();
    let found = discover_scenarios(dir.path()).unwrap();

    let names: Vec<&str> = found.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Sign in", "Pay", "Empty"]);
    assert!(found[0].file.ends_with("a_accounts.feature"));
}

#[test]
fn discovery_accepts_a_single_file() {
    let dir = feature_dir();
    let found = discover_scenarios(dir.path().join("b_checkout.feature")).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].text, CHECKOUT);
}

#[test]
fn discovery_of_missing_path_fails() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope");
    let err = discover_scenarios(&missing).unwrap_err();
    assert_eq!(err.path, missing);
}

#[test]
fn load_scenarios_parses_everything_found() {
    let dir = feature_dir();
    let loaded = load_scenarios(dir.path().to_str().unwrap(), None).unwrap();

    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded[1].0, "Pay");
    assert_eq!(loaded[1].1.as_ref().unwrap().steps.len(), 1);
    assert_eq!(
        loaded[2].1.as_ref().unwrap_err(),
        &ParseError::NoSteps("Empty".into())
    );
}

#[test]
fn load_scenarios_filters_by_name() {
    let dir = feature_dir();

    let only = load_scenarios(dir.path().to_str().unwrap(), Some("Sign in")).unwrap();
    assert_eq!(only.len(), 1);
    assert_eq!(only[0].1.as_ref().unwrap().name, "Sign in");

    let missing = load_scenarios(dir.path().to_str().unwrap(), Some("Refund")).unwrap();
    assert_eq!(
        missing,
        vec![(
            "Refund".to_string(),
            Err(ParseError::ScenarioNotFound("Refund".into()))
        )]
    );
}
