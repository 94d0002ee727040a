use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::agent::ai_model::{
    DEFAULT_OLLAMA_ENDPOINT, DEFAULT_OLLAMA_MODEL, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL,
};
use crate::browser::session::DEFAULT_BROWSER_SCRIPT;
use crate::controller::execute::Timeouts;
use crate::controller::validate::DEFAULT_MAX_STEPS;
use crate::screen::locator::{Locator, LocatorError};
use crate::state::fingerprint::FingerprintEngine;

pub const DEFAULT_CONFIG_FILE: &str = "workflow-learner.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "workflow-learner",
    version,
    about = "Learns UI workflow graphs from scenario text and replays them as regression checks"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Base URL of the application under test
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Path to config file (default: workflow-learner.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Oracle provider: ollama or openai
    #[arg(long, global = true)]
    pub oracle: Option<String>,

    /// Ollama API endpoint
    #[arg(long, global = true)]
    pub ollama_endpoint: Option<String>,

    /// Ollama model name
    #[arg(long, global = true)]
    pub ollama_model: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Learn scenarios into the workflow graph
    Learn {
        /// Feature file or directory of .feature files
        #[arg(long)]
        feature: String,

        /// Only this scenario (default: every scenario found)
        #[arg(long)]
        scenario: Option<String>,
    },

    /// Replay the learned workflow graph for the base URL
    Validate,

    /// Execute scenarios directly, without recording
    Run {
        #[arg(long)]
        feature: String,

        #[arg(long)]
        scenario: Option<String>,
    },

    /// List the scenarios found in a feature file or directory
    List {
        #[arg(long)]
        feature: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `workflow-learner.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub fingerprint: FingerprintConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetConfig {
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FingerprintConfig {
    /// Ordered locators of regions that define the state identity
    pub stable_regions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_navigation_ms")]
    pub navigation_ms: u64,

    #[serde(default = "default_action_ms")]
    pub action_ms: u64,

    #[serde(default = "default_wait_ms")]
    pub wait_ms: u64,

    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            navigation_ms: default_navigation_ms(),
            action_ms: default_action_ms(),
            wait_ms: default_wait_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl TimeoutsConfig {
    pub fn to_timeouts(&self) -> Timeouts {
        Timeouts {
            navigation: Duration::from_millis(self.navigation_ms),
            action: Duration::from_millis(self.action_ms),
            wait: Duration::from_millis(self.wait_ms),
            settle: Duration::from_millis(self.settle_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleConfig {
    pub provider: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_workflow_dir")]
    pub workflow_dir: String,

    #[serde(default = "default_memory_file")]
    pub memory_file: String,

    #[serde(default = "default_trace_file")]
    pub trace_file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            workflow_dir: default_workflow_dir(),
            memory_file: default_memory_file(),
            trace_file: default_trace_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_browser_script")]
    pub script: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            script: default_browser_script(),
        }
    }
}

// Serde default helpers
fn default_navigation_ms() -> u64 { 60_000 }
fn default_action_ms() -> u64 { 5_000 }
fn default_wait_ms() -> u64 { 15_000 }
fn default_settle_ms() -> u64 { 500 }
fn default_max_steps() -> usize { DEFAULT_MAX_STEPS }
fn default_workflow_dir() -> String { "workflows".to_string() }
fn default_memory_file() -> String { "ai_memory.json".to_string() }
fn default_trace_file() -> String { "workflow_trace.jsonl".to_string() }
fn default_browser_script() -> String { DEFAULT_BROWSER_SCRIPT.to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_FILE);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            warn!(path = config_path, error = %e, "Malformed config file, using defaults");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Resolved settings (CLI > config file > environment > defaults)
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid stable region locator '{locator}': {source}")]
    InvalidLocator {
        locator: String,
        #[source]
        source: LocatorError,
    },

    #[error("unknown oracle provider '{0}' (expected ollama or openai)")]
    UnknownProvider(String),

    #[error("{0} is not set")]
    MissingCredential(&'static str),

    #[error("no base URL: pass --url, set target.base_url or BASE_URL")]
    MissingBaseUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleSettings {
    Ollama {
        endpoint: String,
        model: String,
    },
    OpenAi {
        api_key: String,
        base_url: String,
        model: String,
    },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: Option<String>,
    pub stable_regions: Vec<String>,
    pub engine: FingerprintEngine,
    pub timeouts: Timeouts,
    pub max_steps: usize,
    pub oracle: OracleSettings,
    pub workflow_dir: PathBuf,
    pub memory_file: PathBuf,
    pub trace_file: PathBuf,
    pub browser_script: String,
}

impl Settings {
    /// Merge CLI flags, the config file and the environment.
    ///
    /// `env` looks up one variable; the binary passes `std::env::var`.
    pub fn resolve<F>(cli: &Cli, config: &AppConfig, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = cli
            .url
            .clone()
            .or_else(|| config.target.base_url.clone())
            .or_else(|| env("BASE_URL"))
            .filter(|u| !u.trim().is_empty());

        let stable_regions: Vec<String> = match &config.fingerprint.stable_regions {
            Some(regions) => regions.clone(),
            None => env("STABLE_REGIONS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        };

        let mut regions = Vec::with_capacity(stable_regions.len());
        for locator in &stable_regions {
            let parsed = Locator::parse(locator).map_err(|source| {
                ConfigError::InvalidLocator {
                    locator: locator.clone(),
                    source,
                }
            })?;
            regions.push(parsed);
        }

        let provider = cli
            .oracle
            .clone()
            .or_else(|| config.oracle.provider.clone())
            .unwrap_or_else(|| "ollama".to_string())
            .to_lowercase();

        let oracle = match provider.as_str() {
            "ollama" => OracleSettings::Ollama {
                endpoint: cli
                    .ollama_endpoint
                    .clone()
                    .or_else(|| config.oracle.endpoint.clone())
                    .or_else(|| env("OLLAMA_ENDPOINT"))
                    .unwrap_or_else(|| DEFAULT_OLLAMA_ENDPOINT.to_string()),
                model: cli
                    .ollama_model
                    .clone()
                    .or_else(|| config.oracle.model.clone())
                    .or_else(|| env("OLLAMA_MODEL"))
                    .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            },
            "openai" => OracleSettings::OpenAi {
                api_key: env("OPENAI_API_KEY")
                    .filter(|k| !k.is_empty())
                    .ok_or(ConfigError::MissingCredential("OPENAI_API_KEY"))?,
                base_url: config
                    .oracle
                    .endpoint
                    .clone()
                    .or_else(|| env("OPENAI_BASE_URL"))
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                model: config
                    .oracle
                    .model
                    .clone()
                    .or_else(|| env("OPENAI_MODEL"))
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            },
            other => return Err(ConfigError::UnknownProvider(other.to_string())),
        };

        Ok(Settings {
            base_url,
            stable_regions,
            engine: FingerprintEngine::new(regions),
            timeouts: config.timeouts.to_timeouts(),
            max_steps: config.validation.max_steps,
            oracle,
            workflow_dir: PathBuf::from(&config.store.workflow_dir),
            memory_file: PathBuf::from(&config.store.memory_file),
            trace_file: PathBuf::from(&config.store.trace_file),
            browser_script: config.browser.script.clone(),
        })
    }

    pub fn require_base_url(&self) -> Result<&str, ConfigError> {
        self.base_url.as_deref().ok_or(ConfigError::MissingBaseUrl)
    }
}
