use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::agent::agent_model::Action;
use crate::agent::error::ResolveError;
use crate::agent::resolver::{IntentResolver, ResolutionRequest, parse_reply};

pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5:1.5b";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4-turbo";
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(60);

const SYSTEM_PROMPT: &str =
    "You are a web automation agent that only responds with a single valid JSON object.";

fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client, ResolveError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ResolveError::Transport(format!("failed to build HTTP client: {}", e)))
}

// ============================================================================
// Ollama Backend
// ============================================================================

pub struct OllamaResolver {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for OllamaResolver {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OLLAMA_ENDPOINT.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: String,
    stream: bool,
    format: &'static str,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaResolver {
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }
}

impl IntentResolver for OllamaResolver {
    fn resolve(&self, request: &ResolutionRequest) -> Result<Action, ResolveError> {
        info!(model = %self.model, goal = %request.goal, "Asking Ollama for the next action");

        let body = OllamaRequest {
            model: &self.model,
            system: SYSTEM_PROMPT,
            prompt: request.directive(),
            stream: false,
            format: "json",
        };

        let response = http_client(self.timeout)?
            .post(&self.endpoint)
            .json(&body)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| ResolveError::Transport(e.to_string()))?;

        let ollama_response: OllamaResponse = response
            .json()
            .map_err(|e| ResolveError::Transport(format!("invalid Ollama response: {}", e)))?;

        debug!(reply = %ollama_response.response, "Ollama replied");
        parse_reply(&ollama_response.response, request)
    }
}

// ============================================================================
// OpenAI-compatible chat completions backend
// ============================================================================

pub struct OpenAiResolver {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiResolver {
    pub fn new(api_key: &str) -> Self {
        Self {
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: api_key.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

impl IntentResolver for OpenAiResolver {
    fn resolve(&self, request: &ResolutionRequest) -> Result<Action, ResolveError> {
        info!(model = %self.model, goal = %request.goal, "Asking chat model for the next action");

        let directive = request.directive();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &directive,
                },
            ],
        };

        let response = http_client(self.timeout)?
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| ResolveError::Transport(e.to_string()))?;

        let chat: ChatResponse = response
            .json()
            .map_err(|e| ResolveError::Transport(format!("invalid chat response: {}", e)))?;

        let reply = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(ResolveError::EmptyReply)?;

        debug!(%reply, "Chat model replied");
        parse_reply(&reply, request)
    }
}
