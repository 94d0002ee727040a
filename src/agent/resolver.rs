use serde::Deserialize;
use serde_json::Value;

use crate::agent::agent_model::Action;
use crate::agent::error::ResolveError;
use crate::scenario::scenario_model::Step;
use crate::screen::screen_model::Snapshot;
use crate::screen::summary::{ElementSummary, scoped_summary, summary_json};

// ============================================================================
// IntentResolver trait
// ============================================================================

/// Turns one under-specified step into one concrete action.
///
/// Implementations wrap a specific oracle; they receive a fully built
/// request and are expected to answer with exactly one action.
pub trait IntentResolver {
    fn resolve(&self, request: &ResolutionRequest) -> Result<Action, ResolveError>;
}

impl<R: IntentResolver + ?Sized> IntentResolver for Box<R> {
    fn resolve(&self, request: &ResolutionRequest) -> Result<Action, ResolveError> {
        (**self).resolve(request)
    }
}

// ============================================================================
// Resolution request
// ============================================================================

/// Everything the oracle needs for a single step.
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    pub step: Step,
    pub goal: String,
    pub elements: Vec<ElementSummary>,
    pub last_error: Option<String>,
}

impl ResolutionRequest {
    /// Build a request, scoping the element summary to the step's section.
    pub fn new(step: &Step, snapshot: &Snapshot, last_error: Option<String>) -> Self {
        ResolutionRequest {
            step: step.clone(),
            goal: step.goal(),
            elements: scoped_summary(snapshot, step.section()),
            last_error,
        }
    }

    /// The directive sent to the oracle.
    pub fn directive(&self) -> String {
        let mut out = String::new();

        out.push_str(
            "You resolve ONE step of a UI test scenario into ONE browser action.\n\n",
        );

        if let Some(error) = &self.last_error {
            out.push_str("YOUR PREVIOUS ACTION FAILED:\n");
            out.push_str(&format!("\"{}\"\n", error.trim()));
            out.push_str(
                "Do not repeat it. Choose a different element or a different action.\n\n",
            );
        }

        out.push_str(&format!("GOAL (this step only): {}\n", self.goal));

        if let Some(value) = self.step.fill_value() {
            out.push_str(&format!("Value to enter: \"{}\"\n", value));
        }

        if let Some(section) = self.step.section() {
            out.push_str(&format!(
                "The element is inside the \"{}\" section.\n",
                section
            ));
        }

        out.push_str("\nINTERACTIVE ELEMENTS ON SCREEN:\n");
        out.push_str(&summary_json(&self.elements));
        out.push_str("\n\n");

        out.push_str(
            r#"RESPONSE FORMAT (mandatory):
Reply with ONLY one JSON object, no other text:
{"action": "click" | "fill", "selector": "<selector from the list above>", "value": "<text to enter, fill only>"}"#,
        );

        out
    }
}

// ============================================================================
// Reply extraction
// ============================================================================

#[derive(Debug, Deserialize)]
struct ReplyShape {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    selector: Option<String>,
    #[serde(default)]
    value: Option<Value>,
}

/// Locate the JSON payload in an oracle reply that may be wrapped in code
/// fences or prose.
///
/// Every opening bracket is tried in order. The first JSON value that is an
/// object, or an array holding one, wins; prose after it is ignored.
pub fn extract_payload(reply: &str) -> Option<&str> {
    let text = strip_fences(reply.trim());

    text.char_indices()
        .filter(|&(_, c)| c == '{' || c == '[')
        .find_map(|(start, _)| {
            let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
            match stream.next() {
                Some(Ok(value)) if holds_object(&value) => {
                    Some(&text[start..start + stream.byte_offset()])
                }
                _ => None,
            }
        })
}

fn holds_object(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => items.iter().any(Value::is_object),
        _ => false,
    }
}

fn strip_fences(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text;
    };

    let after = &text[open + 3..];
    // Skip an info string such as `json`.
    let body_start = after.find('\n').map_or(0, |i| i + 1);
    let body = &after[body_start..];

    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Parse an oracle reply into an action for `request`.
///
/// A fill reply without a value falls back to the value from the step.
pub fn parse_reply(reply: &str, request: &ResolutionRequest) -> Result<Action, ResolveError> {
    if reply.trim().is_empty() {
        return Err(ResolveError::EmptyReply);
    }

    let unparsable = || ResolveError::Unparsable {
        reply: reply.trim().to_string(),
    };

    let payload = extract_payload(reply).ok_or_else(unparsable)?;
    let value: Value = serde_json::from_str(payload).map_err(|_| unparsable())?;

    let object = match value {
        Value::Array(items) => items
            .into_iter()
            .find(|item| item.is_object())
            .ok_or_else(unparsable)?,
        object @ Value::Object(_) => object,
        _ => return Err(unparsable()),
    };

    let shape: ReplyShape = serde_json::from_value(object).map_err(|_| unparsable())?;

    let kind = shape
        .action
        .map(|a| a.trim().to_lowercase())
        .filter(|a| !a.is_empty())
        .ok_or(ResolveError::IncompleteReply { field: "action" })?;

    let selector = shape
        .selector
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(ResolveError::IncompleteReply { field: "selector" })?;

    match kind.as_str() {
        "click" => Ok(Action::click(selector)),
        "fill" | "type" => {
            let value = match shape.value {
                Some(Value::String(s)) if !s.is_empty() => s,
                Some(Value::String(_)) | Some(Value::Null) | None => {
                    request.step.fill_value().unwrap_or_default().to_string()
                }
                Some(other) => other.to_string(),
            };
            Ok(Action::fill(selector, value))
        }
        other => Err(ResolveError::UnsupportedAction(other.to_string())),
    }
}
