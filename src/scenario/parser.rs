use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::scenario::scenario_model::{Scenario, Step, Target};

// ============================================================================
// Scenario grammar
// ============================================================================
//
// Lines are matched case-insensitively after the leading Gherkin keyword
// (Given/When/Then/And/But/*) is stripped. Forms are tried in a fixed order
// and the first match wins, so the more specific forms come first:
//
//   1. section declaration    I am under the '<section>' section
//   2. explicit-selector fill I enter '<value>' into field with selector '<css>'
//   3. explicit-selector click I click element with selector '<css>'
//   4. first item of a list   I click the first item in the '<list>' list
//   5. natural-language fill  I enter '<value>' as <name> | I enter <name> as '<value>'
//   6. natural-language click I click [on] [the] '<name>' [button]
//   7. wait / assertion       I should [be on|see|wait for] '<name>'
//
// A selector-carrying line therefore never reaches the natural-language
// forms. Other `Given` lines are preconditions and produce no step.

static SCENARIO_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*scenario(?:\s+outline)?:\s*(.*?)\s*$").unwrap());

static FEATURE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:feature|examples):").unwrap());

static STEP_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:given|when|then|and|but|\*)\s+").unwrap());

static PRECONDITION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^given\s").unwrap());

static START_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^given\s+I am on the (?:website|page|site)\s+["']([^"']+)["']"#).unwrap()
});

static SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^I am (?:under|in|within) the (.+?) section$"#).unwrap()
});

static SELECTOR_FILL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)^I (?:enter|type) ["'](.*?)["'] in(?:to)? (?:the )?(?:field|input|element) with selector ["'](.+)["']$"#,
    )
    .unwrap()
});

static SELECTOR_CLICK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^I (?:click|press) (?:on )?(?:the )?element with selector ["'](.+)["']$"#)
        .unwrap()
});

static FIRST_IN_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)^I (?:click|press) (?:on )?the first (?:item|result|entry|link) (?:in|of) (?:the )?(.+?)(?:\s+list)?$"#,
    )
    .unwrap()
});

static FILL_VALUE_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^I (?:enter|type) ["'](.*?)["'] as (?:the )?(.+?)$"#).unwrap()
});

static FILL_NAME_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^I (?:enter|type) (?:the )?(.+?) as ["'](.*?)["']$"#).unwrap()
});

static CLICK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^I (?:click|press) (?:on )?(?:the )?(.+?)(?:\s+button)?$"#).unwrap()
});

static WAIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)^I (?:should (?:be on |see |wait for )?|wait for |see )(?:the )?(.+?)(?:\s+page)?$"#,
    )
    .unwrap()
});

static FIELD_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:the\s+)?(.+?)(?:\s+field)?$").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("scenario '{0}' not found")]
    ScenarioNotFound(String),

    #[error("scenario '{0}' contains no recognizable steps")]
    NoSteps(String),
}

// ============================================================================
// Parser state
// ============================================================================

/// State threaded through line processing. The only mutable context is the
/// section most recently declared; a wait step clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseState {
    pub current_section: Option<String>,
}

impl ParseState {
    /// Process one trimmed, non-blank, non-comment line.
    pub fn advance(self, line: &str) -> (ParseState, Option<Step>) {
        let is_precondition = PRECONDITION.is_match(line);
        let body = STEP_KEYWORD.replace(line, "");
        let body = body.trim();

        if let Some(caps) = SECTION.captures(body) {
            let section = clean_name(&caps[1]);
            return (
                ParseState {
                    current_section: Some(section),
                },
                None,
            );
        }

        if is_precondition {
            return (self, None);
        }

        let section = self.current_section.as_deref();

        if let Some(caps) = SELECTOR_FILL.captures(body) {
            let step = Step::Fill {
                target: Target::selector(caps[2].trim()),
                value: caps[1].to_string(),
            };
            return (self, Some(step));
        }

        if let Some(caps) = SELECTOR_CLICK.captures(body) {
            let step = Step::Click {
                target: Target::selector(caps[1].trim()),
            };
            return (self, Some(step));
        }

        if let Some(caps) = FIRST_IN_LIST.captures(body) {
            let step = Step::ClickFirstInList {
                list_name: clean_name(&caps[1]),
                section: section.map(|s| s.to_string()),
            };
            return (self, Some(step));
        }

        if let Some(caps) = FILL_VALUE_FIRST.captures(body) {
            let step = Step::Fill {
                target: Target::named(clean_field_name(&caps[2]), section),
                value: caps[1].to_string(),
            };
            return (self, Some(step));
        }

        if let Some(caps) = FILL_NAME_FIRST.captures(body) {
            let step = Step::Fill {
                target: Target::named(clean_field_name(&caps[1]), section),
                value: caps[2].to_string(),
            };
            return (self, Some(step));
        }

        if let Some(caps) = CLICK.captures(body) {
            let step = Step::Click {
                target: Target::named(clean_name(&caps[1]), section),
            };
            return (self, Some(step));
        }

        if let Some(caps) = WAIT.captures(body) {
            let step = Step::Wait {
                target_name: clean_name(&caps[1]),
            };
            return (ParseState::default(), Some(step));
        }

        debug!(line, "Line matched no step form, skipping");
        (self, None)
    }
}

// ============================================================================
// Public entry points
// ============================================================================

/// Parse the named scenario into its ordered steps.
///
/// Returns an empty sequence when the scenario is missing or has no
/// recognizable step lines.
pub fn parse(text: &str, scenario_name: &str) -> Vec<Step> {
    parse_scenario(text, scenario_name)
        .map(|scenario| scenario.steps)
        .unwrap_or_default()
}

/// Parse the named scenario, reporting why nothing could be parsed.
pub fn parse_scenario(text: &str, scenario_name: &str) -> Result<Scenario, ParseError> {
    let block = scenario_block(text, scenario_name)
        .ok_or_else(|| ParseError::ScenarioNotFound(scenario_name.to_string()))?;

    let mut state = ParseState::default();
    let mut steps = Vec::new();
    let mut start_url = None;

    for raw in block {
        let line = raw.trim();

        if line.is_empty() {
            if steps.is_empty() {
                continue;
            }
            break;
        }

        if line.starts_with('#') || line.starts_with('@') {
            continue;
        }

        if start_url.is_none() {
            if let Some(caps) = START_URL.captures(line) {
                start_url = Some(caps[1].to_string());
            }
        }

        let (next, step) = state.advance(line);
        state = next;
        steps.extend(step);
    }

    if steps.is_empty() {
        return Err(ParseError::NoSteps(scenario_name.to_string()));
    }

    Ok(Scenario {
        name: scenario_name.to_string(),
        start_url,
        steps,
    })
}

/// Names of every scenario declared in the text, in source order.
pub fn scenario_names(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| SCENARIO_HEADER.captures(line))
        .map(|caps| caps[1].to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Lines following the named scenario header, up to the next header.
fn scenario_block<'a>(text: &'a str, scenario_name: &str) -> Option<Vec<&'a str>> {
    let wanted = scenario_name.trim();
    let mut lines = text.lines();

    lines.by_ref().find(|line| {
        SCENARIO_HEADER
            .captures(line)
            .is_some_and(|caps| &caps[1] == wanted)
    })?;

    Some(
        lines
            .take_while(|line| !SCENARIO_HEADER.is_match(line) && !FEATURE_HEADER.is_match(line))
            .collect(),
    )
}

// ============================================================================
// Name cleanup
// ============================================================================

/// A quoted name keeps only the quoted span, dropping nouns such as
/// "link" or "message" that follow it.
fn clean_name(raw: &str) -> String {
    let raw = raw.trim();
    let name = match raw.chars().next() {
        Some(quote @ ('"' | '\'')) => match raw[1..].find(quote) {
            Some(end) => &raw[1..1 + end],
            None => &raw[1..],
        },
        _ => raw.trim_end_matches(['"', '\'']),
    };
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_field_name(raw: &str) -> String {
    let name = clean_name(raw);
    match FIELD_NOISE.captures(&name) {
        Some(caps) => clean_name(&caps[1]),
        None => name,
    }
}
