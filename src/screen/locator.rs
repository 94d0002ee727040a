use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::screen::screen_model::DomNode;

static COMPOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][\w-]*)?((?:#[\w-]+|\.[\w-]+|\[[^\]]+\])*)$").unwrap()
});

static PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"#([\w-]+)|\.([\w-]+)|\[\s*([\w:-]+)\s*(?:=\s*["']?([^"'\]]*)["']?\s*)?\]"#)
        .unwrap()
});

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid region locator '{0}': expected tag, #id, .class or [attr=value] parts")]
pub struct LocatorError(pub String);

/// A compound element locator: `tag`, `#id`, `.class`, `[attr]` and
/// `[attr='value']` parts, all of which must match the same element.
/// Combinators are not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    raw: String,
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Locator {
    pub fn parse(input: &str) -> Result<Locator, LocatorError> {
        let raw = input.trim();
        let caps = COMPOUND
            .captures(raw)
            .filter(|_| !raw.is_empty())
            .ok_or_else(|| LocatorError(input.to_string()))?;

        let mut locator = Locator {
            raw: raw.to_string(),
            tag: caps.get(1).map(|m| m.as_str().to_lowercase()),
            id: None,
            classes: Vec::new(),
            attrs: Vec::new(),
        };

        let parts = caps.get(2).map_or("", |m| m.as_str());
        for part in PART.captures_iter(parts) {
            if let Some(id) = part.get(1) {
                locator.id = Some(id.as_str().to_string());
            } else if let Some(class) = part.get(2) {
                locator.classes.push(class.as_str().to_string());
            } else if let Some(name) = part.get(3) {
                let value = part.get(4).map(|v| v.as_str().to_string());
                locator.attrs.push((name.as_str().to_lowercase(), value));
            }
        }

        Ok(locator)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, node: &DomNode) -> bool {
        if let Some(tag) = &self.tag {
            if !node.is_tag(tag) {
                return false;
            }
        }

        if let Some(id) = &self.id {
            if node.attr("id") != Some(id.as_str()) {
                return false;
            }
        }

        if !self.classes.is_empty() {
            let classes: Vec<&str> = node.attr("class").unwrap_or("").split_whitespace().collect();
            if !self.classes.iter().all(|c| classes.contains(&c.as_str())) {
                return false;
            }
        }

        self.attrs.iter().all(|(name, expected)| {
            match (node.attrs.get(name), expected) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            }
        })
    }

    /// First matching node in document order.
    pub fn select_first<'a>(&self, root: &'a DomNode) -> Option<&'a DomNode> {
        root.walk().find(|node| self.matches(node))
    }
}

impl FromStr for Locator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locator::parse(s)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
