use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::screen::screen_model::{DomNode, Snapshot};

/// Attributes set specifically for test automation, checked in order.
pub const AUTOMATION_ID_ATTRS: [&str; 2] = ["data-testid", "automation_id"];

/// How one interactive element is presented to the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSummary {
    pub selector: String,
    pub text: String,
    pub placeholder: String,
    pub value: String,
}

/// Derive a selector for an element.
///
/// Preference order: `id`, automation id attribute, `name`, then a text
/// locator built from the visible text. Returns `None` when none apply.
pub fn derive_selector(node: &DomNode) -> Option<String> {
    if let Some(id) = node.attr("id") {
        return Some(id_selector(id));
    }

    for attr in AUTOMATION_ID_ATTRS {
        if let Some(value) = node.attr(attr) {
            return Some(attr_selector(attr, value));
        }
    }

    if let Some(name) = node.attr("name") {
        return Some(attr_selector("name", name));
    }

    let text = node.visible_text();
    if text.is_empty() {
        None
    } else {
        Some(format!("text={}", text))
    }
}

fn id_selector(id: &str) -> String {
    let plain = id
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if plain {
        format!("#{}", id)
    } else {
        attr_selector("id", id)
    }
}

/// `[attr='value']`, switching to double quotes when the value holds a
/// single quote and escaping when it holds both.
fn attr_selector(attr: &str, value: &str) -> String {
    let value = value.replace('\\', "\\\\");
    if !value.contains('\'') {
        format!("[{}='{}']", attr, value)
    } else if !value.contains('"') {
        format!("[{}=\"{}\"]", attr, value)
    } else {
        format!("[{}='{}']", attr, value.replace('\'', "\\'"))
    }
}

/// Enumerate the interactive elements under `scope`.
pub fn summarize(scope: &DomNode) -> Vec<ElementSummary> {
    scope
        .walk()
        .filter(|node| node.is_interactive() && !node.is_hidden_input())
        .filter_map(|node| {
            let selector = derive_selector(node)?;
            Some(ElementSummary {
                selector,
                text: node.visible_text(),
                placeholder: node.attr("placeholder").unwrap_or_default().to_string(),
                value: node.attr("value").unwrap_or_default().to_string(),
            })
        })
        .collect()
}

/// Innermost container whose text mentions `section` and which holds at
/// least one interactive element.
pub fn section_scope<'a>(root: &'a DomNode, section: &str) -> Option<&'a DomNode> {
    let needle = section.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    deepest_container(root, &needle, 0).map(|(_, node)| node)
}

fn deepest_container<'a>(
    node: &'a DomNode,
    needle: &str,
    depth: usize,
) -> Option<(usize, &'a DomNode)> {
    if !node.visible_text().to_lowercase().contains(needle) {
        return None;
    }

    let inner = node
        .children
        .iter()
        .filter_map(|child| deepest_container(child, needle, depth + 1))
        .max_by_key(|(d, _)| *d);

    if inner.is_some() {
        return inner;
    }

    let has_interactive = node.walk().skip(1).any(|n| n.is_interactive());
    if node.is_container() && has_interactive {
        Some((depth, node))
    } else {
        None
    }
}

/// Element summary for a step, narrowed to `section` when one is given.
///
/// A section that cannot be located degrades to the whole surface.
pub fn scoped_summary(snapshot: &Snapshot, section: Option<&str>) -> Vec<ElementSummary> {
    let scope = match section {
        Some(section) => match section_scope(&snapshot.root, section) {
            Some(container) => {
                debug!(section, tag = %container.tag, "Scoped element summary to section");
                container
            }
            None => {
                warn!(section, "Section not found, summarizing the whole surface");
                &snapshot.root
            }
        },
        None => &snapshot.root,
    };

    summarize(scope)
}

/// Pretty JSON rendering handed to the oracle.
pub fn summary_json(elements: &[ElementSummary]) -> String {
    serde_json::to_string_pretty(elements).unwrap_or_else(|_| "[]".to_string())
}
