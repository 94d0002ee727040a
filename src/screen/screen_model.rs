use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::state::normalize::collapse_whitespace;

/// Tags the oracle may act on.
pub const INTERACTIVE_TAGS: [&str; 5] = ["input", "button", "a", "select", "textarea"];

/// Containers that can scope a section lookup.
pub const CONTAINER_TAGS: [&str; 14] = [
    "div", "section", "form", "fieldset", "nav", "aside", "header", "footer", "main", "article",
    "ul", "ol", "table", "dialog",
];

/// One element of the rendered surface, as returned by the driver's
/// content snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomNode {
    pub tag: String,

    #[serde(default)]
    pub attrs: BTreeMap<String, String>,

    /// Text directly owned by this element (not its children)
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub children: Vec<DomNode>,
}

impl DomNode {
    pub fn new(tag: &str) -> Self {
        DomNode {
            tag: tag.to_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_child(mut self, child: DomNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = DomNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .get(name)
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    pub fn is_hidden_input(&self) -> bool {
        self.is_tag("input")
            && self
                .attr("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
    }

    pub fn is_interactive(&self) -> bool {
        INTERACTIVE_TAGS.iter().any(|t| self.is_tag(t))
    }

    pub fn is_container(&self) -> bool {
        CONTAINER_TAGS.iter().any(|t| self.is_tag(t))
    }

    /// Pre-order traversal, starting with this node.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// All text under this node, whitespace-collapsed.
    pub fn visible_text(&self) -> String {
        let joined = self
            .walk()
            .map(|n| n.text.as_str())
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        collapse_whitespace(&joined)
    }
}

pub struct Walk<'a> {
    stack: Vec<&'a DomNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a DomNode;

    fn next(&mut self) -> Option<&'a DomNode> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// A structured capture of the current surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub title: String,

    pub root: DomNode,
}

impl Snapshot {
    pub fn new(url: &str, root: DomNode) -> Self {
        Snapshot {
            url: url.to_string(),
            title: String::new(),
            root,
        }
    }
}
