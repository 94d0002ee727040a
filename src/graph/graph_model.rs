use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::agent::agent_model::Action;
use crate::state::state_model::StateFingerprint;

pub const DISCOVERED_NODE_DESCRIPTION: &str = "discovered during learning";
pub const DEFAULT_APP_NAME: &str = "default_app";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub description: String,
}

/// A learned transition: performing `action` on `from` leads to `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: StateFingerprint,
    pub to: StateFingerprint,
    pub action: Action,
}

/// Learned states and transitions for one application.
///
/// Edges keep insertion order; replay follows the first edge leaving a
/// state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    #[serde(skip)]
    pub app_name: String,

    /// Page the learned path starts from; replays load it first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_url: Option<String>,

    #[serde(default)]
    pub nodes: BTreeMap<StateFingerprint, GraphNode>,

    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl WorkflowGraph {
    pub fn new(app_name: &str) -> Self {
        WorkflowGraph {
            app_name: app_name.to_string(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn contains_edge(
        &self,
        from: &StateFingerprint,
        to: &StateFingerprint,
        action: &Action,
    ) -> bool {
        self.edges
            .iter()
            .any(|e| &e.from == from && &e.to == to && &e.action == action)
    }

    /// First edge leaving `state`.
    pub fn next_edge(&self, state: &StateFingerprint) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| &e.from == state)
    }

    /// Add an edge in memory only. Returns false for self loops and
    /// duplicates, leaving the graph untouched. Only the target state gets a
    /// node; the `START` sentinel never does.
    pub fn add_edge(&mut self, from: &StateFingerprint, to: &StateFingerprint, action: &Action) -> bool {
        if from == to || self.contains_edge(from, to, action) {
            return false;
        }

        self.nodes.entry(to.clone()).or_insert_with(|| GraphNode {
            description: DISCOVERED_NODE_DESCRIPTION.to_string(),
        });
        self.edges.push(GraphEdge {
            from: from.clone(),
            to: to.clone(),
            action: action.clone(),
        });
        true
    }

    /// Fold in nodes and edges from `other` that this graph lacks.
    pub fn merge_from(&mut self, other: &WorkflowGraph) {
        if self.start_url.is_none() {
            self.start_url = other.start_url.clone();
        }
        for (fingerprint, node) in &other.nodes {
            self.nodes
                .entry(fingerprint.clone())
                .or_insert_with(|| node.clone());
        }
        for edge in &other.edges {
            if !self.contains_edge(&edge.from, &edge.to, &edge.action) {
                self.edges.push(edge.clone());
            }
        }
    }

    /// (nodes, edges)
    pub fn counts(&self) -> (usize, usize) {
        (self.nodes.len(), self.edges.len())
    }
}

/// Filesystem-safe application name from a surface URL: host and path with
/// every other character replaced by `_`.
pub fn app_name_from_url(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let without_query = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let host_and_path = without_query.trim_end_matches('/');

    let sanitized: String = host_and_path
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let sanitized = sanitized.trim_matches('_').to_string();

    if sanitized.is_empty() {
        DEFAULT_APP_NAME.to_string()
    } else {
        sanitized
    }
}
