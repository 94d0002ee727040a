use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel state that precedes the first observed surface.
pub const START_STATE: &str = "START";

/// Opaque identity of an observed surface state.
///
/// Two surfaces with the same fingerprint are the same state for graph
/// purposes, even if their full content differs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateFingerprint(String);

impl StateFingerprint {
    pub fn new(digest: impl Into<String>) -> Self {
        StateFingerprint(digest.into())
    }

    pub fn start() -> Self {
        StateFingerprint(START_STATE.to_string())
    }

    pub fn is_start(&self) -> bool {
        self.0 == START_STATE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters, for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for StateFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
