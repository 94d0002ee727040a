use serde::Serialize;
use tracing::debug;

use crate::screen::locator::{Locator, LocatorError};
use crate::screen::screen_model::{DomNode, Snapshot};
use crate::state::normalize::text_digest;
use crate::state::state_model::StateFingerprint;

/// Tags whose composition defines a surface state.
pub const SIGNED_TAGS: [&str; 4] = ["input", "button", "select", "textarea"];

/// Canonical description of one interactive element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementSignature {
    pub id: Option<String>,
    pub name: Option<String>,
    pub tag: String,
    #[serde(rename = "type")]
    pub input_type: Option<String>,
    pub value: String,
}

impl ElementSignature {
    fn of(node: &DomNode) -> Self {
        ElementSignature {
            id: node.attr("id").map(str::to_string),
            name: node.attr("name").map(str::to_string),
            tag: node.tag.to_lowercase(),
            input_type: node.attr("type").map(str::to_string),
            value: node.attr("value").unwrap_or_default().to_string(),
        }
    }

    fn sort_key(&self) -> (&str, &str, &str, &str, &str) {
        (
            self.tag.as_str(),
            self.id.as_deref().unwrap_or(""),
            self.name.as_deref().unwrap_or(""),
            self.input_type.as_deref().unwrap_or(""),
            self.value.as_str(),
        )
    }
}

/// Computes state fingerprints from content snapshots.
///
/// Only elements inside the configured stable regions are signed, so
/// dynamic content elsewhere on the surface does not change the state
/// identity. When none of the regions exist on the surface, every
/// interactive element is signed instead.
#[derive(Debug, Clone, Default)]
pub struct FingerprintEngine {
    regions: Vec<Locator>,
}

impl FingerprintEngine {
    pub fn new(regions: Vec<Locator>) -> Self {
        FingerprintEngine { regions }
    }

    /// Build from locator strings, e.g. `["div#nav-belt", "div#leftNav"]`.
    pub fn from_locators<S: AsRef<str>>(locators: &[S]) -> Result<Self, LocatorError> {
        let regions = locators
            .iter()
            .map(|l| Locator::parse(l.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FingerprintEngine { regions })
    }

    pub fn regions(&self) -> &[Locator] {
        &self.regions
    }

    pub fn fingerprint(&self, snapshot: &Snapshot) -> StateFingerprint {
        let signatures = self.signatures(snapshot);
        // Serializing a Vec of plain structs cannot fail.
        let canonical = serde_json::to_string(&signatures).unwrap_or_default();
        StateFingerprint::new(text_digest(&canonical))
    }

    /// Fingerprint for a surface whose snapshot could not be taken.
    pub fn fingerprint_failure(&self, description: &str) -> StateFingerprint {
        StateFingerprint::new(text_digest(&format!("error_getting_content:{}", description)))
    }

    /// Fingerprint for surfaces only described by their element summary text.
    pub fn fingerprint_summary(&self, summary: &str) -> StateFingerprint {
        StateFingerprint::new(text_digest(summary))
    }

    /// Sorted signatures of the elements that define the state.
    pub fn signatures(&self, snapshot: &Snapshot) -> Vec<ElementSignature> {
        let regions: Vec<&DomNode> = self
            .regions
            .iter()
            .filter_map(|locator| {
                let found = locator.select_first(&snapshot.root);
                if found.is_none() {
                    debug!(region = %locator, "Stable region not present");
                }
                found
            })
            .collect();

        let mut signatures: Vec<ElementSignature> = if regions.is_empty() {
            if !self.regions.is_empty() {
                debug!("No stable region found, signing the whole surface");
            }
            signed_elements(&snapshot.root)
        } else {
            regions.into_iter().flat_map(signed_elements).collect()
        };

        signatures.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        signatures
    }
}

fn signed_elements(scope: &DomNode) -> Vec<ElementSignature> {
    scope
        .walk()
        .filter(|node| SIGNED_TAGS.iter().any(|t| node.is_tag(t)))
        .filter(|node| !node.is_hidden_input())
        .map(ElementSignature::of)
        .collect()
}
