use std::collections::{HashMap, HashSet};
use std::time::Duration;

use workflow_learner::{
    agent::error::DriverError,
    browser::driver::AutomationDriver,
    screen::{
        locator::Locator,
        screen_model::{DomNode, Snapshot},
    },
};

/// In-memory automation surface.
///
/// Serves named surfaces, switches surface when a scripted click happens,
/// and writes filled values into the `value` attribute of the target node,
/// so fingerprints react to fills the way a real page does.
#[derive(Debug, Clone, Default)]
pub struct FakeDriver {
    surfaces: HashMap<String, Snapshot>,
    pages: HashMap<String, String>,
    clicks: HashMap<(String, String), String>,
    broken_selectors: HashSet<String>,
    current_name: String,
    current: Option<Snapshot>,
    snapshot_fails: bool,
    pub log: Vec<String>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a surface; it is served for loads of its own URL.
    pub fn with_surface(mut self, name: &str, snapshot: Snapshot) -> Self {
        self.pages.insert(snapshot.url.clone(), name.to_string());
        self.surfaces.insert(name.to_string(), snapshot);
        self
    }

    /// Clicking `selector` on surface `from` shows surface `to`.
    pub fn with_click(mut self, from: &str, selector: &str, to: &str) -> Self {
        self.clicks
            .insert((from.to_string(), selector.to_string()), to.to_string());
        self
    }

    /// Actions on `selector` fail even when the element exists.
    pub fn with_broken_selector(mut self, selector: &str) -> Self {
        self.broken_selectors.insert(selector.to_string());
        self
    }

    pub fn with_failing_snapshots(mut self) -> Self {
        self.snapshot_fails = true;
        self
    }

    pub fn current_surface(&self) -> &str {
        &self.current_name
    }

    fn current_mut(&mut self) -> Result<&mut Snapshot, DriverError> {
        self.current
            .as_mut()
            .ok_or_else(|| DriverError::command("snapshot", "no page loaded"))
    }

    fn check_selector(&self, command: &str, selector: &str) -> Result<(), DriverError> {
        if self.broken_selectors.contains(selector) {
            return Err(DriverError::command(
                command,
                format!("element {} is not interactable", selector),
            ));
        }
        let found = self
            .current
            .as_ref()
            .is_some_and(|s| s.root.walk().any(|n| selector_matches(selector, n)));
        if found {
            Ok(())
        } else {
            Err(DriverError::command(
                command,
                format!("timeout waiting for selector {}", selector),
            ))
        }
    }
}

/// Selector semantics shared by click and fill: locators plus `text=`.
pub fn selector_matches(selector: &str, node: &DomNode) -> bool {
    if let Some(text) = selector.strip_prefix("text=") {
        return node.is_interactive() && node.visible_text() == text;
    }
    Locator::parse(selector).is_ok_and(|l| l.matches(node))
}

fn find_mut<'a>(node: &'a mut DomNode, selector: &str) -> Option<&'a mut DomNode> {
    if selector_matches(selector, node) {
        return Some(node);
    }
    for child in node.children.iter_mut() {
        if let Some(found) = find_mut(child, selector) {
            return Some(found);
        }
    }
    None
}

impl AutomationDriver for FakeDriver {
    fn load_surface(&mut self, url: &str, _timeout: Duration) -> Result<(), DriverError> {
        self.log.push(format!("load {}", url));
        let name = self
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| DriverError::command("navigate", "net::ERR_NAME_NOT_RESOLVED"))?;
        self.current = self.surfaces.get(&name).cloned();
        self.current_name = name;
        Ok(())
    }

    fn content_snapshot(&mut self) -> Result<Snapshot, DriverError> {
        if self.snapshot_fails {
            return Err(DriverError::command("snapshot", "page crashed"));
        }
        Ok(self.current_mut()?.clone())
    }

    fn click(&mut self, selector: &str, _timeout: Duration) -> Result<(), DriverError> {
        self.log.push(format!("click {}", selector));
        self.check_selector("click", selector)?;

        let key = (self.current_name.clone(), selector.to_string());
        if let Some(next) = self.clicks.get(&key).cloned() {
            self.current = self.surfaces.get(&next).cloned();
            self.current_name = next;
        }
        Ok(())
    }

    fn fill(&mut self, selector: &str, value: &str, _timeout: Duration) -> Result<(), DriverError> {
        self.log.push(format!("fill {}={}", selector, value));
        self.check_selector("fill", selector)?;

        let snapshot = self.current_mut()?;
        if let Some(node) = find_mut(&mut snapshot.root, selector) {
            node.attrs.insert("value".to_string(), value.to_string());
        }
        Ok(())
    }

    fn wait_for_visible(&mut self, target: &str, _timeout: Duration) -> Result<(), DriverError> {
        self.log.push(format!("wait {}", target));
        let visible = self.current.as_ref().is_some_and(|s| {
            s.root
                .visible_text()
                .to_lowercase()
                .contains(&target.to_lowercase())
        });
        if visible {
            Ok(())
        } else {
            Err(DriverError::command(
                "wait_visible",
                format!("'{}' not visible after timeout", target),
            ))
        }
    }

    fn current_url(&mut self) -> Result<String, DriverError> {
        Ok(self
            .current
            .as_ref()
            .map(|s| s.url.clone())
            .unwrap_or_default())
    }
}
