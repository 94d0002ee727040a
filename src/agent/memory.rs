use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::graph::store::StoreError;

/// Selectors that resolved successfully, keyed by page URL and target name.
///
/// Backed by a JSON file when opened from a path; every `remember` rewrites
/// the file.
#[derive(Debug, Default)]
pub struct SelectorMemory {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<String, String>>,
}

impl SelectorMemory {
    /// Open the memory file at `path`. A missing or unreadable file starts
    /// empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Selector memory is corrupt, starting empty");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };

        SelectorMemory {
            path: Some(path),
            entries: Mutex::new(entries),
        }
    }

    /// Memory that lives only as long as the value.
    pub fn ephemeral() -> Self {
        SelectorMemory::default()
    }

    fn key(url: &str, target_name: &str) -> String {
        format!("{}::{}", url, target_name.trim().to_lowercase())
    }

    pub fn recall(&self, url: &str, target_name: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries.get(&Self::key(url, target_name)).cloned()
    }

    pub fn remember(&self, url: &str, target_name: &str, selector: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        let key = Self::key(url, target_name);

        if entries.get(&key).map(String::as_str) == Some(selector) {
            return Ok(());
        }

        debug!(%key, selector, "Remembering selector");
        entries.insert(key, selector.to_string());

        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(&*entries)
            .map_err(|e| StoreError::Serialize { source: e })?;
        fs::write(path, json).map_err(|e| StoreError::io(path, e))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
