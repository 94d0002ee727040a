use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::scenario::parser::scenario_names;

pub const FEATURE_EXTENSION: &str = "feature";

#[derive(Debug, Error)]
#[error("cannot read {path}: {source}")]
pub struct DiscoveryError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// A scenario and the feature file that declares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureScenario {
    pub file: PathBuf,
    pub name: String,
    pub text: String,
}

/// Every scenario in a `.feature` file, or in the `.feature` files of a
/// directory. Files are visited in name order, scenarios in source order.
pub fn discover_scenarios(path: impl AsRef<Path>) -> Result<Vec<FeatureScenario>, DiscoveryError> {
    let path = path.as_ref();
    let io = |source: std::io::Error| DiscoveryError {
        path: path.to_path_buf(),
        source,
    };

    let files = if fs::metadata(path).map_err(io)?.is_dir() {
        let mut files = Vec::new();
        for entry in fs::read_dir(path).map_err(io)? {
            let file = entry.map_err(io)?.path();
            if file.extension().is_some_and(|e| e == FEATURE_EXTENSION) {
                files.push(file);
            }
        }
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut found = Vec::new();
    for file in files {
        let text = fs::read_to_string(&file).map_err(|source| DiscoveryError {
            path: file.clone(),
            source,
        })?;
        for name in scenario_names(&text) {
            found.push(FeatureScenario {
                file: file.clone(),
                name,
                text: text.clone(),
            });
        }
    }

    Ok(found)
}
