use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::agent::agent_model::Action;
use crate::graph::graph_model::WorkflowGraph;
use crate::state::state_model::StateFingerprint;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Workflow graphs on disk, one `<app>_workflow.json` per application.
///
/// Learning sessions for the same application serialize their
/// load-merge-save sequence on a per-application lock; replays take the
/// same lock shared.
#[derive(Debug)]
pub struct GraphStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
    writes: AtomicUsize,
}

impl GraphStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        GraphStore {
            dir: dir.into(),
            locks: Mutex::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, app_name: &str) -> PathBuf {
        self.dir.join(format!("{}_workflow.json", app_name))
    }

    pub fn lock_for(&self, app_name: &str) -> Result<Arc<RwLock<()>>, StoreError> {
        let mut locks = self.locks.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(locks
            .entry(app_name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone())
    }

    /// Load the graph for `app_name`. Missing or corrupt files load as an
    /// empty graph.
    pub fn load(&self, app_name: &str) -> Result<WorkflowGraph, StoreError> {
        let lock = self.lock_for(app_name)?;
        let _guard = lock.read().map_err(|_| StoreError::Poisoned)?;
        Ok(self.read_graph(app_name))
    }

    /// Read without taking the application lock. Callers hold it.
    pub(crate) fn read_graph(&self, app_name: &str) -> WorkflowGraph {
        let path = self.path_for(app_name);

        let mut graph = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<WorkflowGraph>(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Workflow graph is corrupt, starting empty");
                WorkflowGraph::default()
            }),
            Err(_) => {
                debug!(path = %path.display(), "No workflow graph yet");
                WorkflowGraph::default()
            }
        };

        graph.app_name = app_name.to_string();
        graph
    }

    /// Overwrite the stored graph with `graph`.
    pub fn save(&self, graph: &WorkflowGraph) -> Result<(), StoreError> {
        let lock = self.lock_for(&graph.app_name)?;
        let _guard = lock.write().map_err(|_| StoreError::Poisoned)?;
        self.write_graph(graph)
    }

    fn write_graph(&self, graph: &WorkflowGraph) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let path = self.path_for(&graph.app_name);
        let json =
            serde_json::to_string_pretty(graph).map_err(|e| StoreError::Serialize { source: e })?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StoreError::io(&path, e))?;

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Record `from -> to` under `action` and persist it.
    ///
    /// Returns false without touching the graph or the file when the states
    /// are equal or the edge is already known. The stored graph is reloaded
    /// under the application lock first, so edges written by other sessions
    /// are kept and end up in `graph` too.
    pub fn insert_edge(
        &self,
        graph: &mut WorkflowGraph,
        from: &StateFingerprint,
        to: &StateFingerprint,
        action: &Action,
    ) -> Result<bool, StoreError> {
        if from == to || graph.contains_edge(from, to, action) {
            return Ok(false);
        }

        let lock = self.lock_for(&graph.app_name)?;
        let _guard = lock.write().map_err(|_| StoreError::Poisoned)?;

        let mut latest = self.read_graph(&graph.app_name);
        latest.merge_from(graph);

        if !latest.add_edge(from, to, action) {
            *graph = latest;
            return Ok(false);
        }

        self.write_graph(&latest)?;

        let (nodes, edges) = latest.counts();
        info!(
            app = %latest.app_name,
            from = %from.short(),
            to = %to.short(),
            action = %action,
            nodes,
            edges,
            "Recorded transition"
        );

        *graph = latest;
        Ok(true)
    }

    /// Number of graph files written by this store.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}
