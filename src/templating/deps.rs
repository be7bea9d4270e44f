//! Build dependency tracking.
//!
//! Every time a page renders a template block, the page gains a dependency on
//! the template file. Incremental builders use the graph to know which pages
//! to rebuild when a template changes. Registration happens on every block
//! evaluation, including cache hits, so the graph is complete even when a
//! template is parsed only once.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Receives `(consumer, dependency)` edges as pages render.
pub trait DependencyTracker: Send + Sync {
    /// Record that `consumer` depends on `dependency`.
    fn add_dependency(&self, consumer: &Path, dependency: &Path);
}

/// Tracker that discards every edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracker;

impl DependencyTracker for NoopTracker {
    fn add_dependency(&self, _consumer: &Path, _dependency: &Path) {}
}

/// In-memory dependency graph, safe to share between concurrent page renders.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    inner: Mutex<GraphInner>,
}

#[derive(Debug, Default, Clone)]
struct GraphInner {
    edges: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
    registrations: usize,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GraphInner> {
        // Every update is a single insert, so a poisoned graph is still whole.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Dependencies recorded for `consumer`, in path order.
    pub fn dependencies_of(&self, consumer: &Path) -> Vec<PathBuf> {
        self.lock().edges.get(consumer).map(|deps| deps.iter().cloned().collect()).unwrap_or_default()
    }

    /// Consumers that depend on `dependency`, in path order.
    pub fn consumers_of(&self, dependency: &Path) -> Vec<PathBuf> {
        self.lock()
            .edges
            .iter()
            .filter(|(_, deps)| deps.contains(dependency))
            .map(|(consumer, _)| consumer.clone())
            .collect()
    }

    /// Snapshot of the whole graph.
    pub fn edges(&self) -> BTreeMap<PathBuf, BTreeSet<PathBuf>> {
        self.lock().edges.clone()
    }

    /// Total number of `add_dependency` calls, duplicates included.
    pub fn registrations(&self) -> usize {
        self.lock().registrations
    }

    pub fn is_empty(&self) -> bool {
        self.lock().edges.is_empty()
    }

    /// Render the graph as an indented tree, one consumer per block.
    pub fn to_tree_string(&self) -> String {
        let inner = self.lock();
        let mut out = String::new();
        for (consumer, deps) in &inner.edges {
            out.push_str(&format!("{}\n", consumer.display()));
            let count = deps.len();
            for (i, dep) in deps.iter().enumerate() {
                let branch = if i + 1 == count {
                    "└── "
                } else {
                    "├── "
                };
                out.push_str(&format!("{}{}\n", branch, dep.display()));
            }
        }
        out
    }
}

impl DependencyTracker for DependencyGraph {
    fn add_dependency(&self, consumer: &Path, dependency: &Path) {
        let mut inner = self.lock();
        inner.registrations += 1;
        let added = inner.edges.entry(consumer.to_path_buf()).or_default().insert(dependency.to_path_buf());
        if added {
            tracing::debug!("Dependency: {} -> {}", consumer.display(), dependency.display());
        }
    }
}
