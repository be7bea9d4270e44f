//! Per-pass cache of loaded templates.
//!
//! A template used several times on one page (or nested inside itself under
//! different attributes) is read and parsed once per render pass. The cache
//! is keyed by template name as written after name resolution and is never
//! invalidated within a pass; a new pass starts with an empty cache, so file
//! changes are always picked up by the next page render.

use std::collections::HashMap;
use std::sync::Arc;

use super::loader::TemplateHandle;

/// Cache of parsed templates for one render pass.
///
/// Handles are reference-counted so a block can keep rendering its template
/// while nested blocks load more templates into the same cache.
#[derive(Debug, Default)]
pub struct TemplateCache {
    /// Map from template name to parsed handle
    cache: HashMap<String, Arc<TemplateHandle>>,
    /// Cache statistics
    hits: usize,
    misses: usize,
}

impl TemplateCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached handle if available, counting the hit or miss
    pub fn get(&mut self, name: &str) -> Option<Arc<TemplateHandle>> {
        if let Some(handle) = self.cache.get(name) {
            self.hits += 1;
            Some(Arc::clone(handle))
        } else {
            self.misses += 1;
            None
        }
    }

    /// Insert a freshly parsed handle
    pub fn insert(&mut self, name: String, handle: Arc<TemplateHandle>) {
        self.cache.insert(name, handle);
    }

    /// Number of distinct templates cached
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Clear all cached handles and statistics
    pub fn clear(&mut self) {
        self.cache.clear();
        self.hits = 0;
        self.misses = 0;
    }

    /// Get cache statistics as `(hits, misses)`
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }

    /// Calculate hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}
