//! Template lookup, parsing and dependency registration.
//!
//! Templates live in a single directory under the site source root
//! (`_templates/` unless configured otherwise) and are referenced by their
//! path relative to it. Where the text comes from is abstracted behind
//! [`TemplateSource`] so tests and embedders can serve templates from memory.
//!
//! A [`TemplateLoader`] belongs to one render pass. Each [`load`] call:
//!
//! 1. registers `page -> template file` with the dependency tracker
//! 2. returns the cached [`TemplateHandle`] if the name was loaded before
//! 3. otherwise reads the file, splits off its front matter, hands the body
//!    to the pass to compile, and caches the result
//!
//! [`load`]: TemplateLoader::load

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use strsim::levenshtein;
use walkdir::WalkDir;

use super::cache::TemplateCache;
use super::deps::DependencyTracker;
use super::directive::Document;
use super::error::{ErrorLocation, RenderError};
use crate::constants::{MAX_NAME_SUGGESTIONS, SIMILARITY_THRESHOLD_PERCENT};
use crate::markdown::{Metadata, frontmatter};

/// Where template text comes from.
pub trait TemplateSource: Send + Sync {
    /// Path a template name maps to, used for dependencies and errors.
    fn resolve(&self, name: &str) -> PathBuf;

    /// Read the template's full text.
    fn read(&self, name: &str) -> io::Result<String>;

    /// Names of all available templates, for suggestions.
    fn list(&self) -> Vec<String>;
}

/// Templates read from a directory on disk.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    root: PathBuf,
}

impl FileSystemSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateSource for FileSystemSource {
    fn resolve(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn read(&self, name: &str) -> io::Result<String> {
        std::fs::read_to_string(self.resolve(name))
    }

    fn list(&self) -> Vec<String> {
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.root)
                    .ok()
                    .map(|rel| rel.to_string_lossy().replace('\\', "/"))
            })
            .collect()
    }
}

/// Templates held in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    templates: BTreeMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template, builder style.
    pub fn with(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.templates.insert(name.into(), text.into());
    }
}

impl TemplateSource for MemorySource {
    fn resolve(&self, name: &str) -> PathBuf {
        Path::new(crate::constants::DEFAULT_TEMPLATES_DIR).join(name)
    }

    fn read(&self, name: &str) -> io::Result<String> {
        self.templates.get(name).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no in-memory template named '{name}'"))
        })
    }

    fn list(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }
}

/// A loaded template: its own front matter and its parsed body.
#[derive(Debug)]
pub struct TemplateHandle {
    pub name: String,
    pub path: PathBuf,
    /// Front matter of the template file; the lowest-priority metadata layer.
    pub data: Metadata,
    pub document: Arc<Document>,
}

/// Loads templates for one render pass.
pub struct TemplateLoader {
    source: Arc<dyn TemplateSource>,
    tracker: Arc<dyn DependencyTracker>,
    page: Option<PathBuf>,
    cache: TemplateCache,
}

impl TemplateLoader {
    /// Create a loader that registers dependencies for `page`.
    pub fn new(source: Arc<dyn TemplateSource>, tracker: Arc<dyn DependencyTracker>, page: Option<PathBuf>) -> Self {
        Self {
            source,
            tracker,
            page,
            cache: TemplateCache::new(),
        }
    }

    /// Load `name`, compiling its body with `compile(body, name)` on first use.
    ///
    /// # Errors
    ///
    /// - [`RenderError::TemplateNotFound`] if the source cannot read it
    /// - [`RenderError::FrontMatterParse`] for malformed front matter
    /// - any error returned by `compile`
    pub fn load<F>(&mut self, name: &str, compile: F) -> Result<Arc<TemplateHandle>, RenderError>
    where
        F: FnOnce(&str, &str) -> Result<Arc<Document>, RenderError>,
    {
        let path = self.source.resolve(name);
        if let Some(page) = &self.page {
            self.tracker.add_dependency(page, &path);
        }

        if let Some(handle) = self.cache.get(name) {
            tracing::trace!("Template cache hit: {}", name);
            return Ok(handle);
        }

        let text = self.source.read(name).map_err(|source| RenderError::TemplateNotFound {
            name: name.to_string(),
            path: path.clone(),
            suggestions: self.suggest(name),
            source,
            location: Box::new(ErrorLocation::page(self.page.clone())),
        })?;

        let parsed = frontmatter::split(&text).map_err(|source| RenderError::FrontMatterParse {
            origin: name.to_string(),
            source,
            location: Box::new(ErrorLocation::page(self.page.clone())),
        })?;
        let document = compile(&parsed.content, name)?;

        tracing::debug!(
            "Loaded template '{}' from {} ({} front matter key(s))",
            name,
            path.display(),
            parsed.data.len()
        );

        let handle = Arc::new(TemplateHandle {
            name: name.to_string(),
            path,
            data: parsed.data,
            document,
        });
        self.cache.insert(name.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Closest available template names to `name`.
    fn suggest(&self, name: &str) -> Vec<String> {
        let mut scored: Vec<_> = self
            .source
            .list()
            .into_iter()
            .map(|candidate| {
                let distance = levenshtein(name, &candidate);
                (candidate, distance)
            })
            .collect();

        scored.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        scored
            .into_iter()
            .filter(|(_, dist)| *dist <= name.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
            .take(MAX_NAME_SUGGESTIONS)
            .map(|(candidate, _)| candidate)
            .collect()
    }

    /// Cache statistics as `(hits, misses)`.
    pub fn stats(&self) -> (usize, usize) {
        self.cache.stats()
    }

    pub fn hit_rate(&self) -> f64 {
        self.cache.hit_rate()
    }
}
