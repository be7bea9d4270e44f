//! Site discovery and page rendering.
//!
//! A site is a source directory containing pages (Markdown or HTML files), a
//! templates directory, and an optional `site.toml`. Rendering a page:
//!
//! 1. splits the page's own front matter off and exposes it as `page`
//!    (plus `page.path`, the page path relative to the source root)
//! 2. exposes the `[site]` table of `site.toml` as `site`
//! 3. renders the body, including every template block, in a fresh pass
//! 4. converts the result from Markdown for `.md`/`.markdown` pages
//!
//! Building renders every page concurrently, each on a blocking task with its
//! own render pass, and writes the results under the destination directory.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tera::Context as TeraContext;
use walkdir::WalkDir;

use crate::config::SiteConfig;
use crate::core::AppError;
use crate::markdown::{frontmatter, is_markdown_file};
use crate::templating::{DependencyGraph, Renderer};

/// A site ready to render.
pub struct Site {
    root: PathBuf,
    config: SiteConfig,
    site_value: Value,
    renderer: Renderer,
    graph: Arc<DependencyGraph>,
}

/// Outcome of a [`Site::build`].
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Output files written, relative to the destination.
    pub written: Vec<PathBuf>,
    /// Pages that failed, with their error.
    pub failures: Vec<(PathBuf, anyhow::Error)>,
}

impl BuildReport {
    pub fn total(&self) -> usize {
        self.written.len() + self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Site {
    /// Open the site at `root`, reading `site.toml` if present.
    pub async fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(AppError::SourceNotFound {
                path: root.to_path_buf(),
            }
            .into());
        }
        let config = SiteConfig::load(root).await?;
        Self::with_config(root, config)
    }

    /// Create a site from an already loaded configuration.
    pub fn with_config(root: &Path, config: SiteConfig) -> Result<Self> {
        let graph = Arc::new(DependencyGraph::new());
        let renderer = Renderer::from_config(root, &config.render).with_tracker(graph.clone());
        let site_value = config.site_value()?;

        Ok(Self {
            root: root.to_path_buf(),
            config,
            site_value,
            renderer,
            graph,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Dependencies registered by every page rendered so far.
    pub fn dependencies(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Find page files, relative to the source root, in path order.
    ///
    /// Directories starting with `_` or `.` are skipped, as is `exclude`
    /// (typically the build destination) when it lies inside the source.
    pub fn discover_pages(&self, exclude: Option<&Path>) -> Vec<PathBuf> {
        let exclude = exclude.map(|dir| absolutize(dir));
        let mut pages: Vec<PathBuf> = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                if entry.file_type().is_dir() && (name.starts_with('_') || name.starts_with('.')) {
                    return false;
                }
                !exclude.as_ref().is_some_and(|dir| absolutize(entry.path()) == *dir)
            })
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && self.config.render.is_page(entry.path()))
            .filter_map(|entry| entry.path().strip_prefix(&self.root).ok().map(Path::to_path_buf))
            .collect();
        pages.sort();
        pages
    }

    /// Render the page at `page`, relative to the source root.
    pub fn render_page(&self, page: &Path) -> Result<String> {
        let path = self.root.join(page);
        let text = std::fs::read_to_string(&path).map_err(|err| AppError::PageRead {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        self.render_page_source(page, &text)
    }

    /// Render `text` as the contents of `page`.
    pub fn render_page_source(&self, page: &Path, text: &str) -> Result<String> {
        let parsed = frontmatter::split(text)
            .with_context(|| format!("Failed to parse front matter of {}", page.display()))?;

        let mut page_value = parsed.data;
        page_value.insert("path".to_string(), Value::String(page.to_string_lossy().replace('\\', "/")));

        let mut scope = TeraContext::new();
        scope.insert("page", &Value::Object(page_value));
        scope.insert("site", &self.site_value);

        let output = self.renderer.render_page(&parsed.content, Some(page), &scope)?;

        if is_markdown_file(page) {
            Ok(self.renderer.markdown().convert(&output))
        } else {
            Ok(output)
        }
    }

    /// Render every page and write the results under `dest`.
    ///
    /// A failing page does not stop the build; failures are collected in the
    /// report. At most `jobs` pages render at once.
    pub async fn build(self: &Arc<Self>, dest: &Path, jobs: usize) -> Result<BuildReport> {
        let pages = self.discover_pages(Some(dest));
        tracing::info!("Building {} page(s) from {}", pages.len(), self.root.display());

        let concurrency = jobs.max(1);
        let results: Vec<(PathBuf, Result<PathBuf>)> = stream::iter(pages)
            .map(|page| {
                let site = Arc::clone(self);
                let dest = dest.to_path_buf();
                async move {
                    let task_page = page.clone();
                    let result = tokio::task::spawn_blocking(move || site.build_page(&task_page, &dest))
                        .await
                        .map_err(anyhow::Error::from)
                        .and_then(|r| r);
                    (page, result)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut report = BuildReport::default();
        for (page, result) in results {
            match result {
                Ok(written) => report.written.push(written),
                Err(err) => {
                    tracing::debug!("Failed to render {}: {:#}", page.display(), err);
                    report.failures.push((page, err));
                }
            }
        }
        report.written.sort();
        report.failures.sort_by(|a, b| a.0.cmp(&b.0));

        tracing::info!(
            "Built {} of {} page(s) into {}",
            report.written.len(),
            report.total(),
            dest.display()
        );
        Ok(report)
    }

    fn build_page(&self, page: &Path, dest: &Path) -> Result<PathBuf> {
        let output = self.render_page(page)?;
        let relative = output_path(page);
        let target = dest.join(&relative);

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        std::fs::write(&target, output).map_err(|err| AppError::PageWrite {
            path: target.clone(),
            reason: err.to_string(),
        })?;

        tracing::debug!("Wrote {}", target.display());
        Ok(relative)
    }
}

/// Output path for a page: Markdown pages become `.html`.
pub fn output_path(page: &Path) -> PathBuf {
    if is_markdown_file(page) {
        page.with_extension("html")
    } else {
        page.to_path_buf()
    }
}

fn absolutize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Default number of pages rendered at once.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism().map(std::num::NonZero::get).unwrap_or(4) * 2
}
