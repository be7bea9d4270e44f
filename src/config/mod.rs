//! Site configuration.
//!
//! A site is configured by an optional `site.toml` at its source root. Every
//! setting has a default, so a site without the file renders with the
//! built-in behaviour.
//!
//! ```toml
//! [render]
//! templates_dir = "_templates"
//! markdown = true
//! empty_content_placeholder = false
//! extensions = ["md", "markdown", "html"]
//!
//! [render.compress]
//! enabled = true
//! remove_comments = true
//!
//! [site]
//! title = "My site"
//! ```
//!
//! The `[site]` table is free-form and is exposed to pages and templates as
//! the `site` variable.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::constants::{DEFAULT_TEMPLATES_DIR, SITE_CONFIG_FILE};

/// Contents of `site.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Rendering settings.
    #[serde(default)]
    pub render: RenderConfig,

    /// Free-form data exposed as `site`.
    #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
    pub site: toml::Table,
}

/// Settings for block rendering and page discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Directory holding template files, relative to the source root.
    pub templates_dir: PathBuf,

    /// Convert block content from Markdown unless the block says `parse: html`.
    pub markdown: bool,

    /// Render empty block content as `<!-- <template name> -->`.
    pub empty_content_placeholder: bool,

    /// Page file extensions processed by `build`.
    pub extensions: Vec<String>,

    pub compress: CompressConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from(DEFAULT_TEMPLATES_DIR),
            markdown: true,
            empty_content_placeholder: false,
            extensions: vec!["md".to_string(), "markdown".to_string(), "html".to_string()],
            compress: CompressConfig::default(),
        }
    }
}

impl RenderConfig {
    /// Whether `path` has one of the configured page extensions.
    pub fn is_page(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

/// Output compaction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressConfig {
    pub enabled: bool,
    pub remove_comments: bool,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            remove_comments: true,
        }
    }
}

impl SiteConfig {
    /// Load `site.toml` from `source_root`, or defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(source_root: &Path) -> Result<Self> {
        let path = source_root.join(SITE_CONFIG_FILE);
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No {} in {}, using defaults", SITE_CONFIG_FILE, source_root.display());
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read site config from {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse site config from {}", path.display()))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// The `[site]` table as a template value.
    pub fn site_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(&self.site).context("Failed to convert [site] table")
    }
}
