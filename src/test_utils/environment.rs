//! Temporary site fixture.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use crate::constants::{DEFAULT_DEST_DIR, DEFAULT_TEMPLATES_DIR, SITE_CONFIG_FILE};
use crate::site::Site;

/// A site source directory inside a [`TempDir`], removed on drop.
pub struct TestSite {
    pub temp_dir: TempDir,
    pub source_dir: PathBuf,
}

impl TestSite {
    /// Create an empty site with a templates directory.
    pub fn new() -> Result<Self> {
        super::init_test_logging(None);

        let temp_dir = TempDir::new()?;
        let source_dir = temp_dir.path().join("site");
        fs::create_dir_all(source_dir.join(DEFAULT_TEMPLATES_DIR))?;

        Ok(Self {
            temp_dir,
            source_dir,
        })
    }

    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_dir
    }

    /// Default build output directory.
    #[must_use]
    pub fn dest_path(&self) -> PathBuf {
        self.source_dir.join(DEFAULT_DEST_DIR)
    }

    /// Create a file relative to the source directory.
    pub fn create_file(&self, path: impl AsRef<Path>, content: &str) -> Result<PathBuf> {
        let full_path = self.source_dir.join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full_path, content)
            .with_context(|| format!("Failed to write {}", full_path.display()))?;
        Ok(full_path)
    }

    /// Create a template file in the default templates directory.
    pub fn add_template(&self, name: &str, content: &str) -> Result<PathBuf> {
        self.create_file(Path::new(DEFAULT_TEMPLATES_DIR).join(name), content)
    }

    pub fn add_page(&self, path: &str, content: &str) -> Result<PathBuf> {
        self.create_file(path, content)
    }

    pub fn write_config(&self, content: &str) -> Result<PathBuf> {
        self.create_file(SITE_CONFIG_FILE, content)
    }

    /// Read a file relative to the source directory.
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<String> {
        let full_path = self.source_dir.join(path);
        fs::read_to_string(&full_path).with_context(|| format!("Failed to read {}", full_path.display()))
    }

    /// Read a built file relative to the default output directory.
    pub fn read_output(&self, path: impl AsRef<Path>) -> Result<String> {
        self.read_file(Path::new(DEFAULT_DEST_DIR).join(path))
    }

    pub fn file_exists(&self, path: impl AsRef<Path>) -> bool {
        self.source_dir.join(path).exists()
    }

    /// Open the site with its current `site.toml`.
    pub async fn open(&self) -> Result<Arc<Site>> {
        Ok(Arc::new(Site::open(&self.source_dir).await?))
    }
}
