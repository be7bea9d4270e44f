//! Render a single page to stdout.

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};

use crate::site::Site;

/// Render one page and print the result.
///
/// `PAGE` may be given relative to the source directory or as a path that
/// lies inside it.
#[derive(Args)]
pub struct RenderCommand {
    /// Page to render
    #[arg(value_name = "PAGE")]
    pub page: PathBuf,

    /// Site source directory
    #[arg(short, long, default_value = ".")]
    pub source: PathBuf,
}

impl RenderCommand {
    pub async fn execute(self) -> Result<()> {
        let site = Site::open(&self.source).await?;
        let page = page_relative_to(&self.page, site.root());

        tracing::debug!("Rendering {} from {}", page.display(), site.root().display());
        let output = tokio::task::spawn_blocking(move || site.render_page(&page)).await??;

        print!("{output}");
        if !output.ends_with('\n') {
            println!();
        }
        Ok(())
    }
}

/// `page` relative to `root` when it points inside it, otherwise unchanged.
fn page_relative_to(page: &Path, root: &Path) -> PathBuf {
    if let Ok(relative) = page.strip_prefix(root) {
        return relative.to_path_buf();
    }
    match (std::fs::canonicalize(page), std::fs::canonicalize(root)) {
        (Ok(page_abs), Ok(root_abs)) => page_abs
            .strip_prefix(&root_abs)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| page.to_path_buf()),
        _ => page.to_path_buf(),
    }
}
