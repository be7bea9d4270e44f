//! Build a whole site.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::constants::DEFAULT_DEST_DIR;
use crate::core::{AppError, message_with_causes};
use crate::site::{Site, default_jobs};

/// Render every page under the source directory into the destination.
///
/// A page that fails is reported and skipped; the command exits non-zero if
/// any page failed.
#[derive(Args)]
pub struct BuildCommand {
    /// Site source directory
    #[arg(short, long, default_value = ".")]
    pub source: PathBuf,

    /// Output directory [default: <source>/_site]
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// Maximum number of pages rendered at once
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Print the template dependencies of every page after building
    #[arg(long)]
    pub deps: bool,
}

impl BuildCommand {
    pub async fn execute(self, quiet: bool) -> Result<()> {
        let site = Arc::new(Site::open(&self.source).await?);
        let dest = self.dest.clone().unwrap_or_else(|| site.root().join(DEFAULT_DEST_DIR));
        let jobs = self.jobs.unwrap_or_else(default_jobs);

        let report = site.build(&dest, jobs).await?;

        for (page, err) in &report.failures {
            eprintln!("{} {}", "✗".red(), page.display());
            eprintln!("{}", indent(&failure_message(err)));
        }

        if !quiet {
            println!(
                "{} Rendered {} page(s) into {}",
                "✓".green(),
                report.written.len(),
                dest.display()
            );
            if self.deps {
                let tree = site.dependencies().to_tree_string();
                if tree.is_empty() {
                    println!("No template dependencies");
                } else {
                    print!("{tree}");
                }
            }
        }

        if report.is_success() {
            Ok(())
        } else {
            Err(AppError::BuildFailed {
                failed: report.failures.len(),
                total: report.total(),
            }
            .into())
        }
    }
}

fn failure_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<crate::templating::RenderError>() {
        Some(render) => render.format_with_context(),
        None => message_with_causes(err),
    }
}

fn indent(text: &str) -> String {
    text.trim_end().lines().map(|line| format!("    {line}")).collect::<Vec<_>>().join("\n")
}
