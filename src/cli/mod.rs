//! Command-line interface for nestplate.
//!
//! # Commands
//!
//! - `render <PAGE>` - render one page to stdout
//! - `build` - render every page of a site into a destination directory
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug output
//! - `--quiet` - Suppress all output except errors
//!
//! `RUST_LOG` takes precedence over both flags when set.
//!
//! ```bash
//! nestplate render index.md --source site
//! nestplate --verbose build --source site --dest public --deps
//! ```

pub mod build;
pub mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Top-level command-line interface.
#[derive(Parser)]
#[command(
    name = "nestplate",
    about = "Render pages with nested, scoped template blocks",
    version,
    long_about = "nestplate renders Markdown and HTML pages containing {% template %} blocks, \
                  wrapping each block's content in a template file with its own scoped data."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a single page to stdout
    Render(render::RenderCommand),

    /// Render every page of a site
    Build(build::BuildCommand),
}

impl Cli {
    /// Install logging and run the selected command.
    pub async fn execute(self) -> Result<()> {
        init_logging(self.log_level());

        match self.command {
            Commands::Render(cmd) => cmd.execute().await,
            Commands::Build(cmd) => cmd.execute(self.quiet).await,
        }
    }

    /// Log level implied by the global flags; `None` disables logging.
    #[must_use]
    pub fn log_level(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            None
        } else {
            Some("warn")
        }
    }
}

fn init_logging(level: Option<&str>) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if let Some(level) = level {
        EnvFilter::new(level)
    } else {
        return;
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_flags() {
        let cli = Cli::parse_from(["nestplate", "render", "index.md"]);
        assert_eq!(cli.log_level(), Some("warn"));

        let cli = Cli::parse_from(["nestplate", "--verbose", "render", "index.md"]);
        assert_eq!(cli.log_level(), Some("debug"));

        let cli = Cli::parse_from(["nestplate", "build", "-q"]);
        assert_eq!(cli.log_level(), None);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["nestplate", "-v", "-q", "build"]).is_err());
    }

    #[test]
    fn test_build_arguments() {
        let cli = Cli::parse_from(["nestplate", "build", "--source", "site", "--dest", "out", "--jobs", "2", "--deps"]);
        let Commands::Build(cmd) = cli.command else {
            panic!("expected build command");
        };
        assert_eq!(cmd.source, std::path::PathBuf::from("site"));
        assert_eq!(cmd.dest, Some(std::path::PathBuf::from("out")));
        assert_eq!(cmd.jobs, Some(2));
        assert!(cmd.deps);
    }
}
