//! Error handling for nestplate
//!
//! Library code returns strongly-typed errors: [`RenderError`] from the
//! templating layer and [`AppError`] from site and build operations. The CLI
//! converts whatever reaches it into an [`ErrorContext`] with
//! [`user_friendly_error`], which adds a suggestion and details before the
//! error is printed.
//!
//! ```rust,no_run
//! use nestplate::core::{AppError, user_friendly_error};
//!
//! let error = anyhow::Error::from(AppError::BuildFailed { failed: 2, total: 5 });
//! user_friendly_error(error).display();
//! ```
//!
//! [`RenderError`]: crate::templating::RenderError

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::constants::SITE_CONFIG_FILE;
use crate::templating::RenderError;

/// Errors raised by site and build operations.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// The source directory does not exist
    #[error("Source directory not found: {}", .path.display())]
    SourceNotFound {
        path: PathBuf,
    },

    /// `site.toml` is not valid
    #[error("Invalid site config {file}: {reason}")]
    ConfigParse {
        file: String,
        reason: String,
    },

    #[error("Failed to read page {}: {reason}", .path.display())]
    PageRead {
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to write {}: {reason}", .path.display())]
    PageWrite {
        path: PathBuf,
        reason: String,
    },

    /// One or more pages failed during `build`
    #[error("{failed} of {total} page(s) failed to render")]
    BuildFailed {
        failed: usize,
        total: usize,
    },

    /// A block could not be rendered; `message` is the full report
    #[error("{message}")]
    Render {
        message: String,
    },

    #[error("{message}")]
    Other {
        message: String,
    },
}

/// An error with optional suggestion and details for display in the CLI.
#[derive(Debug)]
pub struct ErrorContext {
    pub error: AppError,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: AppError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add an actionable suggestion, shown in green.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add background on the failure, shown in yellow.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with suggestions.
///
/// Recognizes [`AppError`], [`RenderError`] anywhere in the chain,
/// [`toml::de::Error`] and [`std::io::Error`]. Anything else is reported with
/// its full cause chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(app_error) = error.downcast_ref::<AppError>() {
        return create_error_context(app_error.clone());
    }

    if let Some(render_error) = error.chain().find_map(|cause| cause.downcast_ref::<RenderError>()) {
        return render_error_context(render_error);
    }

    if let Some(toml_error) = error.chain().find_map(|cause| cause.downcast_ref::<toml::de::Error>()) {
        return ErrorContext::new(AppError::ConfigParse {
            file: SITE_CONFIG_FILE.to_string(),
            reason: toml_error.to_string(),
        })
        .with_suggestion(format!(
            "Check the TOML syntax in {SITE_CONFIG_FILE}. Verify quotes, brackets, and value types"
        ))
        .with_details("Settings live under [render] and [render.compress]; free-form data goes under [site]");
    }

    let permission_denied = error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<std::io::Error>())
        .any(|io_error| io_error.kind() == std::io::ErrorKind::PermissionDenied);
    if permission_denied {
        return ErrorContext::new(AppError::Other {
            message: message_with_causes(&error),
        })
        .with_suggestion("Check file ownership and permissions of the source and destination");
    }

    ErrorContext::new(AppError::Other {
        message: message_with_causes(&error),
    })
}

fn render_error_context(error: &RenderError) -> ErrorContext {
    let context = ErrorContext::new(AppError::Render {
        message: error.format_with_context(),
    });

    match error {
        RenderError::TemplateNotFound { .. } => context.with_suggestion(
            "Template names are relative to the templates directory ([render] templates_dir in site.toml)",
        ),
        RenderError::Engine { .. } => context
            .with_suggestion(
                "Check that every variable used in the block exists. Use `| default(value=...)` for optional values",
            )
            .with_details("Inside a template file the block's data is available as `template`"),
        RenderError::DirectiveSyntax { .. } | RenderError::FrontMatterParse { .. } => context,
    }
}

fn create_error_context(error: AppError) -> ErrorContext {
    let (suggestion, details) = match &error {
        AppError::SourceNotFound { .. } => {
            (Some("Pass the site directory with --source, or run from inside it".to_string()), None)
        }
        AppError::ConfigParse { .. } => {
            (Some(format!("Fix the syntax in {SITE_CONFIG_FILE} or remove it to use defaults")), None)
        }
        AppError::PageWrite { .. } => (Some("Check that the destination directory is writable".to_string()), None),
        AppError::BuildFailed { .. } => (
            Some("Fix the errors reported above and run the build again".to_string()),
            Some("Pages that rendered successfully were still written"),
        ),
        AppError::PageRead { .. } | AppError::Render { .. } | AppError::Other { .. } => (None, None),
    };

    let mut context = ErrorContext::new(error);
    if let Some(suggestion) = suggestion {
        context = context.with_suggestion(suggestion);
    }
    if let Some(details) = details {
        context = context.with_details(details);
    }
    context
}

/// The error message followed by its numbered causes.
pub fn message_with_causes(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }
    message
}
