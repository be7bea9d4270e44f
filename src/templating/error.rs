//! Render errors with page and inclusion-chain context.
//!
//! Every failure while rendering a page is fatal for that page. The variants
//! below carry enough context (page path, the chain of open template blocks,
//! the offending markup) to produce an actionable report via
//! [`RenderError::format_with_context`].

use std::path::{Path, PathBuf};

use crate::markdown::FrontMatterError;

/// Where in a page render an error happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLocation {
    /// Page being rendered, if known
    pub page: Option<PathBuf>,
    /// Template names of the open blocks, outermost first
    pub chain: Vec<String>,
    /// 1-based line of the offending markup within its source, if known
    pub line_number: Option<usize>,
}

impl ErrorLocation {
    /// Location with only a page.
    pub fn page(page: Option<PathBuf>) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }

    /// Attach a line number.
    pub fn with_line(mut self, line: usize) -> Self {
        self.line_number = Some(line);
        self
    }
}

/// Errors raised while rendering template blocks.
#[derive(Debug)]
pub enum RenderError {
    /// Malformed `{% template %}` markup, unbalanced tags, or an invalid name.
    DirectiveSyntax {
        origin: String,
        markup: String,
        reason: String,
        location: Box<ErrorLocation>,
    },

    /// The referenced template file is missing or unreadable.
    TemplateNotFound {
        name: String,
        path: PathBuf,
        suggestions: Vec<String>,
        source: std::io::Error,
        location: Box<ErrorLocation>,
    },

    /// A front matter block could not be parsed.
    FrontMatterParse {
        origin: String,
        source: FrontMatterError,
        location: Box<ErrorLocation>,
    },

    /// Tera failed to parse or render a fragment.
    Engine {
        origin: String,
        message: String,
        location: Box<ErrorLocation>,
    },
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::DirectiveSyntax {
                origin,
                markup,
                reason,
                ..
            } => write!(f, "Invalid template directive '{}' in {}: {}", markup, origin, reason),
            RenderError::TemplateNotFound {
                name,
                path,
                ..
            } => write!(f, "Template '{}' not found at {}", name, path.display()),
            RenderError::FrontMatterParse {
                origin,
                source,
                ..
            } => write!(f, "Failed to parse front matter of {}: {}", origin, source),
            RenderError::Engine {
                origin,
                message,
                ..
            } => write!(f, "Failed to render {}: {}", origin, message),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::TemplateNotFound {
                source,
                ..
            } => Some(source),
            RenderError::FrontMatterParse {
                source,
                ..
            } => Some(source),
            _ => None,
        }
    }
}

impl RenderError {
    /// Location of the error within the page render.
    pub fn location(&self) -> &ErrorLocation {
        match self {
            RenderError::DirectiveSyntax {
                location,
                ..
            }
            | RenderError::TemplateNotFound {
                location,
                ..
            }
            | RenderError::FrontMatterParse {
                location,
                ..
            }
            | RenderError::Engine {
                location,
                ..
            } => location,
        }
    }

    /// Fill in the page and open-block chain if they are not set yet.
    ///
    /// Errors raised deep inside parsing only know their own line; the
    /// render pass attaches the rest on the way out.
    pub fn in_context(mut self, page: Option<&Path>, chain: &[String]) -> Self {
        let location = match &mut self {
            RenderError::DirectiveSyntax {
                location,
                ..
            }
            | RenderError::TemplateNotFound {
                location,
                ..
            }
            | RenderError::FrontMatterParse {
                location,
                ..
            }
            | RenderError::Engine {
                location,
                ..
            } => location,
        };
        if location.page.is_none() {
            location.page = page.map(Path::to_path_buf);
        }
        if location.chain.is_empty() {
            location.chain = chain.to_vec();
        }
        self
    }

    /// Generate a multi-line report with context and suggestions.
    pub fn format_with_context(&self) -> String {
        let mut msg = String::new();

        match self {
            RenderError::DirectiveSyntax {
                origin,
                markup,
                reason,
                location,
            } => {
                msg.push_str("ERROR: Invalid Template Directive\n\n");
                msg.push_str(&format!("Source: {}\n", origin));
                msg.push_str(&format!("Markup: {}\n", markup));
                msg.push_str(&format!("Problem: {}\n", reason));
                push_location(&mut msg, location);
                msg.push_str("\nSUGGESTION: Blocks are written as\n");
                msg.push_str("  {% template <name> key: value ... %} content {% endtemplate %}\n");
                msg.push_str("Every block needs a template name and a matching endtemplate tag.\n");
            }
            RenderError::TemplateNotFound {
                name,
                path,
                suggestions,
                source,
                location,
            } => {
                msg.push_str("ERROR: Template Not Found\n\n");
                msg.push_str(&format!("Template: {}\n", name));
                msg.push_str(&format!("Looked in: {}\n", path.display()));
                msg.push_str(&format!("Reason: {}\n", source));
                push_location(&mut msg, location);
                if !suggestions.is_empty() {
                    msg.push_str("\nDid you mean one of these?\n");
                    for suggestion in suggestions {
                        msg.push_str(&format!("  - {}\n", suggestion));
                    }
                }
            }
            RenderError::FrontMatterParse {
                origin,
                source,
                location,
            } => {
                msg.push_str("ERROR: Invalid Front Matter\n\n");
                msg.push_str(&format!("Source: {}\n", origin));
                msg.push_str(&format!("Error: {}\n", source));
                push_location(&mut msg, location);
                msg.push_str("\nSUGGESTION: Front matter must be a YAML mapping between '---' lines,\n");
                msg.push_str("closed by '---' or '...'.\n");
            }
            RenderError::Engine {
                origin,
                message,
                location,
            } => {
                msg.push_str("ERROR: Template Rendering Failed\n\n");
                msg.push_str(&format!("Source: {}\n", origin));
                msg.push_str(&format!("Error: {}\n", message));
                push_location(&mut msg, location);
                msg.push_str("\nSUGGESTION: Check for undefined variables and unclosed tags.\n");
                msg.push_str("Tera control flow ({% if %}, {% for %}) may wrap a template block,\n");
                msg.push_str("but must not open outside a block and close inside it.\n");
            }
        }

        msg
    }
}

fn push_location(msg: &mut String, location: &ErrorLocation) {
    if let Some(page) = &location.page {
        msg.push_str(&format!("Page: {}\n", page.display()));
    }
    if let Some(line) = location.line_number {
        msg.push_str(&format!("Line: {}\n", line));
    }
    if !location.chain.is_empty() {
        msg.push_str("Inside:\n");
        for (i, name) in location.chain.iter().enumerate() {
            let indent = "  ".repeat(i + 1);
            let arrow = if i > 0 {
                "└─ "
            } else {
                ""
            };
            msg.push_str(&format!("{}{}{}\n", indent, arrow, name));
        }
    }
}
