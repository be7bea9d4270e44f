//! Markdown handling: conversion, front matter, and margin normalization.
//!
//! Template blocks carry inner content that is usually Markdown written
//! inline in a page, indented to match the surrounding HTML. Before the
//! content reaches a template it goes through three steps:
//!
//! 1. [`indent::normalize`] removes the shared margin and leading blank lines
//! 2. [`frontmatter::split`] pulls out an optional YAML block
//! 3. a [`MarkdownConverter`] turns the remaining text into HTML
//!
//! # Raw HTML
//!
//! Nested blocks render to HTML before their parent's content is converted,
//! so the converter must pass raw HTML through untouched. The default
//! [`ComrakConverter`] enables comrak's unsafe rendering for that reason.

pub mod frontmatter;
pub mod indent;

use comrak::{Options, markdown_to_html};

pub use frontmatter::{FrontMatterError, Metadata, ParsedFrontMatter};

/// Converts Markdown text to HTML.
///
/// Implementations must be deterministic and must preserve raw HTML.
pub trait MarkdownConverter: Send + Sync {
    /// Convert `text` to HTML.
    fn convert(&self, text: &str) -> String;
}

/// [`MarkdownConverter`] backed by comrak.
///
/// Raw HTML is always passed through; GitHub-flavoured extensions (tables,
/// strikethrough, autolinks) can be switched off for strict CommonMark.
#[derive(Debug, Clone, Copy)]
pub struct ComrakConverter {
    gfm: bool,
}

impl ComrakConverter {
    /// Create a converter with GitHub-flavoured extensions enabled.
    pub fn new() -> Self {
        Self {
            gfm: true,
        }
    }

    /// Create a converter that only understands CommonMark.
    pub fn commonmark() -> Self {
        Self {
            gfm: false,
        }
    }
}

impl Default for ComrakConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownConverter for ComrakConverter {
    fn convert(&self, text: &str) -> String {
        let mut options = Options::default();
        options.extension.table = self.gfm;
        options.extension.strikethrough = self.gfm;
        options.extension.autolink = self.gfm;
        options.render.r#unsafe = true;
        markdown_to_html(text, &options)
    }
}

/// Converter that returns its input unchanged.
///
/// Used when `render.markdown = false` and by tests that want to observe the
/// exact text a template receives.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughConverter;

impl MarkdownConverter for PassthroughConverter {
    fn convert(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Whether `path` names a Markdown page by extension.
pub fn is_markdown_file(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown"))
}
