//! Front matter extraction for pages, template files, and block content.
//!
//! A front matter block is a YAML document at the very top of a text, opened
//! by a `---` line and closed by a `---` or `...` line:
//!
//! ```text
//! ---
//! title: Milk
//! tags:
//!   - dairy
//! ---
//! Body text
//! ```
//!
//! Detection runs on the margin-normalized text (see [`super::indent`]) so
//! that block content indented to match its surrounding markup is still
//! recognised. When no block is found the caller gets the original text back
//! untouched.
//!
//! # Example
//!
//! ```rust
//! use nestplate::markdown::frontmatter::split;
//!
//! let parsed = split("---\nclass: milk\n---\nContent\n").unwrap();
//! assert_eq!(parsed.data["class"], "milk");
//! assert_eq!(parsed.content, "Content\n");
//! assert!(parsed.has_front_matter());
//! ```

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

use super::indent::normalize;

/// Attribute mapping parsed from a front matter block.
pub type Metadata = serde_json::Map<String, Value>;

/// Errors raised while parsing a front matter block.
#[derive(Debug, Error)]
pub enum FrontMatterError {
    /// The block is not valid YAML.
    #[error("invalid YAML in front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The block parsed, but its top level is not a mapping.
    #[error("front matter must be a mapping of keys to values, found {found}")]
    NotMapping {
        /// Kind of YAML node found at the top level
        found: &'static str,
    },
}

/// Result of splitting a text into front matter and body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFrontMatter {
    /// Parsed metadata; empty when the text had no front matter.
    pub data: Metadata,

    /// Body with the front matter removed.
    ///
    /// Normalized when a block was found, otherwise the original text.
    pub content: String,

    /// Raw YAML between the delimiters, if a block was found.
    pub raw: Option<String>,
}

impl ParsedFrontMatter {
    /// Whether the source text carried a front matter block.
    pub fn has_front_matter(&self) -> bool {
        self.raw.is_some()
    }
}

fn front_matter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?ms)\A---[ \t]*\r?\n(?P<yaml>.*?)^(?:---|\.\.\.)[ \t]*\r?(?:\n|\z)")
            .expect("front matter pattern is valid")
    })
}

/// Split `text` into its front matter mapping and remaining body.
///
/// # Errors
///
/// Returns [`FrontMatterError`] if a delimited block exists but is not a
/// YAML mapping. Text without a complete block is never an error.
pub fn split(text: &str) -> Result<ParsedFrontMatter, FrontMatterError> {
    let normalized = normalize(text);

    let Some(caps) = front_matter_regex().captures(&normalized) else {
        return Ok(ParsedFrontMatter {
            data: Metadata::new(),
            content: text.to_string(),
            raw: None,
        });
    };

    let whole = caps.get(0).map_or(0, |m| m.end());
    let yaml = caps.name("yaml").map_or("", |m| m.as_str());
    let data = parse_mapping(yaml)?;

    tracing::trace!("Extracted front matter with {} key(s)", data.len());

    Ok(ParsedFrontMatter {
        data,
        content: normalized[whole..].to_string(),
        raw: Some(yaml.to_string()),
    })
}

/// Parse a YAML document that must be a mapping (or empty).
pub fn parse_mapping(yaml: &str) -> Result<Metadata, FrontMatterError> {
    if yaml.trim().is_empty() {
        return Ok(Metadata::new());
    }

    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Metadata::new()),
        Value::Array(_) => Err(FrontMatterError::NotMapping {
            found: "a list",
        }),
        Value::String(_) => Err(FrontMatterError::NotMapping {
            found: "a string",
        }),
        Value::Number(_) => Err(FrontMatterError::NotMapping {
            found: "a number",
        }),
        Value::Bool(_) => Err(FrontMatterError::NotMapping {
            found: "a boolean",
        }),
    }
}
