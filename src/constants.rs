//! Global constants used throughout the nestplate codebase.
//!
//! Reserved names, directory conventions, and limits that more than one
//! module needs to agree on live here so they cannot drift apart.

/// Directive tag that opens an inclusion block.
pub const BLOCK_TAG: &str = "template";

/// Directive tag that closes an inclusion block.
pub const END_BLOCK_TAG: &str = "endtemplate";

/// Variable under which the merged attribute bundle is exposed to the
/// included template (`{{ template.title }}`).
pub const CONTEXT_NAME: &str = "template";

/// Reserved sub-key of [`CONTEXT_NAME`] holding the processed inner content.
pub const CONTENT_KEY: &str = "content";

/// Prefix marking an explicit property, both as an attribute key
/// (`props.title: "x"`) and as a deferred reference (`title: props.title`).
pub const PROPS_PREFIX: &str = "props.";

/// Attribute that selects how inner content is converted.
pub const PARSE_ATTRIBUTE: &str = "parse";

/// Value of [`PARSE_ATTRIBUTE`] that bypasses markdown conversion.
pub const PARSE_HTML: &str = "html";

/// Default directory (relative to the site source root) holding template files.
pub const DEFAULT_TEMPLATES_DIR: &str = "_templates";

/// Site configuration file looked up at the source root.
pub const SITE_CONFIG_FILE: &str = "site.toml";

/// Default output directory for `nestplate build`.
pub const DEFAULT_DEST_DIR: &str = "_site";

/// Maximum number of close-name suggestions attached to a missing template error.
pub const MAX_NAME_SUGGESTIONS: usize = 3;

/// Maximum Levenshtein distance, as a percentage of the requested name's
/// length, for a template file to be suggested as a replacement.
pub const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Maximum number of template blocks open at once while rendering a page.
/// A template that includes itself without end hits this limit.
pub const MAX_NESTING_DEPTH: usize = 32;
