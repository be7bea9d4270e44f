//! Nested, scoped template blocks on top of Tera.
//!
//! A page wraps content in a block that names a template file:
//!
//! ```text
//! {% template card.html title: 'Hello', props.accent: page.color %}
//!   ---
//!   subtitle: From the front matter
//!   ---
//!   Some **markdown** content.
//! {% endtemplate %}
//! ```
//!
//! The template file (`_templates/card.html`) sees the merged attributes and
//! the converted content under the `template` variable:
//!
//! ```text
//! ---
//! accent: grey
//! ---
//! <div class="card {{ template.accent }}">
//!   <h2>{{ template.title }}</h2>
//!   {{ template.content }}
//! </div>
//! ```
//!
//! # Metadata
//!
//! The bundle exposed as `template` is merged from, lowest priority first:
//!
//! 1. the template file's own front matter
//! 2. call-site attributes, evaluated in the caller's scope
//! 3. front matter at the top of the block's inner content
//! 4. properties forwarded from enclosing blocks with `props.<key>`
//!
//! `template.content` always holds the processed inner content.
//!
//! # Props
//!
//! A block declares a forwarded property with a `props.` key
//! (`props.title: "Hi"`), and a descendant picks it up with a `props.` value
//! (`heading: props.title`). References can be chained through any number of
//! blocks; see [`scope`] for how the resolution parent is chosen.
//!
//! # Control flow
//!
//! Blocks are ordinary tags as far as Tera is concerned, so they can sit
//! inside `{% if %}` and `{% for %}`, and attributes can use loop variables:
//!
//! ```text
//! {% for post in site.posts %}
//!   {% template card.html title: post.title %}{{ post.summary }}{% endtemplate %}
//! {% endfor %}
//! ```
//!
//! Control flow must still nest properly: an `{% if %}` opened outside a
//! block cannot close inside it.
//!
//! # Module Layout
//!
//! - [`directive`]: block tag and attribute parsing
//! - [`engine`]: Tera instances and block calls
//! - [`scope`]: the inclusion-scope stack
//! - [`loader`] and [`cache`]: template lookup and per-pass caching
//! - [`compress`]: output compaction
//! - [`deps`]: build dependency tracking
//! - [`renderer`]: composition of all of the above
//! - [`error`]: render errors with page context

pub mod cache;
pub mod compress;
pub mod deps;
pub mod directive;
pub mod engine;
pub mod error;
pub mod loader;
pub mod renderer;
pub mod scope;


pub use compress::{Compressor, HtmlCompressor, IdentityCompressor};
pub use deps::{DependencyGraph, DependencyTracker, NoopTracker};
pub use error::{ErrorLocation, RenderError};
pub use loader::{FileSystemSource, MemorySource, TemplateHandle, TemplateLoader, TemplateSource};
pub use renderer::{PassStats, RenderPass, Renderer};
pub use scope::{InclusionInstance, InstanceId, ScopeStack, ScopedValue};
