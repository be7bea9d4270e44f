//! nestplate - nested, scoped template blocks for static sites
//!
//! Pages written in Markdown or HTML wrap content in `{% template %}` blocks.
//! Each block names a template file, passes it attributes, and hands it the
//! block's own content (optionally with front matter of its own). Blocks
//! nest, and a block can forward properties to any block rendered inside it.
//!
//! ```text
//! {% template note.html kind: 'warning', props.icon: 'alert' %}
//!   Be careful with **this**.
//!   {% template icon-list.html name: props.icon %}{% endtemplate %}
//! {% endtemplate %}
//! ```
//!
//! Expressions, filters, and control flow come from [Tera](https://keats.github.io/tera/);
//! block content is converted from Markdown with comrak.
//!
//! # Modules
//!
//! - [`templating`] - block parsing, the scope stack, template loading, and rendering
//! - [`markdown`] - front matter, indentation, and Markdown conversion
//! - [`config`] - `site.toml`
//! - [`site`] - page discovery and concurrent builds
//! - [`cli`] - the `nestplate` command
//! - [`core`] - application errors and user-facing reporting
//! - [`constants`] - reserved names and limits
//!
//! # Library Use
//!
//! ```rust,no_run
//! use nestplate::templating::{MemorySource, Renderer};
//!
//! let source = MemorySource::new().with("box.html", "<div>{{ template.content }}</div>");
//! let renderer = Renderer::new(source);
//! let html = renderer
//!     .render_str("{% template box.html %}Hello{% endtemplate %}", &tera::Context::new())
//!     .unwrap();
//! assert_eq!(html, "<div><p>Hello</p> </div>");
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod markdown;
pub mod site;
pub mod templating;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
