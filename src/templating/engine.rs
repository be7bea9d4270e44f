//! Host expression engine backed by Tera.
//!
//! Every source text a render pass reads (the page body, each template file)
//! is compiled into its own [`Engine`]: one Tera instance holding the text
//! itself, the inner content of each block in it, and each attribute
//! expression, all under generated names. Parsing happens when the source is
//! first read; evaluation happens at render time against the live scope.
//!
//! Blocks are not cut out of the text. Each one is replaced by a call to the
//! [`BLOCK_FUNCTION`] function (see [`block_call`]), so Tera control flow can
//! wrap a block like any other tag. The call hands the live context, loop
//! variables included, to whichever function the render pass registered.
//!
//! Fragment names carry no file extension and autoescaping is disabled, so
//! HTML produced by nested blocks is interpolated verbatim.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tera::{Context as TeraContext, Tera};

/// Name of the function a block call invokes.
pub const BLOCK_FUNCTION: &str = "__nestplate_block";

/// Tera variable that dumps the whole live context.
const CONTEXT_DUMP: &str = "__tera_context";

/// Handle to a compiled fragment inside an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FragmentId(usize);

impl FragmentId {
    fn template_name(self) -> String {
        format!("__nestplate_fragment_{}", self.0)
    }
}

/// The text that stands in for block number `index` of a source.
///
/// The function receives `block` (the index) and `ctx` (the live context).
pub fn block_call(index: usize) -> String {
    format!("{{{{ {BLOCK_FUNCTION}(block={index}, ctx={CONTEXT_DUMP}) }}}}")
}

/// Tera instance holding the compiled fragments of one source text.
pub struct Engine {
    tera: Tera,
    next_id: usize,
}

impl Engine {
    /// Create an empty engine with autoescaping disabled.
    pub fn new() -> Self {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        Self {
            tera,
            next_id: 0,
        }
    }

    /// Compile a text fragment.
    ///
    /// # Errors
    ///
    /// Returns the Tera parse error if `source` is not valid template syntax.
    pub fn add_fragment(&mut self, source: &str) -> Result<FragmentId, tera::Error> {
        let id = FragmentId(self.next_id);
        self.tera.add_raw_template(&id.template_name(), source)?;
        self.next_id += 1;
        tracing::trace!("Compiled fragment {} ({} bytes)", id.0, source.len());
        Ok(id)
    }

    /// Compile a single expression so it can later be evaluated to a value.
    ///
    /// The expression is wrapped in `json_encode` so the rendered output can
    /// be decoded back into a structured [`Value`] instead of a string.
    pub fn add_expression(&mut self, expression: &str) -> Result<FragmentId, tera::Error> {
        self.add_fragment(&format!("{{{{ {expression} | json_encode() | safe }}}}"))
    }

    /// Install the function that renders the blocks of this source.
    ///
    /// Until one is registered, rendering a fragment that contains a block
    /// fails with Tera's unknown-function error.
    pub fn register_block_function(&mut self, function: impl tera::Function + 'static) {
        self.tera.register_function(BLOCK_FUNCTION, function);
    }

    /// Render a compiled fragment against `scope`.
    pub fn render(&self, id: FragmentId, scope: &TeraContext) -> Result<String, tera::Error> {
        self.tera.render(&id.template_name(), scope)
    }

    /// Evaluate a fragment compiled with [`Engine::add_expression`].
    pub fn evaluate(&self, id: FragmentId, scope: &TeraContext) -> Result<Value, tera::Error> {
        let encoded = self.render(id, scope)?;
        serde_json::from_str(&encoded).map_err(|e| {
            tera::Error::msg(format!("expression did not produce a value ({e}): {encoded}"))
        })
    }

    /// Number of fragments compiled so far.
    pub fn fragment_count(&self) -> usize {
        self.next_id
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("fragments", &self.next_id).finish()
    }
}

/// Look up a dotted identifier path (`page.layout.name`) in a scope.
pub fn lookup_path<'a>(scope: &'a TeraContext, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = scope.get(segments.next()?)?;
    for segment in segments {
        current = current.get(segment)?;
    }
    Some(current)
}

fn fragment_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'__nestplate_fragment_\d+'").expect("fragment name pattern is valid"))
}

fn missing_variable_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Variable `([^`]+)` not found").expect("missing variable pattern is valid"))
}

/// The variable named by a "Variable `foo` not found" error, if that is
/// what `error` (or one of its causes) is.
pub fn missing_variable(error: &tera::Error) -> Option<String> {
    use std::error::Error;

    let mut current: Option<&dyn Error> = Some(error);
    while let Some(err) = current {
        let message = err.to_string();
        if let Some(name) = missing_variable_regex().captures(&message).and_then(|caps| caps.get(1)) {
            return Some(name.as_str().to_string());
        }
        current = err.source();
    }
    None
}

/// Format a Tera error chain into a single readable message.
///
/// Internal fragment names are stripped since they mean nothing to authors.
pub fn format_tera_error(error: &tera::Error) -> String {
    use std::error::Error;

    let mut messages = Vec::new();
    let mut current: Option<&dyn Error> = Some(error);
    while let Some(err) = current {
        let cleaned = strip_fragment_names(&err.to_string());
        if !cleaned.is_empty()
            && cleaned != "Failed to render template"
            && cleaned != "Failed to parse template"
        {
            messages.push(cleaned);
        }
        current = err.source();
    }

    if messages.is_empty() {
        "Template error (no further detail from Tera)".to_string()
    } else {
        messages.join("\n  → ")
    }
}

fn strip_fragment_names(message: &str) -> String {
    fragment_name_regex()
        .replace_all(message, "template")
        .replace("while rendering template", "")
        .trim()
        .to_string()
}
