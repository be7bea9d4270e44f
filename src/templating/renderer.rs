//! Block rendering and composition.
//!
//! [`Renderer`] is the long-lived, shareable part: it holds the template
//! source and the collaborators (markdown converter, compressor, dependency
//! tracker) and can be wrapped in an `Arc` and used from many threads.
//!
//! Every page render gets its own [`RenderPass`] holding the mutable state of
//! that render: the template cache and the inclusion-scope stack. Nothing
//! mutable is shared between passes, so pages can render concurrently.
//!
//! Each source the pass compiles gets a block function registered on its
//! Tera instance. Tera calls it wherever a block sits, possibly inside an
//! `{% if %}` or a `{% for %}`, with the live context, and the function
//! renders the block through the pass. Rendering is re-entrant this way, so
//! the pass state sits behind a mutex that is never held while Tera runs.
//!
//! # Block evaluation
//!
//! For each `{% template name ... %}` block, in document order:
//!
//! 1. resolve the name, check the nesting limit, begin an instance on the
//!    scope stack
//! 2. evaluate call-site attributes in the caller's scope and record them;
//!    an attribute naming an undefined variable is left out
//! 3. register the dependency and load the template (cached per pass)
//! 4. resolve `props.*` references against earlier instances
//! 5. render the inner content in the caller's scope
//! 6. merge metadata: template front matter < call-site attributes <
//!    inner front matter < resolved props
//! 7. convert the inner content (skipped for `parse: html`) and add it as
//!    `content`
//! 8. render the template with `template` set to the merged bundle
//! 9. compress the output
//! 10. end the instance

use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tera::Context as TeraContext;

use super::compress::{Compressor, HtmlCompressor, IdentityCompressor};
use super::deps::{DependencyTracker, NoopTracker};
use super::directive::{AttrValue, BlockNode, Document, parse_document, validate_name};
use super::engine::{FragmentId, format_tera_error, missing_variable};
use super::error::{ErrorLocation, RenderError};
use super::loader::{FileSystemSource, TemplateLoader, TemplateSource};
use super::scope::{InstanceId, ScopeStack, ScopedValue};
use crate::config::RenderConfig;
use crate::constants::{CONTENT_KEY, CONTEXT_NAME, MAX_NESTING_DEPTH, PARSE_ATTRIBUTE, PARSE_HTML};
use crate::markdown::{
    ComrakConverter, MarkdownConverter, Metadata, PassthroughConverter, frontmatter, indent,
};

/// Renders pages containing template blocks.
///
/// Cloning is cheap; clones share the same collaborators.
#[derive(Clone)]
pub struct Renderer {
    source: Arc<dyn TemplateSource>,
    markdown: Arc<dyn MarkdownConverter>,
    compressor: Arc<dyn Compressor>,
    tracker: Arc<dyn DependencyTracker>,
    empty_content_placeholder: bool,
}

impl Renderer {
    /// Create a renderer over `source` with the default collaborators.
    pub fn new(source: impl TemplateSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            markdown: Arc::new(ComrakConverter::new()),
            compressor: Arc::new(HtmlCompressor::default()),
            tracker: Arc::new(NoopTracker),
            empty_content_placeholder: false,
        }
    }

    /// Create a renderer for a site rooted at `source_root`.
    pub fn from_config(source_root: &Path, config: &RenderConfig) -> Self {
        let source = FileSystemSource::new(source_root.join(&config.templates_dir));
        let renderer = Self::new(source).with_empty_content_placeholder(config.empty_content_placeholder);

        let renderer = if config.markdown {
            renderer
        } else {
            renderer.with_markdown(PassthroughConverter)
        };

        if config.compress.enabled {
            renderer.with_compressor(HtmlCompressor::new(config.compress.remove_comments))
        } else {
            renderer.with_compressor(IdentityCompressor)
        }
    }

    pub fn with_markdown(mut self, converter: impl MarkdownConverter + 'static) -> Self {
        self.markdown = Arc::new(converter);
        self
    }

    pub fn with_compressor(mut self, compressor: impl Compressor + 'static) -> Self {
        self.compressor = Arc::new(compressor);
        self
    }

    pub fn with_tracker(mut self, tracker: Arc<dyn DependencyTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// Substitute `<!-- name -->` for empty block content.
    pub fn with_empty_content_placeholder(mut self, enabled: bool) -> Self {
        self.empty_content_placeholder = enabled;
        self
    }

    /// The markdown converter, for callers converting whole pages.
    pub fn markdown(&self) -> &dyn MarkdownConverter {
        self.markdown.as_ref()
    }

    /// Start a render pass for `page`.
    pub fn begin_pass(&self, page: Option<&Path>) -> RenderPass {
        let page = page.map(Path::to_path_buf);
        RenderPass {
            shared: Arc::new(PassShared {
                renderer: self.clone(),
                state: Mutex::new(PassState {
                    loader: TemplateLoader::new(Arc::clone(&self.source), Arc::clone(&self.tracker), page.clone()),
                    stack: ScopeStack::new(),
                    origins: Vec::new(),
                    depth: 0,
                    blocks_rendered: 0,
                    failure: None,
                }),
                page,
            }),
        }
    }

    /// Render `source` as the body of `page` in its own pass.
    ///
    /// # Errors
    ///
    /// Any [`RenderError`] aborts the page; nothing is partially returned.
    pub fn render_page(
        &self,
        source: &str,
        page: Option<&Path>,
        scope: &TeraContext,
    ) -> Result<String, RenderError> {
        let pass = self.begin_pass(page);
        let output = pass.render_source(source, scope)?;

        let stats = pass.stats();
        tracing::debug!(
            "Rendered {} with {} block(s); template cache {} hit(s), {} miss(es) ({:.1}% hit rate)",
            pass.shared.origin(),
            stats.blocks_rendered,
            stats.cache_hits,
            stats.cache_misses,
            stats.hit_rate
        );
        Ok(output)
    }

    /// Render a source text that does not belong to a page.
    pub fn render_str(&self, source: &str, scope: &TeraContext) -> Result<String, RenderError> {
        self.render_page(source, None, scope)
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("empty_content_placeholder", &self.empty_content_placeholder)
            .finish_non_exhaustive()
    }
}

/// Counters for one render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassStats {
    pub blocks_rendered: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// Template cache hit rate as a percentage
    pub hit_rate: f64,
}

/// One page render.
pub struct RenderPass {
    shared: Arc<PassShared>,
}

impl RenderPass {
    /// Parse and render a source text in this pass.
    pub fn render_source(&self, source: &str, scope: &TeraContext) -> Result<String, RenderError> {
        self.shared.render_source(source, scope)
    }

    pub fn stats(&self) -> PassStats {
        let state = self.shared.state();
        let (cache_hits, cache_misses) = state.loader.stats();
        PassStats {
            blocks_rendered: state.blocks_rendered,
            cache_hits,
            cache_misses,
            hit_rate: state.loader.hit_rate(),
        }
    }
}

/// The part of a pass that block functions reach back into.
struct PassShared {
    renderer: Renderer,
    page: Option<PathBuf>,
    state: Mutex<PassState>,
}

/// Mutable state of one page render.
struct PassState {
    loader: TemplateLoader,
    stack: ScopeStack,
    /// Names of the sources whose text is currently rendering, innermost last
    origins: Vec<String>,
    /// Number of blocks currently open
    depth: usize,
    blocks_rendered: usize,
    /// Error raised inside a block function, waiting for Tera to unwind
    failure: Option<RenderError>,
}

impl PassShared {
    fn state(&self) -> MutexGuard<'_, PassState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Name of the source currently rendering.
    fn origin(&self) -> String {
        let current = self.state().origins.last().cloned();
        match (current, &self.page) {
            (Some(name), _) => name,
            (None, Some(page)) => page.display().to_string(),
            (None, None) => "<inline>".to_string(),
        }
    }

    fn contextualize(&self, error: RenderError) -> RenderError {
        let chain = self.state().stack.chain();
        error.in_context(self.page.as_deref(), &chain)
    }

    fn engine_error(&self, error: &tera::Error) -> RenderError {
        self.contextualize(RenderError::Engine {
            origin: self.origin(),
            message: format_tera_error(error),
            location: Box::new(ErrorLocation::default()),
        })
    }

    /// Parse a source and wire its blocks to this pass.
    fn compile(self: &Arc<Self>, source: &str, origin: &str) -> Result<Arc<Document>, RenderError> {
        let document = parse_document(source, origin)?;
        let pass = Arc::downgrade(self);
        Ok(Arc::new_cyclic(move |weak: &Weak<Document>| {
            let mut document = document;
            document.engine.register_block_function(block_function(pass, weak.clone()));
            document
        }))
    }

    fn render_source(self: &Arc<Self>, source: &str, scope: &TeraContext) -> Result<String, RenderError> {
        let origin = self.origin();
        let document = self.compile(source, &origin).map_err(|e| self.contextualize(e))?;
        self.render_fragment(&document, document.root, scope)
    }

    /// Render one fragment, surfacing the error of a block that failed inside it.
    fn render_fragment(
        &self,
        document: &Document,
        fragment: FragmentId,
        scope: &TeraContext,
    ) -> Result<String, RenderError> {
        document.engine.render(fragment, scope).map_err(|e| {
            let failure = self.state().failure.take();
            match failure {
                Some(failure) => failure,
                None => self.engine_error(&e),
            }
        })
    }

    fn render_block(
        self: &Arc<Self>,
        document: &Document,
        block: &BlockNode,
        scope: &TeraContext,
    ) -> Result<String, RenderError> {
        let directive = &block.directive;
        let name = directive.name.resolve(scope);
        if let Err(reason) = validate_name(&name) {
            return Err(self.contextualize(RenderError::DirectiveSyntax {
                origin: self.origin(),
                markup: directive.markup.clone(),
                reason,
                location: Box::new(ErrorLocation::default().with_line(directive.line)),
            }));
        }

        let depth = self.state().depth;
        if depth >= MAX_NESTING_DEPTH {
            return Err(self.contextualize(RenderError::DirectiveSyntax {
                origin: self.origin(),
                markup: directive.markup.clone(),
                reason: format!(
                    "blocks nested more than {} levels deep; does '{}' include itself?",
                    MAX_NESTING_DEPTH, name
                ),
                location: Box::new(ErrorLocation::default().with_line(directive.line)),
            }));
        }

        let id = {
            let mut state = self.state();
            state.depth += 1;
            state.stack.begin_instance(&name)
        };
        let result = self.render_instance(id, &name, document, block, scope);

        let mut state = self.state();
        state.depth -= 1;
        state.stack.end_instance(id);
        if result.is_ok() {
            state.blocks_rendered += 1;
        }
        result
    }

    fn render_instance(
        self: &Arc<Self>,
        id: InstanceId,
        name: &str,
        document: &Document,
        block: &BlockNode,
        scope: &TeraContext,
    ) -> Result<String, RenderError> {
        let call_site = self.record_call_site(id, document, block, scope)?;

        let loaded = {
            let mut state = self.state();
            state.loader.load(name, |text, origin| self.compile(text, origin))
        };
        let handle = loaded.map_err(|e| self.contextualize(e))?;

        let props = {
            let mut state = self.state();
            let props = state.stack.evaluate_props(id);
            state.stack.record(id, concrete(&props));
            props
        };

        let inner = self.render_fragment(document, block.body, scope)?;
        let parsed = frontmatter::split(&inner).map_err(|source| {
            self.contextualize(RenderError::FrontMatterParse {
                origin: format!("the content of the '{}' block", name),
                source,
                location: Box::new(ErrorLocation::default().with_line(block.directive.line)),
            })
        })?;

        let mut bundle = handle.data.clone();
        bundle.extend(call_site);
        bundle.extend(parsed.data);
        bundle.extend(props);
        self.state().stack.record(id, concrete(&bundle));

        let renderer = &self.renderer;
        let body = indent::normalize(&parsed.content);
        let content = if bundle.get(PARSE_ATTRIBUTE).and_then(Value::as_str) == Some(PARSE_HTML) {
            body
        } else {
            renderer.markdown.convert(&body)
        };
        let content = if content.trim().is_empty() && renderer.empty_content_placeholder {
            format!("<!-- {} -->", name)
        } else {
            content
        };

        tracing::trace!(
            "Rendering '{}' with attributes [{}]",
            name,
            bundle.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
        );
        bundle.insert(CONTENT_KEY.to_string(), Value::String(content));

        let mut child = scope.clone();
        child.insert(CONTEXT_NAME, &Value::Object(bundle));

        self.state().origins.push(name.to_string());
        let rendered = self.render_fragment(&handle.document, handle.document.root, &child);
        self.state().origins.pop();

        Ok(renderer.compressor.compress(&rendered?))
    }

    /// Evaluate call-site attributes and record them on the stack.
    ///
    /// Returns the concrete values; prop references are only recorded. An
    /// expression naming an undefined variable yields no value, like an
    /// unresolved prop.
    fn record_call_site(
        &self,
        id: InstanceId,
        document: &Document,
        block: &BlockNode,
        scope: &TeraContext,
    ) -> Result<Metadata, RenderError> {
        let mut values = Metadata::new();
        let mut scoped = Vec::with_capacity(block.directive.attributes.len());

        for attribute in &block.directive.attributes {
            let key = &attribute.key;
            match &attribute.value {
                AttrValue::PropRef(target) => {
                    values.remove(key);
                    scoped.push((key.clone(), ScopedValue::Reference(target.clone())));
                }
                value => match value.evaluate(&document.engine, scope) {
                    Ok(Some(evaluated)) => {
                        values.insert(key.clone(), evaluated.clone());
                        scoped.push((key.clone(), ScopedValue::Concrete(evaluated)));
                    }
                    Ok(None) => {}
                    Err(error) => match missing_variable(&error) {
                        Some(variable) => {
                            tracing::debug!(
                                "Attribute '{}' of '{}' names undefined `{}`; omitting it",
                                key,
                                block.directive.markup,
                                variable
                            );
                            values.remove(key);
                            scoped.retain(|(recorded, _)| recorded != key);
                        }
                        None => {
                            let mut error = self.engine_error(&error);
                            if let RenderError::Engine {
                                message,
                                ..
                            } = &mut error
                            {
                                *message = format!("attribute '{}': {}", key, message);
                            }
                            return Err(error);
                        }
                    },
                },
            }
        }

        self.state().stack.record(id, scoped);
        Ok(values)
    }
}

/// The function Tera calls for each block of `document`.
///
/// Holds weak references: the pass owns the documents, and each document's
/// Tera instance owns this function.
fn block_function(pass: Weak<PassShared>, document: Weak<Document>) -> impl tera::Function + 'static {
    move |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let (Some(pass), Some(document)) = (pass.upgrade(), document.upgrade()) else {
            return Err(tera::Error::msg("template block rendered outside its render pass"));
        };
        let block = args
            .get("block")
            .and_then(Value::as_u64)
            .and_then(|index| usize::try_from(index).ok())
            .and_then(|index| document.block(index))
            .ok_or_else(|| tera::Error::msg("unknown template block"))?;
        let scope = match args.get("ctx") {
            Some(ctx) => TeraContext::from_value(ctx.clone())?,
            None => TeraContext::new(),
        };

        match pass.render_block(&document, block, &scope) {
            Ok(output) => Ok(Value::String(output)),
            Err(error) => {
                let message = error.to_string();
                pass.state().failure = Some(error);
                Err(tera::Error::msg(message))
            }
        }
    }
}

fn concrete(data: &Metadata) -> Vec<(String, ScopedValue)> {
    data.iter().map(|(key, value)| (key.clone(), ScopedValue::Concrete(value.clone()))).collect()
}
