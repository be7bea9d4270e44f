//! Parsing of `{% template %}` blocks and their attributes.
//!
//! A source text (a page body or a template file body) is scanned for
//! `{% template ... %}` and `{% endtemplate %}` tags. Each block's inner
//! content is compiled as its own fragment, and in the surrounding text the
//! whole block is replaced by a [`block_call`]. The result is a [`Document`]:
//! one [`Engine`] with a root fragment plus a table of [`BlockNode`]s the calls
//! refer to by index. Tera control flow may therefore wrap blocks; it may not
//! open outside a block and close inside it.
//!
//! Attribute values are classified when the directive is parsed but evaluated
//! only at render time, when the live host scope is available:
//!
//! | Markup               | Value                                   |
//! |----------------------|-----------------------------------------|
//! | `title: 'Yup'`       | [`AttrValue::Literal`] string           |
//! | `count: 3`           | [`AttrValue::Literal`] number           |
//! | `items: site.items`  | [`AttrValue::Expr`] evaluated by Tera   |
//! | `title: props.name`  | [`AttrValue::PropRef`] resolved later   |
//!
//! A key written as `props.<k>` declares a forwarded property. It is stored
//! under `<k>` so that descendants referencing `props.<k>` find it.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tera::Context as TeraContext;

use super::engine::{Engine, FragmentId, block_call, format_tera_error, lookup_path};
use super::error::{ErrorLocation, RenderError};
use crate::constants::{BLOCK_TAG, END_BLOCK_TAG, PROPS_PREFIX};

/// Token grammar shared by names and values: a quoted string, or a run of
/// characters without whitespace, commas or pipes (quoted parts allowed).
const QUOTED_FRAGMENT: &str = r#""[^"]*"|'[^']*'|(?:[^\s,|'"]|"[^"]*"|'[^']*')+"#;

/// A parsed source text.
#[derive(Debug)]
pub struct Document {
    /// Compiled fragments of this source.
    pub engine: Engine,
    /// The text with every outermost block replaced by a call.
    pub root: FragmentId,
    /// Every block of the source in opening order; calls index into this.
    pub blocks: Vec<BlockNode>,
}

impl Document {
    /// The block a call with index `index` refers to.
    pub fn block(&self, index: usize) -> Option<&BlockNode> {
        self.blocks.get(index)
    }
}

/// A `{% template %} ... {% endtemplate %}` block.
#[derive(Debug, Clone)]
pub struct BlockNode {
    pub directive: Directive,
    /// Inner content, rendered in the caller's scope. Blocks nested in it
    /// are calls like those in the root.
    pub body: FragmentId,
}

/// The opening tag of a block.
#[derive(Debug, Clone)]
pub struct Directive {
    /// The full opening tag as written.
    pub markup: String,
    pub name: TemplateName,
    /// Call-site attributes in source order; later keys win.
    pub attributes: Vec<Attribute>,
    /// 1-based line of the opening tag.
    pub line: usize,
}

/// How the template name was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateName {
    /// Quoted, or bare text that cannot name a variable.
    Literal(String),
    /// A bare dotted path. Resolved against the live scope; if it does not
    /// name a string there, the text itself is the template name.
    Dynamic(String),
}

impl TemplateName {
    /// Resolve the name against the live scope.
    pub fn resolve(&self, scope: &TeraContext) -> String {
        match self {
            TemplateName::Literal(name) => name.clone(),
            TemplateName::Dynamic(path) => match lookup_path(scope, path) {
                Some(Value::String(name)) => name.clone(),
                _ => path.clone(),
            },
        }
    }
}

/// A single `key: value` pair on a directive.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub key: String,
    pub value: AttrValue,
}

/// A call-site attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Quoted string, number or boolean.
    Literal(Value),
    /// Host expression compiled into the document's engine.
    Expr {
        fragment: FragmentId,
        source: String,
    },
    /// `props.<key>`: resolved against earlier inclusion instances.
    PropRef(String),
}

impl AttrValue {
    /// Evaluate a literal or expression against the live scope.
    ///
    /// Returns `Ok(None)` for prop references; those are resolved by the
    /// scope stack instead.
    pub fn evaluate(&self, engine: &Engine, scope: &TeraContext) -> Result<Option<Value>, tera::Error> {
        match self {
            AttrValue::Literal(value) => Ok(Some(value.clone())),
            AttrValue::Expr {
                fragment,
                ..
            } => engine.evaluate(*fragment, scope).map(Some),
            AttrValue::PropRef(_) => Ok(None),
        }
    }
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(
            r"(?s)\{{%(-?)\s*({}|{})\b(.*?)(-?)%\}}",
            regex::escape(BLOCK_TAG),
            regex::escape(END_BLOCK_TAG)
        );
        Regex::new(&pattern).expect("block tag pattern is valid")
    })
}

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"\A\s*({QUOTED_FRAGMENT})")).expect("name pattern is valid")
    })
}

fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"((?:props\.)?[A-Za-z_][\w-]*)\s*:\s*({QUOTED_FRAGMENT})"))
            .expect("attribute pattern is valid")
    })
}

fn identifier_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\A[A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*\z").expect("identifier pattern is valid")
    })
}

fn prop_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\A[A-Za-z_][\w-]*\z").expect("prop key pattern is valid"))
}

/// An open block while the document is being scanned.
struct OpenBlock {
    directive: Directive,
    index: usize,
    /// Text of the enclosing source collected before the block opened.
    parent_text: String,
}

/// Parse `source` into a [`Document`] with its own compiled fragments.
///
/// `origin` names the source (page path or template name) in errors.
///
/// # Errors
///
/// - [`RenderError::DirectiveSyntax`] for malformed or unbalanced tags
/// - [`RenderError::Engine`] if the text is not valid Tera, including
///   control flow that crosses a block boundary
pub fn parse_document(source: &str, origin: &str) -> Result<Document, RenderError> {
    let mut engine = Engine::new();
    let mut blocks: Vec<Option<BlockNode>> = Vec::new();
    let mut open: Vec<OpenBlock> = Vec::new();
    let mut text = String::new();

    let mut cursor = 0;
    let mut line = 1;
    let mut trim_next = false;

    for caps in tag_regex().captures_iter(source) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        line += source[cursor..whole.start()].matches('\n').count();

        let mut piece = &source[cursor..whole.start()];
        if trim_next {
            piece = piece.trim_start();
        }
        if caps.get(1).is_some_and(|m| !m.as_str().is_empty()) {
            piece = piece.trim_end();
        }
        text.push_str(piece);

        let tag = caps.get(2).map_or("", |m| m.as_str());
        let args = caps.get(3).map_or("", |m| m.as_str());
        let markup = whole.as_str();

        if tag == BLOCK_TAG {
            let directive = parse_directive(markup, args, origin, line, &mut engine)?;
            tracing::trace!("Opened block '{}' at {}:{}", markup, origin, line);
            open.push(OpenBlock {
                directive,
                index: blocks.len(),
                parent_text: std::mem::take(&mut text),
            });
            blocks.push(None);
        } else {
            if !args.trim().is_empty() {
                return Err(syntax_error(origin, markup, "endtemplate takes no arguments", line));
            }
            let Some(block) = open.pop() else {
                return Err(syntax_error(
                    origin,
                    markup,
                    "endtemplate without a matching template tag",
                    line,
                ));
            };
            let body_text = std::mem::replace(&mut text, block.parent_text);
            let body = compile(&mut engine, &body_text, origin, Some(block.directive.line))?;
            text.push_str(&block_call(block.index));
            blocks[block.index] = Some(BlockNode {
                directive: block.directive,
                body,
            });
        }

        trim_next = caps.get(4).is_some_and(|m| !m.as_str().is_empty());
        line += markup.matches('\n').count();
        cursor = whole.end();
    }

    if let Some(block) = open.pop() {
        return Err(syntax_error(
            origin,
            &block.directive.markup,
            "template block is never closed with endtemplate",
            block.directive.line,
        ));
    }

    let mut piece = &source[cursor..];
    if trim_next {
        piece = piece.trim_start();
    }
    text.push_str(piece);
    let root = compile(&mut engine, &text, origin, None)?;

    Ok(Document {
        engine,
        root,
        // every slot was filled when its endtemplate was seen
        blocks: blocks.into_iter().flatten().collect(),
    })
}

fn compile(
    engine: &mut Engine,
    text: &str,
    origin: &str,
    line: Option<usize>,
) -> Result<FragmentId, RenderError> {
    engine.add_fragment(text).map_err(|e| {
        let location = match line {
            Some(line) => ErrorLocation::default().with_line(line),
            None => ErrorLocation::default(),
        };
        RenderError::Engine {
            origin: origin.to_string(),
            message: format_tera_error(&e),
            location: Box::new(location),
        }
    })
}

fn syntax_error(origin: &str, markup: &str, reason: impl Into<String>, line: usize) -> RenderError {
    RenderError::DirectiveSyntax {
        origin: origin.to_string(),
        markup: markup.to_string(),
        reason: reason.into(),
        location: Box::new(ErrorLocation::default().with_line(line)),
    }
}

/// Parse the arguments of an opening tag (everything after `template`).
pub fn parse_directive(
    markup: &str,
    args: &str,
    origin: &str,
    line: usize,
    engine: &mut Engine,
) -> Result<Directive, RenderError> {
    let Some(name_match) = name_regex().captures(args).and_then(|c| c.get(1)) else {
        return Err(syntax_error(origin, markup, "missing template name", line));
    };
    let token = name_match.as_str();
    let rest = &args[name_match.end()..];

    if token.ends_with(':') || rest.trim_start().starts_with(':') {
        return Err(syntax_error(origin, markup, "missing template name", line));
    }

    let name = match unquote(token) {
        Some(literal) => TemplateName::Literal(literal.to_string()),
        None if identifier_path_regex().is_match(token) => TemplateName::Dynamic(token.to_string()),
        None => TemplateName::Literal(token.to_string()),
    };
    if let TemplateName::Literal(literal) = &name {
        validate_name(literal).map_err(|reason| syntax_error(origin, markup, reason, line))?;
    }

    let mut attributes = Vec::new();
    let mut consumed = 0;
    for caps in attribute_regex().captures_iter(rest) {
        let (Some(whole), Some(key), Some(raw)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        check_leftover(&rest[consumed..whole.start()], origin, markup, line)?;
        consumed = whole.end();

        let key = key.as_str();
        let key = key.strip_prefix(PROPS_PREFIX).unwrap_or(key).to_string();
        let value = classify_value(raw.as_str(), engine).map_err(|reason| {
            syntax_error(origin, markup, format!("invalid value for '{key}': {reason}"), line)
        })?;

        attributes.push(Attribute {
            key,
            value,
        });
    }
    check_leftover(&rest[consumed..], origin, markup, line)?;

    Ok(Directive {
        markup: markup.to_string(),
        name,
        attributes,
        line,
    })
}

fn check_leftover(text: &str, origin: &str, markup: &str, line: usize) -> Result<(), RenderError> {
    let stray = text.trim_matches(|c: char| c.is_whitespace() || c == ',');
    if stray.is_empty() {
        Ok(())
    } else {
        Err(syntax_error(
            origin,
            markup,
            format!("unexpected '{stray}', expected 'key: value' attributes"),
            line,
        ))
    }
}

fn classify_value(raw: &str, engine: &mut Engine) -> Result<AttrValue, String> {
    if let Some(text) = unquote(raw) {
        return Ok(AttrValue::Literal(Value::String(text.to_string())));
    }
    match raw {
        "true" => return Ok(AttrValue::Literal(Value::Bool(true))),
        "false" => return Ok(AttrValue::Literal(Value::Bool(false))),
        _ => {}
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(AttrValue::Literal(Value::from(n)));
    }
    if let Some(number) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        return Ok(AttrValue::Literal(Value::Number(number)));
    }
    if let Some(key) = raw.strip_prefix(PROPS_PREFIX) {
        if prop_key_regex().is_match(key) {
            return Ok(AttrValue::PropRef(key.to_string()));
        }
    }

    let fragment = engine.add_expression(raw).map_err(|e| format_tera_error(&e))?;
    Ok(AttrValue::Expr {
        fragment,
        source: raw.to_string(),
    })
}

fn unquote(token: &str) -> Option<&str> {
    let bytes = token.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
            let inner = &token[1..token.len() - 1];
            if !inner.contains(first as char) {
                return Some(inner);
            }
        }
    }
    None
}

/// Check that a template name stays inside the templates directory.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("template name is empty".to_string());
    }
    let path = std::path::Path::new(name);
    if path.is_absolute() || name.starts_with('/') || name.starts_with('\\') {
        return Err(format!("template name '{name}' must be relative to the templates directory"));
    }
    if path.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        return Err(format!("template name '{name}' must not contain '..'"));
    }
    Ok(())
}
