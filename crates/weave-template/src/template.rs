//! Template compilation and rendering.
//!
//! # Invariants
//!
//! 1. **Compile once**: text sources are tokenized when compiled (or
//!    redefined), never per render.
//!
//! 2. **Missing values are empty**: a variable, path segment or helper that
//!    cannot be resolved renders as `""`; rendering a compiled template never
//!    fails.
//!
//! 3. **Helpers win**: a registered helper shadows a data key with the same
//!    name.
//!
//! 4. **Pure render**: output depends only on the template text, the data
//!    and the helper registry state at call time.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Malformed block | Mismatched, unclosed, stray or nested tags | `Err(MalformedBlock)`, or empty output under [`MalformedBlockPolicy::Empty`] |
//! | Bad placeholder | `#{a b}` | `Err(InvalidExpression)` |
//! | Missing variable | `#{nope}` with no `nope` in scope | Renders `""` |
//! | Unknown helper call | `#{nope(x)}` | Renders `""` |

use core::fmt;
use std::borrow::Cow;
use std::rc::Rc;

use crate::helpers::HelperRegistry;
use crate::syntax::{self, BlockFault, Expr, Segment, SyntaxError};
use crate::value::{Scope, Value};

/// A render function used in place of template text.
pub type RenderFn = Rc<dyn Fn(&Scope, &HelperRegistry) -> String>;

/// What a template is compiled from.
#[derive(Clone)]
pub enum TemplateSource {
    /// Template text with `#{..}` placeholders and `{{each}}` blocks.
    Text(String),
    /// A function used directly as the render function.
    Render(RenderFn),
}

impl TemplateSource {
    /// Wrap a closure as a template source.
    pub fn render_fn(f: impl Fn(&Scope, &HelperRegistry) -> String + 'static) -> Self {
        Self::Render(Rc::new(f))
    }

    /// The template text, if this is a text source.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Render(_) => None,
        }
    }
}

impl fmt::Debug for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Render(_) => f.write_str("Render(..)"),
        }
    }
}

impl From<&str> for TemplateSource {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for TemplateSource {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// How malformed block tags are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MalformedBlockPolicy {
    /// Fail compilation with [`TemplateError::MalformedBlock`].
    #[default]
    Error,
    /// Compile successfully; every render produces an empty string.
    Empty,
}

/// Configuration for the template compiler.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TemplateConfig {
    /// Handling of malformed `{{each}}` tags.
    /// Default: `Error`
    pub malformed_blocks: MalformedBlockPolicy,

    /// HTML-escape interpolated values.
    /// Default: false (values are spliced verbatim)
    pub escape: bool,
}

/// Errors from template compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateError {
    /// Block tags do not pair up.
    MalformedBlock { fault: BlockFault, offset: usize },
    /// A `#{..}` placeholder could not be parsed.
    InvalidExpression { source: String, offset: usize },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedBlock { fault, offset } => {
                write!(f, "malformed block at byte {offset}: {fault}")
            }
            Self::InvalidExpression { source, offset } => {
                write!(f, "invalid expression '#{{{source}}}' at byte {offset}")
            }
        }
    }
}

impl std::error::Error for TemplateError {}

impl From<SyntaxError> for TemplateError {
    fn from(err: SyntaxError) -> Self {
        match err {
            SyntaxError::Block { fault, offset } => Self::MalformedBlock { fault, offset },
            SyntaxError::Expression { source, offset } => {
                Self::InvalidExpression { source, offset }
            }
        }
    }
}

/// Compiles template sources against a shared helper registry.
///
/// # Example
///
/// ```
/// use weave_template::{scope, HelperRegistry, TemplateCompiler, Value};
///
/// let helpers = HelperRegistry::new();
/// helpers.register("shout", |args| {
///     Value::from(args.first().map(|v| v.to_text().to_uppercase()).unwrap_or_default())
/// }).unwrap();
///
/// let compiler = TemplateCompiler::new(helpers);
/// let template = compiler
///     .compile("<ul>{{each items}}<li>#{shout(title)}</li>{{/each}}</ul>")
///     .unwrap();
///
/// let data = scope! {
///     "items" => vec![scope! { "title" => "x" }, scope! { "title" => "y" }],
/// };
/// assert_eq!(template.render(&data), "<ul><li>X</li><li>Y</li></ul>");
/// ```
#[derive(Debug, Clone, Default)]
pub struct TemplateCompiler {
    helpers: HelperRegistry,
    config: TemplateConfig,
}

impl TemplateCompiler {
    /// Create a compiler with the default configuration.
    #[must_use]
    pub fn new(helpers: HelperRegistry) -> Self {
        Self::with_config(helpers, TemplateConfig::default())
    }

    #[must_use]
    pub fn with_config(helpers: HelperRegistry, config: TemplateConfig) -> Self {
        Self { helpers, config }
    }

    #[must_use]
    pub fn helpers(&self) -> &HelperRegistry {
        &self.helpers
    }

    #[must_use]
    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    /// Compile a source into a [`Template`].
    pub fn compile(&self, source: impl Into<TemplateSource>) -> Result<Template, TemplateError> {
        let source = source.into();
        let program = Program::build(&source, &self.config)?;
        Ok(Template {
            source,
            program,
            helpers: self.helpers.clone(),
            config: self.config.clone(),
        })
    }
}

#[derive(Clone)]
enum Program {
    Segments(Rc<[Segment]>),
    Render(RenderFn),
    /// Malformed text compiled under [`MalformedBlockPolicy::Empty`].
    Empty,
}

impl Program {
    fn build(source: &TemplateSource, config: &TemplateConfig) -> Result<Self, TemplateError> {
        let text = match source {
            TemplateSource::Render(f) => return Ok(Self::Render(Rc::clone(f))),
            TemplateSource::Text(text) => text,
        };
        match syntax::tokenize(text) {
            Ok(segments) => {
                tracing::trace!(segments = segments.len(), "compiled template");
                Ok(Self::Segments(segments.into()))
            }
            Err(SyntaxError::Block { fault, offset })
                if config.malformed_blocks == MalformedBlockPolicy::Empty =>
            {
                tracing::warn!(%fault, offset, "malformed block; template renders empty");
                Ok(Self::Empty)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// A compiled template.
#[derive(Clone)]
pub struct Template {
    source: TemplateSource,
    program: Program,
    helpers: HelperRegistry,
    config: TemplateConfig,
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("source", &self.source)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Template {
    #[must_use]
    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    /// Replace the source and recompile.
    ///
    /// On error the previous definition is kept.
    pub fn define(&mut self, source: impl Into<TemplateSource>) -> Result<&mut Self, TemplateError> {
        let source = source.into();
        self.program = Program::build(&source, &self.config)?;
        self.source = source;
        Ok(self)
    }

    /// Render with the given data scope.
    #[must_use]
    pub fn render(&self, data: &Scope) -> String {
        match &self.program {
            Program::Render(f) => f(data, &self.helpers),
            Program::Empty => String::new(),
            Program::Segments(segments) => {
                let frame = Frame::root(data);
                let mut out = String::new();
                self.render_segments(segments, &frame, &mut out);
                out
            }
        }
    }

    fn render_segments(&self, segments: &[Segment], frame: &Frame<'_>, out: &mut String) {
        for segment in segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(expr) => {
                    let value = self.eval(expr, frame);
                    match value.as_helper() {
                        Some(helper) => self.write_value(&helper.call(&[]), out),
                        None => self.write_value(&value, out),
                    }
                }
                Segment::Block(block) => {
                    let items = frame.resolve_path(&block.path, &self.helpers);
                    let items: Vec<&Value> = match items.as_deref() {
                        Some(Value::List(items)) => items.iter().collect(),
                        Some(Value::Map(map)) => map.values().collect(),
                        _ => Vec::new(),
                    };
                    for (index, item) in items.into_iter().enumerate() {
                        let child = frame.child(item, index);
                        self.render_segments(&block.body, &child, out);
                    }
                }
            }
        }
    }

    fn eval<'a>(&self, expr: &'a Expr, frame: &'a Frame<'a>) -> Cow<'a, Value> {
        match expr {
            Expr::Literal(value) => Cow::Borrowed(value),
            Expr::Path(path) => frame
                .resolve_path(path, &self.helpers)
                .unwrap_or(Cow::Owned(Value::Null)),
            Expr::Call { name, args } => {
                let callee = frame.resolve(name, &self.helpers);
                let Some(helper) = callee.as_deref().and_then(Value::as_helper) else {
                    return Cow::Owned(Value::Null);
                };
                let args: Vec<Value> = args
                    .iter()
                    .map(|arg| self.eval(arg, frame).into_owned())
                    .collect();
                Cow::Owned(helper.call(&args))
            }
        }
    }

    fn write_value(&self, value: &Value, out: &mut String) {
        let text = value.to_text();
        if self.config.escape {
            escape_into(&text, out);
        } else {
            out.push_str(&text);
        }
    }
}

/// Lexical frame: the root data scope, or one iteration of a block.
struct Frame<'a> {
    data: &'a Scope,
    item: Option<(&'a Value, usize)>,
    parent: Option<&'a Frame<'a>>,
}

impl<'a> Frame<'a> {
    fn root(data: &'a Scope) -> Self {
        Self {
            data,
            item: None,
            parent: None,
        }
    }

    fn child(&'a self, item: &'a Value, index: usize) -> Self {
        Self {
            data: self.data,
            item: Some((item, index)),
            parent: Some(self),
        }
    }

    /// Resolve the first path segment: helpers, then the iteration item,
    /// then enclosing frames, then the root data.
    fn resolve(&self, name: &str, helpers: &HelperRegistry) -> Option<Cow<'a, Value>> {
        if let Some(helper) = helpers.get(name) {
            return Some(Cow::Owned(Value::Helper(helper)));
        }
        self.lookup(name)
    }

    fn lookup(&self, name: &str) -> Option<Cow<'a, Value>> {
        if let Some((item, index)) = self.item {
            match name {
                "this" => return Some(Cow::Borrowed(item)),
                "@index" => return Some(Cow::Owned(Value::from(index))),
                _ => {}
            }
            if let Some(value) = item.as_map().and_then(|m| m.get(name)) {
                return Some(Cow::Borrowed(value));
            }
        }
        match self.parent {
            Some(parent) => parent.lookup(name),
            None => self.data.get(name).map(Cow::Borrowed),
        }
    }

    fn resolve_path(&self, path: &[String], helpers: &HelperRegistry) -> Option<Cow<'a, Value>> {
        let (first, rest) = path.split_first()?;
        let mut value = self.resolve(first, helpers)?;
        for segment in rest {
            value = match value {
                Cow::Borrowed(v) => Cow::Borrowed(v.member(segment)?),
                Cow::Owned(v) => Cow::Owned(v.member(segment)?.clone()),
            };
        }
        Some(value)
    }
}

fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}
