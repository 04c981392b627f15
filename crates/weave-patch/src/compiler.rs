//! Markup to instruction-stream compiler.
//!
//! [`PatchCompiler::create_patch`] parses a source once, walks the parsed
//! fragment in pre-order and emits one [`Instruction`] per element boundary
//! and text run. The result is cached by source content, so asking for the
//! same markup again returns the very same [`Patch`].
//!
//! # Invariants
//!
//! 1. **Parse once**: a cached source is never handed to the parser again.
//! 2. **Balanced output**: every `OpenElement` has a matching `CloseElement`
//!    later in the stack, properly nested.
//! 3. **Authored ids win**: an element's non-empty `id` attribute is its key
//!    under every identity strategy, with `@` doubled so it never meets a
//!    structural key.
//! 4. **All or nothing**: a compile that fails leaves the cache untouched.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Comment or directive in source | `<!-- x -->` | `PatchError::UnhandledNodeKind`, nothing cached |
//! | Parser error | nesting limit | `PatchError::Parse`, nothing cached |
//! | Root-level text | `a<b></b>` | skipped silently |

use core::fmt;
use std::time::Instant;

use weave_markup::{Fragment, FragmentParser, MarkupParser, NodeId, NodeKind, ParseError};

use crate::cache::{CacheStats, PatchCache};
use crate::config::{IdentityStrategy, PatchConfig, authored_key};
use crate::instruction::{Instruction, InstructionStack};
use crate::patch::Patch;

// =============================================================================
// Sources and errors
// =============================================================================

/// Anything that can describe itself as markup, tags included.
pub trait OuterMarkup {
    fn outer_markup(&self) -> String;
}

/// Input to the patch compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchSource<'a> {
    /// Markup text.
    Markup(&'a str),
    /// Outer markup captured from an element.
    Element(String),
}

impl<'a> PatchSource<'a> {
    /// Capture the outer markup of `element`.
    pub fn element(element: &impl OuterMarkup) -> Self {
        Self::Element(element.outer_markup())
    }

    /// The markup this source stands for; also its cache key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Markup(text) => text,
            Self::Element(markup) => markup,
        }
    }

    fn into_key(self) -> String {
        match self {
            Self::Markup(text) => text.to_string(),
            Self::Element(markup) => markup,
        }
    }
}

impl<'a> From<&'a str> for PatchSource<'a> {
    fn from(text: &'a str) -> Self {
        Self::Markup(text)
    }
}

impl<'a> From<&'a String> for PatchSource<'a> {
    fn from(text: &'a String) -> Self {
        Self::Markup(text)
    }
}

/// Errors from patch compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// A node kind with no instruction form, such as a comment.
    UnhandledNodeKind {
        kind: NodeKind,
        /// Position path of the offending node (`@0.1`).
        path: String,
    },
    /// The parser rejected the source.
    Parse(ParseError),
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnhandledNodeKind { kind, path } => {
                write!(f, "unhandled node kind '{kind}' at {path}")
            }
            Self::Parse(err) => write!(f, "parse error: {err}"),
        }
    }
}

impl std::error::Error for PatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::UnhandledNodeKind { .. } => None,
        }
    }
}

impl From<ParseError> for PatchError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

// =============================================================================
// PatchCompiler
// =============================================================================

/// Compiles markup into cached [`Patch`]es.
#[derive(Debug)]
pub struct PatchCompiler<P = FragmentParser> {
    parser: P,
    config: PatchConfig,
    cache: PatchCache,
}

impl Default for PatchCompiler<FragmentParser> {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchCompiler<FragmentParser> {
    /// Compiler using the built-in parser and default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parser(FragmentParser::new(), PatchConfig::default())
    }

    #[must_use]
    pub fn with_config(config: PatchConfig) -> Self {
        Self::with_parser(FragmentParser::new(), config)
    }
}

impl<P: MarkupParser> PatchCompiler<P> {
    pub fn with_parser(parser: P, config: PatchConfig) -> Self {
        let cache = PatchCache::new(config.cache_capacity);
        Self {
            parser,
            config,
            cache,
        }
    }

    #[must_use]
    pub fn parser(&self) -> &P {
        &self.parser
    }

    #[must_use]
    pub fn config(&self) -> &PatchConfig {
        &self.config
    }

    #[must_use]
    pub fn cache(&self) -> &PatchCache {
        &self.cache
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Return the cached patch for `source`, compiling and caching it first
    /// if needed.
    pub fn create_patch<'s>(
        &mut self,
        source: impl Into<PatchSource<'s>>,
    ) -> Result<Patch, PatchError> {
        let source = source.into();
        if let Some(patch) = self.cache.lookup(source.as_str()) {
            return Ok(patch);
        }
        let patch = Patch::new(self.compile_stack(source.as_str())?);
        self.cache.insert(source.into_key(), patch.clone());
        Ok(patch)
    }

    /// `true` when `source` has **no** cached patch yet, i.e. the next
    /// `create_patch` will compile. [`contains`](Self::contains) is the
    /// positive form.
    #[must_use]
    pub fn has_patch<'s>(&self, source: impl Into<PatchSource<'s>>) -> bool {
        !self.contains(source)
    }

    /// `true` when `source` has a cached patch.
    #[must_use]
    pub fn contains<'s>(&self, source: impl Into<PatchSource<'s>>) -> bool {
        self.cache.contains(source.into().as_str())
    }

    /// The cached patch for `source`, without compiling.
    #[must_use]
    pub fn get_patch<'s>(&self, source: impl Into<PatchSource<'s>>) -> Option<Patch> {
        self.cache.peek(source.into().as_str())
    }

    /// Compile `markup` without consulting or filling the cache.
    pub fn compile_stack(&self, markup: &str) -> Result<InstructionStack, PatchError> {
        let _span = tracing::debug_span!("compile_patch", bytes = markup.len()).entered();
        let started = Instant::now();
        let fragment = self.parser.parse_fragment(markup)?;
        let mut emitter = Emitter {
            fragment: &fragment,
            config: &self.config,
            anchor: String::new(),
            path: Vec::new(),
            out: InstructionStack::new(),
        };
        emitter.children(NodeId::ROOT)?;
        let stack = emitter.out;
        tracing::debug!(
            instructions = stack.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "compiled patch"
        );
        Ok(stack)
    }
}

// =============================================================================
// Emitter
// =============================================================================

struct Emitter<'a> {
    fragment: &'a Fragment,
    config: &'a PatchConfig,
    /// Authored id of the nearest keyed ancestor, empty at the root.
    anchor: String,
    /// Element positions from the anchor down to the node being visited.
    path: Vec<usize>,
    out: InstructionStack,
}

impl Emitter<'_> {
    fn children(&mut self, parent: NodeId) -> Result<(), PatchError> {
        let fragment = self.fragment;
        let top_level = parent == NodeId::ROOT;
        let mut position = 0;
        for &child in fragment.children(parent) {
            let node = &fragment[child];
            match node.kind {
                NodeKind::Tag => {
                    self.path.push(position);
                    position += 1;
                    self.element(child)?;
                    self.path.pop();
                }
                NodeKind::Text => {
                    if !top_level && !node.data.is_empty() {
                        self.out.push(Instruction::Text {
                            content: node.data.clone(),
                        });
                    }
                }
                kind @ (NodeKind::Comment | NodeKind::Directive | NodeKind::Root) => {
                    self.path.push(position);
                    let path = self.path_key();
                    self.path.pop();
                    tracing::debug!(%kind, path = path.as_str(), "unhandled node kind");
                    return Err(PatchError::UnhandledNodeKind { kind, path });
                }
            }
        }
        Ok(())
    }

    fn element(&mut self, id: NodeId) -> Result<(), PatchError> {
        let fragment = self.fragment;
        let node = &fragment[id];
        let authored = node
            .id()
            .filter(|id| !id.is_empty())
            .map(|id| authored_key(id).into_owned());
        let key = match &authored {
            Some(authored) => authored.clone(),
            None => match self.config.identity {
                IdentityStrategy::Generated => generated_key(),
                IdentityStrategy::Structural => self.path_key(),
            },
        };
        let attrs = node
            .attrs
            .iter()
            .filter(|a| !(self.config.drop_empty_attributes && a.value.is_empty()))
            .cloned()
            .collect();
        self.out.push(Instruction::OpenElement {
            tag: node.name.clone(),
            key,
            attrs,
        });
        match authored {
            Some(authored) => {
                let anchor = std::mem::replace(&mut self.anchor, authored);
                let path = std::mem::take(&mut self.path);
                let result = self.children(id);
                self.anchor = anchor;
                self.path = path;
                result?;
            }
            None => self.children(id)?,
        }
        self.out.push(Instruction::CloseElement {
            tag: node.name.clone(),
        });
        Ok(())
    }

    fn path_key(&self) -> String {
        let mut key = self.anchor.clone();
        key.push('@');
        for (i, position) in self.path.iter().enumerate() {
            if i > 0 {
                key.push('.');
            }
            key.push_str(&position.to_string());
        }
        key
    }
}

/// 32 lowercase hex digits, unique per call.
fn generated_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
