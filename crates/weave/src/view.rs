//! Views: one template bound to one live host element.
//!
//! A [`View`] renders its [`Template`] against a model [`Scope`], keeps the
//! result under a host element in a shared [`Document`], and converges that
//! host on every [`View::update`] through the document's [`PatchCompiler`].
//!
//! # Invariants
//!
//! 1. The host element is created by the view and never freed by it;
//!    [`View::destroy`] only detaches it.
//! 2. [`View::update`] merges into the model: nested maps merge key by key,
//!    every other value (lists included) replaces what was there.
//! 3. Several views sharing one [`Document`] share its patch cache, so equal
//!    renders compile once.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Parent is not an element | text or stale handle | `ViewError::InvalidArgument` |
//! | Rendered markup has a comment | template text | `ViewError::Patch`, host unchanged |
//! | Redefined template is malformed | `{{each}}` fault | `ViewError::Template`, old template kept |
//!
//! Root-level text in the rendered markup is imported by [`View::new`] but
//! skipped by patches, so it disappears on the first update.

use core::fmt;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use weave_dom::{Dom, DomError, NodeId};
use weave_patch::{CacheStats, PatchCompiler, PatchConfig, PatchError, PatchSource};
use weave_template::{Map, Scope, Template, TemplateCompiler, TemplateError, TemplateSource, Value};

// =============================================================================
// Configuration
// =============================================================================

/// View construction options.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewConfig {
    /// Tag of the host element the view renders into.
    ///
    /// Default: `"div"`.
    pub host_tag: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            host_tag: "div".to_string(),
        }
    }
}

impl ViewConfig {
    /// Replace an empty or non-alphanumeric host tag with the default.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let valid = !self.host_tag.is_empty()
            && self
                .host_tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            self.host_tag = Self::default().host_tag;
        }
        self.host_tag.make_ascii_lowercase();
        self
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors from view operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewError {
    InvalidArgument(String),
    Template(TemplateError),
    Patch(PatchError),
    Dom(DomError),
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Template(err) => write!(f, "template error: {err}"),
            Self::Patch(err) => write!(f, "patch error: {err}"),
            Self::Dom(err) => write!(f, "dom error: {err}"),
        }
    }
}

impl std::error::Error for ViewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidArgument(_) => None,
            Self::Template(err) => Some(err),
            Self::Patch(err) => Some(err),
            Self::Dom(err) => Some(err),
        }
    }
}

impl From<TemplateError> for ViewError {
    fn from(err: TemplateError) -> Self {
        Self::Template(err)
    }
}

impl From<PatchError> for ViewError {
    fn from(err: PatchError) -> Self {
        Self::Patch(err)
    }
}

impl From<DomError> for ViewError {
    fn from(err: DomError) -> Self {
        Self::Dom(err)
    }
}

// =============================================================================
// Document
// =============================================================================

/// A live tree and the patch compiler that converges it.
///
/// Cloning shares both; views created from clones patch the same tree
/// through the same cache.
#[derive(Debug, Clone, Default)]
pub struct Document {
    dom: Rc<RefCell<Dom>>,
    compiler: Rc<RefCell<PatchCompiler>>,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_patch_config(config: PatchConfig) -> Self {
        Self {
            dom: Rc::default(),
            compiler: Rc::new(RefCell::new(PatchCompiler::with_config(config))),
        }
    }

    /// Borrow the tree.
    ///
    /// # Panics
    ///
    /// Panics if the tree is mutably borrowed, as [`RefCell::borrow`] does.
    #[must_use]
    pub fn dom(&self) -> Ref<'_, Dom> {
        self.dom.borrow()
    }

    /// Mutably borrow the tree.
    ///
    /// # Panics
    ///
    /// Panics if the tree is already borrowed.
    #[must_use]
    pub fn dom_mut(&self) -> RefMut<'_, Dom> {
        self.dom.borrow_mut()
    }

    /// Create a detached element in the tree.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.dom.borrow_mut().create_element(tag)
    }

    #[must_use]
    pub fn patch_stats(&self) -> CacheStats {
        self.compiler.borrow().stats()
    }

    /// Whether the shared cache holds a patch for `markup`.
    #[must_use]
    pub fn has_cached_patch(&self, markup: &str) -> bool {
        self.compiler.borrow().contains(markup)
    }

    /// Compile (or fetch) the patch for `source` and apply it to `target`.
    fn converge(&self, target: NodeId, source: PatchSource<'_>) -> Result<(), ViewError> {
        let patch = self.compiler.borrow_mut().create_patch(source)?;
        patch.apply(&mut *self.dom.borrow_mut(), &target, None)?;
        Ok(())
    }
}

// =============================================================================
// View
// =============================================================================

/// A template rendered into a host element.
#[derive(Debug)]
pub struct View {
    document: Document,
    template: Template,
    model: Scope,
    host: NodeId,
}

impl View {
    /// Render `template` against `model` into a fresh, detached `<div>` host.
    pub fn new(document: &Document, template: Template, model: Scope) -> Result<Self, ViewError> {
        Self::with_config(document, template, model, &ViewConfig::default())
    }

    pub fn with_config(
        document: &Document,
        template: Template,
        model: Scope,
        config: &ViewConfig,
    ) -> Result<Self, ViewError> {
        let config = config.clone().sanitized();
        let markup = template.render(&model);
        let host = {
            let mut dom = document.dom_mut();
            let host = dom.create_element(&config.host_tag);
            dom.parse_into(host, &markup)?;
            host
        };
        tracing::debug!(%host, bytes = markup.len(), "view created");
        Ok(Self {
            document: document.clone(),
            template,
            model,
            host,
        })
    }

    /// Compile `source` with `compiler` and build a view from it.
    pub fn from_source(
        document: &Document,
        compiler: &TemplateCompiler,
        source: impl Into<TemplateSource>,
        model: Scope,
    ) -> Result<Self, ViewError> {
        let template = compiler.compile(source)?;
        Self::new(document, template, model)
    }

    #[must_use]
    pub fn host(&self) -> NodeId {
        self.host
    }

    #[must_use]
    pub fn model(&self) -> &Scope {
        &self.model
    }

    #[must_use]
    pub fn template(&self) -> &Template {
        &self.template
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Append the host to `parent` unless `parent` already contains it.
    pub fn render(&mut self, parent: NodeId) -> Result<&mut Self, ViewError> {
        {
            let mut dom = self.document.dom_mut();
            if !dom.is_element(parent) {
                return Err(ViewError::InvalidArgument(format!(
                    "expecting an element parent, got {parent}"
                )));
            }
            if !dom.contains(parent, self.host) {
                dom.append_child(parent, self.host)?;
            }
        }
        Ok(self)
    }

    /// Merge `data` into the model, re-render and patch the host.
    pub fn update(&mut self, data: Scope) -> Result<&mut Self, ViewError> {
        merge(&mut self.model, data);
        self.refresh()
    }

    /// Replace the template, then re-render and patch the host.
    ///
    /// A source that fails to compile leaves the view untouched.
    pub fn define(&mut self, source: impl Into<TemplateSource>) -> Result<&mut Self, ViewError> {
        self.template.define(source)?;
        self.refresh()
    }

    /// Patch the host's children to match `source`.
    pub fn patch<'s>(&mut self, source: impl Into<PatchSource<'s>>) -> Result<&mut Self, ViewError> {
        self.document.converge(self.host, source.into())?;
        Ok(self)
    }

    /// Detach the host from its parent. The view stays usable.
    pub fn destroy(&mut self) -> Result<&mut Self, ViewError> {
        self.document.dom_mut().remove(self.host)?;
        tracing::debug!(host = %self.host, "view destroyed");
        Ok(self)
    }

    /// Markup currently under the host.
    #[must_use]
    pub fn to_markup(&self) -> String {
        self.document.dom().inner_markup(self.host)
    }

    fn refresh(&mut self) -> Result<&mut Self, ViewError> {
        let markup = self.template.render(&self.model);
        self.document
            .converge(self.host, PatchSource::Markup(&markup))?;
        tracing::debug!(host = %self.host, bytes = markup.len(), "view updated");
        Ok(self)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markup())
    }
}

/// Merge `data` into `model`, recursing where both sides hold a map.
fn merge(model: &mut Map, data: Map) {
    for (key, value) in data {
        match value {
            Value::Map(incoming) => match model.get_mut(&key) {
                Some(Value::Map(existing)) => merge(existing, incoming),
                _ => {
                    model.insert(key, Value::Map(incoming));
                }
            },
            value => {
                model.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use weave_template::{HelperRegistry, scope};

    fn compile(source: &str) -> Template {
        TemplateCompiler::new(HelperRegistry::new())
            .compile(source)
            .unwrap()
    }

    #[test]
    fn merge_recurses_into_maps() {
        let mut model = scope! {
            "user" => scope! { "name" => "Ada", "role" => "admin" },
            "tags" => vec!["a", "b"],
        };
        merge(
            &mut model,
            scope! {
                "user" => scope! { "name" => "Grace" },
                "tags" => vec!["c"],
            },
        );
        assert_eq!(
            model,
            scope! {
                "user" => scope! { "name" => "Grace", "role" => "admin" },
                "tags" => vec!["c"],
            }
        );
    }

    #[test]
    fn merge_replaces_scalars_with_maps() {
        let mut model = scope! { "x" => 1 };
        merge(&mut model, scope! { "x" => scope! { "y" => 2 } });
        assert_eq!(model, scope! { "x" => scope! { "y" => 2 } });
    }

    #[test]
    fn config_sanitizes_host_tag() {
        let config = ViewConfig {
            host_tag: String::new(),
        };
        assert_eq!(config.sanitized().host_tag, "div");
        let config = ViewConfig {
            host_tag: "My-View".into(),
        };
        assert_eq!(config.sanitized().host_tag, "my-view");
        let config = ViewConfig {
            host_tag: "<b>".into(),
        };
        assert_eq!(config.sanitized().host_tag, "div");
    }

    #[test]
    fn new_renders_into_a_detached_host() {
        let document = Document::new();
        let view = View::new(&document, compile("<p>#{x}</p>"), scope! { "x" => 1 }).unwrap();
        assert_eq!(view.to_markup(), "<p>1</p>");
        assert_eq!(document.dom().parent(view.host()), None);
        assert_eq!(document.dom().tag(view.host()), Some("div"));
    }

    #[test]
    fn render_rejects_text_parents() {
        let document = Document::new();
        let mut view = View::new(&document, compile("<p></p>"), Scope::new()).unwrap();
        let text = document.dom_mut().create_text("t");
        assert!(matches!(
            view.render(text),
            Err(ViewError::InvalidArgument(_))
        ));
    }

    #[test]
    fn errors_chain_their_source() {
        use std::error::Error;
        let err = ViewError::from(DomError::UnbalancedClose { tag: "p".into() });
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "dom error: unbalanced close of <p>");
        assert!(ViewError::InvalidArgument("x".into()).source().is_none());
    }
}
