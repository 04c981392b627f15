//! Fragment parsing backed by html5ever.
//!
//! [`FragmentParser`] runs the HTML5 fragment algorithm (html5ever into an
//! [`RcDom`]) and copies the result into a [`Fragment`] arena. Tree shape is
//! whatever an HTML5 parser builds: implied end tags close `<p>` and `<li>`,
//! misnested formatting elements are repaired, entities are decoded, and
//! table parts outside a table are dropped.
//!
//! # Invariants
//!
//! 1. Void elements (`br`, `img`, `input`, ...) never receive children.
//! 2. The contents of a `<template>` become the element's children.
//! 3. The first occurrence of a duplicated attribute wins.
//! 4. Adjacent text is merged into one node.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Nesting deeper than `max_depth` | pathological input | `ParseError::DepthLimit` |
//! | Unknown entity | `&bogus;` | kept literally |
//! | Unclosed element | `<div><p>x` | closed at end of input |
//! | `<!DOCTYPE>` in a fragment | document markup | ignored |

use core::fmt;

use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, parse_fragment};
use markup5ever::{LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::node::{Attribute, Fragment, NodeId};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

// =============================================================================
// Configuration and errors
// =============================================================================

/// Parser settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParserConfig {
    /// Maximum element nesting depth.
    ///
    /// Default: 512. Zero is replaced by the default.
    pub max_depth: usize,
    /// Element the fragment is parsed as the content of.
    ///
    /// Default: `"body"`. Empty is replaced by the default.
    pub context: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: 512,
            context: "body".to_string(),
        }
    }
}

impl ParserConfig {
    /// Return a copy with out-of-range values replaced by defaults.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let mut config = self.clone();
        if config.max_depth == 0 {
            config.max_depth = Self::default().max_depth;
        }
        if config.context.trim().is_empty() {
            config.context = Self::default().context;
        }
        config.context = config.context.trim().to_ascii_lowercase();
        config
    }
}

/// Errors from fragment parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Elements nested deeper than the configured limit.
    DepthLimit { limit: usize, tag: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepthLimit { limit, tag } => {
                write!(f, "nesting exceeds {limit} levels at <{tag}>")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Anything that can turn a markup string into a [`Fragment`].
pub trait MarkupParser {
    fn parse_fragment(&self, markup: &str) -> Result<Fragment, ParseError>;
}

impl<P: MarkupParser + ?Sized> MarkupParser for &P {
    fn parse_fragment(&self, markup: &str) -> Result<Fragment, ParseError> {
        (**self).parse_fragment(markup)
    }
}

// =============================================================================
// FragmentParser
// =============================================================================

/// The built-in HTML5 parser.
#[derive(Debug, Clone, Default)]
pub struct FragmentParser {
    config: ParserConfig,
}

impl FragmentParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config: config.sanitized(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    fn parse_dom(&self, markup: &str) -> RcDom {
        let context = QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from(self.config.context.as_str()),
        );
        parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new()).one(markup)
    }

    /// Copy the children of `handle` under `parent`.
    fn import_children(
        &self,
        handle: &Handle,
        fragment: &mut Fragment,
        parent: NodeId,
        depth: usize,
    ) -> Result<(), ParseError> {
        for child in handle.children.borrow().iter() {
            match &child.data {
                NodeData::Element {
                    name,
                    attrs,
                    template_contents,
                    ..
                } => {
                    if depth >= self.config.max_depth {
                        return Err(ParseError::DepthLimit {
                            limit: self.config.max_depth,
                            tag: name.local.to_string(),
                        });
                    }
                    let attrs = attrs
                        .borrow()
                        .iter()
                        .map(|a| Attribute::new(attribute_name(&a.name), &*a.value))
                        .collect();
                    let id = fragment.append_element(parent, &*name.local, attrs);
                    match template_contents.borrow().as_ref() {
                        Some(contents) => self.import_children(contents, fragment, id, depth + 1)?,
                        None => self.import_children(child, fragment, id, depth + 1)?,
                    }
                }
                NodeData::Text { contents } => {
                    fragment.append_text(parent, &contents.borrow());
                }
                NodeData::Comment { contents } => {
                    fragment.append_comment(parent, contents);
                }
                NodeData::Doctype { name, .. } => {
                    fragment.append_directive(parent, &format!("!DOCTYPE {}", &**name));
                }
                NodeData::ProcessingInstruction { target, contents } => {
                    fragment.append_directive(parent, &format!("?{} {}", &**target, &**contents));
                }
                NodeData::Document => {}
            }
        }
        Ok(())
    }
}

impl MarkupParser for FragmentParser {
    fn parse_fragment(&self, markup: &str) -> Result<Fragment, ParseError> {
        let dom = self.parse_dom(markup);
        let mut fragment = Fragment::new();
        // The fragment algorithm wraps its output in a synthetic <html>.
        for wrapper in dom.document.children.borrow().iter() {
            self.import_children(wrapper, &mut fragment, NodeId::ROOT, 0)?;
        }
        tracing::trace!(
            bytes = markup.len(),
            nodes = fragment.len(),
            errors = dom.errors.len(),
            "parsed fragment"
        );
        Ok(fragment)
    }
}

/// `prefix:local` for namespaced attributes such as `xlink:href`.
fn attribute_name(name: &QualName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{}:{}", &**prefix, &*name.local),
        None => name.local.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn parse(markup: &str) -> Fragment {
        FragmentParser::new().parse_fragment(markup).unwrap()
    }

    fn names(fragment: &Fragment, id: NodeId) -> Vec<String> {
        fragment
            .children(id)
            .iter()
            .map(|&c| match fragment[c].kind {
                NodeKind::Tag => fragment[c].name.clone(),
                kind => format!("#{kind}"),
            })
            .collect()
    }

    #[test]
    fn nested_elements_and_text() {
        let fragment = parse("<div id=\"k\"><span>hi</span> there</div>");
        let div = fragment.top_level()[0];
        assert_eq!(fragment[div].id(), Some("k"));
        assert_eq!(names(&fragment, div), vec!["span", "#text"]);
        let span = fragment.children(div)[0];
        assert_eq!(fragment[fragment.children(span)[0]].data, "hi");
    }

    #[test]
    fn implied_end_tags_make_siblings() {
        let fragment = parse("<ul><li>a<li>b</ul><p>x<p>y");
        assert_eq!(names(&fragment, NodeId::ROOT), vec!["ul", "p", "p"]);
        let ul = fragment.top_level()[0];
        assert_eq!(names(&fragment, ul), vec!["li", "li"]);
    }

    #[test]
    fn void_elements_have_no_children() {
        let fragment = parse("<p>a<br>b<img src=x.png>c</p>");
        let p = fragment.top_level()[0];
        assert_eq!(
            names(&fragment, p),
            vec!["#text", "br", "#text", "img", "#text"]
        );
    }

    #[test]
    fn unmatched_end_tags_are_ignored() {
        let fragment = parse("<div></span>x</div></div>tail");
        assert_eq!(names(&fragment, NodeId::ROOT), vec!["div", "#text"]);
        let div = fragment.top_level()[0];
        assert_eq!(names(&fragment, div), vec!["#text"]);
    }

    #[test]
    fn unclosed_elements_close_at_end_of_input() {
        let fragment = parse("<div><p>x");
        let div = fragment.top_level()[0];
        assert_eq!(names(&fragment, div), vec!["p"]);
    }

    #[test]
    fn attributes_quoted_unquoted_and_boolean() {
        let fragment = parse("<input type=checkbox checked value='a b' data-x=\"&lt;\" TYPE=dup>");
        let input = &fragment[fragment.top_level()[0]];
        let attrs: Vec<(&str, &str)> = input
            .attrs
            .iter()
            .map(|a| (a.name.as_str(), a.value.as_str()))
            .collect();
        assert_eq!(
            attrs,
            vec![
                ("type", "checkbox"),
                ("checked", ""),
                ("value", "a b"),
                ("data-x", "<")
            ]
        );
    }

    #[test]
    fn html_names_are_lowercased() {
        let fragment = parse("<DIV Class=a></div>");
        let div = &fragment[fragment.top_level()[0]];
        assert_eq!(div.name, "div");
        assert_eq!(div.attr("class"), Some("a"));
    }

    #[test]
    fn comments_are_kept_and_doctypes_dropped() {
        let fragment = parse("<!DOCTYPE html><!-- note --><div></div>");
        assert_eq!(names(&fragment, NodeId::ROOT), vec!["#comment", "div"]);
        assert_eq!(fragment[fragment.top_level()[0]].data, " note ");
    }

    #[test]
    fn raw_text_elements_keep_content() {
        let fragment =
            parse("<script>if (a < b) { x = '<div>'; }</SCRIPT><textarea>&lt;b&gt;</textarea>");
        let script = fragment.top_level()[0];
        assert_eq!(
            fragment[fragment.children(script)[0]].data,
            "if (a < b) { x = '<div>'; }"
        );
        let textarea = fragment.top_level()[1];
        assert_eq!(fragment[fragment.children(textarea)[0]].data, "<b>");
    }

    #[test]
    fn template_contents_become_children() {
        let fragment = parse("<template><b>x</b></template>");
        let template = fragment.top_level()[0];
        assert_eq!(names(&fragment, template), vec!["b"]);
    }

    #[test]
    fn entities_decode() {
        let fragment = parse("&amp;&lt;&gt;&quot;&#39;&#x41;&nbsp;&bogus;");
        assert_eq!(fragment.top_level().len(), 1);
        assert_eq!(
            fragment[fragment.top_level()[0]].data,
            "&<>\"'A\u{a0}&bogus;"
        );
    }

    #[test]
    fn context_element_changes_the_tree() {
        let parser = FragmentParser::with_config(ParserConfig {
            context: "TBODY".into(),
            ..ParserConfig::default()
        });
        assert_eq!(parser.config().context, "tbody");
        let fragment = parser.parse_fragment("<tr><td>x</td></tr>").unwrap();
        assert_eq!(names(&fragment, NodeId::ROOT), vec!["tr"]);

        // Table rows are dropped outside a table.
        let fragment = parse("<tr><td>x</td></tr>");
        assert_eq!(names(&fragment, NodeId::ROOT), vec!["#text"]);
    }

    #[test]
    fn depth_limit_is_an_error() {
        let parser = FragmentParser::with_config(ParserConfig {
            max_depth: 3,
            ..ParserConfig::default()
        });
        assert!(parser.parse_fragment("<a><b><i></i></b></a>").is_ok());
        let err = parser
            .parse_fragment("<div><div><div><div></div></div></div></div>")
            .unwrap_err();
        assert_eq!(
            err,
            ParseError::DepthLimit {
                limit: 3,
                tag: "div".into()
            }
        );
    }

    #[test]
    fn config_is_sanitized() {
        let parser = FragmentParser::with_config(ParserConfig {
            max_depth: 0,
            context: "  ".into(),
        });
        assert_eq!(parser.config(), &ParserConfig::default());
    }

    proptest! {
        #[test]
        fn never_panics(markup in "[<>/a-z =\"'!&;#x0-9-]{0,64}") {
            let _ = FragmentParser::new().parse_fragment(&markup);
        }

        #[test]
        fn parent_links_are_consistent(markup in "(<[a-c]>|</[a-c]>|<p>|<li>|[xy ]){0,24}") {
            let fragment = FragmentParser::new().parse_fragment(&markup).unwrap();
            for id in fragment.descendants(NodeId::ROOT) {
                for &child in fragment.children(id) {
                    prop_assert_eq!(fragment.parent(child), Some(id));
                }
            }
        }
    }
}
