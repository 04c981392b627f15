//! Markup serialization for [`Fragment`] nodes.
//!
//! Output re-parses to an equivalent tree: text and attribute values are
//! escaped, void elements get no end tag, and raw-text content is written
//! verbatim.

use crate::node::{Fragment, NodeId, NodeKind};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text children serialize without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script",
    "style",
    "xmp",
    "iframe",
    "noembed",
    "noframes",
    "noscript",
    "plaintext",
];

/// Elements written without an end tag.
#[must_use]
pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

#[must_use]
pub fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

impl Fragment {
    /// Markup of the whole fragment.
    #[must_use]
    pub fn to_markup(&self) -> String {
        self.inner_markup(NodeId::ROOT)
    }

    /// Markup of `id` including its own tags.
    #[must_use]
    pub fn outer_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    /// Markup of the children of `id`.
    #[must_use]
    pub fn inner_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_children(id, &mut out);
        out
    }

    fn write_children(&self, id: NodeId, out: &mut String) {
        for &child in self.children(id) {
            self.write_node(child, out);
        }
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        match node.kind {
            NodeKind::Root => self.write_children(id, out),
            NodeKind::Text => {
                let raw = node
                    .parent
                    .and_then(|p| self.get(p))
                    .is_some_and(|p| is_raw_text(&p.name));
                if raw {
                    out.push_str(&node.data);
                } else {
                    escape_text_into(&node.data, out);
                }
            }
            NodeKind::Comment => {
                out.push_str("<!--");
                out.push_str(&node.data);
                out.push_str("-->");
            }
            NodeKind::Directive => {
                out.push('<');
                out.push_str(&node.data);
                out.push('>');
            }
            NodeKind::Tag => {
                let attrs = node
                    .attrs
                    .iter()
                    .map(|a| (a.name.as_str(), a.value.as_str()));
                write_start_tag(&node.name, attrs, out);
                if is_void(&node.name) {
                    return;
                }
                self.write_children(id, out);
                write_end_tag(&node.name, out);
            }
        }
    }
}

/// Write `<name a="v" b>`; empty values become bare attribute names.
pub fn write_start_tag<'a>(
    name: &str,
    attrs: impl IntoIterator<Item = (&'a str, &'a str)>,
    out: &mut String,
) {
    out.push('<');
    out.push_str(name);
    for (key, value) in attrs {
        out.push(' ');
        out.push_str(key);
        if !value.is_empty() {
            out.push_str("=\"");
            escape_attr_into(value, out);
            out.push('"');
        }
    }
    out.push('>');
}

pub fn write_end_tag(name: &str, out: &mut String) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

pub fn escape_text_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

pub fn escape_attr_into(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}
