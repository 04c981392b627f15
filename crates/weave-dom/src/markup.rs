//! Markup import and serialization for [`Dom`] nodes.

use weave_markup::{
    Fragment, MarkupParser, NodeId as FragmentNode, NodeKind, escape_text_into, is_raw_text,
    is_void, write_end_tag, write_start_tag,
};
use weave_patch::{OuterMarkup, authored_key};

use crate::dom::{Dom, DomError, Element, NodeData, NodeId};

impl Dom {
    /// Parse `markup` and append the resulting nodes to `parent`.
    ///
    /// Imported elements take their `id` attribute as key, escaped with
    /// [`authored_key`]. Directives are dropped. Returns the appended
    /// top-level nodes.
    pub fn parse_into(&mut self, parent: NodeId, markup: &str) -> Result<Vec<NodeId>, DomError> {
        self.require_element(parent)?;
        let fragment = self.parser.parse_fragment(markup)?;
        let mut added = Vec::with_capacity(fragment.top_level().len());
        for &child in fragment.top_level() {
            if let Some(id) = self.import(&fragment, child) {
                self.append_child(parent, id)?;
                added.push(id);
            }
        }
        Ok(added)
    }

    fn import(&mut self, fragment: &Fragment, source: FragmentNode) -> Option<NodeId> {
        let node = &fragment[source];
        let data = match node.kind {
            NodeKind::Tag => NodeData::Element(Element {
                tag: node.name.clone(),
                key: node
                    .id()
                    .filter(|id| !id.is_empty())
                    .map(|id| authored_key(id).into_owned()),
                attrs: node.attrs.clone(),
            }),
            NodeKind::Text => NodeData::Text(node.data.clone()),
            NodeKind::Comment => NodeData::Comment(node.data.clone()),
            NodeKind::Directive | NodeKind::Root => return None,
        };
        let id = self.alloc(data);
        for &child in fragment.children(source) {
            if let Some(child) = self.import(fragment, child) {
                self.insert_child(id, usize::MAX, child);
            }
        }
        Some(id)
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
        for &child in self.children(id) {
            self.write_node(child, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            Some(NodeData::Element(element)) => {
                let attrs = element
                    .attrs
                    .iter()
                    .map(|a| (a.name.as_str(), a.value.as_str()));
                write_start_tag(&element.tag, attrs, out);
                if is_void(&element.tag) {
                    return;
                }
                for &child in self.children(id) {
                    self.write_node(child, out);
                }
                write_end_tag(&element.tag, out);
            }
            Some(NodeData::Text(text)) => {
                let raw = self
                    .parent(id)
                    .and_then(|p| self.tag(p))
                    .is_some_and(is_raw_text);
                if raw {
                    out.push_str(text);
                } else {
                    escape_text_into(text, out);
                }
            }
            Some(NodeData::Comment(text)) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            None => {}
        }
    }

    /// Borrow `id` as a patch source.
    #[must_use]
    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { dom: self, id }
    }
}

/// A node paired with its tree, usable as a
/// [`PatchSource::element`](weave_patch::PatchSource::element).
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    dom: &'a Dom,
    id: NodeId,
}

impl NodeRef<'_> {
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl OuterMarkup for NodeRef<'_> {
    fn outer_markup(&self) -> String {
        self.dom.outer_markup(self.id)
    }
}
