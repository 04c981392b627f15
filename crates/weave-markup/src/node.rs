//! Arena-backed parse tree.
//!
//! Every node lives in one `Vec` owned by its [`Fragment`]; parent and child
//! links are [`NodeId`] indices into that vector. The parent link is a plain
//! index and never owns anything.
//!
//! # Invariants
//!
//! 1. Index 0 is the synthetic root and is the only node without a parent.
//! 2. `children` lists are in document order.
//! 3. For every child `c` of `p`, `parent(c) == Some(p)`.

use core::fmt;
use std::ops::Index;

/// Index of a node inside its [`Fragment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The synthetic root of every fragment.
    pub const ROOT: Self = Self(0);

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a parsed node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Tag,
    Text,
    Comment,
    /// `<!DOCTYPE ...>`, `<?xml ...?>` and other `<!`/`<?` declarations.
    Directive,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Tag => write!(f, "tag"),
            Self::Text => write!(f, "text"),
            Self::Comment => write!(f, "comment"),
            Self::Directive => write!(f, "directive"),
        }
    }
}

/// A `name="value"` pair. Boolean attributes carry an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A single parsed node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    /// Tag name for `Tag` nodes, empty otherwise.
    pub name: String,
    /// Attributes in source order (tags only).
    pub attrs: Vec<Attribute>,
    /// Content of text, comment and directive nodes.
    pub data: String,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

impl Node {
    fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            name: String::new(),
            attrs: Vec::new(),
            data: String::new(),
            children: Vec::new(),
            parent,
        }
    }

    /// Value of the first attribute called `name`.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// The authored `id` attribute, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    #[must_use]
    pub fn is_tag(&self) -> bool {
        self.kind == NodeKind::Tag
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }
}

/// A parsed markup fragment: a synthetic root and its descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    nodes: Vec<Node>,
}

impl Default for Fragment {
    fn default() -> Self {
        Self::new()
    }
}

impl Fragment {
    /// Create a fragment containing only the root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Root, None)],
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Top-level nodes (children of the root).
    #[must_use]
    pub fn top_level(&self) -> &[NodeId] {
        &self.nodes[0].children
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |n| n.children.as_slice())
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Total number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the root has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.top_level().is_empty()
    }

    /// Append a tag node under `parent`.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        attrs: Vec<Attribute>,
    ) -> NodeId {
        let mut node = Node::new(NodeKind::Tag, Some(parent));
        node.name = name.into();
        node.attrs = attrs;
        self.push(parent, node)
    }

    /// Append text under `parent`, merging into a trailing text sibling.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        if let Some(&last) = self.children(parent).last()
            && self.nodes[last.index()].is_text()
        {
            self.nodes[last.index()].data.push_str(text);
            return last;
        }
        let mut node = Node::new(NodeKind::Text, Some(parent));
        node.data = text.to_string();
        self.push(parent, node)
    }

    pub fn append_comment(&mut self, parent: NodeId, text: &str) -> NodeId {
        let mut node = Node::new(NodeKind::Comment, Some(parent));
        node.data = text.to_string();
        self.push(parent, node)
    }

    pub fn append_directive(&mut self, parent: NodeId, text: &str) -> NodeId {
        let mut node = Node::new(NodeKind::Directive, Some(parent));
        node.data = text.to_string();
        self.push(parent, node)
    }

    fn push(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(node);
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Pre-order walk of `id` and its descendants.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            fragment: self,
            stack: vec![id],
        }
    }

    /// Depth of `id` below the root (top-level nodes have depth 1).
    #[must_use]
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut cursor = self.parent(id);
        while let Some(parent) = cursor {
            depth += 1;
            cursor = self.parent(parent);
        }
        depth
    }
}

impl Index<NodeId> for Fragment {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

/// Iterator returned by [`Fragment::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    fragment: &'a Fragment,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.fragment.children(id).iter().rev().copied());
        Some(id)
    }
}
