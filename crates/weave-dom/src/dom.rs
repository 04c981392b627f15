//! Live element tree.
//!
//! Nodes live in a generational arena: a [`NodeId`] names one slot *and* the
//! generation that slot had when the node was created, so a handle to a node
//! that has since been freed is rejected instead of aliasing whatever reused
//! the slot.
//!
//! # Invariants
//!
//! 1. A node appears in at most one parent's `children`, and its `parent`
//!    link names that parent.
//! 2. `append_child` never creates a cycle.
//! 3. Detached nodes stay valid until they are freed by a patch.

use core::fmt;

use weave_markup::{Attribute, FragmentParser, ParseError};

/// Handle to a node in a [`Dom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// An element's tag, key and attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    /// Identity used for patch matching.
    pub key: Option<String>,
    pub attrs: Vec<Attribute>,
}

/// Payload of a live node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) data: NodeData,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Errors from tree operations and patching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The handle is stale or never existed.
    UnknownNode(NodeId),
    /// The operation needs an element.
    NotAnElement(NodeId),
    /// Appending would make a node its own ancestor.
    HierarchyRequest { parent: NodeId, child: NodeId },
    /// A close instruction that does not match the open element.
    UnbalancedClose { tag: String },
    /// The patch body ended with elements still open.
    Unclosed { tag: String },
    Parse(ParseError),
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode(id) => write!(f, "unknown node {id}"),
            Self::NotAnElement(id) => write!(f, "node {id} is not an element"),
            Self::HierarchyRequest { parent, child } => {
                write!(f, "cannot append {child} under its descendant {parent}")
            }
            Self::UnbalancedClose { tag } => write!(f, "unbalanced close of <{tag}>"),
            Self::Unclosed { tag } => write!(f, "<{tag}> left open at end of patch"),
            Self::Parse(err) => write!(f, "parse error: {err}"),
        }
    }
}

impl std::error::Error for DomError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ParseError> for DomError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

/// Counts from the most recent patch applied to a [`Dom`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchSummary {
    pub created: usize,
    /// Matched at the cursor.
    pub reused: usize,
    /// Matched further along and moved to the cursor.
    pub moved: usize,
    /// Unvisited children freed at close.
    pub removed: usize,
}

/// An arena of live nodes.
#[derive(Debug, Default)]
pub struct Dom {
    slots: Vec<Slot>,
    free: Vec<u32>,
    pub(crate) parser: FragmentParser,
    pub(crate) last_patch: PatchSummary,
}

impl Dom {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `parser` for [`parse_into`](Self::parse_into).
    #[must_use]
    pub fn with_parser(parser: FragmentParser) -> Self {
        Self {
            parser,
            ..Self::default()
        }
    }

    /// Live nodes, attached or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn last_patch(&self) -> PatchSummary {
        self.last_patch
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    /// A detached element without key or attributes.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element(Element {
            tag: tag.to_string(),
            key: None,
            attrs: Vec::new(),
        }))
    }

    /// A detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    pub(crate) fn alloc(&mut self, data: NodeData) -> NodeId {
        let entry = Entry {
            data,
            parent: None,
            children: Vec::new(),
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Release `id` and its descendants. Their handles become stale.
    pub(crate) fn free_subtree(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Some(slot) = self.slots.get_mut(id.index as usize) else {
                continue;
            };
            if slot.generation != id.generation {
                continue;
            }
            if let Some(entry) = slot.entry.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
                pending.extend(entry.children);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Access
    // -------------------------------------------------------------------------

    pub(crate) fn entry(&self, id: NodeId) -> Option<&Entry> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    pub(crate) fn entry_mut(&mut self, id: NodeId) -> Option<&mut Entry> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    /// Whether `id` names a live node.
    #[must_use]
    pub fn exists(&self, id: NodeId) -> bool {
        self.entry(id).is_some()
    }

    #[must_use]
    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.entry(id).map(|e| &e.data)
    }

    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.data(id)? {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    #[must_use]
    pub fn key(&self, id: NodeId) -> Option<&str> {
        self.element(id).and_then(|e| e.key.as_deref())
    }

    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Content of a text or comment node.
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Text(text) | NodeData::Comment(text) => Some(text),
            NodeData::Element(_) => None,
        }
    }

    /// Concatenated text of `id` and its descendants.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            match self.data(id) {
                Some(NodeData::Text(text)) => out.push_str(text),
                Some(NodeData::Element(_)) => {
                    pending.extend(self.children(id).iter().rev().copied());
                }
                _ => {}
            }
        }
        out
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entry(id).and_then(|e| e.parent)
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.entry(id).map_or(&[], |e| e.children.as_slice())
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    #[must_use]
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.parent(id);
        }
        false
    }

    /// First element under `root` (inclusive, document order) whose `id`
    /// attribute equals `id`.
    #[must_use]
    pub fn get_element_by_id(&self, root: NodeId, id: &str) -> Option<NodeId> {
        let mut pending = vec![root];
        while let Some(node) = pending.pop() {
            if self.attribute(node, "id") == Some(id) {
                return Some(node);
            }
            pending.extend(self.children(node).iter().rev().copied());
        }
        None
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    pub(crate) fn require_element(&self, id: NodeId) -> Result<(), DomError> {
        match self.data(id) {
            Some(NodeData::Element(_)) => Ok(()),
            Some(_) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::UnknownNode(id)),
        }
    }

    /// Set or replace one attribute.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.require_element(id)?;
        if let Some(NodeData::Element(element)) = self.entry_mut(id).map(|e| &mut e.data) {
            match element.attrs.iter_mut().find(|a| a.name == name) {
                Some(attr) => attr.value = value.to_string(),
                None => element.attrs.push(Attribute::new(name, value)),
            }
            if name == "id" && element.key.is_none() {
                element.key = Some(value.to_string());
            }
        }
        Ok(())
    }

    /// Move `child` to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.require_element(parent)?;
        if !self.exists(child) {
            return Err(DomError::UnknownNode(child));
        }
        if self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        let len = self.children(parent).len();
        self.insert_child(parent, len, child);
        Ok(())
    }

    /// Detach `id` from its parent. The node stays valid.
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        if !self.exists(id) {
            return Err(DomError::UnknownNode(id));
        }
        self.detach(id);
        Ok(())
    }

    pub(crate) fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(entry) = self.entry_mut(parent) {
            entry.children.retain(|&c| c != id);
        }
        if let Some(entry) = self.entry_mut(id) {
            entry.parent = None;
        }
    }

    /// Place `child` at `index` among `parent`'s children, detaching it
    /// from wherever it was. `index` is clamped.
    pub(crate) fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        if let Some(entry) = self.entry_mut(parent) {
            let index = index.min(entry.children.len());
            entry.children.insert(index, child);
        }
        if let Some(entry) = self.entry_mut(child) {
            entry.parent = Some(parent);
        }
    }
}
