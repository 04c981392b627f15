//! Incremental [`MutationExecutor`] for [`Dom`].
//!
//! The patch context walks the target's children with a cursor per open
//! element. For each instruction it tries, in order:
//!
//! 1. the node at the cursor, if it is an element with the same tag and key
//!    (or, for text, any text node);
//! 2. a later sibling with the same tag and key, moved to the cursor;
//! 3. a new node inserted at the cursor.
//!
//! Children still right of the cursor when their parent closes were not
//! described by the patch and are freed.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Target is stale | freed handle | `DomError::UnknownNode`, body not run |
//! | Target is text | wrong handle | `DomError::NotAnElement`, body not run |
//! | Close does not match | hand-built stream | `DomError::UnbalancedClose`; later primitives ignored |
//! | Body ends with open elements | hand-built stream | `DomError::Unclosed` |
//!
//! On error the tree keeps whatever was applied before the fault.

use weave_markup::Attribute;
use weave_patch::{MutationContext, MutationExecutor};

use crate::dom::{Dom, DomError, Element, NodeData, NodeId, PatchSummary};

impl MutationExecutor for Dom {
    type Target = NodeId;
    type Error = DomError;

    fn patch(
        &mut self,
        target: &NodeId,
        body: &mut dyn FnMut(&mut dyn MutationContext),
    ) -> Result<(), DomError> {
        let target = *target;
        self.require_element(target)?;

        let mut patcher = Patcher {
            dom: self,
            frames: vec![Cursor {
                parent: target,
                next: 0,
            }],
            summary: PatchSummary::default(),
            error: None,
        };
        body(&mut patcher);
        let (summary, result) = patcher.finish();

        tracing::debug!(
            %target,
            created = summary.created,
            reused = summary.reused,
            moved = summary.moved,
            removed = summary.removed,
            ok = result.is_ok(),
            "patched element"
        );
        self.last_patch = summary;
        result
    }
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    parent: NodeId,
    next: usize,
}

struct Patcher<'d> {
    dom: &'d mut Dom,
    frames: Vec<Cursor>,
    summary: PatchSummary,
    error: Option<DomError>,
}

impl Patcher<'_> {
    fn finish(mut self) -> (PatchSummary, Result<(), DomError>) {
        if let Some(err) = self.error.take() {
            return (self.summary, Err(err));
        }
        if self.frames.len() > 1 {
            let tag = self
                .frames
                .last()
                .and_then(|f| self.dom.tag(f.parent))
                .unwrap_or_default()
                .to_string();
            return (self.summary, Err(DomError::Unclosed { tag }));
        }
        if let Some(root) = self.frames.pop() {
            self.trim(root);
        }
        (self.summary, Ok(()))
    }

    /// Free every child of `frame.parent` right of the cursor.
    fn trim(&mut self, frame: Cursor) {
        let stale = match self.dom.entry_mut(frame.parent) {
            Some(entry) if entry.children.len() > frame.next => {
                entry.children.split_off(frame.next)
            }
            _ => return,
        };
        self.summary.removed += stale.len();
        for child in stale {
            self.dom.free_subtree(child);
        }
    }

    /// Position of a sibling at or after `from` that satisfies `matches`.
    fn find_from(
        &self,
        parent: NodeId,
        from: usize,
        matches: impl Fn(&NodeData) -> bool,
    ) -> Option<usize> {
        self.dom
            .children(parent)
            .iter()
            .enumerate()
            .skip(from)
            .find(|&(_, &id)| self.dom.data(id).is_some_and(&matches))
            .map(|(i, _)| i)
    }
}

impl MutationContext for Patcher<'_> {
    fn open_element(&mut self, tag: &str, key: &str, attrs: &[Attribute]) {
        if self.error.is_some() {
            return;
        }
        let Some(&Cursor { parent, next }) = self.frames.last() else {
            return;
        };
        let same = |data: &NodeData| {
            matches!(data, NodeData::Element(el) if el.tag == tag && el.key.as_deref() == Some(key))
        };

        let node = match self.find_from(parent, next, same) {
            Some(at) if at == next => {
                self.summary.reused += 1;
                self.dom.children(parent)[at]
            }
            Some(at) => {
                let id = self.dom.children(parent)[at];
                self.dom.insert_child(parent, next, id);
                self.summary.moved += 1;
                id
            }
            None => {
                let id = self.dom.alloc(NodeData::Element(Element {
                    tag: tag.to_string(),
                    key: Some(key.to_string()),
                    attrs: Vec::new(),
                }));
                self.dom.insert_child(parent, next, id);
                self.summary.created += 1;
                id
            }
        };

        if let Some(entry) = self.dom.entry_mut(node)
            && let NodeData::Element(element) = &mut entry.data
            && element.attrs != attrs
        {
            element.attrs = attrs.to_vec();
        }

        if let Some(frame) = self.frames.last_mut() {
            frame.next += 1;
        }
        self.frames.push(Cursor {
            parent: node,
            next: 0,
        });
    }

    fn close_element(&mut self, tag: &str) {
        if self.error.is_some() {
            return;
        }
        let open_tag = self
            .frames
            .last()
            .filter(|_| self.frames.len() > 1)
            .and_then(|frame| self.dom.tag(frame.parent));
        if open_tag != Some(tag) {
            self.error = Some(DomError::UnbalancedClose {
                tag: tag.to_string(),
            });
            return;
        }
        if let Some(frame) = self.frames.pop() {
            self.trim(frame);
        }
    }

    fn text(&mut self, content: &str) {
        if self.error.is_some() {
            return;
        }
        let Some(&Cursor { parent, next }) = self.frames.last() else {
            return;
        };
        let current = self.dom.children(parent).get(next).copied();
        let reusable =
            current.filter(|&id| matches!(self.dom.data(id), Some(NodeData::Text(_))));

        match reusable.and_then(|id| self.dom.entry_mut(id)) {
            Some(entry) => {
                if let NodeData::Text(text) = &mut entry.data
                    && text.as_str() != content
                {
                    content.clone_into(text);
                }
                self.summary.reused += 1;
            }
            None => {
                let id = self.dom.alloc(NodeData::Text(content.to_string()));
                self.dom.insert_child(parent, next, id);
                self.summary.created += 1;
            }
        }

        if let Some(frame) = self.frames.last_mut() {
            frame.next += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use weave_patch::{Patch, PatchCompiler, PatchConfig};

    fn host(dom: &mut Dom) -> NodeId {
        dom.create_element("div")
    }

    fn apply(dom: &mut Dom, target: NodeId, compiler: &mut PatchCompiler, markup: &str) {
        compiler
            .create_patch(markup)
            .unwrap()
            .apply(dom, &target, None)
            .unwrap();
    }

    #[test]
    fn builds_from_empty() {
        let mut dom = Dom::new();
        let root = host(&mut dom);
        let mut compiler = PatchCompiler::new();
        apply(&mut dom, root, &mut compiler, r#"<ul class="l"><li>a</li><li>b</li></ul>"#);
        assert_eq!(
            dom.inner_markup(root),
            r#"<ul class="l"><li>a</li><li>b</li></ul>"#
        );
        assert_eq!(dom.last_patch().created, 5);
    }

    #[test]
    fn structural_keys_reuse_nodes() {
        let mut dom = Dom::new();
        let root = host(&mut dom);
        let mut compiler = PatchCompiler::with_config(PatchConfig::structural());
        apply(&mut dom, root, &mut compiler, "<p>one</p><p>two</p>");
        let first = dom.children(root).to_vec();
        let text = dom.children(first[1])[0];

        apply(&mut dom, root, &mut compiler, "<p>one</p><p>three</p>");
        assert_eq!(dom.children(root), first.as_slice());
        assert_eq!(dom.children(first[1])[0], text);
        assert_eq!(dom.text(text), Some("three"));
        let summary = dom.last_patch();
        assert_eq!(summary.created, 0);
        assert_eq!(summary.reused, 4);
    }

    #[test]
    fn generated_keys_replace_unkeyed_nodes() {
        let mut dom = Dom::new();
        let root = host(&mut dom);
        let mut compiler = PatchCompiler::new();
        apply(&mut dom, root, &mut compiler, "<p>x</p>");
        let before = dom.children(root)[0];
        apply(&mut dom, root, &mut compiler, "<p>y</p>");
        let after = dom.children(root)[0];
        assert_ne!(before, after);
        assert!(!dom.exists(before));
        assert_eq!(dom.inner_markup(root), "<p>y</p>");
    }

    #[test]
    fn authored_ids_survive_reordering() {
        let mut dom = Dom::new();
        let root = host(&mut dom);
        let mut compiler = PatchCompiler::new();
        apply(&mut dom, root, &mut compiler, r#"<i id="a"></i><i id="b"></i><i id="c"></i>"#);
        let ids = dom.children(root).to_vec();

        apply(&mut dom, root, &mut compiler, r#"<i id="c"></i><i id="a"></i>"#);
        assert_eq!(dom.children(root), &[ids[2], ids[0]]);
        assert!(!dom.exists(ids[1]));
        let summary = dom.last_patch();
        assert_eq!((summary.moved, summary.reused, summary.removed), (1, 1, 1));
    }

    #[test]
    fn attributes_are_replaced() {
        let mut dom = Dom::new();
        let root = host(&mut dom);
        let mut compiler = PatchCompiler::new();
        apply(&mut dom, root, &mut compiler, r#"<a id="l" href="/x" title="t"></a>"#);
        apply(&mut dom, root, &mut compiler, r#"<a id="l" href="/y"></a>"#);
        let link = dom.children(root)[0];
        assert_eq!(dom.attribute(link, "href"), Some("/y"));
        assert_eq!(dom.attribute(link, "title"), None);
    }

    #[test]
    fn on_done_runs_inside_the_patch() {
        let mut dom = Dom::new();
        let root = host(&mut dom);
        let mut calls = 0;
        Patch::new(Vec::new())
            .apply(&mut dom, &root, Some(&mut || calls += 1))
            .unwrap();
        assert_eq!(calls, 1);
    }

    #[test]
    fn text_targets_are_rejected() {
        let mut dom = Dom::new();
        let text = dom.create_text("x");
        let mut ran = false;
        let result = dom.patch(&text, &mut |_| ran = true);
        assert_eq!(result, Err(DomError::NotAnElement(text)));
        assert!(!ran);
    }

    #[test]
    fn unbalanced_streams_are_reported() {
        let mut dom = Dom::new();
        let root = host(&mut dom);
        let result = dom.patch(&root, &mut |ctx| {
            ctx.open_element("b", "k", &[]);
            ctx.close_element("i");
        });
        assert_eq!(result, Err(DomError::UnbalancedClose { tag: "i".into() }));

        let result = dom.patch(&root, &mut |ctx| ctx.close_element("div"));
        assert_eq!(result, Err(DomError::UnbalancedClose { tag: "div".into() }));

        let result = dom.patch(&root, &mut |ctx| ctx.open_element("b", "k", &[]));
        assert_eq!(result, Err(DomError::Unclosed { tag: "b".into() }));
    }

    proptest::proptest! {
        #[test]
        fn patching_converges_to_target(
            before in "(<[a-c]>|</[a-c]>|<i id=\"[xy]\">|[xy ]){0,16}",
            after in "(<[a-c]>|</[a-c]>|<i id=\"[xy]\">|[xy ]){0,16}",
            structural in proptest::bool::ANY,
        ) {
            let config = if structural { PatchConfig::structural() } else { PatchConfig::default() };
            let mut compiler = PatchCompiler::with_config(config);

            let mut dom = Dom::new();
            let root = host(&mut dom);
            apply(&mut dom, root, &mut compiler, &before);
            apply(&mut dom, root, &mut compiler, &after);

            let mut fresh = Dom::new();
            let fresh_root = host(&mut fresh);
            apply(&mut fresh, fresh_root, &mut compiler, &after);

            proptest::prop_assert_eq!(dom.inner_markup(root), fresh.inner_markup(fresh_root));
        }
    }
}
