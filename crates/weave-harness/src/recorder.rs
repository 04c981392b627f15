//! Recording mutation executor and instruction transcripts.

use std::cell::Cell;
use std::convert::Infallible;
use std::fmt::Write as _;
use std::rc::Rc;

use weave_markup::Attribute;
use weave_patch::{Instruction, MutationContext, MutationExecutor};

/// One primitive observed by a [`RecordingExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    /// A patch context was opened for this target.
    Begin(String),
    Open {
        tag: String,
        key: String,
        attrs: Vec<Attribute>,
    },
    Close(String),
    Text(String),
    /// The patch context was closed.
    End,
}

/// Shared view of whether a recorder is inside a patch context.
#[derive(Debug, Clone)]
pub struct PatchFlag(Rc<Cell<bool>>);

impl PatchFlag {
    #[must_use]
    pub fn in_patch(&self) -> bool {
        self.0.get()
    }
}

/// Executor that records primitives against string-labelled targets.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    log: Vec<Recorded>,
    active: Rc<Cell<bool>>,
}

impl RecordingExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn log(&self) -> &[Recorded] {
        &self.log
    }

    /// Take the log, leaving it empty.
    pub fn take(&mut self) -> Vec<Recorded> {
        std::mem::take(&mut self.log)
    }

    /// A handle that reports whether a patch is running, usable from
    /// callbacks that cannot borrow the executor.
    #[must_use]
    pub fn flag(&self) -> PatchFlag {
        PatchFlag(Rc::clone(&self.active))
    }
}

struct Context<'a> {
    log: &'a mut Vec<Recorded>,
}

impl MutationContext for Context<'_> {
    fn open_element(&mut self, tag: &str, key: &str, attrs: &[Attribute]) {
        self.log.push(Recorded::Open {
            tag: tag.to_string(),
            key: key.to_string(),
            attrs: attrs.to_vec(),
        });
    }

    fn close_element(&mut self, tag: &str) {
        self.log.push(Recorded::Close(tag.to_string()));
    }

    fn text(&mut self, content: &str) {
        self.log.push(Recorded::Text(content.to_string()));
    }
}

impl MutationExecutor for RecordingExecutor {
    type Target = str;
    type Error = Infallible;

    fn patch(
        &mut self,
        target: &str,
        body: &mut dyn FnMut(&mut dyn MutationContext),
    ) -> Result<(), Infallible> {
        self.log.push(Recorded::Begin(target.to_string()));
        self.active.set(true);
        body(&mut Context { log: &mut self.log });
        self.active.set(false);
        self.log.push(Recorded::End);
        Ok(())
    }
}

/// Render a stream one instruction per line, indented by depth.
///
/// Keys of 32 hex digits (generated identities) print as `<gen>` so that
/// transcripts of `Generated` compiles are stable.
#[must_use]
pub fn transcript(instructions: &[Instruction]) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    for instruction in instructions {
        if matches!(instruction, Instruction::CloseElement { .. }) {
            depth = depth.saturating_sub(1);
        }
        out.push_str(&"  ".repeat(depth));
        match instruction {
            Instruction::OpenElement { tag, key, attrs } => {
                let shown = if is_generated(key) { "<gen>" } else { key.as_str() };
                let _ = write!(out, "<{tag} key={shown}");
                for attr in attrs {
                    let _ = write!(out, " {}={:?}", attr.name, attr.value);
                }
                out.push('>');
                depth += 1;
            }
            Instruction::CloseElement { tag } => {
                let _ = write!(out, "</{tag}>");
            }
            Instruction::Text { content } => {
                let _ = write!(out, "{content:?}");
            }
        }
        out.push('\n');
    }
    out
}

fn is_generated(key: &str) -> bool {
    key.len() == 32 && key.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_patch::Patch;

    #[test]
    fn records_a_replayed_patch() {
        let patch = Patch::new(vec![
            Instruction::OpenElement {
                tag: "p".into(),
                key: "k".into(),
                attrs: vec![],
            },
            Instruction::Text {
                content: "x".into(),
            },
            Instruction::CloseElement { tag: "p".into() },
        ]);
        let mut executor = RecordingExecutor::new();
        let flag = executor.flag();
        let mut seen_inside = false;
        patch
            .apply(&mut executor, "host", Some(&mut || seen_inside = flag.in_patch()))
            .unwrap();
        assert!(seen_inside);
        assert!(!flag.in_patch());
        assert_eq!(
            executor.take(),
            vec![
                Recorded::Begin("host".into()),
                Recorded::Open {
                    tag: "p".into(),
                    key: "k".into(),
                    attrs: vec![]
                },
                Recorded::Text("x".into()),
                Recorded::Close("p".into()),
                Recorded::End,
            ]
        );
        assert!(executor.log().is_empty());
    }

    #[test]
    fn transcript_masks_generated_keys() {
        let stream = vec![
            Instruction::OpenElement {
                tag: "div".into(),
                key: "0123456789abcdef0123456789abcdef".into(),
                attrs: vec![Attribute::new("class", "a")],
            },
            Instruction::OpenElement {
                tag: "b".into(),
                key: "mine".into(),
                attrs: vec![],
            },
            Instruction::Text {
                content: "hi".into(),
            },
            Instruction::CloseElement { tag: "b".into() },
            Instruction::CloseElement { tag: "div".into() },
        ];
        assert_eq!(
            transcript(&stream),
            "<div key=<gen> class=\"a\">\n  <b key=mine>\n    \"hi\"\n  </b>\n</div>\n"
        );
    }
}
