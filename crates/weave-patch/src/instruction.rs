//! Mutation instructions produced by the patch compiler.

use core::fmt;

use weave_markup::Attribute;

use crate::executor::MutationContext;

/// One step of an element-tree mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Open (or match) an element under the current cursor.
    OpenElement {
        tag: String,
        /// Identity used by the executor to match existing nodes.
        key: String,
        /// Flattened attributes in source order.
        attrs: Vec<Attribute>,
    },
    /// Close the element most recently opened.
    CloseElement { tag: String },
    /// A text node at the current cursor.
    Text { content: String },
}

/// The ordered output of one compile.
pub type InstructionStack = Vec<Instruction>;

impl Instruction {
    /// Issue this instruction against a mutation context.
    pub fn replay(&self, ctx: &mut dyn MutationContext) {
        match self {
            Self::OpenElement { tag, key, attrs } => ctx.open_element(tag, key, attrs),
            Self::CloseElement { tag } => ctx.close_element(tag),
            Self::Text { content } => ctx.text(content),
        }
    }

    /// The element key, for `OpenElement` instructions.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::OpenElement { key, .. } => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenElement { tag, key, attrs } => {
                write!(f, "open {tag} key={key}")?;
                for attr in attrs {
                    write!(f, " {}={:?}", attr.name, attr.value)?;
                }
                Ok(())
            }
            Self::CloseElement { tag } => write!(f, "close {tag}"),
            Self::Text { content } => write!(f, "text {content:?}"),
        }
    }
}
