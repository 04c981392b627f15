//! Compiled, shareable instruction streams.

use std::sync::Arc;

use crate::executor::{MutationContext, MutationExecutor};
use crate::instruction::{Instruction, InstructionStack};

/// An immutable compiled instruction stream.
///
/// Cloning is cheap: every clone shares the same stack, which is also the
/// one held by the cache.
#[derive(Debug, Clone)]
pub struct Patch {
    stack: Arc<[Instruction]>,
}

impl Patch {
    #[must_use]
    pub fn new(stack: InstructionStack) -> Self {
        Self {
            stack: stack.into(),
        }
    }

    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.stack
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Whether both handles share one instruction stack.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.stack, &other.stack)
    }

    /// Replay every instruction against `target`'s children.
    ///
    /// `on_done` runs after the last instruction, still inside the
    /// executor's patch context.
    pub fn apply<E>(
        &self,
        executor: &mut E,
        target: &E::Target,
        on_done: Option<&mut dyn FnMut()>,
    ) -> Result<(), E::Error>
    where
        E: MutationExecutor + ?Sized,
    {
        let mut on_done = on_done;
        executor.patch(target, &mut |ctx: &mut dyn MutationContext| {
            self.replay(ctx);
            if let Some(done) = on_done.as_mut() {
                done();
            }
        })
    }

    /// Issue the instructions directly against a context.
    pub fn replay(&self, ctx: &mut dyn MutationContext) {
        for instruction in self.stack.iter() {
            instruction.replay(ctx);
        }
    }
}

impl PartialEq for Patch {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.stack == other.stack
    }
}

impl Eq for Patch {}
