//! The seam between compiled patches and a live element tree.
//!
//! A [`MutationExecutor`] owns the tree. [`MutationExecutor::patch`] opens a
//! patch context against one target element and hands it to a body closure,
//! which issues [`MutationContext`] primitives in document order. How the
//! executor reconciles those primitives with the existing children (reuse,
//! move, create, remove) is its own business.
//!
//! Context primitives are infallible; an executor that detects a problem
//! (an unbalanced close, say) records it and reports it from `patch`.

use weave_markup::Attribute;

/// Primitives available inside a patch context.
pub trait MutationContext {
    fn open_element(&mut self, tag: &str, key: &str, attrs: &[Attribute]);
    fn close_element(&mut self, tag: &str);
    fn text(&mut self, content: &str);
}

/// Something that can apply instruction streams to its elements.
pub trait MutationExecutor {
    /// Handle naming the element whose children are patched.
    type Target: ?Sized;
    type Error;

    /// Run `body` inside a patch context for `target`.
    fn patch(
        &mut self,
        target: &Self::Target,
        body: &mut dyn FnMut(&mut dyn MutationContext),
    ) -> Result<(), Self::Error>;
}

impl<E: MutationExecutor + ?Sized> MutationExecutor for &mut E {
    type Target = E::Target;
    type Error = E::Error;

    fn patch(
        &mut self,
        target: &Self::Target,
        body: &mut dyn FnMut(&mut dyn MutationContext),
    ) -> Result<(), Self::Error> {
        (**self).patch(target, body)
    }
}
