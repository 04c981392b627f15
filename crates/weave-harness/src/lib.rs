#![forbid(unsafe_code)]

//! Test harness for Weave.
//!
//! - [`CountingParser`]: a [`MarkupParser`](weave_markup::MarkupParser) that
//!   counts the sources it is handed, for cache assertions.
//! - [`RecordingExecutor`]: a
//!   [`MutationExecutor`](weave_patch::MutationExecutor) that records the
//!   primitives it receives instead of mutating anything.
//! - [`fixtures`]: shared markup, templates and scopes.
//! - [`transcript`]: one-line-per-instruction rendering with generated keys
//!   masked, for readable stream assertions.

pub mod fixtures;
pub mod parser;
pub mod recorder;

pub use parser::CountingParser;
pub use recorder::{PatchFlag, Recorded, RecordingExecutor, transcript};
