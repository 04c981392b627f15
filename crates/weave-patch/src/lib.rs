#![forbid(unsafe_code)]

//! Patch compilation for Weave.
//!
//! Markup goes in, an ordered stream of element-tree mutations comes out.
//! Streams are cached by source and replayed through a
//! [`MutationExecutor`], which owns the live tree and decides how to
//! reconcile each instruction with what is already there.
//!
//! ```
//! use weave_patch::{Instruction, PatchCompiler, PatchConfig};
//!
//! let mut compiler = PatchCompiler::with_config(PatchConfig::structural());
//! let patch = compiler.create_patch("<p>hi</p>").unwrap();
//! assert_eq!(patch.len(), 3);
//! assert!(matches!(&patch.instructions()[1], Instruction::Text { content } if content == "hi"));
//! assert!(patch.ptr_eq(&compiler.create_patch("<p>hi</p>").unwrap()));
//! ```

pub mod cache;
pub mod compiler;
pub mod config;
pub mod executor;
pub mod instruction;
pub mod patch;

pub use cache::{CacheStats, PatchCache};
pub use compiler::{OuterMarkup, PatchCompiler, PatchError, PatchSource};
pub use config::{IdentityStrategy, PatchConfig, authored_key};
pub use executor::{MutationContext, MutationExecutor};
pub use instruction::{Instruction, InstructionStack};
pub use patch::Patch;
