#![forbid(unsafe_code)]

//! Template compiler for weave.
//!
//! Turns template text plus a data [`Scope`] into markup:
//!
//! - `#{path.to.value}` interpolates a value (missing values render empty);
//! - `#{helper(arg, ...)}` calls a registered helper;
//! - `{{each items}} ... {{/each}}` repeats its body once per item.
//!
//! Helpers live in an explicit [`HelperRegistry`] handed to the
//! [`TemplateCompiler`]; there is no global state.

pub mod helpers;
pub mod syntax;
pub mod template;
pub mod value;

pub use helpers::{Helper, HelperRegistry, HelperReply, RegistryError};
pub use syntax::BlockFault;
pub use template::{
    MalformedBlockPolicy, RenderFn, Template, TemplateCompiler, TemplateConfig, TemplateError,
    TemplateSource,
};
pub use value::{Map, Scope, Value};
