#![forbid(unsafe_code)]

//! Weave public facade.
//!
//! Render string templates into markup, then converge a live element tree
//! on each data change with cached, keyed patches instead of re-rendering.
//!
//! ```
//! use weave::prelude::*;
//!
//! let helpers = HelperRegistry::new();
//! let compiler = TemplateCompiler::new(helpers);
//! let document = Document::new();
//! let body = document.create_element("body");
//!
//! let mut view = View::from_source(
//!     &document,
//!     &compiler,
//!     r#"<p id="count">#{n}</p>"#,
//!     scope! { "n" => 1 },
//! )
//! .unwrap();
//! view.render(body).unwrap();
//! view.update(scope! { "n" => 2 }).unwrap();
//! assert_eq!(view.to_markup(), r#"<p id="count">2</p>"#);
//! ```

pub mod view;

pub use view::{Document, View, ViewConfig, ViewError};

pub use weave_dom as dom;
pub use weave_markup as markup;
pub use weave_patch as patch;
pub use weave_template as template;

pub use weave_template::scope;

/// Everything needed to build and drive views.
pub mod prelude {
    pub use crate::view::{Document, View, ViewConfig, ViewError};
    pub use weave_dom::{Dom, NodeId};
    pub use weave_patch::{
        IdentityStrategy, MutationExecutor, Patch, PatchCompiler, PatchConfig, PatchSource,
    };
    pub use weave_template::{
        HelperRegistry, Scope, Template, TemplateCompiler, TemplateConfig, Value, scope,
    };
}
