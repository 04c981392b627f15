#![forbid(unsafe_code)]

//! In-memory element tree for Weave.
//!
//! [`Dom`] is an arena of live nodes and the reference
//! [`MutationExecutor`](weave_patch::MutationExecutor): patches are applied
//! to an element's children by keyed, in-order matching, so nodes whose key
//! survives a re-render keep their identity.
//!
//! ```
//! use weave_dom::Dom;
//! use weave_patch::{PatchCompiler, PatchConfig};
//!
//! let mut dom = Dom::new();
//! let host = dom.create_element("div");
//! let mut compiler = PatchCompiler::with_config(PatchConfig::structural());
//!
//! compiler.create_patch("<p>one</p>").unwrap().apply(&mut dom, &host, None).unwrap();
//! let p = dom.children(host)[0];
//! compiler.create_patch("<p>two</p>").unwrap().apply(&mut dom, &host, None).unwrap();
//!
//! assert_eq!(dom.children(host)[0], p);
//! assert_eq!(dom.inner_markup(host), "<p>two</p>");
//! ```

pub mod dom;
pub mod markup;
pub mod patcher;

pub use dom::{Dom, DomError, Element, NodeData, NodeId, PatchSummary};
pub use markup::NodeRef;
