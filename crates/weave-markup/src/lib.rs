#![forbid(unsafe_code)]

//! Markup fragments for Weave.
//!
//! A [`Fragment`] is an arena of parsed nodes under a synthetic root. The
//! [`MarkupParser`] trait is the seam the patch compiler parses through;
//! [`FragmentParser`] is the built-in implementation, backed by html5ever.
//!
//! ```
//! use weave_markup::{FragmentParser, MarkupParser};
//!
//! let fragment = FragmentParser::new()
//!     .parse_fragment("<p class=note>Hi &amp; bye")
//!     .unwrap();
//! assert_eq!(fragment.to_markup(), r#"<p class="note">Hi &amp; bye</p>"#);
//! ```

pub mod node;
pub mod parser;
pub mod serialize;

pub use node::{Attribute, Descendants, Fragment, Node, NodeId, NodeKind};
pub use parser::{FragmentParser, MarkupParser, ParseError, ParserConfig};
pub use serialize::{
    escape_attr_into, escape_text_into, is_raw_text, is_void, write_end_tag, write_start_tag,
};
