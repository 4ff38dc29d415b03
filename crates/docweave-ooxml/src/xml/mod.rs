//! Order-preserving XML tree engine
//!
//! - [`Node`]: element / text / comment sum type with path addressing,
//!   single-child lookup and visitors
//! - [`Index`]: one step of a path, counted from the start or the end
//! - [`parse_xml`] / [`render_xml`]: exact round-trip serialization
//! - [`namespaces`]: namespace declarations recomputed before saving

pub mod namespaces;
pub mod node;
pub mod path;
pub mod serialize;

pub use node::{any, tag, Element, Node};
pub use path::Index;
pub use serialize::{parse_xml, render_fragment, render_xml, XML_DECLARATION};
