//! docweave-ast - Pandoc JSON AST reader
//!
//! The converter hands documents over as Pandoc JSON. This crate reads the
//! parts docweave needs from it:
//! - plain text of inline and block runs ([`inline_text`], [`block_text`])
//! - replacement of classed `Div` blocks by raw OpenXML
//!   ([`PandocDocument::substitute_classed_divs`])
//! - typed metadata ([`MetaValue`]) and article front matter
//!   ([`ArticleMetadata`])

pub mod document;
pub mod error;
pub mod inline;
pub mod meta;

pub use document::{Div, PandocDocument, OPENXML_FORMAT};
pub use error::{AstError, Result};
pub use inline::{block_text, inline_text};
pub use meta::{ArticleMetadata, Author, Localized, MetaValue, DEFAULT_LANGUAGE};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
