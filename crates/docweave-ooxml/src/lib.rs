//! # docweave-ooxml
//!
//! OOXML package model and cross-package merge for docweave.
//!
//! This crate provides functionality to:
//! - Read and write DOCX/DOTX packages part by part
//! - Edit part XML through an order-preserving tree
//! - Look up and extend style and numbering tables
//! - Merge the body of one package into a template package, translating
//!   styles, lists and relationships into the template's id space
//! - Fill placeholders in template packages
//!
//! ## Example: Merging into a Template
//!
//! ```no_run
//! use docweave_ooxml::{MergeConfig, Package, StyledTemplateSubstitution};
//!
//! let source = Package::open("converted.docx")?;
//! let mut target = Package::open("template.dotx")?;
//!
//! let config = MergeConfig::default()
//!     .convert_style("Heading 1", "Section Head")
//!     .migrate_style("Source Code");
//! let report = StyledTemplateSubstitution::new(config).perform(&source, &mut target)?;
//! println!("{} styles migrated", report.migrated_styles);
//!
//! target.write_to_file("article.docx")?;
//! # Ok::<(), docweave_ooxml::OoxmlError>(())
//! ```

pub mod archive;
pub mod config;
pub mod content_types;
pub mod document;
pub mod error;
pub mod merge;
pub mod numbering;
pub mod package;
pub mod relationships;
pub mod serializable;
pub mod styles;
pub mod template;
pub mod xml;

#[doc(hidden)]
pub mod test_utils;

pub use archive::OoxmlArchive;
pub use config::{ListConversion, ListConversions, ListKind, MergeConfig, DEFAULT_PLACEHOLDER};
pub use content_types::{ct, ContentTypes};
pub use document::MainDocument;
pub use error::{OoxmlError, Result};
pub use merge::{MergeReport, StyledTemplateSubstitution};
pub use numbering::NumberingTable;
pub use package::{Package, Part, PartPath};
pub use relationships::{RelationshipTarget, Relationships};
pub use serializable::{OpaquePart, Serializable};
pub use styles::{Style, StyleReference, StyleTable, StyleType};
pub use template::{InlineReplacement, InlineTemplateSubstitution, ParagraphTemplateSubstitution};
pub use xml::{Index, Node};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
