//! docweave CLI - Command-line interface library
//!
//! Builds a Word document from a Markdown article and a template:
//! - Convert: Markdown to Pandoc JSON and back out to DOCX via `pandoc`
//! - Merge: the converted body replaces `{{{body}}}` in the template
//! - Fill: article metadata replaces the template's metadata placeholders
//!
//! # Library Usage
//!
//! ```ignore
//! use docweave_cli::{build_command, PandocConverter, Settings};
//!
//! let settings = Settings::load(Path::new("docweave.toml"))?;
//! let converter = PandocConverter::from_settings(&settings.converter);
//! build_command(&source, &target, None, &settings, &converter)?;
//! ```
//!
//! # Binary Usage
//!
//! ```bash
//! # Settings from docweave.toml next to the article
//! docweave article.md article.docx
//!
//! # Explicit template and settings
//! docweave article.md article.docx --template institute.dotx --config docweave.toml
//! ```

pub mod app;
pub mod converter;
pub mod fill;
pub mod settings;

pub use app::{build_command, run_cli, BuildReport};
pub use converter::{Converter, PandocConverter};
pub use fill::{FillReport, MetadataFiller};
pub use settings::Settings;
