//! Error types for OOXML operations

use thiserror::Error;

/// Errors that can occur during OOXML operations
#[derive(Error, Debug)]
pub enum OoxmlError {
    /// Error reading or writing the ZIP archive
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Error reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing XML content
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Error parsing a TOML merge configuration
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Required file not found in archive
    #[error("Required file not found: {0}")]
    MissingFile(String),

    /// Malformed tree access: wrong node kind, empty or invalid path,
    /// mutation of a leaf, ambiguous single-child lookup
    #[error("Structural error: {0}")]
    Structural(String),

    /// Invalid document structure
    #[error("Invalid document structure: {0}")]
    InvalidStructure(String),

    /// A style named in the configuration does not exist
    #[error("Style not found: {0}")]
    StyleNotFound(String),

    /// A source style has no conversion and is not marked for migration
    #[error("Unrecognized style '{id}' (name: {name:?}): add it to the style conversions or the migrate set")]
    UnrecognizedStyle {
        /// Source style id
        id: String,
        /// Source display name, when the style definition exists
        name: Option<String>,
    },

    /// A source list uses a numbering format with no configured archetype
    #[error("Unsupported numbering format '{format}' for numbering instance {num_id}")]
    UnsupportedNumberingFormat {
        /// Source numbering instance id
        num_id: String,
        /// Level-0 format code of the abstract numbering
        format: String,
    },

    /// A numbering instance or abstract numbering reference points nowhere
    #[error("Dangling numbering reference: {0}")]
    DanglingNumbering(String),

    /// A relationship id used in content has no entry in the relationship list
    #[error("Dangling relationship reference: {0}")]
    DanglingRelationship(String),

    /// The placeholder shares its paragraph with other text
    #[error("Placeholder {placeholder} is not the only text of its paragraph: {paragraph_text:?}")]
    PlaceholderNotExclusive {
        /// Placeholder token
        placeholder: String,
        /// Full text of the offending paragraph
        paragraph_text: String,
    },

    /// The placeholder paragraph was not found
    #[error("Placeholder {0} not found in document body")]
    PlaceholderNotFound(String),

    /// The placeholder paragraph appears more than once
    #[error("Placeholder {0} appears in more than one paragraph")]
    PlaceholderAmbiguous(String),
}

/// Result type for OOXML operations
pub type Result<T> = std::result::Result<T, OoxmlError>;

impl OoxmlError {
    pub(crate) fn structural(message: impl Into<String>) -> Self {
        OoxmlError::Structural(message.into())
    }
}
