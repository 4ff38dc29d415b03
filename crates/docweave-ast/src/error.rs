//! Error types for AST reading

use thiserror::Error;

/// Errors that can occur while reading a Pandoc document
#[derive(Error, Debug)]
pub enum AstError {
    /// The input is not a Pandoc JSON document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Metadata is present but not shaped as expected
    #[error("Invalid metadata at '{key}': {message}")]
    InvalidMetadata {
        /// Dotted path of the offending metadata entry
        key: String,
        /// What was wrong
        message: String,
    },
}

/// Result type for AST operations
pub type Result<T> = std::result::Result<T, AstError>;

impl AstError {
    pub(crate) fn metadata(key: impl Into<String>, message: impl Into<String>) -> Self {
        AstError::InvalidMetadata {
            key: key.into(),
            message: message.into(),
        }
    }
}
