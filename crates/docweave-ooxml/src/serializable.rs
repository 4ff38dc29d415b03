//! Parse/render contract shared by the XML-backed models
//!
//! [`Serializable`] is implemented by the tree itself and by the package
//! bookkeeping parts ([`crate::Relationships`], [`crate::ContentTypes`]).
//! Parts that are not modeled travel as [`OpaquePart`] bytes.

use crate::error::Result;
use crate::xml::{parse_xml, render_xml, Node};

/// A model that can be read from and written back to XML text
pub trait Serializable: Sized {
    /// Parse the model from XML text
    fn parse(text: &str) -> Result<Self>;

    /// Render the model as a standalone XML document
    fn render(&self) -> String;

    /// Parse from raw bytes (UTF-8, lossy)
    fn parse_bytes(bytes: &[u8]) -> Result<Self> {
        Self::parse(&String::from_utf8_lossy(bytes))
    }
}

impl Serializable for Node {
    fn parse(text: &str) -> Result<Self> {
        parse_xml(text)
    }

    fn render(&self) -> String {
        render_xml(self)
    }
}

/// Pass-through wrapper for a part whose content is not modeled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaquePart {
    /// Normalized absolute part path
    pub path: String,
    /// Raw part bytes
    pub bytes: Vec<u8>,
}

impl OpaquePart {
    /// Wrap raw bytes
    pub fn new(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
        }
    }

    /// Size of the payload in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_serializable_round_trip() {
        let node = Node::parse_bytes(b"<a b=\"1\"><c>t</c></a>").unwrap();
        let again = Node::parse(&node.render()).unwrap();
        assert_eq!(node, again);
    }

    #[test]
    fn test_opaque_part() {
        let part = OpaquePart::new("/word/media/image1.png", vec![1, 2, 3]);
        assert_eq!(part.len(), 3);
        assert!(!part.is_empty());
    }
}
