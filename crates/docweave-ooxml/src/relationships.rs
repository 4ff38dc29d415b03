//! Relationship lists (`_rels/*.rels`)
//!
//! Every part that references other parts or external URLs carries a
//! sidecar relationship list mapping ids (`rId1`, ...) to targets. Content
//! refers to these ids through `r:id`, `r:embed`, `r:link` and `r:pict`
//! attributes.
//!
//! # Example
//!
//! ```
//! use docweave_ooxml::Relationships;
//!
//! let mut rels = Relationships::new();
//! let id = rels.add("media/image1.png", Relationships::TYPE_IMAGE);
//! assert_eq!(id, "rId1");
//! assert_eq!(rels.get("rId1"), Some("media/image1.png"));
//! ```

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};
use crate::serializable::Serializable;
use crate::xml::serialize::escape_attr;

/// OOXML namespace for relationships
pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Target mode value for relationships pointing outside the package
pub const TARGET_MODE_EXTERNAL: &str = "External";

/// Common relationship type URIs
impl Relationships {
    /// Hyperlink relationship type
    pub const TYPE_HYPERLINK: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
    /// Image relationship type
    pub const TYPE_IMAGE: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    /// Styles relationship type
    pub const TYPE_STYLES: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
    /// Numbering relationship type
    pub const TYPE_NUMBERING: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
    /// Header relationship type
    pub const TYPE_HEADER: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
    /// Footer relationship type
    pub const TYPE_FOOTER: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
    /// Main document relationship type (package-level)
    pub const TYPE_OFFICE_DOCUMENT: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
}

/// Parsed relationships from a .rels file
///
/// Maintains insertion order for deterministic XML serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    /// Ordered list of relationship IDs (maintains insertion order)
    order: Vec<String>,
    /// Map of relationship ID to target (for fast lookups)
    map: HashMap<String, RelationshipTarget>,
}

/// A relationship target with its type and mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipTarget {
    /// The target URL or path, relative to the owning part's directory
    pub target: String,
    /// The relationship type URI (e.g., hyperlink, image, styles)
    pub rel_type: String,
    /// Target mode: "External" for URLs, None for internal paths
    pub target_mode: Option<String>,
}

impl RelationshipTarget {
    /// Whether the target lies outside the package
    pub fn is_external(&self) -> bool {
        self.target_mode.as_deref() == Some(TARGET_MODE_EXTERNAL)
    }
}

impl Relationships {
    /// Create an empty relationships map
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse relationships from XML bytes
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut rels = Self::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        let mut id = None;
                        let mut target = None;
                        let mut rel_type = None;
                        let mut target_mode = None;

                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            let value = attr.unescape_value()?.into_owned();
                            match attr.key.as_ref() {
                                b"Id" => id = Some(value),
                                b"Target" => target = Some(value),
                                b"Type" => rel_type = Some(value),
                                b"TargetMode" => target_mode = Some(value),
                                _ => {}
                            }
                        }

                        if let (Some(id), Some(target)) = (id, target) {
                            rels.insert(
                                id,
                                RelationshipTarget {
                                    target,
                                    rel_type: rel_type.unwrap_or_default(),
                                    target_mode,
                                },
                            );
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OoxmlError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Smallest `rIdN` (N from 1) not present in the list
    pub fn unused_id(&self) -> String {
        (1u32..)
            .map(|n| format!("rId{}", n))
            .find(|id| !self.map.contains_key(id))
            .unwrap_or_default()
    }

    /// Add a new internal relationship and return the allocated ID
    ///
    /// Hyperlinks to `http(s)` URLs are marked external.
    pub fn add(&mut self, target: impl Into<String>, rel_type: impl Into<String>) -> String {
        let target = target.into();
        let rel_type = rel_type.into();
        let target_mode = if rel_type.contains("hyperlink") && target.starts_with("http") {
            Some(TARGET_MODE_EXTERNAL.to_string())
        } else {
            None
        };
        self.add_with_mode(target, rel_type, target_mode)
    }

    /// Add a new relationship with explicit target mode
    pub fn add_with_mode(
        &mut self,
        target: impl Into<String>,
        rel_type: impl Into<String>,
        target_mode: Option<String>,
    ) -> String {
        let id = self.unused_id();
        self.insert(
            id.clone(),
            RelationshipTarget {
                target: target.into(),
                rel_type: rel_type.into(),
                target_mode,
            },
        );
        id
    }

    /// Insert a relationship under a given id, replacing any previous entry
    pub fn insert(&mut self, id: impl Into<String>, rel: RelationshipTarget) {
        let id = id.into();
        if self.map.insert(id.clone(), rel).is_none() {
            self.order.push(id);
        }
    }

    /// Remove a relationship
    pub fn remove(&mut self, id: &str) -> Option<RelationshipTarget> {
        let removed = self.map.remove(id)?;
        self.order.retain(|existing| existing != id);
        Some(removed)
    }

    /// First relationship with the same type, target and mode
    pub fn find_by_target(
        &self,
        rel_type: &str,
        target: &str,
        target_mode: Option<&str>,
    ) -> Option<&str> {
        self.iter()
            .find(|(_, rel)| {
                rel.rel_type == rel_type
                    && rel.target == target
                    && rel.target_mode.as_deref() == target_mode
            })
            .map(|(id, _)| id)
    }

    /// Serialize relationships to OOXML format
    ///
    /// Returns valid XML that can be written to a .rels file.
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(crate::xml::XML_DECLARATION);
        xml.push_str("\r\n");
        xml.push_str(&format!(r#"<Relationships xmlns="{}">"#, RELATIONSHIPS_NS));

        // Iterate in insertion order for deterministic output
        for (id, rel) in self.iter() {
            xml.push_str("<Relationship");
            xml.push_str(&format!(r#" Id="{}""#, escape_attr(id)));
            xml.push_str(&format!(r#" Type="{}""#, escape_attr(&rel.rel_type)));
            xml.push_str(&format!(r#" Target="{}""#, escape_attr(&rel.target)));
            if let Some(mode) = &rel.target_mode {
                xml.push_str(&format!(r#" TargetMode="{}""#, escape_attr(mode)));
            }
            xml.push_str("/>");
        }

        xml.push_str("</Relationships>");
        xml
    }

    /// Get the target for a relationship ID
    pub fn get(&self, id: &str) -> Option<&str> {
        self.map.get(id).map(|r| r.target.as_str())
    }

    /// Get the full relationship target for an ID
    pub fn get_target(&self, id: &str) -> Option<&RelationshipTarget> {
        self.map.get(id)
    }

    /// Check if a relationship ID exists
    pub fn contains(&self, id: &str) -> bool {
        self.map.contains_key(id)
    }

    /// Get the number of relationships
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if there are no relationships
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over relationships in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RelationshipTarget)> {
        self.order
            .iter()
            .filter_map(|id| self.map.get(id).map(|rel| (id.as_str(), rel)))
    }

    /// Relationships of one type, in insertion order
    pub fn of_type<'a>(
        &'a self,
        rel_type: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a RelationshipTarget)> + 'a {
        self.iter().filter(move |(_, rel)| rel.rel_type == rel_type)
    }
}

impl Serializable for Relationships {
    fn parse(text: &str) -> Result<Self> {
        Self::from_xml(text.as_bytes())
    }

    fn render(&self) -> String {
        self.to_xml()
    }
}
