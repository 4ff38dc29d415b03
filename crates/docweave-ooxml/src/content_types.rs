//! Content-type registry (`[Content_Types].xml`)
//!
//! A part's content type is its `Override` entry when one exists for the
//! exact part name, else the `Default` entry for its extension. Parts that
//! match neither have no known type.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};
use crate::serializable::Serializable;
use crate::xml::serialize::escape_attr;

/// Name of the registry entry inside the archive
pub const CONTENT_TYPES_ENTRY: &str = "[Content_Types].xml";

/// Namespace of the registry document
pub const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

/// Content types of the WordprocessingML parts the merge touches
pub mod ct {
    /// Main document part of a `.docx`
    pub const DOCUMENT: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
    /// Main document part of a `.dotx`
    pub const TEMPLATE: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.template.main+xml";
    /// Style definitions
    pub const STYLES: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
    /// Numbering definitions
    pub const NUMBERING: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml";
    /// Header part
    pub const HEADER: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";
    /// Footer part
    pub const FOOTER: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml";
    /// Relationship list
    pub const RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
    /// Generic XML
    pub const XML: &str = "application/xml";
}

/// MIME types by lowercase extension, used to register defaults for
/// resources copied into a package
const MIME_TYPES: &[(&str, &str)] = &[
    ("bmp", "image/bmp"),
    ("emf", "image/x-emf"),
    ("gif", "image/gif"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("rels", ct::RELATIONSHIPS),
    ("svg", "image/svg+xml"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("webp", "image/webp"),
    ("wmf", "image/x-wmf"),
    ("xml", ct::XML),
];

/// MIME type for a file extension (case-insensitive)
pub fn mime_type_for_extension(extension: &str) -> Option<&'static str> {
    let extension = extension.to_ascii_lowercase();
    MIME_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

/// Parsed content-type registry
///
/// Entries keep document order so rendering is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    /// Extension (lowercase) → content type
    defaults: Vec<(String, String)>,
    /// Absolute part name → content type
    overrides: Vec<(String, String)>,
}

impl ContentTypes {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the registry from XML bytes
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut map = Self::new();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let is_default = match e.local_name().as_ref() {
                        b"Default" => Some(true),
                        b"Override" => Some(false),
                        _ => None,
                    };
                    if let Some(is_default) = is_default {
                        let key_attr: &[u8] = if is_default { b"Extension" } else { b"PartName" };
                        let mut key = None;
                        let mut content_type = None;
                        for attr in e.attributes() {
                            let attr = attr.map_err(quick_xml::Error::from)?;
                            if attr.key.as_ref() == key_attr {
                                key = Some(attr.unescape_value()?.into_owned());
                            } else if attr.key.as_ref() == b"ContentType" {
                                content_type = Some(attr.unescape_value()?.into_owned());
                            }
                        }
                        match (key, content_type) {
                            (Some(key), Some(ct)) if is_default => map.add_default(&key, &ct),
                            (Some(key), Some(ct)) => map.add_override(&key, &ct),
                            _ => {}
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OoxmlError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(map)
    }

    /// Content type of a part: override first, then extension default
    pub fn content_type(&self, part_name: &str) -> Option<&str> {
        let part_name = absolute(part_name);
        if let Some((_, ct)) = self.overrides.iter().find(|(name, _)| *name == part_name) {
            return Some(ct.as_str());
        }
        let file_name = part_name.rsplit('/').next().unwrap_or_default();
        let extension = file_name.rsplit_once('.').map(|(_, ext)| ext)?;
        self.default_for(extension)
    }

    /// Override registered for exactly this part
    pub fn override_for(&self, part_name: &str) -> Option<&str> {
        let part_name = absolute(part_name);
        self.overrides
            .iter()
            .find(|(name, _)| *name == part_name)
            .map(|(_, ct)| ct.as_str())
    }

    /// Default content type registered for an extension
    pub fn default_for(&self, extension: &str) -> Option<&str> {
        let extension = extension.to_ascii_lowercase();
        self.defaults
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, ct)| ct.as_str())
    }

    /// Whether a default exists for the extension
    pub fn has_default(&self, extension: &str) -> bool {
        self.default_for(extension).is_some()
    }

    /// Register (or replace) an extension default
    pub fn add_default(&mut self, extension: &str, content_type: &str) {
        let extension = extension.to_ascii_lowercase();
        match self.defaults.iter_mut().find(|(ext, _)| *ext == extension) {
            Some(entry) => entry.1 = content_type.to_string(),
            None => self.defaults.push((extension, content_type.to_string())),
        }
    }

    /// Register (or replace) a part override
    pub fn add_override(&mut self, part_name: &str, content_type: &str) {
        let part_name = absolute(part_name);
        match self.overrides.iter_mut().find(|(name, _)| *name == part_name) {
            Some(entry) => entry.1 = content_type.to_string(),
            None => self.overrides.push((part_name, content_type.to_string())),
        }
    }

    /// Drop an override
    pub fn remove_override(&mut self, part_name: &str) -> bool {
        let part_name = absolute(part_name);
        let before = self.overrides.len();
        self.overrides.retain(|(name, _)| *name != part_name);
        before != self.overrides.len()
    }

    /// Registered defaults in document order
    pub fn defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defaults.iter().map(|(e, c)| (e.as_str(), c.as_str()))
    }

    /// Registered overrides in document order
    pub fn overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.overrides.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    /// Serialize the registry
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(crate::xml::XML_DECLARATION);
        xml.push_str("\r\n");
        xml.push_str(&format!(r#"<Types xmlns="{}">"#, CONTENT_TYPES_NS));
        for (ext, ct) in &self.defaults {
            xml.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_attr(ext),
                escape_attr(ct)
            ));
        }
        for (part, ct) in &self.overrides {
            xml.push_str(&format!(
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                escape_attr(part),
                escape_attr(ct)
            ));
        }
        xml.push_str("</Types>");
        xml
    }
}

impl Serializable for ContentTypes {
    fn parse(text: &str) -> Result<Self> {
        Self::from_xml(text.as_bytes())
    }

    fn render(&self) -> String {
        self.to_xml()
    }
}

fn absolute(part_name: &str) -> String {
    if part_name.starts_with('/') {
        part_name.to_string()
    } else {
        format!("/{}", part_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="XML" ContentType="application/xml"/>
  <Default Extension="png" ContentType="image/png"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

    #[test]
    fn test_override_takes_precedence() {
        let types = ContentTypes::from_xml(TYPES.as_bytes()).unwrap();
        assert_eq!(types.content_type("/word/document.xml"), Some(ct::DOCUMENT));
        assert_eq!(types.content_type("word/document.xml"), Some(ct::DOCUMENT));
        assert_eq!(types.content_type("/word/other.xml"), Some(ct::XML));
    }

    #[test]
    fn test_extension_default_is_case_insensitive() {
        let types = ContentTypes::from_xml(TYPES.as_bytes()).unwrap();
        assert_eq!(types.content_type("/word/media/image1.PNG"), Some("image/png"));
        assert!(types.has_default("xml"));
        assert!(types.has_default("Xml"));
    }

    #[test]
    fn test_unknown_type() {
        let types = ContentTypes::from_xml(TYPES.as_bytes()).unwrap();
        assert_eq!(types.content_type("/word/media/clip.mp4"), None);
        assert_eq!(types.content_type("/LICENSE"), None);
    }

    #[test]
    fn test_add_and_render() {
        let mut types = ContentTypes::from_xml(TYPES.as_bytes()).unwrap();
        types.add_default("JPEG", "image/jpeg");
        types.add_override("/word/numbering.xml", ct::NUMBERING);
        types.add_override("/word/numbering.xml", ct::NUMBERING);

        let xml = types.render();
        assert!(xml.contains(r#"<Default Extension="jpeg" ContentType="image/jpeg"/>"#));
        assert_eq!(xml.matches("/word/numbering.xml").count(), 1);

        let reparsed = <ContentTypes as Serializable>::parse(&xml).unwrap();
        assert_eq!(reparsed, types);
        assert!(types.remove_override("word/numbering.xml"));
        assert_eq!(types.content_type("/word/numbering.xml"), Some(ct::XML));
    }

    #[test]
    fn test_mime_table() {
        assert_eq!(mime_type_for_extension("PNG"), Some("image/png"));
        assert_eq!(mime_type_for_extension("jpg"), Some("image/jpeg"));
        assert_eq!(mime_type_for_extension("xyz"), None);
    }
}
