//! Shared test utilities for docweave-ooxml
//!
//! In-memory DOCX fixtures built with `ZipWriter`. Used by the unit tests
//! of this crate and by the integration tests of the workspace.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::content_types::ct;
use crate::error::Result;
use crate::package::Package;
use crate::relationships::{Relationships, TARGET_MODE_EXTERNAL};

/// WordprocessingML main namespace
pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Office document relationships namespace (the `r:` prefix)
pub const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const STYLES_REL_ID: &str = "rId100";
const NUMBERING_REL_ID: &str = "rId101";

/// Create a minimal valid DOCX with a `Normal` style and one empty paragraph
pub fn create_minimal_docx() -> Result<Vec<u8>> {
    DocxFixture::new().build()
}

/// Builder for small DOCX/DOTX packages
#[derive(Debug, Clone)]
pub struct DocxFixture {
    body: String,
    styles: String,
    numbering: Option<String>,
    /// (id, type, target, external)
    relationships: Vec<(String, String, String, bool)>,
    /// (member name, bytes)
    files: Vec<(String, Vec<u8>)>,
    defaults: Vec<(String, String)>,
    headers: Vec<String>,
    footers: Vec<String>,
    template: bool,
}

impl Default for DocxFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl DocxFixture {
    /// A package with a `Normal` style and one empty paragraph
    pub fn new() -> Self {
        Self {
            body: "<w:p/>".to_string(),
            styles: paragraph_style_xml("Normal", "Normal"),
            numbering: None,
            relationships: Vec::new(),
            files: Vec::new(),
            defaults: Vec::new(),
            headers: Vec::new(),
            footers: Vec::new(),
            template: false,
        }
    }

    /// Inner XML of `w:body`
    pub fn body(mut self, xml: impl Into<String>) -> Self {
        self.body = xml.into();
        self
    }

    /// Inner XML of `w:styles`
    pub fn styles(mut self, xml: impl Into<String>) -> Self {
        self.styles = xml.into();
        self
    }

    /// Inner XML of `w:numbering`; adds the numbering part
    pub fn numbering(mut self, xml: impl Into<String>) -> Self {
        self.numbering = Some(xml.into());
        self
    }

    /// Internal relationship of the main document
    pub fn relationship(mut self, id: &str, rel_type: &str, target: &str) -> Self {
        self.relationships
            .push((id.to_string(), rel_type.to_string(), target.to_string(), false));
        self
    }

    /// External relationship of the main document
    pub fn external_relationship(mut self, id: &str, rel_type: &str, target: &str) -> Self {
        self.relationships
            .push((id.to_string(), rel_type.to_string(), target.to_string(), true));
        self
    }

    /// Arbitrary archive member
    pub fn file(mut self, name: &str, bytes: &[u8]) -> Self {
        self.files.push((name.to_string(), bytes.to_vec()));
        self
    }

    /// Extension default in the content-type registry
    pub fn default_content_type(mut self, extension: &str, content_type: &str) -> Self {
        self.defaults
            .push((extension.to_string(), content_type.to_string()));
        self
    }

    /// Header part with the given inner XML of `w:hdr`
    pub fn header(mut self, xml: impl Into<String>) -> Self {
        self.headers.push(xml.into());
        self
    }

    /// Footer part with the given inner XML of `w:ftr`
    pub fn footer(mut self, xml: impl Into<String>) -> Self {
        self.footers.push(xml.into());
        self
    }

    /// Declare the main part as a template (`.dotx`) main part
    pub fn as_template(mut self) -> Self {
        self.template = true;
        self
    }

    /// Build and open the package
    pub fn package(&self) -> Result<Package> {
        Package::from_bytes(&self.build()?)
    }

    /// Write the ZIP archive
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        let main_type = if self.template {
            ct::TEMPLATE
        } else {
            ct::DOCUMENT
        };

        // [Content_Types].xml
        let mut types = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
"#,
        );
        for (extension, content_type) in &self.defaults {
            types.push_str(&format!(
                "  <Default Extension=\"{}\" ContentType=\"{}\"/>\n",
                extension, content_type
            ));
        }
        let mut overrides = vec![
            ("/word/document.xml".to_string(), main_type),
            ("/word/styles.xml".to_string(), ct::STYLES),
        ];
        if self.numbering.is_some() {
            overrides.push(("/word/numbering.xml".to_string(), ct::NUMBERING));
        }
        for n in 1..=self.headers.len() {
            overrides.push((format!("/word/header{}.xml", n), ct::HEADER));
        }
        for n in 1..=self.footers.len() {
            overrides.push((format!("/word/footer{}.xml", n), ct::FOOTER));
        }
        for (part, content_type) in &overrides {
            types.push_str(&format!(
                "  <Override PartName=\"{}\" ContentType=\"{}\"/>\n",
                part, content_type
            ));
        }
        types.push_str("</Types>");
        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(types.as_bytes())?;

        // _rels/.rels
        zip.start_file("_rels/.rels", options)?;
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#,
        )?;

        // word/_rels/document.xml.rels
        let mut rels = Relationships::new();
        rels.insert(
            STYLES_REL_ID,
            relationship(Relationships::TYPE_STYLES, "styles.xml", false),
        );
        if self.numbering.is_some() {
            rels.insert(
                NUMBERING_REL_ID,
                relationship(Relationships::TYPE_NUMBERING, "numbering.xml", false),
            );
        }
        for n in 1..=self.headers.len() {
            rels.insert(
                format!("rId{}", 200 + n),
                relationship(Relationships::TYPE_HEADER, &format!("header{}.xml", n), false),
            );
        }
        for n in 1..=self.footers.len() {
            rels.insert(
                format!("rId{}", 300 + n),
                relationship(Relationships::TYPE_FOOTER, &format!("footer{}.xml", n), false),
            );
        }
        for (id, rel_type, target, external) in &self.relationships {
            rels.insert(id.as_str(), relationship(rel_type, target, *external));
        }
        zip.start_file("word/_rels/document.xml.rels", options)?;
        zip.write_all(rels.to_xml().as_bytes())?;

        // word/document.xml
        zip.start_file("word/document.xml", options)?;
        zip.write_all(
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{}" xmlns:r="{}"><w:body>{}</w:body></w:document>"#,
                W_NS, R_NS, self.body
            )
            .as_bytes(),
        )?;

        // word/styles.xml
        zip.start_file("word/styles.xml", options)?;
        zip.write_all(
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="{}">{}</w:styles>"#,
                W_NS, self.styles
            )
            .as_bytes(),
        )?;

        if let Some(numbering) = &self.numbering {
            zip.start_file("word/numbering.xml", options)?;
            zip.write_all(
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="{}">{}</w:numbering>"#,
                    W_NS, numbering
                )
                .as_bytes(),
            )?;
        }

        for (n, header) in self.headers.iter().enumerate() {
            zip.start_file(format!("word/header{}.xml", n + 1), options)?;
            zip.write_all(
                format!(r#"<w:hdr xmlns:w="{}" xmlns:r="{}">{}</w:hdr>"#, W_NS, R_NS, header)
                    .as_bytes(),
            )?;
        }
        for (n, footer) in self.footers.iter().enumerate() {
            zip.start_file(format!("word/footer{}.xml", n + 1), options)?;
            zip.write_all(
                format!(r#"<w:ftr xmlns:w="{}" xmlns:r="{}">{}</w:ftr>"#, W_NS, R_NS, footer)
                    .as_bytes(),
            )?;
        }

        for (name, bytes) in &self.files {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(bytes)?;
        }

        zip.finish()?;
        Ok(buffer.into_inner())
    }
}

fn relationship(
    rel_type: &str,
    target: &str,
    external: bool,
) -> crate::relationships::RelationshipTarget {
    crate::relationships::RelationshipTarget {
        target: target.to_string(),
        rel_type: rel_type.to_string(),
        target_mode: external.then(|| TARGET_MODE_EXTERNAL.to_string()),
    }
}

/// A paragraph style definition
pub fn paragraph_style_xml(id: &str, name: &str) -> String {
    format!(
        r#"<w:style w:type="paragraph" w:styleId="{}"><w:name w:val="{}"/></w:style>"#,
        id, name
    )
}

/// An abstract numbering whose levels all use `format`
pub fn abstract_num_xml(id: &str, format: &str) -> String {
    let levels: String = (0..crate::numbering::LEVEL_COUNT)
        .map(|level| {
            format!(
                r#"<w:lvl w:ilvl="{}"><w:start w:val="1"/><w:numFmt w:val="{}"/></w:lvl>"#,
                level, format
            )
        })
        .collect();
    format!(r#"<w:abstractNum w:abstractNumId="{}">{}</w:abstractNum>"#, id, levels)
}

/// A numbering instance
pub fn num_xml(num_id: &str, abstract_num_id: &str) -> String {
    format!(
        r#"<w:num w:numId="{}"><w:abstractNumId w:val="{}"/></w:num>"#,
        num_id, abstract_num_id
    )
}

/// A paragraph with one run, optionally styled
pub fn paragraph_xml(style_id: Option<&str>, text: &str) -> String {
    let ppr = style_id
        .map(|id| format!(r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, id))
        .unwrap_or_default();
    format!(r#"<w:p>{}<w:r><w:t>{}</w:t></w:r></w:p>"#, ppr, text)
}

/// A list item paragraph
pub fn list_paragraph_xml(num_id: &str, text: &str) -> String {
    format!(
        r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="{}"/></w:numPr></w:pPr><w:r><w:t>{}</w:t></w:r></w:p>"#,
        num_id, text
    )
}
