//! Main document part (word/document.xml)
//!
//! Body access for the merge and template substitutions, plus builders for
//! the paragraphs they generate.

use crate::content_types::ct;
use crate::error::{OoxmlError, Result};
use crate::package::{Part, PartPath};
use crate::serializable::Serializable;
use crate::xml::Node;

/// Element names referring to a style by id through `w:val`
pub const STYLE_REFERENCE_TAGS: [&str; 3] = ["w:pStyle", "w:rStyle", "w:tblStyle"];

/// Attributes holding a relationship id
pub const RELATIONSHIP_ATTRIBUTES: [&str; 4] = ["r:id", "r:embed", "r:link", "r:pict"];

/// The main document part
#[derive(Debug, Clone)]
pub struct MainDocument {
    part: Part,
}

impl MainDocument {
    /// Wrap a loaded main document part
    pub fn from_part(part: Part) -> Result<Self> {
        if !part.tree.is("w:document") {
            return Err(OoxmlError::InvalidStructure(format!(
                "{} has root <{}>, expected <w:document>",
                part.path,
                part.tree.tag_name().unwrap_or_default()
            )));
        }
        if part.tree.first_element("w:body").is_none() {
            return Err(OoxmlError::InvalidStructure(format!(
                "{} has no <w:body>",
                part.path
            )));
        }
        Ok(Self { part })
    }

    /// Parse a detached main document from XML text
    pub fn parse(xml: &str) -> Result<Self> {
        Self::from_part(Part::new(
            PartPath::new("/word/document.xml"),
            Some(ct::DOCUMENT.to_string()),
            Node::parse(xml)?,
        ))
    }

    /// The underlying part
    pub fn part(&self) -> &Part {
        &self.part
    }

    /// Mutable access to the underlying part
    pub fn part_mut(&mut self) -> &mut Part {
        &mut self.part
    }

    /// Give back the part for storing
    pub fn into_part(self) -> Part {
        self.part
    }

    /// The `w:body` element
    pub fn body(&self) -> Result<&Node> {
        self.part
            .tree
            .first_element("w:body")
            .ok_or_else(|| OoxmlError::InvalidStructure("document has no <w:body>".into()))
    }

    /// The `w:body` element, mutable
    pub fn body_mut(&mut self) -> Result<&mut Node> {
        self.part
            .tree
            .first_element_mut("w:body")
            .ok_or_else(|| OoxmlError::InvalidStructure("document has no <w:body>".into()))
    }
}

/// Concatenated `w:t` text of a paragraph (or any subtree)
pub fn paragraph_text(node: &Node) -> String {
    let mut text = String::new();
    collect_run_text(node, &mut text);
    text
}

fn collect_run_text(node: &Node, out: &mut String) {
    for child in node.children() {
        if child.is("w:t") {
            out.push_str(&child.text_content());
        } else {
            collect_run_text(child, out);
        }
    }
}

/// Style id referenced by a paragraph's `w:pPr/w:pStyle`
pub fn paragraph_style(paragraph: &Node) -> Option<&str> {
    paragraph
        .first_element("w:pPr")
        .and_then(|ppr| ppr.first_element("w:pStyle"))
        .and_then(|style| style.attr("w:val"))
}

/// Numbering instance id referenced by a paragraph's `w:pPr/w:numPr`
pub fn paragraph_num_id(paragraph: &Node) -> Option<&str> {
    paragraph
        .first_element("w:pPr")
        .and_then(|ppr| ppr.first_element("w:numPr"))
        .and_then(|numpr| numpr.first_element("w:numId"))
        .and_then(|num| num.attr("w:val"))
}

/// A run holding literal text
pub fn run(text: &str) -> Node {
    let mut t = Node::element("w:t");
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        t = t.with_attr("xml:space", "preserve");
    }
    Node::element("w:r").with_child(t.with_child(Node::new_text(text)))
}

/// A paragraph with one run of text, optionally styled
pub fn paragraph(style_id: Option<&str>, text: &str) -> Node {
    let mut p = Node::element("w:p");
    if let Some(style_id) = style_id {
        p = p.with_child(
            Node::element("w:pPr")
                .with_child(Node::element("w:pStyle").with_attr("w:val", style_id)),
        );
    }
    if !text.is_empty() {
        p = p.with_child(run(text));
    }
    p
}

/// A list item paragraph referencing numbering instance `num_id`
pub fn list_paragraph(style_id: &str, num_id: &str, level: usize, text: &str) -> Node {
    let ppr = Node::element("w:pPr")
        .with_child(Node::element("w:pStyle").with_attr("w:val", style_id))
        .with_child(
            Node::element("w:numPr")
                .with_child(Node::element("w:ilvl").with_attr("w:val", level.to_string()))
                .with_child(Node::element("w:numId").with_attr("w:val", num_id)),
        );
    Node::element("w:p").with_child(ppr).with_child(run(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p>
      <w:pPr><w:pStyle w:val="Title"/><w:numPr><w:ilvl w:val="0"/><w:numId w:val="7"/></w:numPr></w:pPr>
      <w:r><w:t>{{{</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>body</w:t></w:r><w:r><w:t>}}}</w:t></w:r>
    </w:p>
    <w:sectPr/>
  </w:body>
</w:document>"#;

    #[test]
    fn test_paragraph_text_spans_runs() {
        let doc = MainDocument::parse(DOC).unwrap();
        let p = doc.body().unwrap().first_element("w:p").unwrap();
        assert_eq!(paragraph_text(p), "{{{body}}}");
        assert_eq!(paragraph_style(p), Some("Title"));
        assert_eq!(paragraph_num_id(p), Some("7"));
    }

    #[test]
    fn test_builders() {
        let p = paragraph(Some("Caption"), "Figure 1");
        assert_eq!(paragraph_style(&p), Some("Caption"));
        assert_eq!(paragraph_text(&p), "Figure 1");
        assert!(paragraph(None, "").children().is_empty());

        let item = list_paragraph("ListNumber", "12", 1, " spaced ");
        assert_eq!(paragraph_num_id(&item), Some("12"));
        assert_eq!(paragraph_text(&item), " spaced ");
        let t = item.child(&[1.into(), 0.into()]).unwrap();
        assert_eq!(t.attr("xml:space"), Some("preserve"));
    }

    #[test]
    fn test_requires_body() {
        assert!(MainDocument::parse("<w:document/>").is_err());
        assert!(MainDocument::parse("<w:styles/>").is_err());
    }
}
