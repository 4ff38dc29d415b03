//! Text ↔ tree conversion
//!
//! Parsing uses quick-xml's event reader and keeps element order, attribute
//! order, text and comments. Rendering writes the tree back without adding
//! any layout whitespace, so `parse_xml(&render_xml(&tree))` reproduces
//! `tree` exactly.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};
use crate::xml::node::{Element, Node};

/// Declaration written in front of every rendered part
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Parse an XML document into its root element.
///
/// The declaration, doctype and processing instructions are dropped.
/// Whitespace-only text inside an element that also has element children
/// is layout and is dropped as well; text in text-only elements is kept
/// verbatim.
pub fn parse_xml(text: &str) -> Result<Node> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => stack.push(element_from_start(e)?),
            Event::Empty(ref e) => {
                let element = element_from_start(e)?;
                attach(&mut stack, &mut root, Node::Element(element))?;
            }
            Event::End(_) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| OoxmlError::structural("unbalanced end tag"))?;
                drop_layout_whitespace(&mut element);
                attach(&mut stack, &mut root, Node::Element(element))?;
            }
            Event::Text(ref e) => {
                if let Some(parent) = stack.last_mut() {
                    push_text(parent, &e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some(parent) = stack.last_mut() {
                    push_text(parent, &String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::Comment(e) => {
                if let Some(parent) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    parent.children.push(Node::Comment(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(OoxmlError::structural(format!(
            "unclosed element <{}>",
            open.name
        )));
    }
    root.ok_or_else(|| OoxmlError::structural("document has no root element"))
}

/// Render a tree as a standalone XML document
pub fn render_xml(root: &Node) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str(XML_DECLARATION);
    out.push_str("\r\n");
    write_node(root, &mut out);
    out
}

/// Render a tree without the XML declaration
pub fn render_fragment(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn element_from_start(start: &BytesStart) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Node>, node: Node) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(OoxmlError::structural("document has more than one root element")),
    }
    Ok(())
}

fn push_text(parent: &mut Element, text: &str) {
    if let Some(Node::Text(previous)) = parent.children.last_mut() {
        previous.push_str(text);
    } else {
        parent.children.push(Node::Text(text.to_string()));
    }
}

fn drop_layout_whitespace(element: &mut Element) {
    if element.children.iter().any(Node::is_element) {
        element
            .children
            .retain(|child| !matches!(child, Node::Text(text) if text.trim().is_empty()));
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(element) => {
            out.push('<');
            out.push_str(&element.name);
            for (key, value) in &element.attributes {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
            if element.children.is_empty() {
                out.push_str("/>");
            } else {
                out.push('>');
                for child in &element.children {
                    write_node(child, out);
                }
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
        }
        Node::Text(text) => out.push_str(&escape_text(text)),
        Node::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
    }
}

/// Escape character data
pub(crate) fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape an attribute value for a double-quoted attribute
pub(crate) fn escape_attr(text: &str) -> String {
    escape_text(text)
        .replace('"', "&quot;")
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAGRAPH: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p w:rsidR="00AB">
      <w:pPr><w:pStyle w:val="Heading1"/></w:pPr>
      <w:r><w:t xml:space="preserve"> spaced &amp; escaped </w:t></w:r>
      <!-- a comment -->
    </w:p>
  </w:body>
</w:document>"#;

    #[test]
    fn test_parse_structure() {
        let root = parse_xml(PARAGRAPH).unwrap();
        assert_eq!(root.tag_name(), Some("w:document"));
        let body = root.first_element("w:body").unwrap();
        let paragraph = body.first_element("w:p").unwrap();
        assert_eq!(paragraph.attr("w:rsidR"), Some("00AB"));
        assert_eq!(paragraph.children().len(), 3);
        assert!(matches!(paragraph.children()[2], Node::Comment(ref c) if c == " a comment "));
        assert_eq!(paragraph.text_content(), " spaced & escaped ");
    }

    #[test]
    fn test_round_trip_is_exact() {
        let tree = parse_xml(PARAGRAPH).unwrap();
        let rendered = render_xml(&tree);
        let reparsed = parse_xml(&rendered).unwrap();
        assert_eq!(tree, reparsed);
        assert_eq!(rendered, render_xml(&reparsed));
    }

    #[test]
    fn test_round_trip_keeps_attribute_order() {
        let xml = r#"<a z="1" y="2" x="3"><b q="&quot;&lt;"/></a>"#;
        let tree = parse_xml(xml).unwrap();
        let names: Vec<_> = tree.attributes().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["z", "y", "x"]);
        let reparsed = parse_xml(&render_xml(&tree)).unwrap();
        assert_eq!(reparsed.children()[0].attr("q"), Some("\"<"));
        assert_eq!(tree, reparsed);
    }

    #[test]
    fn test_text_only_whitespace_is_kept() {
        let tree = parse_xml("<w:t xml:space=\"preserve\">   </w:t>").unwrap();
        assert_eq!(tree.text_content(), "   ");
    }

    #[test]
    fn test_cdata_becomes_text() {
        let tree = parse_xml("<a><![CDATA[x < y]]></a>").unwrap();
        assert_eq!(tree.text_content(), "x < y");
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        assert!(parse_xml("<a><b></a>").is_err());
        assert!(parse_xml("<a>").is_err());
        assert!(parse_xml("").is_err());
        assert!(parse_xml("<a/><b/>").is_err());
    }

    #[test]
    fn test_render_fragment_has_no_declaration() {
        let node = Node::element("w:p").with_child(Node::element("w:r"));
        assert_eq!(render_fragment(&node), "<w:p><w:r/></w:p>");
    }
}
