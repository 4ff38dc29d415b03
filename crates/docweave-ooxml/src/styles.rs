//! Style definitions (word/styles.xml)
//!
//! [`StyleTable`] owns the loaded styles part and answers lookups by id
//! and by display name. [`Style`] is a borrowed view over one `w:style`
//! element; the tree stays the single source of truth, so a style cloned
//! into another package carries every property verbatim.

use std::collections::HashSet;

use crate::content_types::ct;
use crate::error::{OoxmlError, Result};
use crate::package::{Part, PartPath};
use crate::serializable::Serializable;
use crate::xml::{tag, Node};

/// Type of style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleType {
    /// Paragraph style
    Paragraph,
    /// Character (run) style
    Character,
    /// Table style
    Table,
    /// Numbering style
    Numbering,
}

impl StyleType {
    fn from_attr(value: &str) -> Self {
        match value {
            "character" => StyleType::Character,
            "table" => StyleType::Table,
            "numbering" => StyleType::Numbering,
            _ => StyleType::Paragraph,
        }
    }
}

/// Style-to-style references carried inside a style definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleReference {
    /// `w:basedOn`: inherited properties
    BasedOn,
    /// `w:link`: the paired paragraph/character style
    Link,
    /// `w:next`: style of the paragraph that follows
    Next,
}

impl StyleReference {
    /// All reference kinds, in schema order
    pub const ALL: [StyleReference; 3] = [
        StyleReference::BasedOn,
        StyleReference::Next,
        StyleReference::Link,
    ];

    /// Element name of the reference
    pub fn tag(self) -> &'static str {
        match self {
            StyleReference::BasedOn => "w:basedOn",
            StyleReference::Link => "w:link",
            StyleReference::Next => "w:next",
        }
    }
}

/// Borrowed view of a `w:style` element
#[derive(Debug, Clone, Copy)]
pub struct Style<'a> {
    node: &'a Node,
}

impl<'a> Style<'a> {
    /// View a `w:style` node
    pub fn new(node: &'a Node) -> Self {
        Self { node }
    }

    /// The underlying element
    pub fn node(&self) -> &'a Node {
        self.node
    }

    /// Style ID (used in document references)
    pub fn id(&self) -> Option<&'a str> {
        self.node.attr("w:styleId")
    }

    /// Display name
    pub fn name(&self) -> Option<&'a str> {
        child_val(self.node, "w:name")
    }

    /// Style type (paragraph when absent)
    pub fn style_type(&self) -> StyleType {
        self.node
            .attr("w:type")
            .map(StyleType::from_attr)
            .unwrap_or(StyleType::Paragraph)
    }

    /// Whether this is the default style of its type
    pub fn is_default(&self) -> bool {
        matches!(self.node.attr("w:default"), Some("1") | Some("true"))
    }

    /// Base style ID (for inheritance)
    pub fn based_on(&self) -> Option<&'a str> {
        self.reference(StyleReference::BasedOn)
    }

    /// Linked style ID
    pub fn link(&self) -> Option<&'a str> {
        self.reference(StyleReference::Link)
    }

    /// Next style ID (for following paragraphs)
    pub fn next(&self) -> Option<&'a str> {
        self.reference(StyleReference::Next)
    }

    /// Value of one style reference
    pub fn reference(&self, kind: StyleReference) -> Option<&'a str> {
        child_val(self.node, kind.tag())
    }
}

/// Set a style reference on a `w:style` node, creating the element if needed
pub fn set_reference(style: &mut Node, kind: StyleReference, id: &str) -> Result<()> {
    match style.first_element_mut(kind.tag()) {
        Some(reference) => reference.set_attr("w:val", id),
        None => {
            let preceding: &[&str] = match kind {
                StyleReference::BasedOn => &["w:name", "w:aliases"],
                StyleReference::Next => &["w:name", "w:aliases", "w:basedOn"],
                StyleReference::Link => &["w:name", "w:aliases", "w:basedOn", "w:next"],
            };
            let position = style
                .children()
                .iter()
                .take_while(|child| preceding.iter().any(|name| child.is(name)))
                .count();
            style.insert_children(
                &[position.into()],
                [Node::element(kind.tag()).with_attr("w:val", id)],
            )
        }
    }
}

fn child_val<'a>(node: &'a Node, name: &str) -> Option<&'a str> {
    node.first_element(name).and_then(|child| child.attr("w:val"))
}

/// The styles part of a package
#[derive(Debug, Clone)]
pub struct StyleTable {
    part: Part,
}

impl StyleTable {
    /// Wrap a loaded styles part
    pub fn from_part(part: Part) -> Result<Self> {
        if !part.tree.is("w:styles") {
            return Err(OoxmlError::InvalidStructure(format!(
                "{} has root <{}>, expected <w:styles>",
                part.path,
                part.tree.tag_name().unwrap_or_default()
            )));
        }
        Ok(Self { part })
    }

    /// Parse a detached styles table from XML text
    pub fn parse(xml: &str) -> Result<Self> {
        Self::from_part(Part::new(
            PartPath::new("/word/styles.xml"),
            Some(ct::STYLES.to_string()),
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

    /// All styles in document order
    pub fn styles(&self) -> impl Iterator<Item = Style<'_>> {
        self.part.tree.elements("w:style").map(Style::new)
    }

    /// Number of style definitions
    pub fn len(&self) -> usize {
        self.styles().count()
    }

    /// Whether the table has no styles
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a style by id
    pub fn get(&self, id: &str) -> Option<Style<'_>> {
        self.styles().find(|style| style.id() == Some(id))
    }

    /// Mutable `w:style` node with the given id
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.part
            .tree
            .children_mut()
            .ok()?
            .iter_mut()
            .find(|node| node.is("w:style") && node.attr("w:styleId") == Some(id))
    }

    /// Look up a style by display name (first match)
    pub fn get_by_name(&self, name: &str) -> Option<Style<'_>> {
        self.styles().find(|style| style.name() == Some(name))
    }

    /// Style ids in document order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.styles().filter_map(|style| style.id())
    }

    /// Whether a style with this id exists
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// `base` when free, else the first free `base1`, `base2`, ...
    pub fn unused_id(&self, base: &str) -> String {
        let taken: HashSet<&str> = self.ids().collect();
        first_unused(base, |n| format!("{}{}", base, n), |candidate| {
            taken.contains(candidate)
        })
    }

    /// `base` when free, else the first free `base (1)`, `base (2)`, ...
    pub fn unused_name(&self, base: &str) -> String {
        let taken: HashSet<&str> = self.styles().filter_map(|style| style.name()).collect();
        first_unused(base, |n| format!("{} ({})", base, n), |candidate| {
            taken.contains(candidate)
        })
    }

    /// Append a `w:style` definition after the existing styles
    pub fn insert(&mut self, style: Node) -> Result<()> {
        if !style.is("w:style") {
            return Err(OoxmlError::InvalidStructure(format!(
                "cannot insert <{}> into the style table",
                style.tag_name().unwrap_or_default()
            )));
        }
        let after_last = self
            .part
            .tree
            .children()
            .iter()
            .rposition(|child| child.is("w:style"))
            .map(|position| position + 1);
        match after_last {
            Some(position) => self
                .part
                .tree
                .insert_children(&[position.into()], [style]),
            None => self.part.tree.push_child(&[], style),
        }
    }

    /// The `w:docDefaults` block
    pub fn doc_defaults(&self) -> Option<&Node> {
        self.part.tree.find_child(tag("w:docDefaults")).ok().flatten()
    }

    /// The `w:latentStyles` block
    pub fn latent_styles(&self) -> Option<&Node> {
        self.part.tree.find_child(tag("w:latentStyles")).ok().flatten()
    }

    /// Default style of a type
    pub fn default_style(&self, style_type: StyleType) -> Option<Style<'_>> {
        self.styles()
            .find(|style| style.style_type() == style_type && style.is_default())
    }

    /// Resolve the full inheritance chain for a style
    pub fn resolve_chain(&self, style_id: &str) -> Vec<Style<'_>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.get(style_id);

        while let Some(style) = current {
            let Some(id) = style.id() else { break };
            if !seen.insert(id) {
                break; // cyclic basedOn chain
            }
            chain.push(style);
            current = style.based_on().and_then(|base| self.get(base));
        }

        chain
    }

    /// References among styles that point at no existing style
    pub fn dangling_references(&self) -> Vec<(String, StyleReference, String)> {
        let ids: HashSet<&str> = self.ids().collect();
        let mut dangling = Vec::new();
        for style in self.styles() {
            for kind in StyleReference::ALL {
                if let Some(target) = style.reference(kind) {
                    if !ids.contains(target) {
                        dangling.push((
                            style.id().unwrap_or_default().to_string(),
                            kind,
                            target.to_string(),
                        ));
                    }
                }
            }
        }
        dangling
    }
}

fn first_unused(
    base: &str,
    candidate: impl Fn(usize) -> String,
    taken: impl Fn(&str) -> bool,
) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (1..)
        .map(candidate)
        .find(|name| !taken(name))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:docDefaults><w:rPrDefault><w:rPr><w:lang w:val="en-US"/></w:rPr></w:rPrDefault></w:docDefaults>
  <w:latentStyles w:defQFormat="0"/>
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading1">
    <w:name w:val="heading 1"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:link w:val="Heading1Char"/>
    <w:pPr><w:outlineLvl w:val="0"/></w:pPr>
  </w:style>
  <w:style w:type="character" w:styleId="Heading1Char">
    <w:name w:val="Heading 1 Char"/>
    <w:link w:val="Heading1"/>
  </w:style>
  <w:style w:type="table" w:styleId="TableGrid">
    <w:name w:val="Table Grid"/>
  </w:style>
</w:styles>"#;

    #[test]
    fn test_lookups() {
        let table = StyleTable::parse(STYLES).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.get("Heading1").unwrap().name(), Some("heading 1"));
        assert_eq!(table.get_by_name("Heading 1 Char").unwrap().id(), Some("Heading1Char"));
        assert!(table.get_by_name("missing").is_none());
        assert!(table.contains("TableGrid"));
        assert_eq!(table.get("TableGrid").unwrap().style_type(), StyleType::Table);
        assert_eq!(
            table.default_style(StyleType::Paragraph).unwrap().id(),
            Some("Normal")
        );
    }

    #[test]
    fn test_references_are_distinct() {
        let table = StyleTable::parse(STYLES).unwrap();
        let heading = table.get("Heading1").unwrap();
        assert_eq!(heading.based_on(), Some("Normal"));
        assert_eq!(heading.next(), Some("Normal"));
        assert_eq!(heading.link(), Some("Heading1Char"));
    }

    #[test]
    fn test_unused_id_and_name() {
        let table = StyleTable::parse(STYLES).unwrap();
        assert_eq!(table.unused_id("Title"), "Title");
        assert_eq!(table.unused_id("Heading1"), "Heading11");
        assert_eq!(table.unused_name("Normal"), "Normal (1)");
        assert_eq!(table.unused_name("Caption"), "Caption");
    }

    #[test]
    fn test_insert_after_existing_styles() {
        let mut table = StyleTable::parse(STYLES).unwrap();
        table.part_mut().tree.push_child(&[], Node::new_comment("tail")).unwrap();
        table
            .insert(
                Node::element("w:style")
                    .with_attr("w:styleId", "Quote")
                    .with_child(Node::element("w:name").with_attr("w:val", "Quote")),
            )
            .unwrap();
        let children = table.part().tree.children();
        assert!(children[children.len() - 2].is("w:style"));
        assert!(matches!(children[children.len() - 1], Node::Comment(_)));
        assert!(table.contains("Quote"));

        assert!(table.insert(Node::element("w:p")).is_err());
    }

    #[test]
    fn test_set_reference() {
        let mut table = StyleTable::parse(STYLES).unwrap();
        let style = table.get_mut("TableGrid").unwrap();
        set_reference(style, StyleReference::BasedOn, "Normal").unwrap();
        set_reference(style, StyleReference::Next, "Normal").unwrap();
        set_reference(style, StyleReference::Next, "Heading1").unwrap();

        let grid = table.get("TableGrid").unwrap();
        assert_eq!(grid.based_on(), Some("Normal"));
        assert_eq!(grid.next(), Some("Heading1"));
        let order: Vec<_> = grid.node().children().iter().filter_map(Node::tag_name).collect();
        assert_eq!(order, vec!["w:name", "w:basedOn", "w:next"]);
    }

    #[test]
    fn test_blocks_and_chain() {
        let table = StyleTable::parse(STYLES).unwrap();
        assert!(table.doc_defaults().is_some());
        assert!(table.latent_styles().is_some());

        let chain: Vec<_> = table
            .resolve_chain("Heading1")
            .iter()
            .filter_map(|s| s.id())
            .collect();
        assert_eq!(chain, vec!["Heading1", "Normal"]);
        assert!(table.dangling_references().is_empty());
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        assert!(matches!(
            StyleTable::parse("<w:numbering/>"),
            Err(OoxmlError::InvalidStructure(_))
        ));
    }
}
