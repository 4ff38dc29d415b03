//! Numbering definitions (word/numbering.xml)
//!
//! A list paragraph references a numbering instance (`w:num`) by id; the
//! instance points at an abstract numbering (`w:abstractNum`) that defines
//! the per-level formats, and may override level start values.
//! All `w:abstractNum` elements precede all `w:num` elements.

use crate::content_types::ct;
use crate::error::{OoxmlError, Result};
use crate::package::{Part, PartPath};
use crate::serializable::Serializable;
use crate::xml::Node;

/// Number of list levels a numbering definition carries
pub const LEVEL_COUNT: usize = 9;

/// Read view of a `w:abstractNum`
#[derive(Debug, Clone, Copy)]
pub struct AbstractNumbering<'a> {
    node: &'a Node,
}

impl<'a> AbstractNumbering<'a> {
    /// The underlying element
    pub fn node(&self) -> &'a Node {
        self.node
    }

    /// `w:abstractNumId`
    pub fn id(&self) -> Option<&'a str> {
        self.node.attr("w:abstractNumId")
    }

    /// The `w:lvl` with `w:ilvl == level`
    pub fn level(&self, level: usize) -> Option<&'a Node> {
        find_level(self.node, "w:lvl", level)
    }

    /// Format code of a level (`decimal`, `bullet`, ...), if the level
    /// exists and declares one
    pub fn format(&self, level: usize) -> Option<&'a str> {
        self.level(level)
            .and_then(|lvl| lvl.first_element("w:numFmt"))
            .and_then(|fmt| fmt.attr("w:val"))
    }
}

/// Mutable handle on a `w:abstractNum`
#[derive(Debug)]
pub struct AbstractNumberingMut<'a> {
    node: &'a mut Node,
}

impl AbstractNumberingMut<'_> {
    /// The `w:lvl` for `level`, appended empty when missing
    pub fn level(&mut self, level: usize) -> Result<&mut Node> {
        find_or_create_level(self.node, "w:lvl", level)
    }
}

/// Read view of a `w:num`
#[derive(Debug, Clone, Copy)]
pub struct Num<'a> {
    node: &'a Node,
}

impl<'a> Num<'a> {
    /// The underlying element
    pub fn node(&self) -> &'a Node {
        self.node
    }

    /// `w:numId`
    pub fn id(&self) -> Option<&'a str> {
        self.node.attr("w:numId")
    }

    /// Referenced abstract numbering id
    pub fn abstract_num_id(&self) -> Option<&'a str> {
        self.node
            .first_element("w:abstractNumId")
            .and_then(|abs| abs.attr("w:val"))
    }

    /// The `w:lvlOverride` for `level`
    pub fn level_override(&self, level: usize) -> Option<&'a Node> {
        find_level(self.node, "w:lvlOverride", level)
    }

    /// Start override value of a level
    pub fn start_override(&self, level: usize) -> Option<&'a str> {
        self.level_override(level)
            .and_then(|lvl| lvl.first_element("w:startOverride"))
            .and_then(|start| start.attr("w:val"))
    }
}

/// Mutable handle on a `w:num`
#[derive(Debug)]
pub struct NumMut<'a> {
    node: &'a mut Node,
}

impl NumMut<'_> {
    /// The `w:lvlOverride` for `level`, appended empty when missing
    pub fn level_override(&mut self, level: usize) -> Result<&mut Node> {
        find_or_create_level(self.node, "w:lvlOverride", level)
    }

    /// Force the start value of a level
    pub fn set_start_override(&mut self, level: usize, start: u32) -> Result<()> {
        let lvl = self.level_override(level)?;
        match lvl.first_element_mut("w:startOverride") {
            Some(existing) => existing.set_attr("w:val", start.to_string()),
            None => lvl.unshift_child(
                &[],
                Node::element("w:startOverride").with_attr("w:val", start.to_string()),
            ),
        }
    }
}

fn find_level<'a>(node: &'a Node, name: &'a str, level: usize) -> Option<&'a Node> {
    let level = level.to_string();
    node.elements(name)
        .find(|lvl| lvl.attr("w:ilvl") == Some(level.as_str()))
}

fn find_or_create_level<'a>(node: &'a mut Node, name: &str, level: usize) -> Result<&'a mut Node> {
    let ilvl = level.to_string();
    let children = node.children_mut()?;
    let position = match children
        .iter()
        .position(|child| child.is(name) && child.attr("w:ilvl") == Some(ilvl.as_str()))
    {
        Some(position) => position,
        None => {
            children.push(Node::element(name).with_attr("w:ilvl", ilvl));
            children.len() - 1
        }
    };
    Ok(&mut children[position])
}

/// The numbering part of a package
#[derive(Debug, Clone)]
pub struct NumberingTable {
    part: Part,
}

impl NumberingTable {
    /// Wrap a loaded numbering part
    pub fn from_part(part: Part) -> Result<Self> {
        if !part.tree.is("w:numbering") {
            return Err(OoxmlError::InvalidStructure(format!(
                "{} has root <{}>, expected <w:numbering>",
                part.path,
                part.tree.tag_name().unwrap_or_default()
            )));
        }
        Ok(Self { part })
    }

    /// Parse a detached numbering table from XML text
    pub fn parse(xml: &str) -> Result<Self> {
        Self::from_part(Part::new(
            PartPath::new("/word/numbering.xml"),
            Some(ct::NUMBERING.to_string()),
            Node::parse(xml)?,
        ))
    }

    /// The underlying part
    pub fn part(&self) -> &Part {
        &self.part
    }

    /// Give back the part for storing
    pub fn into_part(self) -> Part {
        self.part
    }

    /// Abstract numberings in document order
    pub fn abstract_numberings(&self) -> impl Iterator<Item = AbstractNumbering<'_>> {
        self.part
            .tree
            .elements("w:abstractNum")
            .map(|node| AbstractNumbering { node })
    }

    /// Look up an abstract numbering by id
    pub fn abstract_numbering(&self, id: &str) -> Option<AbstractNumbering<'_>> {
        self.abstract_numberings().find(|abs| abs.id() == Some(id))
    }

    /// Mutable handle on an abstract numbering
    pub fn abstract_numbering_mut(&mut self, id: &str) -> Option<AbstractNumberingMut<'_>> {
        self.find_mut("w:abstractNum", "w:abstractNumId", id)
            .map(|node| AbstractNumberingMut { node })
    }

    /// Numbering instances in document order
    pub fn nums(&self) -> impl Iterator<Item = Num<'_>> {
        self.part.tree.elements("w:num").map(|node| Num { node })
    }

    /// Look up a numbering instance by id
    pub fn num(&self, id: &str) -> Option<Num<'_>> {
        self.nums().find(|num| num.id() == Some(id))
    }

    /// Mutable handle on a numbering instance
    pub fn num_mut(&mut self, id: &str) -> Option<NumMut<'_>> {
        self.find_mut("w:num", "w:numId", id)
            .map(|node| NumMut { node })
    }

    fn find_mut(&mut self, name: &str, id_attr: &str, id: &str) -> Option<&mut Node> {
        self.part
            .tree
            .children_mut()
            .ok()?
            .iter_mut()
            .find(|node| node.is(name) && node.attr(id_attr) == Some(id))
    }

    /// Numbering instance ids in document order
    pub fn num_ids(&self) -> impl Iterator<Item = &str> {
        self.nums().filter_map(|num| num.id())
    }

    /// Smallest integer id ≥ 1 not used by any numbering instance
    pub fn unused_num_id(&self) -> String {
        let taken: Vec<&str> = self.num_ids().collect();
        (1u32..)
            .map(|n| n.to_string())
            .find(|id| !taken.contains(&id.as_str()))
            .unwrap_or_default()
    }

    /// Insert a `w:num` after the last numbering instance, keeping every
    /// `w:abstractNum` ahead of the instances
    pub fn insert_num(&mut self, num: Node) -> Result<()> {
        if !num.is("w:num") {
            return Err(OoxmlError::InvalidStructure(format!(
                "cannot insert <{}> as a numbering instance",
                num.tag_name().unwrap_or_default()
            )));
        }
        let children = self.part.tree.children();
        let position = children
            .iter()
            .rposition(|child| child.is("w:num") || child.is("w:abstractNum"))
            .map(|position| position + 1)
            .unwrap_or(children.len());
        self.part.tree.insert_children(&[position.into()], [num])
    }

    /// Create a numbering instance for `abstract_num_id` under a fresh id
    pub fn add_num(&mut self, abstract_num_id: &str) -> Result<String> {
        if self.abstract_numbering(abstract_num_id).is_none() {
            return Err(OoxmlError::DanglingNumbering(format!(
                "abstract numbering {} does not exist",
                abstract_num_id
            )));
        }
        let id = self.unused_num_id();
        self.insert_num(
            Node::element("w:num")
                .with_attr("w:numId", id.clone())
                .with_child(Node::element("w:abstractNumId").with_attr("w:val", abstract_num_id)),
        )?;
        Ok(id)
    }

    /// Level-0 format code of the abstract numbering behind `num_id`.
    ///
    /// A missing level 0 or `w:numFmt` is reported as an unsupported format.
    pub fn level0_format(&self, num_id: &str) -> Result<&str> {
        let num = self.num(num_id).ok_or_else(|| {
            OoxmlError::DanglingNumbering(format!("numbering instance {} does not exist", num_id))
        })?;
        let abstract_id = num.abstract_num_id().ok_or_else(|| {
            OoxmlError::DanglingNumbering(format!(
                "numbering instance {} has no abstract numbering reference",
                num_id
            ))
        })?;
        let abstract_numbering = self.abstract_numbering(abstract_id).ok_or_else(|| {
            OoxmlError::DanglingNumbering(format!(
                "numbering instance {} references missing abstract numbering {}",
                num_id, abstract_id
            ))
        })?;
        abstract_numbering
            .format(0)
            .ok_or_else(|| OoxmlError::UnsupportedNumberingFormat {
                num_id: num_id.to_string(),
                format: "none".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUMBERING: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:abstractNum w:abstractNumId="0">
    <w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="decimal"/></w:lvl>
    <w:lvl w:ilvl="1"><w:numFmt w:val="lowerLetter"/></w:lvl>
  </w:abstractNum>
  <w:abstractNum w:abstractNumId="1">
    <w:lvl w:ilvl="0"><w:numFmt w:val="bullet"/><w:lvlText w:val="•"/></w:lvl>
  </w:abstractNum>
  <w:abstractNum w:abstractNumId="2">
    <w:lvl w:ilvl="0"><w:start w:val="1"/></w:lvl>
  </w:abstractNum>
  <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
  <w:num w:numId="3"><w:abstractNumId w:val="1"/></w:num>
  <w:num w:numId="4"><w:abstractNumId w:val="2"/></w:num>
  <w:num w:numId="5"><w:abstractNumId w:val="9"/></w:num>
</w:numbering>"#;

    #[test]
    fn test_level0_format() {
        let table = NumberingTable::parse(NUMBERING).unwrap();
        assert_eq!(table.level0_format("1").unwrap(), "decimal");
        assert_eq!(table.level0_format("3").unwrap(), "bullet");
        assert!(matches!(
            table.level0_format("4"),
            Err(OoxmlError::UnsupportedNumberingFormat { ref num_id, ref format })
                if num_id == "4" && format == "none"
        ));

        let without_level0 = NumberingTable::parse(
            r#"<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:abstractNum w:abstractNumId="0"><w:lvl w:ilvl="1"><w:numFmt w:val="decimal"/></w:lvl></w:abstractNum><w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num></w:numbering>"#,
        )
        .unwrap();
        assert!(matches!(
            without_level0.level0_format("1"),
            Err(OoxmlError::UnsupportedNumberingFormat { .. })
        ));
        assert!(matches!(
            table.level0_format("5"),
            Err(OoxmlError::DanglingNumbering(_))
        ));
        assert!(matches!(
            table.level0_format("42"),
            Err(OoxmlError::DanglingNumbering(_))
        ));
    }

    #[test]
    fn test_unused_num_id() {
        let table = NumberingTable::parse(NUMBERING).unwrap();
        assert_eq!(table.unused_num_id(), "2");
    }

    #[test]
    fn test_add_num_keeps_abstract_first() {
        let mut table = NumberingTable::parse(NUMBERING).unwrap();
        let id = table.add_num("1").unwrap();
        assert_eq!(id, "2");
        let id = table.add_num("1").unwrap();
        assert_eq!(id, "6");

        let names: Vec<_> = table
            .part()
            .tree
            .children()
            .iter()
            .filter_map(Node::tag_name)
            .collect();
        let first_num = names.iter().position(|n| *n == "w:num").unwrap();
        assert!(names[first_num..].iter().all(|n| *n == "w:num"));
        assert_eq!(table.num("6").unwrap().abstract_num_id(), Some("1"));

        assert!(table.add_num("77").is_err());
    }

    #[test]
    fn test_level_override_find_or_create() {
        let mut table = NumberingTable::parse(NUMBERING).unwrap();
        {
            let mut num = table.num_mut("1").unwrap();
            for level in 0..8 {
                num.set_start_override(level, 1).unwrap();
            }
            num.set_start_override(0, 1).unwrap();
        }
        let num = table.num("1").unwrap();
        assert_eq!(num.node().elements("w:lvlOverride").count(), 8);
        assert_eq!(num.start_override(7), Some("1"));
        assert_eq!(num.start_override(8), None);
    }

    #[test]
    fn test_abstract_level_find_or_create() {
        let mut table = NumberingTable::parse(NUMBERING).unwrap();
        table
            .abstract_numbering_mut("1")
            .unwrap()
            .level(3)
            .unwrap()
            .push_child(&[], Node::element("w:numFmt").with_attr("w:val", "bullet"))
            .unwrap();
        let abs = table.abstract_numbering("1").unwrap();
        assert_eq!(abs.format(3), Some("bullet"));
        assert_eq!(abs.format(0), Some("bullet"));
        assert!(abs.level(2).is_none());
    }

    #[test]
    fn test_insert_into_empty_table() {
        let mut table = NumberingTable::parse("<w:numbering/>").unwrap();
        table.insert_num(Node::element("w:num").with_attr("w:numId", "1")).unwrap();
        assert_eq!(table.num_ids().collect::<Vec<_>>(), vec!["1"]);
        assert!(table.insert_num(Node::element("w:abstractNum")).is_err());
    }
}
