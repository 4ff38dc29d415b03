//! Cross-package body merge
//!
//! [`StyledTemplateSubstitution`] copies the body of a source package into
//! a target package at a placeholder paragraph. The copy is rebuilt node by
//! node; after the children of an element are copied, three rewrites move
//! its references into the target's id space:
//!
//! - style references (`w:pStyle`, `w:rStyle`, `w:tblStyle`) are translated
//!   through the configured conversions, or migrated by cloning the source
//!   style definition under a fresh id and name
//! - list paragraphs (`w:pPr` with `w:numPr`) get a fresh numbering
//!   instance cloned from the configured archetype, and the archetype's
//!   paragraph style
//! - relationship ids (`r:id`, `r:embed`, `r:link`, `r:pict`) get a target
//!   relationship, copying the referenced resource when it is internal
//!
//! The target parts are loaded as owned copies and written back only after
//! every step succeeded, so a failed merge leaves the target untouched.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::config::{ListKind, MergeConfig};
use crate::content_types::{mime_type_for_extension, ContentTypes};
use crate::document::{
    paragraph_text, MainDocument, RELATIONSHIP_ATTRIBUTES, STYLE_REFERENCE_TAGS,
};
use crate::error::{OoxmlError, Result};
use crate::numbering::NumberingTable;
use crate::package::{Package, PartPath};
use crate::serializable::OpaquePart;
use crate::styles::{set_reference, StyleReference, StyleTable};
use crate::xml::{tag, Index, Node};

/// Levels whose start value is reset on every created numbering instance
const RESTARTED_LEVELS: usize = 8;

/// What a merge added to the target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Source styles cloned into the target
    pub migrated_styles: usize,
    /// Numbering instances created in the target
    pub created_numberings: usize,
    /// Relationships created in the target
    pub created_relationships: usize,
    /// Relationships of the target reused for external links
    pub reused_relationships: usize,
    /// Binary resources copied into the target
    pub copied_resources: usize,
    /// Top-level body elements inserted at the placeholder
    pub inserted_blocks: usize,
}

/// Resolved list archetype in the target
#[derive(Debug, Clone)]
struct ListTarget {
    style_id: String,
    abstract_num_id: String,
}

/// Cross-reference maps of one `perform` call
#[derive(Debug, Default)]
struct MergeState {
    /// Source style id → target style id (conversions and migrations)
    style_ids: HashMap<String, String>,
    /// Source style ids to migrate when referenced
    migrate: HashSet<String>,
    /// Source style ids whose migration is in progress
    migrating: HashSet<String>,
    /// Source numId → (target numId, target paragraph style id)
    numberings: HashMap<String, (String, String)>,
    list_targets: HashMap<ListKind, ListTarget>,
    /// Source relationship id → target relationship id
    relationships: HashMap<String, String>,
    /// Source resource path → target resource path
    resources: HashMap<PartPath, PartPath>,
    report: MergeReport,
}

/// Read-only side of the merge
struct Source<'a> {
    package: &'a Package,
    document: MainDocument,
    styles: StyleTable,
    numbering: Option<NumberingTable>,
}

/// Working copies of the target parts
struct Target<'a> {
    package: &'a Package,
    document: MainDocument,
    styles: StyleTable,
    numbering: Option<NumberingTable>,
    /// Paths promised to pending resource copies
    reserved: HashSet<PartPath>,
    /// (source path, target path) of resources to copy
    copies: Vec<(PartPath, PartPath)>,
}

/// Merges a source body into a target package at a placeholder
#[derive(Debug)]
pub struct StyledTemplateSubstitution {
    config: MergeConfig,
    state: MergeState,
}

impl StyledTemplateSubstitution {
    /// Create a merge with the given configuration
    pub fn new(config: MergeConfig) -> Self {
        Self {
            config,
            state: MergeState::default(),
        }
    }

    /// The configuration
    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Target style id chosen for a source style id by the last merge
    pub fn translated_style(&self, source_id: &str) -> Option<&str> {
        self.state.style_ids.get(source_id).map(String::as_str)
    }

    /// Copy the body of `source` into `target` at the placeholder.
    ///
    /// On error `target` is left exactly as it was.
    pub fn perform(&mut self, source: &Package, target: &mut Package) -> Result<MergeReport> {
        self.state = MergeState::default();

        let src = Source {
            package: source,
            document: source.main_document()?,
            styles: source.styles()?,
            numbering: source.numbering()?,
        };
        let mut dst = Target {
            package: target,
            document: target.main_document()?,
            styles: target.styles()?,
            numbering: target.numbering()?,
            reserved: HashSet::new(),
            copies: Vec::new(),
        };

        self.resolve_configuration(&src, &dst)?;

        let mut content = Vec::new();
        for child in src.document.body()?.children() {
            if child.is("w:sectPr") {
                debug!("Skipping source section properties");
                continue;
            }
            content.push(self.copy_node(&src, &mut dst, child)?);
        }

        let resources = self.collect_resources(&src, &mut dst)?;
        self.state.report.inserted_blocks = content.len();
        replace_placeholder(&mut dst.document, &self.config.placeholder, content)?;

        // Commit
        let Target {
            document,
            styles,
            numbering,
            ..
        } = dst;
        target.set_content_types(resources.content_types);
        let mut document = document.into_part();
        let mut styles = styles.into_part();
        target.store_part(&mut document)?;
        target.store_part(&mut styles)?;
        if let Some(numbering) = numbering {
            target.store_part(&mut numbering.into_part())?;
        }
        for resource in &resources.parts {
            target.write_opaque(resource);
        }

        let report = self.state.report.clone();
        info!(
            migrated_styles = report.migrated_styles,
            created_numberings = report.created_numberings,
            created_relationships = report.created_relationships,
            copied_resources = report.copied_resources,
            "Merged source body at {}",
            self.config.placeholder
        );
        Ok(report)
    }

    fn resolve_configuration(&mut self, src: &Source, dst: &Target) -> Result<()> {
        for (source_name, target_name) in &self.config.style_conversions {
            let source_id = style_id_by_name(&src.styles, source_name, "source")?;
            let target_id = style_id_by_name(&dst.styles, target_name, "target")?;
            debug!("Style '{}' ({}) -> {}", source_name, source_id, target_id);
            self.state.style_ids.insert(source_id, target_id);
        }

        for name in &self.config.migrate_styles {
            match src.styles.get_by_name(name).and_then(|style| style.id()) {
                Some(id) => {
                    self.state.migrate.insert(id.to_string());
                }
                None => debug!("Style '{}' marked for migration is not in the source", name),
            }
        }

        for (kind, conversion) in self.config.list_conversions.iter() {
            let style_id = style_id_by_name(&dst.styles, &conversion.style, "target")?;
            let numbering = dst.numbering.as_ref().ok_or_else(|| {
                OoxmlError::DanglingNumbering(format!(
                    "list archetype {} needs a numbering part in the target",
                    conversion.num_id
                ))
            })?;
            let abstract_num_id = numbering
                .num(&conversion.num_id)
                .and_then(|num| num.abstract_num_id())
                .filter(|id| numbering.abstract_numbering(id).is_some())
                .ok_or_else(|| {
                    OoxmlError::DanglingNumbering(format!(
                        "list archetype numbering instance {} has no abstract numbering in the target",
                        conversion.num_id
                    ))
                })?
                .to_string();
            self.state.list_targets.insert(
                kind,
                ListTarget {
                    style_id,
                    abstract_num_id,
                },
            );
        }
        Ok(())
    }

    fn copy_node(&mut self, src: &Source, dst: &mut Target, node: &Node) -> Result<Node> {
        let Node::Element(element) = node else {
            return Ok(node.clone());
        };

        let mut copy = Node::element(element.name());
        for (name, value) in element.attributes() {
            copy = copy.with_attr(name.clone(), value.clone());
        }
        let children = element
            .children()
            .iter()
            .map(|child| self.copy_node(src, dst, child))
            .collect::<Result<Vec<_>>>()?;
        copy = copy.with_children(children);

        self.rewrite_style(src, dst, &mut copy)?;
        self.rewrite_numbering(src, dst, &mut copy)?;
        self.rewrite_relationships(src, dst, &mut copy)?;
        Ok(copy)
    }

    // ------------------------------------------------------------------
    // Styles
    // ------------------------------------------------------------------

    fn rewrite_style(&mut self, src: &Source, dst: &mut Target, node: &mut Node) -> Result<()> {
        if !STYLE_REFERENCE_TAGS.iter().any(|name| node.is(name)) {
            return Ok(());
        }
        let Some(source_id) = node.attr("w:val").map(str::to_string) else {
            return Ok(());
        };
        match self.translate_style(src, dst, &source_id)? {
            Some(target_id) => node.set_attr("w:val", target_id),
            None if self.config.allow_unrecognized_styles => {
                debug!("Leaving unrecognized style '{}' untranslated", source_id);
                Ok(())
            }
            None => Err(unrecognized_style(src, &source_id)),
        }
    }

    fn translate_style(
        &mut self,
        src: &Source,
        dst: &mut Target,
        source_id: &str,
    ) -> Result<Option<String>> {
        if let Some(target_id) = self.state.style_ids.get(source_id) {
            return Ok(Some(target_id.clone()));
        }
        if self.state.migrate.contains(source_id) {
            return self.migrate_style(src, dst, source_id).map(Some);
        }
        Ok(None)
    }

    /// Clone a source style into the target under a fresh id and name.
    ///
    /// The clone is inserted and memoized before its own references are
    /// translated, so a cyclic chain ends at the reserved id.
    fn migrate_style(&mut self, src: &Source, dst: &mut Target, source_id: &str) -> Result<String> {
        let source_style = src
            .styles
            .get(source_id)
            .ok_or_else(|| unrecognized_style(src, source_id))?;
        let base_name = source_style.name().unwrap_or(source_id);
        let target_id = dst.styles.unused_id(source_id);
        let target_name = dst.styles.unused_name(base_name);

        let mut clone = source_style.node().clone();
        clone.set_attr("w:styleId", target_id.clone())?;
        clone.remove_attr("w:default");
        set_style_name(&mut clone, &target_name)?;
        if let Some(ppr) = clone.first_element_mut("w:pPr") {
            ppr.remove_children(tag("w:numPr"))?;
        }
        dst.styles.insert(clone)?;

        self.state
            .style_ids
            .insert(source_id.to_string(), target_id.clone());
        self.state.migrating.insert(source_id.to_string());
        self.state.report.migrated_styles += 1;
        debug!(
            "Migrated style '{}' ({}) as '{}' ({})",
            base_name, source_id, target_name, target_id
        );

        for kind in StyleReference::ALL {
            let Some(referenced) = source_style.reference(kind) else {
                continue;
            };
            if self.state.migrating.contains(referenced) {
                warn!(
                    "Cyclic style chain: {} of '{}' points back at '{}'",
                    kind.tag(),
                    source_id,
                    referenced
                );
            }
            let translated = self.translate_style(src, dst, referenced)?;
            let style = dst.styles.get_mut(&target_id).ok_or_else(|| {
                OoxmlError::InvalidStructure(format!("migrated style {} vanished", target_id))
            })?;
            match translated {
                Some(translated) => set_reference(style, kind, &translated)?,
                None if self.config.allow_unrecognized_styles => {
                    debug!(
                        "Dropping {} '{}' of migrated style {}",
                        kind.tag(),
                        referenced,
                        target_id
                    );
                    style.remove_children(tag(kind.tag()))?;
                }
                None => return Err(unrecognized_style(src, referenced)),
            }
        }

        self.state.migrating.remove(source_id);
        Ok(target_id)
    }

    // ------------------------------------------------------------------
    // Numbering
    // ------------------------------------------------------------------

    fn rewrite_numbering(&mut self, src: &Source, dst: &mut Target, node: &mut Node) -> Result<()> {
        if !node.is("w:pPr") {
            return Ok(());
        }
        let Some(source_num_id) = node
            .first_element("w:numPr")
            .and_then(|numpr| numpr.first_element("w:numId"))
            .and_then(|num| num.attr("w:val"))
            .map(str::to_string)
        else {
            return Ok(());
        };
        if source_num_id == "0" {
            return Ok(());
        }

        let (num_id, style_id) = self.translate_numbering(src, dst, &source_num_id)?;
        if let Some(num) = node
            .first_element_mut("w:numPr")
            .and_then(|numpr| numpr.first_element_mut("w:numId"))
        {
            num.set_attr("w:val", num_id)?;
        }
        match node.first_element_mut("w:pStyle") {
            Some(style) => style.set_attr("w:val", style_id),
            None => node.unshift_child(
                &[],
                Node::element("w:pStyle").with_attr("w:val", style_id),
            ),
        }
    }

    fn translate_numbering(
        &mut self,
        src: &Source,
        dst: &mut Target,
        source_num_id: &str,
    ) -> Result<(String, String)> {
        if let Some(found) = self.state.numberings.get(source_num_id) {
            return Ok(found.clone());
        }

        let source_numbering = src.numbering.as_ref().ok_or_else(|| {
            OoxmlError::DanglingNumbering(format!(
                "numbering instance {} referenced but the source has no numbering part",
                source_num_id
            ))
        })?;
        let format = source_numbering.level0_format(source_num_id)?;
        let unsupported = || OoxmlError::UnsupportedNumberingFormat {
            num_id: source_num_id.to_string(),
            format: format.to_string(),
        };
        let kind = ListKind::from_format(format).ok_or_else(unsupported)?;
        let archetype = self
            .state
            .list_targets
            .get(&kind)
            .ok_or_else(unsupported)?
            .clone();

        let numbering = dst.numbering.as_mut().ok_or_else(|| {
            OoxmlError::DanglingNumbering("the target has no numbering part".into())
        })?;
        let num_id = numbering.add_num(&archetype.abstract_num_id)?;
        let mut num = numbering.num_mut(&num_id).ok_or_else(|| {
            OoxmlError::DanglingNumbering(format!("numbering instance {} vanished", num_id))
        })?;
        for level in 0..RESTARTED_LEVELS {
            num.set_start_override(level, 1)?;
        }

        self.state.report.created_numberings += 1;
        debug!(
            "Numbering {} ({}) -> {} (abstract {})",
            source_num_id, format, num_id, archetype.abstract_num_id
        );
        let result = (num_id, archetype.style_id);
        self.state
            .numberings
            .insert(source_num_id.to_string(), result.clone());
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Relationships
    // ------------------------------------------------------------------

    fn rewrite_relationships(
        &mut self,
        src: &Source,
        dst: &mut Target,
        node: &mut Node,
    ) -> Result<()> {
        for attribute in RELATIONSHIP_ATTRIBUTES {
            let Some(source_id) = node.attr(attribute).map(str::to_string) else {
                continue;
            };
            let target_id = self.translate_relationship(src, dst, &source_id)?;
            node.set_attr(attribute, target_id)?;
        }
        Ok(())
    }

    fn translate_relationship(
        &mut self,
        src: &Source,
        dst: &mut Target,
        source_id: &str,
    ) -> Result<String> {
        if let Some(target_id) = self.state.relationships.get(source_id) {
            return Ok(target_id.clone());
        }

        let source_part = src.document.part();
        let rel = source_part
            .relationship(source_id)
            .ok_or_else(|| {
                OoxmlError::DanglingRelationship(format!(
                    "{} is not in the relationships of {}",
                    source_id, source_part.path
                ))
            })?
            .clone();

        let (target, target_mode) = if rel.is_external() {
            (rel.target.clone(), rel.target_mode.clone())
        } else {
            let source_path = source_part.path.resolve(&rel.target);
            let target_path = match self.state.resources.get(&source_path) {
                Some(path) => path.clone(),
                None => {
                    if !src.package.contains(&source_path) {
                        return Err(OoxmlError::MissingFile(source_path.to_string()));
                    }
                    let desired = dst.document.part().path.resolve(&rel.target);
                    let path = dst.package.unused_part_path(&desired, &dst.reserved);
                    debug!("Resource {} -> {}", source_path, path);
                    dst.reserved.insert(path.clone());
                    dst.copies.push((source_path.clone(), path.clone()));
                    self.state.resources.insert(source_path, path.clone());
                    path
                }
            };
            let directory = dst.document.part().path.directory().to_string();
            (target_path.relative_to(&directory), None)
        };

        let rels = dst.document.part_mut().relationships_mut();
        let target_id = match rels.find_by_target(&rel.rel_type, &target, target_mode.as_deref()) {
            Some(existing) => {
                debug!("Relationship {} reuses {} ({})", source_id, existing, target);
                self.state.report.reused_relationships += 1;
                existing.to_string()
            }
            None => {
                let id = rels.add_with_mode(target.clone(), rel.rel_type.clone(), target_mode);
                debug!("Relationship {} -> {} ({})", source_id, id, target);
                self.state.report.created_relationships += 1;
                id
            }
        };
        self.state
            .relationships
            .insert(source_id.to_string(), target_id.clone());
        Ok(target_id)
    }

    /// Read every pending resource and register its content type.
    ///
    /// Each copy writes to a path reserved during the tree pass, so the
    /// batch is order-independent.
    fn collect_resources(&mut self, src: &Source, dst: &mut Target) -> Result<StagedResources> {
        let mut content_types = dst.package.content_types().clone();
        let mut parts = Vec::with_capacity(dst.copies.len());
        for (from, to) in &dst.copies {
            let resource = src.package.read_opaque(from)?;
            register_content_type(src.package.content_types(), &mut content_types, from, to);
            parts.push(OpaquePart::new(to.as_str(), resource.bytes));
        }
        self.state.report.copied_resources = parts.len();
        Ok(StagedResources {
            parts,
            content_types,
        })
    }
}

/// Resources read from the source, ready to be written
struct StagedResources {
    parts: Vec<OpaquePart>,
    content_types: ContentTypes,
}

fn register_content_type(
    source: &ContentTypes,
    target: &mut ContentTypes,
    from: &PartPath,
    to: &PartPath,
) {
    if let Some(content_type) = source.override_for(from.as_str()) {
        target.add_override(to.as_str(), content_type);
        return;
    }
    let extension = to.extension();
    if extension.is_empty() || target.has_default(extension) {
        return;
    }
    let known = source
        .default_for(extension)
        .map(str::to_string)
        .or_else(|| mime_type_for_extension(extension).map(str::to_string));
    match known {
        Some(content_type) => {
            debug!("Registering content type {} for .{}", content_type, extension);
            target.add_default(extension, &content_type);
        }
        None => warn!("No content type known for {}", to),
    }
}

fn style_id_by_name(styles: &StyleTable, name: &str, side: &str) -> Result<String> {
    styles
        .get_by_name(name)
        .and_then(|style| style.id())
        .map(str::to_string)
        .ok_or_else(|| OoxmlError::StyleNotFound(format!("'{}' in the {} package", name, side)))
}

fn unrecognized_style(src: &Source, source_id: &str) -> OoxmlError {
    OoxmlError::UnrecognizedStyle {
        id: source_id.to_string(),
        name: src
            .styles
            .get(source_id)
            .and_then(|style| style.name())
            .map(str::to_string),
    }
}

fn set_style_name(style: &mut Node, name: &str) -> Result<()> {
    match style.first_element_mut("w:name") {
        Some(element) => element.set_attr("w:val", name),
        None => style.unshift_child(&[], Node::element("w:name").with_attr("w:val", name)),
    }
}

/// Replace the unique body paragraph whose text is exactly `placeholder`
fn replace_placeholder(
    document: &mut MainDocument,
    placeholder: &str,
    content: Vec<Node>,
) -> Result<()> {
    let body = document.body_mut()?;
    let mut matches = Vec::new();
    for (position, child) in body.children().iter().enumerate() {
        if !child.is("w:p") {
            continue;
        }
        let text = paragraph_text(child);
        if text == placeholder {
            matches.push(position);
        } else if text.contains(placeholder) {
            return Err(OoxmlError::PlaceholderNotExclusive {
                placeholder: placeholder.to_string(),
                paragraph_text: text,
            });
        }
    }
    let position = match matches.as_slice() {
        [] => return Err(OoxmlError::PlaceholderNotFound(placeholder.to_string())),
        [position] => *position,
        _ => return Err(OoxmlError::PlaceholderAmbiguous(placeholder.to_string())),
    };
    body.remove_child(&[Index::At(position)])?;
    body.insert_children(&[Index::At(position)], content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(body: &str) -> MainDocument {
        MainDocument::parse(&format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        ))
        .unwrap()
    }

    fn texts(document: &MainDocument) -> Vec<String> {
        document
            .body()
            .unwrap()
            .children()
            .iter()
            .map(paragraph_text)
            .collect()
    }

    #[test]
    fn test_replace_placeholder_splices_content() {
        let mut doc = document(
            "<w:p><w:r><w:t>before</w:t></w:r></w:p>\
             <w:p><w:r><w:t>{{{body}}}</w:t></w:r></w:p>\
             <w:p><w:r><w:t>after</w:t></w:r></w:p>",
        );
        let content = vec![
            crate::document::paragraph(None, "one"),
            crate::document::paragraph(None, "two"),
        ];
        replace_placeholder(&mut doc, "{{{body}}}", content).unwrap();
        assert_eq!(texts(&doc), vec!["before", "one", "two", "after"]);
    }

    #[test]
    fn test_replace_placeholder_errors() {
        let mut doc = document("<w:p><w:r><w:t>see {{{body}}} here</w:t></w:r></w:p>");
        assert!(matches!(
            replace_placeholder(&mut doc, "{{{body}}}", vec![]),
            Err(OoxmlError::PlaceholderNotExclusive { .. })
        ));

        let mut doc = document("<w:p><w:r><w:t>nothing</w:t></w:r></w:p>");
        assert!(matches!(
            replace_placeholder(&mut doc, "{{{body}}}", vec![]),
            Err(OoxmlError::PlaceholderNotFound(_))
        ));

        let mut doc = document(
            "<w:p><w:r><w:t>{{{body}}}</w:t></w:r></w:p><w:p><w:r><w:t>{{{body}}}</w:t></w:r></w:p>",
        );
        assert!(matches!(
            replace_placeholder(&mut doc, "{{{body}}}", vec![]),
            Err(OoxmlError::PlaceholderAmbiguous(_))
        ));
    }

    #[test]
    fn test_register_content_type() {
        let source = ContentTypes::new();
        let mut target = ContentTypes::new();
        register_content_type(
            &source,
            &mut target,
            &PartPath::new("/word/media/a.PNG"),
            &PartPath::new("/word/media/a.PNG"),
        );
        assert_eq!(target.default_for("png"), Some("image/png"));

        let mut source = ContentTypes::new();
        source.add_override("/word/embeddings/x.bin", "application/vnd.ms-office.oleObject");
        register_content_type(
            &source,
            &mut target,
            &PartPath::new("/word/embeddings/x.bin"),
            &PartPath::new("/word/embeddings/x-1.bin"),
        );
        assert_eq!(
            target.content_type("/word/embeddings/x-1.bin"),
            Some("application/vnd.ms-office.oleObject")
        );
    }
}
