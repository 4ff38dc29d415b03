//! OPC package model
//!
//! A [`Package`] is an unpacked archive plus its content-type registry.
//! XML parts are loaded into owned [`Part`] values (tree plus sidecar
//! relationships), edited, and written back with [`Package::store_part`].
//! Nothing is cached between the two calls, so an edit that fails halfway
//! never reaches the package.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use tracing::{debug, warn};

use crate::archive::OoxmlArchive;
use crate::content_types::{ct, ContentTypes, CONTENT_TYPES_ENTRY};
use crate::document::MainDocument;
use crate::error::{OoxmlError, Result};
use crate::numbering::NumberingTable;
use crate::relationships::Relationships;
use crate::serializable::{OpaquePart, Serializable};
use crate::styles::StyleTable;
use crate::xml::namespaces::inject_namespace_declarations;
use crate::xml::Node;

/// Normalized absolute part name, e.g. `/word/document.xml`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartPath(String);

impl PartPath {
    /// Normalize a part name: leading slash, no `.`/`..` segments, no
    /// empty segments
    pub fn new(path: &str) -> Self {
        let mut segments: Vec<&str> = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }
        PartPath(format!("/{}", segments.join("/")))
    }

    /// The absolute name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Archive entry name (no leading slash)
    pub fn member_name(&self) -> &str {
        &self.0[1..]
    }

    /// Directory portion, e.g. `/word` (the root is `/`)
    pub fn directory(&self) -> &str {
        match self.0.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.0[..pos],
        }
    }

    /// File name portion, e.g. `document.xml`
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// File name without extension
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(pos) if pos > 0 => &name[..pos],
            _ => name,
        }
    }

    /// Extension without the dot, empty when there is none
    pub fn extension(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(pos) if pos > 0 => &name[pos + 1..],
            _ => "",
        }
    }

    /// Sidecar relationship list: `<dir>/_rels/<file>.rels`
    pub fn rels_path(&self) -> PartPath {
        PartPath::new(&format!("{}/_rels/{}.rels", self.directory(), self.file_name()))
    }

    /// Resolve a relationship target relative to this part's directory
    pub fn resolve(&self, target: &str) -> PartPath {
        if target.starts_with('/') {
            PartPath::new(target)
        } else {
            PartPath::new(&format!("{}/{}", self.directory(), target))
        }
    }

    /// Relative reference from directory `base` to this part
    pub fn relative_to(&self, base: &str) -> String {
        let from: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
        let to: Vec<&str> = self.0.split('/').filter(|s| !s.is_empty()).collect();
        let common = from
            .iter()
            .zip(to.iter())
            .take_while(|(a, b)| a == b)
            .count()
            .min(to.len().saturating_sub(1));
        let mut parts: Vec<&str> = vec![".."; from.len() - common];
        parts.extend(&to[common..]);
        parts.join("/")
    }

    /// Same directory and extension, file stem `<stem>-<n>`
    pub fn with_suffix(&self, n: usize) -> PartPath {
        let extension = self.extension();
        let name = if extension.is_empty() {
            format!("{}-{}", self.stem(), n)
        } else {
            format!("{}-{}.{}", self.stem(), n, extension)
        };
        PartPath::new(&format!("{}/{}", self.directory(), name))
    }
}

impl fmt::Display for PartPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PartPath {
    fn from(path: &str) -> Self {
        PartPath::new(path)
    }
}

/// An XML part loaded out of a package
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    /// Part name
    pub path: PartPath,
    /// Resolved content type, `None` when unknown
    pub content_type: Option<String>,
    /// Sidecar relationship list, when the part has one
    pub relationships: Option<Relationships>,
    /// Parsed content
    pub tree: Node,
}

impl Part {
    /// Create a detached part
    pub fn new(path: PartPath, content_type: Option<String>, tree: Node) -> Self {
        Self {
            path,
            content_type,
            relationships: None,
            tree,
        }
    }

    /// Relationship list, created empty on first use
    pub fn relationships_mut(&mut self) -> &mut Relationships {
        self.relationships.get_or_insert_with(Relationships::new)
    }

    /// Look up a relationship of this part
    pub fn relationship(&self, id: &str) -> Option<&crate::relationships::RelationshipTarget> {
        self.relationships.as_ref().and_then(|rels| rels.get_target(id))
    }
}

/// An unpacked OPC package
#[derive(Debug, Clone)]
pub struct Package {
    archive: OoxmlArchive,
    content_types: ContentTypes,
}

impl Package {
    /// Open a `.docx`/`.dotx` file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_archive(OoxmlArchive::open(path)?)
    }

    /// Read a package from in-memory bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_archive(OoxmlArchive::from_bytes(bytes)?)
    }

    /// Wrap an unpacked archive
    pub fn from_archive(archive: OoxmlArchive) -> Result<Self> {
        let content_types = ContentTypes::from_xml(archive.require(CONTENT_TYPES_ENTRY)?)?;
        Ok(Self {
            archive,
            content_types,
        })
    }

    /// The underlying archive
    pub fn archive(&self) -> &OoxmlArchive {
        &self.archive
    }

    /// Write the package to a file
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.archive.write_to_file(path)
    }

    /// Serialize the package
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.archive.to_bytes()
    }

    /// The content-type registry
    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    /// Replace the content-type registry
    pub fn set_content_types(&mut self, content_types: ContentTypes) {
        self.archive
            .set_string(CONTENT_TYPES_ENTRY, content_types.render());
        self.content_types = content_types;
    }

    /// Whether the package has an entry at `path`
    pub fn contains(&self, path: &PartPath) -> bool {
        self.archive.contains(path.member_name())
    }

    /// All part names except the registry itself, sorted
    pub fn part_paths(&self) -> impl Iterator<Item = PartPath> + '_ {
        self.archive
            .file_list()
            .filter(|name| *name != CONTENT_TYPES_ENTRY)
            .map(PartPath::new)
    }

    /// Content type of a part (override, then extension default)
    pub fn content_type(&self, path: &PartPath) -> Option<&str> {
        self.content_types.content_type(path.as_str())
    }

    /// All parts declared with content type `content_type`
    pub fn parts_of_type(&self, content_type: &str) -> Vec<PartPath> {
        self.part_paths()
            .filter(|path| self.content_type(path) == Some(content_type))
            .collect()
    }

    /// The part of type `content_type`, when there is exactly one
    pub fn single_part_of_type(&self, content_type: &str) -> Option<PartPath> {
        let mut parts = self.parts_of_type(content_type);
        if parts.len() == 1 {
            parts.pop()
        } else {
            if parts.len() > 1 {
                debug!(
                    "{} parts of type {}, treating as absent",
                    parts.len(),
                    content_type
                );
            }
            None
        }
    }

    /// Main document part of a document or a template
    pub fn main_document_path(&self) -> Option<PartPath> {
        self.single_part_of_type(ct::DOCUMENT)
            .or_else(|| self.single_part_of_type(ct::TEMPLATE))
            .or_else(|| {
                let root = PartPath::new("/");
                let rels = self.read_relationships(&PartPath::new("/_rels/.rels")).ok()??;
                let found = rels
                    .of_type(Relationships::TYPE_OFFICE_DOCUMENT)
                    .next()
                    .map(|(_, rel)| root.resolve(&rel.target));
                found
            })
    }

    /// Header and footer parts, sorted by name
    pub fn headers_and_footers(&self) -> Vec<PartPath> {
        let mut parts = self.parts_of_type(ct::HEADER);
        parts.extend(self.parts_of_type(ct::FOOTER));
        parts.sort();
        parts
    }

    /// Part of the main document's relationship type `rel_type`, falling
    /// back to the single part of `content_type`
    pub fn related_part_path(&self, rel_type: &str, content_type: &str) -> Option<PartPath> {
        let from_rels = self.main_document_path().and_then(|main| {
            let rels = self.read_relationships(&main).ok()??;
            let found = rels
                .of_type(rel_type)
                .next()
                .map(|(_, rel)| main.resolve(&rel.target));
            found
        });
        from_rels
            .filter(|path| self.contains(path))
            .or_else(|| self.single_part_of_type(content_type))
    }

    /// Sidecar relationship list of a part, if present
    pub fn read_relationships(&self, path: &PartPath) -> Result<Option<Relationships>> {
        let rels_path = if path.file_name().ends_with(".rels") {
            path.clone()
        } else {
            path.rels_path()
        };
        match self.archive.get(rels_path.member_name()) {
            Some(bytes) => Ok(Some(Relationships::from_xml(bytes)?)),
            None => Ok(None),
        }
    }

    /// Parse an XML part together with its relationship sidecar
    pub fn load_part(&self, path: &PartPath) -> Result<Part> {
        let bytes = self.archive.require(path.member_name())?;
        let tree = Node::parse_bytes(bytes)?;
        debug!("Loaded part {}", path);
        Ok(Part {
            path: path.clone(),
            content_type: self.content_type(path).map(str::to_string),
            relationships: self.read_relationships(path)?,
            tree,
        })
    }

    /// Write a part and its relationship sidecar back.
    ///
    /// Missing namespace declarations are added to the part's root first,
    /// and an override is registered when the part's content type does not
    /// already resolve through the registry.
    pub fn store_part(&mut self, part: &mut Part) -> Result<()> {
        let added = inject_namespace_declarations(&mut part.tree);
        if !added.is_empty() {
            debug!("Declared namespaces {:?} in {}", added, part.path);
        }
        self.archive
            .set_string(part.path.member_name(), part.tree.render());
        if let Some(rels) = &part.relationships {
            self.archive
                .set_string(part.path.rels_path().member_name(), rels.render());
        }

        if let Some(content_type) = &part.content_type {
            if self.content_type(&part.path) != Some(content_type.as_str()) {
                let mut content_types = self.content_types.clone();
                content_types.add_override(part.path.as_str(), content_type);
                self.set_content_types(content_types);
            }
        }
        Ok(())
    }

    /// Raw bytes of any part
    pub fn read_opaque(&self, path: &PartPath) -> Result<OpaquePart> {
        let bytes = self.archive.require(path.member_name())?;
        Ok(OpaquePart::new(path.as_str(), bytes.to_vec()))
    }

    /// Write raw bytes to a part
    pub fn write_opaque(&mut self, part: &OpaquePart) {
        let path = PartPath::new(&part.path);
        if path.extension().is_empty() || self.content_type(&path).is_none() {
            warn!("Part {} has no registered content type", path);
        }
        self.archive.set(path.member_name(), part.bytes.clone());
    }

    /// `desired`, or the first `stem-N.ext` variant that is neither in the
    /// package nor in `reserved`
    pub fn unused_part_path(&self, desired: &PartPath, reserved: &HashSet<PartPath>) -> PartPath {
        let taken = |path: &PartPath| self.contains(path) || reserved.contains(path);
        if !taken(desired) {
            return desired.clone();
        }
        (1..)
            .map(|n| desired.with_suffix(n))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| desired.clone())
    }

    /// Main document part, parsed
    pub fn main_document(&self) -> Result<MainDocument> {
        let path = require_path(self.main_document_path(), "main document part")?;
        MainDocument::from_part(self.load_part(&path)?)
    }

    /// Styles part, parsed
    pub fn styles(&self) -> Result<StyleTable> {
        let path = require_path(
            self.related_part_path(Relationships::TYPE_STYLES, ct::STYLES),
            "styles part",
        )?;
        StyleTable::from_part(self.load_part(&path)?)
    }

    /// Numbering part, parsed, when the package has one
    pub fn numbering(&self) -> Result<Option<NumberingTable>> {
        match self.related_part_path(Relationships::TYPE_NUMBERING, ct::NUMBERING) {
            Some(path) => Ok(Some(NumberingTable::from_part(self.load_part(&path)?)?)),
            None => Ok(None),
        }
    }
}

fn require_path(path: Option<PartPath>, what: &str) -> Result<PartPath> {
    path.ok_or_else(|| OoxmlError::MissingFile(what.to_string()))
}
