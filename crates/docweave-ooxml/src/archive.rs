//! Archive handling for DOCX/DOTX packages
//!
//! A package is a ZIP archive of named entries. The archive is unpacked into
//! memory on open; entries are read and replaced by name and the whole set
//! is written back in sorted order so output is deterministic.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use tracing::debug;
use zip::read::ZipArchive;
use zip::write::ZipWriter;
use zip::CompressionMethod;

use crate::error::{OoxmlError, Result};

/// An unpacked OOXML package archive
#[derive(Debug, Clone, Default)]
pub struct OoxmlArchive {
    /// All entries, keyed by entry name (no leading slash)
    files: BTreeMap<String, Vec<u8>>,
}

impl OoxmlArchive {
    /// Create an empty archive
    pub fn new() -> Self {
        Self::default()
    }

    /// Open and unpack a DOCX/DOTX file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        debug!("Opening package {}", path.as_ref().display());
        Self::from_reader(file)
    }

    /// Unpack from in-memory bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Create from any reader that implements Read + Seek
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut files = BTreeMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();

            // Skip directories
            if name.ends_with('/') {
                continue;
            }

            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            files.insert(name, contents);
        }

        debug!("Unpacked {} archive entries", files.len());
        Ok(Self { files })
    }

    /// Get an entry's contents by name
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(|v| v.as_slice())
    }

    /// Get an entry's contents as a string
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.files
            .get(name)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Get an entry that must exist
    pub fn require(&self, name: &str) -> Result<&[u8]> {
        self.get(name)
            .ok_or_else(|| OoxmlError::MissingFile(name.to_string()))
    }

    /// Check if an entry exists
    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Entry names in sorted order
    pub fn file_list(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|s| s.as_str())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the archive has no entries
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Set or update an entry's contents
    pub fn set(&mut self, name: impl Into<String>, contents: Vec<u8>) {
        self.files.insert(name.into(), contents);
    }

    /// Set an entry's contents from a string
    pub fn set_string(&mut self, name: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(name.into(), contents.into().into_bytes());
    }

    /// Remove an entry
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.files.remove(name)
    }

    /// Write the archive to a file
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(file)
    }

    /// Write the archive to an in-memory buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.write_to(&mut buffer)?;
        Ok(buffer.into_inner())
    }

    /// Write the archive to any writer
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        // Fixed timestamp so identical content gives identical bytes
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        // Content types first, as Office expects, then sorted names
        let content_types = "[Content_Types].xml";
        if let Some(contents) = self.files.get(content_types) {
            zip.start_file(content_types, options)?;
            zip.write_all(contents)?;
        }
        for (name, contents) in &self.files {
            if name == content_types {
                continue;
            }
            zip.start_file(name.as_str(), options)?;
            zip.write_all(contents)?;
        }

        zip.finish()?;
        Ok(())
    }
}
