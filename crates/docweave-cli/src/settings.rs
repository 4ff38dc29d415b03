//! Configuration settings (`docweave.toml`)
//!
//! ```toml
//! template = "institute.dotx"
//! languages = ["en", "de"]
//!
//! [converter]
//! executable = "pandoc"
//!
//! [captions]
//! class = "caption"
//! style_id = "ImageCaption"
//!
//! [bibliography]
//! style = "Bibliography"
//! num_id = "12"
//!
//! [merge]
//! migrate_styles = ["Source Code"]
//!
//! [merge.style_conversions]
//! "Heading 1" = "Section Head"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use docweave_ooxml::{ListConversion, MergeConfig};
use serde::{Deserialize, Serialize};

/// Name of the settings file looked up next to the source
pub const SETTINGS_FILE: &str = "docweave.toml";

/// Top-level settings structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Template package, relative to the settings file
    pub template: Option<PathBuf>,
    /// Languages whose placeholders the template carries
    pub languages: Vec<String>,
    /// External converter
    pub converter: ConverterSettings,
    /// Caption div handling
    pub captions: CaptionSettings,
    /// Bibliography list archetype for `{{{links}}}`
    pub bibliography: Option<ListConversion>,
    /// Styles of the per-author detail blocks
    pub author_details: AuthorDetailsSettings,
    /// Body merge
    pub merge: MergeConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            template: None,
            languages: vec!["en".to_string()],
            converter: ConverterSettings::default(),
            captions: CaptionSettings::default(),
            bibliography: None,
            author_details: AuthorDetailsSettings::default(),
            merge: MergeConfig::default(),
        }
    }
}

impl Settings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Read a settings file. A relative `template` is resolved against the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let mut settings = Self::from_toml_str(&text)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?;
        if let (Some(template), Some(dir)) = (&settings.template, path.parent()) {
            if template.is_relative() {
                settings.template = Some(dir.join(template));
            }
        }
        Ok(settings)
    }

    /// Settings for `source`: `explicit` when given, else `docweave.toml`
    /// next to the source when present, else defaults
    pub fn discover(source: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = source
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(SETTINGS_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}

/// External converter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterSettings {
    /// Executable name or path
    pub executable: PathBuf,
    /// Extra arguments passed before the format options
    pub args: Vec<String>,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("pandoc"),
            args: Vec::new(),
        }
    }
}

/// Caption div handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionSettings {
    /// Class marking caption divs
    pub class: String,
    /// Paragraph style id of the generated caption paragraphs, in the
    /// converter's output
    pub style_id: String,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            class: "caption".to_string(),
            style_id: "ImageCaption".to_string(),
        }
    }
}

/// Template style names used for author detail blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthorDetailsSettings {
    /// Style of the author name paragraph
    pub name_style: Option<String>,
    /// Style of the email and organization paragraphs
    pub detail_style: Option<String>,
}
