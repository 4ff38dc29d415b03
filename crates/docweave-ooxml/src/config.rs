//! Merge configuration
//!
//! Loaded from the `[merge]` table of the settings file, or built in code.
//!
//! ```toml
//! placeholder = "{{{body}}}"
//! migrate_styles = ["Source Code", "Verbatim Char"]
//!
//! [style_conversions]
//! "Heading 1" = "Section Head"
//! "First Paragraph" = "Body Text"
//!
//! [list_conversions.decimal]
//! style = "Numbered List"
//! num_id = "33"
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default body insertion marker
pub const DEFAULT_PLACEHOLDER: &str = "{{{body}}}";

/// Configuration of a styled template merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Source style name → target style name
    pub style_conversions: BTreeMap<String, String>,
    /// Source style names copied into the target when referenced
    pub migrate_styles: BTreeSet<String>,
    /// Target archetypes for source lists, by level-0 format
    pub list_conversions: ListConversions,
    /// Text of the paragraph replaced by the source body
    pub placeholder: String,
    /// Leave references to unknown styles untranslated instead of failing
    pub allow_unrecognized_styles: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            style_conversions: BTreeMap::new(),
            migrate_styles: BTreeSet::new(),
            list_conversions: ListConversions::default(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            allow_unrecognized_styles: false,
        }
    }
}

impl MergeConfig {
    /// Parse a configuration from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Map a source style name onto a target style name
    pub fn convert_style(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.style_conversions.insert(source.into(), target.into());
        self
    }

    /// Mark a source style name for migration
    pub fn migrate_style(mut self, source: impl Into<String>) -> Self {
        self.migrate_styles.insert(source.into());
        self
    }

    /// Set the archetype for lists of one format
    pub fn convert_list(mut self, kind: ListKind, conversion: ListConversion) -> Self {
        match kind {
            ListKind::Ordered => self.list_conversions.decimal = Some(conversion),
            ListKind::Bulleted => self.list_conversions.bullet = Some(conversion),
        }
        self
    }

    /// Set the body placeholder
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Set the unrecognized-style policy
    pub fn allow_unrecognized_styles(mut self, allow: bool) -> Self {
        self.allow_unrecognized_styles = allow;
        self
    }
}

/// Kind of list, derived from the level-0 numbering format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    /// `decimal` lists
    Ordered,
    /// `bullet` lists
    Bulleted,
}

impl ListKind {
    /// Classify a numbering format code
    pub fn from_format(format: &str) -> Option<Self> {
        match format {
            "decimal" => Some(ListKind::Ordered),
            "bullet" => Some(ListKind::Bulleted),
            _ => None,
        }
    }
}

/// Archetypes keyed by numbering format
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListConversions {
    /// Target archetype for `decimal` lists
    pub decimal: Option<ListConversion>,
    /// Target archetype for `bullet` lists
    pub bullet: Option<ListConversion>,
}

impl ListConversions {
    /// Archetype for a list kind
    pub fn get(&self, kind: ListKind) -> Option<&ListConversion> {
        match kind {
            ListKind::Ordered => self.decimal.as_ref(),
            ListKind::Bulleted => self.bullet.as_ref(),
        }
    }

    /// Configured archetypes
    pub fn iter(&self) -> impl Iterator<Item = (ListKind, &ListConversion)> {
        [
            (ListKind::Ordered, self.decimal.as_ref()),
            (ListKind::Bulleted, self.bullet.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, conversion)| conversion.map(|c| (kind, c)))
    }
}

/// Target list archetype: paragraph style name and the numbering instance
/// whose abstract numbering new lists are cloned from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListConversion {
    /// Target paragraph style name
    pub style: String,
    /// Target reference numbering instance id
    pub num_id: String,
}

impl ListConversion {
    /// Create an archetype
    pub fn new(style: impl Into<String>, num_id: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            num_id: num_id.into(),
        }
    }
}
