//! Typed Pandoc metadata and article metadata extraction
//!
//! Article front matter is localized: every text field is either a plain
//! value (taken as [`DEFAULT_LANGUAGE`]) or a map from language code to
//! value.
//!
//! ```yaml
//! title:
//!   en: Ownership in Practice
//!   de: Ownership in der Praxis
//! keywords:
//!   en: [rust, memory]
//! authors:
//!   - name: Ada Example
//!     email: ada@example.org
//!     organizations: [1]
//! organizations:
//!   - en: Example University
//! links:
//!   - https://www.rust-lang.org
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AstError, Result};
use crate::inline::{block_text, inline_text};

/// Language assumed for metadata values that are not localized maps
pub const DEFAULT_LANGUAGE: &str = "en";

/// A Pandoc metadata value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum MetaValue {
    /// Nested key/value map
    MetaMap(BTreeMap<String, MetaValue>),
    /// List of values
    MetaList(Vec<MetaValue>),
    /// Boolean flag
    MetaBool(bool),
    /// Unparsed string
    MetaString(String),
    /// Inline content
    MetaInlines(Vec<Value>),
    /// Block content
    MetaBlocks(Vec<Value>),
}

impl MetaValue {
    /// Text of a scalar value; `None` for maps and lists
    pub fn as_text(&self) -> Option<String> {
        match self {
            MetaValue::MetaString(s) => Some(s.clone()),
            MetaValue::MetaInlines(inlines) => Some(inline_text(inlines)),
            MetaValue::MetaBlocks(blocks) => Some(block_text(blocks)),
            MetaValue::MetaBool(b) => Some(b.to_string()),
            MetaValue::MetaMap(_) | MetaValue::MetaList(_) => None,
        }
    }

    /// Items of a list
    pub fn as_list(&self) -> Option<&[MetaValue]> {
        match self {
            MetaValue::MetaList(items) => Some(items),
            _ => None,
        }
    }

    /// Entries of a map
    pub fn as_map(&self) -> Option<&BTreeMap<String, MetaValue>> {
        match self {
            MetaValue::MetaMap(map) => Some(map),
            _ => None,
        }
    }
}

/// Text per language code
pub type Localized = BTreeMap<String, String>;

/// An article author
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Author {
    /// Display name per language
    pub name: Localized,
    /// Contact address
    pub email: Option<String>,
    /// 1-based indices into [`ArticleMetadata::organizations`]
    pub organizations: Vec<usize>,
}

/// Front matter of an article
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArticleMetadata {
    /// Title per language
    pub title: Localized,
    /// Abstract per language
    pub abstract_text: Localized,
    /// Comma-separated keywords per language
    pub keywords: Localized,
    /// Suggested citation per language
    pub citation: Localized,
    /// Acknowledgements per language
    pub acknowledgements: Localized,
    /// Authors in order
    pub authors: Vec<Author>,
    /// Organization names per language
    pub organizations: Vec<Localized>,
    /// Bibliography links
    pub links: Vec<String>,
}

impl ArticleMetadata {
    /// Extract article metadata from a document's `meta` map.
    ///
    /// Missing keys yield empty fields; present keys with the wrong shape
    /// are errors.
    pub fn from_meta(meta: &BTreeMap<String, MetaValue>) -> Result<Self> {
        let localized_field = |key: &str| -> Result<Localized> {
            meta.get(key)
                .map(|value| localized(key, value))
                .transpose()
                .map(Option::unwrap_or_default)
        };

        let organizations = match meta.get("organizations") {
            Some(value) => list("organizations", value)?
                .iter()
                .enumerate()
                .map(|(i, org)| localized(&format!("organizations.{}", i + 1), org))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let authors = match meta.get("authors") {
            Some(value) => list("authors", value)?
                .iter()
                .enumerate()
                .map(|(i, author)| {
                    parse_author(&format!("authors.{}", i + 1), author, organizations.len())
                })
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let links = match meta.get("links") {
            Some(value) => list("links", value)?
                .iter()
                .enumerate()
                .map(|(i, link)| text(&format!("links.{}", i + 1), link))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            title: localized_field("title")?,
            abstract_text: localized_field("abstract")?,
            keywords: localized_field("keywords")?,
            citation: localized_field("citation")?,
            acknowledgements: localized_field("acknowledgements")?,
            authors,
            organizations,
            links,
        })
    }

    /// Every language code used by a localized field, sorted
    pub fn languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = [
            &self.title,
            &self.abstract_text,
            &self.keywords,
            &self.citation,
            &self.acknowledgements,
        ]
        .into_iter()
        .chain(self.authors.iter().map(|author| &author.name))
        .chain(self.organizations.iter())
        .flat_map(|field| field.keys().cloned())
        .collect();
        languages.sort();
        languages.dedup();
        languages
    }
}

fn parse_author(key: &str, value: &MetaValue, organization_count: usize) -> Result<Author> {
    let map = value
        .as_map()
        .ok_or_else(|| AstError::metadata(key, "expected a map with a name"))?;
    let name = map
        .get("name")
        .ok_or_else(|| AstError::metadata(key, "author has no name"))
        .and_then(|name| localized(&format!("{}.name", key), name))?;
    let email = map
        .get("email")
        .map(|email| text(&format!("{}.email", key), email))
        .transpose()?;

    let mut organizations = Vec::new();
    if let Some(value) = map.get("organizations") {
        let org_key = format!("{}.organizations", key);
        let items = match value.as_list() {
            Some(items) => items,
            None => std::slice::from_ref(value),
        };
        for item in items {
            let raw = text(&org_key, item)?;
            let index: usize = raw.trim().parse().map_err(|_| {
                AstError::metadata(&org_key, format!("'{}' is not an organization number", raw))
            })?;
            if index == 0 || index > organization_count {
                return Err(AstError::metadata(
                    &org_key,
                    format!(
                        "organization {} does not exist ({} defined)",
                        index, organization_count
                    ),
                ));
            }
            organizations.push(index);
        }
    }

    Ok(Author {
        name,
        email,
        organizations,
    })
}

/// A plain value under [`DEFAULT_LANGUAGE`], or a language map. A list
/// value is joined with `", "` (keywords).
fn localized(key: &str, value: &MetaValue) -> Result<Localized> {
    match value {
        MetaValue::MetaMap(map) => map
            .iter()
            .map(|(language, value)| {
                Ok((
                    language.clone(),
                    joined_text(&format!("{}.{}", key, language), value)?,
                ))
            })
            .collect(),
        other => Ok(Localized::from([(
            DEFAULT_LANGUAGE.to_string(),
            joined_text(key, other)?,
        )])),
    }
}

fn joined_text(key: &str, value: &MetaValue) -> Result<String> {
    match value {
        MetaValue::MetaList(items) => Ok(items
            .iter()
            .map(|item| text(key, item))
            .collect::<Result<Vec<_>>>()?
            .join(", ")),
        other => text(key, other),
    }
}

fn text(key: &str, value: &MetaValue) -> Result<String> {
    value
        .as_text()
        .ok_or_else(|| AstError::metadata(key, "expected text"))
}

fn list<'a>(key: &str, value: &'a MetaValue) -> Result<&'a [MetaValue]> {
    value
        .as_list()
        .ok_or_else(|| AstError::metadata(key, "expected a list"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PandocDocument;

    fn meta(json: &str) -> BTreeMap<String, MetaValue> {
        let document = PandocDocument::from_json(&format!(
            r#"{{"pandoc-api-version":[1,23,1],"meta":{},"blocks":[]}}"#,
            json
        ))
        .unwrap();
        document.meta
    }

    fn inlines(text: &str) -> String {
        let words: Vec<String> = text
            .split(' ')
            .map(|w| format!(r#"{{"t":"Str","c":"{}"}}"#, w))
            .collect();
        format!(
            r#"{{"t":"MetaInlines","c":[{}]}}"#,
            words.join(r#",{"t":"Space"},"#)
        )
    }

    #[test]
    fn test_meta_value_accessors() {
        let value: MetaValue = serde_json::from_str(&inlines("Hello world")).unwrap();
        assert_eq!(value.as_text().as_deref(), Some("Hello world"));
        assert!(value.as_list().is_none());

        let value: MetaValue =
            serde_json::from_str(r#"{"t":"MetaList","c":[{"t":"MetaBool","c":true}]}"#).unwrap();
        assert_eq!(value.as_list().unwrap()[0].as_text().as_deref(), Some("true"));
        assert!(value.as_text().is_none());
        assert!(value.as_map().is_none());
    }

    #[test]
    fn test_article_metadata() {
        let meta = meta(&format!(
            r#"{{
  "title": {{"t":"MetaMap","c":{{"en":{},"de":{}}}}},
  "abstract": {{"t":"MetaBlocks","c":[{{"t":"Para","c":[{{"t":"Str","c":"Short."}}]}}]}},
  "keywords": {{"t":"MetaMap","c":{{"en":{{"t":"MetaList","c":[{},{}]}}}}}},
  "organizations": {{"t":"MetaList","c":[{{"t":"MetaMap","c":{{"en":{},"de":{}}}}}]}},
  "authors": {{"t":"MetaList","c":[{{"t":"MetaMap","c":{{
      "name":{},
      "email":{{"t":"MetaString","c":"ada@example.org"}},
      "organizations":{{"t":"MetaList","c":[{{"t":"MetaInlines","c":[{{"t":"Str","c":"1"}}]}}]}}}}}}]}},
  "links": {{"t":"MetaList","c":[{{"t":"MetaString","c":"https://a.example"}},{{"t":"MetaString","c":"https://b.example"}}]}}
}}"#,
            inlines("Ownership"),
            inlines("Besitz"),
            inlines("rust"),
            inlines("memory safety"),
            inlines("Example University"),
            inlines("Beispiel Universität"),
            inlines("Ada Example"),
        ));

        let article = ArticleMetadata::from_meta(&meta).unwrap();
        assert_eq!(article.title["en"], "Ownership");
        assert_eq!(article.title["de"], "Besitz");
        assert_eq!(article.abstract_text[DEFAULT_LANGUAGE], "Short.");
        assert_eq!(article.keywords["en"], "rust, memory safety");
        assert_eq!(article.organizations.len(), 1);
        assert_eq!(article.organizations[0]["de"], "Beispiel Universität");
        assert_eq!(article.authors.len(), 1);
        assert_eq!(article.authors[0].name["en"], "Ada Example");
        assert_eq!(article.authors[0].email.as_deref(), Some("ada@example.org"));
        assert_eq!(article.authors[0].organizations, vec![1]);
        assert_eq!(article.links, vec!["https://a.example", "https://b.example"]);
        assert!(article.citation.is_empty());
        assert_eq!(article.languages(), vec!["de", "en"]);
    }

    #[test]
    fn test_missing_metadata_is_empty() {
        let article = ArticleMetadata::from_meta(&BTreeMap::new()).unwrap();
        assert_eq!(article, ArticleMetadata::default());
        assert!(article.languages().is_empty());
    }

    #[test]
    fn test_invalid_organization_index() {
        let meta = meta(&format!(
            r#"{{"authors": {{"t":"MetaList","c":[{{"t":"MetaMap","c":{{"name":{},"organizations":{{"t":"MetaString","c":"3"}}}}}}]}}}}"#,
            inlines("Ada")
        ));
        let err = ArticleMetadata::from_meta(&meta).unwrap_err();
        assert!(err.to_string().contains("authors.1.organizations"));
    }

    #[test]
    fn test_wrong_shape() {
        let meta = meta(r#"{"links": {"t":"MetaString","c":"https://a.example"}}"#);
        assert!(matches!(
            ArticleMetadata::from_meta(&meta),
            Err(AstError::InvalidMetadata { ref key, .. }) if key == "links"
        ));
    }
}
