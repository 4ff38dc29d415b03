//! Pandoc JSON document root and block rewriting
//!
//! ```
//! use docweave_ast::PandocDocument;
//!
//! let json = r#"{"pandoc-api-version":[1,23,1],"meta":{},"blocks":[
//!   {"t":"Div","c":[["",["caption"],[]],[{"t":"Para","c":[{"t":"Str","c":"Figure"}]}]]}
//! ]}"#;
//! let mut document = PandocDocument::from_json(json)?;
//! let replaced = document.substitute_classed_divs("caption", |div| {
//!     format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", div.text())
//! });
//! assert_eq!(replaced, 1);
//! # Ok::<(), docweave_ast::AstError>(())
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::Result;
use crate::inline::{block_text, element_content, element_type};
use crate::meta::MetaValue;

/// Raw block format understood by the DOCX writer of the converter
pub const OPENXML_FORMAT: &str = "openxml";

/// A Pandoc document as produced by `pandoc -t json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PandocDocument {
    /// Pandoc API version triple
    #[serde(rename = "pandoc-api-version")]
    pub api_version: Vec<u32>,
    /// Document metadata
    #[serde(default)]
    pub meta: BTreeMap<String, MetaValue>,
    /// Top-level blocks, kept as raw JSON
    #[serde(default)]
    pub blocks: Vec<Value>,
}

impl PandocDocument {
    /// Parse a document from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a document from JSON bytes
    pub fn from_slice(json: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(json)?)
    }

    /// Serialize the document back to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Plain text of all top-level blocks
    pub fn text(&self) -> String {
        block_text(&self.blocks)
    }

    /// Replace every `Div` carrying `class`, at any depth, with an
    /// `openxml` raw block holding `render(div)`. Returns the number of
    /// replaced divs. Replaced divs are not searched further.
    pub fn substitute_classed_divs<F>(&mut self, class: &str, mut render: F) -> usize
    where
        F: FnMut(&Div<'_>) -> String,
    {
        let mut count = 0;
        for block in &mut self.blocks {
            substitute_in(block, class, &mut render, &mut count);
        }
        debug!("Substituted {} div(s) of class '{}'", count, class);
        count
    }
}

fn substitute_in<F>(value: &mut Value, class: &str, render: &mut F, count: &mut usize)
where
    F: FnMut(&Div<'_>) -> String,
{
    let raw = Div::from_value(value)
        .filter(|div| div.has_class(class))
        .map(|div| render(&div));
    if let Some(raw) = raw {
        *value = json!({"t": "RawBlock", "c": [OPENXML_FORMAT, raw]});
        *count += 1;
        return;
    }
    match value {
        Value::Array(items) => {
            for item in items {
                substitute_in(item, class, render, count);
            }
        }
        Value::Object(map) => {
            if let Some(content) = map.get_mut("c") {
                substitute_in(content, class, render, count);
            }
        }
        _ => {}
    }
}

/// Read-only view of a Pandoc `Div` block
#[derive(Debug, Clone)]
pub struct Div<'a> {
    /// Identifier, empty when unset
    pub id: &'a str,
    /// Classes in source order
    pub classes: Vec<&'a str>,
    /// Key/value attributes in source order
    pub attributes: Vec<(&'a str, &'a str)>,
    /// Content blocks
    pub blocks: &'a [Value],
}

impl<'a> Div<'a> {
    /// View a JSON value as a `Div`: `{"t":"Div","c":[[id,[classes],[[k,v]]],[blocks]]}`
    pub fn from_value(value: &'a Value) -> Option<Self> {
        if element_type(value) != Some("Div") {
            return None;
        }
        let content = element_content(value)?;
        let attr = content.get(0)?;
        let blocks = content.get(1)?.as_array()?;
        let classes = attr
            .get(1)
            .and_then(Value::as_array)
            .map(|classes| classes.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let attributes = attr
            .get(2)
            .and_then(Value::as_array)
            .map(|pairs| {
                pairs
                    .iter()
                    .filter_map(|pair| Some((pair.get(0)?.as_str()?, pair.get(1)?.as_str()?)))
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            id: attr.get(0).and_then(Value::as_str).unwrap_or_default(),
            classes,
            attributes,
            blocks,
        })
    }

    /// Whether the div carries `class`
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(&class)
    }

    /// Attribute value by key
    pub fn attribute(&self, key: &str) -> Option<&'a str> {
        self.attributes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    /// Plain text of the div's content
    pub fn text(&self) -> String {
        block_text(self.blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
  "pandoc-api-version": [1, 23, 1],
  "meta": {"title": {"t": "MetaInlines", "c": [{"t": "Str", "c": "Hello"}]}},
  "blocks": [
    {"t": "Para", "c": [{"t": "Str", "c": "intro"}]},
    {"t": "Div", "c": [["fig1", ["caption", "wide"], [["label", "Figure 1"]]],
      [{"t": "Para", "c": [{"t": "Str", "c": "A"}, {"t": "Space"}, {"t": "Str", "c": "cat"}]}]]},
    {"t": "BlockQuote", "c": [
      {"t": "Div", "c": [["", ["note"], []],
        [{"t": "Div", "c": [["", ["caption"], []], [{"t": "Plain", "c": [{"t": "Str", "c": "nested"}]}]]}]]}
    ]}
  ]
}"#;

    #[test]
    fn test_parse_and_reserialize() {
        let document = PandocDocument::from_json(DOC).unwrap();
        assert_eq!(document.api_version, vec![1, 23, 1]);
        assert_eq!(document.blocks.len(), 3);
        assert!(document.meta.contains_key("title"));

        let again = PandocDocument::from_json(&document.to_json().unwrap()).unwrap();
        assert_eq!(again, document);
    }

    #[test]
    fn test_substitute_classed_divs_at_any_depth() {
        let mut document = PandocDocument::from_json(DOC).unwrap();
        let mut seen = Vec::new();
        let count = document.substitute_classed_divs("caption", |div| {
            seen.push((div.id.to_string(), div.attribute("label").map(str::to_string)));
            format!("<w:p>{}</w:p>", div.text())
        });

        assert_eq!(count, 2);
        assert_eq!(
            seen,
            vec![
                ("fig1".to_string(), Some("Figure 1".to_string())),
                (String::new(), None)
            ]
        );
        assert_eq!(
            document.blocks[1],
            json!({"t": "RawBlock", "c": ["openxml", "<w:p>A cat</w:p>"]})
        );
        // The enclosing note div survives
        let quote = &document.blocks[2]["c"][0];
        assert_eq!(quote["t"], "Div");
        assert_eq!(quote["c"][1][0]["t"], "RawBlock");
    }

    #[test]
    fn test_unmatched_class_changes_nothing() {
        let mut document = PandocDocument::from_json(DOC).unwrap();
        let before = document.clone();
        assert_eq!(document.substitute_classed_divs("figure", |_| String::new()), 0);
        assert_eq!(document, before);
    }

    #[test]
    fn test_rejects_non_pandoc_json() {
        assert!(PandocDocument::from_json("[1, 2]").is_err());
        assert!(PandocDocument::from_json("not json").is_err());
    }
}
