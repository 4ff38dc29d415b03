//! Namespace declarations for WordprocessingML parts
//!
//! Parts are edited with qualified names and no namespace bookkeeping.
//! Before a part is written, the prefixes actually used in its tree are
//! collected and any missing `xmlns:` declaration is added to the root from
//! a fixed prefix table.

use std::collections::BTreeSet;

use tracing::warn;

use crate::xml::node::Node;

/// Known prefix → namespace URI pairs
pub const NAMESPACES: &[(&str, &str)] = &[
    ("a", "http://schemas.openxmlformats.org/drawingml/2006/main"),
    ("aink", "http://schemas.microsoft.com/office/drawing/2016/ink"),
    ("am3d", "http://schemas.microsoft.com/office/drawing/2017/model3d"),
    ("cx", "http://schemas.microsoft.com/office/drawing/2014/chartex"),
    ("m", "http://schemas.openxmlformats.org/officeDocument/2006/math"),
    ("mc", "http://schemas.openxmlformats.org/markup-compatibility/2006"),
    ("o", "urn:schemas-microsoft-com:office:office"),
    ("pic", "http://schemas.openxmlformats.org/drawingml/2006/picture"),
    ("r", "http://schemas.openxmlformats.org/officeDocument/2006/relationships"),
    ("v", "urn:schemas-microsoft-com:vml"),
    ("w", "http://schemas.openxmlformats.org/wordprocessingml/2006/main"),
    ("w10", "urn:schemas-microsoft-com:office:word"),
    ("w14", "http://schemas.microsoft.com/office/word/2010/wordml"),
    ("w15", "http://schemas.microsoft.com/office/word/2012/wordml"),
    ("w16cid", "http://schemas.microsoft.com/office/word/2016/wordml/cid"),
    ("w16se", "http://schemas.microsoft.com/office/word/2015/wordml/symex"),
    ("wne", "http://schemas.microsoft.com/office/word/2006/wordml"),
    ("wp", "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"),
    ("wp14", "http://schemas.microsoft.com/office/word/2010/wordprocessingDrawing"),
    ("wpc", "http://schemas.microsoft.com/office/word/2010/wordprocessingCanvas"),
    ("wpg", "http://schemas.microsoft.com/office/word/2010/wordprocessingGroup"),
    ("wpi", "http://schemas.microsoft.com/office/word/2010/wordprocessingInk"),
    ("wps", "http://schemas.microsoft.com/office/word/2010/wordprocessingShape"),
];

/// Namespace URI for a prefix
pub fn namespace_uri(prefix: &str) -> Option<&'static str> {
    NAMESPACES
        .iter()
        .find(|(known, _)| *known == prefix)
        .map(|(_, uri)| *uri)
}

/// Prefixes used by element and attribute names in the subtree, plus the
/// prefixes listed in `mc:Ignorable` (those must be declared too)
pub fn used_prefixes(root: &Node) -> BTreeSet<String> {
    let mut prefixes = BTreeSet::new();
    collect_prefixes(root, &mut prefixes);
    prefixes
}

fn collect_prefixes(node: &Node, prefixes: &mut BTreeSet<String>) {
    let Some(name) = node.tag_name() else {
        return;
    };
    if let Some(prefix) = prefix_of(name) {
        prefixes.insert(prefix.to_string());
    }
    for (key, value) in node.attributes() {
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        if let Some(prefix) = prefix_of(key) {
            prefixes.insert(prefix.to_string());
        }
        if key == "mc:Ignorable" {
            prefixes.extend(value.split_whitespace().map(str::to_string));
        }
    }
    for child in node.children() {
        collect_prefixes(child, prefixes);
    }
}

fn prefix_of(name: &str) -> Option<&str> {
    name.split_once(':')
        .map(|(prefix, _)| prefix)
        .filter(|prefix| *prefix != "xml")
}

/// Add the missing `xmlns:` declarations to the root element.
///
/// Returns the prefixes that were declared. Unknown prefixes are logged and
/// left undeclared.
pub fn inject_namespace_declarations(root: &mut Node) -> Vec<String> {
    let mut added = Vec::new();
    for prefix in used_prefixes(root) {
        let key = format!("xmlns:{}", prefix);
        if root.attr(&key).is_some() {
            continue;
        }
        match namespace_uri(&prefix) {
            Some(uri) => {
                if root.set_attr(&key, uri).is_ok() {
                    added.push(prefix);
                }
            }
            None => warn!("No namespace known for prefix '{}'", prefix),
        }
    }
    added
}
