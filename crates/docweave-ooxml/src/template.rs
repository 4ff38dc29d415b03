//! Placeholder substitution in template packages
//!
//! - [`ParagraphTemplateSubstitution`] swaps a placeholder paragraph for
//!   generated block content (bibliography lists, author blocks)
//! - [`InlineTemplateSubstitution`] replaces placeholder text inside runs
//!   of the body, headers and footers, or removes the body blocks that
//!   still carry an unused placeholder
//!
//! # Example
//!
//! ```no_run
//! use docweave_ooxml::{document, InlineReplacement, InlineTemplateSubstitution, Package};
//! use docweave_ooxml::ParagraphTemplateSubstitution;
//!
//! let mut package = Package::open("article.docx")?;
//! InlineTemplateSubstitution::new("{{{title-en}}}", InlineReplacement::Text("On Rust".into()))
//!     .perform(&mut package)?;
//! ParagraphTemplateSubstitution::new("{{{links}}}", || {
//!     vec![document::paragraph(Some("Bibliography"), "https://www.rust-lang.org")]
//! })
//! .perform(&mut package)?;
//! package.write_to_file("article.docx")?;
//! # Ok::<(), docweave_ooxml::OoxmlError>(())
//! ```

use tracing::debug;

use crate::document::{paragraph_text, MainDocument};
use crate::error::{OoxmlError, Result};
use crate::package::Package;
use crate::xml::{Index, Node};

/// Replaces the placeholder paragraph with generated nodes
pub struct ParagraphTemplateSubstitution<F>
where
    F: Fn() -> Vec<Node>,
{
    placeholder: String,
    generator: F,
}

impl<F> ParagraphTemplateSubstitution<F>
where
    F: Fn() -> Vec<Node>,
{
    /// Substitution of `placeholder` by the nodes `generator` produces.
    ///
    /// The generator runs once per [`perform`](Self::perform) call.
    pub fn new(placeholder: impl Into<String>, generator: F) -> Self {
        Self {
            placeholder: placeholder.into(),
            generator,
        }
    }

    /// The placeholder text
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Substitute in the main document of `package`
    pub fn perform(&self, package: &mut Package) -> Result<()> {
        let mut document = package.main_document()?;
        self.apply(&mut document)?;
        package.store_part(&mut document.into_part())
    }

    /// Substitute in a loaded main document.
    ///
    /// The first paragraph whose text is exactly the placeholder is
    /// replaced. A paragraph before it that contains the placeholder among
    /// other text is an error.
    pub fn apply(&self, document: &mut MainDocument) -> Result<()> {
        let body = document.body_mut()?;
        let mut found = None;
        for (position, child) in body.children().iter().enumerate() {
            if !child.is("w:p") {
                continue;
            }
            let text = paragraph_text(child);
            if text == self.placeholder {
                found = Some(position);
                break;
            }
            if text.contains(&self.placeholder) {
                return Err(OoxmlError::PlaceholderNotExclusive {
                    placeholder: self.placeholder.clone(),
                    paragraph_text: text,
                });
            }
        }
        let position =
            found.ok_or_else(|| OoxmlError::PlaceholderNotFound(self.placeholder.clone()))?;

        let nodes = (self.generator)();
        debug!(
            "Replacing {} with {} generated nodes",
            self.placeholder,
            nodes.len()
        );
        body.remove_child(&[Index::At(position)])?;
        body.insert_children(&[Index::At(position)], nodes)
    }
}

impl<F> std::fmt::Debug for ParagraphTemplateSubstitution<F>
where
    F: Fn() -> Vec<Node>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParagraphTemplateSubstitution")
            .field("placeholder", &self.placeholder)
            .finish_non_exhaustive()
    }
}

/// What an [`InlineTemplateSubstitution`] does with its placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineReplacement {
    /// Replace every occurrence with this text
    Text(String),
    /// Remove every top-level body block containing the placeholder
    Remove,
}

/// Text-level placeholder substitution
#[derive(Debug, Clone)]
pub struct InlineTemplateSubstitution {
    placeholder: String,
    replacement: InlineReplacement,
}

impl InlineTemplateSubstitution {
    /// Substitution of `placeholder` by `replacement`
    pub fn new(placeholder: impl Into<String>, replacement: InlineReplacement) -> Self {
        Self {
            placeholder: placeholder.into(),
            replacement,
        }
    }

    /// The placeholder text
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Substitute in the main document and, for text replacement, in every
    /// header and footer part. Returns the number of replacements or
    /// removed blocks.
    ///
    /// Every affected part is rewritten before any is stored, so a failure
    /// leaves the package unchanged.
    pub fn perform(&self, package: &mut Package) -> Result<usize> {
        let mut document = package.main_document()?;
        let mut count = self.apply(&mut document)?;
        let mut changed = Vec::new();
        if count > 0 {
            changed.push(document.into_part());
        }

        if let InlineReplacement::Text(text) = &self.replacement {
            for path in package.headers_and_footers() {
                let mut part = package.load_part(&path)?;
                let replaced = replace_in_text(&mut part.tree, &self.placeholder, text);
                if replaced > 0 {
                    debug!("Replaced {} x{} in {}", self.placeholder, replaced, path);
                    changed.push(part);
                    count += replaced;
                }
            }
        }

        for part in &mut changed {
            package.store_part(part)?;
        }
        Ok(count)
    }

    /// Substitute in the body of a loaded main document
    pub fn apply(&self, document: &mut MainDocument) -> Result<usize> {
        if self.placeholder.is_empty() {
            return Ok(0);
        }
        let body = document.body_mut()?;
        let count = match &self.replacement {
            InlineReplacement::Text(text) => replace_in_text(body, &self.placeholder, text),
            InlineReplacement::Remove => {
                body.remove_children(|child| paragraph_text(child).contains(&self.placeholder))?
            }
        };
        if count > 0 {
            debug!("Substituted {} x{} in the body", self.placeholder, count);
        }
        Ok(count)
    }
}

/// Replace `placeholder` in every text leaf under `node`
fn replace_in_text(node: &mut Node, placeholder: &str, replacement: &str) -> usize {
    match node {
        Node::Text(text) => {
            let count = text.matches(placeholder).count();
            if count > 0 {
                *text = text.replace(placeholder, replacement);
            }
            count
        }
        Node::Element(element) => element
            .children
            .iter_mut()
            .map(|child| replace_in_text(child, placeholder, replacement))
            .sum(),
        Node::Comment(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{list_paragraph, paragraph};
    use crate::package::PartPath;
    use crate::test_utils::{paragraph_xml, DocxFixture};

    fn body_texts(package: &Package) -> Vec<String> {
        package
            .main_document()
            .unwrap()
            .body()
            .unwrap()
            .children()
            .iter()
            .map(paragraph_text)
            .collect()
    }

    #[test]
    fn test_paragraph_substitution_replaces_first_match() {
        let mut package = DocxFixture::new()
            .body(
                paragraph_xml(None, "intro")
                    + &paragraph_xml(None, "{{{links}}}")
                    + &paragraph_xml(None, "{{{links}}}"),
            )
            .package()
            .unwrap();

        let substitution = ParagraphTemplateSubstitution::new("{{{links}}}", || {
            vec![
                list_paragraph("Bibliography", "4", 0, "a"),
                list_paragraph("Bibliography", "4", 0, "b"),
            ]
        });
        substitution.perform(&mut package).unwrap();
        assert_eq!(body_texts(&package), vec!["intro", "a", "b", "{{{links}}}"]);

        substitution.perform(&mut package).unwrap();
        assert_eq!(body_texts(&package), vec!["intro", "a", "b", "a", "b"]);
        assert!(matches!(
            substitution.perform(&mut package),
            Err(OoxmlError::PlaceholderNotFound(_))
        ));
    }

    #[test]
    fn test_paragraph_substitution_requires_exclusive_paragraph() {
        let mut package = DocxFixture::new()
            .body(paragraph_xml(None, "see {{{links}}}") + &paragraph_xml(None, "{{{links}}}"))
            .package()
            .unwrap();
        let before = package.to_bytes().unwrap();

        let result = ParagraphTemplateSubstitution::new("{{{links}}}", Vec::new)
            .perform(&mut package);
        assert!(matches!(
            result,
            Err(OoxmlError::PlaceholderNotExclusive { ref paragraph_text, .. })
                if paragraph_text == "see {{{links}}}"
        ));
        assert_eq!(package.to_bytes().unwrap(), before);
    }

    #[test]
    fn test_inline_text_in_body_and_headers() {
        let mut package = DocxFixture::new()
            .body(paragraph_xml(None, "Title: {{{title-en}}} / {{{title-en}}}"))
            .header(paragraph_xml(None, "{{{title-en}}}"))
            .footer(paragraph_xml(None, "page"))
            .package()
            .unwrap();

        let count = InlineTemplateSubstitution::new(
            "{{{title-en}}}",
            InlineReplacement::Text("On Rust".into()),
        )
        .perform(&mut package)
        .unwrap();

        assert_eq!(count, 3);
        assert_eq!(body_texts(&package), vec!["Title: On Rust / On Rust"]);
        let header = package.load_part(&PartPath::new("/word/header1.xml")).unwrap();
        assert_eq!(paragraph_text(&header.tree), "On Rust");
    }

    #[test]
    fn test_inline_text_with_broken_header_leaves_package() {
        let mut package = DocxFixture::new()
            .body(paragraph_xml(None, "hello {{{x}}}"))
            .header("<w:p><w:r><w:t>{{{x}}}</w:t></w:r>")
            .package()
            .unwrap();
        let before = package.to_bytes().unwrap();

        let result =
            InlineTemplateSubstitution::new("{{{x}}}", InlineReplacement::Text("Y".into()))
                .perform(&mut package);
        assert!(result.is_err());
        assert_eq!(body_texts(&package), vec!["hello {{{x}}}"]);
        assert_eq!(package.to_bytes().unwrap(), before);
    }

    #[test]
    fn test_paragraph_substitution_ignores_paragraphs_after_match() {
        let mut package = DocxFixture::new()
            .body(paragraph_xml(None, "{{{links}}}") + &paragraph_xml(None, "see {{{links}}}"))
            .package()
            .unwrap();

        ParagraphTemplateSubstitution::new("{{{links}}}", || vec![paragraph(None, "a")])
            .perform(&mut package)
            .unwrap();
        assert_eq!(body_texts(&package), vec!["a", "see {{{links}}}"]);
    }

    #[test]
    fn test_inline_remove_drops_blocks() {
        let mut package = DocxFixture::new()
            .body(
                paragraph_xml(None, "keep")
                    + "<w:tbl><w:tr><w:tc>"
                    + &paragraph_xml(None, "x {{{keywords-de}}}")
                    + "</w:tc></w:tr></w:tbl>"
                    + &paragraph_xml(None, "{{{keywords-de}}}"),
            )
            .package()
            .unwrap();

        let count = InlineTemplateSubstitution::new("{{{keywords-de}}}", InlineReplacement::Remove)
            .perform(&mut package)
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(body_texts(&package), vec!["keep"]);
    }

    #[test]
    fn test_inline_without_match_leaves_package() {
        let mut package = DocxFixture::new()
            .body(paragraph_xml(None, "plain"))
            .package()
            .unwrap();
        let before = package.to_bytes().unwrap();
        let count = InlineTemplateSubstitution::new("{{{none}}}", InlineReplacement::Remove)
            .perform(&mut package)
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(package.to_bytes().unwrap(), before);
    }

    #[test]
    fn test_apply_on_detached_document() {
        let mut document = MainDocument::parse(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>{{{x}}}</w:t></w:r></w:p></w:body></w:document>"#,
        )
        .unwrap();
        ParagraphTemplateSubstitution::new("{{{x}}}", || vec![paragraph(Some("Quote"), "done")])
            .apply(&mut document)
            .unwrap();
        let body = document.body().unwrap();
        assert_eq!(paragraph_text(body), "done");
    }
}
