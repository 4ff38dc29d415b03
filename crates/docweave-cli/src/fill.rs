//! Article metadata placeholders
//!
//! Per-language inline tokens (`{{{title-en}}}`) receive the localized
//! metadata text. Paragraph tokens (`{{{links}}}`, `{{{author-details-en}}}`)
//! are replaced by generated paragraphs. Tokens left over for the
//! configured languages are removed afterwards.

use anyhow::{Context, Result};
use docweave_ast::{ArticleMetadata, Author, Localized, DEFAULT_LANGUAGE};
use docweave_ooxml::document::{list_paragraph, paragraph};
use docweave_ooxml::{
    InlineReplacement, InlineTemplateSubstitution, Node, OoxmlError, Package,
    ParagraphTemplateSubstitution,
};
use tracing::{debug, info};

use crate::settings::Settings;

/// Inline tokens filled from a localized metadata field
pub const TEXT_FIELDS: [&str; 5] = [
    "title",
    "abstract",
    "keywords",
    "citation",
    "acknowledgements",
];
/// Inline token listing author names
pub const AUTHORS: &str = "authors";
/// Inline token listing organizations
pub const ORGANIZATIONS: &str = "organizations";
/// Paragraph token replaced by per-author blocks
pub const AUTHOR_DETAILS: &str = "author-details";
/// Paragraph token replaced by the bibliography list
pub const LINKS: &str = "links";

/// `{{{name}}}`
pub fn placeholder(name: &str) -> String {
    ["{{{", name, "}}}"].concat()
}

/// `{{{name-lang}}}`
pub fn localized_placeholder(name: &str, language: &str) -> String {
    placeholder(&format!("{}-{}", name, language))
}

/// Outcome of filling a template
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Inline tokens replaced by text
    pub replaced: usize,
    /// Paragraph tokens replaced by generated paragraphs
    pub generated: usize,
    /// Unused tokens removed (body blocks and header/footer occurrences)
    pub removed: usize,
}

/// Fills metadata placeholders of a merged package
#[derive(Debug)]
pub struct MetadataFiller<'a> {
    article: &'a ArticleMetadata,
    settings: &'a Settings,
}

impl<'a> MetadataFiller<'a> {
    /// Filler for `article`
    pub fn new(article: &'a ArticleMetadata, settings: &'a Settings) -> Self {
        Self { article, settings }
    }

    /// Configured languages followed by any further languages the metadata
    /// uses
    pub fn languages(&self) -> Vec<String> {
        let mut languages = self.settings.languages.clone();
        for language in self.article.languages() {
            if !languages.contains(&language) {
                languages.push(language);
            }
        }
        languages
    }

    /// Fill every token the metadata provides, then remove the rest
    pub fn fill(&self, package: &mut Package) -> Result<FillReport> {
        let mut report = FillReport::default();
        let languages = self.languages();

        for language in &languages {
            for (name, field) in TEXT_FIELDS.iter().zip(self.text_fields()) {
                if let Some(text) = field.get(language) {
                    report.replaced += replace(package, &localized_placeholder(name, language), text)?;
                }
            }
            if !self.article.authors.is_empty() {
                report.replaced += replace(
                    package,
                    &localized_placeholder(AUTHORS, language),
                    &self.author_line(language),
                )?;
                let nodes = self.author_details(package, language)?;
                if substitute_paragraph(
                    package,
                    &localized_placeholder(AUTHOR_DETAILS, language),
                    nodes,
                )? {
                    report.generated += 1;
                }
            }
            if !self.article.organizations.is_empty() {
                report.replaced += replace(
                    package,
                    &localized_placeholder(ORGANIZATIONS, language),
                    &self.organization_line(language),
                )?;
            }
        }

        if !self.article.links.is_empty() {
            let nodes = self.bibliography(package)?;
            if substitute_paragraph(package, &placeholder(LINKS), nodes)? {
                report.generated += 1;
            }
        }

        report.removed = remove_unused(package, &languages)?;
        info!(
            "Filled {} inline and {} paragraph placeholder(s), removed {}",
            report.replaced, report.generated, report.removed
        );
        Ok(report)
    }

    fn text_fields(&self) -> [&'a Localized; 5] {
        [
            &self.article.title,
            &self.article.abstract_text,
            &self.article.keywords,
            &self.article.citation,
            &self.article.acknowledgements,
        ]
    }

    /// `Ada Example¹, Bob Builder¹²`
    fn author_line(&self, language: &str) -> String {
        self.article
            .authors
            .iter()
            .map(|author| {
                let marks: String = author
                    .organizations
                    .iter()
                    .map(|index| superscript(*index))
                    .collect();
                format!("{}{}", localized(&author.name, language), marks)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `¹ Example University; ² Other Institute`
    fn organization_line(&self, language: &str) -> String {
        self.article
            .organizations
            .iter()
            .enumerate()
            .map(|(i, organization)| {
                format!("{} {}", superscript(i + 1), localized(organization, language))
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Name, email and organization paragraphs for every author
    fn author_details(&self, package: &Package, language: &str) -> Result<Vec<Node>> {
        let details = &self.settings.author_details;
        let name_style = resolve_style(package, details.name_style.as_deref())?;
        let detail_style = resolve_style(package, details.detail_style.as_deref())?;

        Ok(self
            .article
            .authors
            .iter()
            .flat_map(|author| {
                self.author_block(author, language, name_style.as_deref(), detail_style.as_deref())
            })
            .collect())
    }

    fn author_block(
        &self,
        author: &Author,
        language: &str,
        name_style: Option<&str>,
        detail_style: Option<&str>,
    ) -> Vec<Node> {
        let mut nodes = vec![paragraph(
            name_style,
            localized(&author.name, language),
        )];
        if let Some(email) = &author.email {
            nodes.push(paragraph(detail_style, email));
        }
        for index in &author.organizations {
            let organization = index
                .checked_sub(1)
                .and_then(|i| self.article.organizations.get(i));
            if let Some(organization) = organization {
                nodes.push(paragraph(
                    detail_style,
                    localized(organization, language),
                ));
            }
        }
        nodes
    }

    /// One list paragraph per link, or plain paragraphs without a configured
    /// bibliography list
    fn bibliography(&self, package: &Package) -> Result<Vec<Node>> {
        let links = &self.article.links;
        match &self.settings.bibliography {
            Some(list) => {
                let style_id = resolve_style(package, Some(list.style.as_str()))?
                    .unwrap_or_default();
                Ok(links
                    .iter()
                    .map(|link| list_paragraph(&style_id, &list.num_id, 0, link))
                    .collect())
            }
            None => Ok(links.iter().map(|link| paragraph(None, link)).collect()),
        }
    }
}

/// Text for `language`, falling back to the default language and then to
/// any language
fn localized<'t>(text: &'t Localized, language: &str) -> &'t str {
    text.get(language)
        .or_else(|| text.get(DEFAULT_LANGUAGE))
        .or_else(|| text.values().next())
        .map(String::as_str)
        .unwrap_or_default()
}

fn superscript(n: usize) -> String {
    const DIGITS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];
    n.to_string()
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| DIGITS[d as usize])
        .collect()
}

/// Style id of the template style called `name`
fn resolve_style(package: &Package, name: Option<&str>) -> Result<Option<String>> {
    let Some(name) = name else {
        return Ok(None);
    };
    let styles = package.styles().context("Failed to read template styles")?;
    let id = styles
        .get_by_name(name)
        .and_then(|style| style.id())
        .ok_or_else(|| OoxmlError::StyleNotFound(format!("'{}' in the template", name)))?;
    Ok(Some(id.to_string()))
}

fn replace(package: &mut Package, token: &str, text: &str) -> Result<usize> {
    let count = InlineTemplateSubstitution::new(token, InlineReplacement::Text(text.to_string()))
        .perform(package)
        .with_context(|| format!("Failed to fill {}", token))?;
    debug!("{}: {} occurrence(s)", token, count);
    Ok(count)
}

/// Replace a paragraph token; `false` when the template lacks it
fn substitute_paragraph(package: &mut Package, token: &str, nodes: Vec<Node>) -> Result<bool> {
    let substitution = ParagraphTemplateSubstitution::new(token, move || nodes.clone());
    match substitution.perform(package) {
        Ok(()) => Ok(true),
        Err(OoxmlError::PlaceholderNotFound(_)) => {
            debug!("Template has no {} paragraph", token);
            Ok(false)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to fill {}", token)),
    }
}

/// Remove every known token of `languages` that is still present
pub fn remove_unused(package: &mut Package, languages: &[String]) -> Result<usize> {
    let mut tokens = vec![placeholder(LINKS)];
    for language in languages {
        for name in TEXT_FIELDS
            .iter()
            .chain(&[AUTHORS, ORGANIZATIONS, AUTHOR_DETAILS])
        {
            tokens.push(localized_placeholder(name, language));
        }
    }

    let mut removed = 0;
    for token in tokens {
        // Body blocks go entirely; header and footer occurrences are blanked
        let blocks = InlineTemplateSubstitution::new(token.as_str(), InlineReplacement::Remove)
            .perform(package)
            .with_context(|| format!("Failed to remove {}", token))?;
        let blanked = InlineTemplateSubstitution::new(token.as_str(), InlineReplacement::Text(String::new()))
            .perform(package)
            .with_context(|| format!("Failed to remove {}", token))?;
        if blocks + blanked > 0 {
            debug!("Removed unused {}", token);
        }
        removed += blocks + blanked;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docweave_ooxml::document::paragraph_text;
    use docweave_ooxml::test_utils::{paragraph_style_xml, paragraph_xml, DocxFixture};

    fn article() -> ArticleMetadata {
        ArticleMetadata {
            title: Localized::from([
                ("en".to_string(), "Ownership".to_string()),
                ("de".to_string(), "Besitz".to_string()),
            ]),
            keywords: Localized::from([("en".to_string(), "rust, memory".to_string())]),
            authors: vec![
                Author {
                    name: Localized::from([("en".to_string(), "Ada Example".to_string())]),
                    email: Some("ada@example.org".to_string()),
                    organizations: vec![1, 2],
                },
                Author {
                    name: Localized::from([("en".to_string(), "Bob".to_string())]),
                    email: None,
                    organizations: vec![2],
                },
            ],
            organizations: vec![
                Localized::from([
                    ("en".to_string(), "Example University".to_string()),
                    ("de".to_string(), "Beispiel Universität".to_string()),
                ]),
                Localized::from([("en".to_string(), "Lab".to_string())]),
            ],
            ..ArticleMetadata::default()
        }
    }

    fn body_texts(package: &Package) -> Vec<String> {
        let document = package.main_document().unwrap();
        document
            .body()
            .unwrap()
            .children()
            .iter()
            .filter(|child| child.is("w:p"))
            .map(paragraph_text)
            .collect()
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholder(LINKS), "{{{links}}}");
        assert_eq!(localized_placeholder("title", "de"), "{{{title-de}}}");
    }

    #[test]
    fn test_superscript_and_lines() {
        assert_eq!(superscript(1), "¹");
        assert_eq!(superscript(12), "¹²");

        let article = article();
        let settings = Settings::default();
        let filler = MetadataFiller::new(&article, &settings);
        assert_eq!(filler.author_line("de"), "Ada Example¹², Bob²");
        assert_eq!(
            filler.organization_line("de"),
            "¹ Beispiel Universität; ² Lab"
        );
        assert_eq!(filler.languages(), vec!["en", "de"]);
    }

    #[test]
    fn test_author_block_skips_unknown_organizations() {
        let mut article = article();
        article.authors[0].organizations = vec![0, 2, 7];
        let settings = Settings::default();
        let filler = MetadataFiller::new(&article, &settings);

        let texts: Vec<String> = filler
            .author_block(&article.authors[0], "en", None, None)
            .iter()
            .map(paragraph_text)
            .collect();
        assert_eq!(texts, vec!["Ada Example", "ada@example.org", "Lab"]);
    }

    #[test]
    fn test_fill_and_remove() {
        let mut package = DocxFixture::new()
            .styles(format!(
                "{}{}{}",
                paragraph_style_xml("Normal", "Normal"),
                paragraph_style_xml("AuthorName", "Author"),
                paragraph_style_xml("AuthorInfo", "Author Info"),
            ))
            .body(
                [
                    paragraph_xml(None, "{{{title-en}}}"),
                    paragraph_xml(None, "{{{authors-en}}}"),
                    paragraph_xml(None, "{{{author-details-en}}}"),
                    paragraph_xml(None, "Keywords: {{{keywords-en}}}"),
                    paragraph_xml(None, "Zitat: {{{citation-en}}}"),
                    paragraph_xml(None, "{{{links}}}"),
                    paragraph_xml(None, "Fixed"),
                ]
                .concat(),
            )
            .header(paragraph_xml(None, "{{{title-en}}} | {{{abstract-en}}}"))
            .package()
            .unwrap();

        let mut settings = Settings::default();
        settings.author_details.name_style = Some("Author".to_string());
        settings.author_details.detail_style = Some("Author Info".to_string());
        let article = article();

        let report = MetadataFiller::new(&article, &settings)
            .fill(&mut package)
            .unwrap();

        assert_eq!(
            body_texts(&package),
            vec![
                "Ownership",
                "Ada Example¹², Bob²",
                "Ada Example",
                "ada@example.org",
                "Example University",
                "Lab",
                "Bob",
                "Lab",
                "Keywords: rust, memory",
                "Fixed",
            ]
        );
        assert_eq!(report.generated, 1);
        // title in body and header, authors, keywords
        assert_eq!(report.replaced, 4);
        // citation paragraph, links paragraph, abstract in the header
        assert_eq!(report.removed, 3);

        let header_path = &package.headers_and_footers()[0];
        let header = package.load_part(header_path).unwrap();
        assert_eq!(header.tree.text_content(), "Ownership | ");

        let document = package.main_document().unwrap();
        let details = &document.body().unwrap().children()[2];
        assert_eq!(
            details
                .first_element("w:pPr")
                .and_then(|ppr| ppr.first_element("w:pStyle"))
                .and_then(|style| style.attr("w:val")),
            Some("AuthorName")
        );
    }

    #[test]
    fn test_unknown_detail_style() {
        let mut package = DocxFixture::new()
            .body(paragraph_xml(None, "{{{author-details-en}}}"))
            .package()
            .unwrap();
        let mut settings = Settings::default();
        settings.author_details.name_style = Some("Author".to_string());
        let article = article();

        let err = MetadataFiller::new(&article, &settings)
            .fill(&mut package)
            .unwrap_err();
        assert!(err.to_string().contains("Style not found"));
    }
}
