//! Integration tests for the docweave build pipeline
//!
//! A fake converter stands in for pandoc: it returns a fixed Pandoc JSON
//! AST for Markdown input and renders Pandoc JSON into a small DOCX
//! package, honoring raw `openxml` blocks.

use std::cell::RefCell;
use std::fs;

use anyhow::{bail, Result};
use docweave_ast::{inline_text, PandocDocument};
use docweave_cli::{build_command, Converter, Settings};
use docweave_ooxml::document::{paragraph_num_id, paragraph_style, paragraph_text};
use docweave_ooxml::test_utils::{
    abstract_num_xml, num_xml, paragraph_style_xml, paragraph_xml, DocxFixture,
};
use docweave_ooxml::{ListConversion, Package};
use serde_json::Value;
use tempfile::TempDir;

const ARTICLE_JSON: &str = r#"{
  "pandoc-api-version": [1, 23, 1],
  "meta": {
    "title": {"t": "MetaInlines", "c": [{"t": "Str", "c": "Ownership"}]},
    "authors": {"t": "MetaList", "c": [{"t": "MetaMap", "c": {
      "name": {"t": "MetaInlines", "c": [{"t": "Str", "c": "Ada"}, {"t": "Space"}, {"t": "Str", "c": "Example"}]},
      "organizations": {"t": "MetaList", "c": [{"t": "MetaString", "c": "1"}]}
    }}]},
    "organizations": {"t": "MetaList", "c": [{"t": "MetaInlines", "c": [{"t": "Str", "c": "Example University"}]}]},
    "links": {"t": "MetaList", "c": [
      {"t": "MetaString", "c": "https://a.example"},
      {"t": "MetaString", "c": "https://b.example"}
    ]}
  },
  "blocks": [
    {"t": "Header", "c": [1, ["introduction", [], []], [{"t": "Str", "c": "Introduction"}]]},
    {"t": "Para", "c": [{"t": "Str", "c": "Body"}, {"t": "Space"}, {"t": "Str", "c": "text"}]},
    {"t": "Div", "c": [["", ["caption"], []], [{"t": "Para", "c": [{"t": "Str", "c": "Figure"}, {"t": "Space"}, {"t": "Str", "c": "1"}]}]]}
  ]
}"#;

/// Pandoc stand-in
#[derive(Default)]
struct FakeConverter {
    calls: RefCell<Vec<(String, String)>>,
    fail: bool,
}

impl FakeConverter {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn render_docx(json: &[u8]) -> Result<Vec<u8>> {
        let document = PandocDocument::from_slice(json)?;
        let mut body = String::new();
        for block in &document.blocks {
            let content = &block["c"];
            match block["t"].as_str() {
                Some("Header") => {
                    body.push_str(&paragraph_xml(Some("Heading1"), &inlines(&content[2])))
                }
                Some("Para") => body.push_str(&paragraph_xml(None, &inlines(content))),
                Some("RawBlock") if content[0] == "openxml" => {
                    body.push_str(content[1].as_str().unwrap_or_default())
                }
                _ => {}
            }
        }
        let styles = paragraph_style_xml("Normal", "Normal")
            + &paragraph_style_xml("Heading1", "Heading 1")
            + &paragraph_style_xml("ImageCaption", "Image Caption");
        Ok(DocxFixture::new().styles(styles).body(body).build()?)
    }
}

fn inlines(value: &Value) -> String {
    value
        .as_array()
        .map(|inlines| inline_text(inlines))
        .unwrap_or_default()
}

impl Converter for FakeConverter {
    fn convert(&self, input: &[u8], from: &str, to: &str) -> Result<Vec<u8>> {
        self.calls
            .borrow_mut()
            .push((from.to_string(), to.to_string()));
        if self.fail {
            bail!("converter exited with status 64");
        }
        match (from, to) {
            ("markdown", "json") => Ok(ARTICLE_JSON.as_bytes().to_vec()),
            ("json", "docx") => Self::render_docx(input),
            _ => bail!("unexpected conversion {} -> {}", from, to),
        }
    }
}

fn template() -> DocxFixture {
    let styles = paragraph_style_xml("Normal", "Normal")
        + &paragraph_style_xml("SecHead", "Section Head")
        + &paragraph_style_xml("Cap", "Caption")
        + &paragraph_style_xml("Bib", "Bibliography");
    let numbering = abstract_num_xml("4", "decimal") + &num_xml("12", "4");
    let body = paragraph_xml(None, "{{{title-en}}}")
        + &paragraph_xml(None, "{{{authors-en}}}")
        + &paragraph_xml(None, "{{{organizations-en}}}")
        + &paragraph_xml(None, "{{{body}}}")
        + &paragraph_xml(None, "Abstract: {{{abstract-en}}}")
        + &paragraph_xml(None, "{{{links}}}");
    DocxFixture::new()
        .styles(styles)
        .numbering(numbering)
        .body(body)
        .as_template()
}

struct Workspace {
    _dir: TempDir,
    source: std::path::PathBuf,
    target: std::path::PathBuf,
    settings: Settings,
}

fn workspace() -> Workspace {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("article.md");
    fs::write(&source, "---\ntitle: Ownership\n---\n# Introduction\n").unwrap();
    let template_path = dir.path().join("institute.dotx");
    fs::write(&template_path, template().build().unwrap()).unwrap();

    let mut settings = Settings::default();
    settings.template = Some(template_path);
    settings.bibliography = Some(ListConversion::new("Bibliography", "12"));
    settings.merge = settings
        .merge
        .convert_style("Heading 1", "Section Head")
        .convert_style("Image Caption", "Caption");

    Workspace {
        target: dir.path().join("article.docx"),
        source,
        settings,
        _dir: dir,
    }
}

#[test]
fn test_build_pipeline() {
    let ws = workspace();
    let converter = FakeConverter::default();

    let report = build_command(&ws.source, &ws.target, None, &ws.settings, &converter).unwrap();

    assert_eq!(
        *converter.calls.borrow(),
        vec![
            ("markdown".to_string(), "json".to_string()),
            ("json".to_string(), "docx".to_string()),
        ]
    );
    assert_eq!(report.captions, 1);
    assert_eq!(report.merge.inserted_blocks, 3);
    assert_eq!(report.fill.generated, 1);
    assert_eq!(report.fill.removed, 1);

    let package = Package::open(&ws.target).unwrap();
    let document = package.main_document().unwrap();
    let paragraphs: Vec<_> = document
        .body()
        .unwrap()
        .children()
        .iter()
        .filter(|child| child.is("w:p"))
        .collect();
    let texts: Vec<String> = paragraphs.iter().map(|p| paragraph_text(p)).collect();
    assert_eq!(
        texts,
        vec![
            "Ownership",
            "Ada Example¹",
            "¹ Example University",
            "Introduction",
            "Body text",
            "Figure 1",
            "https://a.example",
            "https://b.example",
        ]
    );

    assert_eq!(paragraph_style(paragraphs[3]), Some("SecHead"));
    assert_eq!(paragraph_style(paragraphs[5]), Some("Cap"));
    assert_eq!(paragraph_style(paragraphs[6]), Some("Bib"));
    assert_eq!(paragraph_num_id(paragraphs[6]), Some("12"));
    assert_eq!(paragraph_num_id(paragraphs[7]), Some("12"));
}

#[test]
fn test_template_flag_overrides_settings() {
    let mut ws = workspace();
    let template_path = ws.settings.template.take().unwrap();

    let err = build_command(
        &ws.source,
        &ws.target,
        None,
        &ws.settings,
        &FakeConverter::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("No template given"));

    build_command(
        &ws.source,
        &ws.target,
        Some(&template_path),
        &ws.settings,
        &FakeConverter::default(),
    )
    .unwrap();
    assert!(ws.target.exists());
}

#[test]
fn test_converter_failure_leaves_no_target() {
    let ws = workspace();
    let converter = FakeConverter::failing();

    let err = build_command(&ws.source, &ws.target, None, &ws.settings, &converter).unwrap_err();
    assert!(format!("{:#}", err).contains("exited with status 64"));
    assert_eq!(converter.calls.borrow().len(), 1);
    assert!(!ws.target.exists());
}

#[test]
fn test_unmapped_style_fails_the_merge() {
    let mut ws = workspace();
    ws.settings.merge.style_conversions.remove("Image Caption");

    let err = build_command(
        &ws.source,
        &ws.target,
        None,
        &ws.settings,
        &FakeConverter::default(),
    )
    .unwrap_err();
    assert!(format!("{:#}", err).contains("Unrecognized style 'ImageCaption'"));
    assert!(!ws.target.exists());
}

#[test]
fn test_missing_source() {
    let ws = workspace();
    let missing = ws.source.with_file_name("missing.md");

    let err = build_command(
        &missing,
        &ws.target,
        None,
        &ws.settings,
        &FakeConverter::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("Input file not found"));
}
