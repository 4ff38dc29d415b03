//! CLI Application logic
//!
//! Contains the command-line interface and the build pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use docweave_ast::{ArticleMetadata, PandocDocument};
use docweave_ooxml::document::paragraph;
use docweave_ooxml::xml::render_fragment;
use docweave_ooxml::{MergeReport, Package, StyledTemplateSubstitution};

use crate::converter::{Converter, PandocConverter, DOCX, JSON, MARKDOWN};
use crate::fill::{FillReport, MetadataFiller};
use crate::settings::{Settings, SETTINGS_FILE};

#[derive(Parser)]
#[command(name = "docweave")]
#[command(author, version, about = "Markdown articles into Word templates", long_about = None)]
struct Cli {
    /// Input Markdown file
    source: PathBuf,

    /// Output DOCX file
    target: PathBuf,

    /// Template DOCX/DOTX file (overrides the settings file)
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Settings file (defaults to docweave.toml next to the source)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Run the CLI application
///
/// Parses arguments, loads the settings and runs the build with the
/// configured converter.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::discover(&cli.source, cli.config.as_deref())?;
    let converter = PandocConverter::from_settings(&settings.converter);

    println!("docweave v{}", docweave_ooxml::VERSION);
    println!("Building: {}", cli.source.display());

    let report = build_command(
        &cli.source,
        &cli.target,
        cli.template.as_deref(),
        &settings,
        &converter,
    )?;

    println!(
        "  Merged {} block(s): {} style(s) migrated, {} list(s) created, {} resource(s) copied",
        report.merge.inserted_blocks,
        report.merge.migrated_styles,
        report.merge.created_numberings,
        report.merge.copied_resources
    );
    println!(
        "  Filled {} placeholder(s), removed {} unused",
        report.fill.replaced + report.fill.generated,
        report.fill.removed
    );
    println!("  Created: {}", cli.target.display());
    Ok(())
}

/// Statistics of one build
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Caption divs turned into caption paragraphs
    pub captions: usize,
    /// Body merge statistics
    pub merge: MergeReport,
    /// Placeholder filling statistics
    pub fill: FillReport,
}

/// Build `target` from the Markdown `source`.
///
/// `template` takes precedence over the template named in the settings.
/// The target is written only when every stage succeeds.
pub fn build_command(
    source: &Path,
    target: &Path,
    template: Option<&Path>,
    settings: &Settings,
    converter: &dyn Converter,
) -> Result<BuildReport> {
    if !source.exists() {
        bail!("Input file not found: {}", source.display());
    }
    let template_path = template
        .map(Path::to_path_buf)
        .or_else(|| settings.template.clone())
        .with_context(|| {
            format!(
                "No template given: pass --template or set `template` in {}",
                SETTINGS_FILE
            )
        })?;
    if !template_path.exists() {
        bail!("Template file not found: {}", template_path.display());
    }

    // Step 1: Markdown to Pandoc JSON
    let markdown =
        fs::read(source).with_context(|| format!("Failed to read {}", source.display()))?;
    info!("Converting {} to the document AST", source.display());
    let json = converter
        .convert(&markdown, MARKDOWN, JSON)
        .with_context(|| format!("Failed to convert {}", source.display()))?;
    let mut document =
        PandocDocument::from_slice(&json).context("Converter produced invalid Pandoc JSON")?;

    // Step 2: Metadata and captions
    let article =
        ArticleMetadata::from_meta(&document.meta).context("Invalid article metadata")?;
    let captions = &settings.captions;
    let caption_count = document.substitute_classed_divs(&captions.class, |div| {
        render_fragment(&paragraph(Some(captions.style_id.as_str()), &div.text()))
    });
    info!("{} caption(s) converted", caption_count);

    // Step 3: AST to DOCX
    let json = document.to_json().context("Failed to serialize the document AST")?;
    let docx = converter
        .convert(json.as_bytes(), JSON, DOCX)
        .context("Failed to convert the document AST to DOCX")?;
    let converted =
        Package::from_bytes(&docx).context("Converter produced an invalid DOCX package")?;

    // Step 4: Merge into the template and fill the metadata
    let mut package = Package::open(&template_path)
        .with_context(|| format!("Failed to open template: {}", template_path.display()))?;
    let merge = StyledTemplateSubstitution::new(settings.merge.clone())
        .perform(&converted, &mut package)
        .with_context(|| {
            format!(
                "Failed to merge {} into {}",
                source.display(),
                template_path.display()
            )
        })?;
    let fill = MetadataFiller::new(&article, settings).fill(&mut package)?;

    // Step 5: Write
    package
        .write_to_file(target)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    info!("Wrote {}", target.display());

    Ok(BuildReport {
        captions: caption_count,
        merge,
        fill,
    })
}
