//! External document converter
//!
//! Markdown is turned into a Pandoc JSON AST and the rewritten AST into a
//! DOCX package by an external program, normally `pandoc`.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use crate::settings::ConverterSettings;

/// Format name of the Pandoc JSON AST
pub const JSON: &str = "json";
/// Format name of Markdown input
pub const MARKDOWN: &str = "markdown";
/// Format name of DOCX output
pub const DOCX: &str = "docx";

/// Converts a document between two formats
pub trait Converter {
    /// Convert `input` from format `from` to format `to`
    fn convert(&self, input: &[u8], from: &str, to: &str) -> Result<Vec<u8>>;
}

/// Runs `pandoc` (or a compatible executable) as a subprocess
#[derive(Debug, Clone)]
pub struct PandocConverter {
    executable: PathBuf,
    args: Vec<String>,
}

impl PandocConverter {
    /// Converter running `executable`
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
        }
    }

    /// Converter configured from settings
    pub fn from_settings(settings: &ConverterSettings) -> Self {
        Self {
            executable: settings.executable.clone(),
            args: settings.args.clone(),
        }
    }

    fn command(&self, from: &str, to: &str) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .args(&self.args)
            .arg("--from")
            .arg(from)
            .arg("--to")
            .arg(to)
            .arg("--output")
            .arg("-");
        command
    }
}

impl Converter for PandocConverter {
    fn convert(&self, input: &[u8], from: &str, to: &str) -> Result<Vec<u8>> {
        debug!(
            "Running {} ({} -> {})",
            self.executable.display(),
            from,
            to
        );
        let mut child = self
            .command(from, to)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.executable.display()))?;

        // Feed stdin from a separate thread so a full stdout pipe cannot
        // block the write.
        let mut stdin = child
            .stdin
            .take()
            .context("Converter stdin is not available")?;
        let input = input.to_vec();
        let writer = thread::spawn(move || stdin.write_all(&input));

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to run {}", self.executable.display()))?;
        let written = writer
            .join()
            .map_err(|_| anyhow::anyhow!("Converter input thread panicked"))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            bail!(
                "{} exited with {} converting {} to {}: {}",
                self.executable.display(),
                output.status,
                from,
                to,
                stderr.trim()
            );
        }
        written.with_context(|| format!("Failed to write to {}", self.executable.display()))?;
        if !stderr.trim().is_empty() {
            warn!("{}: {}", self.executable.display(), stderr.trim());
        }
        Ok(output.stdout)
    }
}
