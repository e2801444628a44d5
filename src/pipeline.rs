//! File-level pipeline: read the report, convert it, write the outputs.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};

/// Default input, relative to the working directory.
pub const DEFAULT_INPUT: &str = "REPORT.md";

/// One conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub input: PathBuf,
    /// PDF destination; overwritten without confirmation.
    pub output: PathBuf,
    /// Also write the standalone HTML document here.
    pub html: Option<PathBuf>,
}

impl Job {
    /// Job for `input`, writing the PDF next to it with a `.pdf` extension.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        let input = input.into();
        let output = input.with_extension("pdf");
        Self {
            input,
            output,
            html: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_html(mut self, html: impl Into<PathBuf>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Run the pipeline. The input is read in full before any output is
    /// opened, so a missing or undecodable input leaves existing files alone.
    pub fn run(&self, config: &Config) -> Result<()> {
        let markdown = read_source(&self.input)?;
        self.render(&markdown, config)
    }

    /// Convert already read Markdown and write the outputs.
    pub fn render(&self, markdown: &str, config: &Config) -> Result<()> {
        let conversion = crate::convert(markdown);

        if let Some(html_path) = &self.html {
            let document = crate::html_document(&conversion.html(), config);
            write_output(html_path, document.as_bytes())?;
            info!("Wrote HTML to {}", html_path.display());
        }

        let pdf = crate::conversion_to_pdf(&conversion, config)?;
        write_output(&self.output, &pdf)?;
        info!("Wrote {} bytes to {}", pdf.len(), self.output.display());
        Ok(())
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT)
    }
}

/// Read a UTF-8 Markdown file.
pub fn read_source(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => Error::InputNotFound {
            path: path.to_path_buf(),
        },
        _ => Error::ReadInput {
            path: path.to_path_buf(),
            source,
        },
    })?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    String::from_utf8(bytes).map_err(|source| Error::InputNotUtf8 {
        path: path.to_path_buf(),
        source,
    })
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).map_err(|source| Error::WriteOutput {
        path: path.to_path_buf(),
        source,
    })
}
