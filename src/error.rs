//! Error type for the report pipeline.
//!
//! Markdown itself never fails to convert; every variant here is either an
//! I/O problem at the edges of the pipeline or the PDF engine giving up.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // ── Input ─────────────────────────────────────────────────────────────
    /// Input Markdown file does not exist.
    #[error("input file not found: '{path}'")]
    InputNotFound { path: PathBuf },

    /// Input file was read but is not UTF-8 text.
    #[error("input file '{path}' is not valid UTF-8: {source}")]
    InputNotUtf8 {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// Any other failure opening or reading the input.
    #[error("failed to read '{path}': {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Settings ──────────────────────────────────────────────────────────
    #[error("failed to read config '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{path}': {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    // ── Rendering ─────────────────────────────────────────────────────────
    /// The Typst engine rejected the generated document.
    #[error("Typst compilation failed: {0}")]
    Compile(String),

    /// Layout succeeded but PDF export did not.
    #[error("PDF generation failed: {0}")]
    Export(String),

    // ── Output ────────────────────────────────────────────────────────────
    #[error("failed to write output file '{path}': {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
