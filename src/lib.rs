//! Turn a Markdown report into a styled, paginated PDF.
//!
//! The pipeline has three stages: read the source, convert Markdown to an
//! HTML body (tables, fenced code, heading anchors with `[TOC]`, front
//! matter, attribute lists, raw HTML), then render the same parsed blocks to
//! PDF through an embedded Typst engine styled like the report stylesheet.
//!
//! ```no_run
//! let html = reportpdf::markdown_to_html("# Results\n\nAll green.");
//! assert!(html.contains("<h1 id=\"results\">"));
//!
//! let pdf = reportpdf::markdown_to_pdf("# Results\n\nAll green.")?;
//! std::fs::write("REPORT.pdf", pdf)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod attrs;
mod block;
pub mod config;
mod error;
mod frontmatter;
mod highlight;
mod html;
mod parser;
pub mod pipeline;
mod slug;
mod style;
mod toc;
mod typst;

pub use attrs::Attributes;
pub use block::{Align, Block, List, ListItem, Span, Style};
pub use config::Config;
pub use error::{Error, Result};
pub use frontmatter::Metadata;
pub use pipeline::Job;
pub use style::{stylesheet, typst_preamble};
pub use toc::TocEntry;

use tracing::debug;
use typst_as_lib::TypstEngine;
use typst_as_lib::typst_kit_options::TypstKitFontOptions;
use typst_library::layout::PagedDocument;
use typst_pdf::PdfOptions;

/// A parsed report: front matter plus body blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// Front matter, consumed and kept out of the rendered body.
    pub metadata: Metadata,
    pub blocks: Vec<Block>,
}

impl Conversion {
    /// HTML fragment for the body.
    pub fn html(&self) -> String {
        html::blocks_to_html(&self.blocks)
    }

    /// Complete Typst source: style preamble followed by the body.
    pub fn typst(&self, config: &Config) -> String {
        let mut source = style::typst_preamble(config);
        source.push_str(&typst::blocks_to_typst(&self.blocks));
        source
    }

    /// Heading tree, as used for `[TOC]`.
    pub fn toc(&self) -> Vec<TocEntry> {
        toc::build(&self.blocks)
    }
}

/// Split off front matter and parse the rest of the document.
pub fn convert(markdown: &str) -> Conversion {
    let (metadata, body) = frontmatter::split(markdown);
    if !metadata.is_empty() {
        debug!("Front matter: {} keys", metadata.len());
    }
    let blocks = parser::parse(body);
    debug!("Parsed {} top-level blocks", blocks.len());
    Conversion { metadata, blocks }
}

/// Parse markdown text into a vector of blocks.
pub fn parse(markdown: &str) -> Vec<Block> {
    convert(markdown).blocks
}

/// Convert markdown to an HTML fragment. Never fails: anything that is not
/// valid structure is rendered as literal text.
pub fn markdown_to_html(markdown: &str) -> String {
    convert(markdown).html()
}

/// Wrap an HTML fragment in the standalone document shell with the
/// stylesheet embedded.
pub fn html_document(body: &str, config: &Config) -> String {
    let title = html_escape::encode_text(&config.document.title);
    let css = style::stylesheet(config);
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n    <meta charset=\"UTF-8\">\n    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n    <title>{title}</title>\n    <style>\n{css}    </style>\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

/// Convert markdown to Typst markup (body only, no style preamble).
pub fn markdown_to_typst(markdown: &str) -> String {
    typst::blocks_to_typst(&parse(markdown))
}

/// Convert markdown to a complete Typst document with custom config.
pub fn markdown_to_typst_with_config(markdown: &str, config: &Config) -> String {
    convert(markdown).typst(config)
}

/// Convert markdown to PDF bytes using default config.
pub fn markdown_to_pdf(markdown: &str) -> Result<Vec<u8>> {
    markdown_to_pdf_with_config(markdown, &Config::compiled_default())
}

/// Convert markdown to PDF bytes with custom config.
pub fn markdown_to_pdf_with_config(markdown: &str, config: &Config) -> Result<Vec<u8>> {
    conversion_to_pdf(&convert(markdown), config)
}

/// Render an already parsed report to PDF bytes.
pub fn conversion_to_pdf(conversion: &Conversion, config: &Config) -> Result<Vec<u8>> {
    let doc = compile_document(conversion.typst(config), config)?;

    typst_pdf::pdf(&doc, &PdfOptions::default()).map_err(|diagnostics| {
        let messages: Vec<String> = diagnostics.iter().map(|d| d.message.to_string()).collect();
        Error::Export(messages.join("; "))
    })
}

/// Compile Typst source to a paged document.
fn compile_document(source: String, config: &Config) -> Result<PagedDocument> {
    let font_options = TypstKitFontOptions::new()
        .include_embedded_fonts(true)
        .include_system_fonts(config.font.system);

    let engine = TypstEngine::builder()
        .main_file(source)
        .search_fonts_with(font_options)
        .build();

    let compiled = engine.compile();
    let output: std::result::Result<PagedDocument, _> = compiled.output;
    for warning in &compiled.warnings {
        debug!("Typst warning: {}", warning.message);
    }

    let doc = output.map_err(|e| Error::Compile(format!("{:?}", e)))?;
    debug!("Laid out {} pages", doc.pages.len());
    Ok(doc)
}
