//! The report stylesheet, in its CSS form for the HTML document and its
//! Typst form for the PDF.

use crate::config::Config;
use crate::typst::escape_string;

const STYLESHEET: &str = include_str!("report.css");

const PAGE_FOOTER: &str = "\"Page \" counter(page) \" of \" counter(pages)";

/// The CSS stylesheet with settings filled in.
pub fn stylesheet(config: &Config) -> String {
    let footer = if config.page.numbers { PAGE_FOOTER } else { "none" };
    let decoration = if config.links.underline { "underline" } else { "none" };
    STYLESHEET
        .replace("{{running-header}}", &css_string(&config.document.header))
        .replace("{{page-footer}}", footer)
        .replace("{{link-color}}", &config.links.color)
        .replace("{{link-decoration}}", decoration)
}

/// Escape text for use inside a double-quoted CSS string.
fn css_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '"' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' => out.push_str("\\A "),
            _ => out.push(ch),
        }
    }
    out
}

/// Typst set/show rules mirroring the stylesheet: A4 with 2cm/2.5cm
/// margins, running header from page two, page counter footer, and the
/// heading, code, table, quote, rule and link styling, plus the summary
/// box, cover and closing-line helpers the body calls.
pub fn typst_preamble(config: &Config) -> String {
    let mut out = String::new();
    let title = escape_string(&config.document.title);
    let header = escape_string(&config.document.header);
    let link_color = escape_string(&config.links.color);

    out.push_str(&format!("#set document(title: \"{title}\")\n"));

    out.push_str("#set page(\n  paper: \"a4\",\n  margin: (x: 2.5cm, y: 2cm),\n");
    out.push_str(&format!(
        "  header: context {{\n    if counter(page).get().first() > 1 {{\n      align(center, text(size: 9pt, fill: rgb(\"#666666\"), \"{header}\"))\n    }}\n  }},\n"
    ));
    if config.page.numbers {
        out.push_str(
            "  footer: context align(center, text(size: 9pt, fill: rgb(\"#666666\"))[Page #counter(page).display() of #counter(page).final().first()]),\n",
        );
    } else {
        out.push_str("  footer: none,\n");
    }
    out.push_str(")\n");

    out.push_str(concat!(
        "#set text(font: (\"Helvetica Neue\", \"Helvetica\", \"Arial\", \"Libertinus Serif\"), size: 11pt, fill: rgb(\"#333333\"), lang: \"en\", hyphenate: true)\n",
        "#set par(justify: true, leading: 0.8em, spacing: 12pt, linebreaks: \"optimized\")\n",
        "#set list(indent: 6pt, body-indent: 6pt)\n",
        "#set enum(indent: 6pt, body-indent: 6pt)\n",
        "#set line(stroke: 2pt + rgb(\"#e2e8f0\"))\n",
        "\n",
        "#show heading.where(level: 1): it => {\n",
        "  set align(center)\n",
        "  set text(size: 24pt, weight: \"bold\", fill: rgb(\"#1a365d\"))\n",
        "  block(width: 100%, inset: (bottom: 12pt), stroke: (bottom: 3pt + rgb(\"#2c5282\")), above: 0pt, below: 24pt, sticky: true, it.body)\n",
        "}\n",
        "#show heading.where(level: 2): it => {\n",
        "  set text(size: 16pt, weight: \"bold\", fill: rgb(\"#2c5282\"))\n",
        "  block(width: 100%, inset: (bottom: 8pt), stroke: (bottom: 1.5pt + rgb(\"#4299e1\")), above: 32pt, below: 16pt, sticky: true, it.body)\n",
        "}\n",
        "#show heading.where(level: 3): it => {\n",
        "  set text(size: 13pt, weight: \"bold\", fill: rgb(\"#2d3748\"))\n",
        "  block(above: 24pt, below: 12pt, sticky: true, it.body)\n",
        "}\n",
        "#show heading.where(level: 4): it => {\n",
        "  set text(size: 11pt, weight: \"bold\", fill: rgb(\"#4a5568\"))\n",
        "  block(above: 20pt, below: 10pt, sticky: true, it.body)\n",
        "}\n",
        "#show strong: set text(fill: rgb(\"#1a365d\"))\n",
        "#show emph: set text(fill: rgb(\"#4a5568\"))\n",
        "\n",
        "#show raw: set text(font: (\"Monaco\", \"Menlo\", \"Consolas\", \"DejaVu Sans Mono\"), size: 9pt)\n",
        "#show raw.where(block: true): it => block(width: 100%, fill: rgb(\"#f7fafc\"), stroke: 1pt + rgb(\"#e2e8f0\"), radius: 6pt, inset: 16pt, above: 16pt, below: 16pt, it)\n",
        "#show raw.where(block: false): it => box(fill: rgb(\"#edf2f7\"), inset: (x: 4pt), outset: (y: 3pt), radius: 3pt, text(fill: rgb(\"#c53030\"), it))\n",
        "\n",
        "#set table(\n",
        "  stroke: 1pt + rgb(\"#e2e8f0\"),\n",
        "  inset: 10pt,\n",
        "  fill: (_, y) => if y == 0 { rgb(\"#2c5282\") } else if calc.even(y) { rgb(\"#f7fafc\") },\n",
        ")\n",
        "#show table.cell.where(y: 0): set text(fill: white, weight: \"bold\")\n",
        "#show table: set text(size: 10pt)\n",
        "#show table: set par(justify: false)\n",
        "\n",
        "#show quote.where(block: true): it => block(\n",
        "  width: 100%,\n",
        "  fill: rgb(\"#ebf8ff\"),\n",
        "  stroke: (left: 4pt + rgb(\"#4299e1\")),\n",
        "  radius: (right: 6pt),\n",
        "  inset: (x: 16pt, y: 12pt),\n",
        "  text(style: \"italic\", fill: rgb(\"#4a5568\"), it.body),\n",
        ")\n",
        "\n",
        "#let summary(body) = block(width: 100%, fill: rgb(\"#ebf8ff\"), stroke: (left: 4pt + rgb(\"#4299e1\")), radius: 6pt, inset: 16pt, body)\n",
        "#let cover(body) = block(width: 100%, above: 75pt, align(center, body))\n",
        "#let closing(body) = text(style: \"italic\", fill: rgb(\"#718096\"), body)\n",
    ));

    out.push_str(&format!("#show link: set text(fill: rgb(\"{link_color}\"))\n"));
    if config.links.underline {
        out.push_str("#show link: underline\n");
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stylesheet_fills_every_slot() {
        let css = stylesheet(&Config::default());
        assert!(!css.contains("{{"));
        assert!(css.contains(
            "content: \"Montreal Forced Aligner: Implementation and Analysis Report\";"
        ));
        assert!(css.contains("content: \"Page \" counter(page) \" of \" counter(pages);"));
        assert!(css.contains("color: #2c5282;\n    text-decoration: none;"));
        assert!(css.contains("size: A4;"));
        assert!(css.contains("@media print"));
        assert!(css.contains("h2:first-of-type + p,\nh2 + p:first-of-type {"));
        assert!(css.contains("p:last-of-type {\n    font-style: italic;"));
        assert!(css.contains(".cover-section {"));
    }

    #[test]
    fn stylesheet_is_stable_across_calls() {
        let config = Config::default();
        assert_eq!(stylesheet(&config), stylesheet(&config));
    }

    #[test]
    fn stylesheet_follows_settings() {
        let mut config = Config::default();
        config.document.header = "Say \"hi\"".to_string();
        config.page.numbers = false;
        config.links.underline = true;
        let css = stylesheet(&config);
        assert!(css.contains("content: \"Say \\\"hi\\\"\";"));
        assert!(css.contains("@bottom-center {\n        content: none;"));
        assert!(css.contains("text-decoration: underline;"));
    }

    #[test]
    fn preamble_carries_page_setup() {
        let preamble = typst_preamble(&Config::default());
        assert!(preamble.starts_with("#set document(title: \"MFA Forced Alignment Report\")\n"));
        assert!(preamble.contains("paper: \"a4\""));
        assert!(preamble.contains("margin: (x: 2.5cm, y: 2cm)"));
        assert!(preamble.contains("#counter(page).final().first()"));
        assert!(!preamble.contains("#show link: underline"));
        assert!(preamble.contains("#let summary(body) = block("));
        assert!(preamble.contains("#let closing(body) = text(style: \"italic\""));
    }

    #[test]
    fn preamble_without_page_numbers() {
        let mut config = Config::default();
        config.page.numbers = false;
        config.links.underline = true;
        let preamble = typst_preamble(&config);
        assert!(preamble.contains("footer: none,"));
        assert!(preamble.contains("#show link: underline\n"));
    }
}
