//! Token-level highlighting for fenced code in the HTML output.

use std::sync::LazyLock;

use html_escape::encode_text;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use tracing::debug;

/// Bundled grammars, loaded on first use.
static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// Render `code` as HTML with every token wrapped in a span carrying its
/// scope classes. Unknown or missing languages get plain escaped text.
pub fn code_to_html(code: &str, language: Option<&str>) -> String {
    let Some(lang) = language else {
        return encode_text(code).into_owned();
    };
    let Some(syntax) = SYNTAX_SET.find_syntax_by_token(lang) else {
        debug!("No grammar for '{lang}', code left plain");
        return encode_text(code).into_owned();
    };

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, ClassStyle::Spaced);
    for line in LinesWithEndings::from(code) {
        if let Err(e) = generator.parse_html_for_line_which_includes_newline(line) {
            debug!("Highlighting '{lang}' failed: {e}");
            return encode_text(code).into_owned();
        }
    }
    generator.finalize()
}
