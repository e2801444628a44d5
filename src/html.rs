use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_text};

use crate::attrs::Attributes;
use crate::block::{self, Align, Block, List, Span, Style};
use crate::highlight;
use crate::toc::{self, TocEntry};

/// Render blocks to an HTML fragment (the document body).
pub fn blocks_to_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    let toc = if contains_toc(blocks) {
        toc::build(blocks)
    } else {
        Vec::new()
    };
    for block in blocks {
        emit_block(block, &toc, &mut out);
    }
    out
}

fn contains_toc(blocks: &[Block]) -> bool {
    blocks.iter().any(|block| match block {
        Block::Toc => true,
        Block::Quote(children) => contains_toc(children),
        Block::List(list) => list.items.iter().any(|item| contains_toc(&item.children)),
        _ => false,
    })
}

fn emit_block(block: &Block, toc: &[TocEntry], out: &mut String) {
    match block {
        Block::Heading {
            level,
            id,
            attrs,
            content,
        } => {
            out.push_str(&format!("<h{level} id=\"{}\"", encode_double_quoted_attribute(id)));
            push_classes_and_pairs(attrs, out);
            out.push('>');
            spans_to_html(content, out);
            out.push_str(&format!("</h{level}>\n"));
        }
        Block::Paragraph { attrs, content } => {
            out.push_str("<p");
            push_attrs(attrs, out);
            out.push('>');
            spans_to_html(content, out);
            out.push_str("</p>\n");
        }
        Block::CodeBlock { language, content } => {
            out.push_str("<div class=\"codehilite\"><pre><code");
            if let Some(lang) = language {
                out.push_str(&format!(
                    " class=\"language-{}\"",
                    encode_double_quoted_attribute(lang)
                ));
            }
            out.push('>');
            out.push_str(&highlight::code_to_html(content, language.as_deref()));
            out.push_str("</code></pre></div>\n");
        }
        Block::List(list) => list_to_html(list, toc, out),
        Block::Table {
            alignments,
            headers,
            rows,
        } => table_to_html(alignments, headers, rows, out),
        Block::Quote(children) => {
            out.push_str("<blockquote>\n");
            for child in children {
                emit_block(child, toc, out);
            }
            out.push_str("</blockquote>\n");
        }
        Block::Html(html) => {
            out.push_str(html);
            if !html.ends_with('\n') {
                out.push('\n');
            }
        }
        Block::Toc => {
            out.push_str("<div class=\"toc\">\n");
            toc_to_html(toc, out);
            out.push_str("</div>\n");
        }
        Block::Rule => out.push_str("<hr />\n"),
    }
}

fn push_attrs(attrs: &Attributes, out: &mut String) {
    if let Some(id) = &attrs.id {
        out.push_str(&format!(" id=\"{}\"", encode_double_quoted_attribute(id)));
    }
    push_classes_and_pairs(attrs, out);
}

fn push_classes_and_pairs(attrs: &Attributes, out: &mut String) {
    if !attrs.classes.is_empty() {
        out.push_str(&format!(
            " class=\"{}\"",
            encode_double_quoted_attribute(&attrs.classes.join(" "))
        ));
    }
    for (key, value) in &attrs.pairs {
        out.push_str(&format!(
            " {}=\"{}\"",
            encode_double_quoted_attribute(key),
            encode_double_quoted_attribute(value)
        ));
    }
}

fn list_to_html(list: &List, toc: &[TocEntry], out: &mut String) {
    let tag = match list.start {
        Some(1) => {
            out.push_str("<ol>\n");
            "ol"
        }
        Some(start) => {
            out.push_str(&format!("<ol start=\"{start}\">\n"));
            "ol"
        }
        None => {
            out.push_str("<ul>\n");
            "ul"
        }
    };

    for item in &list.items {
        out.push_str("<li>");
        match item.checked {
            Some(true) => out.push_str("<input type=\"checkbox\" disabled=\"\" checked=\"\" /> "),
            Some(false) => out.push_str("<input type=\"checkbox\" disabled=\"\" /> "),
            None => {}
        }
        spans_to_html(&item.content, out);
        if !item.children.is_empty() {
            out.push('\n');
            for child in &item.children {
                emit_block(child, toc, out);
            }
        }
        out.push_str("</li>\n");
    }

    out.push_str(&format!("</{tag}>\n"));
}

fn table_to_html(
    alignments: &[Align],
    headers: &[Vec<Span>],
    rows: &[Vec<Vec<Span>>],
    out: &mut String,
) {
    out.push_str("<table>\n<thead>\n<tr>\n");
    for (i, cell) in headers.iter().enumerate() {
        push_cell("th", alignments.get(i).copied(), cell, out);
    }
    out.push_str("</tr>\n</thead>\n<tbody>\n");
    for row in rows {
        out.push_str("<tr>\n");
        for (i, cell) in row.iter().enumerate() {
            push_cell("td", alignments.get(i).copied(), cell, out);
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n");
}

fn push_cell(tag: &str, align: Option<Align>, cell: &[Span], out: &mut String) {
    let style = match align {
        Some(Align::Left) => " style=\"text-align: left;\"",
        Some(Align::Center) => " style=\"text-align: center;\"",
        Some(Align::Right) => " style=\"text-align: right;\"",
        Some(Align::None) | None => "",
    };
    out.push_str(&format!("<{tag}{style}>"));
    spans_to_html(cell, out);
    out.push_str(&format!("</{tag}>\n"));
}

fn toc_to_html(entries: &[TocEntry], out: &mut String) {
    out.push_str("<ul>\n");
    for entry in entries {
        out.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            encode_double_quoted_attribute(&entry.id),
            encode_text(&entry.title)
        ));
        if !entry.children.is_empty() {
            out.push('\n');
            toc_to_html(&entry.children, out);
        }
        out.push_str("</li>\n");
    }
    out.push_str("</ul>\n");
}

fn spans_to_html(spans: &[Span], out: &mut String) {
    for span in spans {
        span_to_html(span, out);
    }
}

fn span_to_html(span: &Span, out: &mut String) {
    match span {
        Span::Text(text) => out.push_str(&encode_text(text)),
        Span::Styled {
            style,
            attrs,
            content,
        } => {
            let tag = match style {
                Style::Bold => "strong",
                Style::Italic => "em",
                Style::Strike => "del",
            };
            out.push_str(&format!("<{tag}"));
            push_attrs(attrs, out);
            out.push('>');
            spans_to_html(content, out);
            out.push_str(&format!("</{tag}>"));
        }
        Span::Code(text) => {
            out.push_str("<code>");
            out.push_str(&encode_text(text));
            out.push_str("</code>");
        }
        Span::Link {
            url,
            title,
            attrs,
            content,
        } => {
            out.push_str(&format!("<a href=\"{}\"", encode_double_quoted_attribute(url)));
            if !title.is_empty() {
                out.push_str(&format!(" title=\"{}\"", encode_double_quoted_attribute(title)));
            }
            push_attrs(attrs, out);
            out.push('>');
            spans_to_html(content, out);
            out.push_str("</a>");
        }
        Span::Image {
            url,
            title,
            attrs,
            alt,
        } => {
            out.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\"",
                encode_double_quoted_attribute(url),
                encode_double_quoted_attribute(&block::plain_text(alt))
            ));
            if !title.is_empty() {
                out.push_str(&format!(" title=\"{}\"", encode_double_quoted_attribute(title)));
            }
            push_attrs(attrs, out);
            out.push_str(" />");
        }
        Span::Html(html) => out.push_str(html),
        Span::SoftBreak => out.push('\n'),
        Span::LineBreak => out.push_str("<br />\n"),
    }
}

/// Reduce raw HTML to its text for outputs that cannot lay out markup.
/// Comments are dropped, `<br>` becomes a newline and entities are decoded.
pub(crate) fn html_to_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        text.push_str(&rest[..open]);
        let tag = &rest[open..];
        if tag.starts_with("<!--") {
            rest = match tag.find("-->") {
                Some(end) => &tag[end + 3..],
                None => "",
            };
            continue;
        }
        match tag.find('>') {
            Some(end) => {
                let name = tag[1..end]
                    .trim_start_matches('/')
                    .split(|c: char| c.is_whitespace() || c == '/')
                    .next()
                    .unwrap_or_default();
                if name.eq_ignore_ascii_case("br") {
                    text.push('\n');
                }
                rest = &tag[end + 1..];
            }
            None => {
                // Not a tag after all
                text.push_str(tag);
                rest = "";
            }
        }
    }
    text.push_str(rest);
    decode_html_entities(&text).into_owned()
}

#[cfg(test)]
mod tests {
    use crate::markdown_to_html;

    use super::html_to_text;

    #[test]
    fn heading_carries_anchor_id() {
        assert_eq!(
            markdown_to_html("# Hello World"),
            "<h1 id=\"hello-world\">Hello World</h1>\n"
        );
    }

    #[test]
    fn heading_attribute_list() {
        assert_eq!(
            markdown_to_html("## Setup {#install .step data-n=2}"),
            "<h2 id=\"install\" class=\"step\" data-n=\"2\">Setup</h2>\n"
        );
    }

    #[test]
    fn paragraph_attribute_list() {
        assert_eq!(
            markdown_to_html("Important.\n{: .note }"),
            "<p class=\"note\">Important.</p>\n"
        );
        assert_eq!(
            markdown_to_html("Important. {: .note }"),
            "<p>Important. {: .note }</p>\n"
        );
    }

    #[test]
    fn heading_attribute_list_with_glued_colon() {
        assert_eq!(
            markdown_to_html("## Setup {:#install}"),
            "<h2 id=\"install\">Setup</h2>\n"
        );
    }

    #[test]
    fn inline_attribute_lists() {
        assert_eq!(
            markdown_to_html("![chart](c.png){: width=\"50%\" }"),
            "<p><img src=\"c.png\" alt=\"chart\" width=\"50%\" /></p>\n"
        );
        assert_eq!(
            markdown_to_html("*word*{: .hl} here"),
            "<p><em class=\"hl\">word</em> here</p>\n"
        );
        assert_eq!(
            markdown_to_html("[docs](d.html){#ref}"),
            "<p><a href=\"d.html\" id=\"ref\">docs</a></p>\n"
        );
    }

    #[test]
    fn markdown_in_html_block() {
        assert_eq!(
            markdown_to_html("<div markdown=\"1\">\n**bold**\n</div>\n"),
            "<div>\n<p><strong>bold</strong></p>\n</div>\n"
        );
    }

    #[test]
    fn inline_formatting() {
        assert_eq!(
            markdown_to_html("**b** *i* ~~s~~ `a<b`"),
            "<p><strong>b</strong> <em>i</em> <del>s</del> <code>a&lt;b</code></p>\n"
        );
    }

    #[test]
    fn escapes_text() {
        assert_eq!(
            markdown_to_html("1 < 2 & 3 > 2"),
            "<p>1 &lt; 2 &amp; 3 &gt; 2</p>\n"
        );
    }

    #[test]
    fn fenced_code_block() {
        assert_eq!(
            markdown_to_html("```nosuchlang\nif a < b {}\n```"),
            "<div class=\"codehilite\"><pre><code class=\"language-nosuchlang\">if a &lt; b {}\n</code></pre></div>\n"
        );
    }

    #[test]
    fn fenced_code_is_highlighted() {
        let html = markdown_to_html("```rust\nfn main() {}\n```");
        assert!(html.starts_with(
            "<div class=\"codehilite\"><pre><code class=\"language-rust\"><span class=\"source rust\">"
        ));
        assert!(html.contains("fn</span>"));
        assert!(html.ends_with("</code></pre></div>\n"));
    }

    #[test]
    fn code_block_without_language() {
        assert_eq!(
            markdown_to_html("```\nplain\n```"),
            "<div class=\"codehilite\"><pre><code>plain\n</code></pre></div>\n"
        );
    }

    #[test]
    fn table_markup() {
        assert_eq!(
            markdown_to_html("| A | B |\n|---|:-:|\n| 1 | 2 |"),
            "<table>\n<thead>\n<tr>\n<th>A</th>\n<th style=\"text-align: center;\">B</th>\n</tr>\n</thead>\n<tbody>\n<tr>\n<td>1</td>\n<td style=\"text-align: center;\">2</td>\n</tr>\n</tbody>\n</table>\n"
        );
    }

    #[test]
    fn lists() {
        assert_eq!(
            markdown_to_html("- one\n  - two\n"),
            "<ul>\n<li>one\n<ul>\n<li>two</li>\n</ul>\n</li>\n</ul>\n"
        );
        assert_eq!(
            markdown_to_html("3. three\n4. four\n"),
            "<ol start=\"3\">\n<li>three</li>\n<li>four</li>\n</ol>\n"
        );
        assert_eq!(
            markdown_to_html("- [x] done\n"),
            "<ul>\n<li><input type=\"checkbox\" disabled=\"\" checked=\"\" /> done</li>\n</ul>\n"
        );
    }

    #[test]
    fn blockquote_and_rule() {
        assert_eq!(
            markdown_to_html("> quoted\n\n---\n"),
            "<blockquote>\n<p>quoted</p>\n</blockquote>\n<hr />\n"
        );
    }

    #[test]
    fn links_and_images() {
        assert_eq!(
            markdown_to_html("[a](https://x.org \"T\") ![pic](p.png)"),
            "<p><a href=\"https://x.org\" title=\"T\">a</a> <img src=\"p.png\" alt=\"pic\" /></p>\n"
        );
    }

    #[test]
    fn raw_html_passthrough() {
        assert_eq!(
            markdown_to_html("<div align=\"center\">\n<b>x</b>\n</div>\n\ntext <span>inline</span>"),
            "<div align=\"center\">\n<b>x</b>\n</div>\n<p>text <span>inline</span></p>\n"
        );
    }

    #[test]
    fn toc_marker_expands() {
        assert_eq!(
            markdown_to_html("[TOC]\n\n# One\n\n## Two\n"),
            "<div class=\"toc\">\n<ul>\n<li><a href=\"#one\">One</a>\n<ul>\n<li><a href=\"#two\">Two</a></li>\n</ul>\n</li>\n</ul>\n</div>\n<h1 id=\"one\">One</h1>\n<h2 id=\"two\">Two</h2>\n"
        );
    }

    #[test]
    fn sample_report_element_counts() {
        let md = "# Results\n\n| A | B |\n|---|---|\n| 1 | 2 |\n\n```python\nprint('x')\n```\n";
        let html = markdown_to_html(md);
        assert_eq!(html.matches("<table").count(), 1);
        assert_eq!(html.matches("<pre><code").count(), 1);
        assert_eq!(html.matches("<h1 id=").count(), 1);
    }

    #[test]
    fn malformed_table_renders_literally() {
        let html = markdown_to_html("| A | B |\n| 1 | 2 |\n");
        assert!(!html.contains("<table"));
        assert_eq!(html, "<p>| A | B |\n| 1 | 2 |</p>\n");
    }

    #[test]
    fn front_matter_is_not_rendered() {
        let html = markdown_to_html("title: X\nauthor: Y\n\n# Body\n");
        assert!(!html.contains("title"));
        assert!(!html.contains("X"));
        assert_eq!(html, "<h1 id=\"body\">Body</h1>\n");
    }

    #[test]
    fn empty_input() {
        assert_eq!(markdown_to_html(""), "");
    }

    #[test]
    fn text_from_html() {
        assert_eq!(
            html_to_text("<p>a &amp; b<br/>c</p><!-- note -->"),
            "a & b\nc"
        );
        assert_eq!(html_to_text("x < y"), "x < y");
    }
}
