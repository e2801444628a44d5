use std::collections::HashSet;

use crate::block::{self, Align, Block, List, Span, Style};
use crate::html::html_to_text;

/// Lists with at most this many items (nested included) are kept on one page.
const KEEP_TOGETHER_ITEMS: usize = 5;
/// Code blocks with at most this many lines are kept on one page.
const KEEP_TOGETHER_LINES: usize = 25;
/// Tables with at most this many body rows are kept on one page.
const KEEP_TOGETHER_ROWS: usize = 15;

/// Class that centres a paragraph lower on the page, as on a cover.
const COVER_CLASS: &str = "cover-section";

/// Convert blocks to Typst markup (document body, no style preamble)
pub fn blocks_to_typst(blocks: &[Block]) -> String {
    let mut emitter = Emitter::new(blocks);
    emitter.emit_siblings(blocks);
    emitter.out
}

fn keeps_with_heading(next: &Block) -> bool {
    match next {
        Block::Paragraph { .. } => true,
        Block::List(list) => count_list_items(list) <= KEEP_TOGETHER_ITEMS,
        _ => false,
    }
}

/// Paragraph styling the stylesheet selects by position among siblings.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Role {
    /// Paragraph right after the first `h2` (or the first paragraph, when
    /// an `h2` precedes it): the summary box.
    summary: bool,
    /// Last paragraph among its siblings: the italic closing line.
    closing: bool,
}

fn paragraph_roles(blocks: &[Block]) -> Vec<Role> {
    let is_paragraph = |b: &Block| matches!(b, Block::Paragraph { .. });
    let is_h2 = |b: &Block| matches!(b, Block::Heading { level: 2, .. });

    let mut roles = vec![Role::default(); blocks.len()];
    if let Some(h) = blocks.iter().position(is_h2) {
        if blocks.get(h + 1).is_some_and(is_paragraph) {
            roles[h + 1].summary = true;
        }
    }
    if let Some(p) = blocks.iter().position(is_paragraph) {
        if p > 0 && is_h2(&blocks[p - 1]) {
            roles[p].summary = true;
        }
    }
    if let Some(p) = blocks.iter().rposition(is_paragraph) {
        roles[p].closing = true;
    }
    roles
}

struct Emitter {
    out: String,
    /// Heading ids usable as Typst labels; links may only target these.
    labels: HashSet<String>,
    /// Labels already placed, so duplicate explicit ids are attached once.
    placed: HashSet<String>,
}

impl Emitter {
    fn new(blocks: &[Block]) -> Self {
        let labels = block::headings(blocks)
            .into_iter()
            .map(|(_, id, _)| id)
            .filter(|id| is_label(id))
            .collect();
        Self {
            out: String::new(),
            labels,
            placed: HashSet::new(),
        }
    }

    fn emit_heading(&mut self, block: &Block) {
        if let Block::Heading {
            level, id, content, ..
        } = block
        {
            for _ in 0..*level {
                self.out.push('=');
            }
            self.out.push(' ');
            self.spans(content, true);
            if self.labels.contains(id) && self.placed.insert(id.clone()) {
                self.out.push_str(&format!(" <{id}>"));
            }
            self.out.push('\n');
            self.out.push('\n');
        }
    }

    /// Emit a run of sibling blocks (the body, or a quote's children).
    fn emit_siblings(&mut self, blocks: &[Block]) {
        let roles = paragraph_roles(blocks);
        let mut i = 0;
        while i < blocks.len() {
            let block = &blocks[i];
            match block {
                Block::Heading { .. }
                    if i + 1 < blocks.len() && keeps_with_heading(&blocks[i + 1]) =>
                {
                    // Keep heading with its first paragraph or short list
                    self.out.push_str("#block(breakable: false)[\n");
                    self.emit_heading(block);
                    i += 1;
                    self.emit_block_as(&blocks[i], roles[i]);
                    self.out.push_str("]\n\n");
                }
                _ => self.emit_block_as(block, roles[i]),
            }
            i += 1;
        }
    }

    fn emit_block(&mut self, block: &Block) {
        self.emit_block_as(block, Role::default());
    }

    fn emit_block_as(&mut self, block: &Block, role: Role) {
        match block {
            Block::Heading { .. } => {
                self.emit_heading(block);
            }
            Block::Paragraph { attrs, content } => {
                let cover = attrs.classes.iter().any(|c| c == COVER_CLASS);
                let wrappers = [
                    (role.summary, "#summary["),
                    (cover, "#cover["),
                    (role.closing, "#closing["),
                ];
                let mut open = 0;
                for (_, call) in wrappers.iter().filter(|(on, _)| *on) {
                    self.out.push_str(call);
                    open += 1;
                }
                self.spans(content, false);
                for _ in 0..open {
                    self.out.push_str("];");
                }
                self.out.push('\n');
                self.out.push('\n');
            }
            Block::CodeBlock { language, content } => {
                let content = content.strip_suffix('\n').unwrap_or(content);
                let keep = content.lines().count() <= KEEP_TOGETHER_LINES;
                if keep {
                    self.out.push_str("#block(breakable: false)[\n");
                }
                self.out.push_str("#raw(block: true, ");
                if let Some(lang) = language {
                    self.out
                        .push_str(&format!("lang: \"{}\", ", escape_string(lang)));
                }
                self.out
                    .push_str(&format!("\"{}\")\n", escape_string(content)));
                if keep {
                    self.out.push_str("]\n");
                }
                self.out.push('\n');
            }
            Block::List(list) => {
                // Wrap list to keep together when small, allow breaks when large
                if count_list_items(list) <= KEEP_TOGETHER_ITEMS {
                    self.out.push_str("#block(breakable: false)[\n");
                    self.list(list, 0);
                    self.out.push_str("]\n\n");
                } else {
                    self.list(list, 0);
                    self.out.push('\n');
                }
            }
            Block::Table {
                alignments,
                headers,
                rows,
            } => {
                if rows.len() <= KEEP_TOGETHER_ROWS {
                    self.out.push_str("#block(breakable: false)[\n");
                    self.table(alignments, headers, rows);
                    self.out.push_str("]\n\n");
                } else {
                    self.table(alignments, headers, rows);
                    self.out.push('\n');
                }
            }
            Block::Quote(children) => {
                self.out.push_str("#quote(block: true)[\n");
                self.emit_siblings(children);
                self.out.push_str("]\n\n");
            }
            Block::Html(html) => {
                // The engine cannot lay out HTML; keep its text
                let text = html_to_text(html);
                let text = text.trim();
                if !text.is_empty() {
                    self.text(text, false);
                    self.out.push('\n');
                    self.out.push('\n');
                }
            }
            Block::Toc => {
                self.out.push_str("#outline(title: none)\n\n");
            }
            Block::Rule => {
                self.out.push_str("#line(length: 100%)\n\n");
            }
        }
    }

    fn spans(&mut self, spans: &[Span], single_line: bool) {
        for span in spans {
            self.span(span, single_line);
        }
    }

    fn span(&mut self, span: &Span, single_line: bool) {
        match span {
            Span::Text(text) => self.text(text, single_line),
            // Function form, since `*` and `_` markup does not close mid-word
            Span::Styled { style, content, .. } => {
                let func = match style {
                    Style::Bold => "strong",
                    Style::Italic => "emph",
                    Style::Strike => "strike",
                };
                self.call(func, content, single_line);
            }
            Span::Code(text) => {
                self.out
                    .push_str(&format!("#raw(\"{}\");", escape_string(text)));
            }
            Span::Link { url, content, .. } => {
                let target = match url.strip_prefix('#') {
                    // A label link needs a body; an empty one shows nothing
                    Some(anchor) if self.labels.contains(anchor) && content.is_empty() => return,
                    Some(anchor) if self.labels.contains(anchor) => format!("<{anchor}>"),
                    // Unknown anchors would fail to compile
                    Some(_) => {
                        self.spans(content, single_line);
                        return;
                    }
                    None if url.is_empty() => {
                        self.spans(content, single_line);
                        return;
                    }
                    None => format!("\"{}\"", escape_string(url)),
                };
                self.out.push_str(&format!("#link({target})"));
                if !content.is_empty() {
                    self.out.push('[');
                    self.spans(content, single_line);
                    self.out.push(']');
                }
                self.out.push(';');
            }
            // Images are not embedded; their alt text stands in
            Span::Image { alt, .. } => self.spans(alt, single_line),
            Span::Html(html) => {
                let text = html_to_text(html);
                self.text(&text, single_line);
            }
            Span::SoftBreak => self.out.push(' '),
            Span::LineBreak => self.line_break(single_line),
        }
    }

    fn call(&mut self, func: &str, inner: &[Span], single_line: bool) {
        self.out.push('#');
        self.out.push_str(func);
        self.out.push('[');
        self.spans(inner, single_line);
        self.out.push_str("];");
    }

    fn text(&mut self, text: &str, single_line: bool) {
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch.is_ascii_digit() && self.at_line_start() {
                // `2.` opening a line would start a numbered list
                self.out.push(ch);
                while let Some(digit) = chars.next_if(char::is_ascii_digit) {
                    self.out.push(digit);
                }
                if chars.next_if_eq(&'.').is_some() {
                    self.out.push_str("\\.");
                }
                continue;
            }
            // Escape special Typst characters
            match ch {
                '#' | '*' | '_' | '@' | '$' | '\\' | '`' | '<' | '>' | '[' | ']' | '~' | '/'
                | '=' | '-' | '+' => {
                    self.out.push('\\');
                    self.out.push(ch);
                }
                '\n' => self.line_break(single_line),
                '\r' => {}
                _ => self.out.push(ch),
            }
        }
    }

    fn at_line_start(&self) -> bool {
        matches!(
            self.out.trim_end_matches(' ').chars().next_back(),
            None | Some('\n' | '[')
        )
    }

    fn line_break(&mut self, single_line: bool) {
        if single_line {
            self.out.push(' ');
        } else {
            self.out.push_str(" \\\n");
        }
    }

    fn list(&mut self, list: &List, indent: usize) {
        let indent_str: String = "  ".repeat(indent);

        for (n, item) in list.items.iter().enumerate() {
            self.out.push_str(&indent_str);
            match list.start {
                // Explicit number on the first item; the rest continue from it
                Some(start) if n == 0 && start != 1 => self.out.push_str(&format!("{start}.")),
                Some(_) => self.out.push('+'),
                None => self.out.push('-'),
            }
            self.out.push(' ');
            match item.checked {
                Some(true) => self.out.push_str("☒ "),
                Some(false) => self.out.push_str("☐ "),
                None => {}
            }
            self.spans(&item.content, false);
            self.out.push('\n');

            for child in &item.children {
                if let Block::List(nested) = child {
                    self.list(nested, indent + 1);
                    continue;
                }
                // Other children are indented under the item
                let saved = std::mem::take(&mut self.out);
                self.emit_block(child);
                let rendered = std::mem::replace(&mut self.out, saved);
                let child_indent = "  ".repeat(indent + 1);
                for line in rendered.lines() {
                    if !line.is_empty() {
                        self.out.push_str(&child_indent);
                        self.out.push_str(line);
                    }
                    self.out.push('\n');
                }
            }
        }
    }

    fn table(&mut self, alignments: &[Align], headers: &[Vec<Span>], rows: &[Vec<Vec<Span>>]) {
        let col_count = headers.len();
        if col_count == 0 {
            return;
        }

        self.out.push_str("#table(\n");
        self.out.push_str(&format!("  columns: {},\n", col_count));

        if alignments.iter().any(|a| *a != Align::None) {
            let aligns: Vec<&str> = (0..col_count)
                .map(|i| match alignments.get(i) {
                    Some(Align::Left) => "left",
                    Some(Align::Center) => "center",
                    Some(Align::Right) => "right",
                    Some(Align::None) | None => "auto",
                })
                .collect();
            self.out
                .push_str(&format!("  align: ({}),\n", aligns.join(", ")));
        }

        // Header cells repeat on every page the table spans
        self.out.push_str("  table.header(");
        for (i, cell) in headers.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.cell(cell);
        }
        self.out.push_str("),\n");

        // Data rows, padded or cut to the header width
        let empty = Vec::new();
        for row in rows {
            self.out.push_str("  ");
            for i in 0..col_count {
                if i > 0 {
                    self.out.push(' ');
                }
                self.cell(row.get(i).unwrap_or(&empty));
                self.out.push(',');
            }
            self.out.push('\n');
        }

        self.out.push_str(")\n");
    }

    fn cell(&mut self, cell: &[Span]) {
        self.out.push('[');
        self.spans(cell, false);
        self.out.push(']');
    }
}

fn count_list_items(list: &List) -> usize {
    let mut count = list.items.len();
    for item in &list.items {
        for child in &item.children {
            if let Block::List(nested) = child {
                count += count_list_items(nested);
            }
        }
    }
    count
}

/// Characters allowed in a `<label>` literal.
fn is_label(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

/// Escape text for a double-quoted Typst string literal.
pub(crate) fn escape_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::markdown_to_typst;

    /// Typst for `md` as a paragraph that is not the last one.
    fn inline(md: &str) -> String {
        let out = markdown_to_typst(&format!("{md}\n\nend"));
        out.strip_suffix("#closing[end];\n\n").unwrap().to_string()
    }

    #[test]
    fn heading() {
        assert_eq!(markdown_to_typst("# Hello"), "= Hello <hello>\n\n");
    }

    #[test]
    fn heading_with_following_content() {
        // Heading should be grouped with following paragraph
        assert_eq!(
            markdown_to_typst("# Title\n\nSome text.\n\nMore."),
            "#block(breakable: false)[\n= Title <title>\n\nSome text.\n\n]\n\n#closing[More.];\n\n"
        );
    }

    #[test]
    fn heading_before_code_is_not_grouped() {
        assert_eq!(
            markdown_to_typst("## Run\n\n```\nx\n```"),
            "== Run <run>\n\n#block(breakable: false)[\n#raw(block: true, \"x\")\n]\n\n"
        );
    }

    #[test]
    fn paragraph() {
        assert_eq!(inline("Hello world"), "Hello world\n\n");
    }

    #[test]
    fn last_paragraph_is_the_closing_line() {
        assert_eq!(
            markdown_to_typst("First.\n\nBy the authors."),
            "First.\n\n#closing[By the authors.];\n\n"
        );
    }

    #[test]
    fn paragraph_after_first_h2_is_the_summary() {
        assert_eq!(
            markdown_to_typst("# Report\n\n## Summary\n\nAll good.\n\n## Next\n\nMore.\n\nEnd."),
            "= Report <report>\n\n#block(breakable: false)[\n== Summary <summary>\n\n#summary[All good.];\n\n]\n\n#block(breakable: false)[\n== Next <next>\n\nMore.\n\n]\n\n#closing[End.];\n\n"
        );
    }

    #[test]
    fn cover_class_centres_paragraph() {
        assert_eq!(
            inline("Prepared for the team\n{: .cover-section}"),
            "#cover[Prepared for the team];\n\n"
        );
    }

    #[test]
    fn bold_and_italic() {
        assert_eq!(inline("**bold**"), "#strong[bold];\n\n");
        assert_eq!(inline("*italic*"), "#emph[italic];\n\n");
        assert_eq!(inline("***both***"), "#emph[#strong[both];];\n\n");
        assert_eq!(inline("**Note**s"), "#strong[Note];s\n\n");
        assert_eq!(inline("~~gone~~"), "#strike[gone];\n\n");
    }

    #[test]
    fn inline_code() {
        assert_eq!(inline("`say \"hi\"`"), "#raw(\"say \\\"hi\\\"\");\n\n");
    }

    #[test]
    fn code_block() {
        assert_eq!(
            markdown_to_typst("```rust\nlet x = 1;\nlet y = \"a\\b\";\n```"),
            "#block(breakable: false)[\n#raw(block: true, lang: \"rust\", \"let x = 1;\\nlet y = \\\"a\\\\b\\\";\")\n]\n\n"
        );
    }

    #[test]
    fn unordered_list() {
        assert_eq!(
            markdown_to_typst("- one\n- two"),
            "#block(breakable: false)[\n- one\n- two\n]\n\n"
        );
    }

    #[test]
    fn ordered_list() {
        assert_eq!(
            markdown_to_typst("1. one\n2. two"),
            "#block(breakable: false)[\n+ one\n+ two\n]\n\n"
        );
        assert_eq!(
            markdown_to_typst("3. three\n4. four"),
            "#block(breakable: false)[\n3. three\n+ four\n]\n\n"
        );
    }

    #[test]
    fn nested_list_with_code() {
        assert_eq!(
            markdown_to_typst("- one\n  - inner\n- two\n\n  ```\n  x\n  ```\n"),
            "#block(breakable: false)[\n- one\n  - inner\n- two\n  #block(breakable: false)[\n  #raw(block: true, \"x\")\n  ]\n\n]\n\n"
        );
    }

    #[test]
    fn task_list() {
        assert_eq!(
            markdown_to_typst("- [x] done\n- [ ] open"),
            "#block(breakable: false)[\n- ☒ done\n- ☐ open\n]\n\n"
        );
    }

    #[test]
    fn hard_break() {
        assert_eq!(inline("line one  \nline two"), "line one \\\nline two\n\n");
    }

    #[test]
    fn number_after_hard_break_is_not_a_list() {
        assert_eq!(inline("a  \n2. b"), "a \\\n2\\. b\n\n");
        assert_eq!(inline("2\\. b"), "2\\. b\n\n");
        assert_eq!(inline("In 2024."), "In 2024.\n\n");
        assert_eq!(
            markdown_to_typst("Last  \n3. x"),
            "#closing[Last \\\n3\\. x];\n\n"
        );
    }

    #[test]
    fn escapes_special_chars() {
        assert_eq!(inline("a * b"), "a \\* b\n\n");
        assert_eq!(inline("a # b"), "a \\# b\n\n");
        assert_eq!(inline("a_b"), "a\\_b\n\n");
        assert_eq!(inline("see https://x.org"), "see https:\\/\\/x.org\n\n");
        assert_eq!(inline("x = 1 - 2"), "x \\= 1 \\- 2\n\n");
    }

    #[test]
    fn table() {
        let md = "| A | B |\n|---|---|\n| 1 | 2 |";
        let expected = "#block(breakable: false)[\n#table(\n  columns: 2,\n  table.header([A], [B]),\n  [1], [2],\n)\n]\n\n";
        assert_eq!(markdown_to_typst(md), expected);
    }

    #[test]
    fn table_alignment() {
        let md = "| A | B |\n|:-:|---|\n| 1 | 2 |";
        assert!(markdown_to_typst(md).contains("  align: (center, auto),\n"));
    }

    #[test]
    fn horizontal_rule() {
        assert_eq!(markdown_to_typst("---"), "#line(length: 100%)\n\n");
    }

    #[test]
    fn internal_link_targets_heading_label() {
        assert_eq!(
            markdown_to_typst("# Overview\n\n[Link to overview](#overview)"),
            "#block(breakable: false)[\n= Overview <overview>\n\n#closing[#link(<overview>)[Link to overview];];\n\n]\n\n"
        );
    }

    #[test]
    fn empty_internal_link_is_dropped() {
        assert_eq!(
            markdown_to_typst("# Results\n\nSee [](#results)."),
            "#block(breakable: false)[\n= Results <results>\n\n#closing[See .];\n\n]\n\n"
        );
    }

    #[test]
    fn unknown_anchor_renders_plain_text() {
        assert_eq!(inline("[Go](#missing)"), "Go\n\n");
    }

    #[test]
    fn external_link() {
        assert_eq!(
            inline("[site](https://x.org)"),
            "#link(\"https://x.org\")[site];\n\n"
        );
    }

    #[test]
    fn duplicate_explicit_ids_label_once() {
        assert_eq!(
            markdown_to_typst("## A {#same}\n\n## B {#same}"),
            "== A <same>\n\n== B\n\n"
        );
    }

    #[test]
    fn toc_marker() {
        assert_eq!(markdown_to_typst("[TOC]"), "#outline(title: none)\n\n");
    }

    #[test]
    fn html_block_keeps_text() {
        assert_eq!(
            markdown_to_typst("<div>\n<b>Hi</b> there<br>again\n</div>\n"),
            "Hi there \\\nagain\n\n"
        );
        assert_eq!(markdown_to_typst("<!-- hidden -->\n"), "");
    }

    #[test]
    fn markdown_in_html_block_is_rendered() {
        assert_eq!(
            markdown_to_typst("<div markdown=\"1\">\n**bold**\n</div>\n"),
            "#closing[#strong[bold];];\n\n"
        );
    }

    #[test]
    fn block_quote() {
        assert_eq!(
            markdown_to_typst("> quoted"),
            "#quote(block: true)[\n#closing[quoted];\n\n]\n\n"
        );
    }

    #[test]
    fn image_uses_alt_text() {
        assert_eq!(inline("![A chart](c.png)"), "A chart\n\n");
    }
}
