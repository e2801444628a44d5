use pulldown_cmark::{
    Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd,
};

use crate::attrs::{self, Attributes};
use crate::block::{self, Align, Block, List, ListItem, Span, Style};
use crate::slug::{SlugSet, slugify};

/// Marker paragraph replaced by a table of contents.
const TOC_MARKER: &str = "[TOC]";

/// Parse markdown text (front matter already removed) into a list of
/// blocks, with an anchor id on every heading.
pub fn parse(markdown: &str) -> Vec<Block> {
    let mut blocks = parse_blocks(markdown);
    assign_heading_ids(&mut blocks);
    blocks
}

fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    let parser = Parser::new_ext(markdown, options);
    let mut blocks = Vec::new();
    let mut state = ParseState::default();

    for event in parser {
        process_event(event, &mut state, &mut blocks);
    }
    blocks
}

#[derive(Default)]
struct ParseState {
    // Current inline content being built
    spans: Vec<Span>,
    // Nested span buffers for formatting, links and images
    span_stack: Vec<Vec<Span>>,
    // Link/image destinations waiting for their closing tag
    target_stack: Vec<(String, String)>,

    // Current heading (if in a heading)
    heading: Option<(u8, Attributes)>,

    // Code block state
    in_code_block: bool,
    code_language: Option<String>,
    code_content: String,

    // Raw HTML block state
    in_html_block: bool,
    html_content: String,

    // Open quotes and lists, innermost last
    containers: Vec<Container>,

    // Table state
    in_table: bool,
    table_alignments: Vec<Align>,
    table_headers: Vec<Vec<Span>>,
    table_rows: Vec<Vec<Vec<Span>>>,
    current_row: Vec<Vec<Span>>,
    in_table_head: bool,
}

enum Container {
    Quote(Vec<Block>),
    List(ListBuilder),
}

struct ListBuilder {
    start: Option<u64>,
    items: Vec<ListItem>,
    current_item_spans: Vec<Span>,
    current_item_children: Vec<Block>,
    current_item_checked: Option<bool>,
}

/// Add a finished block to the innermost open container.
fn push_block(state: &mut ParseState, blocks: &mut Vec<Block>, block: Block) {
    match state.containers.last_mut() {
        Some(Container::Quote(children)) => children.push(block),
        Some(Container::List(list)) => list.current_item_children.push(block),
        None => blocks.push(block),
    }
}

/// Move loose inline text of a tight list item into the item before a
/// block child starts.
fn flush_item_spans(state: &mut ParseState) {
    if let Some(Container::List(list)) = state.containers.last_mut() {
        let pending = std::mem::take(&mut state.spans);
        append_item_text(list, pending);
    }
}

fn append_item_text(list: &mut ListBuilder, spans: Vec<Span>) {
    let spans = finish_spans(spans);
    if spans.is_empty() {
        return;
    }
    if !list.current_item_spans.is_empty() {
        list.current_item_spans.push(Span::LineBreak);
    }
    list.current_item_spans.extend(spans);
}

/// Open a nested span buffer (bold, italic, link...).
fn open_inline(state: &mut ParseState) {
    state.span_stack.push(std::mem::take(&mut state.spans));
}

/// Close the innermost span buffer, wrapping its content with `wrap`.
fn close_inline(state: &mut ParseState, wrap: impl FnOnce(Vec<Span>) -> Span) {
    let inner = finish_spans(std::mem::take(&mut state.spans));
    if let Some(mut parent) = state.span_stack.pop() {
        parent.push(wrap(inner));
        state.spans = parent;
    }
}

fn process_event(event: Event, state: &mut ParseState, blocks: &mut Vec<Block>) {
    match event {
        // Headings
        Event::Start(Tag::Heading {
            level,
            id,
            classes,
            attrs,
        }) => {
            let attrs = Attributes::from_heading(
                id.as_deref(),
                classes.into_iter().map(|c| c.into_string()),
                attrs
                    .into_iter()
                    .map(|(k, v)| (k.into_string(), v.map(|v| v.into_string()))),
            );
            flush_item_spans(state);
            state.heading = Some((heading_level_to_u8(level), attrs));
        }
        Event::End(TagEnd::Heading(_)) => {
            if let Some((level, attrs)) = state.heading.take() {
                let content = finish_spans(trim_trailing_space(std::mem::take(&mut state.spans)));
                push_block(
                    state,
                    blocks,
                    Block::Heading {
                        level,
                        id: String::new(),
                        attrs,
                        content,
                    },
                );
            }
        }

        // Paragraphs
        Event::Start(Tag::Paragraph) => {}
        Event::End(TagEnd::Paragraph) => {
            let content = std::mem::take(&mut state.spans);
            if content.is_empty() || state.in_table {
                return;
            }
            // If we're in a list item, add to that instead
            if let Some(Container::List(list)) = state.containers.last_mut() {
                append_item_text(list, content);
                return;
            }
            if block::plain_text(&content).trim() == TOC_MARKER
                && content.iter().all(|s| matches!(s, Span::Text(_)))
            {
                push_block(state, blocks, Block::Toc);
                return;
            }
            let (content, attrs) = split_paragraph_attrs(content);
            let content = finish_spans(content);
            if !content.is_empty() || !attrs.is_empty() {
                push_block(state, blocks, Block::Paragraph { attrs, content });
            }
        }

        // Text content
        Event::Text(text) => {
            if state.in_code_block {
                state.code_content.push_str(&text);
            } else if state.in_html_block {
                state.html_content.push_str(&text);
            } else {
                state.spans.push(Span::Text(text.into_string()));
            }
        }

        // Inline code
        Event::Code(code) => {
            state.spans.push(Span::Code(code.into_string()));
        }

        // Bold, italic, strikethrough
        Event::Start(Tag::Strong) | Event::Start(Tag::Emphasis) | Event::Start(Tag::Strikethrough) => {
            open_inline(state);
        }
        Event::End(TagEnd::Strong) => close_inline(state, |c| Span::styled(Style::Bold, c)),
        Event::End(TagEnd::Emphasis) => close_inline(state, |c| Span::styled(Style::Italic, c)),
        Event::End(TagEnd::Strikethrough) => {
            close_inline(state, |c| Span::styled(Style::Strike, c))
        }

        // Links and images
        Event::Start(Tag::Link {
            dest_url, title, ..
        })
        | Event::Start(Tag::Image {
            dest_url, title, ..
        }) => {
            state
                .target_stack
                .push((dest_url.into_string(), title.into_string()));
            open_inline(state);
        }
        Event::End(TagEnd::Link) => {
            let (url, title) = state.target_stack.pop().unwrap_or_default();
            close_inline(state, |content| Span::Link {
                url,
                title,
                attrs: Attributes::default(),
                content,
            });
        }
        Event::End(TagEnd::Image) => {
            let (url, title) = state.target_stack.pop().unwrap_or_default();
            close_inline(state, |alt| Span::Image {
                url,
                title,
                attrs: Attributes::default(),
                alt,
            });
        }

        // Code blocks
        Event::Start(Tag::CodeBlock(kind)) => {
            flush_item_spans(state);
            state.in_code_block = true;
            state.code_language = match kind {
                CodeBlockKind::Fenced(info) => info
                    .split_whitespace()
                    .next()
                    .map(|lang| lang.to_string()),
                CodeBlockKind::Indented => None,
            };
            state.code_content.clear();
        }
        Event::End(TagEnd::CodeBlock) => {
            state.in_code_block = false;
            let content = std::mem::take(&mut state.code_content);
            let language = state.code_language.take();
            push_block(state, blocks, Block::CodeBlock { language, content });
        }

        // Raw HTML
        Event::Start(Tag::HtmlBlock) => {
            flush_item_spans(state);
            state.in_html_block = true;
            state.html_content.clear();
        }
        Event::End(TagEnd::HtmlBlock) => {
            state.in_html_block = false;
            let html = std::mem::take(&mut state.html_content);
            match MarkdownSection::find(&html) {
                Some(section) => {
                    push_block(state, blocks, Block::Html(section.open));
                    for block in parse_blocks(section.inner) {
                        push_block(state, blocks, block);
                    }
                    if let Some(close) = section.close {
                        push_block(state, blocks, Block::Html(close.to_string()));
                    }
                }
                None => push_block(state, blocks, Block::Html(html)),
            }
        }
        Event::Html(html) => {
            if state.in_html_block {
                state.html_content.push_str(&html);
            } else {
                state.spans.push(Span::Html(html.into_string()));
            }
        }
        Event::InlineHtml(html) => {
            state.spans.push(Span::Html(html.into_string()));
        }

        // Block quotes
        Event::Start(Tag::BlockQuote(_)) => {
            flush_item_spans(state);
            state.containers.push(Container::Quote(Vec::new()));
        }
        Event::End(TagEnd::BlockQuote(_)) => {
            if let Some(Container::Quote(children)) = state.containers.pop() {
                push_block(state, blocks, Block::Quote(children));
            }
        }

        // Lists
        Event::Start(Tag::List(start)) => {
            flush_item_spans(state);
            state.containers.push(Container::List(ListBuilder {
                start,
                items: Vec::new(),
                current_item_spans: Vec::new(),
                current_item_children: Vec::new(),
                current_item_checked: None,
            }));
        }
        Event::End(TagEnd::List(_)) => {
            if let Some(Container::List(list_builder)) = state.containers.pop() {
                let list = List {
                    start: list_builder.start,
                    items: list_builder.items,
                };
                // Nested lists land in the enclosing item's children
                push_block(state, blocks, Block::List(list));
            }
        }

        Event::Start(Tag::Item) => {
            if let Some(Container::List(list)) = state.containers.last_mut() {
                list.current_item_spans.clear();
                list.current_item_children.clear();
                list.current_item_checked = None;
            }
        }
        Event::End(TagEnd::Item) => {
            // Collect any remaining spans
            let remaining = std::mem::take(&mut state.spans);

            if let Some(Container::List(list)) = state.containers.last_mut() {
                append_item_text(list, remaining);
                let content = trim_trailing_space(std::mem::take(&mut list.current_item_spans));
                let children = std::mem::take(&mut list.current_item_children);
                let checked = list.current_item_checked.take();
                list.items.push(ListItem {
                    content,
                    children,
                    checked,
                });
            }
        }

        // Task list checkboxes
        Event::TaskListMarker(checked) => {
            if let Some(Container::List(list)) = state.containers.last_mut() {
                list.current_item_checked = Some(checked);
            }
        }

        // Tables
        Event::Start(Tag::Table(alignments)) => {
            flush_item_spans(state);
            state.in_table = true;
            state.table_alignments = alignments.into_iter().map(convert_alignment).collect();
            state.table_headers.clear();
            state.table_rows.clear();
        }
        Event::End(TagEnd::Table) => {
            state.in_table = false;
            let alignments = std::mem::take(&mut state.table_alignments);
            let headers = std::mem::take(&mut state.table_headers);
            let rows = std::mem::take(&mut state.table_rows);
            push_block(
                state,
                blocks,
                Block::Table {
                    alignments,
                    headers,
                    rows,
                },
            );
        }

        Event::Start(Tag::TableHead) => {
            state.in_table_head = true;
            state.current_row.clear();
        }
        Event::End(TagEnd::TableHead) => {
            state.in_table_head = false;
            state.table_headers = std::mem::take(&mut state.current_row);
        }

        Event::Start(Tag::TableRow) => {
            state.current_row.clear();
        }
        Event::End(TagEnd::TableRow) => {
            if !state.in_table_head {
                let row = std::mem::take(&mut state.current_row);
                state.table_rows.push(row);
            }
        }

        Event::Start(Tag::TableCell) => {
            state.spans.clear();
        }
        Event::End(TagEnd::TableCell) => {
            let cell_content = finish_spans(std::mem::take(&mut state.spans));
            state.current_row.push(cell_content);
        }

        // Horizontal rule
        Event::Rule => {
            flush_item_spans(state);
            push_block(state, blocks, Block::Rule);
        }

        // Soft/hard breaks
        Event::SoftBreak => {
            state.spans.push(Span::SoftBreak);
        }
        Event::HardBreak => {
            state.spans.push(Span::LineBreak);
        }

        // Ignore other events
        _ => {}
    }
}

/// Peel an attribute list written on the last line of a paragraph.
fn split_paragraph_attrs(mut content: Vec<Span>) -> (Vec<Span>, Attributes) {
    let tail_start = content
        .iter()
        .rposition(|s| !matches!(s, Span::Text(_)))
        .map_or(0, |i| i + 1);
    // The list has to sit on a line of its own
    if tail_start == 0 || !matches!(content[tail_start - 1], Span::SoftBreak | Span::LineBreak) {
        return (content, Attributes::default());
    }
    let tail: String = content[tail_start..]
        .iter()
        .filter_map(|s| match s {
            Span::Text(t) => Some(t.as_str()),
            _ => None,
        })
        .collect();

    let Some(attrs) = attrs::parse_line(&tail) else {
        return (content, Attributes::default());
    };
    content.truncate(tail_start);
    (trim_trailing_space(content), attrs)
}

/// Join adjacent text spans, then hand an attribute list that opens the
/// text after an element (`*word*{: .hl}`) to that element.
fn finish_spans(spans: Vec<Span>) -> Vec<Span> {
    let mut out: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match (out.last_mut(), span) {
            (Some(Span::Text(prev)), Span::Text(text)) => prev.push_str(&text),
            (_, span) => out.push(span),
        }
    }

    let mut i = 1;
    while i < out.len() {
        let Span::Text(text) = &out[i] else {
            i += 1;
            continue;
        };
        let Some((attrs, rest)) = attrs::split_leading(text) else {
            i += 1;
            continue;
        };
        let rest = rest.to_string();
        let Some(slot) = out[i - 1].attrs_mut() else {
            i += 1;
            continue;
        };
        slot.merge(attrs);
        if rest.is_empty() {
            out.remove(i);
        } else {
            out[i] = Span::Text(rest);
            i += 1;
        }
    }
    out
}

/// An HTML block whose opening tag asks for its content to be read as
/// Markdown (`markdown="1"` or `markdown="block"`).
struct MarkdownSection<'a> {
    /// Opening tag with the `markdown` attribute removed.
    open: String,
    inner: &'a str,
    /// Closing tag, when the block ends with it.
    close: Option<&'a str>,
}

impl<'a> MarkdownSection<'a> {
    fn find(html: &'a str) -> Option<Self> {
        let html = html.trim_end();
        let (first, rest) = html.split_once('\n').unwrap_or((html, ""));
        let tag = first.trim_end().strip_prefix('<')?.strip_suffix('>')?;
        let name_len = tag
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(tag.len());
        if name_len == 0 || !tag.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return None;
        }
        let (name, attributes) = tag.split_at(name_len);
        let attributes = attributes.strip_suffix('/').unwrap_or(attributes);
        let remaining = strip_markdown_attribute(attributes)?;

        let closing = format!("</{name}>");
        let (inner, close) = match rest.len().checked_sub(closing.len()) {
            Some(at)
                if rest.is_char_boundary(at) && rest[at..].eq_ignore_ascii_case(&closing) =>
            {
                (&rest[..at], Some(&rest[at..]))
            }
            _ => (rest, None),
        };

        Some(MarkdownSection {
            open: format!("<{name}{remaining}>"),
            inner,
            close,
        })
    }
}

/// Remove a `markdown="1"`/`markdown="block"` attribute, returning the
/// other attributes, or `None` if there is no such attribute.
fn strip_markdown_attribute(attributes: &str) -> Option<String> {
    let mut search = 0;
    while let Some(found) = attributes[search..].find("markdown=") {
        let start = search + found;
        search = start + "markdown=".len();
        if !attributes[..start].ends_with(char::is_whitespace) {
            continue;
        }
        let value_src = &attributes[search..];
        let (value, len) = match value_src.chars().next() {
            Some(q @ ('"' | '\'')) => {
                let end = value_src[1..].find(q)?;
                (&value_src[1..1 + end], end + 2)
            }
            _ => {
                let end = value_src
                    .find(char::is_whitespace)
                    .unwrap_or(value_src.len());
                (&value_src[..end], end)
            }
        };
        if value != "1" && value != "block" {
            return None;
        }
        let before = attributes[..start].trim_end();
        let after = &attributes[search + len..];
        return Some(format!("{before}{after}"));
    }
    None
}

/// Drop trailing soft breaks left behind after stripping markers.
fn trim_trailing_space(mut spans: Vec<Span>) -> Vec<Span> {
    while matches!(spans.last(), Some(Span::SoftBreak | Span::LineBreak)) {
        spans.pop();
    }
    spans
}

/// Give every heading a unique anchor id. Explicit ids are reserved first
/// so generated slugs never collide with them.
fn assign_heading_ids(blocks: &mut [Block]) {
    let mut slugs = SlugSet::default();
    block::for_each_heading_mut(blocks, &mut |heading| {
        if let Block::Heading { attrs, .. } = heading {
            if let Some(id) = &attrs.id {
                slugs.reserve(id);
            }
        }
    });
    block::for_each_heading_mut(blocks, &mut |heading| {
        if let Block::Heading {
            id, attrs, content, ..
        } = heading
        {
            *id = match &attrs.id {
                Some(explicit) => explicit.clone(),
                None => slugs.unique(slugify(&block::plain_text(content))),
            };
        }
    });
}

fn convert_alignment(alignment: Alignment) -> Align {
    match alignment {
        Alignment::None => Align::None,
        Alignment::Left => Align::Left,
        Alignment::Center => Align::Center,
        Alignment::Right => Align::Right,
    }
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
