use crate::attrs::Attributes;

/// Inline formatting that wraps other spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Bold,
    Italic,
    Strike,
}

/// Inline text spans with formatting
#[derive(Debug, Clone, PartialEq)]
pub enum Span {
    Text(String),
    Styled {
        style: Style,
        attrs: Attributes,
        content: Vec<Span>,
    },
    Code(String),
    Link {
        url: String,
        title: String,
        attrs: Attributes,
        content: Vec<Span>,
    },
    Image {
        url: String,
        title: String,
        attrs: Attributes,
        alt: Vec<Span>,
    },
    /// Inline raw HTML, passed through untouched.
    Html(String),
    SoftBreak,
    LineBreak,
}

/// A single list item. Inline content comes first, followed by any
/// block children (nested lists, code blocks, quotes) in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub content: Vec<Span>,
    pub children: Vec<Block>,
    pub checked: Option<bool>,
}

/// A list (ordered or unordered)
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    /// Start number for ordered lists.
    pub start: Option<u64>,
    pub items: Vec<ListItem>,
}

impl List {
    pub fn ordered(&self) -> bool {
        self.start.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    None,
    Left,
    Center,
    Right,
}

/// Block-level elements parsed from Markdown
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading {
        level: u8,
        /// Anchor id; filled in for every heading once parsing completes.
        id: String,
        attrs: Attributes,
        content: Vec<Span>,
    },
    Paragraph {
        attrs: Attributes,
        content: Vec<Span>,
    },
    CodeBlock {
        language: Option<String>,
        content: String,
    },
    List(List),
    Table {
        alignments: Vec<Align>,
        headers: Vec<Vec<Span>>,
        rows: Vec<Vec<Vec<Span>>>,
    },
    Quote(Vec<Block>),
    /// Raw HTML block, passed through untouched.
    Html(String),
    /// `[TOC]` marker, expanded by the renderers.
    Toc,
    Rule,
}

impl Span {
    pub fn styled(style: Style, content: Vec<Span>) -> Self {
        Span::Styled {
            style,
            attrs: Attributes::default(),
            content,
        }
    }

    /// Attributes slot of an element that can carry an inline attribute
    /// list, if this span is one.
    pub(crate) fn attrs_mut(&mut self) -> Option<&mut Attributes> {
        match self {
            Span::Styled { attrs, .. } | Span::Link { attrs, .. } | Span::Image { attrs, .. } => {
                Some(attrs)
            }
            _ => None,
        }
    }
}

/// Plain text of a span sequence, with all formatting dropped.
pub fn plain_text(spans: &[Span]) -> String {
    let mut out = String::new();
    push_plain_text(spans, &mut out);
    out
}

fn push_plain_text(spans: &[Span], out: &mut String) {
    for span in spans {
        match span {
            Span::Text(text) | Span::Code(text) => out.push_str(text),
            Span::Styled { content, .. } => push_plain_text(content, out),
            Span::Link { content, .. } => push_plain_text(content, out),
            Span::Image { alt, .. } => push_plain_text(alt, out),
            Span::Html(_) => {}
            Span::SoftBreak | Span::LineBreak => out.push(' '),
        }
    }
}

/// Visit every heading in document order, descending into quotes and
/// list items.
pub(crate) fn for_each_heading_mut(blocks: &mut [Block], f: &mut dyn FnMut(&mut Block)) {
    for block in blocks {
        match block {
            Block::Heading { .. } => f(block),
            Block::Quote(children) => for_each_heading_mut(children, f),
            Block::List(list) => {
                for item in &mut list.items {
                    for_each_heading_mut(&mut item.children, f);
                }
            }
            _ => {}
        }
    }
}

/// Collect `(level, id, text)` for every heading in document order.
pub(crate) fn headings(blocks: &[Block]) -> Vec<(u8, String, String)> {
    let mut out = Vec::new();
    collect_headings(blocks, &mut out);
    out
}

fn collect_headings(blocks: &[Block], out: &mut Vec<(u8, String, String)>) {
    for block in blocks {
        match block {
            Block::Heading {
                level, id, content, ..
            } => out.push((*level, id.clone(), plain_text(content))),
            Block::Quote(children) => collect_headings(children, out),
            Block::List(list) => {
                for item in &list.items {
                    collect_headings(&item.children, out);
                }
            }
            _ => {}
        }
    }
}
