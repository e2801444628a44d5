use crate::block::{self, Block};

/// One table-of-contents entry, with deeper headings nested below it.
#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    pub level: u8,
    pub id: String,
    pub title: String,
    pub children: Vec<TocEntry>,
}

/// Build the heading tree for a document. A heading nests under the
/// closest preceding heading of a shallower level.
pub fn build(blocks: &[Block]) -> Vec<TocEntry> {
    let mut roots = Vec::new();
    let mut stack: Vec<TocEntry> = Vec::new();

    for (level, id, title) in block::headings(blocks) {
        while stack.last().is_some_and(|top| top.level >= level) {
            if let Some(done) = stack.pop() {
                attach(&mut stack, &mut roots, done);
            }
        }
        stack.push(TocEntry {
            level,
            id,
            title,
            children: Vec::new(),
        });
    }
    while let Some(done) = stack.pop() {
        attach(&mut stack, &mut roots, done);
    }
    roots
}

fn attach(stack: &mut [TocEntry], roots: &mut Vec<TocEntry>, entry: TocEntry) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(entry),
        None => roots.push(entry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn shape(entries: &[TocEntry]) -> Vec<(String, usize)> {
        entries
            .iter()
            .map(|e| (e.id.clone(), e.children.len()))
            .collect()
    }

    #[test]
    fn nests_by_level() {
        let blocks = parser::parse("# A\n## B\n### C\n## D\n# E\n");
        let toc = build(&blocks);
        assert_eq!(shape(&toc), [("a".to_string(), 2), ("e".to_string(), 0)]);
        assert_eq!(shape(&toc[0].children), [("b".to_string(), 1), ("d".to_string(), 0)]);
        assert_eq!(toc[0].children[0].children[0].title, "C");
    }

    #[test]
    fn starts_below_top_level() {
        let blocks = parser::parse("### Deep\n# Top\n");
        let toc = build(&blocks);
        assert_eq!(shape(&toc), [("deep".to_string(), 0), ("top".to_string(), 0)]);
    }

    #[test]
    fn empty_document() {
        assert!(build(&[]).is_empty());
    }
}
