use std::collections::BTreeMap;

/// Key/value pairs read from the front-matter block. Keys are lower-cased;
/// a key may carry several values through indented continuation lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata(BTreeMap<String, Vec<String>>);

impl Metadata {
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    /// First value of `key`, if any.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Split a leading metadata block off `markdown`.
///
/// Accepts either a `---` fenced block (closed by `---` or `...`) or bare
/// `key: value` lines at the very start, ended by a blank line. The first
/// line that is neither a `key: value` line nor an indented continuation
/// ends the block and stays in the body.
pub fn split(markdown: &str) -> (Metadata, &str) {
    let mut meta = Metadata::default();
    let mut lines = Lines::new(markdown);

    let fenced = matches!(lines.peek(), Some(line) if line.trim_end() == "---");
    if fenced {
        let mut after_fence = lines.clone();
        after_fence.next();
        // An opening fence without a key line is a thematic break.
        match after_fence.peek() {
            Some(line) if parse_key_line(line).is_some() => lines = after_fence,
            _ => return (meta, markdown),
        }
    } else if !matches!(lines.peek(), Some(line) if parse_key_line(line).is_some()) {
        return (meta, markdown);
    }

    let mut last_key: Option<String> = None;
    while let Some(line) = lines.peek() {
        let trimmed = line.trim_end();
        if trimmed.is_empty() || (fenced && (trimmed == "---" || trimmed == "...")) {
            lines.next();
            break;
        }
        if let Some((key, value)) = parse_key_line(line) {
            let key = key.to_ascii_lowercase();
            meta.0.entry(key.clone()).or_default().push(value.to_string());
            last_key = Some(key);
        } else if let (Some(value), Some(key)) = (continuation(line), last_key.as_ref()) {
            if let Some(values) = meta.0.get_mut(key) {
                values.push(value.to_string());
            }
        } else {
            break;
        }
        lines.next();
    }

    let body = &markdown[lines.offset..];
    (meta, body.trim_start_matches(['\n', '\r']))
}

/// `key: value` with at most three spaces of indentation and a key made of
/// ASCII alphanumerics, `_` and `-`.
fn parse_key_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_end_matches(['\n', '\r']);
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let (key, value) = line[indent..].split_once(':')?;
    if key.is_empty()
        || !key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return None;
    }
    Some((key, value.trim()))
}

/// Indented (4+ spaces) continuation of the previous key.
fn continuation(line: &str) -> Option<&str> {
    line.strip_prefix("    ").map(str::trim)
}

/// Line cursor that remembers the byte offset of the next line.
#[derive(Clone)]
struct Lines<'a> {
    source: &'a str,
    offset: usize,
}

impl<'a> Lines<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, offset: 0 }
    }

    fn peek(&self) -> Option<&'a str> {
        let rest = &self.source[self.offset..];
        if rest.is_empty() {
            return None;
        }
        let end = rest.find('\n').map_or(rest.len(), |i| i + 1);
        Some(&rest[..end])
    }

    fn next(&mut self) -> Option<&'a str> {
        let line = self.peek()?;
        self.offset += line.len();
        Some(line)
    }
}
