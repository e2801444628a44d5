//! Attribute lists: `{#id .class key=value}`, optionally written `{: ... }`.

/// HTML attributes attached to a block through an attribute list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub pairs: Vec<(String, String)>,
}

impl Attributes {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.classes.is_empty() && self.pairs.is_empty()
    }

    /// Parse the inside of an attribute list (without the braces).
    /// Returns `None` if no token is recognised.
    pub fn parse(inner: &str) -> Option<Self> {
        let inner = inner.trim();
        let inner = inner.strip_prefix(':').unwrap_or(inner);
        let mut attrs = Attributes::default();
        for token in tokenize(inner) {
            attrs.apply(&token);
        }
        if attrs.is_empty() { None } else { Some(attrs) }
    }

    /// Merge heading attributes reported by pulldown-cmark.
    ///
    /// pulldown-cmark does not know the `{: ...}` spelling, so the colon
    /// comes back as a bare key of its own (`{: #id}`) or glued to the
    /// first token (`{:#id}`, `{:.class}`, `{:key=value}`).
    pub fn from_heading(
        id: Option<&str>,
        classes: impl IntoIterator<Item = String>,
        pairs: impl IntoIterator<Item = (String, Option<String>)>,
    ) -> Self {
        let mut attrs = Attributes {
            id: id.filter(|id| !id.is_empty()).map(str::to_string),
            classes: classes.into_iter().collect(),
            pairs: Vec::new(),
        };
        for (key, value) in pairs {
            match key.strip_prefix(':') {
                Some(token) => {
                    let token = match value {
                        Some(value) => format!("{token}={value}"),
                        None => token.to_string(),
                    };
                    attrs.apply(&token);
                }
                None => {
                    let value = value.map(|v| unquote(&v).to_string()).unwrap_or_default();
                    attrs.pairs.push((key, value));
                }
            }
        }
        attrs
    }

    /// Add the contents of `other`; its id wins.
    pub fn merge(&mut self, other: Attributes) {
        if other.id.is_some() {
            self.id = other.id;
        }
        self.classes.extend(other.classes);
        self.pairs.extend(other.pairs);
    }

    fn apply(&mut self, token: &str) {
        if let Some(id) = token.strip_prefix('#') {
            if !id.is_empty() {
                self.id = Some(id.to_string());
            }
        } else if let Some(class) = token.strip_prefix('.') {
            if !class.is_empty() {
                self.classes.push(class.to_string());
            }
        } else if let Some((key, value)) = token.split_once('=') {
            if !key.is_empty() {
                self.pairs.push((key.to_string(), unquote(value).to_string()));
            }
        }
    }
}

/// Inside of a `{...}` list: no closing brace or newline, and the first
/// character after the optional colon and spaces is a real token.
fn list_inner(inner: &str) -> Option<&str> {
    if inner.contains(['}', '\n']) {
        return None;
    }
    let rest = inner.strip_prefix(':').unwrap_or(inner).trim_start_matches(' ');
    if rest.is_empty() {
        return None;
    }
    Some(inner)
}

/// Parse a line that consists of nothing but an attribute list.
pub fn parse_line(line: &str) -> Option<Attributes> {
    let inner = line.trim().strip_prefix('{')?.strip_suffix('}')?;
    Attributes::parse(list_inner(inner)?)
}

/// Split an attribute list off the start of `text`, as written right after
/// an inline element (`*word*{: .hl}`). Returns the list and the rest.
pub fn split_leading(text: &str) -> Option<(Attributes, &str)> {
    let body = text.strip_prefix('{')?;
    let close = body.find('}')?;
    let attrs = Attributes::parse(list_inner(&body[..close])?)?;
    Some((attrs, &body[close + 1..]))
}

fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None if ch == '"' || ch == '\'' => {
                current.push(ch);
                quote = Some(ch);
            }
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(q).and_then(|v| v.strip_suffix(q)) {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_id_classes_and_pairs() {
        let attrs = Attributes::parse("#intro .lead .wide data-x=1 title=\"Two words\"").unwrap();
        assert_eq!(attrs.id.as_deref(), Some("intro"));
        assert_eq!(attrs.classes, vec!["lead", "wide"]);
        assert_eq!(
            attrs.pairs,
            vec![
                ("data-x".to_string(), "1".to_string()),
                ("title".to_string(), "Two words".to_string()),
            ]
        );
    }

    #[test]
    fn colon_prefix_is_optional() {
        assert_eq!(Attributes::parse(": .note"), Attributes::parse(".note"));
    }

    #[test]
    fn unrecognised_content_is_not_an_attribute_list() {
        assert_eq!(Attributes::parse("x + y"), None);
        assert_eq!(Attributes::parse(""), None);
    }

    #[test]
    fn whole_line_list() {
        let attrs = parse_line("{: #n1 .callout }").unwrap();
        assert_eq!(attrs.id.as_deref(), Some("n1"));
        assert_eq!(attrs.classes, vec!["callout"]);
        assert_eq!(parse_line("  { .x }  ").unwrap().classes, vec!["x"]);
    }

    #[test]
    fn line_with_other_text_is_not_a_list() {
        assert!(parse_line("Some text {: .note }").is_none());
        assert!(parse_line("{}").is_none());
        assert!(parse_line("{a} {b}").is_none());
    }

    #[test]
    fn leading_list_after_inline_element() {
        let (attrs, rest) = split_leading("{: .hl} here").unwrap();
        assert_eq!(attrs.classes, vec!["hl"]);
        assert_eq!(rest, " here");

        let (attrs, rest) = split_leading("{: width=\"50%\" }").unwrap();
        assert_eq!(attrs.pairs, vec![("width".to_string(), "50%".to_string())]);
        assert_eq!(rest, "");
    }

    #[test]
    fn leading_braces_without_tokens_are_text() {
        assert!(split_leading("{ }").is_none());
        assert!(split_leading(" {.x}").is_none());
        assert!(split_leading("{x + y}").is_none());
    }

    #[test]
    fn heading_attrs_drop_stray_colon() {
        let attrs = Attributes::from_heading(
            Some("top"),
            Vec::new(),
            vec![(":".to_string(), None), ("lang".to_string(), Some("en".to_string()))],
        );
        assert_eq!(attrs.id.as_deref(), Some("top"));
        assert_eq!(attrs.pairs, vec![("lang".to_string(), "en".to_string())]);
    }

    #[test]
    fn heading_attrs_with_glued_colon() {
        let attrs = Attributes::from_heading(
            None,
            Vec::new(),
            vec![(":#install".to_string(), None)],
        );
        assert_eq!(attrs.id.as_deref(), Some("install"));
        assert!(attrs.pairs.is_empty());

        let attrs = Attributes::from_heading(
            None,
            vec!["b".to_string()],
            vec![
                (":.a".to_string(), None),
                (":k".to_string(), Some("v".to_string())),
            ],
        );
        assert_eq!(attrs.classes, vec!["b", "a"]);
        assert_eq!(attrs.pairs, vec![("k".to_string(), "v".to_string())]);
    }
}
