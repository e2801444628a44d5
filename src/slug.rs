use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;

/// Turn heading text into an anchor id.
///
/// Folds accents away (NFKD, then ASCII only), lower-cases, drops
/// everything except alphanumerics, `_`, `-` and whitespace, then collapses
/// runs of whitespace and hyphens into one `-`.
pub fn slugify(text: &str) -> String {
    let kept: String = text
        .nfkd()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();

    let mut slug = String::with_capacity(kept.len());
    let mut pending_dash = false;
    for ch in kept.trim().chars() {
        if ch == '-' || ch.is_whitespace() {
            pending_dash = true;
            continue;
        }
        if pending_dash {
            slug.push('-');
            pending_dash = false;
        }
        slug.push(ch.to_ascii_lowercase());
    }
    if pending_dash {
        slug.push('-');
    }
    slug
}

/// Ids already handed out in one document.
#[derive(Debug, Default)]
pub struct SlugSet {
    used: HashSet<String>,
}

impl SlugSet {
    /// Mark an explicit id as taken without altering it.
    pub fn reserve(&mut self, id: &str) {
        self.used.insert(id.to_string());
    }

    /// Return `id`, or `id_1`, `id_2`, ... if it is empty or taken.
    pub fn unique(&mut self, mut id: String) -> String {
        while id.is_empty() || self.used.contains(&id) {
            id = match split_counter(&id) {
                Some((stem, n)) => match n.checked_add(1) {
                    Some(next) => format!("{stem}_{next}"),
                    None => format!("{id}_1"),
                },
                None => format!("{id}_1"),
            };
        }
        self.used.insert(id.clone());
        id
    }
}

/// `intro_3` -> `("intro", 3)`
fn split_counter(id: &str) -> Option<(&str, u64)> {
    let (stem, digits) = id.rsplit_once('_')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((stem, digits.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Results & Discussion  "), "results-discussion");
        assert_eq!(slugify("snake_case - and -- dashes"), "snake_case-and-dashes");
        assert_eq!(slugify("Version 2.0"), "version-20");
    }

    #[test]
    fn slugify_folds_accents() {
        assert_eq!(slugify("Café Résumé"), "cafe-resume");
        assert_eq!(slugify("ﬁnal Ångström"), "final-angstrom");
        assert_eq!(slugify("日本"), "");
    }

    #[test]
    fn duplicates_get_counters() {
        let mut set = SlugSet::default();
        assert_eq!(set.unique("intro".into()), "intro");
        assert_eq!(set.unique("intro".into()), "intro_1");
        assert_eq!(set.unique("intro".into()), "intro_2");

        let max = format!("x_{}", u64::MAX);
        assert_eq!(set.unique(max.clone()), max);
        assert_eq!(set.unique(max.clone()), format!("{max}_1"));
    }

    #[test]
    fn empty_slug_gets_counter() {
        let mut set = SlugSet::default();
        assert_eq!(set.unique(String::new()), "_1");
        assert_eq!(set.unique(String::new()), "_2");
    }

    #[test]
    fn reserved_ids_are_skipped() {
        let mut set = SlugSet::default();
        set.reserve("summary");
        assert_eq!(set.unique("summary".into()), "summary_1");
    }
}
