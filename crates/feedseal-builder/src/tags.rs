//! Tag normalization.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"^[a-z0-9_-]+$").expect("tag pattern");
    static ref INNER_SPACE_RE: Regex = Regex::new(r"\s+").expect("space pattern");
}

/// Normalize tags: trim, lowercase, join inner whitespace with `-`, drop
/// anything outside `[a-z0-9_-]`, de-duplicate keeping first occurrence, and
/// keep at most `max`.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S], max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|t| INNER_SPACE_RE.replace_all(t.as_ref().trim(), "-").to_lowercase())
        .filter(|t| TAG_RE.is_match(t))
        .filter(|t| seen.insert(t.clone()))
        .take(max)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize() {
        let tags = ["  Rust ", "rust", "Web Dev", "c++", "", "ok_1", "RUST"];
        assert_eq!(normalize_tags(&tags, 20), vec!["rust", "web-dev", "ok_1"]);
    }

    #[test]
    fn test_cap() {
        let tags: Vec<String> = (0..30).map(|i| format!("t{i}")).collect();
        let out = normalize_tags(&tags, 20);
        assert_eq!(out.len(), 20);
        assert_eq!(out[0], "t0");
        assert_eq!(out[19], "t19");
    }

    #[test]
    fn test_duplicates_do_not_count_toward_cap() {
        let tags = ["a", "a", "a", "b"];
        assert_eq!(normalize_tags(&tags, 2), vec!["a", "b"]);
    }

    proptest! {
        #[test]
        fn test_normalized_tags_are_clean(
            tags in prop::collection::vec(".{0,12}", 0..40),
            max in 0usize..25,
        ) {
            let out = normalize_tags(&tags, max);
            prop_assert!(out.len() <= max);
            prop_assert!(out.iter().all(|t| TAG_RE.is_match(t)));
            let unique: HashSet<_> = out.iter().collect();
            prop_assert_eq!(unique.len(), out.len());
        }
    }
}
