//! Tag normalization and the derived available-tags set.
//!
//! Tags are not stored on their own. The global tag list shown for
//! filtering is recomputed from pages and consoles whenever they change.

use std::collections::BTreeSet;

use crate::error::{Result, SnipError};
use crate::models::Page;

/// Trim a raw tag. Blank input yields `None`.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Trim, drop blanks, and deduplicate, keeping first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for tag in tags {
        if let Some(t) = normalize_tag(tag.as_ref()) {
            if seen.insert(t.clone()) {
                out.push(t);
            }
        }
    }
    out
}

/// Append a tag to a list.
///
/// Returns the list unchanged when the tag is already present, and a
/// validation error when it is blank.
pub fn add_tag(tags: &[String], raw: &str) -> Result<Vec<String>> {
    let tag = normalize_tag(raw).ok_or_else(|| SnipError::Validation("tag is empty".to_string()))?;
    let mut out = tags.to_vec();
    if !out.contains(&tag) {
        out.push(tag);
    }
    Ok(out)
}

/// Remove every exact occurrence of `tag`.
pub fn remove_tag(tags: &[String], tag: &str) -> Vec<String> {
    tags.iter().filter(|t| t.as_str() != tag).cloned().collect()
}

/// Every tag on a page or any of its consoles.
pub fn page_tag_union(page: &Page) -> BTreeSet<&str> {
    page.tags
        .iter()
        .chain(page.consoles.iter().flat_map(|c| c.tags.iter()))
        .map(|t| t.as_str())
        .collect()
}

/// Sorted, deduplicated union of all page and console tags.
///
/// Tags are trimmed and blank ones skipped. Comparison is case-sensitive.
pub fn compute_available_tags(pages: &[Page]) -> Vec<String> {
    let mut all = BTreeSet::new();
    for page in pages {
        let console_tags = page.consoles.iter().flat_map(|c| c.tags.iter());
        for tag in page.tags.iter().chain(console_tags) {
            if let Some(t) = normalize_tag(tag) {
                all.insert(t);
            }
        }
    }
    all.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Console, NewConsole};

    fn console(id: &str, tags: &[&str]) -> Console {
        let mut c = NewConsole::for_page("p").into_console(id.to_string());
        c.tags = tags.iter().map(|t| t.to_string()).collect();
        c
    }

    fn page(id: &str, tags: &[&str], consoles: Vec<Console>) -> Page {
        Page {
            id: id.to_string(),
            title: id.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            consoles,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_available_tags_sorted_union() {
        let pages = vec![
            page("a", &["rust", "cli"], vec![console("c1", &["async", "rust"])]),
            page("b", &["zsh"], vec![console("c2", &["Rust"])]),
        ];
        assert_eq!(
            compute_available_tags(&pages),
            vec!["Rust", "async", "cli", "rust", "zsh"]
        );
    }

    #[test]
    fn test_available_tags_drops_blank_and_trims() {
        let pages = vec![page("a", &["", "  ", " sql "], vec![console("c1", &["sql", "\t"])])];
        assert_eq!(compute_available_tags(&pages), vec!["sql"]);
    }

    #[test]
    fn test_available_tags_idempotent() {
        let pages = vec![
            page("a", &["b", "a"], vec![console("c1", &["c"])]),
            page("b", &[], vec![]),
        ];
        let first = compute_available_tags(&pages);
        let second = compute_available_tags(&pages);
        assert_eq!(first, second);
        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(first, sorted);
        assert!(first.iter().all(|t| !t.is_empty()));
    }

    #[test]
    fn test_union_invariant() {
        let pages = vec![
            page("a", &["x"], vec![console("c1", &["y"]), console("c2", &["z"])]),
            page("b", &["x"], vec![console("c3", &[])]),
        ];
        let available: BTreeSet<String> = compute_available_tags(&pages).into_iter().collect();
        let mut expected = BTreeSet::new();
        for p in &pages {
            for t in page_tag_union(p) {
                expected.insert(t.to_string());
            }
        }
        assert_eq!(available, expected);
    }

    #[test]
    fn test_empty_collection() {
        assert!(compute_available_tags(&[]).is_empty());
    }

    #[test]
    fn test_add_tag_trims_and_dedups() {
        let tags = vec!["a".to_string()];
        assert_eq!(add_tag(&tags, "  b ").unwrap(), vec!["a", "b"]);
        assert_eq!(add_tag(&tags, "a").unwrap(), vec!["a"]);
        assert!(add_tag(&tags, "   ").unwrap_err().is_validation());
    }

    #[test]
    fn test_remove_tag() {
        let tags = vec!["a".to_string(), "b".to_string()];
        assert_eq!(remove_tag(&tags, "a"), vec!["b"]);
        assert_eq!(remove_tag(&tags, "missing"), tags);
    }

    #[test]
    fn test_normalize_tags_keeps_first_seen_order() {
        assert_eq!(normalize_tags(["b", " a", "b ", ""]), vec!["b", "a"]);
    }
}
