//! Tag filtering and substring search over pages.
//!
//! Search is a linear scan with no index and no scoring. Results keep the
//! order of the input collection.
//!
//! # Algorithm
//!
//! 1. If any tags are selected, keep pages whose own tags or console tags
//!    include at least one of them (OR semantics).
//! 2. If the trimmed query is empty, return those pages with no match type.
//! 3. Otherwise lower-case the query and keep pages where the title, a page
//!    tag, or any console field (comment, code, tags, notes) contains it.
//! 4. Classify each page: `title` > `page-tags` > `console`.
//! 5. Record which consoles matched, in page order.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::{Console, Page};
use crate::tags::page_tag_union;

/// Why a page matched the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    Title,
    PageTags,
    Console,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Title => "title",
            MatchType::PageTags => "page-tags",
            MatchType::Console => "console",
        }
    }
}

/// A page retained by [`search`], with its classification.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResultPage {
    pub page: Page,
    /// `None` when no query was active (tag filtering only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_type: Option<MatchType>,
    /// Consoles whose own fields contain the query, in page order.
    pub matching_consoles: Vec<Console>,
}

/// Filter and classify `pages` against a query and a tag selection.
pub fn search(pages: &[Page], query: &str, selected_tags: &BTreeSet<String>) -> Vec<SearchResultPage> {
    let tag_filtered = pages.iter().filter(|p| has_selected_tag(p, selected_tags));

    if query.trim().is_empty() {
        return tag_filtered
            .map(|page| SearchResultPage {
                page: page.clone(),
                match_type: None,
                matching_consoles: Vec::new(),
            })
            .collect();
    }

    let needle = query.to_lowercase();
    tag_filtered
        .filter_map(|page| classify(page, &needle))
        .collect()
}

fn has_selected_tag(page: &Page, selected: &BTreeSet<String>) -> bool {
    if selected.is_empty() {
        return true;
    }
    page_tag_union(page)
        .into_iter()
        .any(|t| selected.contains(t))
}

fn classify(page: &Page, needle: &str) -> Option<SearchResultPage> {
    let title_match = contains(&page.title, needle);
    let page_tag_match = page.tags.iter().any(|t| contains(t, needle));
    let matching_consoles: Vec<Console> = page
        .consoles
        .iter()
        .filter(|c| console_matches(c, needle))
        .cloned()
        .collect();

    let match_type = if title_match {
        MatchType::Title
    } else if page_tag_match {
        MatchType::PageTags
    } else if !matching_consoles.is_empty() {
        MatchType::Console
    } else {
        return None;
    };

    Some(SearchResultPage {
        page: page.clone(),
        match_type: Some(match_type),
        matching_consoles,
    })
}

/// True if any searchable field of the console contains `needle`.
///
/// `needle` must already be lower-cased.
pub fn console_matches(console: &Console, needle: &str) -> bool {
    contains(&console.comment, needle)
        || contains(&console.code, needle)
        || console.tags.iter().any(|t| contains(t, needle))
        || contains(&console.before_text, needle)
        || contains(&console.after_text, needle)
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}
