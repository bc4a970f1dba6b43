//! Listing hubs: search, filter and sort over a snapshot of CMS records.
//!
//! Hubs are pure: the same records and criteria always produce the same
//! listing, and the input slice is never reordered.

pub mod guides;
pub mod news;
mod search;

use std::cmp::Ordering;

pub use search::SearchNeedle;

/// Sentinel accepted by every filter meaning "no constraint".
pub const ALL_FILTER: &str = "all";

/// Category constraint shared by both hubs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    /// Exact, case-sensitive match on a category title.
    Title(String),
}

impl CategoryFilter {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None => Self::All,
            Some(value) if value.is_empty() || value == ALL_FILTER => Self::All,
            Some(value) => Self::Title(value.to_string()),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn as_query_value(&self) -> &str {
        match self {
            Self::All => ALL_FILTER,
            Self::Title(title) => title,
        }
    }

    fn admits<'a>(&self, mut titles: impl Iterator<Item = &'a str>) -> bool {
        match self {
            Self::All => true,
            Self::Title(wanted) => titles.any(|title| title == wanted),
        }
    }
}

/// Why a listing rendered nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    /// The collection itself is empty.
    NoContent,
    /// Records exist but the active criteria exclude all of them.
    NoMatches,
}

pub(crate) fn empty_state(total: usize, matched: usize) -> Option<EmptyState> {
    match (total, matched) {
        (0, _) => Some(EmptyState::NoContent),
        (_, 0) => Some(EmptyState::NoMatches),
        _ => None,
    }
}

/// Distinct category titles across the whole collection, ignoring any active
/// filter so narrowing one filter never hides the other options.
pub(crate) fn distinct_titles<'a>(titles: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut distinct: Vec<String> = Vec::new();
    for title in titles {
        if !distinct.iter().any(|seen| seen == title) {
            distinct.push(title.to_string());
        }
    }
    distinct.sort_by(|a, b| compare_titles(a, b));
    distinct
}

/// Human ordering for titles. Letters compare by their base form ignoring
/// case, so "Émeraude" files under E; accents and then raw text break ties.
pub(crate) fn compare_titles(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

fn collation_key(title: &str) -> String {
    deunicode::deunicode(title).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_filter_treats_all_and_blank_as_unconstrained() {
        assert_eq!(CategoryFilter::parse(None), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse(Some("all")), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse(Some("")), CategoryFilter::All);
        assert_eq!(
            CategoryFilter::parse(Some("Mining")),
            CategoryFilter::Title("Mining".to_string())
        );
    }

    #[test]
    fn category_filter_is_case_sensitive() {
        let filter = CategoryFilter::parse(Some("Mining"));
        assert!(filter.admits(["Trading", "Mining"].into_iter()));
        assert!(!filter.admits(["mining"].into_iter()));
    }

    #[test]
    fn distinct_titles_dedupes_and_sorts() {
        let titles = distinct_titles(["Trading", "mining", "Trading", "Events"].into_iter());
        assert_eq!(titles, vec!["Events", "mining", "Trading"]);
    }

    #[test]
    fn accented_titles_sort_with_their_base_letter() {
        let mut titles = vec!["Zinc Veins", "Émeraude Claims", "Amps", "emerald shaft"];
        titles.sort_by(|a, b| compare_titles(a, b));
        assert_eq!(titles, vec!["Amps", "emerald shaft", "Émeraude Claims", "Zinc Veins"]);
    }

    #[test]
    fn empty_state_distinguishes_no_content_from_no_matches() {
        assert_eq!(empty_state(0, 0), Some(EmptyState::NoContent));
        assert_eq!(empty_state(4, 0), Some(EmptyState::NoMatches));
        assert_eq!(empty_state(4, 2), None);
    }
}
