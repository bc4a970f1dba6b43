use serde::Deserialize;

use super::{
    ALL_FILTER, CategoryFilter, EmptyState, SearchNeedle, compare_titles, distinct_titles,
    empty_state,
};
use crate::domain::content::{Difficulty, GuideRecord};

/// Raw criteria exactly as they arrive from the hub form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GuideCriteria {
    #[serde(rename = "q")]
    pub search: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuideSort {
    /// Manual `order` ascending.
    #[default]
    Default,
    Newest,
    Oldest,
    Az,
    Za,
}

impl GuideSort {
    pub const ALL: [GuideSort; 5] = [
        GuideSort::Default,
        GuideSort::Newest,
        GuideSort::Oldest,
        GuideSort::Az,
        GuideSort::Za,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GuideSort::Default => "default",
            GuideSort::Newest => "newest",
            GuideSort::Oldest => "oldest",
            GuideSort::Az => "az",
            GuideSort::Za => "za",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GuideSort::Default => "Recommended",
            GuideSort::Newest => "Newest first",
            GuideSort::Oldest => "Oldest first",
            GuideSort::Az => "Title A-Z",
            GuideSort::Za => "Title Z-A",
        }
    }

    /// Unrecognised values fall back to the manual ordering.
    pub fn parse(value: Option<&str>) -> Self {
        value
            .and_then(|value| Self::ALL.into_iter().find(|sort| sort.as_str() == value))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DifficultyFilter {
    #[default]
    All,
    Only(Difficulty),
    /// A value no guide can carry; admits nothing.
    Unrecognised(String),
}

impl DifficultyFilter {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None => Self::All,
            Some(value) if value.is_empty() || value == ALL_FILTER => Self::All,
            Some(value) => Difficulty::parse(value)
                .map(Self::Only)
                .unwrap_or_else(|| Self::Unrecognised(value.to_string())),
        }
    }

    pub fn as_query_value(&self) -> &str {
        match self {
            Self::All => ALL_FILTER,
            Self::Only(difficulty) => difficulty.as_str(),
            Self::Unrecognised(value) => value,
        }
    }

    fn admits(&self, difficulty: Option<Difficulty>) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => difficulty == Some(*wanted),
            Self::Unrecognised(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GuideQuery {
    pub needle: Option<SearchNeedle>,
    pub category: CategoryFilter,
    pub difficulty: DifficultyFilter,
    pub sort: GuideSort,
}

impl GuideQuery {
    pub fn from_criteria(criteria: &GuideCriteria) -> Self {
        Self {
            needle: SearchNeedle::parse(criteria.search.as_deref()),
            category: CategoryFilter::parse(criteria.category.as_deref()),
            difficulty: DifficultyFilter::parse(criteria.difficulty.as_deref()),
            sort: GuideSort::parse(criteria.sort.as_deref()),
        }
    }

    fn admits(&self, guide: &GuideRecord) -> bool {
        if let Some(needle) = &self.needle {
            let fields = [
                Some(guide.title.as_str()),
                guide.excerpt.as_deref(),
                guide.category_title(),
                guide.difficulty.map(Difficulty::as_str),
            ];
            if !needle.matches_any(fields) {
                return false;
            }
        }

        self.category.admits(guide.category_title().into_iter())
            && self.difficulty.admits(guide.difficulty)
    }
}

/// Filter then stably sort; the input slice is left as received.
pub fn filter_and_sort<'a>(guides: &'a [GuideRecord], query: &GuideQuery) -> Vec<&'a GuideRecord> {
    let mut selected: Vec<&GuideRecord> =
        guides.iter().filter(|guide| query.admits(guide)).collect();

    match query.sort {
        GuideSort::Default => selected.sort_by_key(|guide| guide.sort_order()),
        GuideSort::Newest => selected.sort_by(|a, b| b.sort_date().cmp(&a.sort_date())),
        GuideSort::Oldest => selected.sort_by_key(|guide| guide.sort_date()),
        GuideSort::Az => selected.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        GuideSort::Za => selected.sort_by(|a, b| compare_titles(&b.title, &a.title)),
    }

    selected
}

#[derive(Debug, Clone)]
pub struct GuidesListing<'a> {
    pub query: GuideQuery,
    pub guides: Vec<&'a GuideRecord>,
    /// Size of the unfiltered collection.
    pub total: usize,
    pub categories: Vec<String>,
}

impl<'a> GuidesListing<'a> {
    pub fn build(guides: &'a [GuideRecord], criteria: &GuideCriteria) -> Self {
        let query = GuideQuery::from_criteria(criteria);
        let ordered = filter_and_sort(guides, &query);

        Self {
            categories: distinct_titles(guides.iter().filter_map(GuideRecord::category_title)),
            query,
            guides: ordered,
            total: guides.len(),
        }
    }

    pub fn empty_state(&self) -> Option<EmptyState> {
        empty_state(self.total, self.guides.len())
    }
}
