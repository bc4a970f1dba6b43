use serde::Deserialize;

use super::{CategoryFilter, EmptyState, SearchNeedle, distinct_titles, empty_state};
use crate::domain::content::PostRecord;

/// Raw criteria exactly as they arrive from the hub form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewsCriteria {
    #[serde(rename = "q")]
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostSort {
    #[default]
    Newest,
    Oldest,
    Featured,
}

impl PostSort {
    pub const ALL: [PostSort; 3] = [PostSort::Newest, PostSort::Oldest, PostSort::Featured];

    pub fn as_str(self) -> &'static str {
        match self {
            PostSort::Newest => "newest",
            PostSort::Oldest => "oldest",
            PostSort::Featured => "featured",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PostSort::Newest => "Newest first",
            PostSort::Oldest => "Oldest first",
            PostSort::Featured => "Featured first",
        }
    }

    /// Unrecognised values fall back to the default ordering.
    pub fn parse(value: Option<&str>) -> Self {
        value
            .and_then(|value| Self::ALL.into_iter().find(|sort| sort.as_str() == value))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewsQuery {
    pub needle: Option<SearchNeedle>,
    pub category: CategoryFilter,
    pub sort: PostSort,
}

impl NewsQuery {
    pub fn from_criteria(criteria: &NewsCriteria) -> Self {
        Self {
            needle: SearchNeedle::parse(criteria.search.as_deref()),
            category: CategoryFilter::parse(criteria.category.as_deref()),
            sort: PostSort::parse(criteria.sort.as_deref()),
        }
    }

    /// The untouched landing view: no search, no category, default sort.
    /// Only this view separates out a featured entry.
    pub fn is_default_view(&self) -> bool {
        self.needle.is_none() && self.category.is_all() && self.sort == PostSort::Newest
    }

    fn admits(&self, post: &PostRecord) -> bool {
        if let Some(needle) = &self.needle {
            let fields = [Some(post.title.as_str()), post.excerpt.as_deref()]
                .into_iter()
                .chain(post.category_titles().map(Some));
            if !needle.matches_any(fields) {
                return false;
            }
        }

        self.category.admits(post.category_titles())
    }
}

/// Filter then stably sort; the input slice is left as received.
pub fn filter_and_sort<'a>(posts: &'a [PostRecord], query: &NewsQuery) -> Vec<&'a PostRecord> {
    let mut selected: Vec<&PostRecord> = posts.iter().filter(|post| query.admits(post)).collect();

    match query.sort {
        PostSort::Newest => selected.sort_by(|a, b| b.sort_date().cmp(&a.sort_date())),
        PostSort::Oldest => selected.sort_by_key(|post| post.sort_date()),
        PostSort::Featured => selected.sort_by(|a, b| {
            b.featured
                .cmp(&a.featured)
                .then_with(|| b.sort_date().cmp(&a.sort_date()))
        }),
    }

    selected
}

#[derive(Debug, Clone)]
pub struct NewsListing<'a> {
    pub query: NewsQuery,
    /// Set only in the default view: the first featured post, lifted out of `posts`.
    pub featured: Option<&'a PostRecord>,
    pub posts: Vec<&'a PostRecord>,
    /// Size of the unfiltered collection.
    pub total: usize,
    pub categories: Vec<String>,
}

impl<'a> NewsListing<'a> {
    pub fn build(posts: &'a [PostRecord], criteria: &NewsCriteria) -> Self {
        let query = NewsQuery::from_criteria(criteria);
        let mut ordered = filter_and_sort(posts, &query);

        let featured_index = if query.is_default_view() {
            ordered.iter().position(|post| post.featured)
        } else {
            None
        };
        let featured = featured_index.map(|index| ordered.remove(index));

        Self {
            categories: distinct_titles(posts.iter().flat_map(PostRecord::category_titles)),
            query,
            featured,
            posts: ordered,
            total: posts.len(),
        }
    }

    pub fn matched(&self) -> usize {
        self.posts.len() + usize::from(self.featured.is_some())
    }

    pub fn empty_state(&self) -> Option<EmptyState> {
        empty_state(self.total, self.matched())
    }
}
