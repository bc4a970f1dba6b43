use std::sync::Arc;

use tracing::warn;

use crate::application::repos::{ContentSource, DocumentKind, SourceError};
use crate::domain::content::{
    GuideDetail, GuideRecord, PageDocument, PostDetail, PostRecord, SiteSettings,
};

const SOURCE: &str = "application::content::ContentService";

/// The outcome of a page-level read. `degraded` is set when the source failed
/// and `value` is the empty fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub degraded: bool,
}

impl<T> Fetched<T> {
    pub fn fresh(value: T) -> Self {
        Self {
            value,
            degraded: false,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched {
            value: f(self.value),
            degraded: self.degraded,
        }
    }
}

/// Which kind of page a response rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Home,
    NewsHub,
    NewsDetail,
    GuidesHub,
    GuideDetail,
    Page,
    NotFound,
}

impl PageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PageKind::Home => "home",
            PageKind::NewsHub => "news_hub",
            PageKind::NewsDetail => "news_detail",
            PageKind::GuidesHub => "guides_hub",
            PageKind::GuideDetail => "guide_detail",
            PageKind::Page => "page",
            PageKind::NotFound => "not_found",
        }
    }
}

/// Response extension set by page handlers. A degraded page must not be
/// cached: it reflects an outage, not the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageReport {
    pub kind: PageKind,
    pub degraded: bool,
}

/// Page-level reads. An unreachable CMS degrades to empty listings, absent
/// documents and default settings so pages render an empty state instead of
/// failing.
#[derive(Clone)]
pub struct ContentService {
    source: Arc<dyn ContentSource>,
}

impl ContentService {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }

    pub async fn posts(&self) -> Fetched<Vec<PostRecord>> {
        fetched("list_posts", self.source.list_posts().await)
    }

    pub async fn post(&self, slug: &str) -> Fetched<Option<PostDetail>> {
        fetched("find_post", self.source.find_post(slug).await)
    }

    pub async fn guides(&self) -> Fetched<Vec<GuideRecord>> {
        fetched("list_guides", self.source.list_guides().await)
    }

    pub async fn guide(&self, slug: &str) -> Fetched<Option<GuideDetail>> {
        fetched("find_guide", self.source.find_guide(slug).await)
    }

    pub async fn page(&self, slug: &str) -> Fetched<Option<PageDocument>> {
        fetched("find_page", self.source.find_page(slug).await)
    }

    pub async fn site_settings(&self) -> Fetched<SiteSettings> {
        fetched("site_settings", self.source.site_settings().await).map(Option::unwrap_or_default)
    }

    /// Slug enumeration is not degraded: callers building route lists need to
    /// know the list is incomplete.
    pub async fn slugs(&self, kind: DocumentKind) -> Result<Vec<String>, SourceError> {
        self.source.list_slugs(kind).await
    }
}

fn fetched<T: Default>(operation: &'static str, result: Result<T, SourceError>) -> Fetched<T> {
    match result {
        Ok(value) => Fetched::fresh(value),
        Err(err) => {
            warn!(
                target = SOURCE,
                operation,
                error = %err,
                "content source unavailable; serving empty result"
            );
            metrics::counter!("howling_mine_content_degraded_total", "operation" => operation)
                .increment(1);
            Fetched {
                value: T::default(),
                degraded: true,
            }
        }
    }
}
