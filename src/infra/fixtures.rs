//! File-backed content source for local development and tests.
//!
//! The document mirrors the CMS projections:
//! `{ "posts": [...], "guides": [...], "pages": [...], "siteSettings": {...} }`.
//! Posts and guides carry their `body` inline.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::application::hub::compare_titles;
use crate::application::repos::{ContentSource, DocumentKind, SourceError};
use crate::domain::content::{
    GuideDetail, GuideRecord, PageDocument, PostDetail, PostRecord, SiteSettings,
};
use crate::domain::error::DomainError;

const SOURCE: &str = "infra::fixtures::FixtureContentSource";

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixtures from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse fixtures from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureDocument {
    #[serde(default)]
    pub posts: Vec<PostDetail>,
    #[serde(default)]
    pub guides: Vec<GuideDetail>,
    #[serde(default)]
    pub pages: Vec<PageDocument>,
    #[serde(default)]
    pub site_settings: Option<SiteSettings>,
}

impl FixtureDocument {
    fn validate(&self) -> Result<(), DomainError> {
        check_unique(
            "post",
            self.posts
                .iter()
                .map(|detail| (&detail.post.id, &detail.post.title, &detail.post.slug)),
        )?;
        check_unique(
            "guide",
            self.guides
                .iter()
                .map(|detail| (&detail.guide.id, &detail.guide.title, &detail.guide.slug)),
        )?;
        check_unique(
            "page",
            self.pages.iter().map(|page| (&page.id, &page.title, &page.slug)),
        )
    }
}

fn check_unique<'a>(
    kind: &'static str,
    records: impl Iterator<Item = (&'a String, &'a String, &'a String)>,
) -> Result<(), DomainError> {
    let mut seen = HashSet::new();
    for (id, title, slug) in records {
        if slug.trim().is_empty() {
            return Err(DomainError::empty_slug(kind, id.as_str()));
        }
        if title.trim().is_empty() {
            return Err(DomainError::empty_title(kind, id.as_str()));
        }
        if !seen.insert(slug.as_str()) {
            return Err(DomainError::duplicate_slug(kind, slug.as_str()));
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct FixtureContentSource {
    document: FixtureDocument,
}

impl FixtureContentSource {
    pub async fn load(path: &Path) -> Result<Self, FixtureError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| FixtureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let document: FixtureDocument =
            serde_json::from_slice(&bytes).map_err(|source| FixtureError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let source = Self::from_document(document)?;
        info!(
            target = SOURCE,
            path = %path.display(),
            posts = source.document.posts.len(),
            guides = source.document.guides.len(),
            pages = source.document.pages.len(),
            "fixtures loaded"
        );
        Ok(source)
    }

    pub fn from_document(document: FixtureDocument) -> Result<Self, FixtureError> {
        document.validate()?;
        Ok(Self { document })
    }

    fn is_published(post: &PostRecord, now: OffsetDateTime) -> bool {
        post.published_at.is_some_and(|published| published <= now)
    }
}

#[async_trait]
impl ContentSource for FixtureContentSource {
    async fn list_posts(&self) -> Result<Vec<PostRecord>, SourceError> {
        let now = OffsetDateTime::now_utc();
        let mut posts: Vec<PostRecord> = self
            .document
            .posts
            .iter()
            .map(|detail| &detail.post)
            .filter(|post| Self::is_published(post, now))
            .cloned()
            .collect();
        posts.sort_by_key(|post| std::cmp::Reverse(post.sort_date()));
        Ok(posts)
    }

    async fn find_post(&self, slug: &str) -> Result<Option<PostDetail>, SourceError> {
        Ok(self
            .document
            .posts
            .iter()
            .find(|detail| detail.post.slug == slug)
            .cloned())
    }

    async fn list_guides(&self) -> Result<Vec<GuideRecord>, SourceError> {
        let mut guides: Vec<GuideRecord> = self
            .document
            .guides
            .iter()
            .map(|detail| detail.guide.clone())
            .collect();
        guides.sort_by(|a, b| {
            a.sort_order()
                .cmp(&b.sort_order())
                .then_with(|| compare_titles(&a.title, &b.title))
        });
        Ok(guides)
    }

    async fn find_guide(&self, slug: &str) -> Result<Option<GuideDetail>, SourceError> {
        Ok(self
            .document
            .guides
            .iter()
            .find(|detail| detail.guide.slug == slug)
            .cloned())
    }

    async fn find_page(&self, slug: &str) -> Result<Option<PageDocument>, SourceError> {
        Ok(self
            .document
            .pages
            .iter()
            .find(|page| page.slug == slug)
            .cloned())
    }

    async fn list_slugs(&self, kind: DocumentKind) -> Result<Vec<String>, SourceError> {
        let slugs = match kind {
            DocumentKind::Post => self
                .document
                .posts
                .iter()
                .map(|detail| detail.post.slug.clone())
                .collect(),
            DocumentKind::Guide => self
                .document
                .guides
                .iter()
                .map(|detail| detail.guide.slug.clone())
                .collect(),
            DocumentKind::Page => self.document.pages.iter().map(|page| page.slug.clone()).collect(),
        };
        Ok(slugs)
    }

    async fn site_settings(&self) -> Result<Option<SiteSettings>, SourceError> {
        Ok(self.document.site_settings.clone())
    }
}
