//! The fetch-layer seam: typed read queries over the CMS.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::content::{
    GuideDetail, GuideRecord, PageDocument, PostDetail, PostRecord, SiteSettings,
};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("content source unreachable: {0}")]
    Transport(String),
    #[error("content source answered with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("content source returned an unreadable document: {0}")]
    Decode(String),
    #[error("content source misconfigured: {0}")]
    Misconfigured(String),
}

impl SourceError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Document types that own public routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Post,
    Guide,
    Page,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [DocumentKind::Post, DocumentKind::Guide, DocumentKind::Page];

    /// The CMS `_type` name.
    pub fn type_name(self) -> &'static str {
        match self {
            DocumentKind::Post => "post",
            DocumentKind::Guide => "guide",
            DocumentKind::Page => "page",
        }
    }
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Published posts, newest first, with categories resolved.
    async fn list_posts(&self) -> Result<Vec<PostRecord>, SourceError>;

    async fn find_post(&self, slug: &str) -> Result<Option<PostDetail>, SourceError>;

    /// Guides in manual order, with their category resolved.
    async fn list_guides(&self) -> Result<Vec<GuideRecord>, SourceError>;

    async fn find_guide(&self, slug: &str) -> Result<Option<GuideDetail>, SourceError>;

    async fn find_page(&self, slug: &str) -> Result<Option<PageDocument>, SourceError>;

    async fn list_slugs(&self, kind: DocumentKind) -> Result<Vec<String>, SourceError>;

    async fn site_settings(&self) -> Result<Option<SiteSettings>, SourceError>;
}
