use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, macros::format_description};

use crate::application::error::{ErrorReport, HttpError};
use crate::application::hub::{
    ALL_FILTER, EmptyState,
    guides::{GuideSort, GuidesListing},
    news::{NewsListing, PostSort},
};
use crate::domain::content::{
    Difficulty, GuideDetail, GuideRecord, ImageRef, PostDetail, PostRecord,
};
use crate::presentation::portable_text::render_blocks;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome.titled("Not found"), ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone, Debug)]
pub struct NavigationView {
    pub entries: Vec<NavigationLinkView>,
}

#[derive(Clone, Debug)]
pub struct SocialLinkView {
    pub label: String,
    pub href: String,
}

#[derive(Clone, Debug)]
pub struct FooterView {
    pub copy: String,
    pub social: Vec<SocialLinkView>,
}

#[derive(Clone, Debug)]
pub struct BrandView {
    pub title: String,
    pub href: String,
}

#[derive(Clone, Debug)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
    /// Opens in a new tab with `rel="noopener"`.
    pub external: bool,
}

#[derive(Clone, Debug)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
}

#[derive(Clone, Debug)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub footer: FooterView,
    pub meta: PageMetaView,
}

impl LayoutChrome {
    /// Prefix the document title with a page title: `"{page} | {site}"`.
    pub fn titled(self, page_title: &str) -> Self {
        let title = format!("{page_title} | {}", self.brand.title);
        Self {
            meta: PageMetaView { title, ..self.meta },
            ..self
        }
    }

    pub fn described(self, description: Option<&str>) -> Self {
        match description {
            Some(description) => Self {
                meta: PageMetaView {
                    description: description.to_string(),
                    ..self.meta
                },
                ..self
            },
            None => self,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub footer: FooterView,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            navigation: chrome.navigation,
            footer: chrome.footer,
            meta: chrome.meta,
            content,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ImageView {
    pub url: String,
    pub alt: String,
}

impl ImageView {
    fn from_ref(image: &ImageRef, fallback_alt: &str) -> Self {
        Self {
            url: image.url.clone(),
            alt: image
                .alt
                .clone()
                .unwrap_or_else(|| fallback_alt.to_string()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PostCardView {
    pub title: String,
    pub href: String,
    pub excerpt: Option<String>,
    pub date_label: Option<String>,
    pub categories: Vec<String>,
    pub cover: Option<ImageView>,
    pub featured: bool,
}

impl PostCardView {
    pub fn from_record(post: &PostRecord) -> Self {
        Self {
            title: post.title.clone(),
            href: format!("/news/{}", post.slug),
            excerpt: post.excerpt.clone(),
            date_label: post.published_at.map(format_date),
            categories: post.category_titles().map(str::to_string).collect(),
            cover: post
                .cover_image
                .as_ref()
                .map(|image| ImageView::from_ref(image, &post.title)),
            featured: post.featured,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GuideCardView {
    pub title: String,
    pub href: String,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<DifficultyBadge>,
}

impl GuideCardView {
    pub fn from_record(guide: &GuideRecord) -> Self {
        Self {
            title: guide.title.clone(),
            href: format!("/guides/{}", guide.slug),
            excerpt: guide.excerpt.clone(),
            category: guide.category_title().map(str::to_string),
            difficulty: guide.difficulty.map(DifficultyBadge::from),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DifficultyBadge {
    pub label: &'static str,
    pub class: &'static str,
}

impl From<Difficulty> for DifficultyBadge {
    fn from(difficulty: Difficulty) -> Self {
        Self {
            label: difficulty.label(),
            class: difficulty.as_str(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FilterOptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

fn category_options(categories: &[String], active: &str) -> Vec<FilterOptionView> {
    std::iter::once(FilterOptionView {
        value: ALL_FILTER.to_string(),
        label: "All categories".to_string(),
        selected: active == ALL_FILTER,
    })
    .chain(categories.iter().map(|title| FilterOptionView {
        value: title.clone(),
        label: title.clone(),
        selected: title == active,
    }))
    .collect()
}

#[derive(Clone, Debug)]
pub struct EmptyStateView {
    pub title: &'static str,
    pub message: String,
    pub reset_href: Option<&'static str>,
}

impl EmptyStateView {
    fn for_state(state: EmptyState, noun: &str, reset_href: &'static str) -> Self {
        match state {
            EmptyState::NoContent => Self {
                title: "Nothing here yet",
                message: format!("No {noun} have been published yet. Check back soon."),
                reset_href: None,
            },
            EmptyState::NoMatches => Self {
                title: "No matches",
                message: format!("No {noun} match these filters."),
                reset_href: Some(reset_href),
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewsHubView {
    pub search: String,
    pub category_options: Vec<FilterOptionView>,
    pub sort_options: Vec<FilterOptionView>,
    pub featured: Option<PostCardView>,
    pub posts: Vec<PostCardView>,
    pub summary: String,
    pub empty: Option<EmptyStateView>,
}

impl NewsHubView {
    pub fn from_listing(listing: &NewsListing<'_>) -> Self {
        let query = &listing.query;
        let sort_options = PostSort::ALL
            .into_iter()
            .map(|sort| FilterOptionView {
                value: sort.as_str().to_string(),
                label: sort.label().to_string(),
                selected: sort == query.sort,
            })
            .collect();

        Self {
            search: query
                .needle
                .as_ref()
                .map(|needle| needle.as_str().to_string())
                .unwrap_or_default(),
            category_options: category_options(&listing.categories, query.category.as_query_value()),
            sort_options,
            featured: listing.featured.map(PostCardView::from_record),
            posts: listing
                .posts
                .iter()
                .map(|post| PostCardView::from_record(post))
                .collect(),
            summary: result_summary(listing.matched(), listing.total, "post", "posts"),
            empty: listing
                .empty_state()
                .map(|state| EmptyStateView::for_state(state, "posts", "/news")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GuidesHubView {
    pub search: String,
    pub category_options: Vec<FilterOptionView>,
    pub difficulty_options: Vec<FilterOptionView>,
    pub sort_options: Vec<FilterOptionView>,
    pub guides: Vec<GuideCardView>,
    pub summary: String,
    pub empty: Option<EmptyStateView>,
}

impl GuidesHubView {
    pub fn from_listing(listing: &GuidesListing<'_>) -> Self {
        let query = &listing.query;
        let active_difficulty = query.difficulty.as_query_value();

        let difficulty_options = std::iter::once(FilterOptionView {
            value: ALL_FILTER.to_string(),
            label: "All levels".to_string(),
            selected: active_difficulty == ALL_FILTER,
        })
        .chain(Difficulty::ALL.into_iter().map(|difficulty| FilterOptionView {
            value: difficulty.as_str().to_string(),
            label: difficulty.label().to_string(),
            selected: difficulty.as_str() == active_difficulty,
        }))
        .collect();

        let sort_options = GuideSort::ALL
            .into_iter()
            .map(|sort| FilterOptionView {
                value: sort.as_str().to_string(),
                label: sort.label().to_string(),
                selected: sort == query.sort,
            })
            .collect();

        Self {
            search: query
                .needle
                .as_ref()
                .map(|needle| needle.as_str().to_string())
                .unwrap_or_default(),
            category_options: category_options(&listing.categories, query.category.as_query_value()),
            difficulty_options,
            sort_options,
            guides: listing
                .guides
                .iter()
                .map(|guide| GuideCardView::from_record(guide))
                .collect(),
            summary: result_summary(listing.guides.len(), listing.total, "guide", "guides"),
            empty: listing
                .empty_state()
                .map(|state| EmptyStateView::for_state(state, "guides", "/guides")),
        }
    }
}

fn result_summary(matched: usize, total: usize, singular: &str, plural: &str) -> String {
    let noun = if total == 1 { singular } else { plural };
    if matched == total {
        format!("{total} {noun}")
    } else {
        format!("{matched} of {total} {noun}")
    }
}

pub fn format_date(date: OffsetDateTime) -> String {
    let format = format_description!("[month repr:long] [day padding:none], [year]");
    date.format(&format).unwrap_or_else(|_| date.date().to_string())
}

#[derive(Clone, Debug)]
pub struct PostDetailView {
    pub title: String,
    pub date_label: Option<String>,
    pub author: Option<String>,
    pub categories: Vec<String>,
    pub cover: Option<ImageView>,
    pub body_html: String,
}

impl PostDetailView {
    pub fn from_detail(detail: &PostDetail) -> Self {
        let post = &detail.post;
        Self {
            title: post.title.clone(),
            date_label: post.published_at.map(format_date),
            author: post.author.as_ref().map(|author| author.name.clone()),
            categories: post.category_titles().map(str::to_string).collect(),
            cover: post
                .cover_image
                .as_ref()
                .map(|image| ImageView::from_ref(image, &post.title)),
            body_html: render_blocks(&detail.body),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GuideDetailView {
    pub title: String,
    pub category: Option<String>,
    pub difficulty: Option<DifficultyBadge>,
    pub cover: Option<ImageView>,
    pub body_html: String,
}

impl GuideDetailView {
    pub fn from_detail(detail: &GuideDetail) -> Self {
        let guide = &detail.guide;
        Self {
            title: guide.title.clone(),
            category: guide.category_title().map(str::to_string),
            difficulty: guide.difficulty.map(DifficultyBadge::from),
            cover: guide
                .cover_image
                .as_ref()
                .map(|image| ImageView::from_ref(image, &guide.title)),
            body_html: render_blocks(&detail.body),
        }
    }
}

/// A page-builder page: each entry is one already-rendered section.
#[derive(Clone, Debug)]
pub struct PageView {
    pub title: String,
    pub sections: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct HomeView {
    /// Rendered sections of the `home` document, when one exists.
    pub sections: Vec<String>,
    pub has_document: bool,
    pub latest: Vec<PostCardView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "This tunnel has collapsed. The page you asked for does not exist."
                .to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to the surface".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub view: LayoutContext<HomeView>,
}

#[derive(Template)]
#[template(path = "news.html")]
pub struct NewsHubTemplate {
    pub view: LayoutContext<NewsHubView>,
}

#[derive(Template)]
#[template(path = "news_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

#[derive(Template)]
#[template(path = "guides.html")]
pub struct GuidesHubTemplate {
    pub view: LayoutContext<GuidesHubView>,
}

#[derive(Template)]
#[template(path = "guide_detail.html")]
pub struct GuideDetailTemplate {
    pub view: LayoutContext<GuideDetailView>,
}

#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub view: LayoutContext<PageView>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
