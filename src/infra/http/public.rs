use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};

use crate::{
    application::{
        chrome::ChromeService,
        content::{ContentService, PageKind, PageReport},
        error::HttpError,
        hub::{
            guides::{GuideCriteria, GuidesListing},
            news::{NewsCriteria, NewsListing},
        },
        page_builder::RenderMode,
        routes::HOME_SLUG,
    },
    domain::{content::PageDocument, sections::parse_sections},
    presentation::{
        sections::render_sections,
        views::{
            GuideDetailTemplate, GuideDetailView, GuidesHubTemplate, GuidesHubView, HomeTemplate,
            HomeView, LayoutContext, NewsHubTemplate, NewsHubView, PageTemplate, PageView,
            PostCardView, PostDetailTemplate, PostDetailView, render_not_found_response,
            render_template_response,
        },
    },
};

use super::RouterState;

const LATEST_POSTS_ON_HOME: usize = 3;

#[derive(Clone)]
pub struct HttpState {
    pub content: ContentService,
    pub chrome: ChromeService,
    pub render_mode: RenderMode,
}

/// HTML routes whose output is safe to cache.
pub(super) fn page_routes() -> Router<RouterState> {
    Router::new()
        .route("/", get(index))
        .route("/news", get(news_index))
        .route("/news/{slug}", get(news_detail))
        .route("/guides", get(guides_index))
        .route("/guides/{slug}", get(guide_detail))
        .route("/{slug}", get(page_detail))
        .fallback(fallback)
}

async fn index(State(state): State<HttpState>) -> Response {
    let (chrome, home, posts) = tokio::join!(
        state.chrome.load(),
        state.content.page(HOME_SLUG),
        state.content.posts()
    );
    let degraded = chrome.degraded || home.degraded || posts.degraded;

    let sections = match home.value.as_ref() {
        Some(page) => match render_page_sections(page, state.render_mode) {
            Ok(sections) => sections,
            Err(err) => return err.into_response(),
        },
        None => Vec::new(),
    };

    let content = HomeView {
        sections,
        has_document: home.value.is_some(),
        latest: posts
            .value
            .iter()
            .take(LATEST_POSTS_ON_HOME)
            .map(PostCardView::from_record)
            .collect(),
    };
    let view = LayoutContext::new(chrome.value, content);
    let response = render_template_response(HomeTemplate { view }, StatusCode::OK);
    reported(response, PageKind::Home, degraded)
}

async fn news_index(
    State(state): State<HttpState>,
    Query(criteria): Query<NewsCriteria>,
) -> Response {
    let (chrome, posts) = tokio::join!(state.chrome.load(), state.content.posts());
    let degraded = chrome.degraded || posts.degraded;
    let listing = NewsListing::build(&posts.value, &criteria);

    let view = LayoutContext::new(
        chrome.value.titled("News"),
        NewsHubView::from_listing(&listing),
    );
    let response = render_template_response(NewsHubTemplate { view }, StatusCode::OK);
    reported(response, PageKind::NewsHub, degraded)
}

async fn news_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    let (chrome, detail) = tokio::join!(state.chrome.load(), state.content.post(&slug));
    let degraded = chrome.degraded || detail.degraded;
    let Some(detail) = detail.value else {
        return reported(
            render_not_found_response(chrome.value),
            PageKind::NotFound,
            degraded,
        );
    };

    let chrome = chrome
        .value
        .titled(&detail.post.title)
        .described(detail.post.excerpt.as_deref());
    let view = LayoutContext::new(chrome, PostDetailView::from_detail(&detail));
    let response = render_template_response(PostDetailTemplate { view }, StatusCode::OK);
    reported(response, PageKind::NewsDetail, degraded)
}

async fn guides_index(
    State(state): State<HttpState>,
    Query(criteria): Query<GuideCriteria>,
) -> Response {
    let (chrome, guides) = tokio::join!(state.chrome.load(), state.content.guides());
    let degraded = chrome.degraded || guides.degraded;
    let listing = GuidesListing::build(&guides.value, &criteria);

    let view = LayoutContext::new(
        chrome.value.titled("Guides"),
        GuidesHubView::from_listing(&listing),
    );
    let response = render_template_response(GuidesHubTemplate { view }, StatusCode::OK);
    reported(response, PageKind::GuidesHub, degraded)
}

async fn guide_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    let (chrome, detail) = tokio::join!(state.chrome.load(), state.content.guide(&slug));
    let degraded = chrome.degraded || detail.degraded;
    let Some(detail) = detail.value else {
        return reported(
            render_not_found_response(chrome.value),
            PageKind::NotFound,
            degraded,
        );
    };

    let chrome = chrome
        .value
        .titled(&detail.guide.title)
        .described(detail.guide.excerpt.as_deref());
    let view = LayoutContext::new(chrome, GuideDetailView::from_detail(&detail));
    let response = render_template_response(GuideDetailTemplate { view }, StatusCode::OK);
    reported(response, PageKind::GuideDetail, degraded)
}

async fn page_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    if slug == HOME_SLUG {
        return Redirect::permanent("/").into_response();
    }

    let (chrome, page) = tokio::join!(state.chrome.load(), state.content.page(&slug));
    let degraded = chrome.degraded || page.degraded;
    let Some(page) = page.value else {
        return reported(
            render_not_found_response(chrome.value),
            PageKind::NotFound,
            degraded,
        );
    };

    let sections = match render_page_sections(&page, state.render_mode) {
        Ok(sections) => sections,
        Err(err) => return err.into_response(),
    };

    let view = LayoutContext::new(
        chrome.value.titled(&page.title),
        PageView {
            title: page.title.clone(),
            sections,
        },
    );
    let response = render_template_response(PageTemplate { view }, StatusCode::OK);
    reported(response, PageKind::Page, degraded)
}

async fn fallback(State(state): State<HttpState>) -> Response {
    let chrome = state.chrome.load().await;
    reported(
        render_not_found_response(chrome.value),
        PageKind::NotFound,
        chrome.degraded,
    )
}

/// Tags a rendered page with its kind. Pages built from fallback data also
/// carry `Cache-Control: no-store`.
fn reported(mut response: Response, kind: PageKind, degraded: bool) -> Response {
    if degraded {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }
    response
        .extensions_mut()
        .insert(PageReport { kind, degraded });
    response
}

fn render_page_sections(page: &PageDocument, mode: RenderMode) -> Result<Vec<String>, HttpError> {
    let entries = parse_sections(&page.sections);
    render_sections(&entries, mode).map_err(HttpError::from)
}
