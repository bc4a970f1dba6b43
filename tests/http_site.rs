use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use httpmock::MockServer;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

use howling_mine::application::{
    content::ContentService,
    repos::{ContentSource, DocumentKind, SourceError},
    mining_stats::MiningStatsService,
    page_builder::RenderMode,
    revalidate::{Revalidator, SIGNATURE_HEADER, sign},
};
use howling_mine::domain::content::{
    GuideDetail, GuideRecord, PageDocument, PostDetail, PostRecord, SiteSettings,
};
use howling_mine::infra::{
    cache::{CACHE_STATUS_HEADER, ResponseCache},
    fixtures::{FixtureContentSource, FixtureDocument},
    http::{REQUEST_ID_HEADER, RouterState, build_router},
    stats::HttpStatsUpstream,
};

const SECRET: &str = "shaft-secret";

fn fixture_document() -> FixtureDocument {
    serde_json::from_value(json!({
        "siteSettings": {
            "title": "The Howling Mine",
            "navigation": [
                {"label": "News", "href": "/news"},
                {"label": "Discord", "href": "https://discord.gg/howl"}
            ],
            "socialLinks": [{"platform": "Discord", "url": "https://discord.gg/howl"}]
        },
        "posts": [
            {
                "_id": "p1", "title": "Season Three", "slug": "season-three",
                "excerpt": "Lower shafts open", "publishedAt": "2024-06-01T12:00:00Z",
                "featured": true,
                "categories": [{"title": "Announcements", "slug": "announcements"}],
                "body": [{"_type": "block", "style": "normal", "children": [{"text": "Bring lanterns."}]}]
            },
            {
                "_id": "p2", "title": "Pool Maintenance", "slug": "pool-maintenance",
                "publishedAt": "2024-05-01T12:00:00Z",
                "categories": [{"title": "Operations", "slug": "operations"}]
            }
        ],
        "guides": [
            {
                "_id": "g1", "title": "First Rig", "slug": "first-rig", "order": 1,
                "difficulty": "beginner",
                "category": {"title": "Hardware", "slug": "hardware"}
            }
        ],
        "pages": [
            {
                "_id": "home", "title": "Home", "slug": "home",
                "sections": [{"_type": "heroSection", "_key": "h", "heading": "Welcome miners"}]
            },
            {
                "_id": "about", "title": "About", "slug": "about",
                "sections": [
                    {"_type": "ctaSection", "_key": "c", "heading": "Join the crew", "buttonLabel": "Discord", "buttonHref": "https://discord.gg/howl"},
                    {"_type": "mysterySection", "_key": "m"}
                ]
            }
        ]
    }))
    .expect("fixture document")
}

struct Site {
    router: Router,
    cache: ResponseCache,
}

fn site_with(stats: MiningStatsService, secret: Option<&str>, mode: RenderMode) -> Site {
    let source = FixtureContentSource::from_document(fixture_document()).expect("fixtures");
    let content = ContentService::new(Arc::new(source));
    let cache = ResponseCache::new(64);
    let state = RouterState::new(
        content,
        "The Howling Mine",
        mode,
        Some(cache.clone()),
        Revalidator::new(secret.map(str::to_string)),
        stats,
    );
    Site {
        router: build_router(state),
        cache,
    }
}

fn site() -> Site {
    site_with(
        MiningStatsService::new(None),
        Some(SECRET),
        RenderMode::Production,
    )
}

fn stats_service(base: &str) -> MiningStatsService {
    let upstream = HttpStatsUpstream::new(
        Url::parse(base).expect("base url"),
        Duration::from_secs(5),
    )
    .expect("upstream client");
    MiningStatsService::new(Some(Arc::new(upstream)))
}

async fn get(router: &Router, uri: &str) -> Response {
    router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response")
}

async fn post_webhook(router: &Router, body: &str, signature: Option<String>) -> Response {
    let mut request = Request::post("/api/revalidate").header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        request = request.header(SIGNATURE_HEADER, signature);
    }
    router
        .clone()
        .oneshot(request.body(Body::from(body.to_string())).expect("request"))
        .await
        .expect("response")
}

async fn body_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

#[tokio::test]
async fn home_renders_sections_and_latest_news() {
    let site = site();
    let response = get(&site.router, "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    let html = body_text(response).await;
    assert!(html.contains("Welcome miners"));
    assert!(html.contains("/news/season-three"));
    assert!(html.contains("target=\"_blank\" rel=\"noopener\""));
}

#[tokio::test]
async fn news_hub_applies_query_criteria() {
    let site = site();
    let html = body_text(get(&site.router, "/news?category=Operations").await).await;

    assert!(html.contains("Pool Maintenance"));
    assert!(!html.contains("/news/season-three"));
    assert!(html.contains("1 of 2 posts"));
    assert!(html.contains("<option value=\"Operations\" selected>"));
}

#[tokio::test]
async fn news_hub_shows_reset_link_when_nothing_matches() {
    let site = site();
    let html = body_text(get(&site.router, "/news?q=nothing-like-this").await).await;

    assert!(html.contains("No matches"));
    assert!(html.contains("Clear filters"));
}

#[tokio::test]
async fn guide_hub_and_detail_render() {
    let site = site();
    let hub = body_text(get(&site.router, "/guides?difficulty=beginner").await).await;
    assert!(hub.contains("First Rig"));
    assert!(hub.contains("badge--beginner"));

    let detail = get(&site.router, "/guides/first-rig").await;
    assert_eq!(detail.status(), StatusCode::OK);
}

#[tokio::test]
async fn post_detail_renders_body() {
    let site = site();
    let response = get(&site.router, "/news/season-three").await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<title>Season Three | The Howling Mine</title>"));
    assert!(html.contains("<p>Bring lanterns.</p>"));
}

#[tokio::test]
async fn missing_documents_are_not_found() {
    let site = site();
    for uri in ["/news/missing", "/guides/missing", "/no-such-page", "/a/b/c"] {
        let response = get(&site.router, uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn home_slug_redirects_to_root() {
    let site = site();
    let response = get(&site.router, "/home").await;

    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(
        response.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
        Some("/")
    );
}

#[tokio::test]
async fn production_pages_skip_unknown_sections() {
    let site = site();
    let html = body_text(get(&site.router, "/about").await).await;

    assert!(html.contains("Join the crew"));
    assert!(!html.contains("mysterySection"));
}

#[tokio::test]
async fn development_pages_show_placeholders() {
    let site = site_with(
        MiningStatsService::new(None),
        Some(SECRET),
        RenderMode::Development,
    );
    let html = body_text(get(&site.router, "/about").await).await;

    assert!(html.contains("mysterySection"));
    assert!(html.contains("section-placeholder"));
}

#[tokio::test]
async fn second_page_view_is_served_from_cache() {
    let site = site();

    let first = get(&site.router, "/news").await;
    assert!(first.headers().get(CACHE_STATUS_HEADER).is_none());
    let second = get(&site.router, "/news").await;
    assert_eq!(
        second.headers().get(CACHE_STATUS_HEADER).and_then(|v| v.to_str().ok()),
        Some("hit")
    );

    let not_found = get(&site.router, "/news/missing").await;
    assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
    assert_eq!(site.cache.len().await, 1);
}

#[tokio::test]
async fn signed_post_webhook_evicts_news_pages() {
    let site = site();
    get(&site.router, "/news").await;
    get(&site.router, "/news/season-three").await;
    get(&site.router, "/guides").await;
    assert_eq!(site.cache.len().await, 3);

    let body = r#"{"_type":"post","slug":{"current":"season-three"}}"#;
    let signature = sign(SECRET, 1_717_243_200, body.as_bytes());
    let response = post_webhook(&site.router, body, Some(signature)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["revalidated"], json!(true));
    assert_eq!(json["paths"], json!(["/news", "/news/season-three", "/"]));
    assert!(json["now"].as_i64().is_some_and(|now| now > 0));

    assert_eq!(site.cache.len().await, 1);
    let guides = get(&site.router, "/guides").await;
    assert!(guides.headers().get(CACHE_STATUS_HEADER).is_some());
}

#[tokio::test]
async fn site_settings_webhook_clears_everything() {
    let site = site();
    get(&site.router, "/news").await;
    get(&site.router, "/guides").await;

    let body = r#"{"_type":"siteSettings"}"#;
    let signature = sign(SECRET, 1, body.as_bytes());
    let response = post_webhook(&site.router, body, Some(signature)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(site.cache.is_empty().await);
}

#[tokio::test]
async fn webhook_rejects_missing_or_forged_signatures() {
    let site = site();
    let body = r#"{"_type":"post","slug":"season-three"}"#;

    let unsigned = post_webhook(&site.router, body, None).await;
    assert_eq!(unsigned.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(unsigned).await["revalidated"], json!(false));

    let forged = sign("other-secret", 1, body.as_bytes());
    let forged = post_webhook(&site.router, body, Some(forged)).await;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);

    let garbled = post_webhook(&site.router, body, Some("v1=abc".to_string())).await;
    assert_eq!(garbled.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_without_secret_is_a_server_error() {
    let site = site_with(MiningStatsService::new(None), None, RenderMode::Production);
    let body = r#"{"_type":"post"}"#;
    let signature = sign(SECRET, 1, body.as_bytes());

    let response = post_webhook(&site.router, body, Some(signature)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn webhook_rejects_signed_garbage() {
    let site = site();
    let body = "not json";
    let signature = sign(SECRET, 1, body.as_bytes());

    let response = post_webhook(&site.router, body, Some(signature)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_proxy_rejects_unknown_period_without_calling_upstream() {
    let server = MockServer::start_async().await;
    let upstream = server
        .mock_async(|when, then| {
            when.method("GET");
            then.status(200);
        })
        .await;
    let site = site_with(
        stats_service(&server.url("/api/mining/")),
        Some(SECRET),
        RenderMode::Production,
    );

    let response = get(&site.router, "/api/mining-stats/2w").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], json!("Invalid period"));
    assert_eq!(
        json["validPeriods"],
        json!(["1h", "3h", "6h", "12h", "24h", "7d", "30d"])
    );
    upstream.assert_calls_async(0).await;
}

#[tokio::test]
async fn stats_proxy_relays_body_with_period_cache_policy() {
    let server = MockServer::start_async().await;
    let upstream = server
        .mock_async(|when, then| {
            when.method("GET").path("/api/mining/7d");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"hashrate":[1,2,3]}"#);
        })
        .await;
    let site = site_with(
        stats_service(&server.url("/api/mining/")),
        Some(SECRET),
        RenderMode::Production,
    );

    let response = get(&site.router, "/api/mining-stats/7d").await;

    upstream.assert_async().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok()),
        Some("public, max-age=1800, stale-while-revalidate=3600")
    );
    assert_eq!(body_json(response).await, json!({"hashrate": [1, 2, 3]}));
}

#[tokio::test]
async fn stats_proxy_passes_upstream_failure_status_through() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/api/mining/1h");
            then.status(503).body("down");
        })
        .await;
    let site = site_with(
        stats_service(&server.url("/api/mining/")),
        Some(SECRET),
        RenderMode::Production,
    );

    let response = get(&site.router, "/api/mining-stats/1h").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Upstream request failed", "status": 503})
    );
}

#[tokio::test]
async fn stats_proxy_reports_unreachable_upstream_as_bad_gateway() {
    let site = site_with(
        stats_service("http://127.0.0.1:1/api/mining/"),
        Some(SECRET),
        RenderMode::Production,
    );

    let response = get(&site.router, "/api/mining-stats/24h").await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Failed to reach mining stats service"})
    );
}

#[tokio::test]
async fn static_assets_are_served() {
    let site = site();
    let response = get(&site.router, "/static/site.css").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("text/css")
    );
}

/// Fixture content behind a switch that makes every read fail.
struct Flaky {
    inner: FixtureContentSource,
    down: Arc<AtomicBool>,
}

impl Flaky {
    fn check(&self) -> Result<(), SourceError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(SourceError::transport("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentSource for Flaky {
    async fn list_posts(&self) -> Result<Vec<PostRecord>, SourceError> {
        self.check()?;
        self.inner.list_posts().await
    }
    async fn find_post(&self, slug: &str) -> Result<Option<PostDetail>, SourceError> {
        self.check()?;
        self.inner.find_post(slug).await
    }
    async fn list_guides(&self) -> Result<Vec<GuideRecord>, SourceError> {
        self.check()?;
        self.inner.list_guides().await
    }
    async fn find_guide(&self, slug: &str) -> Result<Option<GuideDetail>, SourceError> {
        self.check()?;
        self.inner.find_guide(slug).await
    }
    async fn find_page(&self, slug: &str) -> Result<Option<PageDocument>, SourceError> {
        self.check()?;
        self.inner.find_page(slug).await
    }
    async fn list_slugs(&self, kind: DocumentKind) -> Result<Vec<String>, SourceError> {
        self.check()?;
        self.inner.list_slugs(kind).await
    }
    async fn site_settings(&self) -> Result<Option<SiteSettings>, SourceError> {
        self.check()?;
        self.inner.site_settings().await
    }
}

#[tokio::test]
async fn pages_rendered_during_an_outage_are_not_cached() {
    let down = Arc::new(AtomicBool::new(true));
    let source = Flaky {
        inner: FixtureContentSource::from_document(fixture_document()).expect("fixtures"),
        down: down.clone(),
    };
    let cache = ResponseCache::new(64);
    let router = build_router(RouterState::new(
        ContentService::new(Arc::new(source)),
        "The Howling Mine",
        RenderMode::Production,
        Some(cache.clone()),
        Revalidator::new(Some(SECRET.to_string())),
        MiningStatsService::new(None),
    ));

    let during = get(&router, "/news").await;
    assert_eq!(during.status(), StatusCode::OK);
    assert_eq!(
        during
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok()),
        Some("no-store")
    );
    assert!(!body_text(during).await.contains("Pool Maintenance"));
    assert!(cache.is_empty().await);

    down.store(false, Ordering::SeqCst);

    let recovered = get(&router, "/news").await;
    assert!(recovered.headers().get(CACHE_STATUS_HEADER).is_none());
    assert!(recovered.headers().get(header::CACHE_CONTROL).is_none());
    assert!(body_text(recovered).await.contains("Pool Maintenance"));

    let cached = get(&router, "/news").await;
    assert!(cached.headers().get(CACHE_STATUS_HEADER).is_some());
    assert!(body_text(cached).await.contains("Pool Maintenance"));
}
