mod api;
mod middleware;
mod public;

pub use api::ApiState;
pub use middleware::{REQUEST_ID_HEADER, RequestContext};
pub use public::HttpState;

use axum::{Router, extract::FromRef, middleware as axum_middleware, routing::get};

use crate::application::{
    chrome::ChromeService, content::ContentService, mining_stats::MiningStatsService,
    page_builder::RenderMode, revalidate::Revalidator,
};
use crate::infra::cache::{ResponseCache, response_cache_layer};

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct RouterState {
    pub http: HttpState,
    pub api: ApiState,
}

impl RouterState {
    pub fn new(
        content: ContentService,
        site_title: &str,
        render_mode: RenderMode,
        cache: Option<ResponseCache>,
        revalidator: Revalidator,
        stats: MiningStatsService,
    ) -> Self {
        let chrome = ChromeService::new(content.clone(), site_title);
        Self {
            http: HttpState {
                content,
                chrome,
                render_mode,
            },
            api: ApiState {
                revalidator,
                stats,
                cache,
            },
        }
    }

    fn page_cache(&self) -> Option<ResponseCache> {
        self.api.cache.clone()
    }
}

impl FromRef<RouterState> for HttpState {
    fn from_ref(state: &RouterState) -> Self {
        state.http.clone()
    }
}

impl FromRef<RouterState> for ApiState {
    fn from_ref(state: &RouterState) -> Self {
        state.api.clone()
    }
}

/// Assemble the full site: cached HTML pages, the API routes and static
/// assets, wrapped in request-id and response-logging middleware.
pub fn build_router(state: RouterState) -> Router {
    let pages = public::page_routes();
    let pages = match state.page_cache() {
        Some(cache) => pages.layer(axum_middleware::from_fn_with_state(
            cache,
            response_cache_layer,
        )),
        None => pages,
    };

    let uncached = api::api_routes().route(
        "/static/{*path}",
        get(crate::infra::assets::serve_static),
    );

    pages
        .merge(uncached)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
