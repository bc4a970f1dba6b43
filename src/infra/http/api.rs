use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::info;

use crate::{
    application::{
        error::ErrorReport,
        mining_stats::MiningStatsService,
        revalidate::{
            InvalidationScope, RevalidateError, RevalidateResponse, Revalidator, SIGNATURE_HEADER,
            plan,
        },
    },
    infra::cache::ResponseCache,
};

use super::RouterState;

const REVALIDATE_SOURCE: &str = "infra::http::api::revalidate";
const STATS_SOURCE: &str = "infra::http::api::mining_stats";

#[derive(Clone)]
pub struct ApiState {
    pub revalidator: Revalidator,
    pub stats: MiningStatsService,
    /// Page cache to invalidate; `None` when caching is disabled.
    pub cache: Option<ResponseCache>,
}

pub(super) fn api_routes() -> Router<RouterState> {
    Router::new()
        .route("/api/revalidate", post(revalidate))
        .route("/api/mining-stats/{period}", get(mining_stats))
}

#[derive(Serialize)]
struct RevalidateFailure {
    revalidated: bool,
    message: &'static str,
}

async fn revalidate(State(state): State<ApiState>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let payload = match state.revalidator.authorize(signature, &body) {
        Ok(payload) => payload,
        Err(err) => return revalidate_failure(&err),
    };

    let plan = plan(&payload.kind, payload.slug());
    let evicted = match (&state.cache, plan.scope) {
        (Some(cache), InvalidationScope::Everything) => cache.invalidate_all().await,
        (Some(cache), InvalidationScope::Paths) => {
            cache.invalidate_paths(plan.paths.as_slice()).await
        }
        (None, _) => 0,
    };

    info!(
        target = REVALIDATE_SOURCE,
        document_type = %payload.kind,
        slug = payload.slug().unwrap_or(""),
        paths = ?plan.paths,
        evicted,
        "revalidated"
    );
    metrics::counter!("howling_mine_revalidate_requests_total", "outcome" => "ok").increment(1);

    Json(RevalidateResponse::completed(plan.paths)).into_response()
}

fn revalidate_failure(err: &RevalidateError) -> Response {
    let (status, message, outcome) = match err {
        RevalidateError::MissingSecret => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Revalidation is not configured",
            "misconfigured",
        ),
        RevalidateError::MissingSignature
        | RevalidateError::MalformedSignature(_)
        | RevalidateError::SignatureMismatch => {
            (StatusCode::UNAUTHORIZED, "Invalid signature", "unauthorized")
        }
        RevalidateError::InvalidPayload(_) => {
            (StatusCode::BAD_REQUEST, "Invalid payload", "bad_request")
        }
    };
    metrics::counter!("howling_mine_revalidate_requests_total", "outcome" => outcome).increment(1);

    let mut response = (
        status,
        Json(RevalidateFailure {
            revalidated: false,
            message,
        }),
    )
        .into_response();
    ErrorReport::from_error(REVALIDATE_SOURCE, status, err).attach(&mut response);
    response
}

async fn mining_stats(State(state): State<ApiState>, Path(period): Path<String>) -> Response {
    match state.stats.fetch(&period).await {
        Ok(payload) => {
            let mut response = Response::new(Body::from(payload.body));
            let headers = response.headers_mut();
            let content_type = payload
                .content_type
                .as_deref()
                .and_then(|value| HeaderValue::from_str(value).ok())
                .unwrap_or_else(|| HeaderValue::from_static("application/json"));
            headers.insert(header::CONTENT_TYPE, content_type);
            if let Ok(value) = HeaderValue::from_str(&payload.cache_policy.header_value()) {
                headers.insert(header::CACHE_CONTROL, value);
            }
            response
        }
        Err(err) => {
            let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::BAD_GATEWAY);
            let mut response = (status, Json(err.body())).into_response();
            ErrorReport::from_error(STATS_SOURCE, status, &err).attach(&mut response);
            response
        }
    }
}
