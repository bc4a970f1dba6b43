use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::{content::PageReport, error::ErrorReport};
use crate::infra::cache::CACHE_STATUS_HEADER;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const TARGET: &str = "howling_mine::http::response";

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

/// What the site knows about a finished request beyond its status.
struct Served {
    page: &'static str,
    degraded: bool,
    cached: bool,
}

impl Served {
    fn from_response(response: &Response) -> Self {
        let report = response.extensions().get::<PageReport>();
        Self {
            page: report.map_or("api", |report| report.kind.as_str()),
            degraded: report.is_some_and(|report| report.degraded),
            cached: response.headers().contains_key(CACHE_STATUS_HEADER),
        }
    }
}

/// Logs every page with its kind and cache state. Pages rendered from
/// fallback data are warnings even when they answer 200; failures carry the
/// attached [`ErrorReport`].
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();
    let served = Served::from_response(&response);

    if !(status.is_client_error() || status.is_server_error()) {
        if served.degraded {
            warn!(
                target: TARGET,
                status = status.as_u16(),
                %method,
                %path,
                page = served.page,
                elapsed_ms,
                %request_id,
                "served page from fallback content",
            );
        } else {
            debug!(
                target: TARGET,
                status = status.as_u16(),
                %method,
                %path,
                page = served.page,
                cached = served.cached,
                elapsed_ms,
                "served",
            );
        }
        return response;
    }

    let (source, chain) = match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = chain
        .first()
        .map(String::as_str)
        .unwrap_or("no diagnostic available");

    if status.is_server_error() {
        error!(
            target: TARGET,
            status = status.as_u16(),
            %method,
            %path,
            page = served.page,
            degraded = served.degraded,
            elapsed_ms,
            source,
            detail,
            chain = ?chain,
            %request_id,
            "request failed",
        );
    } else if status == StatusCode::NOT_FOUND && served.degraded {
        warn!(
            target: TARGET,
            %method,
            %path,
            page = served.page,
            elapsed_ms,
            %request_id,
            "not found while content source was unavailable",
        );
    } else {
        warn!(
            target: TARGET,
            status = status.as_u16(),
            %method,
            %path,
            page = served.page,
            elapsed_ms,
            source,
            detail,
            %request_id,
            "client request error",
        );
    }

    response
}
