//! In-process cache of rendered public pages.
//!
//! Entries are grouped by path so a revalidation can drop every query-string
//! variant of a page at once. The cache is bounded; once full it stops
//! storing until something is invalidated. Every invalidation bumps a
//! generation counter, and a render that started before the bump is not
//! stored.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::application::content::PageReport;

const SOURCE: &str = "infra::cache";

/// Marks a response as served from the cache.
pub const CACHE_STATUS_HEADER: &str = "x-howling-cache";

#[derive(Default)]
struct Entries {
    by_path: HashMap<String, HashMap<String, CachedResponse>>,
    len: usize,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Stored,
    /// The cache is at capacity.
    Full,
    /// An invalidation ran after the render started.
    Stale,
}

#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<RwLock<Entries>>,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Entries::default())),
            max_entries,
        }
    }

    pub async fn get(&self, path: &str, query: &str) -> Option<Response<Body>> {
        let guard = self.entries.read().await;
        guard
            .by_path
            .get(path)
            .and_then(|variants| variants.get(query))
            .cloned()
            .map(CachedResponse::into_response)
    }

    /// Capture before rendering and hand back to [`ResponseCache::put`].
    pub async fn generation(&self) -> u64 {
        self.entries.read().await.generation
    }

    pub async fn put(
        &self,
        path: &str,
        query: &str,
        response: CachedResponse,
        generation: u64,
    ) -> StoreOutcome {
        let mut guard = self.entries.write().await;
        if guard.generation != generation {
            return StoreOutcome::Stale;
        }

        let replacing = guard
            .by_path
            .get(path)
            .is_some_and(|variants| variants.contains_key(query));
        if !replacing && guard.len >= self.max_entries {
            return StoreOutcome::Full;
        }

        guard
            .by_path
            .entry(path.to_string())
            .or_default()
            .insert(query.to_string(), response);
        if !replacing {
            guard.len += 1;
        }
        metrics::gauge!("howling_mine_cache_entries").set(guard.len as f64);
        StoreOutcome::Stored
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every variant of the given paths; returns the number evicted.
    pub async fn invalidate_paths<S: AsRef<str>>(&self, paths: &[S]) -> usize {
        let mut guard = self.entries.write().await;
        let mut evicted = 0;
        for path in paths {
            if let Some(variants) = guard.by_path.remove(path.as_ref()) {
                evicted += variants.len();
            }
        }
        guard.len -= evicted;
        guard.generation += 1;
        record_invalidation(evicted, guard.len);
        evicted
    }

    pub async fn invalidate_all(&self) -> usize {
        let mut guard = self.entries.write().await;
        let evicted = guard.len;
        *guard = Entries {
            generation: guard.generation + 1,
            ..Entries::default()
        };
        record_invalidation(evicted, 0);
        evicted
    }
}

fn record_invalidation(evicted: usize, remaining: usize) {
    metrics::counter!("howling_mine_cache_invalidated_total").increment(evicted as u64);
    metrics::gauge!("howling_mine_cache_entries").set(remaining as f64);
}

#[derive(Clone)]
pub struct CachedResponse {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
    report: Option<PageReport>,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: &axum::http::HeaderMap, body: Bytes) -> Self {
        let headers = headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Self {
            status,
            headers,
            body,
            report: None,
        }
    }

    pub fn with_report(mut self, report: Option<PageReport>) -> Self {
        self.report = report;
        self
    }

    fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        for (name, value) in self.headers {
            headers.append(name, value);
        }
        headers.insert(CACHE_STATUS_HEADER, HeaderValue::from_static("hit"));
        if let Some(report) = self.report {
            response.extensions_mut().insert(report);
        }

        response
    }
}

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("failed to buffer response body: {0}")]
    Buffer(String),
}

/// Only clean 200s are kept: no cookies, no `no-store`, nothing rendered from
/// fallback data.
pub fn should_store_response(response: &Response) -> bool {
    let degraded = response
        .extensions()
        .get::<PageReport>()
        .is_some_and(|report| report.degraded);
    let no_store = response
        .headers()
        .get(header::CACHE_CONTROL)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("no-store"));

    response.status() == StatusCode::OK
        && !response.headers().contains_key(header::SET_COOKIE)
        && !degraded
        && !no_store
}

pub async fn buffer_response(
    response: Response,
) -> Result<(Response, CachedResponse), (Response, CacheStoreError)> {
    let (parts, body) = response.into_parts();
    match BodyExt::collect(body).await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            let cached = CachedResponse::new(parts.status, &parts.headers, bytes.clone())
                .with_report(parts.extensions.get::<PageReport>().copied());
            let rebuilt = Response::from_parts(parts, Body::from(bytes));
            Ok((rebuilt, cached))
        }
        Err(error) => {
            let rebuilt = Response::from_parts(parts, Body::empty());
            Err((rebuilt, CacheStoreError::Buffer(error.to_string())))
        }
    }
}

/// Serves cached GET responses and stores fresh cacheable ones.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<ResponseCache>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or("").to_string();

    if let Some(cached) = cache.get(&path, &query).await {
        debug!(target = SOURCE, outcome = "hit", "serving cached response");
        metrics::counter!("howling_mine_cache_hit_total").increment(1);
        return cached;
    }
    metrics::counter!("howling_mine_cache_miss_total").increment(1);

    let generation = cache.generation().await;
    let response = next.run(request).await;
    if !should_store_response(&response) {
        return response;
    }

    match buffer_response(response).await {
        Ok((rebuilt, cached)) => {
            match cache.put(&path, &query, cached, generation).await {
                StoreOutcome::Stored => {}
                StoreOutcome::Full => {
                    debug!(target = SOURCE, "cache full; response not stored");
                    metrics::counter!("howling_mine_cache_skipped_total", "reason" => "full")
                        .increment(1);
                }
                StoreOutcome::Stale => {
                    debug!(target = SOURCE, "invalidated while rendering; response not stored");
                    metrics::counter!("howling_mine_cache_skipped_total", "reason" => "stale")
                        .increment(1);
                }
            }
            rebuilt
        }
        Err((rebuilt, err)) => {
            warn!(target = SOURCE, error = %err, "response not cached");
            rebuilt
        }
    }
}
