//! Sanity HTTP query API adapter.
//!
//! Every read is a GROQ query sent as
//! `GET {endpoint}?query=...&$param="json"`. The answer wraps the data in a
//! `result` field, which is `null` when a single-document query matches
//! nothing.

pub mod queries;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url, header};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use crate::application::repos::{ContentSource, DocumentKind, SourceError};
use crate::config::SanitySettings;
use crate::domain::content::{
    GuideDetail, GuideRecord, PageDocument, PostDetail, PostRecord, SiteSettings,
};
use crate::infra::error::InfraError;

const SOURCE: &str = "infra::sanity::SanityClient";
const ERROR_BODY_LIMIT: usize = 240;

#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    result: Option<T>,
}

#[derive(Clone, Debug)]
pub struct SanityClient {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl SanityClient {
    pub fn from_settings(settings: &SanitySettings, timeout: Duration) -> Result<Self, InfraError> {
        let endpoint = query_endpoint(settings)?;
        Self::with_endpoint(endpoint, settings.token.clone(), timeout)
    }

    /// Point the client at an explicit query endpoint.
    pub fn with_endpoint(
        endpoint: Url,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[instrument(skip_all, fields(params = params.len()))]
    async fn query<T: DeserializeOwned>(
        &self,
        groq: &str,
        params: &[(&str, &str)],
    ) -> Result<Option<T>, SourceError> {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", groq);
            for (name, value) in params {
                let encoded = serde_json::to_string(value).map_err(SourceError::decode)?;
                pairs.append_pair(&format!("${name}"), &encoded);
            }
        }

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(SourceError::transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(SourceError::transport)?;

        if status != StatusCode::OK {
            return Err(SourceError::Status {
                status: status.as_u16(),
                message: truncate(&String::from_utf8_lossy(&bytes)),
            });
        }

        debug!(target = SOURCE, bytes = bytes.len(), "query answered");
        let parsed: QueryResponse<T> = serde_json::from_slice(&bytes).map_err(SourceError::decode)?;
        Ok(parsed.result)
    }

    async fn query_list<T: DeserializeOwned>(
        &self,
        groq: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, SourceError> {
        Ok(self.query::<Vec<T>>(groq, params).await?.unwrap_or_default())
    }
}

#[async_trait]
impl ContentSource for SanityClient {
    async fn list_posts(&self) -> Result<Vec<PostRecord>, SourceError> {
        self.query_list(&queries::all_posts(), &[]).await
    }

    async fn find_post(&self, slug: &str) -> Result<Option<PostDetail>, SourceError> {
        self.query(&queries::post_by_slug(), &[("slug", slug)]).await
    }

    async fn list_guides(&self) -> Result<Vec<GuideRecord>, SourceError> {
        self.query_list(&queries::all_guides(), &[]).await
    }

    async fn find_guide(&self, slug: &str) -> Result<Option<GuideDetail>, SourceError> {
        self.query(&queries::guide_by_slug(), &[("slug", slug)]).await
    }

    async fn find_page(&self, slug: &str) -> Result<Option<PageDocument>, SourceError> {
        self.query(queries::PAGE_BY_SLUG, &[("slug", slug)]).await
    }

    async fn list_slugs(&self, kind: DocumentKind) -> Result<Vec<String>, SourceError> {
        self.query_list(queries::SLUGS_BY_TYPE, &[("type", kind.type_name())])
            .await
    }

    async fn site_settings(&self) -> Result<Option<SiteSettings>, SourceError> {
        self.query(queries::SITE_SETTINGS, &[]).await
    }
}

/// `https://{project}.api[cdn].sanity.io/v{version}/data/query/{dataset}`
pub fn query_endpoint(settings: &SanitySettings) -> Result<Url, InfraError> {
    let host = if settings.use_cdn { "apicdn" } else { "api" };
    let version = settings.api_version.trim_start_matches('v');
    let raw = format!(
        "https://{}.{host}.sanity.io/v{version}/data/query/{}",
        settings.project_id, settings.dataset
    );
    Url::parse(&raw).map_err(|err| {
        InfraError::configuration(format!("invalid Sanity endpoint `{raw}`: {err}"))
    })
}

fn user_agent() -> &'static str {
    concat!("howling-mine/", env!("CARGO_PKG_VERSION"))
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((index, _)) => format!("{}…", &body[..index]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(use_cdn: bool) -> SanitySettings {
        SanitySettings {
            project_id: "abc123".to_string(),
            dataset: "production".to_string(),
            api_version: "2024-01-01".to_string(),
            token: None,
            use_cdn,
        }
    }

    #[test]
    fn endpoint_uses_cdn_host_when_enabled() {
        let url = query_endpoint(&settings(true)).expect("url");
        assert_eq!(
            url.as_str(),
            "https://abc123.apicdn.sanity.io/v2024-01-01/data/query/production"
        );

        let url = query_endpoint(&settings(false)).expect("url");
        assert_eq!(url.host_str(), Some("abc123.api.sanity.io"));
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(ERROR_BODY_LIMIT + 10);
        let truncated = truncate(&body);
        assert!(truncated.ends_with('…'));
        assert_eq!(truncated.chars().count(), ERROR_BODY_LIMIT + 1);
    }
}
