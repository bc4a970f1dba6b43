use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url, header};

use crate::application::mining_stats::{
    StatsPeriod, StatsUpstream, UpstreamError, UpstreamResponse,
};
use crate::infra::error::InfraError;

/// Fetches `{base}/{period}` from the external statistics service.
#[derive(Clone, Debug)]
pub struct HttpStatsUpstream {
    client: Client,
    base: Url,
}

impl HttpStatsUpstream {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("howling-mine/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self { client, base })
    }

    fn period_url(&self, period: StatsPeriod) -> Result<Url, UpstreamError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::Unreachable(format!("`{}` cannot be a base URL", self.base)))?
            .pop_if_empty()
            .push(period.as_str());
        Ok(url)
    }
}

#[async_trait]
impl StatsUpstream for HttpStatsUpstream {
    async fn fetch(&self, period: StatsPeriod) -> Result<UpstreamResponse, UpstreamError> {
        let url = self.period_url(period)?;
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| UpstreamError::Unreachable(err.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|err| UpstreamError::Unreachable(err.to_string()))?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}
