//! Mining-statistics proxy policy.
//!
//! Periods form a closed set; each carries its own browser/CDN cache window.
//! The upstream body is forwarded untouched.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

const SOURCE: &str = "application::mining_stats::MiningStatsService";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsPeriod {
    OneHour,
    ThreeHours,
    SixHours,
    TwelveHours,
    OneDay,
    SevenDays,
    ThirtyDays,
}

impl StatsPeriod {
    pub const ALL: [StatsPeriod; 7] = [
        StatsPeriod::OneHour,
        StatsPeriod::ThreeHours,
        StatsPeriod::SixHours,
        StatsPeriod::TwelveHours,
        StatsPeriod::OneDay,
        StatsPeriod::SevenDays,
        StatsPeriod::ThirtyDays,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatsPeriod::OneHour => "1h",
            StatsPeriod::ThreeHours => "3h",
            StatsPeriod::SixHours => "6h",
            StatsPeriod::TwelveHours => "12h",
            StatsPeriod::OneDay => "24h",
            StatsPeriod::SevenDays => "7d",
            StatsPeriod::ThirtyDays => "30d",
        }
    }

    /// Exact, case-sensitive match against the public period names.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|period| period.as_str() == value)
    }

    pub fn valid_values() -> Vec<&'static str> {
        Self::ALL.iter().map(|period| period.as_str()).collect()
    }

    pub fn cache_policy(self) -> CachePolicy {
        let (max_age, stale_while_revalidate) = match self {
            StatsPeriod::OneHour => (60, 120),
            StatsPeriod::ThreeHours => (120, 300),
            StatsPeriod::SixHours => (300, 600),
            StatsPeriod::TwelveHours => (600, 1200),
            StatsPeriod::OneDay => (900, 1800),
            StatsPeriod::SevenDays => (1800, 3600),
            StatsPeriod::ThirtyDays => (3600, 7200),
        };
        CachePolicy {
            max_age,
            stale_while_revalidate,
        }
    }
}

impl fmt::Display for StatsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub max_age: u32,
    pub stale_while_revalidate: u32,
}

impl CachePolicy {
    pub fn header_value(&self) -> String {
        format!(
            "public, max-age={}, stale-while-revalidate={}",
            self.max_age, self.stale_while_revalidate
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("stats upstream unreachable: {0}")]
    Unreachable(String),
}

#[async_trait]
pub trait StatsUpstream: Send + Sync {
    async fn fetch(&self, period: StatsPeriod) -> Result<UpstreamResponse, UpstreamError>;
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("invalid period `{0}`")]
    InvalidPeriod(String),
    #[error("stats upstream is not configured")]
    NotConfigured,
    #[error("stats upstream answered with status {0}")]
    UpstreamStatus(u16),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// JSON error bodies returned by the proxy route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StatsErrorBody {
    InvalidPeriod {
        error: &'static str,
        #[serde(rename = "validPeriods")]
        valid_periods: Vec<&'static str>,
    },
    Upstream {
        error: &'static str,
        status: u16,
    },
    Message {
        error: &'static str,
    },
}

impl StatsError {
    /// HTTP status the proxy answers with for this failure.
    pub fn status(&self) -> u16 {
        match self {
            StatsError::InvalidPeriod(_) => 400,
            StatsError::NotConfigured => 500,
            StatsError::UpstreamStatus(status) => *status,
            StatsError::Upstream(_) => 502,
        }
    }

    pub fn body(&self) -> StatsErrorBody {
        match self {
            StatsError::InvalidPeriod(_) => StatsErrorBody::InvalidPeriod {
                error: "Invalid period",
                valid_periods: StatsPeriod::valid_values(),
            },
            StatsError::NotConfigured => StatsErrorBody::Message {
                error: "Mining stats service is not configured",
            },
            StatsError::UpstreamStatus(status) => StatsErrorBody::Upstream {
                error: "Upstream request failed",
                status: *status,
            },
            StatsError::Upstream(_) => StatsErrorBody::Message {
                error: "Failed to reach mining stats service",
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsPayload {
    pub period: StatsPeriod,
    pub cache_policy: CachePolicy,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct MiningStatsService {
    upstream: Option<Arc<dyn StatsUpstream>>,
}

impl MiningStatsService {
    pub fn new(upstream: Option<Arc<dyn StatsUpstream>>) -> Self {
        Self { upstream }
    }

    pub async fn fetch(&self, raw_period: &str) -> Result<StatsPayload, StatsError> {
        let period = StatsPeriod::parse(raw_period)
            .ok_or_else(|| StatsError::InvalidPeriod(raw_period.to_string()))?;
        let upstream = self.upstream.as_ref().ok_or(StatsError::NotConfigured)?;

        let response = upstream.fetch(period).await.inspect_err(|err| {
            warn!(target = SOURCE, period = %period, error = %err, "stats upstream unreachable");
            metrics::counter!("howling_mine_stats_upstream_failures_total", "kind" => "network")
                .increment(1);
        })?;

        if !(200..300).contains(&response.status) {
            warn!(
                target = SOURCE,
                period = %period,
                status = response.status,
                "stats upstream rejected request"
            );
            metrics::counter!("howling_mine_stats_upstream_failures_total", "kind" => "status")
                .increment(1);
            return Err(StatsError::UpstreamStatus(response.status));
        }

        Ok(StatsPayload {
            period,
            cache_policy: period.cache_policy(),
            content_type: response.content_type,
            body: response.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(Result<UpstreamResponse, &'static str>);

    #[async_trait]
    impl StatsUpstream for Canned {
        async fn fetch(&self, _period: StatsPeriod) -> Result<UpstreamResponse, UpstreamError> {
            self.0
                .clone()
                .map_err(|reason| UpstreamError::Unreachable(reason.to_string()))
        }
    }

    fn service(response: Result<UpstreamResponse, &'static str>) -> MiningStatsService {
        MiningStatsService::new(Some(Arc::new(Canned(response))))
    }

    fn ok_body(status: u16) -> Result<UpstreamResponse, &'static str> {
        Ok(UpstreamResponse {
            status,
            content_type: Some("application/json".to_string()),
            body: Bytes::from_static(br#"{"totalOre":12}"#),
        })
    }

    #[test]
    fn periods_parse_exactly() {
        assert_eq!(StatsPeriod::parse("24h"), Some(StatsPeriod::OneDay));
        assert_eq!(StatsPeriod::parse("24H"), None);
        assert_eq!(StatsPeriod::parse("2h"), None);
        assert_eq!(
            StatsPeriod::valid_values(),
            vec!["1h", "3h", "6h", "12h", "24h", "7d", "30d"]
        );
    }

    #[test]
    fn longer_windows_cache_longer() {
        let ages: Vec<u32> = StatsPeriod::ALL
            .iter()
            .map(|period| period.cache_policy().max_age)
            .collect();
        assert!(ages.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(
            StatsPeriod::OneHour.cache_policy().header_value(),
            "public, max-age=60, stale-while-revalidate=120"
        );
    }

    #[tokio::test]
    async fn forwards_body_with_policy() {
        let payload = service(ok_body(200)).fetch("7d").await.expect("payload");
        assert_eq!(payload.period, StatsPeriod::SevenDays);
        assert_eq!(payload.cache_policy.max_age, 1800);
        assert_eq!(payload.body, Bytes::from_static(br#"{"totalOre":12}"#));
    }

    #[tokio::test]
    async fn invalid_period_is_rejected_before_upstream() {
        let err = service(Err("unused")).fetch("forever").await.unwrap_err();
        assert_eq!(err.status(), 400);
        let body = serde_json::to_value(err.body()).expect("json");
        assert_eq!(body["error"], "Invalid period");
        assert_eq!(body["validPeriods"][0], "1h");
    }

    #[tokio::test]
    async fn upstream_status_passes_through() {
        let err = service(ok_body(503)).fetch("1h").await.unwrap_err();
        assert_eq!(err.status(), 503);
        let body = serde_json::to_value(err.body()).expect("json");
        assert_eq!(body["status"], 503);
    }

    #[tokio::test]
    async fn network_failure_is_bad_gateway() {
        let err = service(Err("timed out")).fetch("1h").await.unwrap_err();
        assert_eq!(err.status(), 502);
    }

    #[tokio::test]
    async fn missing_upstream_is_misconfiguration() {
        let err = MiningStatsService::new(None)
            .fetch("1h")
            .await
            .unwrap_err();
        assert_eq!(err.status(), 500);
    }
}
