use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global subscriber: env filter, span traces for errors, and a
/// JSON or compact formatter.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "howling_mine_cache_hit_total",
            Unit::Count,
            "Rendered pages served from the response cache."
        );
        describe_counter!(
            "howling_mine_cache_miss_total",
            Unit::Count,
            "Cacheable requests rendered because no entry existed."
        );
        describe_counter!(
            "howling_mine_cache_skipped_total",
            Unit::Count,
            "Responses not stored, labelled by reason (full cache or stale render)."
        );
        describe_counter!(
            "howling_mine_cache_invalidated_total",
            Unit::Count,
            "Cache entries evicted by revalidation."
        );
        describe_gauge!(
            "howling_mine_cache_entries",
            Unit::Count,
            "Entries currently held by the response cache."
        );
        describe_counter!(
            "howling_mine_revalidate_requests_total",
            Unit::Count,
            "Revalidation webhook calls, labelled by outcome."
        );
        describe_counter!(
            "howling_mine_stats_upstream_failures_total",
            Unit::Count,
            "Mining-stats upstream failures, labelled by kind."
        );
        describe_counter!(
            "howling_mine_content_degraded_total",
            Unit::Count,
            "Content reads that fell back to an empty result."
        );
    });
}
