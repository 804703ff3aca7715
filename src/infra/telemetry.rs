use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
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
            "storefront_cache_hit_total",
            Unit::Count,
            "Response cache lookups served from the store."
        );
        describe_counter!(
            "storefront_cache_miss_total",
            Unit::Count,
            "Response cache lookups that found no live entry."
        );
        describe_counter!(
            "storefront_cache_store_total",
            Unit::Count,
            "Responses written to the cache."
        );
        describe_counter!(
            "storefront_cache_invalidated_total",
            Unit::Count,
            "Cache entries removed by prefix invalidation."
        );
        describe_counter!(
            "storefront_cache_error_total",
            Unit::Count,
            "Cache store failures absorbed by the facade."
        );
        describe_counter!(
            "storefront_cache_swept_total",
            Unit::Count,
            "Expired cache entries removed by the background sweeper."
        );
        describe_counter!(
            "storefront_cache_evicted_total",
            Unit::Count,
            "Cache entries evicted to stay within the configured capacity."
        );
    });
}
