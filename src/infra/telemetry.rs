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
            "taccuino_article_cache_hit_total",
            Unit::Count,
            "Article requests served from the render cache."
        );
        describe_counter!(
            "taccuino_article_cache_miss_total",
            Unit::Count,
            "Article requests that had to render the source file."
        );
        describe_counter!(
            "taccuino_article_cache_clear_total",
            Unit::Count,
            "Full clears of the render cache after a content refresh."
        );
        describe_counter!(
            "taccuino_catalog_rebuild_total",
            Unit::Count,
            "Successful catalog rebuilds."
        );
        describe_counter!(
            "taccuino_webhook_rejected_total",
            Unit::Count,
            "Webhook deliveries rejected for a bad signature."
        );
    });
}
