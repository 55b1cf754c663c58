use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
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
            "veridia_payment_verified_total",
            Unit::Count,
            "Total number of payment signatures accepted."
        );
        describe_counter!(
            "veridia_payment_rejected_total",
            Unit::Count,
            "Total number of payment signatures rejected."
        );
        describe_counter!(
            "veridia_webhook_received_total",
            Unit::Count,
            "Total number of payment webhook deliveries received."
        );
        describe_counter!(
            "veridia_webhook_rejected_total",
            Unit::Count,
            "Total number of payment webhook deliveries with a bad signature."
        );
        describe_counter!(
            "veridia_email_sent_total",
            Unit::Count,
            "Total number of outbound emails accepted by the provider."
        );
        describe_counter!(
            "veridia_email_failed_total",
            Unit::Count,
            "Total number of outbound emails that failed to deliver."
        );
        describe_histogram!(
            "veridia_provider_request_ms",
            Unit::Milliseconds,
            "Latency of outbound payment and mail provider requests."
        );
    });
}
