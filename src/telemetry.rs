use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when it is set.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let registry = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }

    tracing::info!("PBL tracker telemetry initialized with structured logging");
    Ok(())
}

/// Generate a correlation ID for linking related operations
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a span with common request attributes; the user is recorded once resolved
pub fn create_request_span(operation: &str, correlation_id: &str) -> tracing::Span {
    tracing::info_span!(
        "http_request",
        operation = operation,
        user.id = tracing::field::Empty,
        correlation.id = correlation_id,
        otel.kind = "server"
    )
}

/// Shutdown telemetry gracefully
pub fn shutdown_telemetry() {
    // Structured logging needs no explicit flush
    tracing::info!("PBL tracker telemetry shutdown complete");
}
