use crate::config::ServerConfig;
use common::TelemetryGuard;

/// Install the global subscriber, exporting to OTLP when an endpoint is
/// configured. Keep the returned guard alive for the lifetime of the process.
pub fn setup_logging(config: &ServerConfig) -> anyhow::Result<Option<TelemetryGuard>> {
    match &config.otel_endpoint {
        Some(endpoint) => Ok(Some(TelemetryGuard::init(
            "server",
            endpoint,
            config.environment,
        )?)),
        None => {
            common::setup_logging(config.environment);
            Ok(None)
        }
    }
}
