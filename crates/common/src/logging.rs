use crate::config::Environment;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// `RUST_LOG` filter, defaulting to `info`.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the global tracing subscriber: JSON lines in production,
/// pretty coloured output in development.
///
/// Use [`crate::TelemetryGuard::init`] instead when an OTLP collector is
/// configured; it installs the same formatting plus the exporter bridge.
pub fn setup_logging(environment: Environment) {
    let (json, pretty) = match environment {
        Environment::Production => (
            Some(tracing_subscriber::fmt::layer().json().with_level(true)),
            None,
        ),
        Environment::Development => (
            None,
            Some(tracing_subscriber::fmt::layer().pretty().with_ansi(true)),
        ),
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(json)
        .with(pretty)
        .init();
}
