use anyhow::Context;
use inference::InferenceConfig;
use std::env;
use std::path::PathBuf;

pub use common::Environment;

pub const DEFAULT_PORT: u16 = 7860;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub static_root: PathBuf,
    pub max_upload_bytes: usize,
    pub otel_endpoint: Option<String>,
    pub inference: InferenceConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = match env::var("PORT") {
            Ok(value) => value
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got {:?}", value))?,
            Err(_) => DEFAULT_PORT,
        };

        let static_root = env::var("STATIC_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("static"));

        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let otel_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .filter(|s| !s.is_empty());

        let inference = InferenceConfig::from_env()?;

        Ok(Self {
            environment,
            host,
            port,
            static_root,
            max_upload_bytes,
            otel_endpoint,
            inference,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
