pub mod annotate;
pub mod backend;
pub mod config;
pub mod processing;
pub mod service;

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, InferenceOutput};
pub use config::{ExecutionProvider, InferenceConfig};
pub use processing::post::Detection;
pub use service::{DetectionService, Detector, Prediction};
