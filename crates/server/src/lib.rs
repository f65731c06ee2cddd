pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod state;
pub mod storage;

pub use config::ServerConfig;
pub use routes::router;
pub use state::AppState;
pub use storage::StoragePaths;
