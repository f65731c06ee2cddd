use crate::storage::StoragePaths;
use inference::Detector;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<dyn Detector>,
    pub storage: Arc<StoragePaths>,
}

impl AppState {
    pub fn new(detector: Arc<dyn Detector>, storage: StoragePaths) -> Self {
        Self {
            detector,
            storage: Arc::new(storage),
        }
    }
}
