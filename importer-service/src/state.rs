//! Application state for the importer service.

use std::sync::Arc;

use common::config::AppConfig;

use crate::datasets::DatasetStore;
use crate::jobs::JobRegistry;
use crate::session::SessionManager;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub session: Arc<SessionManager>,
    pub datasets: Arc<DatasetStore>,
    pub jobs: Arc<JobRegistry>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(config: AppConfig) -> Self {
        Self {
            session: Arc::new(SessionManager::new(config.clone())),
            datasets: Arc::new(DatasetStore::new()),
            jobs: Arc::new(JobRegistry::new()),
            config,
        }
    }
}
