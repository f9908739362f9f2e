//! Transient import job registry.
//!
//! Jobs exist only in memory for the lifetime of one import call; the UI
//! polls them for progress while its import button is disabled.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use common::models::progress::{JobState, ProgressEvent, ProgressSink};
use common::utils::IdGenerator;
use serde::Serialize;
use utoipa::ToSchema;

/// State snapshot of one import job.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImportJobStatus {
    /// Job identifier handed to the UI.
    pub id: String,
    /// Target table name.
    pub table: String,
    /// Lifecycle state.
    pub state: JobState,
    /// Latest progress event.
    pub progress: ProgressEvent,
}

/// In-memory registry of import jobs.
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, ImportJobStatus>>,
}

impl JobRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a new running job and returns its ID.
    pub fn create(&self, table: &str) -> String {
        let id = IdGenerator::job_id();
        let status = ImportJobStatus {
            id: id.clone(),
            table: table.to_string(),
            state: JobState::Running,
            progress: ProgressEvent::new(0, 0, "Preparing import..."),
        };
        self.jobs.write().unwrap().insert(id.clone(), status);
        id
    }

    /// Records the latest progress event for a job.
    pub fn update(&self, id: &str, event: ProgressEvent) {
        if let Some(job) = self.jobs.write().unwrap().get_mut(id) {
            job.progress = event;
        }
    }

    /// Moves a job to a terminal state.
    pub fn finish(&self, id: &str, state: JobState) {
        if let Some(job) = self.jobs.write().unwrap().get_mut(id) {
            job.state = state;
        }
    }

    /// Snapshot of one job.
    pub fn get(&self, id: &str) -> Option<ImportJobStatus> {
        self.jobs.read().unwrap().get(id).cloned()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress sink that records events into the registry.
pub struct JobSink {
    registry: Arc<JobRegistry>,
    job_id: String,
}

impl JobSink {
    /// Creates a sink bound to one job.
    pub fn new(registry: Arc<JobRegistry>, job_id: String) -> Self {
        Self { registry, job_id }
    }
}

impl ProgressSink for JobSink {
    fn report(&self, event: ProgressEvent) {
        self.registry.update(&self.job_id, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_lifecycle() {
        let registry = Arc::new(JobRegistry::new());
        let id = registry.create("cities");

        let sink = JobSink::new(registry.clone(), id.clone());
        sink.report(ProgressEvent::new(500, 1500, "Importing data... 500/1500"));

        let job = registry.get(&id).unwrap();
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.progress.rows_done, 500);

        registry.finish(&id, JobState::Completed);
        assert_eq!(registry.get(&id).unwrap().state, JobState::Completed);
    }

    #[test]
    fn test_unknown_job_is_none() {
        let registry = JobRegistry::new();
        assert!(registry.get("nope").is_none());
    }
}
