//! Import progress models.
//!
//! Long operations stream `(rows done, rows total, message)` triples to a
//! sink; the UI polls the owning job for the latest event.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single progress report from a running import.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProgressEvent {
    /// Rows written so far.
    pub rows_done: usize,
    /// Total rows in the job.
    pub rows_total: usize,
    /// Human-readable status text.
    pub message: String,
}

impl ProgressEvent {
    /// Creates a new progress event.
    pub fn new(rows_done: usize, rows_total: usize, message: impl Into<String>) -> Self {
        Self {
            rows_done,
            rows_total,
            message: message.into(),
        }
    }
}

/// Lifecycle state of an import job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// The job is still writing batches.
    Running,
    /// The job finished successfully.
    Completed,
    /// The job aborted; rows from completed batches remain in the table.
    Failed,
}

/// Receiver for progress events emitted during a long operation.
///
/// Implementations must be cheap: the loader reports before every batch.
pub trait ProgressSink: Send + Sync {
    /// Delivers one progress event.
    fn report(&self, event: ProgressEvent);
}
