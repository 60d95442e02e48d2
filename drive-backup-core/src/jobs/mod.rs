//! Backup jobs: registry, lifecycle and retention.

pub mod lifecycle;
pub mod registry;
pub mod retention;

pub use lifecycle::JobManager;
pub use registry::JobRegistry;
pub use retention::start_retention_sweep;

use crate::progress::{JobStatus, ProgressTracker};
use crate::utils::errors::{EngineError, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// One backup run.
#[derive(Debug)]
pub struct Job {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Holds this job's volumes; removed with the job
    pub dir: PathBuf,
    pub progress: ProgressTracker,
    /// Fired when the job is dropped from the registry
    pub cancel: CancellationToken,
}

impl Job {
    pub fn new(id: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self::created_at(id, dir, Utc::now())
    }

    pub fn created_at(id: impl Into<String>, dir: impl Into<PathBuf>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at,
            dir: dir.into(),
            progress: ProgressTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Fails once the job has been cancelled.
    pub fn ensure_live(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled(format!("job {} expired and was removed", self.id)));
        }
        Ok(())
    }

    pub fn status(&self) -> JobStatus {
        self.progress.snapshot().status
    }

    pub fn is_active(&self) -> bool {
        !self.status().is_terminal()
    }
}
