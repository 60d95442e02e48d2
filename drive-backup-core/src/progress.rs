//! Job progress tracking.
//!
//! The pipeline task is the only writer of a job's [`ProgressSnapshot`];
//! any number of observers read it. Every update replaces the record inside a
//! `tokio::sync::watch` channel, so readers always see a whole snapshot and
//! never wait on the pipeline beyond a clone.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::warn;

/// Lifecycle state of a backup job.
///
/// Ordered along the happy path; `Error` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    Starting,
    Initializing,
    ListingFiles,
    Downloading,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Transitions only move forward; terminal states are final.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            JobStatus::Error => true,
            _ => next > self,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Starting => "starting",
            JobStatus::Initializing => "initializing",
            JobStatus::ListingFiles => "listing_files",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable state of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub total_files: usize,
    pub processed_files: usize,
    /// Advisory only; may lag behind the pipeline
    pub current_file: String,
    pub status: JobStatus,
    /// Volume file names, in creation order
    pub volumes: Vec<String>,
    /// Set only when `status` is `error`
    pub error: String,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            total_files: 0,
            processed_files: 0,
            current_file: String::new(),
            status: JobStatus::Idle,
            volumes: Vec::new(),
            error: String::new(),
        }
    }
}

impl ProgressSnapshot {
    pub fn percent_complete(&self) -> f64 {
        if self.total_files == 0 {
            return if self.status == JobStatus::Completed { 100.0 } else { 0.0 };
        }
        (self.processed_files as f64 / self.total_files as f64) * 100.0
    }
}

/// Single-writer, many-reader progress record of one job.
#[derive(Debug)]
pub struct ProgressTracker {
    tx: watch::Sender<ProgressSnapshot>,
    total_known: AtomicBool,
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProgressSnapshot::default());
        Self {
            tx,
            total_known: AtomicBool::new(false),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.tx.borrow().clone()
    }

    pub fn set_total(&self, total: usize) {
        self.total_known.store(true, Ordering::Release);
        self.tx.send_modify(|s| {
            s.total_files = total;
            s.processed_files = s.processed_files.min(total);
        });
    }

    pub fn set_current_file(&self, name: &str) {
        self.tx.send_modify(|s| s.current_file = name.to_string());
    }

    /// Count one more inventory entry as processed.
    pub fn advance(&self, current_file: &str) {
        let bounded = self.total_known.load(Ordering::Acquire);
        self.tx.send_modify(|s| {
            s.current_file = current_file.to_string();
            if bounded && s.processed_files >= s.total_files {
                warn!(processed = s.processed_files, total = s.total_files, "Ignoring advance past total");
                return;
            }
            s.processed_files += 1;
        });
    }

    /// Move to `status`. Backward or post-terminal transitions are ignored.
    pub fn set_status(&self, status: JobStatus) -> bool {
        let mut applied = false;
        self.tx.send_if_modified(|s| {
            if s.status.can_transition_to(status) {
                s.status = status;
                applied = true;
            }
            applied
        });
        if !applied {
            warn!(to = %status, from = %self.snapshot().status, "Rejected status transition");
        }
        applied
    }

    /// Record `message` and move to `error` in one update.
    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_if_modified(|s| {
            if !s.status.can_transition_to(JobStatus::Error) {
                return false;
            }
            s.status = JobStatus::Error;
            s.error = message;
            true
        });
    }

    pub fn append_volume(&self, name: &str) {
        self.tx.send_modify(|s| s.volumes.push(name.to_string()));
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format duration as human-readable string
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
