//! Shared map of live jobs, keyed by job id.

use super::Job;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: DashMap<String, Arc<Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Arc<Job>) {
        self.jobs.insert(job.id.clone(), job);
    }

    pub fn get(&self, job_id: &str) -> Option<Arc<Job>> {
        self.jobs.get(job_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, job_id: &str) -> Option<Arc<Job>> {
        self.jobs.remove(job_id).map(|(_, job)| job)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs not yet completed or failed.
    pub fn active_count(&self) -> usize {
        self.jobs.iter().filter(|entry| entry.value().is_active()).count()
    }

    /// Ids of jobs created more than `retention` before `now`.
    pub fn expired_ids(&self, now: DateTime<Utc>, retention: Duration) -> Vec<String> {
        let cutoff = now - retention;
        self.jobs
            .iter()
            .filter(|entry| entry.value().created_at < cutoff)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Drop expired jobs and delete their directories, whatever their status.
    /// Running jobs are cancelled first so they stop writing.
    ///
    /// Returns the ids that were removed.
    pub async fn sweep_expired(&self, now: DateTime<Utc>, retention: Duration) -> Vec<String> {
        // Ids are collected first so no map guard is held across an await.
        let expired = self.expired_ids(now, retention);
        let mut removed = Vec::with_capacity(expired.len());

        for job_id in expired {
            let Some(job) = self.remove(&job_id) else {
                continue;
            };
            job.cancel.cancel();

            match tokio::fs::remove_dir_all(&job.dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(job_id = %job_id, dir = %job.dir.display(), error = %e, "Failed to delete job directory"),
            }
            info!(job_id = %job_id, status = %job.status(), "Removed expired job");
            removed.push(job_id);
        }

        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::JobStatus;
    use tempfile::TempDir;

    fn job_aged(root: &std::path::Path, id: &str, now: DateTime<Utc>, age_hours: i64) -> Arc<Job> {
        let dir = root.join(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("drive_backup_001.zip"), b"zip").unwrap();
        Arc::new(Job::created_at(id, dir, now - Duration::hours(age_hours)))
    }

    #[test]
    fn test_insert_get_remove() {
        let registry = JobRegistry::new();
        registry.insert(Arc::new(Job::new("a", "/tmp/a")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().id, "a");
        assert!(registry.get("b").is_none());
        assert!(registry.remove("a").is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_active_count_ignores_terminal_jobs() {
        let registry = JobRegistry::new();
        let running = Arc::new(Job::new("running", "/tmp/running"));
        running.progress.set_status(JobStatus::Downloading);
        let done = Arc::new(Job::new("done", "/tmp/done"));
        done.progress.set_status(JobStatus::Completed);
        let failed = Arc::new(Job::new("failed", "/tmp/failed"));
        failed.progress.set_error("boom");

        registry.insert(running);
        registry.insert(done);
        registry.insert(failed);
        assert_eq!(registry.active_count(), 1);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired_jobs() {
        let root = TempDir::new().unwrap();
        let now = Utc::now();
        let registry = JobRegistry::new();
        let old = job_aged(root.path(), "old", now, 5);
        let recent = job_aged(root.path(), "recent", now, 3);
        // Still running jobs are swept too
        old.progress.set_status(JobStatus::Downloading);
        registry.insert(old.clone());
        registry.insert(recent.clone());

        let removed = registry.sweep_expired(now, Duration::hours(4)).await;

        assert_eq!(removed, vec!["old".to_string()]);
        assert!(registry.get("old").is_none());
        assert!(!old.dir.exists());
        assert!(registry.get("recent").is_some());
        assert!(recent.dir.join("drive_backup_001.zip").exists());
        assert!(old.cancel.is_cancelled());
        assert!(!recent.cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_job_exactly_at_retention_is_kept() {
        let root = TempDir::new().unwrap();
        let now = Utc::now();
        let registry = JobRegistry::new();
        let edge = job_aged(root.path(), "edge", now, 4);
        registry.insert(edge.clone());

        let removed = registry.sweep_expired(now, Duration::hours(4)).await;

        assert!(removed.is_empty());
        assert!(registry.get("edge").is_some());
        assert!(edge.dir.exists());

        let later = now + Duration::seconds(1);
        assert_eq!(registry.sweep_expired(later, Duration::hours(4)).await, vec!["edge".to_string()]);
    }

    #[tokio::test]
    async fn test_sweep_tolerates_missing_directory() {
        let registry = JobRegistry::new();
        let now = Utc::now();
        registry.insert(Arc::new(Job::created_at(
            "ghost",
            "/nonexistent/drive-backup/ghost",
            now - Duration::hours(10),
        )));

        let removed = registry.sweep_expired(now, Duration::hours(4)).await;
        assert_eq!(removed, vec!["ghost".to_string()]);
        assert!(registry.is_empty());
    }
}
