//! Job lifecycle: start, run, observe.
//!
//! A job moves `starting → initializing → listing_files → downloading →
//! completed`. Any job-level failure records its message and ends the job in
//! `error`. Each job runs on its own task and owns its credential.
//!
//! The job directory is created here, before the job is registered. A job
//! removed by the retention sweep is cancelled and never recreates it.

use super::{Job, JobRegistry};
use crate::config::EngineConfig;
use crate::drive::credential::Credential;
use crate::drive::{lister, DriveConnector, FileRecord};
use crate::executor::{BackupExecutor, BackupSummary, PipelineSettings};
use crate::progress::{JobStatus, ProgressSnapshot};
use crate::utils::errors::{EngineError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

pub struct JobManager {
    registry: Arc<JobRegistry>,
    connector: Arc<dyn DriveConnector>,
    config: Arc<EngineConfig>,
}

impl JobManager {
    pub fn new(registry: Arc<JobRegistry>, connector: Arc<dyn DriveConnector>, config: Arc<EngineConfig>) -> Self {
        Self {
            registry,
            connector,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create the job directory, register a new job and spawn its pipeline.
    pub async fn start_job(&self, credential: Box<dyn Credential>) -> Result<String> {
        if !credential.is_usable() {
            return Err(EngineError::Auth("no valid credentials".into()));
        }

        let job_id = Uuid::new_v4().to_string();
        let dir = self.config.archive.downloads_dir.join(&job_id);
        tokio::fs::create_dir_all(&dir).await?;
        let job = Arc::new(Job::new(job_id.clone(), dir));
        job.progress.set_status(JobStatus::Starting);
        self.registry.insert(job.clone());

        info!(job_id = %job_id, "Backup job started");

        let connector = self.connector.clone();
        let config = self.config.clone();
        tokio::spawn(run_job(job, credential, connector, config));

        Ok(job_id)
    }

    pub fn get_progress(&self, job_id: &str) -> Result<ProgressSnapshot> {
        self.registry
            .get(job_id)
            .map(|job| job.progress.snapshot())
            .ok_or_else(|| EngineError::NotFound(format!("job {}", job_id)))
    }

    /// Location of a finished volume file of `job_id`.
    pub async fn volume_path(&self, job_id: &str, filename: &str) -> Result<PathBuf> {
        let job = self
            .registry
            .get(job_id)
            .ok_or_else(|| EngineError::NotFound(format!("job {}", job_id)))?;

        if !is_plain_file_name(filename) {
            return Err(EngineError::NotFound(format!("file {}", filename)));
        }

        let path = job.dir.join(filename);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => Err(EngineError::NotFound(format!("file {}", filename))),
        }
    }
}

/// A single path component that cannot escape the job directory.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}

async fn run_job(
    job: Arc<Job>,
    mut credential: Box<dyn Credential>,
    connector: Arc<dyn DriveConnector>,
    config: Arc<EngineConfig>,
) {
    match execute_job(&job, credential.as_mut(), connector.as_ref(), &config).await {
        Ok(summary) => {
            job.progress.set_status(JobStatus::Completed);
            info!(
                job_id = %job.id,
                files = summary.written_files,
                skipped = summary.skipped_files,
                failed = summary.failed_files,
                volumes = summary.volumes.len(),
                "Backup job completed"
            );
        }
        Err(e) => {
            error!(job_id = %job.id, error = %e, "Backup job failed");
            job.progress.set_error(e.to_string());
        }
    }
}

async fn execute_job(
    job: &Job,
    credential: &mut dyn Credential,
    connector: &dyn DriveConnector,
    config: &EngineConfig,
) -> Result<BackupSummary> {
    job.progress.set_status(JobStatus::Initializing);

    if credential.is_expired() {
        info!(job_id = %job.id, "Refreshing expired credential");
        credential.refresh().await?;
    }
    job.ensure_live()?;
    let api = connector.connect(credential.access_token());

    job.progress.set_status(JobStatus::ListingFiles);
    let listing = lister::list_all(api.as_ref(), config.drive.page_size).await?;
    let inventory: Vec<FileRecord> = listing.into_iter().filter(|f| !f.is_folder()).collect();
    info!(job_id = %job.id, files = inventory.len(), "Inventory listed");
    job.ensure_live()?;

    job.progress.set_total(inventory.len());
    job.progress.set_status(JobStatus::Downloading);

    BackupExecutor::new(api, &job.progress, PipelineSettings::from(config))
        .with_cancel(job.cancel.clone())
        .write_volumes(&inventory, &job.dir)
        .await
}
