//! Backup executor - writes a listed inventory into archive volumes.
//!
//! Records are handled strictly in inventory order by a single writer. Fetches
//! may run ahead of the writer through an order-preserving buffer of at most
//! `fetch_concurrency` in-flight requests; with the default of 1 the pipeline
//! is fully sequential.
//!
//! Per-file failures (fetch errors, entry write errors) are logged and the
//! file is skipped. Failing to open or finalize a volume aborts the job, and so
//! does cancellation, which is checked before every record. The open volume is
//! finalized on every exit path.
//!
//! The target directory must already exist; the executor never creates it.

use crate::archive::volume::ClosedVolume;
use crate::archive::{sanitize, VolumeSettings, VolumeWriter};
use crate::config::EngineConfig;
use crate::drive::{fetcher, DriveApi, FileRecord};
use crate::progress::{format_bytes, format_duration, ProgressTracker};
use crate::utils::errors::{EngineError, ProviderError, Result};
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub volume: VolumeSettings,
    /// Fetches allowed in flight ahead of the writer
    pub fetch_concurrency: usize,
}

impl From<&EngineConfig> for PipelineSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            volume: VolumeSettings::from(&config.archive),
            fetch_concurrency: config.drive.fetch_concurrency.max(1),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

/// Backup execution result
#[derive(Debug, Clone, Default)]
pub struct BackupSummary {
    pub total_files: usize,
    pub written_files: usize,
    pub written_bytes: u64,
    /// Not downloadable, forbidden or missing
    pub skipped_files: usize,
    pub failed_files: usize,
    pub volumes: Vec<ClosedVolume>,
    pub duration_secs: u64,
}

/// What happened when fetching one inventory record.
enum FetchOutcome {
    NotDownloadable,
    Unavailable,
    Fetched(Bytes),
    Failed(ProviderError),
}

/// Runs blocking ZIP work off the async runtime while keeping one owner of the writer.
struct BlockingVolumes {
    writer: Option<VolumeWriter>,
}

impl BlockingVolumes {
    fn new(writer: VolumeWriter) -> Self {
        Self { writer: Some(writer) }
    }

    fn get(&self) -> Option<&VolumeWriter> {
        self.writer.as_ref()
    }

    async fn run<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut VolumeWriter) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut writer = self.writer.take().ok_or_else(|| {
            EngineError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "volume writer lost after a failed task",
            ))
        })?;

        let (writer, result) = tokio::task::spawn_blocking(move || {
            let result = f(&mut writer);
            (writer, result)
        })
        .await?;

        self.writer = Some(writer);
        result
    }
}

/// Main backup executor
pub struct BackupExecutor<'a> {
    api: Arc<dyn DriveApi>,
    tracker: &'a ProgressTracker,
    settings: PipelineSettings,
    cancel: CancellationToken,
}

impl<'a> BackupExecutor<'a> {
    pub fn new(api: Arc<dyn DriveApi>, tracker: &'a ProgressTracker, settings: PipelineSettings) -> Self {
        Self {
            api,
            tracker,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop before the next record once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Write every record of `inventory` into volumes under `dir`.
    ///
    /// Advances the tracker exactly once per record and appends each volume
    /// name as it is opened.
    pub async fn write_volumes(&self, inventory: &[FileRecord], dir: &Path) -> Result<BackupSummary> {
        let start_time = Instant::now();
        info!(
            files = inventory.len(),
            dir = %dir.display(),
            fetch_concurrency = self.settings.fetch_concurrency,
            "Starting archive pipeline"
        );

        let mut volumes = BlockingVolumes::new(VolumeWriter::new(dir, self.settings.volume));
        let mut summary = BackupSummary {
            total_files: inventory.len(),
            ..Default::default()
        };

        let processed = self.process_inventory(inventory, &mut volumes, &mut summary).await;

        // Finalize on every path; a processing error takes precedence.
        let finished = if volumes.get().is_some() {
            volumes.run(|w| w.finish()).await
        } else {
            Ok(())
        };
        if let Some(writer) = volumes.get() {
            summary.volumes = writer.closed_volumes().to_vec();
        }

        match (processed, finished) {
            (Err(e), finished) => {
                if let Err(close_err) = finished {
                    error!(error = %close_err, "Failed to finalize volume after pipeline error");
                }
                Err(e)
            }
            (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => {
                summary.duration_secs = start_time.elapsed().as_secs();
                info!(
                    written = summary.written_files,
                    bytes = %format_bytes(summary.written_bytes),
                    skipped = summary.skipped_files,
                    failed = summary.failed_files,
                    volumes = summary.volumes.len(),
                    duration = %format_duration(summary.duration_secs),
                    "Archive pipeline finished"
                );
                Ok(summary)
            }
        }
    }

    async fn process_inventory(
        &self,
        inventory: &[FileRecord],
        volumes: &mut BlockingVolumes,
        summary: &mut BackupSummary,
    ) -> Result<()> {
        let total = inventory.len();
        // Indices keep the mapped futures free of higher-ranked borrows, so the
        // whole pipeline stays Send for tokio::spawn.
        let mut outcomes = stream::iter(0..total)
            .map(move |index| {
                let file = &inventory[index];
                async move { (index, file, self.fetch_outcome(file).await) }
            })
            .buffered(self.settings.fetch_concurrency.max(1));

        while let Some((index, file, outcome)) = outcomes.next().await {
            if self.cancel.is_cancelled() {
                return Err(EngineError::Cancelled("job was cancelled".into()));
            }
            debug!(
                position = index + 1,
                total,
                percent = self.tracker.snapshot().percent_complete(),
                file = %file.name,
                "Processing file"
            );

            match outcome {
                FetchOutcome::NotDownloadable => {
                    info!(file = %file.name, "Skipping non-downloadable file");
                    summary.skipped_files += 1;
                }
                FetchOutcome::Unavailable => {
                    info!(file = %file.name, "Skipped file (no content)");
                    summary.skipped_files += 1;
                }
                FetchOutcome::Failed(e) => {
                    warn!(file = %file.name, file_id = %file.id, error = %e, "Failed to fetch file");
                    summary.failed_files += 1;
                }
                FetchOutcome::Fetched(content) => {
                    self.write_entry(file, content, volumes, summary).await?;
                }
            }

            self.tracker.advance(&file.name);
        }

        Ok(())
    }

    async fn fetch_outcome(&self, file: &FileRecord) -> FetchOutcome {
        if !file.can_download {
            return FetchOutcome::NotDownloadable;
        }
        self.tracker.set_current_file(&file.name);
        match fetcher::fetch(self.api.as_ref(), file).await {
            Ok(Some(content)) => FetchOutcome::Fetched(content),
            Ok(None) => FetchOutcome::Unavailable,
            Err(e) => FetchOutcome::Failed(e),
        }
    }

    /// Roll over if needed, then write one entry. Only volume rollover
    /// failures and lost writers are returned; entry write errors are skips.
    async fn write_entry(
        &self,
        file: &FileRecord,
        content: Bytes,
        volumes: &mut BlockingVolumes,
        summary: &mut BackupSummary,
    ) -> Result<()> {
        let needs_rollover = volumes.get().map_or(true, |w| w.needs_rollover(file.size));
        if needs_rollover {
            let name = volumes.run(|w| w.roll_over()).await?;
            self.tracker.append_volume(&name);
        }

        let entry_name = sanitize(file);
        let bytes = content.len() as u64;
        match volumes.run(move |w| w.add_entry(&entry_name, &content)).await {
            Ok(written_as) => {
                debug!(entry = %written_as, bytes, "Added to volume");
                summary.written_files += 1;
                summary.written_bytes += bytes;
                Ok(())
            }
            Err(e @ EngineError::Task(_)) => Err(e),
            Err(e) => {
                warn!(file = %file.name, file_id = %file.id, error = %e, "Failed to write entry");
                summary.failed_files += 1;
                Ok(())
            }
        }
    }
}
