use super::JobRegistry;
use crate::config::RetentionConfig;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Periodically drop jobs older than the retention window until `cancel` fires.
pub fn start_retention_sweep(
    registry: Arc<JobRegistry>,
    config: RetentionConfig,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.sweep_interval());
        // The first tick completes immediately; skip it so a fresh start sweeps nothing.
        interval.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let removed = registry.sweep_expired(chrono::Utc::now(), config.retention()).await;
                    if !removed.is_empty() {
                        tracing::info!(removed = removed.len(), remaining = registry.len(), "Retention sweep finished");
                    }
                }
            }
        }
        tracing::info!("Retention sweep stopped");
    })
}
