//! Configuration management for the backup engine.
//!
//! Loads configuration from a TOML file; every field has a serde default so a
//! partial file (or none at all) yields a working setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Base URL of the Drive v3 REST API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// OAuth token endpoint used to refresh expired credentials
    #[serde(default = "default_token_uri")]
    pub token_uri: String,

    /// Records requested per listing page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Fetches allowed to run ahead of the archive writer (1 = strictly sequential)
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Root directory; each job gets `<downloads_dir>/<job_id>/`
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,

    /// Uncompressed byte ceiling per volume (default: 2 GiB)
    #[serde(default = "default_volume_size_limit")]
    pub volume_size_limit: u64,

    /// Deflate level for archive entries
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,

    /// Size assumed for files without a declared size, rollover check only
    #[serde(default = "default_unknown_size_placeholder")]
    pub unknown_size_placeholder: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Age after which a job and its volumes are deleted (default: 4 hours)
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// How often the retention sweep runs (default: 1 hour)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_api_base_url() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_page_size() -> u32 {
    1000
}

fn default_fetch_concurrency() -> usize {
    1
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_volume_size_limit() -> u64 {
    2 * 1024 * 1024 * 1024 // 2 GiB
}

fn default_compression_level() -> i32 {
    6
}

fn default_unknown_size_placeholder() -> u64 {
    1024
}

fn default_retention_secs() -> u64 {
    4 * 60 * 60
}

fn default_sweep_interval_secs() -> u64 {
    60 * 60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            token_uri: default_token_uri(),
            page_size: default_page_size(),
            fetch_concurrency: default_fetch_concurrency(),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            downloads_dir: default_downloads_dir(),
            volume_size_limit: default_volume_size_limit(),
            compression_level: default_compression_level(),
            unknown_size_placeholder: default_unknown_size_placeholder(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl RetentionConfig {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.retention_secs as i64)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.drive.page_size == 0 {
            return Err(crate::EngineError::Config("drive.page_size must be positive".into()));
        }
        if self.drive.fetch_concurrency == 0 {
            return Err(crate::EngineError::Config(
                "drive.fetch_concurrency must be positive".into(),
            ));
        }
        if self.archive.volume_size_limit == 0 {
            return Err(crate::EngineError::Config(
                "archive.volume_size_limit must be positive".into(),
            ));
        }
        if !(0..=9).contains(&self.archive.compression_level) {
            return Err(crate::EngineError::Config(
                "archive.compression_level must be between 0 and 9".into(),
            ));
        }
        Ok(())
    }
}
