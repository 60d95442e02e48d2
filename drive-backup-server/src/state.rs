use crate::config::AppConfig;
use drive_backup_core::drive::client::HttpDriveConnector;
use drive_backup_core::drive::credential::OAuthClient;
use drive_backup_core::drive::DriveConnector;
use drive_backup_core::{JobManager, JobRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct AppState {
    pub config: AppConfig,
    pub jobs: JobManager,
    /// Shared connection pool for provider and token requests
    pub http: reqwest::Client,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        let connector = HttpDriveConnector::new(http.clone(), config.engine.drive.api_base_url.clone());
        Ok(Self::with_connector(config, Arc::new(connector), http))
    }

    pub fn with_connector(config: AppConfig, connector: Arc<dyn DriveConnector>, http: reqwest::Client) -> Self {
        let jobs = JobManager::new(Arc::new(JobRegistry::new()), connector, Arc::new(config.engine.clone()));
        Self {
            config,
            jobs,
            http,
            started_at: Instant::now(),
        }
    }

    pub fn registry(&self) -> Arc<JobRegistry> {
        self.jobs.registry().clone()
    }

    pub fn oauth_client(&self) -> OAuthClient {
        OAuthClient {
            client_id: self.config.google_client_id.clone(),
            client_secret: self.config.google_client_secret.clone(),
            token_uri: self.config.engine.drive.token_uri.clone(),
        }
    }
}
