use drive_backup_core::EngineConfig;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub engine: EngineConfig,
    /// OAuth client used to refresh user tokens; refresh is disabled when empty
    pub google_client_id: String,
    pub google_client_secret: String,
}

impl AppConfig {
    /// Load `.env`, then the optional TOML file, then environment overrides.
    ///
    /// `config_path` wins over `BACKUP_CONFIG`.
    pub fn from_env(config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let config_path = config_path.or_else(|| std::env::var("BACKUP_CONFIG").ok().map(PathBuf::from));
        let engine = match config_path {
            Some(path) => EngineConfig::from_file(Path::new(&path))?,
            None => EngineConfig::default(),
        };

        Self::with_overrides(engine, |key| std::env::var(key).ok())
    }

    fn with_overrides(mut engine: EngineConfig, var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        if let Some(dir) = var("DOWNLOADS_DIR") {
            engine.archive.downloads_dir = PathBuf::from(dir);
        }
        if let Some(base) = var("DRIVE_API_BASE") {
            engine.drive.api_base_url = base;
        }
        if let Some(uri) = var("GOOGLE_TOKEN_URI") {
            engine.drive.token_uri = uri;
        }
        if let Some(limit) = var("VOLUME_SIZE_LIMIT").and_then(|v| v.parse().ok()) {
            engine.archive.volume_size_limit = limit;
        }
        if let Some(concurrency) = var("FETCH_CONCURRENCY").and_then(|v| v.parse().ok()) {
            engine.drive.fetch_concurrency = concurrency;
        }
        if let Some(secs) = var("RETENTION_SECS").and_then(|v| v.parse().ok()) {
            engine.retention.retention_secs = secs;
        }
        if let Some(level) = var("LOG_LEVEL") {
            engine.log.level = level;
        }
        engine.validate()?;

        Ok(Self {
            port: var("PORT").and_then(|v| v.parse().ok()).unwrap_or(3000),
            engine,
            google_client_id: var("GOOGLE_CLIENT_ID").unwrap_or_default(),
            google_client_secret: var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::with_overrides(EngineConfig::default(), |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.engine.archive.downloads_dir, PathBuf::from("downloads"));
        assert!(config.google_client_id.is_empty());
    }

    #[test]
    fn test_env_overrides() {
        let config = load(&[
            ("PORT", "8080"),
            ("DOWNLOADS_DIR", "/srv/backups"),
            ("DRIVE_API_BASE", "http://localhost:9000"),
            ("FETCH_CONCURRENCY", "4"),
            ("LOG_LEVEL", "debug"),
            ("GOOGLE_CLIENT_ID", "client"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.engine.archive.downloads_dir, PathBuf::from("/srv/backups"));
        assert_eq!(config.engine.drive.api_base_url, "http://localhost:9000");
        assert_eq!(config.engine.drive.fetch_concurrency, 4);
        assert_eq!(config.engine.log.level, "debug");
        assert_eq!(config.google_client_id, "client");
    }

    #[test]
    fn test_invalid_port_falls_back() {
        assert_eq!(load(&[("PORT", "not-a-port")]).unwrap().port, 3000);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        assert!(load(&[("FETCH_CONCURRENCY", "0")]).is_err());
    }
}
