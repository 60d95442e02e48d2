//! Error types for the backup engine.

use thiserror::Error;

/// Failures reported by the remote storage provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider answered 403 or 404. Callers treat this as "skip", not as a failure.
    #[error("file not found or access forbidden (HTTP {0})")]
    NotFoundOrForbidden(u16),

    #[error("provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Map an HTTP status and body onto the provider taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            403 | 404 => ProviderError::NotFoundOrForbidden(status),
            _ => ProviderError::Status {
                status,
                message: message.into(),
            },
        }
    }

    pub fn is_not_found_or_forbidden(&self) -> bool {
        matches!(self, ProviderError::NotFoundOrForbidden(_))
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_maps_skip_codes() {
        assert!(ProviderError::from_status(403, "").is_not_found_or_forbidden());
        assert!(ProviderError::from_status(404, "").is_not_found_or_forbidden());
        assert!(!ProviderError::from_status(500, "boom").is_not_found_or_forbidden());
    }

    #[test]
    fn test_status_message_is_kept() {
        let err = ProviderError::from_status(429, "rate limited");
        assert_eq!(err.to_string(), "provider returned HTTP 429: rate limited");
    }
}
