//! Drive Backup Engine
//!
//! Lists a remote drive, fetches every file and packs the content into
//! size-bounded ZIP volumes, one background job per request.

pub mod archive;
pub mod config;
pub mod drive;
pub mod executor;
pub mod jobs;
pub mod progress;
pub mod utils;

// Re-export commonly used types
pub use config::EngineConfig;
pub use jobs::{Job, JobManager, JobRegistry};
pub use progress::{JobStatus, ProgressSnapshot};
pub use utils::errors::{EngineError, ProviderError};
pub type Result<T> = std::result::Result<T, EngineError>;
