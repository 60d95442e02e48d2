//! Remote storage provider access.
//!
//! [`DriveApi`] is the seam between the pipeline and the provider: the
//! reqwest-backed [`client::DriveClient`] talks to the Drive v3 REST API and
//! [`memory::MemoryDrive`] serves an in-memory inventory.

pub mod client;
pub mod credential;
pub mod fetcher;
pub mod lister;
pub mod memory;
pub mod mime;

use crate::utils::errors::ProviderError;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Chunked body of an export or download request.
pub type ContentStream = BoxStream<'static, Result<Bytes, ProviderError>>;

/// One entry of the remote inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireFile", into = "WireFile")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    /// Declared byte count; native documents have none
    pub size: Option<u64>,
    pub can_download: bool,
}

impl FileRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: mime_type.into(),
            size: None,
            can_download: true,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_can_download(mut self, can_download: bool) -> Self {
        self.can_download = can_download;
        self
    }

    pub fn is_folder(&self) -> bool {
        self.mime_type == mime::FOLDER
    }
}

/// Provider representation: `size` is an int64 encoded as a string and the
/// download capability sits in a nested object that may be omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    capabilities: Option<WireCapabilities>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCapabilities {
    #[serde(default = "default_can_download")]
    can_download: bool,
}

fn default_can_download() -> bool {
    true
}

impl From<WireFile> for FileRecord {
    fn from(wire: WireFile) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            mime_type: wire.mime_type,
            size: wire.size.and_then(|s| s.trim().parse().ok()),
            can_download: wire.capabilities.map_or(true, |c| c.can_download),
        }
    }
}

impl From<FileRecord> for WireFile {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            mime_type: record.mime_type,
            size: record.size.map(|s| s.to_string()),
            capabilities: Some(WireCapabilities {
                can_download: record.can_download,
            }),
        }
    }
}

/// One page of the listing endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListPage {
    #[serde(default)]
    pub files: Vec<FileRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Operations the pipeline needs from the remote provider.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Fetch one listing page. `query` is a provider-side filter expression.
    async fn list_page(
        &self,
        page_size: u32,
        page_token: Option<&str>,
        query: &str,
    ) -> Result<FileListPage, ProviderError>;

    /// Server-side conversion of a native document into `target_mime`.
    async fn export(&self, file_id: &str, target_mime: &str) -> Result<ContentStream, ProviderError>;

    /// Raw content of an ordinary file.
    async fn download(&self, file_id: &str) -> Result<ContentStream, ProviderError>;
}

/// Builds an authorized provider handle once a job's credential is ready.
pub trait DriveConnector: Send + Sync {
    fn connect(&self, access_token: &str) -> Arc<dyn DriveApi>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_provider_file() {
        let page: FileListPage = serde_json::from_str(
            r#"{
                "nextPageToken": "tok",
                "files": [
                    {"id": "1", "name": "a.txt", "mimeType": "text/plain", "size": "42",
                     "capabilities": {"canDownload": true}},
                    {"id": "2", "name": "Doc", "mimeType": "application/vnd.google-apps.document",
                     "capabilities": {"canDownload": false}},
                    {"id": "3", "name": "legacy", "mimeType": "text/plain", "size": "n/a"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(page.next_page_token.as_deref(), Some("tok"));
        assert_eq!(page.files[0].size, Some(42));
        assert!(page.files[0].can_download);
        assert_eq!(page.files[1].size, None);
        assert!(!page.files[1].can_download);
        // Missing capabilities default to downloadable; garbage sizes become unknown
        assert!(page.files[2].can_download);
        assert_eq!(page.files[2].size, None);
    }

    #[test]
    fn test_encode_round_trips_size_as_string() {
        let record = FileRecord::new("7", "x.bin", "application/octet-stream").with_size(9);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["size"], "9");
        assert_eq!(json["mimeType"], "application/octet-stream");
        assert_eq!(json["capabilities"]["canDownload"], true);
    }

    #[test]
    fn test_is_folder() {
        assert!(FileRecord::new("f", "Photos", mime::FOLDER).is_folder());
        assert!(!FileRecord::new("f", "Photos", "image/png").is_folder());
    }
}
