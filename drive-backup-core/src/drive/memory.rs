//! In-memory provider.
//!
//! Serves a fixed set of listing pages and file bodies, and records every call
//! so callers can assert on pagination tokens and export formats.

use super::{ContentStream, DriveApi, DriveConnector, FileListPage, FileRecord};
use crate::utils::errors::ProviderError;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Body chunk size used when streaming file content.
const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
enum StoredContent {
    Body(Bytes),
    /// Fails the request with this HTTP status
    Status(u16),
    /// Sends the first chunk, then fails mid-stream
    Truncated(Bytes),
}

/// A request observed by [`MemoryDrive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveCall {
    List { page_token: Option<String> },
    Export { file_id: String, mime_type: String },
    Download { file_id: String },
}

#[derive(Debug, Default)]
pub struct MemoryDrive {
    pages: Vec<FileListPage>,
    contents: HashMap<String, StoredContent>,
    failing_page: Option<(usize, u16)>,
    chunk_size: usize,
    calls: Mutex<Vec<DriveCall>>,
}

impl MemoryDrive {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            ..Default::default()
        }
    }

    /// Single-page inventory.
    pub fn with_files(files: Vec<FileRecord>) -> Self {
        Self::new().page(files, None)
    }

    /// Append a listing page. `next_page_token` is what this page hands back;
    /// a request carrying that token receives the following page.
    pub fn page(mut self, files: Vec<FileRecord>, next_page_token: Option<&str>) -> Self {
        self.pages.push(FileListPage {
            files,
            next_page_token: next_page_token.map(str::to_string),
        });
        self
    }

    pub fn content(mut self, file_id: &str, body: impl Into<Bytes>) -> Self {
        self.contents.insert(file_id.to_string(), StoredContent::Body(body.into()));
        self
    }

    /// Make every export/download of `file_id` fail with `status`.
    pub fn failing_content(mut self, file_id: &str, status: u16) -> Self {
        self.contents.insert(file_id.to_string(), StoredContent::Status(status));
        self
    }

    /// Stream one chunk of `body`, then fail with a transport-level error.
    pub fn truncated_content(mut self, file_id: &str, body: impl Into<Bytes>) -> Self {
        self.contents.insert(file_id.to_string(), StoredContent::Truncated(body.into()));
        self
    }

    /// Fail the listing request for the page at `index` (0-based) with `status`.
    pub fn failing_page(mut self, index: usize, status: u16) -> Self {
        self.failing_page = Some((index, status));
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<DriveCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: DriveCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn page_index(&self, page_token: Option<&str>) -> Result<usize, ProviderError> {
        let Some(token) = page_token else {
            return Ok(0);
        };
        self.pages
            .iter()
            .position(|p| p.next_page_token.as_deref() == Some(token))
            .map(|i| i + 1)
            .filter(|i| *i < self.pages.len())
            .ok_or_else(|| ProviderError::from_status(400, format!("invalid page token {}", token)))
    }

    fn open(&self, file_id: &str) -> Result<ContentStream, ProviderError> {
        match self.contents.get(file_id) {
            None => Err(ProviderError::from_status(404, format!("file {} not found", file_id))),
            Some(StoredContent::Status(status)) => Err(ProviderError::from_status(*status, "injected failure")),
            Some(StoredContent::Body(body)) => {
                let chunks: Vec<Result<Bytes, ProviderError>> = split_chunks(body, self.chunk_size)
                    .into_iter()
                    .map(Ok)
                    .collect();
                Ok(stream::iter(chunks).boxed())
            }
            Some(StoredContent::Truncated(body)) => {
                let first = split_chunks(body, self.chunk_size).into_iter().next().unwrap_or_default();
                let chunks = vec![
                    Ok(first),
                    Err(ProviderError::Decode("connection reset mid-body".into())),
                ];
                Ok(stream::iter(chunks).boxed())
            }
        }
    }
}

fn split_chunks(body: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    let mut chunks = Vec::new();
    let mut offset = 0;
    while offset < body.len() {
        let end = (offset + chunk_size).min(body.len());
        chunks.push(body.slice(offset..end));
        offset = end;
    }
    chunks
}

#[async_trait]
impl DriveApi for MemoryDrive {
    async fn list_page(
        &self,
        _page_size: u32,
        page_token: Option<&str>,
        _query: &str,
    ) -> Result<FileListPage, ProviderError> {
        self.record(DriveCall::List {
            page_token: page_token.map(str::to_string),
        });

        if self.pages.is_empty() {
            return Ok(FileListPage::default());
        }

        let index = self.page_index(page_token)?;
        if let Some((failing, status)) = self.failing_page {
            if failing == index {
                return Err(ProviderError::from_status(status, "listing failed"));
            }
        }
        Ok(self.pages[index].clone())
    }

    async fn export(&self, file_id: &str, target_mime: &str) -> Result<ContentStream, ProviderError> {
        self.record(DriveCall::Export {
            file_id: file_id.to_string(),
            mime_type: target_mime.to_string(),
        });
        self.open(file_id)
    }

    async fn download(&self, file_id: &str) -> Result<ContentStream, ProviderError> {
        self.record(DriveCall::Download {
            file_id: file_id.to_string(),
        });
        self.open(file_id)
    }
}

/// Hands out the same [`MemoryDrive`] for every token.
#[derive(Debug, Clone)]
pub struct MemoryConnector(pub Arc<MemoryDrive>);

impl DriveConnector for MemoryConnector {
    fn connect(&self, _access_token: &str) -> Arc<dyn DriveApi> {
        self.0.clone()
    }
}
