//! Retrieves the bytes of a single remote file.

use super::{mime, DriveApi, FileRecord};
use crate::utils::errors::ProviderError;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use tracing::debug;

/// Fetch the content of `file`, exporting native documents server-side.
///
/// Returns `Ok(None)` when the provider reports the file as forbidden or
/// missing; the caller skips it. Every other error is returned as-is.
pub async fn fetch(api: &dyn DriveApi, file: &FileRecord) -> Result<Option<Bytes>, ProviderError> {
    let opened = match mime::export_format(&file.mime_type) {
        Some(format) => api.export(&file.id, format.mime_type).await,
        None => api.download(&file.id).await,
    };

    let mut stream = match opened {
        Ok(stream) => stream,
        Err(e) if e.is_not_found_or_forbidden() => {
            debug!(file_id = %file.id, error = %e, "File not accessible, skipping");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let capacity = file.size.unwrap_or(0).min(64 * 1024 * 1024) as usize;
    let mut content = BytesMut::with_capacity(capacity);
    let mut chunks = 0usize;
    while let Some(chunk) = stream.next().await {
        content.extend_from_slice(&chunk?);
        chunks += 1;
    }

    debug!(file_id = %file.id, bytes = content.len(), chunks, "Fetched file content");
    Ok(Some(content.freeze()))
}
