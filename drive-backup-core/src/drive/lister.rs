//! Flattens the paginated listing endpoint into one inventory.

use super::{DriveApi, FileRecord};
use crate::utils::errors::ProviderError;
use tracing::{debug, info};

/// Provider-side filter: soft-deleted files never reach the client.
pub const NOT_TRASHED_QUERY: &str = "trashed = false";

/// List every non-trashed file, concatenating pages in the order returned.
///
/// A failure on any page fails the whole listing; no partial inventory is
/// returned.
pub async fn list_all(api: &dyn DriveApi, page_size: u32) -> Result<Vec<FileRecord>, ProviderError> {
    let mut files = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        debug!(page_token = ?page_token, "Fetching files page");
        let page = api
            .list_page(page_size, page_token.as_deref(), NOT_TRASHED_QUERY)
            .await?;
        pages += 1;

        let fetched = page.files.len();
        files.extend(page.files);
        debug!(fetched, total = files.len(), "Fetched files page");

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    info!(pages, files = files.len(), "Listing complete");
    Ok(files)
}
