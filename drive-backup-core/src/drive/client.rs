//! Drive v3 REST client.

use super::{ContentStream, DriveApi, DriveConnector, FileListPage};
use crate::utils::errors::ProviderError;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::debug;

/// Fields requested from the listing endpoint; everything else is dropped server-side.
pub const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, size, capabilities/canDownload)";

/// Authorized handle to the Drive API for one access token.
#[derive(Debug, Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl DriveClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.base_url, file_id)
    }

    /// Send a GET and turn any non-success status into a [`ProviderError`].
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::Response, ProviderError> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let message = resp.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        debug!(url, status = status.as_u16(), "Provider request failed");
        Err(ProviderError::from_status(status.as_u16(), message))
    }

    async fn stream(&self, url: &str, query: &[(&str, &str)]) -> Result<ContentStream, ProviderError> {
        let resp = self.get(url, query).await?;
        Ok(resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(ProviderError::from))
            .boxed())
    }
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn list_page(
        &self,
        page_size: u32,
        page_token: Option<&str>,
        query: &str,
    ) -> Result<FileListPage, ProviderError> {
        let url = format!("{}/files", self.base_url);
        let page_size = page_size.to_string();
        let mut params = vec![
            ("pageSize", page_size.as_str()),
            ("fields", LIST_FIELDS),
            ("q", query),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let resp = self.get(&url, &params).await?;
        resp.json::<FileListPage>()
            .await
            .map_err(|e| ProviderError::Decode(format!("invalid file list: {}", e)))
    }

    async fn export(&self, file_id: &str, target_mime: &str) -> Result<ContentStream, ProviderError> {
        let url = format!("{}/export", self.file_url(file_id));
        self.stream(&url, &[("mimeType", target_mime)]).await
    }

    async fn download(&self, file_id: &str) -> Result<ContentStream, ProviderError> {
        let url = self.file_url(file_id);
        self.stream(&url, &[("alt", "media")]).await
    }
}

/// Creates [`DriveClient`]s sharing one connection pool.
#[derive(Debug, Clone)]
pub struct HttpDriveConnector {
    http: reqwest::Client,
    base_url: String,
}

impl HttpDriveConnector {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

impl DriveConnector for HttpDriveConnector {
    fn connect(&self, access_token: &str) -> Arc<dyn DriveApi> {
        Arc::new(DriveClient::new(self.http.clone(), self.base_url.clone(), access_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::mime;
    use futures_util::TryStreamExt;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn collect(stream: ContentStream) -> Vec<u8> {
        stream
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_page_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .and(header("authorization", "Bearer tok"))
            .and(query_param("pageSize", "1000"))
            .and(query_param("q", "trashed = false"))
            .and(query_param("pageToken", "next-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [{"id": "1", "name": "a.txt", "mimeType": "text/plain", "size": "3"}]
            })))
            .mount(&server)
            .await;

        let client = DriveClient::new(reqwest::Client::new(), server.uri(), "tok");
        let page = client.list_page(1000, Some("next-1"), "trashed = false").await.unwrap();

        assert_eq!(page.files.len(), 1);
        assert_eq!(page.files[0].size, Some(3));
        assert!(page.next_page_token.is_none());
    }

    #[tokio::test]
    async fn test_download_uses_alt_media() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/abc"))
            .and(query_param("alt", "media"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello drive".to_vec()))
            .mount(&server)
            .await;

        let client = DriveClient::new(reqwest::Client::new(), format!("{}/", server.uri()), "tok");
        let body = collect(client.download("abc").await.unwrap()).await;
        assert_eq!(body, b"hello drive");
    }

    #[tokio::test]
    async fn test_export_requests_target_mime() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/doc1/export"))
            .and(query_param("mimeType", mime::DOCX))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK..".to_vec()))
            .mount(&server)
            .await;

        let client = DriveClient::new(reqwest::Client::new(), server.uri(), "tok");
        let body = collect(client.export("doc1", mime::DOCX).await.unwrap()).await;
        assert_eq!(body, b"PK..");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/broken"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
            .mount(&server)
            .await;

        let client = DriveClient::new(reqwest::Client::new(), server.uri(), "tok");

        let gone = client.download("gone").await.err().unwrap();
        assert!(gone.is_not_found_or_forbidden());

        let broken = client.download("broken").await.err().unwrap();
        assert!(matches!(broken, ProviderError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_invalid_listing_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = DriveClient::new(reqwest::Client::new(), server.uri(), "tok");
        let err = client.list_page(10, None, "trashed = false").await.unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }
}
