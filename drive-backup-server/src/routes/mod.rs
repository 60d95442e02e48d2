pub mod health;
pub mod jobs;

use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/jobs", jobs::router())
        .route("/health", get(health::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use drive_backup_core::drive::memory::{MemoryConnector, MemoryDrive};
    use drive_backup_core::drive::FileRecord;
    use drive_backup_core::EngineConfig;
    use serde_json::Value;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app(drive: MemoryDrive, downloads: &TempDir) -> Router {
        let mut engine = EngineConfig::default();
        engine.archive.downloads_dir = downloads.path().to_path_buf();
        let config = AppConfig {
            port: 0,
            engine,
            google_client_id: String::new(),
            google_client_secret: String::new(),
        };
        let state = AppState::with_connector(
            config,
            Arc::new(MemoryConnector(Arc::new(drive))),
            reqwest::Client::new(),
        );
        create_router(Arc::new(state))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let downloads = TempDir::new().unwrap();
        let app = app(MemoryDrive::new(), &downloads);

        let (status, _, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["active_jobs"], 0);
    }

    #[tokio::test]
    async fn test_start_without_token_is_unauthorized() {
        let downloads = TempDir::new().unwrap();
        let app = app(MemoryDrive::new(), &downloads);

        let (status, _, body) = send(&app, post_json("/api/jobs", serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let downloads = TempDir::new().unwrap();
        let app = app(MemoryDrive::new(), &downloads);

        let (status, _, _) = send(&app, get("/api/jobs/missing/progress")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _, _) = send(&app, get("/api/jobs/missing/volumes/drive_backup_001.zip")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_job_end_to_end() {
        let downloads = TempDir::new().unwrap();
        let drive = MemoryDrive::with_files(vec![FileRecord::new("1", "hello.txt", "text/plain").with_size(5)])
            .content("1", &b"hello"[..]);
        let app = app(drive, &downloads);

        let (status, _, body) = send(&app, post_json("/api/jobs", serde_json::json!({ "access_token": "tok" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let job_id = serde_json::from_slice::<Value>(&body).unwrap()["job_id"]
            .as_str()
            .unwrap()
            .to_string();

        let progress_uri = format!("/api/jobs/{}/progress", job_id);
        let mut progress = Value::Null;
        for _ in 0..200 {
            let (status, _, body) = send(&app, get(&progress_uri)).await;
            assert_eq!(status, StatusCode::OK);
            progress = serde_json::from_slice(&body).unwrap();
            if progress["status"] == "completed" || progress["status"] == "error" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(progress["status"], "completed");
        assert_eq!(progress["processed_files"], 1);
        assert_eq!(progress["volumes"][0], "drive_backup_001.zip");

        let (status, headers, body) =
            send(&app, get(&format!("/api/jobs/{}/volumes/drive_backup_001.zip", job_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
        assert!(headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment"));
        assert_eq!(&body[..2], b"PK");

        let (status, _, _) = send(&app, get(&format!("/api/jobs/{}/volumes/..", job_id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
