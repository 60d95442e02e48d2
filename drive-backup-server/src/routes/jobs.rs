use crate::error::AppError;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use drive_backup_core::drive::credential::OAuthCredential;
use drive_backup_core::ProgressSnapshot;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_job))
        .route("/{id}/progress", get(get_progress))
        .route("/{id}/volumes/{filename}", get(download_volume))
}

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until `access_token` expires
    #[serde(default)]
    pub expires_in: Option<i64>,
}

async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let expires_at = body.expires_in.map(|secs| Utc::now() + Duration::seconds(secs));
    let credential = OAuthCredential::new(
        body.access_token,
        body.refresh_token,
        expires_at,
        state.oauth_client(),
        state.http.clone(),
    );

    let job_id = state.jobs.start_job(Box::new(credential)).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "job_id": job_id }))))
}

async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProgressSnapshot>, AppError> {
    Ok(Json(state.jobs.get_progress(&id)?))
}

async fn download_volume(
    State(state): State<Arc<AppState>>,
    Path((id, filename)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let path = state.jobs.volume_path(&id, &filename).await?;

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to open volume: {}", e)))?;

    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    ))
}
