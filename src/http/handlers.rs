//! Request handlers.

use std::path::{Path as FsPath, PathBuf};

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::app::clip_interactor::{ClipReport, GenerateRequest};
use crate::app::library_interactor::{DeleteOutcome, SessionListing};
use crate::domain::errors::DomainError;
use crate::domain::model::ToolStatus;
use crate::http::error::{ApiError, ApiResult};
use crate::http::AppState;

/// Readiness marker kept for existing clients.
pub async fn root() -> Json<Value> {
    Json(json!({ "status": "ready" }))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub available_slots: usize,
    pub tools: Vec<ToolStatus>,
}

/// Tool availability; 503 when probing or extraction cannot run.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let clips = state.container.clip_interactor();
    let tools = clips.tool_status().await;
    let healthy = tools.iter().all(|t| t.available);

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
        available_slots: clips.available_slots(),
        tools,
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Generate one random vertical clip. The JSON body is optional.
pub async fn generate_clip(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<ClipReport>> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        GenerateRequest::default()
    } else {
        serde_json::from_slice::<GenerateRequest>(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))?
    };

    info!(?request, "Clip generation requested");
    let report = state.container.clip_interactor().execute(request).await?;
    Ok(Json(report))
}

#[derive(Serialize)]
pub struct ClipListResponse {
    pub success: bool,
    pub sessions: Vec<SessionListing>,
}

pub async fn list_clips(State(state): State<AppState>) -> ApiResult<Json<ClipListResponse>> {
    let library = state.container.library_interactor();
    let sessions = tokio::task::spawn_blocking(move || library.list_sessions())
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;
    Ok(Json(ClipListResponse {
        success: true,
        sessions,
    }))
}

pub async fn download_clip(
    State(state): State<AppState>,
    Path((session_id, file)): Path<(String, String)>,
) -> ApiResult<Response> {
    let path = state
        .container
        .library_interactor()
        .open_session_file(&session_id, &file)?;
    stream_file(path, true).await
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<DeleteOutcome>> {
    let outcome = state
        .container
        .library_interactor()
        .delete_session(&session_id)
        .await?;
    Ok(Json(outcome))
}

pub async fn serve_static(
    State(state): State<AppState>,
    Path((root, path)): Path<(String, String)>,
) -> ApiResult<Response> {
    let resolved = state
        .container
        .library_interactor()
        .resolve_static(&root, &path)?;
    stream_file(resolved, false).await
}

fn content_type(path: &FsPath) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("json") => "application/json",
        Some("srt") | Some("txt") => "text/plain; charset=utf-8",
        Some("vtt") => "text/vtt",
        _ => "application/octet-stream",
    }
}

async fn stream_file(path: PathBuf, attachment: bool) -> ApiResult<Response> {
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| DomainError::io(path.display(), e))?;
    let length = file
        .metadata()
        .await
        .map_err(|e| DomainError::io(path.display(), e))?
        .len();
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("download");

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type(&path))
        .header(header::CONTENT_LENGTH, length);
    if attachment {
        builder = builder.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        );
    }
    builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ApiError::internal(e.to_string()))
}
