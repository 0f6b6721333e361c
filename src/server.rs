//! HTTP surface. Every route is served at the root and again under `/api`.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::error::{ProxyError, Result};
use crate::workflow::Workflow;

#[derive(Clone)]
pub struct AppState {
    workflow: Arc<Workflow>,
}

#[derive(Debug, Deserialize)]
pub struct PathRequest {
    #[serde(default)]
    pub remote_path: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchPathRequest {
    #[serde(default)]
    pub remote_paths: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScreenshotResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbcode: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MediaInfoResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mediainfo: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FileCheckResponse {
    pub success: bool,
    pub message: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub is_file: bool,
    #[serde(skip_serializing_if = "is_zero", default)]
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileCheckResult {
    pub path: String,
    pub exists: bool,
    pub is_file: bool,
    pub size: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchFileCheckResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<FileCheckResult>,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

fn status_for(err: &ProxyError) -> StatusCode {
    if err.is_input_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

pub fn create_app(workflow: Arc<Workflow>) -> Router {
    let routes = Router::new()
        .route("/health", get(health_handler))
        .route("/media/screenshot", post(screenshot_handler))
        .route("/media/mediainfo", post(mediainfo_handler))
        .route("/file/check", post(file_check_handler))
        .route("/file/batch-check", post(batch_file_check_handler))
        .method_not_allowed_fallback(method_not_allowed_handler);

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { workflow })
}

pub async fn serve(workflow: Arc<Workflow>, host: &str, port: u16) -> Result<()> {
    let app = create_app(workflow);
    let listener = tokio::net::TcpListener::bind((host, port)).await?;

    info!("Media proxy listening on {}", listener.local_addr()?);
    info!("  GET  /api/health");
    info!("  POST /api/media/screenshot");
    info!("  POST /api/media/mediainfo");
    info!("  POST /api/file/check");
    info!("  POST /api/file/batch-check");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn method_not_allowed_handler() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(serde_json::json!({
            "success": false,
            "message": "Method not allowed",
        })),
    )
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "message": "Media proxy is running",
    }))
}

async fn screenshot_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PathRequest>, JsonRejection>,
) -> (StatusCode, Json<ScreenshotResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ScreenshotResponse {
                    success: false,
                    message: format!("Invalid JSON body: {}", rejection.body_text()),
                    bbcode: None,
                }),
            );
        }
    };

    match state.workflow.screenshots(&request.remote_path).await {
        Ok(report) => (
            StatusCode::OK,
            Json(ScreenshotResponse {
                success: true,
                message: "All screenshots uploaded".to_string(),
                bbcode: Some(report.bbcode),
            }),
        ),
        Err(e) => {
            error!("Screenshot request failed: {}", e);
            (
                status_for(&e),
                Json(ScreenshotResponse {
                    success: false,
                    message: e.to_string(),
                    bbcode: None,
                }),
            )
        }
    }
}

async fn mediainfo_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PathRequest>, JsonRejection>,
) -> (StatusCode, Json<MediaInfoResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(MediaInfoResponse {
                    success: false,
                    message: format!("Invalid JSON body: {}", rejection.body_text()),
                    mediainfo: None,
                }),
            );
        }
    };

    match state.workflow.mediainfo(&request.remote_path).await {
        Ok(report) => (
            StatusCode::OK,
            Json(MediaInfoResponse {
                success: true,
                message: "MediaInfo retrieved".to_string(),
                mediainfo: Some(report),
            }),
        ),
        Err(e) => {
            error!("MediaInfo request failed: {}", e);
            (
                status_for(&e),
                Json(MediaInfoResponse {
                    success: false,
                    message: e.to_string(),
                    mediainfo: None,
                }),
            )
        }
    }
}

async fn file_check_handler(
    payload: std::result::Result<Json<PathRequest>, JsonRejection>,
) -> (StatusCode, Json<FileCheckResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(FileCheckResponse {
                    message: format!("Invalid JSON body: {}", rejection.body_text()),
                    ..Default::default()
                }),
            );
        }
    };

    if request.remote_path.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(FileCheckResponse {
                message: "remote_path must not be empty".to_string(),
                ..Default::default()
            }),
        );
    }

    match tokio::fs::metadata(&request.remote_path).await {
        Ok(metadata) => {
            info!(
                "File check: {} exists (file: {}, {} bytes)",
                request.remote_path,
                metadata.is_file(),
                metadata.len()
            );
            (
                StatusCode::OK,
                Json(FileCheckResponse {
                    success: true,
                    message: "Check complete".to_string(),
                    exists: true,
                    is_file: !metadata.is_dir(),
                    size: metadata.len(),
                }),
            )
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("File check: {} does not exist", request.remote_path);
            (
                StatusCode::OK,
                Json(FileCheckResponse {
                    success: true,
                    message: "Check complete".to_string(),
                    ..Default::default()
                }),
            )
        }
        Err(e) => {
            warn!("File check: cannot access {}: {}", request.remote_path, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FileCheckResponse {
                    message: format!("Cannot access path: {}", e),
                    ..Default::default()
                }),
            )
        }
    }
}

async fn batch_file_check_handler(
    payload: std::result::Result<Json<BatchPathRequest>, JsonRejection>,
) -> (StatusCode, Json<BatchFileCheckResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(BatchFileCheckResponse {
                    success: false,
                    message: format!("Invalid JSON body: {}", rejection.body_text()),
                    results: Vec::new(),
                }),
            );
        }
    };

    if request.remote_paths.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(BatchFileCheckResponse {
                success: false,
                message: "remote_paths must not be empty".to_string(),
                results: Vec::new(),
            }),
        );
    }

    let mut results = Vec::with_capacity(request.remote_paths.len());
    for path in request.remote_paths {
        let result = match tokio::fs::metadata(&path).await {
            Ok(metadata) => FileCheckResult {
                exists: true,
                is_file: !metadata.is_dir(),
                size: metadata.len(),
                path,
            },
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Batch file check: cannot access {}: {}", path, e);
                }
                FileCheckResult {
                    path,
                    exists: false,
                    is_file: false,
                    size: 0,
                }
            }
        };
        results.push(result);
    }

    info!(
        "Batch file check: {} of {} paths exist",
        results.iter().filter(|r| r.exists).count(),
        results.len()
    );

    (
        StatusCode::OK,
        Json(BatchFileCheckResponse {
            success: true,
            message: "Batch check complete".to_string(),
            results,
        }),
    )
}
