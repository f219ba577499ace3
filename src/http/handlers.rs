use super::state::AppState;
use crate::audio;
use anyhow::{Context, Result};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct RecognizeResponse {
    pub success: bool,
    pub result: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub active_sessions: usize,
    pub timestamp: DateTime<Utc>,
}

/// The `file` field of a recognition request
struct Upload {
    file_name: Option<String>,
    data: Vec<u8>,
}

impl Upload {
    fn extension(&self) -> Option<&str> {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error,
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/asr/recognize
/// Recognize an uploaded audio file
pub async fn recognize(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let upload = match read_upload(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            return error_response(StatusCode::BAD_REQUEST, "Please upload an audio file".to_string())
        }
        Err(e) => {
            warn!("Rejected upload: {:#}", e);
            return error_response(StatusCode::BAD_REQUEST, format!("Invalid upload: {:#}", e));
        }
    };

    info!(
        "Received upload {} ({} bytes)",
        upload.file_name.as_deref().unwrap_or("<unnamed>"),
        upload.data.len()
    );

    if let Some(dir) = &state.upload_dir {
        match persist_upload(dir, &upload).await {
            Ok(path) => info!("File uploaded to {}", path.display()),
            Err(e) => {
                error!("Failed to store upload: {:#}", e);
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("File processing failed: {:#}", e),
                );
            }
        }
    }

    let audio = match prepare_audio(upload, state.sample_rate).await {
        Ok(audio) => audio,
        Err(e) => {
            error!("Failed to prepare audio: {:#}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("File processing failed: {:#}", e),
            );
        }
    };

    match state.manager.recognize(audio).await {
        Ok(result) => (
            StatusCode::OK,
            Json(RecognizeResponse {
                success: true,
                result,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Speech recognition failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Speech recognition failed: {}", e),
            )
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            active_sessions: state.manager.active_sessions(),
            timestamp: Utc::now(),
        }),
    )
}

// ============================================================================
// Helpers
// ============================================================================

/// Read the `file` field. `None` if it is missing or empty.
async fn read_upload(multipart: &mut Multipart) -> Result<Option<Upload>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.context("Failed to read uploaded file")?;

        if data.is_empty() {
            return Ok(None);
        }

        return Ok(Some(Upload {
            file_name,
            data: data.to_vec(),
        }));
    }

    Ok(None)
}

/// Store an upload under a fresh name, keeping its extension
async fn persist_upload(dir: &Path, upload: &Upload) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;

    let file_name = match upload.extension() {
        Some(ext) => format!("{}.{}", uuid::Uuid::new_v4(), ext),
        None => uuid::Uuid::new_v4().to_string(),
    };
    let path = dir.join(file_name);

    tokio::fs::write(&path, &upload.data)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(path)
}

/// Convert the upload to 16-bit mono PCM at `sample_rate`.
///
/// Payloads that are not recognised as audio are passed through unchanged.
async fn prepare_audio(upload: Upload, sample_rate: u32) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || {
        let extension = upload.extension().map(str::to_string);
        audio::prepare(upload.data, extension.as_deref(), sample_rate)
    })
    .await
    .context("Audio conversion task panicked")?
}
