//! HTTP Commands
//!
//! axum handlers for the public interview API and the admin API. Every JSON
//! handler answers with the `CommandResponse` envelope; errors carry the
//! `AppError` machine code and a matching status.

pub mod agents;
pub mod dashboard;
pub mod health;
pub mod interview;

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use tracing::{error, warn};

use crate::models::response::CommandResponse;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

/// State handed to every handler
pub type SharedState = Arc<AppState>;

/// Status plus JSON envelope
pub type ApiResponse<T> = (StatusCode, Json<CommandResponse<T>>);

/// Largest accepted request body (PDF and audio uploads)
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Build the application router
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(health::get_health))
        .route("/api/upload", post(agents::upload_preview))
        .route("/api/admin/upload", post(agents::create_agent))
        .route("/api/agent/:agent_id", get(agents::get_agent))
        .route("/api/admin/agents", get(agents::list_agents))
        .route("/api/admin/agents/:agent_id", axum::routing::delete(agents::delete_agent))
        .route("/api/admin/agents/:agent_id/sessions", get(agents::agent_sessions))
        .route("/api/admin/agents/:agent_id/analytics", get(agents::agent_analytics))
        .route("/api/agent/:agent_id/interview/start", post(interview::start_interview))
        .route("/api/agent/:agent_id/interview/turn", post(interview::submit_turn))
        .route("/api/agent/:agent_id/interview/turn-audio", post(interview::submit_turn_audio))
        .route("/api/agent/:agent_id/interview/speak", post(interview::speak))
        .route("/api/agent/:agent_id/interview/finalize", post(interview::finalize))
        .route(
            "/api/agent/:agent_id/interview/session/:session_id",
            get(interview::get_session),
        )
        .route(
            "/api/agent/:agent_id/submission/complete",
            post(interview::complete_submission),
        )
        .route("/api/agent/:agent_id/questions", post(interview::generate_questions))
        .route("/api/admin/dashboard/sessions", get(dashboard::list_sessions))
        .route("/api/admin/dashboard/sessions/:session_id", get(dashboard::get_session))
        .route("/api/admin/dashboard/sessions/:session_id/pdf", get(dashboard::preview_pdf))
        .route(
            "/api/admin/dashboard/sessions/:session_id/download",
            get(dashboard::download_pdf),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// HTTP status for an application error
pub fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::Validation(_) | AppError::Document(_) => StatusCode::BAD_REQUEST,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::OracleRateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
        AppError::OracleAuth(_) | AppError::OracleRequest(_) | AppError::Speech(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Wrap a result in the envelope
pub fn respond<T>(result: AppResult<T>) -> ApiResponse<T> {
    match result {
        Ok(data) => (StatusCode::OK, Json(CommandResponse::ok(data))),
        Err(e) => failure(e),
    }
}

/// Error envelope with the mapped status
pub fn failure<T>(error: AppError) -> ApiResponse<T> {
    let status = status_for(&error);
    if status.is_server_error() {
        error!(code = error.code(), error = %error, "Request failed");
    } else {
        warn!(code = error.code(), error = %error, "Request rejected");
    }
    (status, Json(CommandResponse::from_error(&error)))
}

/// Unwrap a JSON body, reporting a malformed one as a validation error
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    body.map(|Json(value)| value)
        .map_err(|_| AppError::validation("Invalid or missing JSON body."))
}

/// A file part of a multipart request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Multipart request split into file and text parts
#[derive(Debug, Default)]
pub struct MultipartForm {
    files: HashMap<String, UploadedFile>,
    fields: HashMap<String, String>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let invalid = |e: axum::extract::multipart::MultipartError| {
            AppError::validation(format!("Invalid multipart body: {}", e))
        };

        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(invalid)? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(invalid)?;
                    form.files.insert(
                        name,
                        UploadedFile {
                            filename,
                            content_type,
                            bytes,
                        },
                    );
                }
                None => {
                    let text = field.text().await.map_err(invalid)?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    /// Take a file part
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    /// Trimmed, non-empty text part
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Checkbox-style flag (`true`, `1`, `yes`, `on`)
    pub fn flag(&self, name: &str) -> bool {
        self.text(name).is_some_and(|v| {
            matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
        })
    }
}

/// Require a named PDF file part
pub fn require_pdf(form: &mut MultipartForm, name: &str) -> AppResult<UploadedFile> {
    let file = form
        .take_file(name)
        .ok_or_else(|| AppError::validation("Missing file field. Use form-data key 'file'."))?;
    if file.filename.trim().is_empty() {
        return Err(AppError::validation("No file selected."));
    }
    if !file.filename.to_ascii_lowercase().ends_with(".pdf") {
        return Err(AppError::validation("Only PDF files are supported."));
    }
    Ok(file)
}
