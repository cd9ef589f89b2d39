//! Dashboard Commands
//!
//! Admin views over completed sessions and their filled documents.

use std::path::{Path as FsPath, PathBuf};

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use super::{failure, respond, ApiResponse, SharedState};
use crate::models::interview::{CompletedSessionRecord, CompletedSessionView};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::safe_data_file;

const SESSION_LIST_LIMIT: usize = 200;

/// Most recent completed sessions across all agents
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionList {
    pub sessions: Vec<CompletedSessionView>,
}

/// `GET /api/admin/dashboard/sessions`
pub async fn list_sessions(State(state): State<SharedState>) -> ApiResponse<SessionList> {
    respond(
        state
            .database()
            .list_completed_sessions(SESSION_LIST_LIMIT)
            .map(|records| SessionList {
                sessions: records.into_iter().map(CompletedSessionView::from).collect(),
            }),
    )
}

/// `GET /api/admin/dashboard/sessions/:session_id`
pub async fn get_session(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> ApiResponse<CompletedSessionView> {
    respond(completed_session(&state, &session_id).map(CompletedSessionView::from))
}

fn completed_session(state: &AppState, session_id: &str) -> AppResult<CompletedSessionRecord> {
    state
        .database()
        .get_completed_session(session_id.trim())?
        .ok_or_else(|| AppError::not_found("Session not found."))
}

/// Filled document of a session, constrained to the data directory
fn filled_document(state: &AppState, session_id: &str) -> AppResult<PathBuf> {
    let record = completed_session(state, session_id)?;
    record
        .filled_pdf_path
        .as_deref()
        .and_then(|path| safe_data_file(state.data_dir(), FsPath::new(path)))
        .ok_or_else(|| AppError::not_found("Filled PDF not found."))
}

async fn serve_document(state: &AppState, session_id: &str, disposition: String) -> Response {
    let bytes = match filled_document(state, session_id) {
        Ok(path) => tokio::fs::read(&path).await.map_err(AppError::from),
        Err(e) => Err(e),
    };
    match bytes {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => failure::<()>(e).into_response(),
    }
}

/// `GET /api/admin/dashboard/sessions/:session_id/pdf`: inline preview
pub async fn preview_pdf(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Response {
    let disposition = format!("inline; filename=\"completed-{}.pdf\"", session_id.trim());
    serve_document(&state, &session_id, disposition).await
}

/// `GET /api/admin/dashboard/sessions/:session_id/download`
pub async fn download_pdf(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Response {
    let disposition = format!("attachment; filename=\"completed-{}.pdf\"", session_id.trim());
    serve_document(&state, &session_id, disposition).await
}
