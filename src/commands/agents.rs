//! Agent Commands
//!
//! Upload preview, agent creation from an uploaded form, and the admin views
//! over stored agents.

use std::path::Path as FsPath;

use axum::extract::{Multipart, Path, State};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{require_pdf, respond, ApiResponse, MultipartForm, SharedState};
use crate::models::agent::{
    AgentAnalytics, AgentRecord, AgentSchema, AgentSummary, DeleteAgentResult, StoredField,
    UploadPreview,
};
use crate::models::interview::CompletedSessionView;
use crate::services::document::InspectedField;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::uploads_dir;

const AGENT_LIST_LIMIT: usize = 300;
const AGENT_SESSION_LIMIT: usize = 300;

/// Stored agents for the admin list
#[derive(Debug, Serialize, Deserialize)]
pub struct AgentList {
    pub agents: Vec<AgentSummary>,
}

/// Completed sessions of one agent
#[derive(Debug, Serialize, Deserialize)]
pub struct AgentSessions {
    pub agent_id: String,
    pub sessions: Vec<CompletedSessionView>,
}

fn inspect_upload(state: &AppState, bytes: &[u8]) -> AppResult<Vec<InspectedField>> {
    state.inspector().inspect(bytes).map_err(|e| {
        warn!(error = %e, "Uploaded document could not be inspected");
        AppError::validation("Could not parse PDF. Please upload a valid fillable PDF.")
    })
}

/// `POST /api/upload`: list a form's fields without storing anything
pub async fn upload_preview(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> ApiResponse<UploadPreview> {
    respond(preview(&state, multipart).await)
}

async fn preview(state: &AppState, multipart: Multipart) -> AppResult<UploadPreview> {
    let mut form = MultipartForm::read(multipart).await?;
    let file = require_pdf(&mut form, "file")?;
    let fields = inspect_upload(state, &file.bytes)?;

    let mut field_names: Vec<String> = fields.into_iter().map(|f| f.key).collect();
    field_names.sort();
    Ok(UploadPreview {
        filename: file.filename,
        field_count: field_names.len(),
        field_names,
    })
}

/// `POST /api/admin/upload`: store a form and create its agent
pub async fn create_agent(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> ApiResponse<AgentSummary> {
    respond(store_agent(&state, multipart).await)
}

async fn store_agent(state: &AppState, multipart: Multipart) -> AppResult<AgentSummary> {
    let mut form = MultipartForm::read(multipart).await?;
    let file = require_pdf(&mut form, "file")?;
    let fields = inspect_upload(state, &file.bytes)?;
    if fields.is_empty() {
        return Err(AppError::validation("No fillable fields found in PDF."));
    }

    let agent_name = form
        .text("agent_name")
        .map(str::to_string)
        .unwrap_or_else(|| default_agent_name(&file.filename));
    let stored: Vec<StoredField> = fields.iter().map(StoredField::from).collect();
    let mut agent = AgentRecord::create(agent_name, String::new(), AgentSchema::from_fields(&stored));

    let dir = uploads_dir(state.data_dir());
    tokio::fs::create_dir_all(&dir).await?;
    let pdf_path = dir.join(format!("{}.pdf", agent.agent_id));
    tokio::fs::write(&pdf_path, &file.bytes).await?;
    agent.pdf_path = pdf_path.to_string_lossy().to_string();

    state.database().insert_agent(&agent)?;
    info!(
        agent_id = %agent.agent_id,
        agent_name = %agent.agent_name,
        fields = stored.len(),
        "Agent created"
    );

    Ok(AgentSummary {
        field_count: agent.schema.field_count(),
        intake_count: 0,
        share_url: agent.share_url(),
        agent,
    })
}

fn default_agent_name(filename: &str) -> String {
    FsPath::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Untitled form".to_string())
}

/// `GET /api/agent/:agent_id`
pub async fn get_agent(
    State(state): State<SharedState>,
    Path(agent_id): Path<String>,
) -> ApiResponse<AgentRecord> {
    respond(state.interviews().load_agent(&agent_id))
}

/// `GET /api/admin/agents`
pub async fn list_agents(State(state): State<SharedState>) -> ApiResponse<AgentList> {
    respond(
        state
            .database()
            .list_agents(AGENT_LIST_LIMIT)
            .map(|agents| AgentList { agents }),
    )
}

/// `DELETE /api/admin/agents/:agent_id`
pub async fn delete_agent(
    State(state): State<SharedState>,
    Path(agent_id): Path<String>,
) -> ApiResponse<DeleteAgentResult> {
    respond(remove_agent(&state, &agent_id).await)
}

async fn remove_agent(state: &AppState, agent_id: &str) -> AppResult<DeleteAgentResult> {
    let (agent_id, deleted_sessions, files) = state
        .database()
        .delete_agent(agent_id.trim(), state.data_dir())?
        .ok_or_else(|| AppError::not_found("Agent not found."))?;
    state.interviews().invalidate_agent(&agent_id);

    let mut deleted_files = 0;
    for file in files {
        match tokio::fs::remove_file(&file).await {
            Ok(()) => deleted_files += 1,
            Err(e) => warn!(path = %file.display(), error = %e, "Could not remove agent file"),
        }
    }

    info!(agent_id = %agent_id, deleted_sessions, deleted_files, "Agent deleted");
    Ok(DeleteAgentResult {
        agent_id,
        deleted_sessions,
        deleted_files,
    })
}

/// `GET /api/admin/agents/:agent_id/sessions`
pub async fn agent_sessions(
    State(state): State<SharedState>,
    Path(agent_id): Path<String>,
) -> ApiResponse<AgentSessions> {
    respond(sessions_of(&state, &agent_id))
}

fn sessions_of(state: &AppState, agent_id: &str) -> AppResult<AgentSessions> {
    let agent = state.interviews().load_agent(agent_id)?;
    let sessions = state
        .database()
        .list_completed_sessions_by_agent(&agent.agent_id, AGENT_SESSION_LIMIT)?
        .into_iter()
        .map(CompletedSessionView::from)
        .collect();
    Ok(AgentSessions {
        agent_id: agent.agent_id,
        sessions,
    })
}

/// `GET /api/admin/agents/:agent_id/analytics`
pub async fn agent_analytics(
    State(state): State<SharedState>,
    Path(agent_id): Path<String>,
) -> ApiResponse<AgentAnalytics> {
    respond(
        state
            .database()
            .agent_analytics(agent_id.trim())
            .and_then(|found| found.ok_or_else(|| AppError::not_found("Agent not found."))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_agent_name() {
        assert_eq!(default_agent_name("Intake Form.pdf"), "Intake Form");
        assert_eq!(default_agent_name(".pdf"), ".pdf");
        assert_eq!(default_agent_name(""), "Untitled form");
    }
}
