//! Session Finalizer
//!
//! Turns a completed session into a filled document under
//! `<data_dir>/completed/` and a durable record in the database. The record
//! is written even when the document cannot be produced, so completion never
//! depends on the filler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::session::InterviewSession;
use crate::models::agent::AgentRecord;
use crate::models::interview::{session_download_url, CompletedSessionRecord, FinalizationArtifacts};
use crate::services::document::DocumentFiller;
use crate::storage::database::Database;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{completed_dir, ensure_dir};

/// What a finalization attempt produced
#[derive(Debug)]
pub struct FinalizationOutcome {
    /// The persisted record (always written)
    pub record: CompletedSessionRecord,
    /// Present when the filled document was written
    pub artifacts: Option<FinalizationArtifacts>,
    /// Why the document could not be produced
    pub error: Option<AppError>,
}

/// Produces filled documents and completed-session records
pub struct SessionFinalizer {
    db: Arc<Database>,
    filler: Arc<dyn DocumentFiller>,
    data_dir: PathBuf,
}

impl SessionFinalizer {
    pub fn new(db: Arc<Database>, filler: Arc<dyn DocumentFiller>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            filler,
            data_dir: data_dir.into(),
        }
    }

    /// Where a session's filled document is written
    pub fn output_path(&self, session_id: &str) -> PathBuf {
        completed_dir(&self.data_dir).join(format!("{}_completed.pdf", session_id))
    }

    /// Finalize a completed session.
    ///
    /// Fill failures are captured in the outcome; only a failure to persist
    /// the record is returned as an error.
    pub fn finalize(&self, agent: &AgentRecord, session: &InterviewSession) -> AppResult<FinalizationOutcome> {
        if !session.completed() {
            return Err(AppError::validation("Interview is not complete yet."));
        }

        let filled = self.write_filled_document(agent, session);
        let (artifacts, error) = match filled {
            Ok(path) => {
                let artifacts = FinalizationArtifacts {
                    session_id: session.session_id.clone(),
                    filled_pdf_path: path.to_string_lossy().to_string(),
                    download_url: session_download_url(&session.session_id),
                    duration_seconds: session.duration_seconds(),
                };
                (Some(artifacts), None)
            }
            Err(e) => {
                error!(
                    agent_id = %agent.agent_id,
                    session_id = %session.session_id,
                    error = %e,
                    "Failed to produce filled document"
                );
                (None, Some(AppError::finalization(e.to_string())))
            }
        };

        let now = Utc::now().to_rfc3339();
        let record = CompletedSessionRecord {
            session_id: session.session_id.clone(),
            agent_id: agent.agent_id.clone(),
            answers: session.answers.clone(),
            filled_pdf_path: artifacts.as_ref().map(|a| a.filled_pdf_path.clone()),
            language_code: session.language.code.to_string(),
            language_label: session.language.label.to_string(),
            started_at: session.created_at.to_rfc3339(),
            completed_at: session.updated_at.to_rfc3339(),
            duration_seconds: session.duration_seconds(),
            created_at: now,
        };
        self.db.save_completed_session(&record)?;

        info!(
            agent_id = %agent.agent_id,
            session_id = %session.session_id,
            answers = record.answers.len(),
            filled = artifacts.is_some(),
            duration_seconds = record.duration_seconds,
            "Session finalized"
        );

        Ok(FinalizationOutcome {
            record,
            artifacts,
            error,
        })
    }

    fn write_filled_document(&self, agent: &AgentRecord, session: &InterviewSession) -> AppResult<PathBuf> {
        let source = Path::new(&agent.pdf_path);
        let bytes = std::fs::read(source).map_err(|e| {
            AppError::document(format!("Source document {} unreadable: {}", source.display(), e))
        })?;

        let filled = self.filler.fill(&bytes, &session.answers)?;
        if !filled.missing.is_empty() {
            warn!(
                session_id = %session.session_id,
                missing = ?filled.missing,
                "Answers without a matching document field"
            );
        }

        ensure_dir(&completed_dir(&self.data_dir))?;
        let path = self.output_path(&session.session_id);
        std::fs::write(&path, &filled.bytes)?;
        Ok(path)
    }
}
