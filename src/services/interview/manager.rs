//! Interview Manager
//!
//! Orchestrates interviews end to end: catalog loading, session lifecycle,
//! oracle turns, and finalization. Turns on one session are serialized by
//! that session's mutex, which is held across the oracle call.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use auraforming_core::{FieldDescriptor, Language};

use super::catalog::FieldCatalog;
use super::evaluator::{TurnContext, TurnEvaluator};
use super::finalizer::SessionFinalizer;
use super::questions::QuestionWriter;
use super::registry::{SessionStore, SharedSession};
use super::session::InterviewSession;
use super::submission::coerce_submission;
use crate::models::agent::{AgentRecord, StoredField};
use crate::models::interview::{
    session_download_url, FinalizationArtifacts, QuestionsResponse, SessionSnapshot,
    StartInterviewResponse, SubmissionRequest, SubmissionResponse, TurnIntent, TurnResponse,
};
use crate::services::document::{DocumentInspector, InspectedField};
use crate::storage::database::Database;
use crate::utils::error::{AppError, AppResult};
use crate::utils::truncate_for_log;

/// Utterances are logged up to this many characters
const MAX_LOGGED_UTTERANCE: usize = 240;

/// Interview orchestration service
pub struct InterviewManager {
    db: Arc<Database>,
    store: Arc<dyn SessionStore>,
    evaluator: TurnEvaluator,
    questions: QuestionWriter,
    inspector: Arc<dyn DocumentInspector>,
    finalizer: SessionFinalizer,
    /// Catalogs by lower-cased agent id
    catalogs: DashMap<String, Arc<FieldCatalog>>,
    default_language: String,
}

impl InterviewManager {
    pub fn new(
        db: Arc<Database>,
        store: Arc<dyn SessionStore>,
        evaluator: TurnEvaluator,
        questions: QuestionWriter,
        inspector: Arc<dyn DocumentInspector>,
        finalizer: SessionFinalizer,
        default_language: impl Into<String>,
    ) -> Self {
        Self {
            db,
            store,
            evaluator,
            questions,
            inspector,
            finalizer,
            catalogs: DashMap::new(),
            default_language: default_language.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Load a stored agent by id (case-insensitive)
    pub fn load_agent(&self, agent_id: &str) -> AppResult<AgentRecord> {
        let agent_id = agent_id.trim();
        if agent_id.is_empty() {
            return Err(AppError::validation("Missing agent_id."));
        }
        self.db
            .get_agent(agent_id)?
            .ok_or_else(|| AppError::not_found("Agent not found."))
    }

    /// Field catalog for an agent, derived once and cached
    pub fn catalog_for(&self, agent: &AgentRecord) -> AppResult<Arc<FieldCatalog>> {
        let cache_key = agent.agent_id.to_lowercase();
        if let Some(catalog) = self.catalogs.get(&cache_key) {
            return Ok(catalog.clone());
        }
        let catalog = Arc::new(self.derive_catalog(agent)?);
        debug!(agent_id = %agent.agent_id, fields = catalog.len(), "Field catalog derived");
        self.catalogs.insert(cache_key, catalog.clone());
        Ok(catalog)
    }

    /// Drop a cached catalog (after the agent changes or is deleted)
    pub fn invalidate_agent(&self, agent_id: &str) {
        self.catalogs.remove(&agent_id.trim().to_lowercase());
    }

    fn derive_catalog(&self, agent: &AgentRecord) -> AppResult<FieldCatalog> {
        let schema = &agent.schema;
        if schema.interview_fields.iter().any(|f| !f.key.trim().is_empty()) {
            return FieldCatalog::from_stored(&schema.interview_fields);
        }

        match self.inspect_source(agent) {
            Ok(inspected) => {
                let ordered = order_by_widget_names(inspected, &schema.widget_names);
                if !ordered.is_empty() {
                    return FieldCatalog::from_stored(&ordered);
                }
            }
            Err(e) => warn!(
                agent_id = %agent.agent_id,
                error = %e,
                "Source document unreadable, falling back to stored widget names"
            ),
        }

        FieldCatalog::from_widget_names(&schema.widget_names)
    }

    fn inspect_source(&self, agent: &AgentRecord) -> AppResult<Vec<InspectedField>> {
        let bytes = std::fs::read(&agent.pdf_path)
            .map_err(|e| AppError::document(format!("Cannot read {}: {}", agent.pdf_path, e)))?;
        self.inspector.inspect(&bytes)
    }

    /// Start a new interview for an agent
    pub fn start_interview(
        &self,
        agent_id: &str,
        language_code: Option<&str>,
    ) -> AppResult<StartInterviewResponse> {
        let agent = self.load_agent(agent_id)?;
        let catalog = self.catalog_for(&agent)?;
        let language = self.resolve_language(language_code);

        let session = InterviewSession::start(agent.agent_id.clone(), &catalog, language);
        let first_prompt = session.first_prompt(&catalog);
        let snapshot = session.snapshot(&catalog);
        self.store.insert(session);

        info!(
            agent_id = %agent.agent_id,
            session_id = %snapshot.session_id,
            fields = snapshot.ordered_fields.len(),
            language = %snapshot.language_code,
            "Interview started"
        );

        Ok(StartInterviewResponse {
            session_id: snapshot.session_id,
            agent_id: snapshot.agent_id,
            current_field: snapshot.current_field,
            current_label: snapshot.current_label,
            ordered_fields: snapshot.ordered_fields,
            answers: snapshot.answers,
            completed: snapshot.completed,
            language_code: snapshot.language_code,
            language_label: snapshot.language_label,
            first_prompt,
        })
    }

    /// Requested language, or the configured default when none is given
    fn resolve_language(&self, language_code: Option<&str>) -> Language {
        let requested = language_code
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.default_language.as_str());
        Language::resolve(Some(requested))
    }

    /// Fill and persist a form from a posted answers map, without an interview.
    ///
    /// Values go through the same coercion as interview answers. As with an
    /// interview, the record is persisted even when the document cannot be
    /// produced.
    pub fn complete_submission(
        &self,
        agent_id: &str,
        request: &SubmissionRequest,
    ) -> AppResult<SubmissionResponse> {
        let agent = self.load_agent(agent_id)?;
        let catalog = self.catalog_for(&agent)?;
        let coerced = coerce_submission(&catalog, &request.answers)?;
        if !coerced.ignored.is_empty() {
            warn!(
                agent_id = %agent.agent_id,
                ignored = ?coerced.ignored,
                "Submission names fields the form does not have"
            );
        }

        let language = self.resolve_language(request.language_code.as_deref());
        let session = InterviewSession::submitted(agent.agent_id.clone(), language, coerced.answers);
        let outcome = self.finalizer.finalize(&agent, &session)?;

        info!(
            agent_id = %agent.agent_id,
            submission_id = %session.session_id,
            answers = outcome.record.answers.len(),
            filled = outcome.artifacts.is_some(),
            "Submission completed"
        );

        Ok(SubmissionResponse {
            submission_id: session.session_id,
            agent_id: agent.agent_id,
            message: "Submission completed successfully.".to_string(),
            answers: outcome.record.answers,
            ignored_fields: coerced.ignored,
            questions: catalog
                .fields()
                .iter()
                .map(|f| (f.key.clone(), f.label.clone()))
                .collect(),
            finalization: outcome.artifacts,
            finalization_error: outcome.error.map(|e| e.to_string()),
        })
    }

    /// One conversational question per field or field group
    pub async fn generate_questions(
        &self,
        agent_id: &str,
        language_code: Option<&str>,
    ) -> AppResult<QuestionsResponse> {
        let agent = self.load_agent(agent_id)?;
        let catalog = self.catalog_for(&agent)?;
        let language = self.resolve_language(language_code);
        let written = self
            .questions
            .write(&agent.agent_name, &catalog, language)
            .await?;

        info!(
            agent_id = %agent.agent_id,
            questions = written.questions.len(),
            generated = written.generated,
            language = language.code,
            "Questions generated"
        );

        Ok(QuestionsResponse {
            agent_id: agent.agent_id,
            language_code: language.code.to_string(),
            generated: written.generated,
            questions: written.questions,
            form_fields: catalog.keys(),
        })
    }

    fn live_session(&self, agent_id: &str, session_id: &str) -> AppResult<SharedSession> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(AppError::validation("Missing session_id."));
        }
        let agent_id = agent_id.trim();
        if agent_id.is_empty() {
            return Err(AppError::validation("Missing agent_id."));
        }
        self.store
            .get(session_id)
            .ok_or_else(|| AppError::not_found("Interview session not found."))
    }

    fn check_owner(session: &InterviewSession, agent_id: &str) -> AppResult<()> {
        if session.agent_id.eq_ignore_ascii_case(agent_id.trim()) {
            Ok(())
        } else {
            Err(AppError::validation("Session does not match agent_id."))
        }
    }

    /// Process one utterance.
    ///
    /// Oracle failures are returned as errors with the session untouched, so
    /// the same turn can be retried. Turns on a completed session are
    /// acknowledged without calling the oracle.
    pub async fn submit_turn(
        &self,
        agent_id: &str,
        session_id: &str,
        utterance: &str,
        was_interruption: bool,
    ) -> AppResult<TurnResponse> {
        let shared = self.live_session(agent_id, session_id)?;
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Err(AppError::validation("Missing user_input."));
        }

        let mut session = shared.lock().await;
        Self::check_owner(&session, agent_id)?;
        let agent = self.load_agent(agent_id)?;
        let catalog = self.catalog_for(&agent)?;

        info!(
            agent_id = %agent.agent_id,
            session_id = %session.session_id,
            current_field = session.current_field().unwrap_or_default(),
            interruption = was_interruption,
            utterance = %truncate_for_log(utterance, MAX_LOGGED_UTTERANCE),
            "Turn received"
        );

        if session.completed() {
            let ack = session.prompts().already_complete();
            return Ok(turn_response(&session, &catalog, TurnIntent::Acknowledgment, true, ack));
        }

        let judgment = {
            let current = catalog.current_group(&session.ordered_fields);
            let current_label = catalog.prompt_label(&current);
            let remaining: Vec<&FieldDescriptor> = session
                .ordered_fields
                .iter()
                .filter_map(|k| catalog.get(k))
                .collect();
            let answers = session.answers_by_label(&catalog);
            let ctx = TurnContext {
                form_title: &agent.agent_name,
                current_label: &current_label,
                current: &current,
                next: catalog.next_after_group(&session.ordered_fields),
                remaining: &remaining,
                answers: &answers,
                utterance,
                was_interruption,
                language: session.language,
            };
            match self.evaluator.evaluate(&ctx).await {
                Ok(judgment) => judgment,
                Err(e) => {
                    warn!(
                        session_id = %session.session_id,
                        code = e.code(),
                        error = %e,
                        "Turn evaluation failed"
                    );
                    return Err(e);
                }
            }
        };

        let outcome = session.apply_judgment(&catalog, &judgment);
        info!(
            session_id = %session.session_id,
            intent = outcome.intent.as_str(),
            adequate = outcome.accepted,
            coercion_rejected = outcome.coercion_rejected,
            completed = session.completed(),
            remaining = session.ordered_fields.len(),
            "Turn processed"
        );

        let mut response = turn_response(
            &session,
            &catalog,
            outcome.intent,
            outcome.accepted,
            outcome.assistant_response,
        );

        if outcome.completed_now {
            match self.finalizer.finalize(&agent, &session) {
                Ok(finalized) => {
                    session.finalization = finalized.artifacts.clone();
                    response.finalization = finalized.artifacts;
                    response.finalization_error = finalized.error.map(|e| e.to_string());
                }
                Err(e) => {
                    warn!(session_id = %session.session_id, error = %e, "Finalization failed");
                    response.finalization_error = Some(e.to_string());
                }
            }
        }

        Ok(response)
    }

    /// Finalize a completed session again, e.g. after a fill failure
    pub async fn retry_finalization(
        &self,
        agent_id: &str,
        session_id: &str,
    ) -> AppResult<FinalizationArtifacts> {
        let shared = match self.live_session(agent_id, session_id) {
            Ok(shared) => shared,
            Err(AppError::NotFound(msg)) => return self.stored_artifacts(session_id, msg),
            Err(e) => return Err(e),
        };

        let mut session = shared.lock().await;
        Self::check_owner(&session, agent_id)?;
        if !session.completed() {
            return Err(AppError::validation("Interview is not complete yet."));
        }
        if let Some(existing) = &session.finalization {
            if std::path::Path::new(&existing.filled_pdf_path).is_file() {
                return Ok(existing.clone());
            }
        }

        let agent = self.load_agent(agent_id)?;
        let outcome = self.finalizer.finalize(&agent, &session)?;
        if let Some(error) = outcome.error {
            return Err(error);
        }
        let artifacts = outcome
            .artifacts
            .ok_or_else(|| AppError::finalization("No document was produced."))?;
        session.finalization = Some(artifacts.clone());
        Ok(artifacts)
    }

    /// Artifacts of a session that has left the registry but was persisted
    fn stored_artifacts(&self, session_id: &str, not_found: String) -> AppResult<FinalizationArtifacts> {
        let record = self
            .db
            .get_completed_session(session_id.trim())?
            .ok_or_else(|| AppError::NotFound(not_found))?;
        let path = record
            .filled_pdf_path
            .filter(|p| std::path::Path::new(p).is_file())
            .ok_or_else(|| AppError::finalization("Session expired before its document was produced."))?;
        Ok(FinalizationArtifacts {
            download_url: session_download_url(&record.session_id),
            session_id: record.session_id,
            filled_pdf_path: path,
            duration_seconds: record.duration_seconds,
        })
    }

    /// Locally synthesized re-ask of a session's current field
    pub async fn reprompt(&self, session_id: &str) -> Option<String> {
        let shared = self.store.get(session_id.trim())?;
        let session = shared.lock().await;
        let catalog = self.catalogs.get(&session.agent_id.to_lowercase())?.clone();
        Some(session.reprompt(&catalog))
    }

    /// Current state of a live session
    pub async fn session_snapshot(&self, agent_id: &str, session_id: &str) -> AppResult<SessionSnapshot> {
        let shared = self.live_session(agent_id, session_id)?;
        let session = shared.lock().await;
        Self::check_owner(&session, agent_id)?;
        let agent = self.load_agent(agent_id)?;
        let catalog = self.catalog_for(&agent)?;
        Ok(session.snapshot(&catalog))
    }

    /// Evict idle sessions
    pub fn evict_expired(&self, ttl: Duration) -> usize {
        let evicted = self.store.evict_expired(ttl);
        if evicted > 0 {
            info!(evicted, live = self.store.len(), "Evicted idle interview sessions");
        }
        evicted
    }
}

/// Inspected fields restricted to, and ordered by, the stored widget names.
/// Without stored names every inspected field is kept in document order.
fn order_by_widget_names(inspected: Vec<InspectedField>, widget_names: &[String]) -> Vec<StoredField> {
    let names: Vec<&str> = widget_names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        return inspected.iter().map(StoredField::from).collect();
    }
    names
        .iter()
        .filter_map(|name| inspected.iter().find(|f| f.key == *name))
        .map(StoredField::from)
        .collect()
}

fn turn_response(
    session: &InterviewSession,
    catalog: &FieldCatalog,
    intent: TurnIntent,
    is_answer_adequate: bool,
    assistant_response: String,
) -> TurnResponse {
    TurnResponse {
        session_id: session.session_id.clone(),
        completed: session.completed(),
        current_field: session.current_field().map(str::to_string),
        current_label: catalog.label_for(&session.ordered_fields),
        ordered_fields: session.ordered_fields.clone(),
        answers: session.answers.clone(),
        intent,
        is_answer_adequate,
        assistant_response,
        finalization: session.finalization.clone(),
        finalization_error: None,
    }
}
