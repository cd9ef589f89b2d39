//! Interview Models
//!
//! Request/response payloads for interview sessions and the durable record a
//! finalized session leaves behind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How an utterance relates to the field being asked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnIntent {
    /// The user supplied a value
    Data,
    /// The answer is unclear and the field is re-asked
    Clarification,
    /// Small talk or confirmation without data
    Acknowledgment,
    /// The user interrupted the assistant with a side question
    BargeIn,
}

impl TurnIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Clarification => "clarification",
            Self::Acknowledgment => "acknowledgment",
            Self::BargeIn => "barge_in",
        }
    }

    /// Parse the oracle's intent string
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "data" => Some(Self::Data),
            "clarification" => Some(Self::Clarification),
            "acknowledgment" | "acknowledgement" => Some(Self::Acknowledgment),
            "barge_in" | "barge-in" | "bargein" => Some(Self::BargeIn),
            _ => None,
        }
    }

    /// All values, in the order given to the oracle
    pub fn all() -> [Self; 4] {
        [Self::Data, Self::Clarification, Self::Acknowledgment, Self::BargeIn]
    }
}

/// The oracle's verdict on one utterance. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnJudgment {
    pub intent: TurnIntent,
    pub is_adequate: bool,
    /// Single value in the base language (ungrouped fields)
    pub raw_value: String,
    /// Options selected for a field group (grouped fields only)
    pub collected_values: Vec<String>,
    /// Text to say back to the user in the session language
    pub spoken_response: String,
}

/// Start interview request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartInterviewRequest {
    #[serde(default)]
    pub language_code: Option<String>,
}

/// Text turn request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub user_input: String,
    #[serde(default)]
    pub was_interruption: bool,
}

/// Speak request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeakRequest {
    #[serde(default)]
    pub text: String,
}

/// Finalize request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinalizeRequest {
    #[serde(default)]
    pub session_id: String,
}

/// Direct submission request body: field key to posted value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionRequest {
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
    #[serde(default)]
    pub language_code: Option<String>,
}

/// Result of a direct submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub submission_id: String,
    pub agent_id: String,
    pub message: String,
    /// Values as written, after coercion
    pub answers: BTreeMap<String, String>,
    /// Posted keys that name no field of the form
    pub ignored_fields: Vec<String>,
    /// Field key to the label a respondent sees
    pub questions: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalization: Option<FinalizationArtifacts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalization_error: Option<String>,
}

/// Question generation request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionsRequest {
    #[serde(default)]
    pub language_code: Option<String>,
}

/// The question asked for one field or field group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldQuestion {
    /// Keys answered by this question, in document order
    pub fields: Vec<String>,
    pub label: String,
    pub question: String,
}

/// Conversational questions for every field of a form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionsResponse {
    pub agent_id: String,
    pub language_code: String,
    /// Whether the oracle wrote the questions (otherwise local templates did)
    pub generated: bool,
    pub questions: Vec<FieldQuestion>,
    pub form_fields: Vec<String>,
}

/// Response to starting an interview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartInterviewResponse {
    pub session_id: String,
    pub agent_id: String,
    pub current_field: Option<String>,
    pub current_label: Option<String>,
    pub ordered_fields: Vec<String>,
    pub answers: BTreeMap<String, String>,
    pub completed: bool,
    pub language_code: String,
    pub language_label: String,
    pub first_prompt: String,
}

/// Response to one interview turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub session_id: String,
    pub completed: bool,
    pub current_field: Option<String>,
    pub current_label: Option<String>,
    pub ordered_fields: Vec<String>,
    pub answers: BTreeMap<String, String>,
    pub intent: TurnIntent,
    pub is_answer_adequate: bool,
    pub assistant_response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalization: Option<FinalizationArtifacts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalization_error: Option<String>,
}

/// Audio turn response: the text turn plus transcript and synthesized reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnAudioResponse {
    #[serde(flatten)]
    pub turn: TurnResponse,
    pub user_transcript: String,
    pub audio_mime_type: String,
    pub audio_base64: String,
}

/// Synthesized speech payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechResponse {
    pub audio_mime_type: String,
    pub audio_base64: String,
}

/// Current state of a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub agent_id: String,
    pub completed: bool,
    pub current_field: Option<String>,
    pub current_label: Option<String>,
    pub ordered_fields: Vec<String>,
    pub answers: BTreeMap<String, String>,
    pub language_code: String,
    pub language_label: String,
    pub created_at: String,
    pub updated_at: String,
    pub finalization: Option<FinalizationArtifacts>,
}

/// What finalization produced for a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizationArtifacts {
    pub session_id: String,
    pub filled_pdf_path: String,
    pub download_url: String,
    pub duration_seconds: i64,
}

/// Durable record of a completed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSessionRecord {
    pub session_id: String,
    pub agent_id: String,
    pub answers: BTreeMap<String, String>,
    pub filled_pdf_path: Option<String>,
    pub language_code: String,
    pub language_label: String,
    pub started_at: String,
    pub completed_at: String,
    pub duration_seconds: i64,
    pub created_at: String,
}

/// Completed session as listed on the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedSessionView {
    #[serde(flatten)]
    pub record: CompletedSessionRecord,
    pub field_count: usize,
    pub pdf_preview_url: String,
    pub download_url: String,
}

impl From<CompletedSessionRecord> for CompletedSessionView {
    fn from(record: CompletedSessionRecord) -> Self {
        let field_count = record.answers.len();
        let pdf_preview_url = format!("/api/admin/dashboard/sessions/{}/pdf", record.session_id);
        let download_url = session_download_url(&record.session_id);
        Self {
            record,
            field_count,
            pdf_preview_url,
            download_url,
        }
    }
}

/// Download route for a session's filled document
pub fn session_download_url(session_id: &str) -> String {
    format!("/api/admin/dashboard/sessions/{}/download", session_id)
}
