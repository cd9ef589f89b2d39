//! Interview Commands
//!
//! Public endpoints a respondent's client drives: start, text and audio turns,
//! speech synthesis, finalization, and session state. Also the direct
//! submission path and question generation for clients that render the form
//! themselves.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{failure, json_body, respond, ApiResponse, MultipartForm, SharedState};
use crate::models::interview::{
    FinalizationArtifacts, FinalizeRequest, QuestionsRequest, QuestionsResponse, SessionSnapshot,
    SpeakRequest, SpeechResponse, StartInterviewRequest, StartInterviewResponse, SubmissionRequest,
    SubmissionResponse, TurnAudioResponse, TurnRequest, TurnResponse,
};
use crate::services::speech::AudioClip;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

/// Data attached to a retryable turn failure so the client still has a prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRetry {
    pub session_id: String,
    pub assistant_response: String,
}

/// `POST /api/agent/:agent_id/interview/start`
pub async fn start_interview(
    State(state): State<SharedState>,
    Path(agent_id): Path<String>,
    body: Option<Json<StartInterviewRequest>>,
) -> ApiResponse<StartInterviewResponse> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    respond(
        state
            .interviews()
            .start_interview(&agent_id, request.language_code.as_deref()),
    )
}

/// `POST /api/agent/:agent_id/interview/turn`
pub async fn submit_turn(
    State(state): State<SharedState>,
    Path(agent_id): Path<String>,
    body: Result<Json<TurnRequest>, JsonRejection>,
) -> Response {
    let request = match json_body(body) {
        Ok(request) => request,
        Err(e) => return failure::<TurnResponse>(e).into_response(),
    };

    let result = state
        .interviews()
        .submit_turn(
            &agent_id,
            &request.session_id,
            &request.user_input,
            request.was_interruption,
        )
        .await;

    match result {
        Ok(turn) => respond(Ok(turn)).into_response(),
        Err(e) => turn_failure(&state, &request.session_id, e).await,
    }
}

/// Failed turn envelope; retryable oracle failures carry a re-ask of the
/// current field.
async fn turn_failure(state: &AppState, session_id: &str, error: AppError) -> Response {
    if !error.is_retryable() {
        return failure::<TurnResponse>(error).into_response();
    }
    let Some(assistant_response) = state.interviews().reprompt(session_id).await else {
        return failure::<TurnResponse>(error).into_response();
    };

    let (status, Json(envelope)) = failure::<TurnRetry>(error);
    let envelope = envelope.with_data(TurnRetry {
        session_id: session_id.trim().to_string(),
        assistant_response,
    });
    (status, Json(envelope)).into_response()
}

/// `POST /api/agent/:agent_id/interview/turn-audio`
///
/// Multipart fields: `session_id`, `was_interruption`, and the `audio` file.
pub async fn submit_turn_audio(
    State(state): State<SharedState>,
    Path(agent_id): Path<String>,
    multipart: Multipart,
) -> Response {
    let (session_id, transcript, was_interruption) =
        match transcribe_turn(&state, &agent_id, multipart).await {
            Ok(parts) => parts,
            Err(e) => return failure::<TurnAudioResponse>(e).into_response(),
        };

    let turn = match state
        .interviews()
        .submit_turn(&agent_id, &session_id, &transcript, was_interruption)
        .await
    {
        Ok(turn) => turn,
        Err(e) => return turn_failure(&state, &session_id, e).await,
    };

    let (audio_mime_type, audio_base64) = synthesize_reply(&state, &turn.assistant_response).await;
    respond(Ok(TurnAudioResponse {
        turn,
        user_transcript: transcript,
        audio_mime_type,
        audio_base64,
    }))
    .into_response()
}

async fn transcribe_turn(
    state: &AppState,
    agent_id: &str,
    multipart: Multipart,
) -> AppResult<(String, String, bool)> {
    let mut form = MultipartForm::read(multipart).await?;
    let session_id = form
        .text("session_id")
        .map(str::to_string)
        .ok_or_else(|| AppError::validation("Missing session_id."))?;
    let was_interruption = form.flag("was_interruption");
    let audio = form
        .take_file("audio")
        .ok_or_else(|| AppError::validation("Missing audio file."))?;
    if audio.bytes.is_empty() {
        return Err(AppError::validation("Uploaded audio is empty."));
    }

    let snapshot = state.interviews().session_snapshot(agent_id, &session_id).await?;
    let language = auraforming_core::Language::resolve(Some(snapshot.language_code.as_str()));

    let clip = AudioClip::new(
        audio.bytes.to_vec(),
        Some(audio.filename.as_str()),
        audio.content_type.as_deref(),
    );
    let transcript = state.stt().transcribe(clip, Some(language.family())).await?;
    if transcript.trim().is_empty() {
        return Err(AppError::validation("No speech detected in audio. Please try again."));
    }

    info!(
        session_id = %session_id,
        chars = transcript.chars().count(),
        "Audio turn transcribed"
    );
    Ok((session_id, transcript, was_interruption))
}

/// Synthesized reply; a synthesis failure leaves the already applied turn
/// intact and returns no audio.
async fn synthesize_reply(state: &AppState, text: &str) -> (String, String) {
    if text.trim().is_empty() || !state.tts().is_configured() {
        return (String::new(), String::new());
    }
    match state.tts().synthesize(text).await {
        Ok(audio) => (audio.mime_type, BASE64.encode(&audio.bytes)),
        Err(e) => {
            warn!(error = %e, "Reply synthesis failed, returning text only");
            (String::new(), String::new())
        }
    }
}

/// `POST /api/agent/:agent_id/interview/speak`
pub async fn speak(
    State(state): State<SharedState>,
    Path(agent_id): Path<String>,
    body: Result<Json<SpeakRequest>, JsonRejection>,
) -> ApiResponse<SpeechResponse> {
    respond(speak_text(&state, &agent_id, body).await)
}

async fn speak_text(
    state: &AppState,
    agent_id: &str,
    body: Result<Json<SpeakRequest>, JsonRejection>,
) -> AppResult<SpeechResponse> {
    let request = json_body(body)?;
    let text = request.text.trim();
    if text.is_empty() {
        return Err(AppError::validation("Missing text."));
    }
    state.interviews().load_agent(agent_id)?;

    let audio = state.tts().synthesize(text).await?;
    Ok(SpeechResponse {
        audio_mime_type: audio.mime_type,
        audio_base64: BASE64.encode(&audio.bytes),
    })
}

/// `POST /api/agent/:agent_id/interview/finalize`
pub async fn finalize(
    State(state): State<SharedState>,
    Path(agent_id): Path<String>,
    body: Result<Json<FinalizeRequest>, JsonRejection>,
) -> ApiResponse<FinalizationArtifacts> {
    let result = match json_body(body) {
        Ok(request) => {
            state
                .interviews()
                .retry_finalization(&agent_id, &request.session_id)
                .await
        }
        Err(e) => Err(e),
    };
    respond(result)
}

/// `GET /api/agent/:agent_id/interview/session/:session_id`
pub async fn get_session(
    State(state): State<SharedState>,
    Path((agent_id, session_id)): Path<(String, String)>,
) -> ApiResponse<SessionSnapshot> {
    respond(state.interviews().session_snapshot(&agent_id, &session_id).await)
}

/// `POST /api/agent/:agent_id/submission/complete`
pub async fn complete_submission(
    State(state): State<SharedState>,
    Path(agent_id): Path<String>,
    body: Result<Json<SubmissionRequest>, JsonRejection>,
) -> ApiResponse<SubmissionResponse> {
    respond(json_body(body).and_then(|request| {
        state
            .interviews()
            .complete_submission(&agent_id, &request)
    }))
}

/// `POST /api/agent/:agent_id/questions`
pub async fn generate_questions(
    State(state): State<SharedState>,
    Path(agent_id): Path<String>,
    body: Option<Json<QuestionsRequest>>,
) -> ApiResponse<QuestionsResponse> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    respond(
        state
            .interviews()
            .generate_questions(&agent_id, request.language_code.as_deref())
            .await,
    )
}
