//! Interview Integration Tests
//!
//! Tests for complete interviews driven through `InterviewManager`:
//! - Field-by-field progress with option and boolean coercion
//! - Grouped checkbox fields consumed in one turn
//! - Completion, finalization, and idempotent turns afterwards
//! - Oracle failures leaving the session untouched
//! - Turns on one session running one at a time
//! - Direct submissions, question generation, and health reporting
//!
//! The oracle is scripted; documents are filled as JSON.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::Json;

use auraforming::commands::health::get_health;
use auraforming::models::interview::{SubmissionRequest, TurnIntent};
use auraforming_llm::LlmError;

use super::common::{
    contact_form, data, ethnicity_form, field, group_data, questions, verdict, BrokenFiller, Harness,
};

fn is_spoken_sentence(text: &str) -> bool {
    text.split_whitespace().count() >= 2
}

// ============================================================================
// Field-by-field progress
// ============================================================================

#[tokio::test]
async fn test_start_asks_first_field() {
    let h = Harness::new(contact_form());
    let started = h.state.interviews().start_interview(h.agent_id(), None).unwrap();

    assert_eq!(started.current_field.as_deref(), Some("name"));
    assert_eq!(started.ordered_fields, vec!["name", "state", "subscribe"]);
    assert!(started.answers.is_empty());
    assert!(!started.completed);
    assert_eq!(started.language_code, "en-US");
    assert!(is_spoken_sentence(&started.first_prompt));
    assert_eq!(h.state.interviews().store().len(), 1);
}

#[tokio::test]
async fn test_start_resolves_regional_language() {
    let h = Harness::new(contact_form());
    let started = h
        .state
        .interviews()
        .start_interview(h.agent_id(), Some("es-AR"))
        .unwrap();

    assert_eq!(started.language_code, "es-ES");
    assert!(started.first_prompt.starts_with("Hola."));

    let fallback = h
        .state
        .interviews()
        .start_interview(h.agent_id(), Some("xx-YY"))
        .unwrap();
    assert_eq!(fallback.language_code, "en-US");
}

#[tokio::test]
async fn test_start_unknown_agent() {
    let h = Harness::new(contact_form());
    let err = h.state.interviews().start_interview("missing", None).unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    let err = h.state.interviews().start_interview("  ", None).unwrap_err();
    assert_eq!(err.code(), "VALIDATION");
}

#[tokio::test]
async fn test_text_answer_advances() {
    let h = Harness::new(contact_form());
    let sid = h.start();

    let turn = h.turn(&sid, "My name is Jane Doe", data("Jane Doe")).await.unwrap();

    assert!(turn.is_answer_adequate);
    assert_eq!(turn.intent, TurnIntent::Data);
    assert_eq!(turn.answers["name"], "Jane Doe");
    assert_eq!(turn.current_field.as_deref(), Some("state"));
    assert!(is_spoken_sentence(&turn.assistant_response));
    assert!(h.provider.last_prompt().unwrap().contains("My name is Jane Doe"));
}

#[tokio::test]
async fn test_option_matched_case_insensitively() {
    let h = Harness::new(contact_form());
    let sid = h.start();
    h.turn(&sid, "Jane Doe", data("Jane Doe")).await.unwrap();

    let turn = h.turn(&sid, "I live in california", data("ca")).await.unwrap();

    assert!(turn.is_answer_adequate);
    assert_eq!(turn.answers["state"], "CA");
    assert_eq!(turn.current_field.as_deref(), Some("subscribe"));
}

#[tokio::test]
async fn test_unmatched_option_reasks_with_choices() {
    let h = Harness::new(contact_form());
    let sid = h.start();
    h.turn(&sid, "Jane Doe", data("Jane Doe")).await.unwrap();

    let turn = h
        .turn(&sid, "somewhere out west", verdict("data", true, "somewhere out west", "Great!"))
        .await
        .unwrap();

    assert!(!turn.is_answer_adequate);
    assert_eq!(turn.ordered_fields, vec!["state", "subscribe"]);
    assert!(!turn.answers.contains_key("state"));
    assert!(turn.assistant_response.contains("CA, NY, TX"));
}

#[tokio::test]
async fn test_boolean_completes_and_finalizes() {
    let h = Harness::new(contact_form());
    let sid = h.start();
    h.turn(&sid, "Jane Doe", data("Jane Doe")).await.unwrap();
    h.turn(&sid, "texas", data("TX")).await.unwrap();

    let turn = h.turn(&sid, "yeah sure", data("yeah sure")).await.unwrap();

    assert!(turn.completed);
    assert!(turn.ordered_fields.is_empty());
    assert_eq!(turn.current_field, None);
    assert_eq!(turn.answers["subscribe"], "Yes");
    assert!(turn.finalization_error.is_none());

    let artifacts = turn.finalization.expect("finalization artifacts");
    assert_eq!(artifacts.session_id, sid);
    assert!(artifacts.download_url.ends_with(&format!("/{}/download", sid)));
    let written = std::fs::read(&artifacts.filled_pdf_path).unwrap();
    let filled: serde_json::Value = serde_json::from_slice(&written).unwrap();
    assert_eq!(filled["name"], "Jane Doe");
    assert_eq!(filled["state"], "TX");

    let record = h.state.database().get_completed_session(&sid).unwrap().unwrap();
    assert_eq!(record.answers.len(), 3);
    assert_eq!(record.agent_id, h.agent.agent_id);
    assert_eq!(record.filled_pdf_path.as_deref(), Some(artifacts.filled_pdf_path.as_str()));
}

// ============================================================================
// Grouped fields
// ============================================================================

#[tokio::test]
async fn test_group_consumed_in_one_turn() {
    let h = Harness::new(ethnicity_form());
    let started = h.state.interviews().start_interview(h.agent_id(), None).unwrap();
    assert_eq!(started.current_field.as_deref(), Some("ethnicity[0]"));

    let turn = h
        .turn(&started.session_id, "Hispanic and Asian", group_data(&["Hispanic", "Asian"]))
        .await
        .unwrap();

    assert!(turn.is_answer_adequate);
    assert_eq!(turn.ordered_fields, vec!["zip"]);
    assert_eq!(turn.answers["ethnicity[0]"], "Hispanic");
    assert_eq!(turn.answers["ethnicity[1]"], "Asian");
    assert_eq!(turn.answers["ethnicity[2]"], "");
}

#[tokio::test]
async fn test_group_with_unknown_option_kept_whole() {
    let h = Harness::new(ethnicity_form());
    let sid = h.start();

    let turn = h
        .turn(&sid, "Hispanic and Martian", group_data(&["Hispanic", "Martian"]))
        .await
        .unwrap();

    assert!(!turn.is_answer_adequate);
    assert_eq!(turn.ordered_fields.len(), 4);
    assert!(turn.answers.is_empty());
}

#[tokio::test]
async fn test_group_single_later_choice_checks_only_its_box() {
    let h = Harness::new(ethnicity_form());
    let sid = h.start();

    let turn = h.turn(&sid, "just Asian", group_data(&["Asian"])).await.unwrap();

    assert!(turn.is_answer_adequate);
    assert_eq!(turn.answers["ethnicity[0]"], "");
    assert_eq!(turn.answers["ethnicity[1]"], "Asian");
    assert_eq!(turn.answers["ethnicity[2]"], "");
}

#[tokio::test]
async fn test_group_none_of_these_moves_on() {
    let h = Harness::new(ethnicity_form());
    let sid = h.start();

    let turn = h
        .turn(&sid, "none of those apply to me", group_data(&["", "", ""]))
        .await
        .unwrap();

    assert!(turn.is_answer_adequate);
    assert_eq!(turn.ordered_fields, vec!["zip"]);
    assert_eq!(turn.current_label.as_deref(), Some("Zip"));
    assert!(turn.answers.values().all(String::is_empty));
}

// ============================================================================
// Progress and responses across a mixed conversation
// ============================================================================

#[tokio::test]
async fn test_progress_never_regresses_and_always_speaks() {
    let h = Harness::new(contact_form());
    let sid = h.start();

    let script = vec![
        ("what do you need?", verdict("clarification", false, "", "I need your full name.")),
        ("Jane", data("Jane")),
        ("wait", verdict("barge_in", false, "", "")),
        ("ny", data("NY")),
        ("hmm", verdict("acknowledgment", false, "", "")),
        ("no thanks", data("no")),
    ];

    let mut remaining = 3;
    for (utterance, reply) in script {
        let turn = h.turn(&sid, utterance, reply).await.unwrap();
        assert!(turn.ordered_fields.len() <= remaining, "progress regressed on {:?}", utterance);
        remaining = turn.ordered_fields.len();
        assert_eq!(turn.completed, turn.ordered_fields.is_empty());
        assert!(
            is_spoken_sentence(&turn.assistant_response),
            "empty reply on {:?}: {:?}",
            utterance,
            turn.assistant_response
        );
    }

    let snapshot = h.state.interviews().session_snapshot(h.agent_id(), &sid).await.unwrap();
    assert!(snapshot.completed);
    assert_eq!(snapshot.answers["subscribe"], "No");
}

#[tokio::test]
async fn test_completed_session_acknowledges_without_oracle() {
    let h = Harness::new(contact_form());
    let sid = h.start();
    h.turn(&sid, "Jane", data("Jane")).await.unwrap();
    h.turn(&sid, "CA", data("CA")).await.unwrap();
    let done = h.turn(&sid, "yes", data("yes")).await.unwrap();
    assert!(done.completed);
    let calls = h.provider.calls();

    let again = h
        .state
        .interviews()
        .submit_turn(h.agent_id(), &sid, "actually change my name", false)
        .await
        .unwrap();

    assert_eq!(h.provider.calls(), calls);
    assert!(again.completed);
    assert!(again.is_answer_adequate);
    assert_eq!(again.intent, TurnIntent::Acknowledgment);
    assert_eq!(again.answers, done.answers);
    assert!(is_spoken_sentence(&again.assistant_response));
}

#[tokio::test]
async fn test_japanese_session_reasks_in_japanese() {
    let h = Harness::new(contact_form());
    let started = h
        .state
        .interviews()
        .start_interview(h.agent_id(), Some("ja-JP"))
        .unwrap();
    assert!(started.first_prompt.starts_with("こんにちは。"));

    let turn = h
        .turn(&started.session_id, "えーと", verdict("clarification", false, "", ""))
        .await
        .unwrap();
    assert_eq!(turn.assistant_response, "Nameがまだ必要です。もう一度教えていただけますか？");

    let reprompt = h.state.interviews().reprompt(&started.session_id).await.unwrap();
    assert_eq!(reprompt, turn.assistant_response);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_turns_on_one_session_run_one_at_a_time() {
    let h = Harness::new(contact_form());
    let sid = h.start();
    h.provider.set_latency(Duration::from_millis(50));
    h.provider.reply(data("Jane Doe"));
    h.provider.reply(data("NY"));

    let spawn_turn = |utterance: &'static str| {
        let interviews = h.state.interviews().clone();
        let agent_id = h.agent_id().to_string();
        let sid = sid.clone();
        tokio::spawn(async move { interviews.submit_turn(&agent_id, &sid, utterance, false).await })
    };
    let first = spawn_turn("Jane Doe");
    let second = spawn_turn("New York");
    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert_eq!(h.provider.max_in_flight(), 1);
    assert_eq!(h.provider.calls(), 2);
    let mut remaining = [first.ordered_fields.len(), second.ordered_fields.len()];
    remaining.sort_unstable();
    assert_eq!(remaining, [1, 2]);

    let snapshot = h.state.interviews().session_snapshot(h.agent_id(), &sid).await.unwrap();
    assert_eq!(snapshot.ordered_fields, vec!["subscribe"]);
    assert_eq!(snapshot.answers["name"], "Jane Doe");
    assert_eq!(snapshot.answers["state"], "NY");

    let prompts = h.provider.prompts();
    assert!(prompts[0].contains(r#"Current field (evaluate only this field): {"label":"Name""#));
    assert!(prompts[1].contains(r#"Current field (evaluate only this field): {"label":"State""#));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_oracle_failure_leaves_session_untouched() {
    let h = Harness::new(contact_form());
    let sid = h.start();
    let before = h.state.interviews().session_snapshot(h.agent_id(), &sid).await.unwrap();

    h.provider.fail(LlmError::RateLimited {
        message: "quota exceeded".to_string(),
        retry_after: None,
    });
    let err = h
        .state
        .interviews()
        .submit_turn(h.agent_id(), &sid, "Jane Doe", false)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ORACLE_RATE_LIMIT");
    assert!(err.is_retryable());

    let after = h.state.interviews().session_snapshot(h.agent_id(), &sid).await.unwrap();
    assert_eq!(after.ordered_fields, before.ordered_fields);
    assert_eq!(after.answers, before.answers);

    let reprompt = h.state.interviews().reprompt(&sid).await.unwrap();
    assert!(reprompt.contains("Name"));

    let retried = h.turn(&sid, "Jane Doe", data("Jane Doe")).await.unwrap();
    assert_eq!(retried.answers["name"], "Jane Doe");
}

#[tokio::test]
async fn test_auth_failure_is_not_retryable() {
    let h = Harness::new(contact_form());
    let sid = h.start();

    h.provider.fail(LlmError::AuthenticationFailed {
        message: "API key not valid".to_string(),
    });
    let err = h
        .state
        .interviews()
        .submit_turn(h.agent_id(), &sid, "Jane", false)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ORACLE_AUTH");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_malformed_verdict_rejected() {
    let h = Harness::new(contact_form());
    let sid = h.start();

    let err = h
        .turn(&sid, "Jane", serde_json::json!({ "intent": "data" }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ORACLE_REQUEST");

    let snapshot = h.state.interviews().session_snapshot(h.agent_id(), &sid).await.unwrap();
    assert_eq!(snapshot.current_field.as_deref(), Some("name"));
}

#[tokio::test]
async fn test_turn_validation() {
    let h = Harness::new(contact_form());
    let sid = h.start();
    let interviews = h.state.interviews();

    let err = interviews.submit_turn(h.agent_id(), "", "hi", false).await.unwrap_err();
    assert_eq!(err.to_string(), "Validation error: Missing session_id.");

    let err = interviews.submit_turn(h.agent_id(), "nope", "hi", false).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    let err = interviews.submit_turn(h.agent_id(), &sid, "   ", false).await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION");

    let err = interviews.submit_turn("other-agent", &sid, "hi", false).await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION");
    assert_eq!(h.provider.calls(), 0);
}

// ============================================================================
// Finalization
// ============================================================================

#[tokio::test]
async fn test_fill_failure_still_persists_record() {
    let h = Harness::with_filler(contact_form(), Arc::new(BrokenFiller));
    let sid = h.start();
    h.turn(&sid, "Jane", data("Jane")).await.unwrap();
    h.turn(&sid, "CA", data("CA")).await.unwrap();

    let turn = h.turn(&sid, "no", data("no")).await.unwrap();

    assert!(turn.completed);
    assert!(turn.finalization.is_none());
    assert!(turn.finalization_error.is_some());

    let record = h.state.database().get_completed_session(&sid).unwrap().unwrap();
    assert_eq!(record.filled_pdf_path, None);
    assert_eq!(record.answers["subscribe"], "No");

    let err = h
        .state
        .interviews()
        .retry_finalization(h.agent_id(), &sid)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "FINALIZATION");
}

#[tokio::test]
async fn test_retry_finalization_before_completion() {
    let h = Harness::new(contact_form());
    let sid = h.start();

    let err = h
        .state
        .interviews()
        .retry_finalization(h.agent_id(), &sid)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION");
}

#[tokio::test]
async fn test_retry_finalization_after_eviction_uses_record() {
    let h = Harness::new(contact_form());
    let sid = h.start();
    h.turn(&sid, "Jane", data("Jane")).await.unwrap();
    h.turn(&sid, "CA", data("CA")).await.unwrap();
    let done = h.turn(&sid, "yes", data("yes")).await.unwrap();
    let produced = done.finalization.unwrap();

    let live = h.state.interviews().retry_finalization(h.agent_id(), &sid).await.unwrap();
    assert_eq!(live.filled_pdf_path, produced.filled_pdf_path);

    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(h.state.interviews().evict_expired(Duration::ZERO), 1);
    assert!(h.state.interviews().store().is_empty());

    let stored = h.state.interviews().retry_finalization(h.agent_id(), &sid).await.unwrap();
    assert_eq!(stored.filled_pdf_path, produced.filled_pdf_path);
    assert_eq!(stored.download_url, produced.download_url);
}

#[tokio::test]
async fn test_eviction_keeps_recent_sessions() {
    let h = Harness::new(contact_form());
    let sid = h.start();

    assert_eq!(h.state.interviews().evict_expired(Duration::from_secs(3600)), 0);
    assert!(h.state.interviews().session_snapshot(h.agent_id(), &sid).await.is_ok());
}

// ============================================================================
// Direct submission
// ============================================================================

fn submission(pairs: &[(&str, &str)]) -> SubmissionRequest {
    SubmissionRequest {
        answers: pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
        language_code: Some("fr-FR".to_string()),
    }
}

#[tokio::test]
async fn test_submission_coerces_fills_and_persists() {
    let h = Harness::new(contact_form());
    let submitted = h
        .state
        .interviews()
        .complete_submission(
            h.agent_id(),
            &submission(&[("name", " Jane Doe "), ("state", "texas tx"), ("subscribe", "oui")]),
        )
        .unwrap();

    assert_eq!(submitted.answers["name"], "Jane Doe");
    assert_eq!(submitted.answers["state"], "TX");
    assert_eq!(submitted.answers["subscribe"], "Yes");
    assert_eq!(submitted.questions["state"], "State");
    assert!(submitted.finalization_error.is_none());
    assert_eq!(h.provider.calls(), 0);

    let artifacts = submitted.finalization.unwrap();
    assert!(std::path::Path::new(&artifacts.filled_pdf_path).is_file());

    let record = h
        .state
        .database()
        .get_completed_session(&submitted.submission_id)
        .unwrap()
        .unwrap();
    assert_eq!(record.answers, submitted.answers);
    assert_eq!(record.language_code, "fr-FR");

    let again = h
        .state
        .interviews()
        .retry_finalization(h.agent_id(), &submitted.submission_id)
        .await
        .unwrap();
    assert_eq!(again.filled_pdf_path, artifacts.filled_pdf_path);
}

#[tokio::test]
async fn test_submission_rejects_out_of_domain_value() {
    let h = Harness::new(contact_form());
    let err = h
        .state
        .interviews()
        .complete_submission(h.agent_id(), &submission(&[("name", "Jane"), ("state", "Oregon")]))
        .unwrap_err();

    assert_eq!(err.code(), "VALIDATION");
    assert!(h.state.database().list_completed_sessions(10).unwrap().is_empty());

    let err = h
        .state
        .interviews()
        .complete_submission("missing-agent", &submission(&[("name", "Jane")]))
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_submission_with_fill_failure_still_persists() {
    let h = Harness::with_filler(ethnicity_form(), Arc::new(BrokenFiller));
    let submitted = h
        .state
        .interviews()
        .complete_submission(h.agent_id(), &submission(&[("ethnicity[2]", "Yes"), ("zip", "94110")]))
        .unwrap();

    assert!(submitted.finalization.is_none());
    assert!(submitted.finalization_error.is_some());
    assert_eq!(submitted.answers["ethnicity[2]"], "Other");
    assert_eq!(submitted.answers["ethnicity[0]"], "");
    assert!(h
        .state
        .database()
        .get_completed_session(&submitted.submission_id)
        .unwrap()
        .is_some());
}

// ============================================================================
// Question generation
// ============================================================================

#[tokio::test]
async fn test_questions_written_by_oracle() {
    let h = Harness::new(ethnicity_form());
    h.provider.reply(questions(&["Which of these describe you?", "What is your ZIP code?"]));

    let written = h
        .state
        .interviews()
        .generate_questions(h.agent_id(), Some("en-GB"))
        .await
        .unwrap();

    assert!(written.generated);
    assert_eq!(written.language_code, "en-GB");
    assert_eq!(written.questions.len(), 2);
    assert_eq!(
        written.questions[0].fields,
        vec!["ethnicity[0]", "ethnicity[1]", "ethnicity[2]"]
    );
    assert_eq!(written.questions[1].question, "What is your ZIP code?");
    assert_eq!(written.form_fields.len(), 4);
    assert!(!h.provider.last_prompt().unwrap().contains("ethnicity[0]"));
}

#[tokio::test]
async fn test_questions_fall_back_to_local_templates() {
    let h = Harness::new(contact_form());
    h.provider.reply(questions(&["Only one question"]));

    let written = h
        .state
        .interviews()
        .generate_questions(h.agent_id(), Some("es-ES"))
        .await
        .unwrap();

    assert!(!written.generated);
    assert_eq!(written.questions.len(), 3);
    assert_eq!(written.questions[0].question, "¿Qué debo poner en Name?");
    assert!(written.questions[1].question.contains("CA, NY, TX"));
}

#[tokio::test]
async fn test_questions_surface_auth_failure() {
    let h = Harness::new(vec![field("name", "", "Text", &[])]);
    h.provider.fail(LlmError::AuthenticationFailed {
        message: "API key not valid".to_string(),
    });

    let err = h
        .state
        .interviews()
        .generate_questions(h.agent_id(), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ORACLE_AUTH");
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_reports_oracle_reachability() {
    let h = Harness::new(contact_form());

    let (_, Json(envelope)) = get_health(State(h.state.clone())).await;
    let health = envelope.data.unwrap();
    assert!(health.database);
    assert!(health.oracle_configured);
    assert!(health.oracle_reachable);

    h.provider.set_reachable(false);
    let (_, Json(envelope)) = get_health(State(h.state.clone())).await;
    let health = envelope.data.unwrap();
    assert!(health.oracle_configured);
    assert!(!health.oracle_reachable);
    assert_eq!(health.status, "degraded");
}
