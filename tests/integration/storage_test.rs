//! Storage Integration Tests
//!
//! Tests for what a finished interview leaves behind:
//! - Completed session records and their dashboard views
//! - Per-agent listing counts and analytics
//! - Agent deletion with file cleanup confined to the data directory

use std::path::Path;

use auraforming::models::interview::CompletedSessionView;

use super::common::{contact_form, data, Harness};

/// Run the contact form to completion and return the session id
async fn complete_interview(h: &Harness) -> String {
    let sid = h.start();
    h.turn(&sid, "Jane Doe", data("Jane Doe")).await.unwrap();
    h.turn(&sid, "New York", data("NY")).await.unwrap();
    let done = h.turn(&sid, "sure", data("yes")).await.unwrap();
    assert!(done.completed);
    sid
}

#[tokio::test]
async fn test_completed_sessions_listed_for_dashboard() {
    let h = Harness::new(contact_form());
    let sid = complete_interview(&h).await;

    let records = h.state.database().list_completed_sessions(200).unwrap();
    assert_eq!(records.len(), 1);

    let view = CompletedSessionView::from(records.into_iter().next().unwrap());
    assert_eq!(view.record.session_id, sid);
    assert_eq!(view.field_count, 3);
    assert_eq!(view.pdf_preview_url, format!("/api/admin/dashboard/sessions/{}/pdf", sid));
    assert_eq!(view.download_url, format!("/api/admin/dashboard/sessions/{}/download", sid));
    assert_eq!(view.record.language_code, "en-US");

    let by_agent = h
        .state
        .database()
        .list_completed_sessions_by_agent(&h.agent.agent_id.to_uppercase(), 300)
        .unwrap();
    assert_eq!(by_agent.len(), 1);
}

#[tokio::test]
async fn test_agent_listing_and_analytics() {
    let h = Harness::new(contact_form());
    complete_interview(&h).await;
    complete_interview(&h).await;

    let agents = h.state.database().list_agents(300).unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].intake_count, 2);
    assert_eq!(agents[0].field_count, 3);
    assert_eq!(agents[0].share_url, format!("/agent/{}", h.agent.agent_id));

    let analytics = h
        .state
        .database()
        .agent_analytics(&h.agent.agent_id)
        .unwrap()
        .unwrap();
    assert_eq!(analytics.completed_sessions, 2);
    assert_eq!(analytics.total_fields, 3);
    // Sub-five-second interviews are left out of the average
    assert_eq!(analytics.avg_duration, "N/A");

    assert!(h.state.database().agent_analytics("missing").unwrap().is_none());
}

#[tokio::test]
async fn test_delete_agent_returns_owned_files() {
    let h = Harness::new(contact_form());
    let sid = complete_interview(&h).await;
    let filled = h
        .state
        .database()
        .get_completed_session(&sid)
        .unwrap()
        .unwrap()
        .filled_pdf_path
        .unwrap();

    let (agent_id, deleted_sessions, files) = h
        .state
        .database()
        .delete_agent(&h.agent.agent_id, h.state.data_dir())
        .unwrap()
        .unwrap();

    assert_eq!(agent_id, h.agent.agent_id);
    assert_eq!(deleted_sessions, 1);
    assert_eq!(files.len(), 2);
    let filled = Path::new(&filled).canonicalize().unwrap();
    assert!(files.contains(&filled));

    assert!(h.state.database().get_agent(&agent_id).unwrap().is_none());
    assert!(h.state.database().get_completed_session(&sid).unwrap().is_none());
    assert!(h
        .state
        .database()
        .delete_agent(&agent_id, h.state.data_dir())
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_agent_lookup_is_case_insensitive() {
    let h = Harness::new(contact_form());
    let upper = h.agent.agent_id.to_uppercase();

    let agent = h.state.interviews().load_agent(&upper).unwrap();
    assert_eq!(agent.agent_id, h.agent.agent_id);

    let started = h.state.interviews().start_interview(&upper, None).unwrap();
    assert_eq!(started.agent_id, h.agent.agent_id);
}
