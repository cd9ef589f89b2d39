//! Health Check Commands
//!
//! Reports the status of backend services.

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::warn;

use super::{ApiResponse, SharedState};
use crate::models::response::{CommandResponse, HealthResponse};
use crate::state::AppState;

/// Upper bound on the oracle reachability check
const ORACLE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Get the health status of all backend services
pub async fn get_health(State(state): State<SharedState>) -> ApiResponse<HealthResponse> {
    (StatusCode::OK, Json(CommandResponse::ok(health_report(&state).await)))
}

async fn health_report(state: &AppState) -> HealthResponse {
    let mut health = HealthResponse::default();

    health.database = state.is_database_healthy();
    health.oracle_configured = state.is_oracle_configured();
    health.oracle_reachable = health.oracle_configured && oracle_reachable(state).await;
    health.speech_configured = state.stt().is_configured() && state.tts().is_configured();
    health.active_sessions = state.interviews().store().len();

    // Speech is optional; text interviews only need the database and oracle
    health.status = if health.database && health.oracle_reachable && state.is_config_healthy() {
        "healthy".to_string()
    } else {
        "degraded".to_string()
    };

    health
}

async fn oracle_reachable(state: &AppState) -> bool {
    let oracle = state.oracle();
    match tokio::time::timeout(ORACLE_CHECK_TIMEOUT, oracle.health_check()).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(provider = oracle.name(), error = %e, "Oracle health check failed");
            false
        }
        Err(_) => {
            warn!(provider = oracle.name(), "Oracle health check timed out");
            false
        }
    }
}
