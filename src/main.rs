//! Auraforming HTTP server entry point

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use auraforming::storage::ConfigService;
use auraforming::{router, AppState, Secrets};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("auraforming=info,auraforming_server=info")),
        )
        .init();

    let config = ConfigService::new().context("failed to load configuration")?;
    let state = Arc::new(
        AppState::initialize(config, &Secrets::from_env())
            .context("failed to initialize application state")?,
    );
    let settings = state.get_config().await;

    spawn_session_sweeper(
        state.clone(),
        Duration::from_secs(settings.sweep_interval_secs),
        Duration::from_secs(settings.session_ttl_secs),
    );

    let listener = TcpListener::bind(&settings.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_address))?;
    info!(
        addr = %settings.bind_address,
        data_dir = %settings.data_dir.display(),
        oracle_configured = state.is_oracle_configured(),
        "Auraforming listening"
    );

    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Periodically drop interview sessions idle longer than `ttl`
fn spawn_session_sweeper(state: Arc<AppState>, every: Duration, ttl: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            state.interviews().evict_expired(ttl);
        }
    });
}
