//! Auraforming - Conversational PDF Form Intake
//!
//! This library turns a fillable PDF into an interview agent.
//! It includes:
//! - axum handlers for the public interview API and the admin API
//! - Interview services (field catalog, turn evaluation, finalization)
//! - Document and speech collaborators
//! - Storage layer (SQLite, config)
//! - Data models and utilities

pub mod commands;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use commands::router;
pub use models::response::*;
pub use models::settings::{AppConfig, Secrets};
pub use state::{AppServices, AppState};
pub use utils::error::{AppError, AppResult};
