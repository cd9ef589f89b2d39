//! Data Models
//!
//! Contains all data structures used throughout the application.

pub mod agent;
pub mod interview;
pub mod response;
pub mod settings;

pub use agent::*;
pub use interview::*;
pub use response::*;
pub use settings::*;
