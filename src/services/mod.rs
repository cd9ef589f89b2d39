//! Services
//!
//! Business logic services for the application.
//! Services handle the core functionality and are called by commands.

pub mod document;
pub mod interview;
pub mod speech;

pub use document::{AcroFormDocument, DocumentFiller, DocumentInspector};
pub use interview::{InMemorySessionStore, InterviewManager, SessionFinalizer, TurnEvaluator};
pub use speech::{ElevenLabsClient, SpeechToText, TextToSpeech};
