//! Interview Service
//!
//! The interview state machine and everything around it.
//!
//! ## Architecture
//! - `catalog` derives the ordered, grouped field list of a form
//! - `evaluator` asks the oracle to judge one utterance
//! - `session` applies judgments to a session's remaining fields and answers
//! - `prompts` holds the locally synthesized spoken lines
//! - `registry` keeps live sessions with TTL eviction
//! - `finalizer` writes the filled document and the completed-session record
//! - `manager` wires these together for the HTTP layer

pub mod catalog;
pub mod evaluator;
pub mod finalizer;
pub mod manager;
pub mod prompts;
pub mod questions;
pub mod registry;
pub mod session;
pub mod submission;

pub use catalog::FieldCatalog;
pub use evaluator::{TurnContext, TurnEvaluator};
pub use finalizer::{FinalizationOutcome, SessionFinalizer};
pub use manager::InterviewManager;
pub use questions::{QuestionSet, QuestionWriter};
pub use registry::{InMemorySessionStore, SessionStore, SharedSession};
pub use session::{InterviewSession, TurnOutcome};
pub use submission::{coerce_submission, CoercedSubmission};
