//! Auraforming LLM
//!
//! Provides a unified structured-output interface over LLM providers:
//! - Google Gemini (default)
//! - OpenAI
//!
//! Also includes the HTTP client factory shared with the speech client.

pub mod gemini;
pub mod http_client;
pub mod openai;
pub mod provider;
pub mod types;

use std::sync::Arc;

// Re-export main types
pub use gemini::GeminiProvider;
pub use http_client::build_http_client;
pub use openai::OpenAIProvider;
pub use provider::{extract_json_from_response, parse_http_error, LlmProvider};
pub use types::*;

/// Construct the provider named by `config.provider`.
pub fn create_provider(config: ProviderConfig) -> LlmResult<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config.provider {
        ProviderType::Gemini => Arc::new(GeminiProvider::new(config)?),
        ProviderType::OpenAI => Arc::new(OpenAIProvider::new(config)?),
    };
    Ok(provider)
}
