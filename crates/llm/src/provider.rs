//! LLM Provider Trait
//!
//! Defines the common interface for structured-output providers.

use async_trait::async_trait;

use super::types::{LlmError, LlmRequestOptions, LlmResult, ProviderConfig};

/// Trait that all LLM providers must implement.
///
/// A provider takes a natural-language prompt plus a JSON schema describing
/// the required output object and returns that object, or a named failure.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Generate a JSON object conforming to `schema`.
    ///
    /// The returned value is always a JSON object; anything else is a
    /// `ParseError`.
    async fn generate_json(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        request_options: LlmRequestOptions,
    ) -> LlmResult<serde_json::Value>;

    /// Check if the provider is healthy and reachable.
    ///
    /// Validates the API key against a cheap listing endpoint.
    async fn health_check(&self) -> LlmResult<()>;

    /// Get the configuration for this provider.
    fn config(&self) -> &ProviderConfig;
}

const AUTH_MARKERS: &[&str] = &[
    "api_key_invalid",
    "api key expired",
    "api key not valid",
    "invalid api key",
    "incorrect api key",
    "permission_denied",
];

const RATE_LIMIT_MARKERS: &[&str] = &[
    "resource exhausted",
    "resource_exhausted",
    "resourceexhausted",
    "quota",
    "rate limit",
    "rate_limit",
];

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
///
/// Body markers win over the status code: Gemini reports a bad key as a 400
/// with `API_KEY_INVALID`, and quota exhaustion sometimes arrives as a 400 too.
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    let lowered = body.to_lowercase();
    if AUTH_MARKERS.iter().any(|m| lowered.contains(m)) {
        return LlmError::AuthenticationFailed {
            message: format!("{}: API key is invalid or expired", provider),
        };
    }
    if status != 429 && RATE_LIMIT_MARKERS.iter().any(|m| lowered.contains(m)) {
        return LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        };
    }

    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

/// Map a transport error onto an `LlmError`.
pub fn transport_error(err: reqwest::Error, timeout_secs: u64) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout {
            seconds: timeout_secs,
        }
    } else {
        LlmError::NetworkError {
            message: err.to_string(),
        }
    }
}

/// Pull a JSON object out of model text.
///
/// Handles markdown code fences and leading/trailing prose around a single
/// object. Returns `ParseError` when no object can be recovered.
pub fn extract_json_from_response(text: &str) -> LlmResult<serde_json::Value> {
    let trimmed = text.trim();

    let candidate = if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let content_start = after_fence.find('\n').map(|nl| nl + 1).unwrap_or(0);
        let content = &after_fence[content_start..];
        match content.find("```") {
            Some(end) => content[..end].trim(),
            None => trimmed,
        }
    } else {
        trimmed
    };

    let candidate = match (candidate.find('{'), candidate.rfind('}')) {
        (Some(start), Some(end)) if start <= end => &candidate[start..=end],
        _ => candidate,
    };

    let value: serde_json::Value =
        serde_json::from_str(candidate).map_err(|e| LlmError::ParseError {
            message: format!("Invalid JSON response: {}", e),
        })?;

    if value.is_object() {
        Ok(value)
    } else {
        Err(LlmError::ParseError {
            message: "Response JSON is not an object".to_string(),
        })
    }
}
