//! Gemini Provider
//!
//! Implementation of the LlmProvider trait for Google's Generative Language
//! API, using `generateContent` with a JSON response schema.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::provider::{
    extract_json_from_response, missing_api_key_error, parse_http_error, transport_error,
    LlmProvider,
};
use super::types::{LlmError, LlmRequestOptions, LlmResult, ProviderConfig};
use crate::http_client::build_http_client;

/// Default Generative Language API root
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider
pub struct GeminiProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider with the given configuration
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let client = build_http_client(
            config.proxy.as_ref(),
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self { config, client })
    }

    /// Get the API base URL
    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(GEMINI_API_URL)
            .trim_end_matches('/')
    }

    fn api_key(&self) -> LlmResult<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| missing_api_key_error("gemini"))
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        request_options: &LlmRequestOptions,
    ) -> serde_json::Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": to_gemini_schema(schema),
                "temperature": request_options
                    .temperature_override
                    .unwrap_or(self.config.temperature),
                "maxOutputTokens": request_options
                    .max_tokens_override
                    .unwrap_or(self.config.max_tokens),
            }
        })
    }

    /// Concatenate the text parts of the first candidate
    fn response_text(response: &GeminiResponse) -> LlmResult<String> {
        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_ref())
        {
            return Err(LlmError::InvalidRequest {
                message: format!("Prompt blocked: {}", reason),
            });
        }

        let text: String = response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::ParseError {
                message: "Gemini returned an empty response".to_string(),
            });
        }
        Ok(text)
    }
}

/// Convert a JSON-schema object into Gemini's OpenAPI subset.
///
/// Type names are upper-cased and keywords Gemini rejects are dropped.
pub fn to_gemini_schema(schema: &serde_json::Value) -> serde_json::Value {
    match schema {
        serde_json::Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (key, value) in map {
                match key.as_str() {
                    "additionalProperties" | "$schema" | "title" => continue,
                    "type" => {
                        let upper = value
                            .as_str()
                            .map(|t| serde_json::Value::String(t.to_uppercase()))
                            .unwrap_or_else(|| value.clone());
                        out.insert(key.clone(), upper);
                    }
                    "properties" => {
                        let props = value
                            .as_object()
                            .map(|p| {
                                p.iter()
                                    .map(|(name, s)| (name.clone(), to_gemini_schema(s)))
                                    .collect::<serde_json::Map<_, _>>()
                            })
                            .unwrap_or_default();
                        out.insert(key.clone(), serde_json::Value::Object(props));
                    }
                    _ => {
                        out.insert(key.clone(), to_gemini_schema(value));
                    }
                }
            }
            serde_json::Value::Object(out)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(to_gemini_schema).collect())
        }
        other => other.clone(),
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate_json(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        request_options: LlmRequestOptions,
    ) -> LlmResult<serde_json::Value> {
        let api_key = self.api_key()?;
        let body = self.build_request_body(prompt, schema, &request_options);
        let url = format!("{}/models/{}:generateContent", self.base_url(), self.config.model);

        tracing::debug!(
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "Gemini generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout_secs))?;

        let status = response.status().as_u16();
        let body_text = response
            .text()
            .await
            .map_err(|e| transport_error(e, self.config.timeout_secs))?;

        if status != 200 {
            tracing::warn!(status, "Gemini request failed");
            return Err(parse_http_error(status, &body_text, "gemini"));
        }

        let gemini_response: GeminiResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        let text = Self::response_text(&gemini_response)?;
        tracing::debug!(response_chars = text.len(), "Gemini response received");
        extract_json_from_response(&text)
    }

    async fn health_check(&self) -> LlmResult<()> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(format!("{}/models", self.base_url()))
            .header("x-goog-api-key", api_key)
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout_secs))?;

        let status = response.status().as_u16();
        if status == 200 {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(parse_http_error(status, &body, "gemini"))
        }
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

/// Gemini API response format
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderType;

    fn test_config() -> ProviderConfig {
        ProviderConfig {
            provider: ProviderType::Gemini,
            api_key: Some("test-key".to_string()),
            model: "gemini-2.0-flash".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_provider_creation() {
        let provider = GeminiProvider::new(test_config()).unwrap();
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.model(), "gemini-2.0-flash");
        assert_eq!(provider.base_url(), GEMINI_API_URL);
    }

    #[test]
    fn test_schema_conversion() {
        let schema = serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "intent": { "type": "string", "enum": ["data", "clarification"] },
                "collected_values": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["intent"]
        });
        let converted = to_gemini_schema(&schema);
        assert_eq!(converted["type"], "OBJECT");
        assert!(converted.get("additionalProperties").is_none());
        assert_eq!(converted["properties"]["intent"]["type"], "STRING");
        assert_eq!(converted["properties"]["collected_values"]["items"]["type"], "STRING");
        assert_eq!(converted["required"][0], "intent");
    }

    #[test]
    fn test_request_body_uses_overrides() {
        let provider = GeminiProvider::new(test_config()).unwrap();
        let options = LlmRequestOptions {
            temperature_override: Some(0.0),
            ..Default::default()
        };
        let body = provider.build_request_body("hi", &serde_json::json!({"type": "object"}), &options);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["temperature"], 0.0);
    }

    #[test]
    fn test_response_text_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]}}]}"#;
        let parsed: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(GeminiProvider::response_text(&parsed).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_blocked_prompt_is_request_error() {
        let raw = r#"{"candidates":[],"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let parsed: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            GeminiProvider::response_text(&parsed),
            Err(LlmError::InvalidRequest { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_key_is_auth_error() {
        let provider = GeminiProvider::new(ProviderConfig {
            api_key: None,
            ..test_config()
        })
        .unwrap();
        let err = provider
            .generate_json("hi", &serde_json::json!({}), LlmRequestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::AuthenticationFailed { .. }));
    }
}
