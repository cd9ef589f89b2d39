//! OpenAI Provider
//!
//! Implementation of the LlmProvider trait for OpenAI's chat completions API,
//! using `response_format: json_schema` for structured output.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::provider::{
    extract_json_from_response, missing_api_key_error, parse_http_error, transport_error,
    LlmProvider,
};
use super::types::{LlmError, LlmRequestOptions, LlmResult, ProviderConfig};
use crate::http_client::build_http_client;

/// Default OpenAI API root
const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// OpenAI provider
pub struct OpenAIProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with the given configuration
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
            .unwrap_or(OPENAI_API_URL)
            .trim_end_matches('/')
    }

    /// Check if model supports reasoning (o1/o3 models)
    fn model_supports_reasoning(&self) -> bool {
        let model = self.config.model.to_lowercase();
        model.starts_with("o1") || model.starts_with("o3") || model.starts_with("o4")
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        request_options: &LlmRequestOptions,
    ) -> serde_json::Value {
        let schema_name = request_options
            .schema_name
            .clone()
            .unwrap_or_else(|| "response".to_string());

        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_completion_tokens": request_options
                .max_tokens_override
                .unwrap_or(self.config.max_tokens),
            "messages": [
                { "role": "user", "content": prompt }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema_name,
                    "schema": schema,
                }
            }
        });

        // Add temperature (not for o1/o3 models)
        if !self.model_supports_reasoning() {
            body["temperature"] = serde_json::json!(request_options
                .temperature_override
                .unwrap_or(self.config.temperature));
        }

        body
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
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
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("openai"))?;

        let body = self.build_request_body(prompt, schema, &request_options);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url()))
            .header("Authorization", format!("Bearer {}", api_key))
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
            tracing::warn!(status, "OpenAI request failed");
            return Err(parse_http_error(status, &body_text, "openai"));
        }

        let openai_response: OpenAIResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        let message = openai_response
            .choices
            .first()
            .and_then(|c| c.message.as_ref());

        if let Some(refusal) = message.and_then(|m| m.refusal.as_deref()) {
            return Err(LlmError::InvalidRequest {
                message: format!("Model refused: {}", refusal),
            });
        }

        let content = message
            .and_then(|m| m.content.as_deref())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LlmError::ParseError {
                message: "OpenAI returned an empty response".to_string(),
            })?;

        extract_json_from_response(content)
    }

    async fn health_check(&self) -> LlmResult<()> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("openai"))?;

        // List models to verify API key
        let response = self
            .client
            .get(format!("{}/models", self.base_url()))
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout_secs))?;

        let status = response.status().as_u16();
        if status == 200 {
            Ok(())
        } else if status == 401 {
            Err(LlmError::AuthenticationFailed {
                message: "Invalid API key".to_string(),
            })
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(parse_http_error(status, &body, "openai"))
        }
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

/// OpenAI API response format
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    refusal: Option<String>,
}
