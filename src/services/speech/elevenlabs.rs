//! ElevenLabs Speech Client
//!
//! Text-to-speech over `POST /text-to-speech/{voice_id}` and speech-to-text
//! over multipart `POST /speech-to-text`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error};

use auraforming_core::proxy::ProxyConfig;
use auraforming_llm::build_http_client;

use super::{AudioClip, SpeechToText, SynthesizedAudio, TextToSpeech};
use crate::models::settings::SpeechSettings;
use crate::utils::error::{AppError, AppResult};
use crate::utils::truncate_for_log;

const AUDIO_MPEG: &str = "audio/mpeg";
/// Error bodies are logged up to this many characters
const MAX_LOGGED_BODY: usize = 400;

/// ElevenLabs client implementing both speech directions
pub struct ElevenLabsClient {
    api_key: Option<String>,
    settings: SpeechSettings,
    tts_client: reqwest::Client,
    stt_client: reqwest::Client,
}

impl ElevenLabsClient {
    /// Create a client; a missing key is reported per call, not here.
    pub fn new(
        api_key: Option<String>,
        settings: SpeechSettings,
        proxy: Option<&ProxyConfig>,
    ) -> AppResult<Self> {
        let build = |secs: u64| {
            build_http_client(proxy, Duration::from_secs(secs))
                .map_err(|e| AppError::speech(format!("Failed to build speech client: {}", e)))
        };
        Ok(Self {
            tts_client: build(settings.tts_timeout_secs)?,
            stt_client: build(settings.stt_timeout_secs)?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            settings,
        })
    }

    fn base_url(&self) -> &str {
        self.settings.base_url.trim_end_matches('/')
    }

    fn api_key(&self) -> AppResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::speech("Missing ELEVENLABS_API_KEY."))
    }

    fn voice_id(&self) -> AppResult<&str> {
        self.settings
            .voice_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::speech("Missing ELEVENLABS_VOICE_ID."))
    }

    async fn failure(direction: &str, response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!(
            status = status.as_u16(),
            body = %truncate_for_log(&body, MAX_LOGGED_BODY),
            "ElevenLabs {} failed",
            direction
        );
        AppError::speech(format!("ElevenLabs {} request failed.", direction))
    }
}

#[async_trait]
impl TextToSpeech for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> AppResult<SynthesizedAudio> {
        let api_key = self.api_key()?;
        let voice_id = self.voice_id()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::validation("Missing text."));
        }

        let url = format!("{}/text-to-speech/{}", self.base_url(), voice_id);
        let response = self
            .tts_client
            .post(&url)
            .header("xi-api-key", api_key)
            .header("Content-Type", "application/json")
            .header("Accept", AUDIO_MPEG)
            .json(&json!({
                "text": text,
                "model_id": self.settings.tts_model,
            }))
            .send()
            .await
            .map_err(|e| AppError::speech(format!("ElevenLabs TTS request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::failure("TTS", response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::speech(format!("ElevenLabs TTS body unreadable: {}", e)))?;
        debug!(bytes = bytes.len(), "Synthesized speech");
        Ok(SynthesizedAudio {
            bytes: bytes.to_vec(),
            mime_type: AUDIO_MPEG.to_string(),
        })
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.voice_id().is_ok()
    }
}

#[async_trait]
impl SpeechToText for ElevenLabsClient {
    async fn transcribe(&self, clip: AudioClip, language_code: Option<&str>) -> AppResult<String> {
        let api_key = self.api_key()?;

        let file = reqwest::multipart::Part::bytes(clip.bytes)
            .file_name(clip.filename)
            .mime_str(&clip.content_type)
            .map_err(|e| AppError::validation(format!("Invalid audio content type: {}", e)))?;
        let mut form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("model_id", self.settings.stt_model.clone());

        let language = self
            .settings
            .stt_language
            .as_deref()
            .or(language_code)
            .map(str::trim)
            .filter(|l| !l.is_empty());
        if let Some(language) = language {
            form = form.text("language_code", language.to_string());
        }

        let url = format!("{}/speech-to-text", self.base_url());
        let response = self
            .stt_client
            .post(&url)
            .header("xi-api-key", api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::speech(format!("ElevenLabs STT request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::failure("STT", response).await);
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::speech(format!("ElevenLabs STT returned invalid JSON: {}", e)))?;
        Ok(transcript_from_payload(&payload))
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Transcript text from an STT payload (`text`, else `transcript`)
fn transcript_from_payload(payload: &serde_json::Value) -> String {
    ["text", "transcript"]
        .iter()
        .filter_map(|key| payload.get(*key).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|t| !t.is_empty())
        .unwrap_or_default()
        .to_string()
}
