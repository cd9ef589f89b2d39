//! Settings Models
//!
//! Application configuration stored in `<data_dir>/config.json`, plus the
//! secrets that only ever come from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use auraforming_core::language::{normalize_language_code, Language};
use auraforming_core::proxy::ProxyConfig;
use auraforming_llm::{ProviderConfig, ProviderType, DEFAULT_GEMINI_MODEL};

use crate::utils::paths::default_data_dir;

/// Oracle (LLM) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSettings {
    #[serde(default = "default_provider")]
    pub provider: ProviderType,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,
}

fn default_provider() -> ProviderType {
    ProviderType::Gemini
}

fn default_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_oracle_timeout() -> u64 {
    30
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            temperature: default_temperature(),
            timeout_secs: default_oracle_timeout(),
        }
    }
}

/// Speech synthesis / transcription settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechSettings {
    #[serde(default = "default_speech_base_url")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(default = "default_tts_model")]
    pub tts_model: String,
    #[serde(default = "default_stt_model")]
    pub stt_model: String,
    /// Fixed transcription language; session language is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stt_language: Option<String>,
    #[serde(default = "default_tts_timeout")]
    pub tts_timeout_secs: u64,
    #[serde(default = "default_stt_timeout")]
    pub stt_timeout_secs: u64,
}

fn default_speech_base_url() -> String {
    "https://api.elevenlabs.io/v1".to_string()
}

fn default_tts_model() -> String {
    "eleven_flash_v2_5".to_string()
}

fn default_stt_model() -> String {
    "scribe_v1".to_string()
}

fn default_tts_timeout() -> u64 {
    25
}

fn default_stt_timeout() -> u64 {
    40
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            base_url: default_speech_base_url(),
            voice_id: None,
            tts_model: default_tts_model(),
            stt_model: default_stt_model(),
            stt_language: None,
            tts_timeout_secs: default_tts_timeout(),
            stt_timeout_secs: default_stt_timeout(),
        }
    }
}

/// Application configuration stored in config.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server listens on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Root of the database, uploads and filled documents
    #[serde(default = "default_data_dir_path")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub oracle: OracleSettings,
    #[serde(default)]
    pub speech: SpeechSettings,
    /// Idle time after which a live session is evicted
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    /// How often the eviction sweep runs
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Language used when a start request names none
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}

fn default_bind_address() -> String {
    "127.0.0.1:5050".to_string()
}

fn default_data_dir_path() -> PathBuf {
    default_data_dir().unwrap_or_else(|_| PathBuf::from(".auraforming"))
}

fn default_session_ttl() -> u64 {
    3600
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_language() -> String {
    auraforming_core::DEFAULT_LANGUAGE.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            data_dir: default_data_dir_path(),
            oracle: OracleSettings::default(),
            speech: SpeechSettings::default(),
            session_ttl_secs: default_session_ttl(),
            sweep_interval_secs: default_sweep_interval(),
            default_language: default_language(),
            proxy: None,
        }
    }
}

impl AppConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.bind_address.parse::<SocketAddr>().is_err() {
            return Err(format!("Invalid bind_address: {}", self.bind_address));
        }

        if self.oracle.model.trim().is_empty() {
            return Err("oracle.model must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.oracle.temperature) {
            return Err(format!(
                "oracle.temperature must be between 0.0 and 2.0, got {}",
                self.oracle.temperature
            ));
        }
        if self.oracle.timeout_secs == 0 {
            return Err("oracle.timeout_secs must be at least 1".to_string());
        }

        if self.speech.tts_timeout_secs == 0 || self.speech.stt_timeout_secs == 0 {
            return Err("speech timeouts must be at least 1 second".to_string());
        }

        if self.session_ttl_secs == 0 {
            return Err("session_ttl_secs must be at least 1".to_string());
        }
        if self.sweep_interval_secs == 0 {
            return Err("sweep_interval_secs must be at least 1".to_string());
        }

        let supported = Language::supported()
            .iter()
            .any(|l| l.code == self.default_language);
        if !supported {
            return Err(format!(
                "Unsupported default_language: {}",
                self.default_language
            ));
        }

        if let Some(proxy) = &self.proxy {
            proxy.validate().map_err(|e| e.to_string())?;
        }

        Ok(())
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(bind) = get("AURAFORMING_BIND") {
            self.bind_address = bind;
        }
        if let Some(model) = get("GEMINI_MODEL") {
            if self.oracle.provider == ProviderType::Gemini {
                self.oracle.model = model;
            }
        }
        if let Some(voice) = get("ELEVENLABS_VOICE_ID") {
            self.speech.voice_id = Some(voice);
        }
        if let Some(model) = get("ELEVENLABS_TTS_MODEL") {
            self.speech.tts_model = model;
        }
        if let Some(model) = get("ELEVENLABS_STT_MODEL") {
            self.speech.stt_model = model;
        }
        if let Some(language) = get("ELEVENLABS_STT_LANGUAGE") {
            self.speech.stt_language = Some(language);
        }
        if let Some(proxy) = self.proxy.as_mut() {
            if let Some(password) = get("AURAFORMING_PROXY_PASSWORD") {
                proxy.password = Some(password);
            }
        }
        self.default_language = normalize_language_code(Some(&self.default_language)).to_string();
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Provider configuration for the oracle
    pub fn provider_config(&self, secrets: &Secrets) -> ProviderConfig {
        let api_key = match self.oracle.provider {
            ProviderType::Gemini => secrets.gemini_api_key.clone(),
            ProviderType::OpenAI => secrets.openai_api_key.clone(),
        };
        ProviderConfig {
            provider: self.oracle.provider,
            api_key,
            base_url: self.oracle.base_url.clone(),
            model: self.oracle.model.clone(),
            temperature: self.oracle.temperature,
            timeout_secs: self.oracle.timeout_secs,
            proxy: self.proxy.clone(),
            ..Default::default()
        }
    }
}

/// API keys read from the environment; never serialized
#[derive(Clone, Default)]
pub struct Secrets {
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
}

impl Secrets {
    /// Read secrets using the given lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            gemini_api_key: get("GEMINI_API_KEY"),
            openai_api_key: get("OPENAI_API_KEY"),
            elevenlabs_api_key: get("ELEVENLABS_API_KEY"),
        }
    }

    /// Read secrets from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("gemini_api_key", &self.gemini_api_key.is_some())
            .field("openai_api_key", &self.openai_api_key.is_some())
            .field("elevenlabs_api_key", &self.elevenlabs_api_key.is_some())
            .finish()
    }
}
