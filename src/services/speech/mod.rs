//! Speech Collaborators
//!
//! Transcription of audio turns and synthesis of assistant replies.

pub mod elevenlabs;

use async_trait::async_trait;

use crate::utils::error::AppResult;

pub use elevenlabs::ElevenLabsClient;

/// Uploaded audio for one turn
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

impl AudioClip {
    pub const DEFAULT_FILENAME: &'static str = "turn_audio.webm";
    pub const DEFAULT_CONTENT_TYPE: &'static str = "audio/webm";

    /// Build a clip, falling back to webm defaults for blank metadata
    pub fn new(bytes: Vec<u8>, filename: Option<&str>, content_type: Option<&str>) -> Self {
        let filename = filename
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(Self::DEFAULT_FILENAME)
            .to_string();
        let content_type = content_type
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(Self::DEFAULT_CONTENT_TYPE)
            .to_string();
        Self {
            bytes,
            filename,
            content_type,
        }
    }
}

/// Synthesized audio
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Speech-to-text collaborator
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe a clip; `language_code` is a hint and may be ignored.
    async fn transcribe(&self, clip: AudioClip, language_code: Option<&str>) -> AppResult<String>;

    /// Whether credentials are present
    fn is_configured(&self) -> bool;
}

/// Text-to-speech collaborator
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(&self, text: &str) -> AppResult<SynthesizedAudio>;

    /// Whether credentials and a voice are present
    fn is_configured(&self) -> bool;
}
