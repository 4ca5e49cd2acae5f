//! Whisper transcription over an OpenAI-compatible audio endpoint.

use super::SpeechRecognizer;
use crate::audio::CapturedAudio;
use crate::config::SpeechSettings;
use crate::error::{Result, UzhavanError};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{AudioInput, CreateTranscriptionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Whisper-based speech recognizer.
pub struct WhisperRecognizer {
    client: Client<OpenAIConfig>,
    model: String,
}

impl WhisperRecognizer {
    /// Create a recognizer from settings. Fails if the API key is missing.
    pub fn from_settings(settings: &SpeechSettings) -> Result<Self> {
        let client = create_client(&settings.api_base, &settings.api_key_env)?;
        Ok(Self::with_client(client, &settings.recognition_model))
    }

    pub fn with_client(client: Client<OpenAIConfig>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperRecognizer {
    #[instrument(skip(self, audio), fields(bytes = audio.bytes.len()))]
    async fn recognize(&self, audio: &CapturedAudio, language: &str) -> Result<String> {
        if audio.is_empty() {
            return Err(UzhavanError::RecognitionUnintelligible);
        }

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(
                audio.file_name.clone(),
                audio.bytes.clone(),
            ))
            .model(&self.model)
            .language(language)
            .build()
            .map_err(|e| {
                UzhavanError::RecognitionServiceError(format!("Failed to build request: {}", e))
            })?;

        let response = self.client.audio().transcribe(request).await.map_err(|e| {
            UzhavanError::RecognitionServiceError(format!("Transcription API error: {}", e))
        })?;

        let text = response.text.trim().to_string();
        if text.is_empty() {
            return Err(UzhavanError::RecognitionUnintelligible);
        }

        debug!("Recognized {} characters", text.chars().count());
        Ok(text)
    }
}
