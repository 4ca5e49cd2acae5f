//! Text-to-speech over an OpenAI-compatible audio endpoint.

use super::SpeechSynthesizer;
use crate::config::SpeechSettings;
use crate::error::{Result, UzhavanError};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateSpeechRequestArgs, SpeechModel, SpeechResponseFormat, Voice};
use async_openai::Client;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// File the latest spoken answer is written to, overwritten on each answer.
const RESPONSE_FILE: &str = "response.mp3";

/// Synthesizes MP3 speech with the OpenAI speech API.
pub struct OpenAISpeechSynthesizer {
    client: Client<OpenAIConfig>,
    model: SpeechModel,
    voice: Voice,
    output_dir: PathBuf,
}

impl OpenAISpeechSynthesizer {
    /// Create a synthesizer from settings. Fails if the API key is missing or
    /// the voice is unknown.
    pub fn from_settings(settings: &SpeechSettings, output_dir: &Path) -> Result<Self> {
        let client = create_client(&settings.api_base, &settings.api_key_env)?;
        Ok(Self {
            client,
            model: parse_model(&settings.tts_model),
            voice: parse_voice(&settings.tts_voice)?,
            output_dir: output_dir.to_path_buf(),
        })
    }
}

fn parse_model(name: &str) -> SpeechModel {
    match name {
        "tts-1" => SpeechModel::Tts1,
        "tts-1-hd" => SpeechModel::Tts1Hd,
        other => SpeechModel::Other(other.to_string()),
    }
}

fn parse_voice(name: &str) -> Result<Voice> {
    match name.to_lowercase().as_str() {
        "alloy" => Ok(Voice::Alloy),
        "echo" => Ok(Voice::Echo),
        "fable" => Ok(Voice::Fable),
        "onyx" => Ok(Voice::Onyx),
        "nova" => Ok(Voice::Nova),
        "shimmer" => Ok(Voice::Shimmer),
        other => Err(UzhavanError::Config(format!("Unknown TTS voice: {}", other))),
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAISpeechSynthesizer {
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    async fn synthesize(&self, text: &str, language: &str) -> Result<PathBuf> {
        if text.trim().is_empty() {
            return Err(UzhavanError::PlaybackFailure("nothing to speak".to_string()));
        }

        // The speech API infers the language from the text itself.
        debug!("Synthesizing speech (language hint {})", language);

        let request = CreateSpeechRequestArgs::default()
            .input(text)
            .model(self.model.clone())
            .voice(self.voice.clone())
            .response_format(SpeechResponseFormat::Mp3)
            .build()
            .map_err(|e| UzhavanError::PlaybackFailure(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .speech(request)
            .await
            .map_err(|e| UzhavanError::PlaybackFailure(format!("Speech API error: {}", e)))?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(RESPONSE_FILE);
        response
            .save(&path)
            .await
            .map_err(|e| UzhavanError::PlaybackFailure(format!("Failed to save audio: {}", e)))?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_voice() {
        assert!(matches!(parse_voice("Nova"), Ok(Voice::Nova)));
        assert!(parse_voice("robot").is_err());
    }

    #[test]
    fn test_parse_model() {
        assert!(matches!(parse_model("tts-1-hd"), SpeechModel::Tts1Hd));
        assert!(matches!(parse_model("gpt-4o-mini-tts"), SpeechModel::Other(_)));
    }
}
