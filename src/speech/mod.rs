//! Spoken answers: text-to-speech followed by playback.

mod openai;

pub use openai::OpenAISpeechSynthesizer;

use crate::audio::AudioPlayer;
use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Renders text as an audio file and returns its path.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language: &str) -> Result<PathBuf>;
}

/// Speaks answers aloud in a fixed language.
#[derive(Clone)]
pub struct Speaker {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    player: Arc<dyn AudioPlayer>,
    language: String,
}

impl Speaker {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        player: Arc<dyn AudioPlayer>,
        language: &str,
    ) -> Self {
        Self {
            synthesizer,
            player,
            language: language.to_string(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Synthesize `text` and play it. Returns once the player exits.
    pub async fn speak(&self, text: &str) -> Result<()> {
        let path = self.synthesizer.synthesize(text, &self.language).await?;
        info!("Playing {}", path.display());
        self.player.play(&path).await
    }
}
