//! Component wiring for Uzhavan.
//!
//! Builds the corpus, embedder and generator from settings once, and hands out
//! the engines the commands run on. Speech components are built on demand so
//! text-only use never needs the speech API key or a microphone.

use crate::audio::{MicrophoneCapture, SystemPlayer};
use crate::config::{Prompts, Settings};
use crate::corpus::CorpusStore;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::generation::{AnswerGenerator, ChatGenerator};
use crate::rag::RagEngine;
use crate::retry::RetryPolicy;
use crate::speech::{OpenAISpeechSynthesizer, Speaker};
use crate::transcription::WhisperRecognizer;
use crate::voice::{VoiceEvent, VoiceSession};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

/// Holds the long-lived components shared by every question.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    corpus: Arc<CorpusStore>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn AnswerGenerator>,
}

impl Orchestrator {
    /// Load the corpus and create the hosted-model clients.
    ///
    /// Fails when the corpus is missing, an API key is unset, or the corpus
    /// was embedded at a different dimensionality than configured.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let corpus = CorpusStore::load(&settings.corpus_path())?;
        corpus.ensure_dimensions(settings.embedding.dimensions as usize)?;

        let embedder: Arc<dyn Embedder> =
            Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?);
        let generator: Arc<dyn AnswerGenerator> =
            Arc::new(ChatGenerator::from_settings(&settings.generation)?);

        info!(
            "Using {} for embeddings and {} for answers",
            settings.embedding.model, settings.generation.model
        );

        Self::with_components(settings, prompts, Arc::new(corpus), embedder, generator)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        corpus: Arc<CorpusStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Result<Self> {
        std::fs::create_dir_all(settings.temp_dir())?;

        Ok(Self {
            settings,
            prompts,
            corpus,
            embedder,
            generator,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Retrieval plus generation, configured from settings.
    pub fn rag_engine(&self) -> RagEngine {
        let generation = &self.settings.generation;
        RagEngine::new(
            self.corpus.clone(),
            self.embedder.clone(),
            self.generator.clone(),
        )
        .with_top_k(self.settings.corpus.top_k)
        .with_prompts(self.prompts.clone())
        .with_timeout(Duration::from_secs(generation.timeout_secs))
        .with_retry(RetryPolicy::new(
            generation.max_retries,
            Duration::from_millis(generation.retry_backoff_ms),
        ))
    }

    /// Text-to-speech plus playback. Needs the speech API key.
    pub fn speaker(&self) -> Result<Speaker> {
        let synthesizer = OpenAISpeechSynthesizer::from_settings(
            &self.settings.speech,
            &self.settings.temp_dir(),
        )?;
        let player = SystemPlayer::new(self.settings.voice.player.as_deref());
        Ok(Speaker::new(
            Arc::new(synthesizer),
            Arc::new(player),
            &self.settings.speech.language,
        ))
    }

    /// Push-to-talk session reporting progress on `events`.
    pub fn voice_session(&self, events: UnboundedSender<VoiceEvent>) -> Result<VoiceSession> {
        let capture = MicrophoneCapture::from_settings(&self.settings.voice);
        let recognizer = WhisperRecognizer::from_settings(&self.settings.speech)?;
        let retry = RetryPolicy::new(
            self.settings.speech.max_retries,
            Duration::from_millis(self.settings.generation.retry_backoff_ms),
        );

        Ok(VoiceSession::new(
            Arc::new(capture),
            Arc::new(recognizer),
            Arc::new(self.rag_engine()),
            self.speaker()?,
            retry,
            events,
        ))
    }
}
