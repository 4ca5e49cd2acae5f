//! Configuration settings for Uzhavan.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Gemini's OpenAI-compatible endpoint.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// OpenAI's API endpoint.
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub corpus: CorpusSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub speech: SpeechSettings,
    pub voice: VoiceSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary audio files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.uzhavan".to_string(),
            temp_dir: std::env::temp_dir()
                .join("uzhavan")
                .to_string_lossy()
                .into_owned(),
            log_level: "warn".to_string(),
        }
    }
}

/// Knowledge corpus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// Path to the corpus file built by `uzhavan index`.
    pub path: String,
    /// Number of chunks retrieved as context for each question.
    pub top_k: usize,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            path: "~/.uzhavan/corpus.json".to_string(),
            top_k: 2,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Base URL of the OpenAI-compatible embeddings endpoint.
    pub api_base: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions. Must match the corpus.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            api_base: GEMINI_API_BASE.to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            model: "gemini-embedding-001".to_string(),
            dimensions: 768,
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Base URL of the OpenAI-compatible chat completions endpoint.
    pub api_base: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// LLM model for answer generation.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on a single generation call, in seconds.
    pub timeout_secs: u64,
    /// Retries after a failed generation call (0 disables retrying).
    pub max_retries: usize,
    /// Base delay for exponential backoff between retries, in milliseconds.
    pub retry_backoff_ms: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            api_base: GEMINI_API_BASE.to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.7,
            timeout_secs: 60,
            max_retries: 2,
            retry_backoff_ms: 250,
        }
    }
}

/// Speech recognition and synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Base URL of the OpenAI-compatible audio endpoint.
    pub api_base: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Spoken language (ISO-639-1).
    pub language: String,
    /// Speech-to-text model.
    pub recognition_model: String,
    /// Text-to-speech model.
    pub tts_model: String,
    /// Text-to-speech voice.
    pub tts_voice: String,
    /// Retries after a recognition service error.
    pub max_retries: usize,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            api_base: OPENAI_API_BASE.to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            language: "ta".to_string(),
            recognition_model: "whisper-1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            max_retries: 2,
        }
    }
}

/// Microphone capture and playback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// Input device name. Empty selects the system default microphone.
    pub input_device: Option<String>,
    /// Seconds of trailing silence that end a recording.
    pub silence_seconds: f32,
    /// RMS level (0.0 to 1.0) below which audio counts as silence.
    pub silence_threshold: f32,
    /// Hard upper bound on a single recording, in seconds.
    pub max_record_seconds: u32,
    /// Audio player command. Empty selects the platform default.
    pub player: Option<String>,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            input_device: None,
            silence_seconds: 2.0,
            silence_threshold: 0.02,
            max_record_seconds: 60,
            player: None,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings that can never work.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::UzhavanError;

        if self.corpus.top_k == 0 {
            return Err(UzhavanError::Config("corpus.top_k must be at least 1".to_string()));
        }
        if self.embedding.dimensions == 0 {
            return Err(UzhavanError::Config(
                "embedding.dimensions must be at least 1".to_string(),
            ));
        }
        if self.generation.timeout_secs == 0 {
            return Err(UzhavanError::Config(
                "generation.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::UzhavanError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("uzhavan")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded corpus file path.
    pub fn corpus_path(&self) -> PathBuf {
        Self::expand_path(&self.corpus.path)
    }
}
