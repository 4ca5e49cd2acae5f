//! Configuration module for Uzhavan.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    CorpusSettings, EmbeddingSettings, GeneralSettings, GenerationSettings, PromptSettings,
    Settings, SpeechSettings, VoiceSettings,
};
