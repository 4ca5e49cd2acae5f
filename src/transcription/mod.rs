//! Speech-to-text for spoken questions.

mod whisper;

pub use whisper::WhisperRecognizer;

use crate::audio::CapturedAudio;
use crate::error::Result;
use async_trait::async_trait;

/// Turns a recording into text.
///
/// Unintelligible audio is `RecognitionUnintelligible`; service problems are
/// `RecognitionServiceError`.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self, audio: &CapturedAudio, language: &str) -> Result<String>;
}
