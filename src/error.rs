//! Error types for Uzhavan.

use thiserror::Error;

/// Library-level error type for Uzhavan operations.
#[derive(Error, Debug)]
pub enum UzhavanError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailure(String),

    #[error("Degenerate vector: {0}")]
    DegenerateVector(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Answer generation failed: {0}")]
    GenerationFailure(String),

    #[error("Answer generation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Could not understand the audio")]
    RecognitionUnintelligible,

    #[error("Speech recognition service error: {0}")]
    RecognitionServiceError(String),

    #[error("Audio capture failed: {0}")]
    CaptureFailure(String),

    #[error("Playback failed: {0}")]
    PlaybackFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl UzhavanError {
    /// Whether a bounded retry may succeed where the first attempt failed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UzhavanError::GenerationFailure(_) | UzhavanError::RecognitionServiceError(_)
        )
    }

    /// Short message suitable for showing to the person using the assistant.
    pub fn user_message(&self) -> String {
        match self {
            UzhavanError::EmbeddingFailure(_) => {
                "Could not prepare your question for search. Please try again.".to_string()
            }
            UzhavanError::DegenerateVector(_) => {
                "Your question could not be matched against the knowledge base.".to_string()
            }
            UzhavanError::GenerationFailure(e) => {
                format!("The answer service failed: {}", e)
            }
            UzhavanError::Timeout(secs) => {
                format!("The answer service did not respond within {} seconds.", secs)
            }
            UzhavanError::RecognitionUnintelligible => {
                "Could not understand the audio. Please speak clearly and try again.".to_string()
            }
            UzhavanError::RecognitionServiceError(e) => {
                format!("Speech recognition service error: {}", e)
            }
            UzhavanError::CaptureFailure(e) => format!("Could not record from the microphone: {}", e),
            UzhavanError::PlaybackFailure(e) => format!("Could not play the spoken answer: {}", e),
            other => other.to_string(),
        }
    }
}

/// Result type alias for Uzhavan operations.
pub type Result<T> = std::result::Result<T, UzhavanError>;
