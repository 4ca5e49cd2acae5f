//! Microphone capture and audio playback.
//!
//! Recording goes through cpal and hound. Playback shells out to the platform
//! opener or a configured player.

mod capture;
mod playback;

pub use capture::{encode_wav, input_device_name, MicrophoneCapture, SilenceDetector};
pub use playback::SystemPlayer;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Size of a canonical PCM WAV header. A file this short holds no samples.
const WAV_HEADER_LEN: usize = 44;

/// One recording, owned by whoever processes it next.
#[derive(Debug, Clone)]
pub struct CapturedAudio {
    /// Encoded audio file contents.
    pub bytes: Vec<u8>,
    /// File name hint for upload (the extension tells the service the format).
    pub file_name: String,
}

impl CapturedAudio {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
        }
    }

    /// True when the recording contains no audio samples.
    pub fn is_empty(&self) -> bool {
        self.bytes.len() <= WAV_HEADER_LEN
    }
}

/// Records one utterance. Returns when the speaker falls silent.
#[async_trait]
pub trait AudioCapture: Send + Sync {
    async fn capture(&self) -> Result<CapturedAudio>;
}

/// Plays an audio file.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, path: &Path) -> Result<()>;
}
