//! Pre-flight checks before expensive operations.
//!
//! Validates that required devices and credentials are available before a
//! session starts, instead of failing halfway through the first question.

use crate::audio::input_device_name;
use crate::config::Settings;
use crate::error::{Result, UzhavanError};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering needs the embedding and generation keys and a corpus.
    Ask,
    /// Spoken answers additionally need the speech key.
    Speak,
    /// Voice mode needs everything above plus a microphone.
    Listen,
    /// Building a corpus needs the embedding key.
    Index,
    /// Searching needs the embedding key and a corpus.
    Search,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ask => {
            check_api_key(&settings.embedding.api_key_env)?;
            check_api_key(&settings.generation.api_key_env)?;
            check_corpus(settings)?;
        }
        Operation::Speak => {
            check(Operation::Ask, settings)?;
            check_api_key(&settings.speech.api_key_env)?;
        }
        Operation::Listen => {
            check(Operation::Speak, settings)?;
            input_device_name(settings.voice.input_device.as_deref())?;
        }
        Operation::Index => {
            check_api_key(&settings.embedding.api_key_env)?;
        }
        Operation::Search => {
            check_api_key(&settings.embedding.api_key_env)?;
            check_corpus(settings)?;
        }
    }
    Ok(())
}

/// Check that an API key environment variable is set and non-empty.
pub fn check_api_key(var: &str) -> Result<()> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(()),
        Ok(_) => Err(UzhavanError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            var, var
        ))),
        Err(_) => Err(UzhavanError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            var, var
        ))),
    }
}

fn check_corpus(settings: &Settings) -> Result<()> {
    let path = settings.corpus_path();
    if path.exists() {
        Ok(())
    } else {
        Err(UzhavanError::Corpus(format!(
            "No corpus at {}. Build one with: uzhavan index <files>",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_config_error() {
        let result = check_api_key("UZHAVAN_TEST_KEY_THAT_IS_NEVER_SET");
        assert!(matches!(result, Err(UzhavanError::Config(msg)) if msg.contains("not set")));
    }

    #[test]
    fn test_listen_with_unknown_device_fails() {
        let mut settings = Settings::default();
        settings.voice.input_device = Some("uzhavan-no-such-microphone".to_string());
        let result = input_device_name(settings.voice.input_device.as_deref());
        assert!(matches!(result, Err(UzhavanError::CaptureFailure(_))));
    }

    #[test]
    fn test_search_needs_corpus() {
        let temp = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.corpus.path = temp.path().join("missing.json").to_string_lossy().to_string();
        let result = check_corpus(&settings);
        assert!(matches!(result, Err(UzhavanError::Corpus(_))));
    }
}
