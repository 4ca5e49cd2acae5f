//! Audio playback through an external player.

use super::AudioPlayer;
use crate::error::{Result, UzhavanError};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Plays files with a configured command, or the platform default opener.
#[derive(Debug, Clone)]
pub struct SystemPlayer {
    program: String,
    args: Vec<String>,
}

impl SystemPlayer {
    /// Use `command` (program plus leading arguments) if given, otherwise the
    /// platform default.
    pub fn new(command: Option<&str>) -> Self {
        match command.map(str::trim).filter(|c| !c.is_empty()) {
            Some(command) => {
                let mut parts = command.split_whitespace().map(str::to_string);
                let program = parts.next().unwrap_or_default();
                Self {
                    program,
                    args: parts.collect(),
                }
            }
            None => Self::platform_default(),
        }
    }

    fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self {
                program: "afplay".to_string(),
                args: Vec::new(),
            }
        } else if cfg!(target_os = "windows") {
            Self {
                program: "cmd".to_string(),
                args: vec!["/C".to_string(), "start".to_string(), String::new()],
            }
        } else {
            Self {
                program: "xdg-open".to_string(),
                args: Vec::new(),
            }
        }
    }

    /// The executable this player runs.
    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl AudioPlayer for SystemPlayer {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn play(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(UzhavanError::PlaybackFailure(format!(
                "audio file not found: {}",
                path.display()
            )));
        }

        debug!("Playing with {}", self.program);

        let result = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UzhavanError::PlaybackFailure(format!(
                    "player '{}' not found",
                    self.program
                )));
            }
            Err(e) => {
                return Err(UzhavanError::PlaybackFailure(format!(
                    "{} execution failed: {}",
                    self.program, e
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(UzhavanError::PlaybackFailure(format!(
                "{} failed: {}",
                self.program,
                stderr.trim()
            )));
        }

        Ok(())
    }
}
