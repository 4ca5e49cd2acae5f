//! Answer generation through a hosted language model.

mod openai;

pub use openai::ChatGenerator;

use crate::error::Result;
use async_trait::async_trait;

/// Turns a fully rendered prompt into an answer.
///
/// Implementations report network, quota and malformed-response problems as
/// `GenerationFailure`.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}
