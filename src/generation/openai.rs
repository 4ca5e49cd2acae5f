//! Chat-completions answer generator (Gemini's OpenAI-compatible API by default).

use super::AnswerGenerator;
use crate::config::GenerationSettings;
use crate::error::{Result, UzhavanError};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Answer generator backed by a chat-completions endpoint.
pub struct ChatGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl ChatGenerator {
    /// Create a generator from settings. Fails if the API key is missing.
    pub fn from_settings(settings: &GenerationSettings) -> Result<Self> {
        let client = create_client(&settings.api_base, &settings.api_key_env)?;
        Ok(Self::with_client(client, &settings.model, settings.temperature))
    }

    pub fn with_client(client: Client<OpenAIConfig>, model: &str, temperature: f32) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl AnswerGenerator for ChatGenerator {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| UzhavanError::GenerationFailure(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .temperature(self.temperature)
            .build()
            .map_err(|e| UzhavanError::GenerationFailure(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            UzhavanError::GenerationFailure(format!("Failed to generate response: {}", e))
        })?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| UzhavanError::GenerationFailure("Empty response from model".to_string()))?;

        debug!("Generated answer of {} characters", answer.chars().count());
        Ok(answer)
    }
}
