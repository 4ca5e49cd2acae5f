//! RAG response generation.

use super::{ContextBuilder, ContextChunk};
use crate::config::Prompts;
use crate::corpus::CorpusStore;
use crate::embedding::Embedder;
use crate::error::{Result, UzhavanError};
use crate::generation::AnswerGenerator;
use crate::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Default upper bound on one generation call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// RAG engine for question answering.
///
/// Holds only read-only state, so one engine can serve every interaction.
pub struct RagEngine {
    context_builder: ContextBuilder,
    generator: Arc<dyn AnswerGenerator>,
    prompts: Prompts,
    timeout: Duration,
    retry: RetryPolicy,
}

impl RagEngine {
    /// Create a new RAG engine.
    pub fn new(
        corpus: Arc<CorpusStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            context_builder: ContextBuilder::new(corpus, embedder),
            generator,
            prompts: Prompts::default(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Set the number of chunks retrieved per question.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.context_builder = self.context_builder.with_top_k(top_k);
        self
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Bound each generation attempt.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retry policy for generation failures.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Retrieve context for a question without generating an answer.
    pub async fn search(&self, question: &str) -> Result<Vec<ContextChunk>> {
        let question = validate_question(question)?;
        Ok(self.context_builder.build(question).await?.chunks)
    }

    /// Answer a question from the corpus.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn answer(&self, question: &str) -> Result<RagResponse> {
        let question = validate_question(question)?;
        info!("Processing question");

        let context = self.context_builder.build(question).await?;
        let prompt = self.prompts.answer_prompt(&context.text, question);

        let answer = self.generate(&prompt).await?;

        debug!("Generated response with {} sources", context.chunks.len());

        Ok(RagResponse {
            answer,
            sources: context.chunks,
        })
    }

    /// One generation call per attempt, each bounded by the timeout.
    async fn generate(&self, prompt: &str) -> Result<String> {
        let timeout = self.timeout;
        let generator = &self.generator;

        self.retry
            .run("Answer generation", || async move {
                match tokio::time::timeout(timeout, generator.generate(prompt)).await {
                    Ok(result) => result.map_err(|e| match e {
                        UzhavanError::GenerationFailure(_) => e,
                        other => UzhavanError::GenerationFailure(other.to_string()),
                    }),
                    Err(_) => Err(UzhavanError::Timeout(timeout.as_secs())),
                }
            })
            .await
    }
}

fn validate_question(question: &str) -> Result<&str> {
    let question = question.trim();
    if question.is_empty() {
        return Err(UzhavanError::InvalidInput("The question is empty".to_string()));
    }
    Ok(question)
}

/// A RAG response with answer and sources.
#[derive(Debug, Clone)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// Source chunks used for the answer, most similar first.
    pub sources: Vec<ContextChunk>,
}

impl RagResponse {
    /// Format the response for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            output.push_str(&super::context::format_context_for_display(&self.sources));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Chunk;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Embedder returning fixed vectors per text.
    struct FixedEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        fail: bool,
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if self.fail {
                return Err(UzhavanError::EmbeddingFailure("model offline".to_string()));
            }
            Ok(self.vectors.get(text).cloned().unwrap_or_else(|| vec![0.0, 0.0]))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    /// Generator recording every prompt it is given.
    #[derive(Default)]
    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
        reply: Option<String>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl AnswerGenerator for RecordingGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.reply
                .clone()
                .ok_or_else(|| UzhavanError::GenerationFailure("quota exceeded".to_string()))
        }
    }

    fn farm_corpus() -> Arc<CorpusStore> {
        let chunks = vec![
            Chunk::new("c1", "Use compost for natural fertilization", vec![1.0, 0.1]).unwrap(),
            Chunk::new("c2", "Water tomatoes daily", vec![0.1, 1.0]).unwrap(),
        ];
        Arc::new(CorpusStore::new(chunks).unwrap())
    }

    fn embedder() -> Arc<FixedEmbedder> {
        let mut vectors = HashMap::new();
        vectors.insert("fertilization methods?".to_string(), vec![0.9, 0.05]);
        Arc::new(FixedEmbedder {
            vectors,
            fail: false,
        })
    }

    #[tokio::test]
    async fn test_answer_builds_context_and_calls_generator_once() {
        let generator = Arc::new(RecordingGenerator {
            reply: Some("இயற்கை உரம் பயன்படுத்துங்கள்".to_string()),
            ..Default::default()
        });
        let engine = RagEngine::new(farm_corpus(), embedder(), generator.clone());

        let response = engine.answer("fertilization methods?").await.unwrap();

        assert_eq!(response.answer, "இயற்கை உரம் பயன்படுத்துங்கள்");
        assert_eq!(response.sources.len(), 2);
        assert_eq!(response.sources[0].id, "c1");

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(
            "Use compost for natural fertilization\n\nWater tomatoes daily"
        ));
        assert!(prompts[0].contains("fertilization methods?"));
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let generator = Arc::new(RecordingGenerator::default());
        let engine = RagEngine::new(farm_corpus(), embedder(), generator.clone())
            .with_retry(RetryPolicy::none());

        let result = engine.answer("fertilization methods?").await;

        assert!(matches!(result, Err(UzhavanError::GenerationFailure(_))));
        assert_eq!(generator.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generation_failure_retried_within_bound() {
        let generator = Arc::new(RecordingGenerator::default());
        let engine = RagEngine::new(farm_corpus(), embedder(), generator.clone())
            .with_retry(RetryPolicy::new(2, Duration::from_millis(1)));

        let result = engine.answer("fertilization methods?").await;

        assert!(matches!(result, Err(UzhavanError::GenerationFailure(_))));
        assert_eq!(generator.prompts.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_slow_generation_times_out() {
        let generator = Arc::new(RecordingGenerator {
            reply: Some("late".to_string()),
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        let engine = RagEngine::new(farm_corpus(), embedder(), generator.clone())
            .with_timeout(Duration::from_millis(20));

        let result = engine.answer("fertilization methods?").await;

        assert!(matches!(result, Err(UzhavanError::Timeout(_))));
        // Timeouts are not retried.
        assert_eq!(generator.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_generation() {
        let generator = Arc::new(RecordingGenerator::default());
        let failing = Arc::new(FixedEmbedder {
            vectors: HashMap::new(),
            fail: true,
        });
        let engine = RagEngine::new(farm_corpus(), failing, generator.clone());

        let result = engine.answer("anything").await;

        assert!(matches!(result, Err(UzhavanError::EmbeddingFailure(_))));
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_query_embedding_is_degenerate() {
        let generator = Arc::new(RecordingGenerator::default());
        let engine = RagEngine::new(farm_corpus(), embedder(), generator.clone());

        // Unknown text embeds to the zero vector.
        let result = engine.answer("unknown").await;

        assert!(matches!(result, Err(UzhavanError::DegenerateVector(_))));
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let generator = Arc::new(RecordingGenerator::default());
        let engine = RagEngine::new(farm_corpus(), embedder(), generator);
        assert!(matches!(
            engine.answer("   ").await,
            Err(UzhavanError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_search_rejected_before_embedding() {
        let failing = Arc::new(FixedEmbedder {
            vectors: HashMap::new(),
            fail: true,
        });
        let engine = RagEngine::new(farm_corpus(), failing, Arc::new(RecordingGenerator::default()));

        assert!(matches!(
            engine.search("").await,
            Err(UzhavanError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.search(" \t\n").await,
            Err(UzhavanError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_search_respects_top_k() {
        let generator = Arc::new(RecordingGenerator::default());
        let engine =
            RagEngine::new(farm_corpus(), embedder(), generator.clone()).with_top_k(1);

        let chunks = engine.search("fertilization methods?").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "c1");
        assert!(generator.prompts.lock().unwrap().is_empty());
    }
}
