//! Context building for RAG responses.

use super::ContextChunk;
use crate::corpus::CorpusStore;
use crate::embedding::Embedder;
use crate::error::{Result, UzhavanError};
use crate::retrieval::rank;
use std::sync::Arc;
use tracing::debug;

/// Separator between chunk texts in the prompt context.
const CONTEXT_SEPARATOR: &str = "\n\n";

/// Chunks retrieved for one question, with the joined context text.
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    pub chunks: Vec<ContextChunk>,
    pub text: String,
}

/// Embeds questions and retrieves their context from the corpus.
pub struct ContextBuilder {
    corpus: Arc<CorpusStore>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl ContextBuilder {
    /// Create a new context builder retrieving two chunks per question.
    pub fn new(corpus: Arc<CorpusStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            corpus,
            embedder,
            top_k: 2,
        }
    }

    /// Set the number of chunks to retrieve.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Retrieve the most similar chunks for a question.
    pub async fn build(&self, question: &str) -> Result<RetrievedContext> {
        let query_embedding = self.embedder.embed(question).await.map_err(|e| match e {
            UzhavanError::EmbeddingFailure(_) | UzhavanError::DimensionMismatch { .. } => e,
            other => UzhavanError::EmbeddingFailure(other.to_string()),
        })?;

        let chunks: Vec<ContextChunk> = rank(&query_embedding, &self.corpus, self.top_k)?
            .into_iter()
            .map(ContextChunk::from)
            .collect();

        debug!(
            "Retrieved {} chunks (best score {:.3})",
            chunks.len(),
            chunks.first().map(|c| c.score).unwrap_or(0.0)
        );

        let text = format_context_for_prompt(&chunks);
        Ok(RetrievedContext { chunks, text })
    }
}

/// Join chunk texts in ranked order, separated by a blank line.
pub fn format_context_for_prompt(chunks: &[ContextChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Format context chunks for display to the user.
pub fn format_context_for_display(chunks: &[ContextChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("{} (score: {:.2})", chunk.id, chunk.score))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, content: &str, score: f32) -> ContextChunk {
        ContextChunk {
            id: id.to_string(),
            content: content.to_string(),
            score,
        }
    }

    #[test]
    fn test_context_joined_with_blank_line() {
        let chunks = vec![chunk("c1", "first", 0.9), chunk("c2", "second", 0.5)];
        assert_eq!(format_context_for_prompt(&chunks), "first\n\nsecond");
    }

    #[test]
    fn test_empty_context() {
        assert_eq!(format_context_for_prompt(&[]), "");
    }

    #[test]
    fn test_display_lists_ids_and_scores() {
        let chunks = vec![chunk("c1", "first", 0.91)];
        assert_eq!(format_context_for_display(&chunks), "c1 (score: 0.91)");
    }
}
