//! RAG (Retrieval-Augmented Generation) for question answering.
//!
//! Embeds a question, retrieves the closest corpus chunks, and asks the answer
//! generator to reply in simple Tamil using those chunks as context.

pub mod context;
mod response;

pub use context::{ContextBuilder, RetrievedContext};
pub use response::{RagEngine, RagResponse};

use crate::retrieval::RankedResult;

/// A retrieved chunk, detached from the corpus for display and reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextChunk {
    /// Chunk identifier.
    pub id: String,
    /// Text content.
    pub content: String,
    /// Similarity score.
    pub score: f32,
}

impl From<RankedResult<'_>> for ContextChunk {
    fn from(result: RankedResult<'_>) -> Self {
        Self {
            id: result.chunk.id().to_string(),
            content: result.chunk.text().to_string(),
            score: result.score,
        }
    }
}
