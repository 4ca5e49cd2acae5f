//! Index command: chunk text documents, embed them, and write the corpus file.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::corpus::{Chunk, ChunkRecord, CorpusStore, TextChunker};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result as UzhavanResult, UzhavanError};
use anyhow::Result;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::Path;
use tracing::info;

/// Texts per embedding request.
const EMBED_BATCH: usize = 100;

/// Embedding requests in flight at once.
const MAX_CONCURRENT_BATCHES: usize = 4;

/// Run the index command.
pub async fn run_index(
    files: &[String],
    output: Option<String>,
    max_chars: usize,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, &settings) {
        Output::error(&e.user_message());
        return Err(e.into());
    }

    let output = output
        .map(|p| Settings::expand_path(&p))
        .unwrap_or_else(|| settings.corpus_path());

    let chunker = TextChunker::new(max_chars);
    let mut records = Vec::new();
    for file in files {
        let path = Settings::expand_path(file);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let file_records = chunker.chunk(&source_name(&path), &text);
        info!("{}: {} chunks", path.display(), file_records.len());
        records.extend(file_records);
    }

    if records.is_empty() {
        let e = UzhavanError::InvalidInput("No text found in the given files".to_string());
        Output::error(&e.user_message());
        return Err(e.into());
    }

    Output::info(&format!(
        "Embedding {} chunks from {} file(s) with {}",
        records.len(),
        files.len(),
        settings.embedding.model
    ));

    let embedder = OpenAIEmbedder::from_settings(&settings.embedding)?;
    let pb = Output::progress_bar(records.len() as u64, "Embedding");
    let store = build_corpus(&embedder, records, |done| pb.inc(done as u64)).await;
    pb.finish_and_clear();

    let store = store?.with_model(embedder.model());
    store.save(&output)?;

    Output::success(&format!(
        "Wrote {} chunks ({} dimensions) to {}",
        store.len(),
        store.dimensions().unwrap_or(0),
        output.display()
    ));
    Ok(())
}

/// Embed every record and assemble a corpus in input order.
///
/// `progress` receives the number of records finished by each batch.
pub async fn build_corpus<F>(
    embedder: &dyn Embedder,
    records: Vec<ChunkRecord>,
    mut progress: F,
) -> UzhavanResult<CorpusStore>
where
    F: FnMut(usize),
{
    let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();

    let embeddings: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(EMBED_BATCH))
        .map(|batch| async move {
            let vectors = embedder.embed_batch(batch).await?;
            if vectors.len() != batch.len() {
                return Err(UzhavanError::EmbeddingFailure(format!(
                    "Requested {} embeddings, received {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            Ok(vectors)
        })
        .buffered(MAX_CONCURRENT_BATCHES)
        .inspect_ok(|vectors| progress(vectors.len()))
        .try_collect()
        .await?;

    let chunks = records
        .into_iter()
        .zip(embeddings.into_iter().flatten())
        .map(|(record, embedding)| Chunk::new(record.id, record.text, embedding))
        .collect::<UzhavanResult<Vec<_>>>()?;

    CorpusStore::new(chunks)
}

/// Chunk id prefix for a file: its stem, or the whole name if it has none.
fn source_name(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct LengthEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, text: &str) -> UzhavanResult<Vec<f32>> {
            Ok(vec![text.chars().count() as f32, 1.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> UzhavanResult<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn record(i: usize) -> ChunkRecord {
        ChunkRecord {
            id: format!("doc-{}", i),
            text: "x".repeat(i + 1),
        }
    }

    #[tokio::test]
    async fn test_build_corpus_keeps_order_across_batches() {
        let embedder = LengthEmbedder {
            calls: AtomicUsize::new(0),
        };
        let records: Vec<_> = (0..250).map(record).collect();
        let mut reported = 0;

        let store = build_corpus(&embedder, records, |n| reported += n)
            .await
            .unwrap();

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
        assert_eq!(reported, 250);
        assert_eq!(store.len(), 250);
        assert_eq!(store.dimensions(), Some(2));
        for (i, chunk) in store.chunks().iter().enumerate() {
            assert_eq!(chunk.id(), format!("doc-{}", i));
            assert_eq!(chunk.embedding()[0], (i + 1) as f32);
        }
    }

    #[tokio::test]
    async fn test_zero_vector_from_embedder_is_rejected() {
        struct ZeroEmbedder;

        #[async_trait]
        impl Embedder for ZeroEmbedder {
            async fn embed(&self, _text: &str) -> UzhavanResult<Vec<f32>> {
                Ok(vec![0.0, 0.0])
            }

            async fn embed_batch(&self, texts: &[String]) -> UzhavanResult<Vec<Vec<f32>>> {
                Ok(texts.iter().map(|_| vec![0.0, 0.0]).collect())
            }

            fn dimensions(&self) -> usize {
                2
            }
        }

        let result = build_corpus(&ZeroEmbedder, vec![record(0)], |_| {}).await;
        assert!(matches!(result, Err(UzhavanError::Corpus(_))));
    }

    #[test]
    fn test_source_name_uses_stem() {
        assert_eq!(source_name(Path::new("/data/paddy guide.txt")), "paddy guide");
        assert_eq!(source_name(Path::new("notes")), "notes");
    }
}
