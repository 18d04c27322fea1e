//! Record ingestion.
//!
//! One record owns the whole corpus: ingesting wipes everything the
//! previous record left in both collections before the first write, so
//! retrieval can never mix documents. Embedding runs one chunk at a time —
//! a simple linear progress trail and bounded peak memory.

use epi_core::error::AppError;
use epi_core::record::parse_record;
use serde::{Deserialize, Serialize};

use crate::chunks::{build_chunks, ChunkStore, EmbeddingRecord, VectorStore};
use crate::embeddings::Embedder;
use crate::retrieve::similarity::l2_normalize;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestReport {
    pub doc_id: String,
    pub chunk_count: u32,
}

/// Ingest one raw record JSON: parse, chunk, clear prior state, then embed
/// and store each chunk sequentially.
///
/// Input errors abort before anything is mutated. A collaborator failure
/// aborts mid-way and leaves the partial state as-is (no rollback); the
/// caller clears and retries. Not re-entrant — callers must serialize
/// ingestions against one store pair.
pub fn ingest_record(
    chunks: &ChunkStore,
    vectors: &VectorStore,
    embedder: &dyn Embedder,
    embed_model: &str,
    raw_json: &str,
) -> Result<IngestReport, AppError> {
    let record = parse_record(raw_json)?;
    let built = build_chunks(&record);
    let doc_id = record.doc_id();

    chunks.clear()?;
    vectors.clear()?;

    let total = built.len();
    for (i, chunk) in built.iter().enumerate() {
        tracing::debug!(chunk_key = %chunk.chunk_key, step = i + 1, total, "embedding chunk");

        let raw_vec = embedder
            .embed(embed_model, &format!("passage: {}", chunk.text))
            .map_err(|e| {
                let retryable = e.retryable;
                AppError::new("AI_EMBEDDINGS_FAILED", "Failed to embed chunk")
                    .with_details(format!("chunk_key={}; err={}", chunk.chunk_key, e))
                    .with_retryable(retryable)
            })?;
        let vec = l2_normalize(&raw_vec);

        chunks.put_chunk(chunk)?;
        vectors.put_vector(&EmbeddingRecord::new(&chunk.chunk_key, vec, &chunk.text))?;
    }

    tracing::info!(doc_id = %doc_id, chunk_count = total, "record ingested");
    Ok(IngestReport {
        doc_id,
        chunk_count: total as u32,
    })
}
