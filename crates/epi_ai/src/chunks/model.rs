use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Closed set of section types the chunker produces.
///
/// `Laboratorios` is the canonical labs label; the query-filter parser uses
/// the same label, so type restriction and chunking can never disagree.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Resumen,
    EvolucionDia,
    Laboratorios,
    Alta,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Resumen => "resumen",
            ChunkType::EvolucionDia => "evolucion_dia",
            ChunkType::Laboratorios => "laboratorios",
            ChunkType::Alta => "alta",
        }
    }
}

/// A named unit of extracted text.
///
/// `chunk_key` (`{doc_id}::{sub_key}`) joins the chunk store and the vector
/// store; `source_hint` is the stable human-readable citation. `day` is
/// present only for daily-progress chunks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub chunk_key: String,
    pub text: String,
    pub source_hint: String,
    pub chunk_type: ChunkType,
    #[serde(default)]
    pub day: Option<u32>,
}

/// Stored embedding for one chunk. `vec` is L2-normalized at creation time
/// so retrieval can use a plain dot product as cosine similarity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRecord {
    pub chunk_key: String,
    pub dim: u32,
    pub vec: Vec<f32>,
    pub text_sha256: String,
}

impl EmbeddingRecord {
    /// Build a record for `vec`, hashing the source text it was embedded
    /// from. Retrieval uses the hash to ignore embeddings that no longer
    /// match their stored chunk.
    pub fn new(chunk_key: impl Into<String>, vec: Vec<f32>, source_text: &str) -> Self {
        Self {
            chunk_key: chunk_key.into(),
            dim: vec.len() as u32,
            text_sha256: sha256_hex(source_text.as_bytes()),
            vec,
        }
    }

    pub fn matches_text(&self, text: &str) -> bool {
        self.text_sha256 == sha256_hex(text.as_bytes())
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)
}
