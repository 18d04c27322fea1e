use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use epi_core::error::AppError;

use super::model::EmbeddingRecord;

/// File-backed vector collection keyed by `chunk_key`.
///
/// The store does not validate dimensions; the embedding step guarantees a
/// single model (and therefore a single `dim`) per corpus. `read_all`
/// returns key order, which is the candidate-scoring order the retriever
/// relies on for stable tie-breaks.
#[derive(Debug, Clone)]
pub struct VectorStore {
    root: PathBuf,
}

impl VectorStore {
    pub fn open(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn vectors_path(&self) -> PathBuf {
        self.root.join("vectors.json")
    }

    fn ensure_dirs(&self) -> Result<(), AppError> {
        fs::create_dir_all(self.root.as_path()).map_err(|e| {
            AppError::new("AI_VECTOR_STORE_FAILED", "Failed to create vector store directory")
                .with_details(format!("path={}; err={}", self.root.display(), e))
        })
    }

    fn read_map(&self) -> Result<BTreeMap<String, EmbeddingRecord>, AppError> {
        self.ensure_dirs()?;
        let path = self.vectors_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let bytes = fs::read(&path).map_err(|e| {
            AppError::new("AI_VECTOR_STORE_FAILED", "Failed to read vector collection")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            AppError::new("AI_VECTOR_STORE_FAILED", "Failed to decode vector collection")
                .with_details(format!("path={}; err={}", path.display(), e))
        })
    }

    fn write_map(&self, map: &BTreeMap<String, EmbeddingRecord>) -> Result<(), AppError> {
        self.ensure_dirs()?;
        let path = self.vectors_path();
        let tmp = path.with_extension("tmp");
        let json = serde_json::to_string_pretty(map).map_err(|e| {
            AppError::new("AI_VECTOR_STORE_FAILED", "Failed to encode vector collection")
                .with_details(e.to_string())
        })?;
        fs::write(&tmp, json.as_bytes()).map_err(|e| {
            AppError::new("AI_VECTOR_STORE_FAILED", "Failed to write vector collection")
                .with_details(format!("path={}; err={}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            AppError::new("AI_VECTOR_STORE_FAILED", "Failed to finalize vector collection write")
                .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
        })?;
        Ok(())
    }

    /// Idempotent upsert: a repeated `chunk_key` overwrites the prior vector.
    pub fn put_vector(&self, record: &EmbeddingRecord) -> Result<(), AppError> {
        let mut map = self.read_map()?;
        map.insert(record.chunk_key.clone(), record.clone());
        self.write_map(&map)
    }

    /// Every stored embedding, in `chunk_key` order.
    pub fn read_all(&self) -> Result<Vec<EmbeddingRecord>, AppError> {
        Ok(self.read_map()?.into_values().collect())
    }

    pub fn get_by_keys(&self, keys: &[String]) -> Result<Vec<EmbeddingRecord>, AppError> {
        let map = self.read_map()?;
        Ok(keys.iter().filter_map(|k| map.get(k).cloned()).collect())
    }

    pub fn clear(&self) -> Result<(), AppError> {
        self.write_map(&BTreeMap::new())
    }
}
