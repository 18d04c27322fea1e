use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use epi_core::error::AppError;

use super::model::Chunk;

/// File-backed chunk collection: one JSON document keyed by `chunk_key`,
/// written atomically (tmp then rename). Key order doubles as the stable
/// listing order for retrieval.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    root: PathBuf,
}

impl ChunkStore {
    pub fn open(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn chunks_path(&self) -> PathBuf {
        self.root.join("chunks.json")
    }

    fn ensure_dirs(&self) -> Result<(), AppError> {
        fs::create_dir_all(self.root.as_path()).map_err(|e| {
            AppError::new("AI_CHUNK_STORE_FAILED", "Failed to create chunk store directory")
                .with_details(format!("path={}; err={}", self.root.display(), e))
        })
    }

    fn read_map(&self) -> Result<BTreeMap<String, Chunk>, AppError> {
        self.ensure_dirs()?;
        let path = self.chunks_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let bytes = fs::read(&path).map_err(|e| {
            AppError::new("AI_CHUNK_STORE_FAILED", "Failed to read chunk collection")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            AppError::new("AI_CHUNK_STORE_FAILED", "Failed to decode chunk collection")
                .with_details(format!("path={}; err={}", path.display(), e))
        })
    }

    fn write_map(&self, map: &BTreeMap<String, Chunk>) -> Result<(), AppError> {
        self.ensure_dirs()?;
        let path = self.chunks_path();
        let tmp = path.with_extension("tmp");
        let json = serde_json::to_string_pretty(map).map_err(|e| {
            AppError::new("AI_CHUNK_STORE_FAILED", "Failed to encode chunk collection")
                .with_details(e.to_string())
        })?;
        fs::write(&tmp, json.as_bytes()).map_err(|e| {
            AppError::new("AI_CHUNK_STORE_FAILED", "Failed to write chunk collection")
                .with_details(format!("path={}; err={}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            AppError::new("AI_CHUNK_STORE_FAILED", "Failed to finalize chunk collection write")
                .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
        })?;
        Ok(())
    }

    /// Idempotent upsert keyed by `chunk_key`.
    pub fn put_chunk(&self, chunk: &Chunk) -> Result<(), AppError> {
        let mut map = self.read_map()?;
        map.insert(chunk.chunk_key.clone(), chunk.clone());
        self.write_map(&map)
    }

    pub fn get_chunk(&self, chunk_key: &str) -> Result<Chunk, AppError> {
        let map = self.read_map()?;
        map.get(chunk_key).cloned().ok_or_else(|| {
            AppError::new("AI_CHUNK_NOT_FOUND", "Chunk not found")
                .with_details(format!("chunk_key={chunk_key}"))
        })
    }

    /// Fetch chunks in the order the keys are given; missing keys are
    /// skipped (the fallback logic tolerates partial mismatch).
    pub fn get_by_keys(&self, keys: &[String]) -> Result<Vec<Chunk>, AppError> {
        let map = self.read_map()?;
        Ok(keys.iter().filter_map(|k| map.get(k).cloned()).collect())
    }

    /// Every stored chunk, in `chunk_key` order.
    pub fn list_all(&self) -> Result<Vec<Chunk>, AppError> {
        Ok(self.read_map()?.into_values().collect())
    }

    pub fn clear(&self) -> Result<(), AppError> {
        self.write_map(&BTreeMap::new())
    }
}
