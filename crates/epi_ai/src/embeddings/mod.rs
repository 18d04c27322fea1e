use epi_core::error::AppError;

/// Text-to-vector collaborator. Implementations must be deterministic for
/// the same text and model configuration; dimension is fixed per model.
pub trait Embedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError>;
}

pub mod ollama_embed;

pub use ollama_embed::OllamaEmbedder;
