use epi_core::error::AppError;
use serde::{Deserialize, Serialize};

/// Sampling parameters forwarded to the completion engine. Defaults are
/// tuned for short, near-greedy extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 128,
            temperature: 0.2,
            top_p: 0.95,
        }
    }
}

/// Prompt-to-text collaborator. Output is untrusted — it may be malformed
/// or degenerate — and is always passed through the guardrails layer.
pub trait Llm {
    fn complete(
        &self,
        model: &str,
        prompt: &str,
        params: &CompletionParams,
    ) -> Result<String, AppError>;
}

pub mod ollama_llm;

pub use ollama_llm::OllamaLlm;
