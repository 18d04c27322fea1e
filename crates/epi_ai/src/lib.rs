pub mod ask;
pub mod chunks;
pub mod embeddings;
pub mod guardrails;
pub mod ingest;
pub mod llm;
pub mod ollama;
pub mod retrieve;
