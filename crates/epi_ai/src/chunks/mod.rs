pub mod chunking;
pub mod index;
pub mod model;
pub mod store;

pub use chunking::build_chunks;
pub use index::VectorStore;
pub use model::{Chunk, ChunkType, EmbeddingRecord};
pub use store::ChunkStore;
