//! Askdoc Retrieval - chunking, embedding, and nearest-neighbor search
//!
//! The retrieval layer of the pipeline:
//! - [`chunk`] splits extracted text into overlapping fixed-size chunks
//! - [`embedding`] maps chunk text to vectors via hosted embedding APIs
//! - [`index`] holds one ingestion batch's vectors and answers top-k
//!   similarity queries; new batches replace the index wholesale through
//!   an atomic snapshot swap

pub mod chunk;
pub mod embedding;
pub mod index;

pub use chunk::{ChunkConfig, Chunker, Chunks};
pub use embedding::{
    create_embedding_client, EmbeddingClient, GeminiEmbedding, OllamaEmbedding, OpenAiEmbedding,
};
pub use index::{IndexHandle, ScoredChunk, VectorIndex};
