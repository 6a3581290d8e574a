//! Long-term memory for Colloquy.
//!
//! Memory events are embedded (dense, sparse TF-IDF, or zero), indexed in an
//! exact cosine index, and searched by similarity. PII is masked before
//! anything is stored.

pub mod embedding;
pub mod http_embedder;
pub mod index;
pub mod manager;
pub mod pii;
pub mod vector;

pub use embedding::{EmbeddingKind, Embeddings, SparseVectorizer};
pub use http_embedder::HttpEmbedder;
pub use index::VectorIndex;
pub use manager::MemoryManager;
pub use pii::PiiMasker;
