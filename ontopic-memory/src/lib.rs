//! ontopic Memory - Embeddings and vector collections.
//!
//! This crate provides the vector side of topic classification:
//! - Embedding providers (OpenAI-compatible, no-op)
//! - The `VectorCollection` trait: append texts, k-nearest-neighbor search
//! - Qdrant and in-process backends
//!
//! ```text
//! Example questions → Embeddings → add_texts ──→ Collection
//! Query ────────────→ Embeddings → search_by_vector → [(text, distance)]
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod embeddings;
pub mod in_memory;
pub mod qdrant;
pub mod traits;
pub mod vector;

// Re-export commonly used types
pub use embeddings::{create_embedding_provider, EmbeddingProvider, NoopEmbedding, OpenAiEmbedding};
pub use in_memory::InMemoryCollection;
pub use qdrant::QdrantCollection;
pub use traits::{DistanceMetric, ScoredExample, VectorCollection};
pub use vector::{cosine_similarity, euclidean_distance};
