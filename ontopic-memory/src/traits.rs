//! Core vector collection trait and types.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Distance metric used by a collection.
///
/// Search results always carry a distance (lower is closer), whatever the
/// backend natively reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Euclidean (L2) distance
    #[default]
    Euclid,
    /// Cosine distance, `1 - cosine_similarity`
    Cosine,
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Euclid => write!(f, "euclid"),
            Self::Cosine => write!(f, "cosine"),
        }
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "euclid" | "euclidean" | "l2" => Ok(Self::Euclid),
            "cosine" => Ok(Self::Cosine),
            other => anyhow::bail!("Unknown distance metric: {other}"),
        }
    }
}

impl DistanceMetric {
    /// Distance between two vectors under this metric.
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Euclid => crate::vector::euclidean_distance(a, b),
            Self::Cosine => 1.0 - crate::vector::cosine_similarity(a, b),
        }
    }
}

/// A stored example matched by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredExample {
    /// Text of the matched example question
    pub text: String,
    /// Distance from the query (lower is closer)
    pub distance: f32,
}

impl ScoredExample {
    pub fn new(text: impl Into<String>, distance: f32) -> Self {
        Self {
            text: text.into(),
            distance,
        }
    }
}

/// A named collection of embedded example texts.
#[async_trait]
pub trait VectorCollection: Send + Sync {
    /// Backend name (e.g., "qdrant", "memory")
    fn backend(&self) -> &str;

    /// Collection name (e.g., "OnTopic")
    fn name(&self) -> &str;

    /// Metric used for search distances.
    fn metric(&self) -> DistanceMetric;

    /// Embedding provider used to vectorize stored texts and queries.
    fn embedding(&self) -> Arc<dyn EmbeddingProvider>;

    /// Embed and append texts to the collection.
    ///
    /// Existing entries are kept. Returns the number of texts stored.
    async fn add_texts(&self, texts: &[String]) -> anyhow::Result<usize>;

    /// Return up to `k` nearest entries to `vector`, closest first.
    ///
    /// Fewer than `k` results are returned when the collection is smaller.
    async fn search_by_vector(&self, vector: &[f32], k: usize)
        -> anyhow::Result<Vec<ScoredExample>>;

    /// Embed `query` and return up to `k` nearest entries, closest first.
    async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> anyhow::Result<Vec<ScoredExample>> {
        let vector = self.embedding().embed_one(query).await?;
        self.search_by_vector(&vector, k).await
    }

    /// Number of stored entries.
    async fn count(&self) -> anyhow::Result<usize>;

    /// Remove every entry, leaving an empty collection.
    async fn clear(&self) -> anyhow::Result<()>;

    /// Returns true if the backend is reachable.
    async fn health_check(&self) -> bool;
}
