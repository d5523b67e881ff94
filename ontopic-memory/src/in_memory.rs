//! In-process vector collection with exact nearest-neighbor search.
//!
//! Holds vectors in memory for the lifetime of the process. Suitable for
//! small example sets, local development, and tests.

use crate::embeddings::EmbeddingProvider;
use crate::traits::{DistanceMetric, ScoredExample, VectorCollection};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

struct StoredExample {
    text: String,
    vector: Vec<f32>,
}

/// Vector collection backed by a `Vec` and brute-force search.
pub struct InMemoryCollection {
    name: String,
    embedding: Arc<dyn EmbeddingProvider>,
    metric: DistanceMetric,
    entries: RwLock<Vec<StoredExample>>,
}

impl InMemoryCollection {
    pub fn new(
        name: impl Into<String>,
        embedding: Arc<dyn EmbeddingProvider>,
        metric: DistanceMetric,
    ) -> Self {
        Self {
            name: name.into(),
            embedding,
            metric,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Texts currently stored, in insertion order.
    pub async fn texts(&self) -> Vec<String> {
        self.entries
            .read()
            .await
            .iter()
            .map(|e| e.text.clone())
            .collect()
    }
}

#[async_trait]
impl VectorCollection for InMemoryCollection {
    fn backend(&self) -> &str {
        "memory"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn embedding(&self) -> Arc<dyn EmbeddingProvider> {
        Arc::clone(&self.embedding)
    }

    async fn add_texts(&self, texts: &[String]) -> anyhow::Result<usize> {
        if texts.is_empty() {
            return Ok(0);
        }

        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = self.embedding.embed(&refs).await?;
        if vectors.len() != texts.len() {
            anyhow::bail!(
                "Embedding provider returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            );
        }

        let mut entries = self.entries.write().await;
        entries.extend(
            texts
                .iter()
                .zip(vectors)
                .map(|(text, vector)| StoredExample {
                    text: text.clone(),
                    vector,
                }),
        );

        tracing::debug!(collection = %self.name, added = texts.len(), total = entries.len(), "Stored examples in memory");
        Ok(texts.len())
    }

    async fn search_by_vector(
        &self,
        vector: &[f32],
        k: usize,
    ) -> anyhow::Result<Vec<ScoredExample>> {
        let entries = self.entries.read().await;

        if let Some(first) = entries.first() {
            if first.vector.len() != vector.len() {
                anyhow::bail!(
                    "Query vector has {} dimensions, collection {} stores {}",
                    vector.len(),
                    self.name,
                    first.vector.len()
                );
            }
        }

        let mut scored: Vec<ScoredExample> = entries
            .iter()
            .map(|e| ScoredExample::new(e.text.clone(), self.metric.distance(vector, &e.vector)))
            .collect();

        // NaN distances sort last whatever their sign.
        scored.sort_by(|a, b| {
            a.distance
                .is_nan()
                .cmp(&b.distance.is_nan())
                .then(a.distance.total_cmp(&b.distance))
        });
        scored.truncate(k);

        Ok(scored)
    }

    async fn count(&self) -> anyhow::Result<usize> {
        Ok(self.entries.read().await.len())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Embeds text as a 2-d point: (length, count of 'a').
    struct PointEmbedding;

    #[async_trait]
    impl EmbeddingProvider for PointEmbedding {
        fn name(&self) -> &str {
            "point"
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32, t.matches('a').count() as f32])
                .collect())
        }
    }

    fn collection() -> InMemoryCollection {
        InMemoryCollection::new("OnTopic", Arc::new(PointEmbedding), DistanceMetric::Euclid)
    }

    #[tokio::test]
    async fn add_texts_appends() {
        let c = collection();
        assert_eq!(c.add_texts(&["one".into(), "two".into()]).await.unwrap(), 2);
        assert_eq!(c.add_texts(&["three".into()]).await.unwrap(), 1);
        assert_eq!(c.count().await.unwrap(), 3);
        assert_eq!(c.texts().await, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn add_empty_batch_is_noop() {
        let c = collection();
        assert_eq!(c.add_texts(&[]).await.unwrap(), 0);
        assert_eq!(c.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn search_orders_by_distance_and_limits_k() {
        let c = collection();
        c.add_texts(&["bb".into(), "bbbbbbbb".into(), "bbbb".into()])
            .await
            .unwrap();

        let results = c.search_by_vector(&[2.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "bb");
        assert_eq!(results[0].distance, 0.0);
        assert_eq!(results[1].text, "bbbb");
        assert!((results[1].distance - 2.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn search_returns_fewer_than_k_when_small() {
        let c = collection();
        c.add_texts(&["x".into()]).await.unwrap();
        let results = c.similarity_search_with_score("xyz", 128).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].distance - 2.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn search_empty_collection() {
        let c = collection();
        assert!(c.search_by_vector(&[1.0, 1.0], 128).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_dimension_mismatch_fails() {
        let c = collection();
        c.add_texts(&["abc".into()]).await.unwrap();
        assert!(c.search_by_vector(&[1.0, 2.0, 3.0], 1).await.is_err());
    }

    /// Embeds "nan" as a NaN vector, anything else as its length.
    struct NanEmbedding;

    #[async_trait]
    impl EmbeddingProvider for NanEmbedding {
        fn name(&self) -> &str {
            "nan"
        }

        fn dimensions(&self) -> usize {
            1
        }

        async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| if *t == "nan" { vec![f32::NAN] } else { vec![t.len() as f32] })
                .collect())
        }
    }

    #[tokio::test]
    async fn search_orders_nan_distances_last() {
        let c = InMemoryCollection::new("OnTopic", Arc::new(NanEmbedding), DistanceMetric::Euclid);
        c.add_texts(&["nan".into(), "bbbb".into(), "nan".into(), "b".into()])
            .await
            .unwrap();

        let results = c.search_by_vector(&[1.0], 4).await.unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "bbbb", "nan", "nan"]);
        assert!(results[3].distance.is_nan());
    }

    #[tokio::test]
    async fn clear_empties_collection() {
        let c = collection();
        c.add_texts(&["a".into(), "b".into()]).await.unwrap();
        c.clear().await.unwrap();
        assert_eq!(c.count().await.unwrap(), 0);
        assert!(c.health_check().await);
    }
}
