//! Integration tests for the Qdrant collection backend.
//!
//! Requires Qdrant to be running: docker run -p 6333:6333 -p 6334:6334 qdrant/qdrant
//! Run with: cargo test --test qdrant_integration -- --ignored

use async_trait::async_trait;
use ontopic_memory::{DistanceMetric, EmbeddingProvider, QdrantCollection, VectorCollection};
use std::sync::Arc;

/// Mock embedding provider for testing that produces deterministic embeddings.
struct MockEmbedding {
    dims: usize,
}

#[async_trait]
impl EmbeddingProvider for MockEmbedding {
    fn name(&self) -> &str {
        "mock"
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vec = vec![0.0f32; self.dims];
                for (j, c) in text.chars().enumerate() {
                    vec[j % self.dims] += (c as u32 as f32) / 1000.0;
                }
                let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm > 0.0 {
                    vec.iter_mut().for_each(|x| *x /= norm);
                }
                vec
            })
            .collect())
    }
}

async fn create_test_collection(name: &str) -> QdrantCollection {
    let embedding = Arc::new(MockEmbedding { dims: 64 });
    let collection =
        QdrantCollection::connect("http://localhost:6334", name, embedding, DistanceMetric::Euclid)
            .await
            .expect("Failed to connect to Qdrant");
    collection.clear().await.expect("Failed to reset collection");
    collection
}

#[tokio::test]
#[ignore = "requires Qdrant"]
async fn qdrant_health_check() {
    let collection = create_test_collection("it_health").await;
    assert!(collection.health_check().await);
}

#[tokio::test]
#[ignore = "requires Qdrant"]
async fn qdrant_batches_accumulate() {
    let collection = create_test_collection("it_accumulate").await;

    let questions: Vec<String> = (0..12).map(|i| format!("Question number {i}?")).collect();
    for batch in questions.chunks(5) {
        collection.add_texts(batch).await.expect("Failed to add batch");
    }

    assert_eq!(collection.count().await.expect("Failed to count"), 12);
}

#[tokio::test]
#[ignore = "requires Qdrant"]
async fn qdrant_search_fewer_than_k() {
    let collection = create_test_collection("it_fewer_than_k").await;
    collection
        .add_texts(&["What is your return policy?".to_string()])
        .await
        .expect("Failed to add");

    let results = collection
        .similarity_search_with_score("Can I return this item?", 128)
        .await
        .expect("Failed to search");
    assert_eq!(results.len(), 1);
    assert!(results[0].distance >= 0.0);
}

#[tokio::test]
#[ignore = "requires Qdrant"]
async fn qdrant_clear_resets() {
    let collection = create_test_collection("it_clear").await;
    collection
        .add_texts(&["a".to_string(), "b".to_string()])
        .await
        .expect("Failed to add");
    collection.clear().await.expect("Failed to clear");

    assert_eq!(collection.count().await.expect("Failed to count"), 0);
    let results = collection
        .similarity_search_with_score("a", 10)
        .await
        .expect("Failed to search");
    assert!(results.is_empty());
}
