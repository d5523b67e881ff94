//! Qdrant-backed vector collection.
//!
//! Uses the Qdrant vector database for similarity search.
//! Requires a running Qdrant instance.

use crate::embeddings::EmbeddingProvider;
use crate::traits::{DistanceMetric, ScoredExample, VectorCollection};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, PointId, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use std::sync::Arc;

/// Payload field holding the example text.
const TEXT_FIELD: &str = "text";

/// Qdrant collection of embedded example texts.
pub struct QdrantCollection {
    client: Qdrant,
    collection: String,
    embedding: Arc<dyn EmbeddingProvider>,
    dimension: usize,
    metric: DistanceMetric,
}

impl QdrantCollection {
    /// Connect to a Qdrant instance and make sure the collection exists.
    ///
    /// # Arguments
    /// * `url` - Qdrant gRPC URL (e.g., "http://localhost:6334")
    /// * `collection` - Name of the collection to use
    /// * `embedding` - Embedding provider for vectorization
    /// * `metric` - Distance metric used when the collection is created
    pub async fn connect(
        url: &str,
        collection: &str,
        embedding: Arc<dyn EmbeddingProvider>,
        metric: DistanceMetric,
    ) -> anyhow::Result<Self> {
        let dimension = embedding.dimensions();
        if dimension == 0 {
            anyhow::bail!("Embedding provider must have non-zero dimensions for Qdrant");
        }

        let client = Qdrant::from_url(url).build()?;

        let this = Self {
            client,
            collection: collection.to_string(),
            embedding,
            dimension,
            metric,
        };

        this.ensure_collection().await?;

        Ok(this)
    }

    /// Ensure the collection exists with the configured dimension and metric.
    pub async fn ensure_collection(&self) -> anyhow::Result<()> {
        let collections = self.client.list_collections().await?;
        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            tracing::info!(collection = %self.collection, dimension = self.dimension, metric = %self.metric, "Creating Qdrant collection");

            let vector_params =
                VectorParamsBuilder::new(self.dimension as u64, qdrant_distance(self.metric));

            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(vector_params),
                )
                .await?;
        }

        Ok(())
    }

    /// Build a point with a fresh random ID so repeated texts are kept.
    fn create_point(text: &str, vector: Vec<f32>) -> PointStruct {
        let payload: HashMap<String, Value> =
            HashMap::from([(TEXT_FIELD.to_string(), Value::from(text.to_string()))]);

        PointStruct::new(
            PointId::from(uuid::Uuid::new_v4().to_string()),
            vector,
            payload,
        )
    }

    /// Extract the example text from a point payload.
    fn extract_text(payload: &HashMap<String, Value>) -> Option<String> {
        payload.get(TEXT_FIELD)?.as_str().map(|s| s.to_string())
    }
}

/// Map our metric onto Qdrant's.
fn qdrant_distance(metric: DistanceMetric) -> Distance {
    match metric {
        DistanceMetric::Euclid => Distance::Euclid,
        DistanceMetric::Cosine => Distance::Cosine,
    }
}

/// Convert a Qdrant score into a distance.
///
/// Euclid scores are already distances; cosine scores are similarities.
fn score_to_distance(metric: DistanceMetric, score: f32) -> f32 {
    match metric {
        DistanceMetric::Euclid => score,
        DistanceMetric::Cosine => 1.0 - score,
    }
}

#[async_trait]
impl VectorCollection for QdrantCollection {
    fn backend(&self) -> &str {
        "qdrant"
    }

    fn name(&self) -> &str {
        &self.collection
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

        let points: Vec<PointStruct> = texts
            .iter()
            .zip(vectors)
            .map(|(text, vector)| Self::create_point(text, vector))
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await?;

        tracing::debug!(collection = %self.collection, added = texts.len(), "Stored examples in Qdrant");
        Ok(texts.len())
    }

    async fn search_by_vector(
        &self,
        vector: &[f32],
        k: usize,
    ) -> anyhow::Result<Vec<ScoredExample>> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector.to_vec(), k as u64)
                    .with_payload(true),
            )
            .await?;

        let examples = results
            .result
            .iter()
            .filter_map(|point| {
                let text = Self::extract_text(&point.payload)?;
                Some(ScoredExample::new(
                    text,
                    score_to_distance(self.metric, point.score),
                ))
            })
            .collect();

        Ok(examples)
    }

    async fn count(&self) -> anyhow::Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await?;

        Ok(response.result.map_or(0, |r| r.count as usize))
    }

    async fn clear(&self) -> anyhow::Result<()> {
        let collections = self.client.list_collections().await?;
        if collections
            .collections
            .iter()
            .any(|c| c.name == self.collection)
        {
            self.client.delete_collection(self.collection.as_str()).await?;
            tracing::info!(collection = %self.collection, "Dropped Qdrant collection");
        }

        self.ensure_collection().await
    }

    async fn health_check(&self) -> bool {
        self.client.health_check().await.is_ok()
    }
}
