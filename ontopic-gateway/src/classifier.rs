//! Nearest-neighbor topic classification.
//!
//! A message is on-topic when its k nearest on-topic examples are, in total,
//! closer than its k nearest off-topic examples:
//!
//! ```text
//! score(C) = Σ distance²   over the top-k matches in C
//! on-topic ⇔ score(OnTopic) < score(OffTopic)
//! ```
//!
//! Ties and empty collections resolve to off-topic.

use ontopic_common::{Result, ResultExt};
use ontopic_memory::{EmbeddingProvider, ScoredExample, VectorCollection};
use serde::Serialize;
use std::sync::Arc;

/// Number of closest matches logged per collection.
const LOGGED_MATCHES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    OnTopic,
    OffTopic,
}

impl Topic {
    pub fn is_on_topic(self) -> bool {
        matches!(self, Self::OnTopic)
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OnTopic => write!(f, "on_topic"),
            Self::OffTopic => write!(f, "off_topic"),
        }
    }
}

/// Outcome of classifying one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub topic: Topic,
    pub on_topic_score: f64,
    pub off_topic_score: f64,
}

/// Sum of squared distances over a result list.
pub fn collection_score(results: &[ScoredExample]) -> f64 {
    results
        .iter()
        .map(|r| {
            let d = f64::from(r.distance);
            d * d
        })
        .sum()
}

/// Strict comparison; equal scores are off-topic.
pub fn decide(on_topic_score: f64, off_topic_score: f64) -> Topic {
    if on_topic_score < off_topic_score {
        Topic::OnTopic
    } else {
        Topic::OffTopic
    }
}

/// Classifies messages against an on-topic and an off-topic collection.
pub struct TopicClassifier {
    embedding: Arc<dyn EmbeddingProvider>,
    on_topic: Arc<dyn VectorCollection>,
    off_topic: Arc<dyn VectorCollection>,
    top_k: usize,
}

impl TopicClassifier {
    pub fn new(
        embedding: Arc<dyn EmbeddingProvider>,
        on_topic: Arc<dyn VectorCollection>,
        off_topic: Arc<dyn VectorCollection>,
        top_k: usize,
    ) -> Self {
        Self {
            embedding,
            on_topic,
            off_topic,
            top_k: top_k.max(1),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Classify a message. Recomputed on every call.
    pub async fn classify(&self, message: &str) -> Result<Classification> {
        let vector = self
            .embedding
            .embed_one(message)
            .await
            .context(format!("Embedding with '{}'", self.embedding.name()))?;

        let (on_results, off_results) = tokio::try_join!(
            self.search(self.on_topic.as_ref(), &vector),
            self.search(self.off_topic.as_ref(), &vector),
        )?;

        let on_topic_score = collection_score(&on_results);
        let off_topic_score = collection_score(&off_results);
        let topic = decide(on_topic_score, off_topic_score);

        tracing::debug!(
            collection = %self.on_topic.name(),
            matches = ?closest(&on_results),
            "Closest on-topic examples"
        );
        tracing::debug!(
            collection = %self.off_topic.name(),
            matches = ?closest(&off_results),
            "Closest off-topic examples"
        );
        tracing::debug!(
            %topic,
            on_topic_score,
            off_topic_score,
            on_matches = on_results.len(),
            off_matches = off_results.len(),
            "Message classified"
        );

        Ok(Classification {
            topic,
            on_topic_score,
            off_topic_score,
        })
    }

    async fn search(
        &self,
        collection: &dyn VectorCollection,
        vector: &[f32],
    ) -> Result<Vec<ScoredExample>> {
        collection
            .search_by_vector(vector, self.top_k)
            .await
            .context(format!("Similarity search on '{}'", collection.name()))
    }
}

fn closest(results: &[ScoredExample]) -> Vec<(&str, f32)> {
    results
        .iter()
        .take(LOGGED_MATCHES)
        .map(|r| (r.text.as_str(), r.distance))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ontopic_common::DEFAULT_TOP_K;
    use ontopic_memory::{DistanceMetric, InMemoryCollection};

    /// Embeds text by keyword presence so that related questions land close together.
    struct KeywordEmbedding;

    const KEYWORDS: [&str; 4] = ["return", "item", "capital", "france"];

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedding {
        fn name(&self) -> &str {
            "keyword"
        }

        fn dimensions(&self) -> usize {
            KEYWORDS.len()
        }

        async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let lower = t.to_lowercase();
                    KEYWORDS
                        .iter()
                        .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
                        .collect()
                })
                .collect())
        }
    }

    fn collection(name: &str) -> Arc<InMemoryCollection> {
        Arc::new(InMemoryCollection::new(
            name,
            Arc::new(KeywordEmbedding),
            DistanceMetric::Euclid,
        ))
    }

    async fn scenario() -> TopicClassifier {
        let on = collection("OnTopic");
        let off = collection("OffTopic");
        on.add_texts(&["What is your return policy?".to_string()])
            .await
            .unwrap();
        off.add_texts(&["What is the capital of France?".to_string()])
            .await
            .unwrap();
        TopicClassifier::new(Arc::new(KeywordEmbedding), on, off, DEFAULT_TOP_K)
    }

    #[test]
    fn test_collection_score_sums_squares() {
        let results = vec![ScoredExample::new("a", 1.0), ScoredExample::new("b", 2.0)];
        assert!((collection_score(&results) - 5.0).abs() < 1e-9);
        assert_eq!(collection_score(&[]), 0.0);
    }

    #[test]
    fn test_tie_is_off_topic() {
        assert_eq!(decide(0.0, 0.0), Topic::OffTopic);
        assert_eq!(decide(3.5, 3.5), Topic::OffTopic);
        assert_eq!(decide(1.0, 2.0), Topic::OnTopic);
        assert_eq!(decide(2.0, 1.0), Topic::OffTopic);
    }

    #[tokio::test]
    async fn test_empty_collections_are_off_topic() {
        let classifier = TopicClassifier::new(
            Arc::new(KeywordEmbedding),
            collection("OnTopic"),
            collection("OffTopic"),
            DEFAULT_TOP_K,
        );
        let result = classifier.classify("anything").await.unwrap();
        assert_eq!(result.topic, Topic::OffTopic);
        assert_eq!(result.on_topic_score, 0.0);
        assert_eq!(result.off_topic_score, 0.0);
    }

    #[tokio::test]
    async fn test_scenario_return_question_is_on_topic() {
        let classifier = scenario().await;
        let result = classifier.classify("Can I return this item?").await.unwrap();
        assert_eq!(result.topic, Topic::OnTopic);
        assert!(result.on_topic_score < result.off_topic_score);
    }

    #[tokio::test]
    async fn test_scenario_capital_question_is_off_topic() {
        let classifier = scenario().await;
        let result = classifier
            .classify("What is the capital of France?")
            .await
            .unwrap();
        assert_eq!(result.topic, Topic::OffTopic);
        assert_eq!(result.off_topic_score, 0.0);
    }

    #[tokio::test]
    async fn test_classify_is_deterministic() {
        let classifier = scenario().await;
        let first = classifier.classify("Can I return this item?").await.unwrap();
        let second = classifier.classify("Can I return this item?").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_only_one_side_populated() {
        let on = collection("OnTopic");
        on.add_texts(&["What is your return policy?".to_string()])
            .await
            .unwrap();
        let classifier =
            TopicClassifier::new(Arc::new(KeywordEmbedding), on, collection("OffTopic"), 5);

        // Off-topic scores 0 when empty, so any positive on-topic distance loses.
        let result = classifier.classify("What is the capital of France?").await.unwrap();
        assert_eq!(result.topic, Topic::OffTopic);
    }

    #[test]
    fn test_zero_top_k_is_clamped() {
        let classifier = TopicClassifier::new(
            Arc::new(KeywordEmbedding),
            collection("OnTopic"),
            collection("OffTopic"),
            0,
        );
        assert_eq!(classifier.top_k(), 1);
    }

    #[test]
    fn test_topic_display() {
        assert_eq!(Topic::OnTopic.to_string(), "on_topic");
        assert!(!Topic::OffTopic.is_on_topic());
    }
}
