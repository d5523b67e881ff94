//! Embedding providers.
//!
//! Converts text into fixed-dimension vectors. The OpenAI provider talks to
//! any OpenAI-compatible `/v1/embeddings` endpoint.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Trait for text embedding backends.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name (e.g., "openai", "noop")
    fn name(&self) -> &str;

    /// Dimensions of the vectors this provider produces.
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut vectors = self.embed(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("{} returned no embedding", self.name()))
    }
}

/// Embedding provider that produces empty vectors.
///
/// Used when no embedding backend is configured. Has zero dimensions, so
/// vector backends that need real vectors refuse it.
pub struct NoopEmbedding;

#[async_trait]
impl EmbeddingProvider for NoopEmbedding {
    fn name(&self) -> &str {
        "noop"
    }

    fn dimensions(&self) -> usize {
        0
    }

    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| Vec::new()).collect())
    }
}

/// OpenAI-compatible embedding client.
pub struct OpenAiEmbedding {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dims: usize,
}

impl OpenAiEmbedding {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com";

    /// Create a client for the official OpenAI endpoint.
    pub fn new(api_key: &str, model: impl Into<String>, dims: usize) -> anyhow::Result<Self> {
        Self::with_options(api_key, model, dims, Self::DEFAULT_BASE_URL, Duration::from_secs(60))
    }

    /// Create a client with a custom base URL and request timeout.
    pub fn with_options(
        api_key: &str,
        model: impl Into<String>,
        dims: usize,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| anyhow::anyhow!("Invalid API key header: {e}"))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dims,
        })
    }

    /// Only the text-embedding-3 family accepts a `dimensions` parameter.
    fn requested_dimensions(&self) -> Option<usize> {
        self.model
            .starts_with("text-embedding-3")
            .then_some(self.dims)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    fn name(&self) -> &str {
        "openai"
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(model = %self.model, text_count = texts.len(), "Requesting embeddings");

        let request = EmbeddingsRequest {
            model: &self.model,
            input: texts,
            dimensions: self.requested_dimensions(),
        };

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Embedding request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Embedding API error ({}): {}", status.as_u16(), body);
        }

        let mut parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse embedding response: {e}"))?;

        if parsed.data.len() != texts.len() {
            anyhow::bail!(
                "Embedding API returned {} vectors for {} inputs",
                parsed.data.len(),
                texts.len()
            );
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Create an embedding provider by name.
///
/// `openai` requires an API key; `noop` never fails.
pub fn create_embedding_provider(
    provider: &str,
    api_key: Option<&str>,
    model: &str,
    dims: usize,
    base_url: Option<&str>,
    timeout: Duration,
) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    match provider {
        "noop" => Ok(Arc::new(NoopEmbedding)),
        "openai" => {
            let key = api_key
                .ok_or_else(|| anyhow::anyhow!("OpenAI embedding provider needs an API key"))?;
            let base_url = base_url.unwrap_or(OpenAiEmbedding::DEFAULT_BASE_URL);
            Ok(Arc::new(OpenAiEmbedding::with_options(
                key, model, dims, base_url, timeout,
            )?))
        }
        other => anyhow::bail!("Unknown embedding provider: {other}"),
    }
}
