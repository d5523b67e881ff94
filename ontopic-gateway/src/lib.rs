//! ontopic Gateway - Topic-gated chat backend.
//!
//! Answers chat messages through a hosted LLM only when they resemble the
//! on-topic example questions more than the off-topic ones:
//!
//! ```text
//! Browser ─cookie─→ Session ─→ Classifier ─on-topic──→ Provider ─→ reply + turn
//!                                  │
//!                                  └──off-topic──→ fixed refusal
//! ```
//!
//! Example questions are bulk-loaded into the two collections through
//! `POST /api/embeddings`.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod classifier;
pub mod ingest;
pub mod provider;
pub mod routes;
pub mod session;

pub use classifier::{Classification, Topic, TopicClassifier};
pub use ingest::{load_examples, ExampleQuestion, LoadReport};
pub use provider::{ChatRequest, ChatResponse, Message, OpenAIProvider, Provider, ProviderError};
pub use routes::{AppState, ChatSettings};
pub use session::{InMemorySessionStore, Session, SessionStore};

use anyhow::Context;
use axum::Router;
use ontopic_common::Config;
use ontopic_memory::{
    create_embedding_provider, DistanceMetric, EmbeddingProvider, InMemoryCollection,
    QdrantCollection, VectorCollection,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Build the gateway router: API, health, and the static landing page.
pub fn build_router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_dir = static_dir.as_ref();

    Router::new()
        .merge(routes::api_routes(state.clone()))
        .merge(routes::health_routes(state))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Static assets bundled with this crate.
const BUNDLED_STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Resolve the configured static directory.
///
/// The default relative `static` falls back to the bundled assets when the
/// working directory has no such folder.
pub fn resolve_static_dir(configured: &str) -> PathBuf {
    let path = PathBuf::from(configured);
    if path.is_absolute() || path.is_dir() || path != Path::new("static") {
        return path;
    }
    PathBuf::from(BUNDLED_STATIC_DIR)
}

/// Spawn the idle-session sweeper when `session.idle_ttl_secs` is set.
pub fn spawn_session_sweeper(
    config: &Config,
    sessions: Arc<dyn SessionStore>,
) -> Option<tokio::task::JoinHandle<()>> {
    let ttl = config.session.idle_ttl_secs?;
    let handle = session::spawn_idle_sweeper(
        sessions,
        Duration::from_secs(ttl),
        Duration::from_secs(config.session.sweep_interval_secs.max(1)),
    );
    tracing::info!(idle_ttl_secs = ttl, "Idle session eviction enabled");
    Some(handle)
}

/// Open one collection on the configured backend.
async fn open_collection(
    config: &Config,
    name: &str,
    embedding: Arc<dyn EmbeddingProvider>,
    metric: DistanceMetric,
) -> anyhow::Result<Arc<dyn VectorCollection>> {
    let store = &config.vector_store;
    let collection: Arc<dyn VectorCollection> = match store.backend.as_str() {
        "memory" => Arc::new(InMemoryCollection::new(name, embedding, metric)),
        "qdrant" => Arc::new(
            QdrantCollection::connect(&store.url, name, embedding, metric)
                .await
                .with_context(|| format!("Failed to open collection '{name}' at {}", store.url))?,
        ),
        other => anyhow::bail!("Unknown vector backend: {other}"),
    };

    if store.reset_on_start {
        collection
            .clear()
            .await
            .with_context(|| format!("Failed to reset collection '{name}'"))?;
        tracing::info!(collection = %name, "Collection reset");
    }

    Ok(collection)
}

/// Build shared state from configuration: embeddings, both collections, the
/// chat provider and an empty session store.
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let api_key = config.openai_api_key();

    let embedding = create_embedding_provider(
        &config.embedding.provider,
        api_key,
        &config.embedding.model,
        config.embedding.dimensions,
        config.embedding.base_url.as_deref(),
        Duration::from_secs(config.embedding.timeout_secs),
    )
    .context("Failed to create embedding provider")?;

    let metric: DistanceMetric = config.vector_store.distance.parse()?;

    let on_topic = open_collection(
        config,
        &config.vector_store.on_topic_collection,
        Arc::clone(&embedding),
        metric,
    )
    .await?;
    let off_topic = open_collection(
        config,
        &config.vector_store.off_topic_collection,
        Arc::clone(&embedding),
        metric,
    )
    .await?;

    let key = api_key.context("OPENAI_API_KEY is required for chat completions")?;
    let base_url = config
        .llm
        .base_url
        .as_deref()
        .unwrap_or(OpenAIProvider::DEFAULT_BASE_URL);
    let provider: Arc<dyn Provider> = Arc::new(OpenAIProvider::with_options(
        key,
        base_url,
        Duration::from_secs(config.llm.timeout_secs),
    ));

    let classifier = TopicClassifier::new(
        embedding,
        Arc::clone(&on_topic),
        Arc::clone(&off_topic),
        config.classifier.top_k,
    );

    tracing::info!(
        backend = %config.vector_store.backend,
        metric = %metric,
        top_k = classifier.top_k(),
        chat_model = %config.llm.model,
        "Gateway state ready"
    );

    Ok(AppState {
        sessions: Arc::new(InMemorySessionStore::new()),
        classifier: Arc::new(classifier),
        provider,
        on_topic,
        off_topic,
        settings: Arc::new(ChatSettings::from_config(config)),
        ingest_lock: Arc::new(Mutex::new(())),
    })
}

/// Start the gateway server.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let addr = SocketAddr::from((
        config.network.bind.parse::<std::net::IpAddr>()?,
        config.network.port,
    ));

    let state = build_state(config).await?;

    spawn_session_sweeper(config, Arc::clone(&state.sessions));

    let static_dir = resolve_static_dir(&config.web.static_dir);
    tracing::debug!(static_dir = %static_dir.display(), "Serving static files");
    let router = build_router(state, static_dir);

    tracing::info!("Starting ontopic Gateway on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
