//! HTTP routes for the chat gateway.

use crate::classifier::TopicClassifier;
use crate::ingest::{load_examples, ExampleQuestion};
use crate::provider::{ChatRequest, Provider};
use crate::session::{Session, SessionStore};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use ontopic_common::util::truncate_with_ellipsis;
use ontopic_common::{Config, Error};
use ontopic_memory::VectorCollection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::Instrument;

// ============================================================================
// State
// ============================================================================

/// Chat settings resolved from configuration.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i64>,
    pub refusal_message: String,
    pub cookie_name: String,
    pub batch_size: usize,
}

impl ChatSettings {
    pub fn from_config(config: &Config) -> Self {
        let system_prompt = Some(config.llm.system_prompt.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            model: config.llm.model.clone(),
            system_prompt,
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            refusal_message: config.classifier.refusal_message.clone(),
            cookie_name: config.session.cookie_name.clone(),
            batch_size: config.ingest.batch_size,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionStore>,
    pub classifier: Arc<TopicClassifier>,
    pub provider: Arc<dyn Provider>,
    pub on_topic: Arc<dyn VectorCollection>,
    pub off_topic: Arc<dyn VectorCollection>,
    pub settings: Arc<ChatSettings>,
    /// Serializes bulk loads
    pub ingest_lock: Arc<Mutex<()>>,
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Chat request body.
#[derive(Debug, Deserialize)]
pub struct ChatbotRequest {
    pub input: String,
}

/// Chat response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatbotResponse {
    pub response: String,
}

/// Bulk-load request body.
#[derive(Debug, Deserialize)]
pub struct EmbeddingsRequest {
    pub on_topic: Vec<ExampleQuestion>,
    pub off_topic: Vec<ExampleQuestion>,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

/// Handler error rendered as a JSON `ErrorResponse`.
#[derive(Debug)]
pub struct ApiError(Error);

impl<E: Into<Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::warn!(error = %self.0, "Request rejected");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: self.0.code().into(),
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/chatbot
///
/// Resolves the caller's session from the cookie, classifies the input and
/// either answers through the chat provider or refuses. The session cookie is
/// set on every successful response.
async fn chatbot_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<ChatbotRequest>,
) -> Result<(CookieJar, Json<ChatbotResponse>), ApiError> {
    let cookie_name = state.settings.cookie_name.clone();
    let cookie_id = jar.get(&cookie_name).map(|c| c.value().to_string());
    let session = state.sessions.get_or_create(cookie_id.as_deref()).await;
    session.touch();

    let trace_id = ontopic_common::logging::generate_trace_id();
    let span = ontopic_common::request_span!("chatbot", trace_id, session_id = %session.id());
    let reply = respond(&state, &session, request.input)
        .instrument(span)
        .await?;

    let cookie = Cookie::build((cookie_name, session.id().to_string()))
        .path("/")
        .build();

    Ok((jar.add(cookie), Json(ChatbotResponse { response: reply })))
}

async fn respond(state: &AppState, session: &Session, input: String) -> Result<String, ApiError> {
    let settings = &state.settings;
    tracing::debug!(input = %truncate_with_ellipsis(&input, 80), "Classifying message");
    let classification = state.classifier.classify(&input).await?;

    if !classification.topic.is_on_topic() {
        tracing::info!(
            on_topic_score = classification.on_topic_score,
            off_topic_score = classification.off_topic_score,
            "Refused off-topic message"
        );
        return Ok(settings.refusal_message.clone());
    }

    // Held until the turn is recorded so turns of one session stay ordered.
    let mut conversation = session.conversation().lock().await;
    let chat_request = ChatRequest {
        model: settings.model.clone(),
        messages: conversation.to_messages(&input),
        max_tokens: settings.max_tokens,
        temperature: settings.temperature,
        system: settings.system_prompt.clone(),
    };
    let response = state.provider.chat(chat_request).await?;
    conversation.push_turn(input, response.content.clone());

    tracing::info!(
        provider = %state.provider.name(),
        turns = conversation.turns().len(),
        latency_ms = response.latency_ms,
        "Answered on-topic message"
    );
    Ok(response.content)
}

/// POST /api/embeddings
///
/// Appends the submitted example questions to their collections.
async fn embeddings_handler(
    State(state): State<AppState>,
    Json(request): Json<EmbeddingsRequest>,
) -> Result<StatusCode, ApiError> {
    let _ingest = state.ingest_lock.lock().await;
    let batch_size = state.settings.batch_size;

    let on_topic: Vec<String> = request.on_topic.into_iter().map(|q| q.question).collect();
    let off_topic: Vec<String> = request.off_topic.into_iter().map(|q| q.question).collect();

    load_examples(state.on_topic.as_ref(), &on_topic, batch_size).await?;
    load_examples(state.off_topic.as_ref(), &off_topic, batch_size).await?;

    Ok(StatusCode::OK)
}

/// GET /health
///
/// Reports `degraded` with 503 when either collection backend is unreachable.
async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (on_ok, off_ok) = tokio::join!(
        state.on_topic.health_check(),
        state.off_topic.health_check()
    );

    let (status, label) = if on_ok && off_ok {
        (StatusCode::OK, "healthy")
    } else {
        tracing::warn!(
            on_topic = on_ok,
            off_topic = off_ok,
            backend = %state.on_topic.backend(),
            "Vector store health check failed"
        );
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(HealthResponse {
            status: label.into(),
            version: env!("CARGO_PKG_VERSION").into(),
            service: "ontopic-gateway".into(),
        }),
    )
}

// ============================================================================
// Routers
// ============================================================================

/// Chat and bulk-load API routes.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chatbot", post(chatbot_handler))
        .route("/api/embeddings", post(embeddings_handler))
        .with_state(state)
}

/// Health check routes.
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}
