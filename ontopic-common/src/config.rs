//! Configuration management for ontopic services.
//!
//! The gateway reads a single configuration file at `~/.ontopic/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (ONTOPIC_* prefix, plus provider keys)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `ONTOPIC_BIND_ADDRESS` → network.bind
//! - `ONTOPIC_PORT` → network.port
//! - `ONTOPIC_LOG_LEVEL` → observability.log_level
//! - `ONTOPIC_LOG_FORMAT` → observability.log_format
//! - `OPENAI_API_KEY` → secrets.openai
//! - `ONTOPIC_CHAT_MODEL` → llm.model
//! - `ONTOPIC_EMBEDDING_MODEL` → embedding.model
//! - `QDRANT_URL` → vector_store.url
//! - `ONTOPIC_VECTOR_BACKEND` → vector_store.backend

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".ontopic"),
        |dirs| dirs.home_dir().join(".ontopic"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Network Configuration
// ============================================================================

/// Listen address for the HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bind address. Default: "0.0.0.0"
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// Listen port. Default: 8080
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

// ============================================================================
// Secrets
// ============================================================================

/// Provider credentials.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecretsConfig {
    /// OpenAI (or compatible) API key, used for both chat and embeddings
    #[serde(default)]
    pub openai: Option<String>,
}

// ============================================================================
// LLM Configuration
// ============================================================================

/// Chat completion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name sent to the completion endpoint
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Base URL override for OpenAI-compatible APIs
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub temperature: Option<f64>,

    #[serde(default)]
    pub max_tokens: Option<i64>,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Preamble sent ahead of the conversation transcript
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            base_url: None,
            temperature: None,
            max_tokens: None,
            timeout_secs: default_llm_timeout(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_chat_model() -> String {
    "gpt-4o-mini".into()
}

fn default_llm_timeout() -> u64 {
    300
}

fn default_system_prompt() -> String {
    "The following is a friendly conversation between a human and an AI. \
     The AI is talkative and provides lots of specific details from its context. \
     If the AI does not know the answer to a question, it truthfully says it does not know."
        .into()
}

// ============================================================================
// Embedding Configuration
// ============================================================================

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider type (openai, noop)
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector dimensions produced by the model
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,

    /// Base URL override for OpenAI-compatible APIs
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
            base_url: None,
            timeout_secs: default_embedding_timeout(),
        }
    }
}

fn default_embedding_provider() -> String {
    "openai".into()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

fn default_embedding_dimensions() -> usize {
    1536
}

fn default_embedding_timeout() -> u64 {
    60
}

// ============================================================================
// Vector Store Configuration
// ============================================================================

/// Vector collection backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Backend type (qdrant, memory)
    #[serde(default = "default_vector_backend")]
    pub backend: String,

    /// Qdrant gRPC URL
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    #[serde(default = "default_on_topic_collection")]
    pub on_topic_collection: String,

    #[serde(default = "default_off_topic_collection")]
    pub off_topic_collection: String,

    /// Distance metric (euclid, cosine)
    #[serde(default = "default_distance")]
    pub distance: String,

    /// Drop both collections when the server starts
    #[serde(default = "default_true")]
    pub reset_on_start: bool,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_vector_backend(),
            url: default_qdrant_url(),
            on_topic_collection: default_on_topic_collection(),
            off_topic_collection: default_off_topic_collection(),
            distance: default_distance(),
            reset_on_start: true,
        }
    }
}

fn default_vector_backend() -> String {
    "qdrant".into()
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".into()
}

fn default_on_topic_collection() -> String {
    "OnTopic".into()
}

fn default_off_topic_collection() -> String {
    "OffTopic".into()
}

fn default_distance() -> String {
    "euclid".into()
}

// ============================================================================
// Classifier / Ingest / Session / Web
// ============================================================================

/// Topic classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Neighbors retrieved from each collection
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Reply returned for off-topic messages
    #[serde(default = "default_refusal_message")]
    pub refusal_message: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            refusal_message: default_refusal_message(),
        }
    }
}

/// Default neighbors retrieved from each collection.
pub const DEFAULT_TOP_K: usize = 128;

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// Fixed reply for messages classified off-topic.
pub const DEFAULT_REFUSAL_MESSAGE: &str = "Sorry. This is not a topic that I know.";

fn default_refusal_message() -> String {
    DEFAULT_REFUSAL_MESSAGE.into()
}

/// Bulk-load settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Questions embedded and stored per call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

/// Default questions embedded per bulk-load batch.
pub const DEFAULT_BATCH_SIZE: usize = 5;

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Browser session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Evict sessions idle longer than this. `None` keeps them for the
    /// lifetime of the process.
    #[serde(default)]
    pub idle_ttl_secs: Option<u64>,

    /// How often the idle sweeper runs
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            idle_ttl_secs: None,
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_cookie_name() -> String {
    "session_id".into()
}

fn default_sweep_interval() -> u64 {
    60
}

/// Static landing page settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Directory holding `index.html` and other static assets
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            static_dir: default_static_dir(),
        }
    }
}

fn default_static_dir() -> String {
    "static".into()
}

// ============================================================================
// Observability
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets capped at `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub secrets: SecretsConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub web: WebConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(bind) = std::env::var("ONTOPIC_BIND_ADDRESS") {
            self.network.bind = bind;
        }
        if let Ok(port) = std::env::var("ONTOPIC_PORT") {
            if let Ok(p) = port.parse() {
                self.network.port = p;
            }
        }

        if let Ok(level) = std::env::var("ONTOPIC_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("ONTOPIC_LOG_FORMAT") {
            self.observability.log_format = format;
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.secrets.openai = Some(key);
        }
        if let Ok(model) = std::env::var("ONTOPIC_CHAT_MODEL") {
            self.llm.model = model;
        }
        if let Ok(model) = std::env::var("ONTOPIC_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }

        if let Ok(url) = std::env::var("QDRANT_URL") {
            self.vector_store.url = url;
        }
        if let Ok(backend) = std::env::var("ONTOPIC_VECTOR_BACKEND") {
            self.vector_store.backend = backend;
        }
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<()> {
        let dir = config_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create config directory {}", dir.display()))?;
        }

        let path = config_path();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Socket address string the server binds to.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.network.bind, self.network.port)
    }

    /// API key for the OpenAI-compatible providers, ignoring empty values.
    pub fn openai_api_key(&self) -> Option<&str> {
        self.secrets
            .openai
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }
}
