//! Configuration validation.
//!
//! Checks that configured values are present and within valid ranges before
//! the server starts.

use thiserror::Error;

use crate::config::{
    ClassifierConfig, Config, EmbeddingConfig, IngestConfig, NetworkConfig, ObservabilityConfig,
    VectorStoreConfig,
};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port {port}: must be between 1 and 65535")]
    InvalidPort { port: u16, field: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

/// Known vector store backends.
pub const VECTOR_BACKENDS: &[&str] = &["qdrant", "memory"];

/// Known distance metrics.
pub const DISTANCE_METRICS: &[&str] = &["euclid", "cosine"];

/// Known embedding providers.
pub const EMBEDDING_PROVIDERS: &[&str] = &["openai", "noop"];

fn one_of(field: &str, value: &str, allowed: &[&str]) -> ValidationResult<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: field.into(),
            reason: format!("'{value}' is not one of {allowed:?}"),
        })
    }
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors: Vec<ValidationError> = [
            self.network.validate(),
            self.embedding.validate(),
            self.vector_store.validate(),
            self.classifier.validate(),
            self.ingest.validate(),
            self.observability.validate(),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        if self.vector_store.backend == "qdrant" && self.embedding.provider == "noop" {
            errors.push(ValidationError::InvalidValue {
                field: "embedding.provider".into(),
                reason: "the qdrant backend needs an embedding provider with non-zero dimensions"
                    .into(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }
}

impl Validate for NetworkConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort {
                port: self.port,
                field: "network.port".into(),
            });
        }
        if self.bind.parse::<std::net::IpAddr>().is_err() {
            return Err(ValidationError::InvalidValue {
                field: "network.bind".into(),
                reason: format!("'{}' is not an IP address", self.bind),
            });
        }
        Ok(())
    }
}

impl Validate for EmbeddingConfig {
    fn validate(&self) -> ValidationResult<()> {
        one_of("embedding.provider", &self.provider, EMBEDDING_PROVIDERS)?;
        if self.provider != "noop" && self.dimensions == 0 {
            return Err(ValidationError::InvalidValue {
                field: "embedding.dimensions".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "embedding.model".into(),
            });
        }
        Ok(())
    }
}

impl Validate for VectorStoreConfig {
    fn validate(&self) -> ValidationResult<()> {
        one_of("vector_store.backend", &self.backend, VECTOR_BACKENDS)?;
        one_of("vector_store.distance", &self.distance, DISTANCE_METRICS)?;

        if self.on_topic_collection.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "vector_store.on_topic_collection".into(),
            });
        }
        if self.off_topic_collection.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "vector_store.off_topic_collection".into(),
            });
        }
        if self.on_topic_collection == self.off_topic_collection {
            return Err(ValidationError::InvalidValue {
                field: "vector_store.off_topic_collection".into(),
                reason: "must differ from the on-topic collection".into(),
            });
        }
        Ok(())
    }
}

impl Validate for ClassifierConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.top_k == 0 {
            return Err(ValidationError::InvalidValue {
                field: "classifier.top_k".into(),
                reason: "must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

impl Validate for IngestConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.batch_size == 0 {
            return Err(ValidationError::InvalidValue {
                field: "ingest.batch_size".into(),
                reason: "must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        one_of("observability.log_format", &self.log_format, &["json", "pretty"])?;
        one_of(
            "observability.log_level",
            &self.log_level.to_lowercase(),
            &["trace", "debug", "info", "warn", "error"],
        )
    }
}
