//! ontopic Common - Shared configuration, errors, and logging.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - Error types and handling utilities
//! - Logging setup and structured logging helpers

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod util;
pub mod validation;

pub use config::{
    ClassifierConfig, Config, EmbeddingConfig, IngestConfig, LlmConfig, NetworkConfig,
    ObservabilityConfig, SecretsConfig, SessionConfig, VectorStoreConfig, WebConfig,
    DEFAULT_BATCH_SIZE, DEFAULT_REFUSAL_MESSAGE, DEFAULT_TOP_K,
};
pub use error::{Error, Result, ResultExt};
pub use validation::{Validate, ValidationError, ValidationResult};
