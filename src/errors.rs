// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! A refused start is not an error: see [`crate::gate::StartOutcome`].

use thiserror::Error;

use crate::store::EntityKind;

#[derive(Error, Debug)]
pub enum GateError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Task '{0}' cannot be its own predecessor")]
    SelfPredecessor(String),

    #[error("Cycle detected in predecessor graph: {}", path.join(" -> "))]
    DagCycle { path: Vec<String> },

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GateError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        GateError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Validation failures are never partially applied and are not retryable.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GateError::Validation(_)
                | GateError::SelfPredecessor(_)
                | GateError::DagCycle { .. }
                | GateError::NotFound { .. }
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, GateError>;
