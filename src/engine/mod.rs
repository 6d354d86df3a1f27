// src/engine/mod.rs

//! Orchestration engine for readygate.
//!
//! This module ties together:
//! - the [`Engine`] facade answering direct requests (edge edits, starts,
//!   holds, sequence shifts, overrides)
//! - the cascade reacting to upstream mutation notifications:
//!   - derive or clear constraints implied by the change
//!   - re-evaluate every erection task in the project
//!   - roll up the affected work packages
//!   - refresh their execution permissions
//! - the async runtime feeding notifications into the engine
//!
//! Per-entity derivation lives in [`event_handlers`], the fan-out and its
//! report in [`cascade`], and the tokio shell in [`runtime`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod cascade;
pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use cascade::{CascadeFailure, CascadeReport};
pub use self::core::{Clock, Engine};
pub use event_handlers::Derivation;
pub use runtime::{CascadeSink, LoggingSink, NotificationRuntime, RuntimeStats};

/// Kind of upstream mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Create,
    Update,
    Delete,
}

/// Header of a mutation notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub entity_name: String,
    #[serde(default)]
    pub entity_id: String,
}

/// `{ "event": { "type", "entity_name", "entity_id" }, "data": <after-image> }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationNotification {
    pub event: MutationEvent,
    #[serde(default)]
    pub data: Value,
}

impl MutationNotification {
    pub fn new(
        kind: EventKind,
        entity_name: impl Into<String>,
        entity_id: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            event: MutationEvent {
                kind,
                entity_name: entity_name.into(),
                entity_id: entity_id.into(),
            },
            data,
        }
    }

    /// `project_id` carried by the after-image, if any.
    pub fn project_id(&self) -> Option<&str> {
        self.data
            .get("project_id")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

/// Events flowing into the [`NotificationRuntime`].
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// An upstream record changed.
    Notification(MutationNotification),
    /// Recompute everything for a project (recovery after missed triggers).
    RecomputeProject { project_id: String },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}
