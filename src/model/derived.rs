// src/model/derived.rs

//! Rows the engine derives and overwrites on every evaluation.
//!
//! They are caches for downstream readers, never a source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Entity, EntityKind};
use crate::types::{PermissionStatus, ReadinessStatus, RiskLevel};

/// Per-task readiness verdict. Keyed by task id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessRecord {
    pub task_id: String,
    pub project_id: String,
    #[serde(default)]
    pub work_package_id: Option<String>,
    pub readiness_status: ReadinessStatus,
    pub blocker_count: usize,
    pub warning_count: usize,
    /// One human-readable line per contributing constraint, blockers first.
    pub drivers: Vec<String>,
    pub evaluated_at: DateTime<Utc>,
}

impl Entity for ReadinessRecord {
    const KIND: EntityKind = EntityKind::ReadinessRecord;

    fn id(&self) -> &str {
        &self.task_id
    }

    fn project_id(&self) -> &str {
        &self.project_id
    }
}

/// Package-level rollup of child readiness. Keyed by work package id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPackageReadiness {
    pub work_package_id: String,
    pub project_id: String,
    pub lookahead_ready: ReadinessStatus,
    pub lookahead_blockers: usize,
    pub lookahead_warnings: usize,
    /// Number of erection tasks folded into this rollup.
    #[serde(default)]
    pub task_count: usize,
    pub evaluated_at: DateTime<Utc>,
}

impl Entity for WorkPackageReadiness {
    const KIND: EntityKind = EntityKind::WorkPackageReadiness;

    fn id(&self) -> &str {
        &self.work_package_id
    }

    fn project_id(&self) -> &str {
        &self.project_id
    }
}

/// Manual permission decision by a privileged actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualOverride {
    pub status: PermissionStatus,
    pub approved_by: String,
    pub approved_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
    /// Readiness the override was granted against.
    pub basis_readiness: ReadinessStatus,
    /// Risk level the override was granted against.
    pub basis_risk: RiskLevel,
}

/// Gate state for a work package. Keyed by work package id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPermission {
    pub work_package_id: String,
    pub project_id: String,
    pub permission_status: PermissionStatus,
    #[serde(default)]
    pub blocking_reason: Option<String>,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub risk_score: u32,
    /// Set while a manual override is in effect.
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub manual_override: Option<ManualOverride>,
    pub evaluated_at: DateTime<Utc>,
}

impl Entity for ExecutionPermission {
    const KIND: EntityKind = EntityKind::ExecutionPermission;

    fn id(&self) -> &str {
        &self.work_package_id
    }

    fn project_id(&self) -> &str {
        &self.project_id
    }
}
