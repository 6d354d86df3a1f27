// src/model/constraint.rs

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Task;
use crate::store::{Entity, EntityKind};
use crate::types::{ConstraintStatus, ConstraintType, Severity};

/// A typed, graded blocking condition.
///
/// Cleared constraints are history: they are never deleted and never take
/// part in evaluation again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub work_package_id: Option<String>,
    pub constraint_type: ConstraintType,
    pub severity: Severity,
    #[serde(default)]
    pub status: ConstraintStatus,
    /// Ids of the originating records (an RFI id, a drawing set id, ...).
    #[serde(default)]
    pub evidence_links: BTreeSet<String>,
    #[serde(default)]
    pub summary: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub cleared_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cleared_by: Option<String>,
}

/// What a constraint is attached to.
///
/// A constraint with a `task_id` applies to that task only. One with only a
/// `work_package_id` applies to every task in the package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstraintScope {
    pub task_id: Option<String>,
    pub work_package_id: Option<String>,
}

impl ConstraintScope {
    pub fn task(task_id: impl Into<String>) -> Self {
        Self {
            task_id: Some(task_id.into()),
            work_package_id: None,
        }
    }

    pub fn package(work_package_id: impl Into<String>) -> Self {
        Self {
            task_id: None,
            work_package_id: Some(work_package_id.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.task_id.is_none() && self.work_package_id.is_none()
    }

    /// Whether this scope covers `task`, directly or through the task's
    /// work package.
    pub fn applies_to(&self, task: &Task) -> bool {
        covers(self.task_id.as_deref(), self.work_package_id.as_deref(), task)
    }
}

fn covers(task_id: Option<&str>, work_package_id: Option<&str>, task: &Task) -> bool {
    match (task_id, work_package_id) {
        (Some(task_id), _) => task_id == task.id,
        (None, Some(wp)) => task.work_package_id.as_deref() == Some(wp),
        (None, None) => false,
    }
}

impl Constraint {
    pub fn is_open(&self) -> bool {
        self.status == ConstraintStatus::Open
    }

    /// Whether this constraint is scoped to `task`, directly or through the
    /// task's work package.
    pub fn applies_to(&self, task: &Task) -> bool {
        covers(self.task_id.as_deref(), self.work_package_id.as_deref(), task)
    }

    pub fn has_evidence(&self, link: &str) -> bool {
        self.evidence_links.contains(link)
    }

    /// Stable key of the evidence set, used to merge duplicate conditions.
    pub fn evidence_key(&self) -> String {
        self.evidence_links
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Entity for Constraint {
    const KIND: EntityKind = EntityKind::Constraint;

    fn id(&self) -> &str {
        &self.id
    }

    fn project_id(&self) -> &str {
        &self.project_id
    }
}
