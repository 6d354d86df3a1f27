// src/model/task.rs

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Entity, EntityKind};
use crate::types::{TaskStatus, TaskType};

/// A schedulable unit of work.
///
/// `predecessor_ids` never contains the task's own id and never closes a
/// cycle; edits go through [`crate::dag::validate_edge`] before they are
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub work_package_id: Option<String>,
    #[serde(default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub predecessor_ids: BTreeSet<String>,

    /// Grouping key used by area holds (e.g. `"Grid A-C"`).
    #[serde(default)]
    pub erection_area: Option<String>,
    #[serde(default)]
    pub hold_area: bool,
    #[serde(default)]
    pub hold_reason: Option<String>,

    /// Unique ordering key within the project.
    #[serde(default)]
    pub install_sequence_number: i64,

    /// Planning snapshot; immutable once set.
    #[serde(default)]
    pub baseline_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub baseline_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actual_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actual_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub float_consumed_hours: f64,

    /// Drawing sets that must be released before erection.
    #[serde(default)]
    pub drawing_set_ids: BTreeSet<String>,
    /// Deliveries this task is itself gated on. Pending ones are blockers
    /// rather than warnings.
    #[serde(default)]
    pub gating_delivery_ids: BTreeSet<String>,
}

impl Task {
    pub fn is_erection(&self) -> bool {
        self.task_type == TaskType::Erection
    }

    pub fn in_area(&self, area: &str) -> bool {
        self.erection_area.as_deref() == Some(area)
    }

    /// Status a task returns to once whatever blocked it is resolved.
    pub fn resume_status(&self) -> TaskStatus {
        if self.actual_start.is_some() {
            TaskStatus::InProgress
        } else {
            TaskStatus::NotStarted
        }
    }
}

impl Entity for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn id(&self) -> &str {
        &self.id
    }

    fn project_id(&self) -> &str {
        &self.project_id
    }
}
