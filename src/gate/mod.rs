// src/gate/mod.rs

//! Start gate: the single checkpoint between a task and `in_progress`.
//!
//! Erection tasks are re-evaluated on every request; a cached record is
//! never trusted. A refusal is an [`StartOutcome::Blocked`] value, not an
//! error, so callers can render the drivers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::errors::{GateError, Result};
use crate::model::Task;
use crate::readiness::evaluate_task;
use crate::schedule::float_consumed_hours;
use crate::store::{EntityStore, StoreExt};
use crate::types::{ReadinessStatus, TaskStatus};

/// Result of a start request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartOutcome {
    /// The task is now `in_progress`. `warnings` lists the warning drivers
    /// when it started READY_WITH_WARNINGS.
    Started {
        task_id: String,
        readiness: ReadinessStatus,
        warnings: Vec<String>,
    },
    /// The task is NOT_READY and was left untouched.
    Blocked {
        task_id: String,
        blocker_count: usize,
        warning_count: usize,
        drivers: Vec<String>,
    },
}

impl StartOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, StartOutcome::Started { .. })
    }
}

pub fn request_start<S: EntityStore + ?Sized>(
    store: &S,
    task_id: &str,
    now: DateTime<Utc>,
) -> Result<StartOutcome> {
    let task = store.require::<Task>(task_id)?;
    if task.status.is_terminal() {
        return Err(GateError::Validation(format!(
            "task '{}' is {} and cannot be started",
            task.id, task.status
        )));
    }

    let Some(record) = evaluate_task(store, &task, now)? else {
        start(store, task, now)?;
        return Ok(StartOutcome::Started {
            task_id: task_id.to_string(),
            readiness: ReadinessStatus::Ready,
            warnings: Vec::new(),
        });
    };

    match record.readiness_status {
        ReadinessStatus::NotReady => {
            info!(
                task = %task_id,
                blockers = record.blocker_count,
                "start refused: task not ready"
            );
            Ok(StartOutcome::Blocked {
                task_id: task_id.to_string(),
                blocker_count: record.blocker_count,
                warning_count: record.warning_count,
                drivers: record.drivers,
            })
        }
        ReadinessStatus::ReadyWithWarnings => {
            start(store, task, now)?;
            Ok(StartOutcome::Started {
                task_id: task_id.to_string(),
                readiness: record.readiness_status,
                warnings: record.drivers,
            })
        }
        ReadinessStatus::Ready => {
            start(store, task, now)?;
            Ok(StartOutcome::Started {
                task_id: task_id.to_string(),
                readiness: record.readiness_status,
                warnings: Vec::new(),
            })
        }
    }
}

fn start<S: EntityStore + ?Sized>(store: &S, mut task: Task, now: DateTime<Utc>) -> Result<()> {
    task.status = TaskStatus::InProgress;
    task.actual_start.get_or_insert(now);
    task.float_consumed_hours = float_consumed_hours(&task, now);
    store.update_entity(&task)?;
    info!(
        task = %task.id,
        task_type = ?task.task_type,
        float_consumed_hours = task.float_consumed_hours,
        "task started"
    );
    Ok(())
}

/// Mark a task completed. Completing a completed task is a no-op.
pub fn complete_task<S: EntityStore + ?Sized>(
    store: &S,
    task_id: &str,
    now: DateTime<Utc>,
) -> Result<Task> {
    let mut task = store.require::<Task>(task_id)?;
    match task.status {
        TaskStatus::Completed => return Ok(task),
        TaskStatus::Cancelled => {
            return Err(GateError::Validation(format!(
                "task '{}' is cancelled and cannot be completed",
                task.id
            )));
        }
        TaskStatus::NotStarted
        | TaskStatus::InProgress
        | TaskStatus::Blocked
        | TaskStatus::OnHold => {}
    }

    task.status = TaskStatus::Completed;
    task.actual_start.get_or_insert(now);
    task.actual_end = Some(now);
    store.update_entity(&task)?;
    info!(task = %task.id, "task completed");
    Ok(task)
}
