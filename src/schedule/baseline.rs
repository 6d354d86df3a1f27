// src/schedule/baseline.rs

use chrono::{DateTime, Utc};
use tracing::info;

use crate::errors::{GateError, Result};
use crate::model::Task;
use crate::store::{EntityStore, StoreExt};

/// Set a task's planning baseline. Baselines are write-once.
pub fn set_baseline<S: EntityStore + ?Sized>(
    store: &S,
    task_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Task> {
    if end < start {
        return Err(GateError::Validation(format!(
            "baseline for task '{task_id}' ends ({end}) before it starts ({start})"
        )));
    }

    let mut task = store.require::<Task>(task_id)?;
    if task.baseline_start.is_some() || task.baseline_end.is_some() {
        return Err(GateError::Validation(format!(
            "task '{task_id}' already has a baseline; baselines are immutable once set"
        )));
    }

    task.baseline_start = Some(start);
    task.baseline_end = Some(end);
    store.update_entity(&task)?;
    info!(task = %task_id, %start, %end, "baseline set");
    Ok(task)
}

/// Hours of float a task has consumed against its baseline start.
///
/// Started tasks measure from baseline start to actual start; unstarted ones
/// measure to `now` once the baseline start has passed. Never negative, and
/// zero without a baseline.
pub fn float_consumed_hours(task: &Task, now: DateTime<Utc>) -> f64 {
    let Some(baseline) = task.baseline_start else {
        return 0.0;
    };
    let reference = task.actual_start.unwrap_or(now);
    let minutes = (reference - baseline).num_minutes();
    if minutes <= 0 {
        0.0
    } else {
        minutes as f64 / 60.0
    }
}
