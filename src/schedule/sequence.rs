// src/schedule/sequence.rs

use tracing::{info, warn};

use crate::errors::{GateError, Result};
use crate::model::Task;
use crate::schedule::BatchReport;
use crate::store::{EntityStore, StoreExt};

/// Compute the new sequence numbers for a shift of `delta` applied to every
/// task with `install_sequence_number >= threshold`.
///
/// Returns `(task_id, new_number)` pairs for the shifted tasks. A shift that
/// would land a task on or below an unshifted number is rejected, so ordering
/// and uniqueness survive and `+d` followed by `-d` is the identity.
pub fn plan_shift(tasks: &[Task], threshold: i64, delta: i64) -> Result<Vec<(String, i64)>> {
    let moved: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.install_sequence_number >= threshold)
        .collect();

    if delta < 0 {
        let lowest_moved = moved.iter().map(|t| t.install_sequence_number).min();
        let highest_fixed = tasks
            .iter()
            .filter(|t| t.install_sequence_number < threshold)
            .map(|t| t.install_sequence_number)
            .max();
        if let (Some(low), Some(high)) = (lowest_moved, highest_fixed) {
            let landed = low.checked_add(delta).ok_or_else(|| {
                GateError::Validation(format!("sequence shift by {delta} overflows"))
            })?;
            if landed <= high {
                return Err(GateError::Validation(format!(
                    "shifting by {delta} from {threshold} would move sequence {low} to {landed}, \
                     colliding with unshifted sequence {high}"
                )));
            }
        }
    }

    moved
        .into_iter()
        .map(|t| {
            t.install_sequence_number
                .checked_add(delta)
                .map(|n| (t.id.clone(), n))
                .ok_or_else(|| {
                    GateError::Validation(format!("sequence shift by {delta} overflows"))
                })
        })
        .collect()
}

/// Shift install sequence numbers by `delta` from `threshold` upwards.
///
/// The shift is planned and validated before any write; the writes
/// themselves are independent.
pub fn push_sequence<S: EntityStore + ?Sized>(
    store: &S,
    project_id: &str,
    threshold: i64,
    delta: i64,
) -> Result<BatchReport> {
    if project_id.trim().is_empty() {
        return Err(GateError::Validation("project id is required".to_string()));
    }

    let mut report = BatchReport::default();
    if delta == 0 {
        return Ok(report);
    }

    let tasks = store.all::<Task>(project_id)?;
    let plan = plan_shift(&tasks, threshold, delta)?;

    for (task_id, new_number) in plan {
        let Some(mut task) = tasks.iter().find(|t| t.id == task_id).cloned() else {
            continue;
        };
        task.install_sequence_number = new_number;
        match store.update_entity(&task) {
            Ok(()) => report.record_success(&task.id),
            Err(e) => {
                warn!(task = %task.id, error = %e, "failed to shift sequence number");
                report.record_failure(&task.id, e.to_string());
            }
        }
    }

    info!(
        project = %project_id,
        threshold,
        delta,
        succeeded = report.succeeded,
        failed = report.failed.len(),
        "sequence shift applied"
    );
    Ok(report)
}
