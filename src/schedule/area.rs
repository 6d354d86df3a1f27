// src/schedule/area.rs

use tracing::{info, warn};

use crate::errors::{GateError, Result};
use crate::model::Task;
use crate::schedule::BatchReport;
use crate::store::{EntityStore, StoreExt};
use crate::types::TaskStatus;

/// Place every task in `area` on hold.
///
/// Sets `hold_area` and `hold_reason` on each task and moves the non-terminal
/// ones to `on_hold`. Completed and cancelled tasks keep their status.
pub fn hold_area<S: EntityStore + ?Sized>(
    store: &S,
    project_id: &str,
    area: &str,
    reason: Option<&str>,
) -> Result<BatchReport> {
    let tasks = tasks_in_area(store, project_id, area)?;
    let mut report = BatchReport::default();

    for mut task in tasks {
        task.hold_area = true;
        task.hold_reason = reason.map(str::to_string);
        if !task.status.is_terminal() {
            task.status = TaskStatus::OnHold;
        }
        match store.update_entity(&task) {
            Ok(()) => report.record_success(&task.id),
            Err(e) => {
                warn!(task = %task.id, error = %e, "failed to hold task");
                report.record_failure(&task.id, e.to_string());
            }
        }
    }

    info!(
        project = %project_id,
        area = %area,
        succeeded = report.succeeded,
        failed = report.failed.len(),
        "area hold applied"
    );
    Ok(report)
}

/// Lift the hold flag on every task in `area`.
///
/// Only `hold_area` and `hold_reason` change; statuses are left as they are.
pub fn release_area<S: EntityStore + ?Sized>(
    store: &S,
    project_id: &str,
    area: &str,
) -> Result<BatchReport> {
    let tasks = tasks_in_area(store, project_id, area)?;
    let mut report = BatchReport::default();

    for mut task in tasks {
        task.hold_area = false;
        task.hold_reason = None;
        match store.update_entity(&task) {
            Ok(()) => report.record_success(&task.id),
            Err(e) => {
                warn!(task = %task.id, error = %e, "failed to release task");
                report.record_failure(&task.id, e.to_string());
            }
        }
    }

    info!(
        project = %project_id,
        area = %area,
        succeeded = report.succeeded,
        failed = report.failed.len(),
        "area hold released"
    );
    Ok(report)
}

fn tasks_in_area<S: EntityStore + ?Sized>(
    store: &S,
    project_id: &str,
    area: &str,
) -> Result<Vec<Task>> {
    if project_id.trim().is_empty() {
        return Err(GateError::Validation("project id is required".to_string()));
    }
    if area.trim().is_empty() {
        return Err(GateError::Validation("erection area is required".to_string()));
    }
    store.filter::<Task>(project_id, |t| t.in_area(area))
}
