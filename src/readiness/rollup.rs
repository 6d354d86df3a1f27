// src/readiness/rollup.rs

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::errors::Result;
use crate::model::{ReadinessRecord, Task, WorkPackage, WorkPackageReadiness};
use crate::readiness::evaluator::evaluate_task;
use crate::store::{EntityStore, StoreExt};
use crate::types::ReadinessStatus;

/// Result of folding child readiness records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollupTotals {
    pub status: ReadinessStatus,
    pub blockers: usize,
    pub warnings: usize,
    pub children: usize,
}

/// Fold child records with NOT_READY > READY_WITH_WARNINGS > READY.
///
/// No children means trivially READY. Counts are plain sums: a package
/// constraint seen by three children counts three times.
pub fn fold_readiness<'a>(records: impl IntoIterator<Item = &'a ReadinessRecord>) -> RollupTotals {
    records.into_iter().fold(
        RollupTotals {
            status: ReadinessStatus::Ready,
            blockers: 0,
            warnings: 0,
            children: 0,
        },
        |acc, r| RollupTotals {
            status: acc.status.dominant(r.readiness_status),
            blockers: acc.blockers + r.blocker_count,
            warnings: acc.warnings + r.warning_count,
            children: acc.children + 1,
        },
    )
}

/// Recompute and overwrite a package's [`WorkPackageReadiness`].
///
/// Uses the cached record of each erection task in the package; a task with
/// no record yet is evaluated on the spot.
pub fn rollup_package<S: EntityStore + ?Sized>(
    store: &S,
    package: &WorkPackage,
    now: DateTime<Utc>,
) -> Result<WorkPackageReadiness> {
    let tasks = store.filter::<Task>(&package.project_id, |t| {
        t.is_erection() && t.work_package_id.as_deref() == Some(package.id.as_str())
    })?;

    let mut records = Vec::with_capacity(tasks.len());
    for task in tasks.iter() {
        match store.find::<ReadinessRecord>(&task.id)? {
            Some(record) => records.push(record),
            None => {
                debug!(task = %task.id, "no readiness record yet; evaluating before rollup");
                if let Some(record) = evaluate_task(store, task, now)? {
                    records.push(record);
                }
            }
        }
    }

    let totals = fold_readiness(records.iter());
    let rollup = WorkPackageReadiness {
        work_package_id: package.id.clone(),
        project_id: package.project_id.clone(),
        lookahead_ready: totals.status,
        lookahead_blockers: totals.blockers,
        lookahead_warnings: totals.warnings,
        task_count: totals.children,
        evaluated_at: now,
    };
    store.upsert_entity(&rollup)?;

    info!(
        work_package = %package.id,
        readiness = %rollup.lookahead_ready,
        blockers = rollup.lookahead_blockers,
        warnings = rollup.lookahead_warnings,
        tasks = rollup.task_count,
        "work package rolled up"
    );
    Ok(rollup)
}
