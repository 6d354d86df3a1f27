// src/readiness/evaluator.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::constraint::rules::{
    delivery_condition, drawing_condition, hold_condition, predecessor_condition, rfi_condition,
};
use crate::constraint::{open_constraints_for, Condition};
use crate::errors::Result;
use crate::model::{Delivery, DrawingSet, ReadinessRecord, Rfi, Task};
use crate::store::{EntityStore, StoreExt};
use crate::types::{ConstraintType, ReadinessStatus, Severity};

/// Evaluate an erection task and overwrite its [`ReadinessRecord`].
///
/// Returns `None` for any other task type: those are never evaluated and
/// callers treat them as ready. The task itself is never modified.
pub fn evaluate_task<S: EntityStore + ?Sized>(
    store: &S,
    task: &Task,
    now: DateTime<Utc>,
) -> Result<Option<ReadinessRecord>> {
    if !task.is_erection() {
        debug!(
            task = %task.id,
            task_type = ?task.task_type,
            "not an erection task; skipping evaluation"
        );
        return Ok(None);
    }

    let record = assess_task(store, task, now)?;
    store.upsert_entity(&record)?;
    debug!(
        task = %task.id,
        readiness = %record.readiness_status,
        blockers = record.blocker_count,
        warnings = record.warning_count,
        "readiness record written"
    );
    Ok(Some(record))
}

/// Compute a task's readiness without writing anything.
pub fn assess_task<S: EntityStore + ?Sized>(
    store: &S,
    task: &Task,
    now: DateTime<Utc>,
) -> Result<ReadinessRecord> {
    let conditions = gather_conditions(store, task)?;

    let blocker_count = conditions.iter().filter(|c| c.is_blocker()).count();
    let warning_count = conditions.len() - blocker_count;

    Ok(ReadinessRecord {
        task_id: task.id.clone(),
        project_id: task.project_id.clone(),
        work_package_id: task.work_package_id.clone(),
        readiness_status: ReadinessStatus::from_counts(blocker_count, warning_count),
        blocker_count,
        warning_count,
        drivers: conditions.iter().map(Condition::driver).collect(),
        evaluated_at: now,
    })
}

/// Every open condition bearing on `task`, merged and in driver order.
///
/// Sources:
/// - open constraints scoped to the task or its work package,
/// - unreleased linked drawing sets,
/// - RFIs linked to the task that still await a response,
/// - pending deliveries for the task's package or that the task is gated on,
/// - an area hold on the task,
/// - predecessors that have not completed.
///
/// A persisted constraint and an implicit condition with the same type and
/// evidence count once, at the more severe grade. Linked records that cannot
/// be found contribute nothing.
pub fn gather_conditions<S: EntityStore + ?Sized>(
    store: &S,
    task: &Task,
) -> Result<Vec<Condition>> {
    let mut merged: BTreeMap<(ConstraintType, String), Condition> = BTreeMap::new();
    let mut add = |condition: Condition| {
        let key = (condition.constraint_type, condition.evidence.clone());
        match merged.get_mut(&key) {
            Some(existing) => {
                if condition.severity == Severity::Blocker {
                    existing.severity = Severity::Blocker;
                }
            }
            None => {
                merged.insert(key, condition);
            }
        }
    };

    for constraint in open_constraints_for(store, task)? {
        add(Condition::from_constraint(&constraint));
    }

    for set_id in task.drawing_set_ids.iter() {
        match store.find::<DrawingSet>(set_id)? {
            Some(set) => {
                if let Some(c) = drawing_condition(&set) {
                    add(c);
                }
            }
            None => warn!(
                task = %task.id,
                drawing_set = %set_id,
                "linked drawing set not found; ignoring"
            ),
        }
    }

    let rfis = store.filter::<Rfi>(&task.project_id, |r| r.linked_task_ids.contains(&task.id))?;
    for rfi in rfis.iter() {
        if let Some(c) = rfi_condition(rfi) {
            add(c);
        }
    }

    if let Some(wp) = task.work_package_id.as_deref() {
        let deliveries = store.filter::<Delivery>(&task.project_id, |d| {
            d.work_package_id.as_deref() == Some(wp)
        })?;
        for delivery in deliveries.iter() {
            let gated = task.gating_delivery_ids.contains(&delivery.id);
            if let Some(c) = delivery_condition(delivery, gated) {
                add(c);
            }
        }
    }
    for delivery_id in task.gating_delivery_ids.iter() {
        match store.find::<Delivery>(delivery_id)? {
            Some(delivery) => {
                if let Some(c) = delivery_condition(&delivery, true) {
                    add(c);
                }
            }
            None => warn!(
                task = %task.id,
                delivery = %delivery_id,
                "gating delivery not found; ignoring"
            ),
        }
    }

    if let Some(c) = hold_condition(task) {
        add(c);
    }

    for pred_id in task.predecessor_ids.iter() {
        match store.find::<Task>(pred_id)? {
            Some(pred) => {
                if let Some(c) = predecessor_condition(&pred) {
                    add(c);
                }
            }
            None => warn!(
                task = %task.id,
                predecessor = %pred_id,
                "predecessor not found; ignoring"
            ),
        }
    }

    let mut conditions: Vec<Condition> = merged.into_values().collect();
    conditions.sort_by(Condition::display_order);
    Ok(conditions)
}
