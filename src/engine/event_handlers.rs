// src/engine/event_handlers.rs

//! Constraint derivation for upstream mutations (cascade step 1).
//!
//! Every handler reads the notified record back from the store and works
//! from its current state, so replays and out-of-order notifications
//! converge. The after-image is only used when the store no longer has the
//! record.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::constraint::rules::{
    delivery_condition, drawing_condition, hold_condition, predecessor_condition, rfi_condition,
};
use crate::constraint::{
    clear_constraints, filter_constraints, open_constraint, ClearOutcome, ClearRequest, Condition,
    OpenOutcome, OpenRequest,
};
use crate::engine::cascade::CascadeFailure;
use crate::engine::{EventKind, MutationNotification};
use crate::errors::{GateError, Result};
use crate::model::{
    Constraint, ConstraintScope, Delivery, DrawingRevision, DrawingSet, Rfi, Task,
};
use crate::store::{Entity, EntityKind, EntityStore, StoreExt};
use crate::types::{ConstraintType, Severity, TaskStatus};

/// What step 1 of a cascade changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Derivation {
    pub opened: usize,
    pub cleared: usize,
    /// Tasks moved to `blocked` by a blocker RFI.
    pub blocked: Vec<String>,
    /// Tasks moved out of `blocked` / `on_hold` by an RFI resolving.
    pub unblocked: Vec<String>,
    pub failures: Vec<CascadeFailure>,
}

impl Derivation {
    fn fail(&mut self, kind: EntityKind, id: &str, err: &GateError) {
        warn!(%kind, id, error = %err, "constraint derivation failed");
        self.failures.push(CascadeFailure::new(kind, id, err.to_string()));
    }
}

/// Notified record as the handlers see it.
struct Observed<T> {
    record: T,
    /// False once the record has been deleted.
    live: bool,
}

fn observe<S: EntityStore + ?Sized, T: Entity>(
    store: &S,
    kind: EventKind,
    id: &str,
    data: &Value,
) -> Result<Option<Observed<T>>> {
    let stored = store.find::<T>(id)?;
    let live = kind != EventKind::Delete;
    match stored {
        Some(record) => Ok(Some(Observed { record, live })),
        None => match serde_json::from_value::<T>(data.clone()) {
            Ok(record) => {
                debug!(kind = %T::KIND, id, "record not in store; using after-image");
                Ok(Some(Observed { record, live }))
            }
            Err(err) => {
                debug!(kind = %T::KIND, id, error = %err, "no usable record or after-image");
                Ok(None)
            }
        },
    }
}

/// Derive or clear the constraints implied by one notification.
pub fn derive_constraints<S: EntityStore + ?Sized>(
    store: &S,
    project_id: &str,
    kind: EntityKind,
    notification: &MutationNotification,
    now: DateTime<Utc>,
) -> Result<Derivation> {
    let event = notification.event.kind;
    let id = notification.event.entity_id.as_str();
    let data = &notification.data;
    let mut out = Derivation::default();

    match kind {
        EntityKind::Rfi => {
            if let Some(seen) = observe::<S, Rfi>(store, event, id, data)? {
                sync_rfi(store, project_id, &seen.record, seen.live, &mut out, now)?;
            }
        }
        EntityKind::DrawingSet => {
            let current = observe::<S, DrawingSet>(store, event, id, data)?
                .filter(|seen| seen.live)
                .map(|seen| seen.record);
            sync_drawing_set(store, project_id, id, current.as_ref(), &mut out, now)?;
        }
        EntityKind::DrawingRevision => {
            if let Some(seen) = observe::<S, DrawingRevision>(store, event, id, data)? {
                let set_id = seen.record.drawing_set_id.as_str();
                let set = store.find::<DrawingSet>(set_id)?;
                sync_drawing_set(store, project_id, set_id, set.as_ref(), &mut out, now)?;
            }
        }
        EntityKind::Delivery => {
            let current = observe::<S, Delivery>(store, event, id, data)?
                .filter(|seen| seen.live)
                .map(|seen| seen.record);
            sync_delivery(store, project_id, id, current.as_ref(), &mut out, now)?;
        }
        EntityKind::Task => {
            let current = observe::<S, Task>(store, event, id, data)?
                .filter(|seen| seen.live)
                .map(|seen| seen.record);
            sync_task(store, project_id, id, current.as_ref(), &mut out, now)?;
        }
        EntityKind::Project | EntityKind::WorkPackage | EntityKind::Constraint => {
            debug!(%kind, id, "no derivation for this entity; recompute only");
        }
        EntityKind::ReadinessRecord
        | EntityKind::WorkPackageReadiness
        | EntityKind::ExecutionPermission => {
            debug!(%kind, id, "derived row; nothing to derive");
        }
    }

    Ok(out)
}

fn request_for(project_id: &str, scope: ConstraintScope, condition: &Condition) -> OpenRequest {
    OpenRequest::new(
        project_id,
        scope,
        condition.constraint_type,
        condition.evidence.clone(),
    )
    .severity(condition.severity)
    .summary(condition.summary.clone())
}

fn open<S: EntityStore + ?Sized>(
    store: &S,
    out: &mut Derivation,
    request: OpenRequest,
    now: DateTime<Utc>,
) {
    let target = request
        .scope
        .task_id
        .clone()
        .or_else(|| request.scope.work_package_id.clone())
        .unwrap_or_default();
    match open_constraint(store, request, now) {
        Ok(OpenOutcome::Created(_)) => out.opened += 1,
        Ok(_) => {}
        Err(err) => out.fail(EntityKind::Constraint, &target, &err),
    }
}

fn clear<S: EntityStore + ?Sized>(
    store: &S,
    out: &mut Derivation,
    request: ClearRequest<'_>,
    now: DateTime<Utc>,
) -> ClearOutcome {
    let evidence = request.evidence_link.to_string();
    match clear_constraints(store, request, now) {
        Ok(outcome) => {
            out.cleared += outcome.cleared.len();
            for failure in outcome.failed.iter() {
                out.fail(EntityKind::Constraint, &failure.constraint.id, &failure.error);
            }
            outcome
        }
        Err(err) => {
            out.fail(EntityKind::Constraint, &evidence, &err);
            ClearOutcome::default()
        }
    }
}

/// Tasks whose constraint is still open because its clear failed.
fn still_open_tasks(outcome: &ClearOutcome) -> BTreeSet<String> {
    outcome
        .failed
        .iter()
        .filter_map(|f| f.constraint.task_id.clone())
        .collect()
}

/// RFI: open constraints on linked tasks while a response is owed, clear and
/// unblock once it is answered, closed or deleted.
pub fn sync_rfi<S: EntityStore + ?Sized>(
    store: &S,
    project_id: &str,
    rfi: &Rfi,
    live: bool,
    out: &mut Derivation,
    now: DateTime<Utc>,
) -> Result<()> {
    let condition = if live { rfi_condition(rfi) } else { None };

    let Some(condition) = condition else {
        let outcome = clear(
            store,
            out,
            ClearRequest::new(project_id, ConstraintType::RfiResponseRequired, &rfi.id),
            now,
        );
        if !live || rfi.status.is_resolved() {
            let still_open = still_open_tasks(&outcome);
            let mut candidates = rfi.linked_task_ids.clone();
            candidates.extend(outcome.cleared.into_iter().filter_map(|c| c.task_id));
            candidates.retain(|t| !still_open.contains(t));
            unblock_tasks(store, project_id, &rfi.id, &candidates, out)?;
        }
        return Ok(());
    };

    for task_id in rfi.linked_task_ids.iter() {
        let Some(mut task) = store.find::<Task>(task_id)? else {
            warn!(rfi = %rfi.id, task = %task_id, "linked task not found; ignoring");
            continue;
        };
        open(store, out, request_for(project_id, ConstraintScope::task(task_id), &condition), now);

        if condition.is_blocker()
            && matches!(task.status, TaskStatus::NotStarted | TaskStatus::InProgress)
        {
            let from = task.status;
            task.status = TaskStatus::Blocked;
            match store.update_entity(&task) {
                Ok(()) => {
                    info!(task = %task.id, %from, rfi = %rfi.id, "task blocked by open RFI");
                    out.blocked.push(task.id.clone());
                }
                Err(err) => out.fail(EntityKind::Task, &task.id, &err),
            }
        }
    }

    // Tasks unlinked from the RFI since their constraint was opened.
    let stale = filter_constraints(store, project_id, |c| {
        c.is_open()
            && c.constraint_type == ConstraintType::RfiResponseRequired
            && c.has_evidence(&rfi.id)
            && c
                .task_id
                .as_ref()
                .is_some_and(|t| !rfi.linked_task_ids.contains(t))
    })?;
    for c in stale.iter() {
        if let Some(task_id) = c.task_id.as_deref() {
            let request =
                ClearRequest::new(project_id, ConstraintType::RfiResponseRequired, &rfi.id)
                    .for_task(task_id);
            clear(store, out, request, now);
        }
    }
    Ok(())
}

/// Move `blocked` / `on_hold` tasks back to their resume status once nothing
/// else holds them: not in a held area and no other blocker RFI outstanding.
fn unblock_tasks<S: EntityStore + ?Sized>(
    store: &S,
    project_id: &str,
    rfi_id: &str,
    candidates: &BTreeSet<String>,
    out: &mut Derivation,
) -> Result<()> {
    for task_id in candidates.iter() {
        let Some(mut task) = store.find::<Task>(task_id)? else {
            continue;
        };
        if !matches!(task.status, TaskStatus::Blocked | TaskStatus::OnHold) {
            continue;
        }
        if task.hold_area {
            debug!(task = %task.id, "task still in a held area; leaving on hold");
            continue;
        }

        let other_constraints = filter_constraints(store, project_id, |c| {
            c.is_open()
                && c.constraint_type == ConstraintType::RfiResponseRequired
                && c.severity == Severity::Blocker
                && !c.has_evidence(rfi_id)
                && c.applies_to(&task)
        })?;
        let other_rfis = store.filter::<Rfi>(project_id, |r| {
            r.id != rfi_id
                && r.is_blocker
                && r.status.awaiting_response()
                && r.linked_task_ids.contains(&task.id)
        })?;
        if !other_constraints.is_empty() || !other_rfis.is_empty() {
            debug!(task = %task.id, "task still blocked by another RFI");
            continue;
        }

        let from = task.status;
        task.status = task.resume_status();
        match store.update_entity(&task) {
            Ok(()) => {
                info!(task = %task.id, %from, to = %task.status, rfi = %rfi_id, "task unblocked");
                out.unblocked.push(task.id.clone());
            }
            Err(err) => out.fail(EntityKind::Task, &task.id, &err),
        }
    }
    Ok(())
}

/// Drawing set: one DRAWING_NOT_RELEASED per linked task while unreleased.
fn sync_drawing_set<S: EntityStore + ?Sized>(
    store: &S,
    project_id: &str,
    set_id: &str,
    set: Option<&DrawingSet>,
    out: &mut Derivation,
    now: DateTime<Utc>,
) -> Result<()> {
    match set.and_then(drawing_condition) {
        Some(condition) => {
            let linked = store.filter::<Task>(project_id, |t| t.drawing_set_ids.contains(set_id))?;
            for task in linked.iter() {
                open(
                    store,
                    out,
                    request_for(project_id, ConstraintScope::task(&task.id), &condition),
                    now,
                );
            }
        }
        None => {
            clear(
                store,
                out,
                ClearRequest::new(project_id, ConstraintType::DrawingNotReleased, set_id),
                now,
            );
        }
    }
    Ok(())
}

/// Delivery: a package-level warning while pending, plus a blocker on every
/// task gated on it.
fn sync_delivery<S: EntityStore + ?Sized>(
    store: &S,
    project_id: &str,
    delivery_id: &str,
    delivery: Option<&Delivery>,
    out: &mut Derivation,
    now: DateTime<Utc>,
) -> Result<()> {
    let Some(delivery) = delivery.filter(|d| d.is_pending()) else {
        clear(
            store,
            out,
            ClearRequest::new(project_id, ConstraintType::DeliveryPending, delivery_id),
            now,
        );
        return Ok(());
    };

    if let (Some(wp), Some(condition)) = (
        delivery.work_package_id.as_deref(),
        delivery_condition(delivery, false),
    ) {
        open(store, out, request_for(project_id, ConstraintScope::package(wp), &condition), now);
    }

    let gated = store.filter::<Task>(project_id, |t| t.gating_delivery_ids.contains(delivery_id))?;
    if let Some(condition) = delivery_condition(delivery, true) {
        for task in gated.iter() {
            open(
                store,
                out,
                request_for(project_id, ConstraintScope::task(&task.id), &condition),
                now,
            );
        }
    }
    Ok(())
}

/// Task: its own hold, predecessor and drawing links, and the predecessor
/// constraints it imposes on its successors.
fn sync_task<S: EntityStore + ?Sized>(
    store: &S,
    project_id: &str,
    task_id: &str,
    task: Option<&Task>,
    out: &mut Derivation,
    now: DateTime<Utc>,
) -> Result<()> {
    let Some(task) = task else {
        clear(store, out, ClearRequest::new(project_id, ConstraintType::AreaHold, task_id), now);
        clear(
            store,
            out,
            ClearRequest::new(project_id, ConstraintType::PredecessorIncomplete, task_id),
            now,
        );
        return Ok(());
    };

    match hold_condition(task) {
        Some(condition) => open(
            store,
            out,
            request_for(project_id, ConstraintScope::task(task_id), &condition),
            now,
        ),
        None => {
            clear(
                store,
                out,
                ClearRequest::new(project_id, ConstraintType::AreaHold, task_id).for_task(task_id),
                now,
            );
        }
    }

    for pred_id in task.predecessor_ids.iter() {
        match store.find::<Task>(pred_id)?.as_ref().and_then(predecessor_condition) {
            Some(condition) => {
                open(
                    store,
                    out,
                    request_for(project_id, ConstraintScope::task(task_id), &condition),
                    now,
                )
            }
            None => {
                clear(
                    store,
                    out,
                    ClearRequest::new(project_id, ConstraintType::PredecessorIncomplete, pred_id)
                        .for_task(task_id),
                    now,
                );
            }
        }
    }

    for set_id in task.drawing_set_ids.iter() {
        let set = store.find::<DrawingSet>(set_id)?;
        if let Some(condition) = set.as_ref().and_then(drawing_condition) {
            open(
                store,
                out,
                request_for(project_id, ConstraintScope::task(task_id), &condition),
                now,
            );
        }
    }

    // Links removed from the task since the constraints were opened.
    let own = filter_constraints(store, project_id, |c| {
        c.is_open() && c.task_id.as_deref() == Some(task_id)
    })?;
    for c in own.iter() {
        let still_linked: &BTreeSet<String> = match c.constraint_type {
            ConstraintType::PredecessorIncomplete => &task.predecessor_ids,
            ConstraintType::DrawingNotReleased => &task.drawing_set_ids,
            _ => continue,
        };
        let unlinked = c.evidence_links.iter().find(|link| !still_linked.contains(*link));
        if let Some(link) = unlinked {
            let request = ClearRequest::new(project_id, c.constraint_type, link).for_task(task_id);
            clear(store, out, request, now);
        }
    }

    let successors = store.filter::<Task>(project_id, |t| t.predecessor_ids.contains(task_id))?;
    match predecessor_condition(task) {
        Some(condition) => {
            for successor in successors.iter() {
                open(
                    store,
                    out,
                    request_for(project_id, ConstraintScope::task(&successor.id), &condition),
                    now,
                );
            }
        }
        None => {
            clear(
                store,
                out,
                ClearRequest::new(project_id, ConstraintType::PredecessorIncomplete, task_id),
                now,
            );
        }
    }
    Ok(())
}

/// Clear persisted constraints whose originating condition has resolved
/// without a notification reaching the engine.
///
/// Engineer reviews and `OTHER` constraints are raised by people and only
/// cleared by people.
pub fn reconcile_constraints<S: EntityStore + ?Sized>(
    store: &S,
    project_id: &str,
    now: DateTime<Utc>,
) -> Result<Derivation> {
    let mut out = Derivation::default();
    let mut resolved_rfis: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut stuck_tasks: BTreeSet<String> = BTreeSet::new();

    let open_constraints = filter_constraints(store, project_id, Constraint::is_open)?;
    for c in open_constraints.iter() {
        let mut resolved = None;
        for link in c.evidence_links.iter() {
            if !still_holds(store, c, link)? {
                resolved = Some(link);
                break;
            }
        }
        let Some(link) = resolved else {
            continue;
        };

        debug!(
            constraint = %c.id,
            kind = %c.constraint_type,
            evidence = %link,
            "originating condition resolved"
        );
        let request = ClearRequest::new(project_id, c.constraint_type, link);
        let request = match c.task_id.as_deref() {
            Some(task_id) => request.for_task(task_id),
            None => request,
        };
        let outcome = clear(store, &mut out, request, now);

        if c.constraint_type == ConstraintType::RfiResponseRequired {
            stuck_tasks.extend(still_open_tasks(&outcome));
            resolved_rfis
                .entry(link.clone())
                .or_default()
                .extend(outcome.cleared.into_iter().filter_map(|c| c.task_id));
        }
    }

    for (rfi_id, mut candidates) in resolved_rfis {
        let rfi = store.find::<Rfi>(&rfi_id)?;
        match rfi {
            Some(rfi) if !rfi.status.is_resolved() => continue,
            Some(rfi) => candidates.extend(rfi.linked_task_ids),
            None => {}
        }
        candidates.retain(|t| !stuck_tasks.contains(t));
        unblock_tasks(store, project_id, &rfi_id, &candidates, &mut out)?;
    }

    if out.cleared > 0 {
        info!(project = %project_id, cleared = out.cleared, "reconciled stale constraints");
    }
    Ok(out)
}

fn still_holds<S: EntityStore + ?Sized>(store: &S, c: &Constraint, link: &str) -> Result<bool> {
    match c.constraint_type {
        ConstraintType::RfiResponseRequired => {
            Ok(store.find::<Rfi>(link)?.is_some_and(|r| r.status.awaiting_response()))
        }
        ConstraintType::DrawingNotReleased => {
            Ok(store.find::<DrawingSet>(link)?.is_some_and(|s| !s.is_released()))
        }
        ConstraintType::DeliveryPending => {
            Ok(store.find::<Delivery>(link)?.is_some_and(|d| d.is_pending()))
        }
        ConstraintType::AreaHold => Ok(store.find::<Task>(link)?.is_some_and(|t| t.hold_area)),
        ConstraintType::PredecessorIncomplete => {
            let incomplete = store
                .find::<Task>(link)?
                .is_some_and(|p| p.status != TaskStatus::Completed);
            let linked = match c.task_id.as_deref() {
                Some(task_id) => store
                    .find::<Task>(task_id)?
                    .is_some_and(|t| t.predecessor_ids.contains(link)),
                None => true,
            };
            Ok(incomplete && linked)
        }
        ConstraintType::EngineerReviewRequired | ConstraintType::Other => Ok(true),
    }
}
