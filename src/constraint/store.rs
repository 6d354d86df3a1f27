// src/constraint/store.rs

//! Opening and clearing persisted constraints.
//!
//! Opening is idempotent: an open constraint with the same scope, type and
//! evidence is reused (and regraded if the severity changed). Clearing never
//! deletes; it stamps the time and the clearing actor.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{GateError, Result};
use crate::model::{Constraint, ConstraintScope, Task};
use crate::store::{EntityKind, EntityStore, StoreExt};
use crate::types::{ConstraintStatus, ConstraintType, Severity};

/// Actor recorded on constraints the engine clears itself.
pub const SYSTEM_ACTOR: &str = "readygate";

/// Request to open a constraint.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub project_id: String,
    pub scope: ConstraintScope,
    pub constraint_type: ConstraintType,
    /// Explicit grade. Defaults to the type's severity when `None`.
    pub severity: Option<Severity>,
    pub evidence_links: BTreeSet<String>,
    pub summary: String,
}

impl OpenRequest {
    pub fn new(
        project_id: impl Into<String>,
        scope: ConstraintScope,
        constraint_type: ConstraintType,
        evidence: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            scope,
            constraint_type,
            severity: None,
            evidence_links: BTreeSet::from([evidence.into()]),
            summary: String::new(),
        }
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }
}

/// Result of [`open_constraint`].
#[derive(Debug, Clone, PartialEq)]
pub enum OpenOutcome {
    Created(Constraint),
    /// An identical open constraint already existed; nothing was written.
    AlreadyOpen(Constraint),
    /// An open constraint existed with a different severity and was regraded.
    Regraded(Constraint),
}

/// Request to clear every open constraint of a type carrying an evidence link.
#[derive(Debug, Clone)]
pub struct ClearRequest<'a> {
    pub project_id: &'a str,
    pub constraint_type: ConstraintType,
    pub evidence_link: &'a str,
    /// Restrict the clear to constraints scoped to this task.
    pub task_id: Option<&'a str>,
    pub actor: &'a str,
}

impl<'a> ClearRequest<'a> {
    pub fn new(
        project_id: &'a str,
        constraint_type: ConstraintType,
        evidence_link: &'a str,
    ) -> Self {
        Self {
            project_id,
            constraint_type,
            evidence_link,
            task_id: None,
            actor: SYSTEM_ACTOR,
        }
    }

    pub fn for_task(mut self, task_id: &'a str) -> Self {
        self.task_id = Some(task_id);
        self
    }
}

/// Result of [`clear_constraints`].
#[derive(Debug, Default)]
pub struct ClearOutcome {
    pub cleared: Vec<Constraint>,
    /// Matching constraints whose write failed. They are still open.
    pub failed: Vec<ClearFailure>,
}

#[derive(Debug)]
pub struct ClearFailure {
    pub constraint: Constraint,
    pub error: GateError,
}

pub fn open_constraint<S: EntityStore + ?Sized>(
    store: &S,
    request: OpenRequest,
    now: DateTime<Utc>,
) -> Result<OpenOutcome> {
    if request.project_id.trim().is_empty() {
        return Err(GateError::Validation(
            "constraint requires a project_id".to_string(),
        ));
    }
    if request.scope.is_empty() {
        return Err(GateError::Validation(
            "constraint requires a task_id or work_package_id".to_string(),
        ));
    }

    let severity = request
        .severity
        .unwrap_or_else(|| request.constraint_type.default_severity());

    let existing = filter_constraints(store, &request.project_id, |c| {
        c.is_open()
            && c.constraint_type == request.constraint_type
            && c.task_id == request.scope.task_id
            && c.work_package_id == request.scope.work_package_id
            && c.evidence_links == request.evidence_links
    })?;

    if let Some(mut current) = existing.into_iter().next() {
        if current.severity == severity {
            debug!(
                constraint = %current.id,
                kind = %current.constraint_type,
                "constraint already open; no-op"
            );
            return Ok(OpenOutcome::AlreadyOpen(current));
        }
        info!(
            constraint = %current.id,
            kind = %current.constraint_type,
            from = %current.severity,
            to = %severity,
            "regrading open constraint"
        );
        current.severity = severity;
        if !request.summary.is_empty() {
            current.summary = request.summary;
        }
        store.update_entity(&current)?;
        return Ok(OpenOutcome::Regraded(current));
    }

    let constraint = Constraint {
        id: Uuid::new_v4().to_string(),
        project_id: request.project_id,
        task_id: request.scope.task_id,
        work_package_id: request.scope.work_package_id,
        constraint_type: request.constraint_type,
        severity,
        status: ConstraintStatus::Open,
        evidence_links: request.evidence_links,
        summary: request.summary,
        created_at: now,
        cleared_at: None,
        cleared_by: None,
    };
    store.create_entity(&constraint)?;
    info!(
        constraint = %constraint.id,
        kind = %constraint.constraint_type,
        severity = %constraint.severity,
        task = ?constraint.task_id,
        work_package = ?constraint.work_package_id,
        "constraint opened"
    );
    Ok(OpenOutcome::Created(constraint))
}

/// Clear matching open constraints.
///
/// Each write stands alone: a failed write is recorded in the outcome and the
/// remaining matches are still cleared.
pub fn clear_constraints<S: EntityStore + ?Sized>(
    store: &S,
    request: ClearRequest<'_>,
    now: DateTime<Utc>,
) -> Result<ClearOutcome> {
    let matching = filter_constraints(store, request.project_id, |c| {
        c.is_open()
            && c.constraint_type == request.constraint_type
            && c.has_evidence(request.evidence_link)
            && request
                .task_id
                .is_none_or(|t| c.task_id.as_deref() == Some(t))
    })?;

    let mut outcome = ClearOutcome::default();
    for open in matching {
        let mut c = open.clone();
        c.status = ConstraintStatus::Cleared;
        c.cleared_at = Some(now);
        c.cleared_by = Some(request.actor.to_string());
        match store.update_entity(&c) {
            Ok(()) => {
                info!(
                    constraint = %c.id,
                    kind = %c.constraint_type,
                    evidence = %request.evidence_link,
                    actor = %request.actor,
                    "constraint cleared"
                );
                outcome.cleared.push(c);
            }
            Err(error) => {
                warn!(constraint = %open.id, error = %error, "failed to clear constraint");
                outcome.failed.push(ClearFailure {
                    constraint: open,
                    error,
                });
            }
        }
    }
    Ok(outcome)
}

/// Decode one stored constraint row.
///
/// The type is read through [`ConstraintType`]'s `FromStr`, so an unknown
/// type is a validation error naming the row and the type.
pub fn decode_constraint(mut value: Value) -> Result<Constraint> {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("<unknown>")
        .to_string();
    let invalid = |detail: String| GateError::Validation(format!("constraint {id}: {detail}"));

    if let Some(slot) = value.get_mut("constraint_type") {
        let kind = match slot.as_str() {
            Some(raw) => raw.parse::<ConstraintType>().map_err(&invalid)?,
            None => return Err(invalid(format!("constraint_type is not a string: {slot}"))),
        };
        *slot = Value::String(kind.as_str().to_string());
    }
    serde_json::from_value(value).map_err(|e| invalid(e.to_string()))
}

/// Constraints of a project matching `predicate`.
///
/// Rows that do not decode are logged and skipped.
pub fn filter_constraints<S: EntityStore + ?Sized>(
    store: &S,
    project_id: &str,
    predicate: impl Fn(&Constraint) -> bool,
) -> Result<Vec<Constraint>> {
    let mut matching = Vec::new();
    for value in store.list(EntityKind::Constraint, project_id)? {
        match decode_constraint(value) {
            Ok(c) if predicate(&c) => matching.push(c),
            Ok(_) => {}
            Err(err) => {
                warn!(project = %project_id, error = %err, "skipping undecodable constraint")
            }
        }
    }
    Ok(matching)
}

/// Open constraints scoped to `task`, directly or through its work package.
///
/// An undecodable row that is open and scoped to `task` fails the call, since
/// the task cannot be graded without it. Rows scoped elsewhere are skipped.
pub fn open_constraints_for<S: EntityStore + ?Sized>(
    store: &S,
    task: &Task,
) -> Result<Vec<Constraint>> {
    let mut open = Vec::new();
    for value in store.list(EntityKind::Constraint, &task.project_id)? {
        let gates = row_gates(&value, task);
        match decode_constraint(value) {
            Ok(c) => {
                if c.is_open() && c.applies_to(task) {
                    open.push(c);
                }
            }
            Err(err) if gates => return Err(err),
            Err(err) => debug!(task = %task.id, error = %err, "skipping undecodable constraint"),
        }
    }
    Ok(open)
}

/// Whether a raw row is open (or of unreadable status) and scoped to `task`.
fn row_gates(value: &Value, task: &Task) -> bool {
    let cleared = value
        .get("status")
        .and_then(|s| ConstraintStatus::deserialize(s).ok())
        .is_some_and(|s| s != ConstraintStatus::Open);
    !cleared && ConstraintScope::deserialize(value).is_ok_and(|scope| scope.applies_to(task))
}
