// src/constraint/rules.rs

use std::cmp::Ordering;

use serde::Serialize;

use crate::model::{Constraint, Delivery, DrawingSet, Rfi, Task};
use crate::types::{ConstraintType, Severity, TaskStatus};

/// A graded condition contributing to a readiness verdict.
///
/// `evidence` is the id of the originating record (or a comma-joined list for
/// persisted constraints with several links).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Condition {
    pub constraint_type: ConstraintType,
    pub severity: Severity,
    pub evidence: String,
    pub summary: String,
}

impl Condition {
    pub fn new(
        constraint_type: ConstraintType,
        severity: Severity,
        evidence: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            constraint_type,
            severity,
            evidence: evidence.into(),
            summary: summary.into(),
        }
    }

    pub fn from_constraint(c: &Constraint) -> Self {
        let summary = if c.summary.is_empty() {
            c.constraint_type.as_str().to_lowercase().replace('_', " ")
        } else {
            c.summary.clone()
        };
        Self::new(c.constraint_type, c.severity, c.evidence_key(), summary)
    }

    pub fn is_blocker(&self) -> bool {
        self.severity == Severity::Blocker
    }

    /// Driver line, e.g.
    /// `RFI_RESPONSE_REQUIRED [BLOCKER] RFI #12 awaiting response (rfi-12)`.
    pub fn driver(&self) -> String {
        if self.evidence.is_empty() {
            format!("{} [{}] {}", self.constraint_type, self.severity, self.summary)
        } else {
            format!(
                "{} [{}] {} ({})",
                self.constraint_type, self.severity, self.summary, self.evidence
            )
        }
    }

    /// Drivers are listed blockers first, then by type and evidence.
    pub fn display_order(a: &Condition, b: &Condition) -> Ordering {
        a.severity
            .cmp(&b.severity)
            .then(a.constraint_type.cmp(&b.constraint_type))
            .then(a.evidence.cmp(&b.evidence))
    }
}

/// An RFI still awaiting a response. Blocker RFIs block; others warn.
pub fn rfi_condition(rfi: &Rfi) -> Option<Condition> {
    if !rfi.status.awaiting_response() {
        return None;
    }
    let severity = if rfi.is_blocker {
        Severity::Blocker
    } else {
        Severity::Warning
    };
    let summary = if rfi.subject.is_empty() {
        format!("{} awaiting response", rfi.label())
    } else {
        format!("{} awaiting response: {}", rfi.label(), rfi.subject)
    };
    Some(Condition::new(
        ConstraintType::RfiResponseRequired,
        severity,
        rfi.id.clone(),
        summary,
    ))
}

/// A linked drawing set that has not been released.
pub fn drawing_condition(set: &DrawingSet) -> Option<Condition> {
    if set.is_released() {
        return None;
    }
    let name = if set.name.is_empty() { &set.id } else { &set.name };
    Some(Condition::new(
        ConstraintType::DrawingNotReleased,
        ConstraintType::DrawingNotReleased.default_severity(),
        set.id.clone(),
        format!("drawing set {name} not released ({})", set.status),
    ))
}

/// A delivery that has not arrived. Blocks when the task is gated on it.
pub fn delivery_condition(delivery: &Delivery, gated: bool) -> Option<Condition> {
    if !delivery.is_pending() {
        return None;
    }
    let severity = if gated {
        Severity::Blocker
    } else {
        ConstraintType::DeliveryPending.default_severity()
    };
    let what = if delivery.description.is_empty() {
        delivery.id.as_str()
    } else {
        delivery.description.as_str()
    };
    Some(Condition::new(
        ConstraintType::DeliveryPending,
        severity,
        delivery.id.clone(),
        format!("delivery {what} not yet arrived"),
    ))
}

/// The task sits in a held area. Evidence is the task itself.
pub fn hold_condition(task: &Task) -> Option<Condition> {
    if !task.hold_area {
        return None;
    }
    let area = task.erection_area.as_deref().unwrap_or("unassigned area");
    let summary = match &task.hold_reason {
        Some(reason) => format!("area {area} on hold: {reason}"),
        None => format!("area {area} on hold"),
    };
    Some(Condition::new(
        ConstraintType::AreaHold,
        ConstraintType::AreaHold.default_severity(),
        task.id.clone(),
        summary,
    ))
}

/// A predecessor that has not completed.
pub fn predecessor_condition(predecessor: &Task) -> Option<Condition> {
    if predecessor.status == TaskStatus::Completed {
        return None;
    }
    let name = if predecessor.name.is_empty() {
        &predecessor.id
    } else {
        &predecessor.name
    };
    Some(Condition::new(
        ConstraintType::PredecessorIncomplete,
        ConstraintType::PredecessorIncomplete.default_severity(),
        predecessor.id.clone(),
        format!("predecessor {name} is {}", predecessor.status),
    ))
}
