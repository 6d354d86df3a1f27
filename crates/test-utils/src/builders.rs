#![allow(dead_code)]

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use readygate::model::{Constraint, Delivery, DrawingSet, Project, Rfi, Task, WorkPackage};
use readygate::store::MemoryStore;
use readygate::types::{
    ConstraintStatus, ConstraintType, DeliveryStatus, DrawingStatus, Phase, RfiStatus, Severity,
    TaskStatus, TaskType, WorkPackageStatus,
};

use crate::fixed_now;

/// Memory store seeded with a single project.
pub fn project_store(project_id: &str) -> MemoryStore {
    let store = MemoryStore::new();
    store
        .insert(&Project {
            id: project_id.to_string(),
            name: format!("Project {project_id}"),
        })
        .expect("seed project");
    store
}

/// Builder for `Task`.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    fn new(id: &str, project_id: &str, task_type: TaskType) -> Self {
        Self {
            task: Task {
                id: id.to_string(),
                project_id: project_id.to_string(),
                name: String::new(),
                work_package_id: None,
                task_type,
                status: TaskStatus::NotStarted,
                predecessor_ids: BTreeSet::new(),
                erection_area: None,
                hold_area: false,
                hold_reason: None,
                install_sequence_number: 0,
                baseline_start: None,
                baseline_end: None,
                actual_start: None,
                actual_end: None,
                float_consumed_hours: 0.0,
                drawing_set_ids: BTreeSet::new(),
                gating_delivery_ids: BTreeSet::new(),
            },
        }
    }

    pub fn erection(id: &str, project_id: &str) -> Self {
        Self::new(id, project_id, TaskType::Erection)
    }

    pub fn other(id: &str, project_id: &str) -> Self {
        Self::new(id, project_id, TaskType::Other)
    }

    pub fn name(mut self, name: &str) -> Self {
        self.task.name = name.to_string();
        self
    }

    pub fn package(mut self, work_package_id: &str) -> Self {
        self.task.work_package_id = Some(work_package_id.to_string());
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.task.status = status;
        self
    }

    pub fn predecessor(mut self, id: &str) -> Self {
        self.task.predecessor_ids.insert(id.to_string());
        self
    }

    pub fn area(mut self, area: &str) -> Self {
        self.task.erection_area = Some(area.to_string());
        self
    }

    pub fn held(mut self, reason: &str) -> Self {
        self.task.hold_area = true;
        self.task.hold_reason = Some(reason.to_string());
        self
    }

    pub fn sequence(mut self, n: i64) -> Self {
        self.task.install_sequence_number = n;
        self
    }

    pub fn drawing(mut self, drawing_set_id: &str) -> Self {
        self.task.drawing_set_ids.insert(drawing_set_id.to_string());
        self
    }

    pub fn gated_on(mut self, delivery_id: &str) -> Self {
        self.task.gating_delivery_ids.insert(delivery_id.to_string());
        self
    }

    pub fn baseline(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.task.baseline_start = Some(start);
        self.task.baseline_end = Some(end);
        self
    }

    pub fn started_at(mut self, at: DateTime<Utc>) -> Self {
        self.task.actual_start = Some(at);
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

/// Builder for `WorkPackage`.
pub struct WorkPackageBuilder {
    package: WorkPackage,
}

impl WorkPackageBuilder {
    pub fn new(id: &str, project_id: &str) -> Self {
        Self {
            package: WorkPackage {
                id: id.to_string(),
                project_id: project_id.to_string(),
                name: String::new(),
                phase: Phase::Erection,
                status: WorkPackageStatus::Active,
            },
        }
    }

    pub fn phase(mut self, phase: Phase) -> Self {
        self.package.phase = phase;
        self
    }

    pub fn build(self) -> WorkPackage {
        self.package
    }
}

/// Builder for `Rfi`. Defaults to a submitted, non-blocking RFI.
pub struct RfiBuilder {
    rfi: Rfi,
}

impl RfiBuilder {
    pub fn new(id: &str, project_id: &str) -> Self {
        Self {
            rfi: Rfi {
                id: id.to_string(),
                project_id: project_id.to_string(),
                number: None,
                subject: String::new(),
                status: RfiStatus::Submitted,
                is_blocker: false,
                linked_task_ids: BTreeSet::new(),
            },
        }
    }

    pub fn number(mut self, number: &str) -> Self {
        self.rfi.number = Some(number.to_string());
        self
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.rfi.subject = subject.to_string();
        self
    }

    pub fn status(mut self, status: RfiStatus) -> Self {
        self.rfi.status = status;
        self
    }

    pub fn blocker(mut self) -> Self {
        self.rfi.is_blocker = true;
        self
    }

    pub fn links(mut self, task_id: &str) -> Self {
        self.rfi.linked_task_ids.insert(task_id.to_string());
        self
    }

    pub fn build(self) -> Rfi {
        self.rfi
    }
}

/// Builder for `DrawingSet`. Defaults to in progress (unreleased).
pub struct DrawingSetBuilder {
    set: DrawingSet,
}

impl DrawingSetBuilder {
    pub fn new(id: &str, project_id: &str) -> Self {
        Self {
            set: DrawingSet {
                id: id.to_string(),
                project_id: project_id.to_string(),
                name: String::new(),
                status: DrawingStatus::InProgress,
                current_revision: None,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.set.name = name.to_string();
        self
    }

    pub fn status(mut self, status: DrawingStatus) -> Self {
        self.set.status = status;
        self
    }

    pub fn released(self) -> Self {
        self.status(DrawingStatus::Released)
    }

    pub fn build(self) -> DrawingSet {
        self.set
    }
}

/// Builder for `Delivery`. Defaults to scheduled (pending).
pub struct DeliveryBuilder {
    delivery: Delivery,
}

impl DeliveryBuilder {
    pub fn new(id: &str, project_id: &str) -> Self {
        Self {
            delivery: Delivery {
                id: id.to_string(),
                project_id: project_id.to_string(),
                work_package_id: None,
                description: String::new(),
                status: DeliveryStatus::Scheduled,
            },
        }
    }

    pub fn package(mut self, work_package_id: &str) -> Self {
        self.delivery.work_package_id = Some(work_package_id.to_string());
        self
    }

    pub fn status(mut self, status: DeliveryStatus) -> Self {
        self.delivery.status = status;
        self
    }

    pub fn build(self) -> Delivery {
        self.delivery
    }
}

/// Builder for persisted `Constraint`s. Severity defaults to the type's.
pub struct ConstraintBuilder {
    constraint: Constraint,
}

impl ConstraintBuilder {
    pub fn new(id: &str, project_id: &str, constraint_type: ConstraintType) -> Self {
        Self {
            constraint: Constraint {
                id: id.to_string(),
                project_id: project_id.to_string(),
                task_id: None,
                work_package_id: None,
                constraint_type,
                severity: constraint_type.default_severity(),
                status: ConstraintStatus::Open,
                evidence_links: BTreeSet::new(),
                summary: String::new(),
                created_at: fixed_now(),
                cleared_at: None,
                cleared_by: None,
            },
        }
    }

    pub fn task(mut self, task_id: &str) -> Self {
        self.constraint.task_id = Some(task_id.to_string());
        self
    }

    pub fn package(mut self, work_package_id: &str) -> Self {
        self.constraint.work_package_id = Some(work_package_id.to_string());
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.constraint.severity = severity;
        self
    }

    pub fn evidence(mut self, link: &str) -> Self {
        self.constraint.evidence_links.insert(link.to_string());
        self
    }

    pub fn summary(mut self, summary: &str) -> Self {
        self.constraint.summary = summary.to_string();
        self
    }

    pub fn cleared(mut self) -> Self {
        self.constraint.status = ConstraintStatus::Cleared;
        self.constraint.cleared_at = Some(fixed_now());
        self.constraint.cleared_by = Some("test".to_string());
        self
    }

    pub fn build(self) -> Constraint {
        self.constraint
    }
}
