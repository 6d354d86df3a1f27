// src/engine/cascade.rs

//! Cascade steps 2-4: re-evaluate, roll up, refresh permissions.
//!
//! Every sub-operation runs independently. A failure is logged with its
//! identifier, recorded in the [`CascadeReport`] and the fan-out carries on.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ConfigFile;
use crate::engine::event_handlers::Derivation;
use crate::errors::{GateError, Result};
use crate::model::{Task, WorkPackage};
use crate::permission::refresh_permission;
use crate::readiness::{evaluate_task, rollup_package};
use crate::store::{EntityKind, EntityStore, StoreExt};

/// One failed sub-operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeFailure {
    pub kind: EntityKind,
    pub id: String,
    pub message: String,
}

impl CascadeFailure {
    pub fn new(kind: EntityKind, id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            message: message.into(),
        }
    }
}

/// Counts of what a cascade did. Partial failure is reported here rather
/// than returned as an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CascadeReport {
    pub project_id: Option<String>,
    /// `Kind:id` of the triggering record, or `None` for a manual recompute.
    pub entity: Option<String>,
    /// Why the notification was ignored, if it was.
    pub skipped: Option<String>,
    pub constraints_opened: usize,
    pub constraints_cleared: usize,
    pub tasks_blocked: Vec<String>,
    pub tasks_unblocked: Vec<String>,
    pub tasks_evaluated: usize,
    pub tasks_failed: usize,
    pub packages_rolled_up: usize,
    pub packages_failed: usize,
    pub permissions_refreshed: usize,
    pub permissions_failed: usize,
    pub failures: Vec<CascadeFailure>,
}

impl CascadeReport {
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            ..Self::default()
        }
    }

    pub fn skipped(entity: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            entity,
            skipped: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }

    /// No sub-operation failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn absorb(&mut self, derivation: Derivation) {
        self.constraints_opened += derivation.opened;
        self.constraints_cleared += derivation.cleared;
        self.tasks_blocked.extend(derivation.blocked);
        self.tasks_unblocked.extend(derivation.unblocked);
        self.failures.extend(derivation.failures);
    }

    pub(crate) fn record_failure(&mut self, kind: EntityKind, id: &str, err: &GateError) {
        warn!(%kind, id, error = %err, "cascade step failed");
        self.failures.push(CascadeFailure::new(kind, id, err.to_string()));
    }
}

/// Which packages step 3 covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PackageScope {
    /// Packages containing a re-evaluated task.
    Touched,
    /// Every package in the project.
    All,
}

/// Run steps 2-4 for `project_id`, accumulating into `report`.
pub(crate) fn fan_out<S: EntityStore + ?Sized>(
    store: &S,
    cfg: &ConfigFile,
    project_id: &str,
    scope: PackageScope,
    report: &mut CascadeReport,
    now: DateTime<Utc>,
) {
    let tasks = match store.filter::<Task>(project_id, Task::is_erection) {
        Ok(tasks) => tasks,
        Err(err) => {
            report.record_failure(EntityKind::Project, project_id, &err);
            return;
        }
    };

    let mut packages: BTreeSet<String> = BTreeSet::new();
    for task in tasks.iter() {
        match evaluate_task(store, task, now) {
            Ok(_) => {
                report.tasks_evaluated += 1;
                if let Some(wp) = task.work_package_id.as_ref() {
                    packages.insert(wp.clone());
                }
            }
            Err(err) => {
                report.tasks_failed += 1;
                report.record_failure(EntityKind::Task, &task.id, &err);
            }
        }
    }

    if scope == PackageScope::All {
        match store.all::<WorkPackage>(project_id) {
            Ok(all) => packages.extend(all.into_iter().map(|wp| wp.id)),
            Err(err) => report.record_failure(EntityKind::Project, project_id, &err),
        }
    }

    for package_id in packages.iter() {
        refresh_package(store, cfg, package_id, report, now);
    }

    info!(
        project = %project_id,
        tasks_evaluated = report.tasks_evaluated,
        tasks_failed = report.tasks_failed,
        packages = report.packages_rolled_up,
        permissions = report.permissions_refreshed,
        failures = report.failures.len(),
        "cascade complete"
    );
}

fn refresh_package<S: EntityStore + ?Sized>(
    store: &S,
    cfg: &ConfigFile,
    package_id: &str,
    report: &mut CascadeReport,
    now: DateTime<Utc>,
) {
    let rolled = store
        .require::<WorkPackage>(package_id)
        .and_then(|package| rollup_package(store, &package, now).map(|rollup| (package, rollup)));
    let (package, rollup) = match rolled {
        Ok(pair) => pair,
        Err(err) => {
            report.packages_failed += 1;
            report.record_failure(EntityKind::WorkPackage, package_id, &err);
            return;
        }
    };
    report.packages_rolled_up += 1;

    match refresh_permission(store, cfg, &package, &rollup, now) {
        Ok(_) => report.permissions_refreshed += 1,
        Err(err) => {
            report.permissions_failed += 1;
            report.record_failure(EntityKind::ExecutionPermission, package_id, &err);
        }
    }
}

pub(crate) fn require_project_id(project_id: &str) -> Result<()> {
    if project_id.trim().is_empty() {
        return Err(GateError::Validation("project_id is required".to_string()));
    }
    Ok(())
}
