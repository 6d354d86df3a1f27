// src/engine/core.rs

//! The [`Engine`] facade.
//!
//! Free functions in the component modules do the work and take `now`
//! explicitly; the engine owns the store handle, the validated config and a
//! clock, and is what the CLI, the runtime and embedding services call.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::dag;
use crate::engine::cascade::{fan_out, require_project_id, CascadeReport, PackageScope};
use crate::engine::event_handlers::{derive_constraints, reconcile_constraints};
use crate::engine::MutationNotification;
use crate::errors::{GateError, Result};
use crate::gate::{self, StartOutcome};
use crate::model::{ExecutionPermission, ReadinessRecord, Task, WorkPackage, WorkPackageReadiness};
use crate::permission;
use crate::readiness;
use crate::schedule::{self, BatchReport};
use crate::store::{EntityKind, EntityStore, StoreExt};
use crate::types::PermissionStatus;

/// Source of the current time.
pub type Clock = fn() -> DateTime<Utc>;

/// Readiness and permission engine over an [`EntityStore`].
///
/// Cloning is cheap: clones share the store.
pub struct Engine<S: EntityStore> {
    store: Arc<S>,
    config: ConfigFile,
    clock: Clock,
}

impl<S: EntityStore> Clone for Engine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            clock: self.clock,
        }
    }
}

impl<S: EntityStore> fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: EntityStore> Engine<S> {
    pub fn new(store: Arc<S>, config: ConfigFile) -> Self {
        Self {
            store,
            config,
            clock: Utc::now,
        }
    }

    /// Replace the wall clock (tests pin time with this).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    // --- dependency graph ---------------------------------------------------

    /// Check a proposed predecessor edge against the task's project.
    pub fn validate_edge(&self, task_id: &str, predecessor_id: &str) -> Result<()> {
        let task = self.task_for_edge(task_id)?;
        let tasks = self.store.all::<Task>(&task.project_id)?;
        dag::validate_edge(task_id, predecessor_id, &tasks)
    }

    /// Validate then persist a predecessor edge. Adding an existing edge is
    /// a no-op.
    pub fn add_predecessor(&self, task_id: &str, predecessor_id: &str) -> Result<Task> {
        let mut task = self.task_for_edge(task_id)?;
        let tasks = self.store.all::<Task>(&task.project_id)?;
        dag::validate_edge(task_id, predecessor_id, &tasks)?;

        if !task.predecessor_ids.insert(predecessor_id.to_string()) {
            debug!(task = %task_id, predecessor = %predecessor_id, "edge already present");
            return Ok(task);
        }
        self.store.update_entity(&task)?;
        info!(task = %task_id, predecessor = %predecessor_id, "predecessor edge added");
        Ok(task)
    }

    /// Remove a predecessor edge. Removing an absent edge is a no-op.
    pub fn remove_predecessor(&self, task_id: &str, predecessor_id: &str) -> Result<Task> {
        let mut task = self.task_for_edge(task_id)?;
        if task.predecessor_ids.remove(predecessor_id) {
            self.store.update_entity(&task)?;
            info!(task = %task_id, predecessor = %predecessor_id, "predecessor edge removed");
        }
        Ok(task)
    }

    /// Check the whole persisted predecessor graph of a project.
    pub fn validate_project_graph(&self, project_id: &str) -> Result<()> {
        require_project_id(project_id)?;
        let tasks = self.store.all::<Task>(project_id)?;
        dag::validate_project_graph(&tasks)
    }

    fn task_for_edge(&self, task_id: &str) -> Result<Task> {
        if task_id.trim().is_empty() {
            return Err(GateError::Validation("task id is required".to_string()));
        }
        self.store.require::<Task>(task_id)
    }

    // --- readiness and permission -------------------------------------------

    pub fn evaluate_task(&self, task_id: &str) -> Result<Option<ReadinessRecord>> {
        let task = self.store.require::<Task>(task_id)?;
        readiness::evaluate_task(&*self.store, &task, self.now())
    }

    pub fn rollup_package(&self, package_id: &str) -> Result<WorkPackageReadiness> {
        let package = self.store.require::<WorkPackage>(package_id)?;
        readiness::rollup_package(&*self.store, &package, self.now())
    }

    /// Roll the package up, then re-derive its permission.
    pub fn refresh_permission(&self, package_id: &str) -> Result<ExecutionPermission> {
        let now = self.now();
        let package = self.store.require::<WorkPackage>(package_id)?;
        let rollup = readiness::rollup_package(&*self.store, &package, now)?;
        permission::refresh_permission(&*self.store, &self.config, &package, &rollup, now)
    }

    pub fn override_permission(
        &self,
        package_id: &str,
        status: PermissionStatus,
        actor: &str,
        reason: Option<&str>,
    ) -> Result<ExecutionPermission> {
        permission::override_permission(
            &*self.store,
            &self.config,
            package_id,
            status,
            actor,
            reason,
            self.now(),
        )
    }

    pub fn clear_override(&self, package_id: &str) -> Result<ExecutionPermission> {
        permission::clear_override(&*self.store, &self.config, package_id, self.now())
    }

    // --- task lifecycle -----------------------------------------------------

    pub fn request_start(&self, task_id: &str) -> Result<StartOutcome> {
        gate::request_start(&*self.store, task_id, self.now())
    }

    pub fn complete_task(&self, task_id: &str) -> Result<Task> {
        gate::complete_task(&*self.store, task_id, self.now())
    }

    // --- schedule edits -----------------------------------------------------

    pub fn hold_area(
        &self,
        project_id: &str,
        area: &str,
        reason: Option<&str>,
    ) -> Result<BatchReport> {
        schedule::hold_area(&*self.store, project_id, area, reason)
    }

    pub fn release_area(&self, project_id: &str, area: &str) -> Result<BatchReport> {
        schedule::release_area(&*self.store, project_id, area)
    }

    pub fn push_sequence(
        &self,
        project_id: &str,
        threshold: i64,
        delta: i64,
    ) -> Result<BatchReport> {
        schedule::push_sequence(&*self.store, project_id, threshold, delta)
    }

    pub fn set_baseline(
        &self,
        task_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Task> {
        schedule::set_baseline(&*self.store, task_id, start, end)
    }

    // --- cascade ------------------------------------------------------------

    /// React to an upstream mutation.
    ///
    /// Unknown entity names, derived rows and records without a project are
    /// skipped (reported, not errors). A missing entity id is a validation
    /// failure.
    pub fn handle_notification(
        &self,
        notification: &MutationNotification,
    ) -> Result<CascadeReport> {
        let event = &notification.event;
        if event.entity_id.trim().is_empty() {
            return Err(GateError::Validation(format!(
                "{} notification without an entity id",
                event.entity_name
            )));
        }
        let label = Some(format!("{}:{}", event.entity_name, event.entity_id));

        let Some(kind) = EntityKind::from_entity_name(&event.entity_name) else {
            debug!(entity = %event.entity_name, "unknown entity name; skipping");
            return Ok(CascadeReport::skipped(
                label,
                format!("unknown entity '{}'", event.entity_name),
            ));
        };
        if kind.is_derived() {
            debug!(%kind, id = %event.entity_id, "derived row changed; skipping");
            return Ok(CascadeReport::skipped(label, format!("{kind} is derived by the engine")));
        }

        let Some(project_id) = self.project_of(kind, notification)? else {
            info!(%kind, id = %event.entity_id, "notification without a project; skipping");
            return Ok(CascadeReport::skipped(label, "no project_id"));
        };

        let now = self.now();
        let mut report = CascadeReport::for_project(&project_id);
        report.entity = label;

        match derive_constraints(&*self.store, &project_id, kind, notification, now) {
            Ok(derivation) => report.absorb(derivation),
            Err(err) => report.record_failure(kind, &event.entity_id, &err),
        }

        fan_out(
            &*self.store,
            &self.config,
            &project_id,
            PackageScope::Touched,
            &mut report,
            now,
        );
        Ok(report)
    }

    /// Recompute everything for a project. Recovery entry point for missed
    /// or dropped notifications.
    pub fn recompute_project(&self, project_id: &str) -> Result<CascadeReport> {
        require_project_id(project_id)?;
        let now = self.now();
        let mut report = CascadeReport::for_project(project_id);

        if self.config.cascade.reconcile_on_recompute {
            match reconcile_constraints(&*self.store, project_id, now) {
                Ok(derivation) => report.absorb(derivation),
                Err(err) => report.record_failure(EntityKind::Project, project_id, &err),
            }
        }

        fan_out(
            &*self.store,
            &self.config,
            project_id,
            PackageScope::All,
            &mut report,
            now,
        );
        Ok(report)
    }

    /// Project scope of a notification: the after-image's `project_id`, else
    /// the stored record's.
    fn project_of(
        &self,
        kind: EntityKind,
        notification: &MutationNotification,
    ) -> Result<Option<String>> {
        if kind == EntityKind::Project {
            return Ok(Some(notification.event.entity_id.clone()));
        }
        if let Some(project_id) = notification.project_id() {
            return Ok(Some(project_id.to_string()));
        }
        let stored = self.store.get(kind, &notification.event.entity_id)?;
        Ok(stored
            .as_ref()
            .and_then(|v| v.get("project_id"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string))
    }
}
