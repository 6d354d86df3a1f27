// src/store/mod.rs

//! Generic persistent entity store.
//!
//! The engine never talks to a concrete database. Everything it reads
//! (tasks, RFIs, drawings, deliveries, constraints) and everything it writes
//! (readiness records, package readiness, execution permissions) goes through
//! [`EntityStore`], which stores JSON documents keyed by [`EntityKind`] and id.
//!
//! - [`EntityStore`] is the object-safe port implemented by backends.
//! - [`StoreExt`] layers typed `filter` / `find` / `create` / `update` on top
//!   for any [`Entity`].
//! - [`memory`] holds the in-memory implementation used by the CLI and tests.
//!
//! There are no cross-entity transactions: each write stands alone and the
//! last write for a given row wins.

use std::fmt::{self, Debug};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{GateError, Result};

pub mod memory;

pub use memory::{MemoryStore, Snapshot};

/// Every entity type the store knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Project,
    Task,
    WorkPackage,
    #[serde(rename = "RFI")]
    Rfi,
    DrawingSet,
    DrawingRevision,
    Delivery,
    Constraint,
    ReadinessRecord,
    WorkPackageReadiness,
    ExecutionPermission,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Project => "Project",
            EntityKind::Task => "Task",
            EntityKind::WorkPackage => "WorkPackage",
            EntityKind::Rfi => "RFI",
            EntityKind::DrawingSet => "DrawingSet",
            EntityKind::DrawingRevision => "DrawingRevision",
            EntityKind::Delivery => "Delivery",
            EntityKind::Constraint => "Constraint",
            EntityKind::ReadinessRecord => "ReadinessRecord",
            EntityKind::WorkPackageReadiness => "WorkPackageReadiness",
            EntityKind::ExecutionPermission => "ExecutionPermission",
        }
    }

    /// Resolve an upstream `entity_name`. Names are matched case-insensitively
    /// and `Rfi` / `RFI` are both accepted.
    pub fn from_entity_name(name: &str) -> Option<Self> {
        let all = [
            EntityKind::Project,
            EntityKind::Task,
            EntityKind::WorkPackage,
            EntityKind::Rfi,
            EntityKind::DrawingSet,
            EntityKind::DrawingRevision,
            EntityKind::Delivery,
            EntityKind::Constraint,
            EntityKind::ReadinessRecord,
            EntityKind::WorkPackageReadiness,
            EntityKind::ExecutionPermission,
        ];
        let name = name.trim();
        all.into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
    }

    /// Rows the engine itself derives. Notifications about them never start
    /// a cascade.
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            EntityKind::ReadinessRecord
                | EntityKind::WorkPackageReadiness
                | EntityKind::ExecutionPermission
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed record that can be stored.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &str;
    fn project_id(&self) -> &str;
}

/// Object-safe storage port.
pub trait EntityStore: Send + Sync + Debug {
    /// All records of `kind` belonging to `project_id`, ordered by id.
    fn list(&self, kind: EntityKind, project_id: &str) -> Result<Vec<Value>>;

    /// A single record, or `None` if it does not exist.
    fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Value>>;

    /// Insert a new record. Fails if the id is already taken.
    fn create(&self, kind: EntityKind, id: &str, project_id: &str, value: Value) -> Result<()>;

    /// Replace an existing record. Fails if it does not exist.
    fn update(&self, kind: EntityKind, id: &str, project_id: &str, value: Value) -> Result<()>;
}

/// Typed helpers over any [`EntityStore`].
pub trait StoreExt: EntityStore {
    fn all<T: Entity>(&self, project_id: &str) -> Result<Vec<T>> {
        self.list(T::KIND, project_id)?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(GateError::from))
            .collect()
    }

    fn filter<T: Entity>(
        &self,
        project_id: &str,
        predicate: impl Fn(&T) -> bool,
    ) -> Result<Vec<T>> {
        Ok(self
            .all::<T>(project_id)?
            .into_iter()
            .filter(|e| predicate(e))
            .collect())
    }

    fn find<T: Entity>(&self, id: &str) -> Result<Option<T>> {
        match self.get(T::KIND, id)? {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    /// Like [`StoreExt::find`] but a missing record is an error.
    fn require<T: Entity>(&self, id: &str) -> Result<T> {
        self.find::<T>(id)?
            .ok_or_else(|| GateError::not_found(T::KIND, id))
    }

    fn create_entity<T: Entity>(&self, entity: &T) -> Result<()> {
        let value = serde_json::to_value(entity)?;
        self.create(T::KIND, entity.id(), entity.project_id(), value)
    }

    fn update_entity<T: Entity>(&self, entity: &T) -> Result<()> {
        let value = serde_json::to_value(entity)?;
        self.update(T::KIND, entity.id(), entity.project_id(), value)
    }

    /// Create or overwrite. Used for derived rows where last write wins.
    fn upsert_entity<T: Entity>(&self, entity: &T) -> Result<()> {
        if self.get(T::KIND, entity.id())?.is_some() {
            self.update_entity(entity)
        } else {
            self.create_entity(entity)
        }
    }
}

impl<S: EntityStore + ?Sized> StoreExt for S {}
