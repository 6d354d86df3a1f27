// src/store/memory.rs

//! In-memory [`EntityStore`] with JSON snapshot import/export.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{Entity, EntityKind, EntityStore};
use crate::errors::{GateError, Result};
use crate::model::{
    Constraint, Delivery, DrawingRevision, DrawingSet, ExecutionPermission, Project,
    ReadinessRecord, Rfi, Task, WorkPackage, WorkPackageReadiness,
};

#[derive(Debug, Clone)]
struct StoredRecord {
    project_id: String,
    value: Value,
}

type RecordMap = BTreeMap<(EntityKind, String), StoredRecord>;

/// Shared in-memory store. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<RecordMap>>,
}

/// On-disk project snapshot: one array per entity kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub work_packages: Vec<WorkPackage>,
    #[serde(default)]
    pub rfis: Vec<Rfi>,
    #[serde(default)]
    pub drawing_sets: Vec<DrawingSet>,
    #[serde(default)]
    pub drawing_revisions: Vec<DrawingRevision>,
    #[serde(default)]
    pub deliveries: Vec<Delivery>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub readiness_records: Vec<ReadinessRecord>,
    #[serde(default)]
    pub work_package_readiness: Vec<WorkPackageReadiness>,
    #[serde(default)]
    pub execution_permissions: Vec<ExecutionPermission>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, RecordMap>> {
        self.records
            .lock()
            .map_err(|_| GateError::Store("memory store lock poisoned".to_string()))
    }

    /// Insert or replace a record without existence checks. Handy for seeding.
    pub fn insert<T: Entity>(&self, entity: &T) -> Result<()> {
        let value = serde_json::to_value(entity)?;
        let mut records = self.lock()?;
        records.insert(
            (T::KIND, entity.id().to_string()),
            StoredRecord {
                project_id: entity.project_id().to_string(),
                value,
            },
        );
        Ok(())
    }

    /// Every record of a kind across all projects.
    pub fn all_of<T: Entity>(&self) -> Result<Vec<T>> {
        let records = self.lock()?;
        records
            .iter()
            .filter(|((kind, _), _)| *kind == T::KIND)
            .map(|(_, rec)| serde_json::from_value(rec.value.clone()).map_err(GateError::from))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let store = Self::new();
        for e in &snapshot.projects {
            store.insert(e)?;
        }
        for e in &snapshot.tasks {
            store.insert(e)?;
        }
        for e in &snapshot.work_packages {
            store.insert(e)?;
        }
        for e in &snapshot.rfis {
            store.insert(e)?;
        }
        for e in &snapshot.drawing_sets {
            store.insert(e)?;
        }
        for e in &snapshot.drawing_revisions {
            store.insert(e)?;
        }
        for e in &snapshot.deliveries {
            store.insert(e)?;
        }
        for e in &snapshot.constraints {
            store.insert(e)?;
        }
        for e in &snapshot.readiness_records {
            store.insert(e)?;
        }
        for e in &snapshot.work_package_readiness {
            store.insert(e)?;
        }
        for e in &snapshot.execution_permissions {
            store.insert(e)?;
        }
        debug!(records = store.len(), "memory store loaded from snapshot");
        Ok(store)
    }

    pub fn to_snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            projects: self.all_of()?,
            tasks: self.all_of()?,
            work_packages: self.all_of()?,
            rfis: self.all_of()?,
            drawing_sets: self.all_of()?,
            drawing_revisions: self.all_of()?,
            deliveries: self.all_of()?,
            constraints: self.all_of()?,
            readiness_records: self.all_of()?,
            work_package_readiness: self.all_of()?,
            execution_permissions: self.all_of()?,
        })
    }

    pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let snapshot: Snapshot = serde_json::from_str(&contents)?;
        Self::from_snapshot(snapshot)
    }

    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = self.to_snapshot()?;
        let contents = serde_json::to_string_pretty(&snapshot)?;
        fs::write(path.as_ref(), contents)?;
        Ok(())
    }

    /// Project ids known to the store, taken from project records and from
    /// any record's project scope.
    pub fn project_ids(&self) -> Result<Vec<String>> {
        let records = self.lock()?;
        let mut ids: Vec<String> = records.values().map(|r| r.project_id.clone()).collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

impl EntityStore for MemoryStore {
    fn list(&self, kind: EntityKind, project_id: &str) -> Result<Vec<Value>> {
        let records = self.lock()?;
        Ok(records
            .iter()
            .filter(|((k, _), rec)| *k == kind && rec.project_id == project_id)
            .map(|(_, rec)| rec.value.clone())
            .collect())
    }

    fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Value>> {
        let records = self.lock()?;
        Ok(records
            .get(&(kind, id.to_string()))
            .map(|rec| rec.value.clone()))
    }

    fn create(&self, kind: EntityKind, id: &str, project_id: &str, value: Value) -> Result<()> {
        let mut records = self.lock()?;
        let key = (kind, id.to_string());
        if records.contains_key(&key) {
            return Err(GateError::Store(format!("{kind} '{id}' already exists")));
        }
        records.insert(
            key,
            StoredRecord {
                project_id: project_id.to_string(),
                value,
            },
        );
        Ok(())
    }

    fn update(&self, kind: EntityKind, id: &str, project_id: &str, value: Value) -> Result<()> {
        let mut records = self.lock()?;
        match records.get_mut(&(kind, id.to_string())) {
            Some(rec) => {
                rec.project_id = project_id.to_string();
                rec.value = value;
                Ok(())
            }
            None => Err(GateError::not_found(kind, id)),
        }
    }
}
