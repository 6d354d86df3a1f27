use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use readygate::errors::{GateError, Result};
use readygate::store::{EntityKind, EntityStore, MemoryStore};
use serde_json::Value;

/// Wraps a [`MemoryStore`] and fails writes to chosen records.
///
/// Reads always succeed, so tests can check that a batch or cascade carried
/// on past the failing record.
#[derive(Debug, Clone, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    failing: Arc<Mutex<HashSet<(EntityKind, String)>>>,
}

impl FailingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            failing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Make every create/update of `kind`/`id` fail from now on.
    pub fn fail_writes(&self, kind: EntityKind, id: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert((kind, id.to_string()));
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn check(&self, kind: EntityKind, id: &str) -> Result<()> {
        if self.failing.lock().unwrap().contains(&(kind, id.to_string())) {
            return Err(GateError::Store(format!("injected write failure for {kind} '{id}'")));
        }
        Ok(())
    }
}

impl EntityStore for FailingStore {
    fn list(&self, kind: EntityKind, project_id: &str) -> Result<Vec<Value>> {
        self.inner.list(kind, project_id)
    }

    fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Value>> {
        self.inner.get(kind, id)
    }

    fn create(&self, kind: EntityKind, id: &str, project_id: &str, value: Value) -> Result<()> {
        self.check(kind, id)?;
        self.inner.create(kind, id, project_id, value)
    }

    fn update(&self, kind: EntityKind, id: &str, project_id: &str, value: Value) -> Result<()> {
        self.check(kind, id)?;
        self.inner.update(kind, id, project_id, value)
    }
}
