// src/model/work_package.rs

use serde::{Deserialize, Serialize};

use crate::store::{Entity, EntityKind};
use crate::types::{Phase, WorkPackageStatus};

/// Group of tasks released together. Tasks hold the foreign key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPackage {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub status: WorkPackageStatus,
}

impl Entity for WorkPackage {
    const KIND: EntityKind = EntityKind::WorkPackage;

    fn id(&self) -> &str {
        &self.id
    }

    fn project_id(&self) -> &str {
        &self.project_id
    }
}
