// src/model/upstream.rs

//! Records owned by other subsystems. The engine reads them to derive
//! constraints but never writes them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::store::{Entity, EntityKind};
use crate::types::{DeliveryStatus, DrawingStatus, RfiStatus};

macro_rules! project_entity {
    ($ty:ty, $kind:expr) => {
        impl Entity for $ty {
            const KIND: EntityKind = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn project_id(&self) -> &str {
                &self.project_id
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Entity for Project {
    const KIND: EntityKind = EntityKind::Project;

    fn id(&self) -> &str {
        &self.id
    }

    /// A project is its own scope.
    fn project_id(&self) -> &str {
        &self.id
    }
}

/// Request for information raised against the design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rfi {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub status: RfiStatus,
    #[serde(default)]
    pub is_blocker: bool,
    #[serde(default)]
    pub linked_task_ids: BTreeSet<String>,
}

impl Rfi {
    /// Human label: `RFI #12` when numbered, else the id.
    pub fn label(&self) -> String {
        match &self.number {
            Some(n) => format!("RFI #{n}"),
            None => format!("RFI {}", self.id),
        }
    }
}

project_entity!(Rfi, EntityKind::Rfi);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingSet {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: DrawingStatus,
    #[serde(default)]
    pub current_revision: Option<String>,
}

impl DrawingSet {
    pub fn is_released(&self) -> bool {
        self.status == DrawingStatus::Released
    }
}

project_entity!(DrawingSet, EntityKind::DrawingSet);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingRevision {
    pub id: String,
    pub project_id: String,
    pub drawing_set_id: String,
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub status: DrawingStatus,
}

project_entity!(DrawingRevision, EntityKind::DrawingRevision);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub work_package_id: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: DeliveryStatus,
}

impl Delivery {
    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }
}

project_entity!(Delivery, EntityKind::Delivery);
