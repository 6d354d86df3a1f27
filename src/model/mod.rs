// src/model/mod.rs

//! Stored records.
//!
//! - [`task`] and [`work_package`] are the schedulable units.
//! - [`constraint`] holds the typed blocking conditions.
//! - [`upstream`] holds the records owned by other subsystems that the engine
//!   reads (projects, RFIs, drawings, deliveries).
//! - [`derived`] holds the rows the engine writes and never reads as truth.

pub mod constraint;
pub mod derived;
pub mod task;
pub mod upstream;
pub mod work_package;

pub use constraint::{Constraint, ConstraintScope};
pub use derived::{ExecutionPermission, ManualOverride, ReadinessRecord, WorkPackageReadiness};
pub use task::Task;
pub use upstream::{Delivery, DrawingRevision, DrawingSet, Project, Rfi};
pub use work_package::WorkPackage;
