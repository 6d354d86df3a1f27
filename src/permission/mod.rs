// src/permission/mod.rs

//! Execution permission for work packages.
//!
//! - [`risk`] scores a package from its rollup and its tasks.
//! - [`machine`] is the transition function over
//!   [`crate::types::PermissionStatus`] plus the manual override rules.

pub mod machine;
pub mod risk;

pub use machine::{
    clear_override, decide, override_permission, refresh_permission, retained_override, Decision,
};
pub use risk::{assess_risk, score_level, RiskAssessment};
