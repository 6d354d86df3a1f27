// src/readiness/mod.rs

//! Readiness verdicts.
//!
//! - [`evaluator`] aggregates a task's open constraints (persisted and
//!   implicit) into a [`crate::model::ReadinessRecord`].
//! - [`rollup`] folds child records into a package-level verdict with
//!   NOT_READY dominant.

pub mod evaluator;
pub mod rollup;

pub use evaluator::{assess_task, evaluate_task, gather_conditions};
pub use rollup::{fold_readiness, rollup_package, RollupTotals};
