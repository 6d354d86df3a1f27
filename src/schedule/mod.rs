// src/schedule/mod.rs

//! Schedule edits that touch tasks directly.
//!
//! - [`area`] holds and releases erection areas.
//! - [`sequence`] shifts install sequence numbers.
//! - [`baseline`] sets planning baselines and derives consumed float.
//!
//! Batch edits write each task independently. Nothing is rolled back when a
//! write fails; the [`BatchReport`] says what succeeded so the caller can
//! retry the remainder.

pub mod area;
pub mod baseline;
pub mod sequence;

use serde::Serialize;

pub use area::{hold_area, release_area};
pub use baseline::{float_consumed_hours, set_baseline};
pub use sequence::{plan_shift, push_sequence};

/// One failed write inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub task_id: String,
    pub message: String,
}

/// Outcome of a batch edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub updated_task_ids: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub(crate) fn record_success(&mut self, task_id: &str) {
        self.attempted += 1;
        self.succeeded += 1;
        self.updated_task_ids.push(task_id.to_string());
    }

    pub(crate) fn record_failure(&mut self, task_id: &str, message: impl Into<String>) {
        self.attempted += 1;
        self.failed.push(BatchFailure {
            task_id: task_id.to_string(),
            message: message.into(),
        });
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
