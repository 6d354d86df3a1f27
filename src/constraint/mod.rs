// src/constraint/mod.rs

//! Constraint store and grading rules.
//!
//! - [`rules`] turns upstream facts (an RFI, a drawing set, a delivery, a
//!   hold, a predecessor) into graded [`Condition`]s. The evaluator and the
//!   cascade share these so a persisted constraint and its implicit twin
//!   always agree on type, severity and evidence.
//! - [`store`] opens (idempotently) and clears persisted constraints.

pub mod rules;
pub mod store;

pub use rules::Condition;
pub use store::{
    clear_constraints, decode_constraint, filter_constraints, open_constraint,
    open_constraints_for, ClearFailure, ClearOutcome, ClearRequest, OpenOutcome, OpenRequest,
    SYSTEM_ACTOR,
};
