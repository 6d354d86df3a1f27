// src/dag/mod.rs

//! Predecessor graph and cycle-safe edge editing.
//!
//! - [`graph`] holds an adjacency map of predecessor edges keyed by task id.
//! - [`validator`] is the pure guard consulted before any edge is persisted,
//!   plus a whole-project acyclicity check.

pub mod graph;
pub mod validator;

pub use graph::PredecessorGraph;
pub use validator::{validate_edge, validate_project_graph};
