// tests/constraint_decoding.rs

mod common;
use crate::common::builders::{project_store, ConstraintBuilder, TaskBuilder};
use crate::common::{engine, init_tracing, seed, PROJECT};

use std::error::Error;

use serde_json::{json, Value};

use readygate::constraint::{decode_constraint, filter_constraints};
use readygate::gate::StartOutcome;
use readygate::model::{Constraint, ReadinessRecord, Task};
use readygate::store::{EntityKind, EntityStore, MemoryStore, StoreExt};
use readygate::types::{ConstraintType, TaskStatus};

type TestResult = Result<(), Box<dyn Error>>;

fn crane_down(task_id: &str, status: &str) -> Value {
    json!({
        "id": "c-crane",
        "project_id": PROJECT,
        "task_id": task_id,
        "constraint_type": "CRANE_DOWN",
        "severity": "BLOCKER",
        "status": status,
        "evidence_links": ["crane-7"],
        "created_at": "2026-03-02T08:00:00Z",
    })
}

/// t1 and t2, with an open constraint of unknown type on t1.
fn site(status: &str) -> Result<MemoryStore, Box<dyn Error>> {
    let store = project_store(PROJECT);
    seed(
        &store,
        &[
            TaskBuilder::erection("t1", PROJECT).build(),
            TaskBuilder::erection("t2", PROJECT).build(),
        ],
    );
    store.create(EntityKind::Constraint, "c-crane", PROJECT, crane_down("t1", status))?;
    Ok(store)
}

#[test]
fn unknown_constraint_type_is_a_validation_error_naming_the_row() {
    let err = decode_constraint(crane_down("t1", "OPEN")).unwrap_err();

    assert!(err.is_validation(), "unexpected error: {err}");
    let message = err.to_string();
    assert!(message.contains("c-crane"), "message: {message}");
    assert!(message.contains("CRANE_DOWN"), "message: {message}");
}

#[test]
fn constraint_type_is_read_case_insensitively() -> TestResult {
    let mut row = crane_down("t1", "OPEN");
    row["constraint_type"] = json!("area_hold");

    let constraint = decode_constraint(row)?;
    assert_eq!(constraint.constraint_type, ConstraintType::AreaHold);
    assert_eq!(constraint.task_id.as_deref(), Some("t1"));
    Ok(())
}

#[test]
fn undecodable_row_only_fails_the_task_it_gates() -> TestResult {
    init_tracing();

    let store = site("OPEN")?;
    let engine = engine(&store);

    let outcome = engine.request_start("t2")?;
    assert!(matches!(outcome, StartOutcome::Started { .. }), "got {outcome:?}");

    let err = engine.request_start("t1").unwrap_err();
    assert!(err.is_validation(), "unexpected error: {err}");
    assert!(err.to_string().contains("CRANE_DOWN"));
    assert_eq!(store.require::<Task>("t1")?.status, TaskStatus::NotStarted);
    Ok(())
}

#[test]
fn recompute_reports_only_the_gated_task() -> TestResult {
    init_tracing();

    let store = site("OPEN")?;
    let report = engine(&store).recompute_project(PROJECT)?;

    assert_eq!(report.tasks_evaluated, 1);
    assert_eq!(report.tasks_failed, 1);
    assert!(
        report
            .failures
            .iter()
            .any(|f| f.kind == EntityKind::Task && f.id == "t1"),
        "failures: {:?}",
        report.failures
    );
    assert!(store.find::<ReadinessRecord>("t2")?.is_some());
    assert!(store.find::<ReadinessRecord>("t1")?.is_none());
    Ok(())
}

#[test]
fn cleared_undecodable_row_does_not_gate() -> TestResult {
    let store = site("CLEARED")?;

    let outcome = engine(&store).request_start("t1")?;
    assert!(matches!(outcome, StartOutcome::Started { .. }), "got {outcome:?}");
    Ok(())
}

#[test]
fn filtering_skips_undecodable_rows() -> TestResult {
    let store = site("OPEN")?;
    seed(
        &store,
        &[ConstraintBuilder::new("c-hold", PROJECT, ConstraintType::AreaHold)
            .task("t2")
            .evidence("t2")
            .build()],
    );

    let open = filter_constraints(&store, PROJECT, Constraint::is_open)?;
    let ids: Vec<&str> = open.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c-hold"]);
    Ok(())
}
