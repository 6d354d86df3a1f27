// tests/readiness_scenarios.rs

mod common;
use crate::common::builders::{
    project_store, ConstraintBuilder, DeliveryBuilder, DrawingSetBuilder, RfiBuilder, TaskBuilder,
    WorkPackageBuilder,
};
use crate::common::{fixed_now, init_tracing, seed, PROJECT};

use std::error::Error;

use readygate::model::{ReadinessRecord, Task};
use readygate::readiness::evaluate_task;
use readygate::store::{MemoryStore, StoreExt};
use readygate::types::{ConstraintType, ReadinessStatus, RfiStatus, Severity, TaskStatus};

type TestResult = Result<(), Box<dyn Error>>;

fn evaluate(store: &MemoryStore, task_id: &str) -> Result<ReadinessRecord, Box<dyn Error>> {
    let task = store.require::<Task>(task_id)?;
    let record =
        evaluate_task(store, &task, fixed_now())?.ok_or("erection task should be evaluated")?;
    Ok(record)
}

fn store_with_task(task: Task) -> MemoryStore {
    let store = project_store(PROJECT);
    seed(&store, &[WorkPackageBuilder::new("wp-1", PROJECT).build()]);
    seed(&store, &[task]);
    store
}

#[test]
fn task_without_conditions_is_ready() -> TestResult {
    init_tracing();

    let store = store_with_task(TaskBuilder::erection("t1", PROJECT).package("wp-1").build());
    let record = evaluate(&store, "t1")?;

    assert_eq!(record.readiness_status, ReadinessStatus::Ready);
    assert_eq!(record.blocker_count, 0);
    assert_eq!(record.warning_count, 0);
    assert!(record.drivers.is_empty());

    // The record is persisted, the task is untouched.
    let cached = store.require::<ReadinessRecord>("t1")?;
    assert_eq!(cached, record);
    assert_eq!(store.require::<Task>("t1")?.status, TaskStatus::NotStarted);
    Ok(())
}

#[test]
fn blocker_rfi_makes_task_not_ready_with_driver() -> TestResult {
    init_tracing();

    let store = store_with_task(TaskBuilder::erection("t1", PROJECT).build());
    seed(
        &store,
        &[RfiBuilder::new("rfi-12", PROJECT)
            .number("12")
            .blocker()
            .links("t1")
            .build()],
    );

    let record = evaluate(&store, "t1")?;
    assert_eq!(record.readiness_status, ReadinessStatus::NotReady);
    assert_eq!(record.blocker_count, 1);
    assert_eq!(record.drivers.len(), 1);
    assert!(record.drivers[0].contains("rfi-12"), "driver: {}", record.drivers[0]);
    assert!(record.drivers[0].starts_with("RFI_RESPONSE_REQUIRED [BLOCKER]"));
    Ok(())
}

#[test]
fn rfi_grading_follows_status_and_blocker_flag() -> TestResult {
    let store = store_with_task(TaskBuilder::erection("t1", PROJECT).build());
    seed(
        &store,
        &[
            RfiBuilder::new("rfi-warn", PROJECT)
                .status(RfiStatus::UnderReview)
                .links("t1")
                .build(),
            RfiBuilder::new("rfi-draft", PROJECT)
                .status(RfiStatus::Draft)
                .blocker()
                .links("t1")
                .build(),
            RfiBuilder::new("rfi-closed", PROJECT)
                .status(RfiStatus::Closed)
                .blocker()
                .links("t1")
                .build(),
        ],
    );

    let record = evaluate(&store, "t1")?;
    assert_eq!(record.readiness_status, ReadinessStatus::ReadyWithWarnings);
    assert_eq!(record.blocker_count, 0);
    assert_eq!(record.warning_count, 1);
    assert!(record.drivers[0].contains("rfi-warn"));
    Ok(())
}

#[test]
fn unreleased_drawing_blocks_and_released_does_not() -> TestResult {
    let store = store_with_task(
        TaskBuilder::erection("t1", PROJECT)
            .drawing("ds-open")
            .drawing("ds-done")
            .build(),
    );
    seed(
        &store,
        &[
            DrawingSetBuilder::new("ds-open", PROJECT).name("Level 2 framing").build(),
            DrawingSetBuilder::new("ds-done", PROJECT).released().build(),
        ],
    );

    let record = evaluate(&store, "t1")?;
    assert_eq!(record.readiness_status, ReadinessStatus::NotReady);
    assert_eq!(record.blocker_count, 1);
    assert!(record.drivers[0].starts_with("DRAWING_NOT_RELEASED"));
    assert!(record.drivers[0].contains("Level 2 framing"));
    Ok(())
}

#[test]
fn pending_package_delivery_warns_unless_task_is_gated_on_it() -> TestResult {
    let store = store_with_task(TaskBuilder::erection("t1", PROJECT).package("wp-1").build());
    seed(
        &store,
        &[TaskBuilder::erection("t2", PROJECT)
            .package("wp-1")
            .gated_on("del-1")
            .build()],
    );
    seed(&store, &[DeliveryBuilder::new("del-1", PROJECT).package("wp-1").build()]);

    let warned = evaluate(&store, "t1")?;
    assert_eq!(warned.readiness_status, ReadinessStatus::ReadyWithWarnings);
    assert_eq!(warned.warning_count, 1);

    // Package delivery and gating delivery are the same condition: counted
    // once, as a blocker.
    let gated = evaluate(&store, "t2")?;
    assert_eq!(gated.readiness_status, ReadinessStatus::NotReady);
    assert_eq!(gated.blocker_count, 1);
    assert_eq!(gated.warning_count, 0);
    Ok(())
}

#[test]
fn area_hold_and_incomplete_predecessor_are_blockers() -> TestResult {
    let store = project_store(PROJECT);
    seed(
        &store,
        &[
            TaskBuilder::erection("p1", PROJECT)
                .name("Set columns")
                .status(TaskStatus::InProgress)
                .build(),
            TaskBuilder::erection("p2", PROJECT).status(TaskStatus::Completed).build(),
            TaskBuilder::erection("t1", PROJECT)
                .predecessor("p1")
                .predecessor("p2")
                .area("Grid A-C")
                .held("crane inspection")
                .build(),
        ],
    );

    let record = evaluate(&store, "t1")?;
    assert_eq!(record.readiness_status, ReadinessStatus::NotReady);
    assert_eq!(record.blocker_count, 2);
    let has_driver = |prefix: &str, detail: &str| {
        record
            .drivers
            .iter()
            .any(|d| d.starts_with(prefix) && d.contains(detail))
    };
    assert!(has_driver("AREA_HOLD", "crane inspection"));
    assert!(has_driver("PREDECESSOR_INCOMPLETE", "p1"));
    assert!(!record.drivers.iter().any(|d| d.contains("(p2)")));
    Ok(())
}

#[test]
fn missing_linked_records_are_treated_as_absent() -> TestResult {
    init_tracing();

    let store = store_with_task(
        TaskBuilder::erection("t1", PROJECT)
            .drawing("ds-gone")
            .gated_on("del-gone")
            .predecessor("pred-gone")
            .build(),
    );

    let record = evaluate(&store, "t1")?;
    assert_eq!(record.readiness_status, ReadinessStatus::Ready);
    Ok(())
}

#[test]
fn persisted_constraints_apply_by_task_and_package_scope() -> TestResult {
    let store = store_with_task(TaskBuilder::erection("t1", PROJECT).package("wp-1").build());
    seed(
        &store,
        &[
            ConstraintBuilder::new("c-pkg", PROJECT, ConstraintType::EngineerReviewRequired)
                .package("wp-1")
                .evidence("review-7")
                .summary("connection redesign")
                .build(),
            ConstraintBuilder::new("c-other", PROJECT, ConstraintType::Other)
                .task("t1")
                .severity(Severity::Blocker)
                .evidence("site-note")
                .build(),
            ConstraintBuilder::new("c-cleared", PROJECT, ConstraintType::Other)
                .task("t1")
                .severity(Severity::Blocker)
                .evidence("old-note")
                .cleared()
                .build(),
            ConstraintBuilder::new("c-elsewhere", PROJECT, ConstraintType::Other)
                .task("t9")
                .severity(Severity::Blocker)
                .evidence("x")
                .build(),
        ],
    );

    let record = evaluate(&store, "t1")?;
    assert_eq!(record.readiness_status, ReadinessStatus::NotReady);
    assert_eq!(record.blocker_count, 1);
    assert_eq!(record.warning_count, 1);
    // Blockers are listed first.
    assert!(record.drivers[0].starts_with("OTHER [BLOCKER]"));
    assert!(record.drivers[1].contains("connection redesign"));
    Ok(())
}

#[test]
fn persisted_and_implicit_twins_count_once_at_the_stronger_grade() -> TestResult {
    let store = store_with_task(TaskBuilder::erection("t1", PROJECT).build());
    seed(&store, &[RfiBuilder::new("rfi-1", PROJECT).blocker().links("t1").build()]);
    seed(
        &store,
        &[ConstraintBuilder::new("c-rfi", PROJECT, ConstraintType::RfiResponseRequired)
            .task("t1")
            .severity(Severity::Warning)
            .evidence("rfi-1")
            .build()],
    );

    let record = evaluate(&store, "t1")?;
    assert_eq!(record.blocker_count, 1);
    assert_eq!(record.warning_count, 0);
    assert_eq!(record.drivers.len(), 1);
    Ok(())
}

#[test]
fn non_erection_tasks_are_not_evaluated() -> TestResult {
    let store = store_with_task(TaskBuilder::other("t1", PROJECT).held("weather").build());
    let task = store.require::<Task>("t1")?;

    assert!(evaluate_task(&store, &task, fixed_now())?.is_none());
    assert!(store.find::<ReadinessRecord>("t1")?.is_none());
    Ok(())
}
