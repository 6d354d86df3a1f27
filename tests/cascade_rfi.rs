// tests/cascade_rfi.rs

mod common;
use crate::common::builders::{project_store, RfiBuilder, TaskBuilder, WorkPackageBuilder};
use crate::common::{engine, hours_from_now, init_tracing, notification, seed, PROJECT};

use std::error::Error;

use readygate::engine::EventKind;
use readygate::model::{Constraint, ExecutionPermission, ReadinessRecord, Rfi, Task};
use readygate::store::{MemoryStore, StoreExt};
use readygate::types::{PermissionStatus, ReadinessStatus, RfiStatus, TaskStatus};

type TestResult = Result<(), Box<dyn Error>>;

fn store_with(tasks: &[Task]) -> MemoryStore {
    let store = project_store(PROJECT);
    seed(&store, &[WorkPackageBuilder::new("wp-1", PROJECT).build()]);
    seed(&store, tasks);
    store
}

fn blocker_rfi(id: &str, task: &str) -> Rfi {
    RfiBuilder::new(id, PROJECT)
        .number(&id.replace("rfi-", ""))
        .subject("embed plate conflict at grid C4")
        .blocker()
        .links(task)
        .build()
}

fn with_status(rfi: &Rfi, status: RfiStatus) -> Rfi {
    Rfi {
        status,
        ..rfi.clone()
    }
}

fn open_constraints(store: &MemoryStore) -> Result<Vec<Constraint>, Box<dyn Error>> {
    Ok(store.filter::<Constraint>(PROJECT, Constraint::is_open)?)
}

fn readiness(store: &MemoryStore, task_id: &str) -> Result<ReadinessRecord, Box<dyn Error>> {
    Ok(store.require::<ReadinessRecord>(task_id)?)
}

#[test]
fn closing_a_blocker_rfi_clears_and_unblocks() -> TestResult {
    init_tracing();

    let store = store_with(&[TaskBuilder::erection("t1", PROJECT).package("wp-1").build()]);
    let engine = engine(&store);
    let rfi = blocker_rfi("rfi-12", "t1");

    seed(&store, &[rfi.clone()]);
    let report = engine.handle_notification(&notification(EventKind::Create, &rfi))?;
    assert!(report.is_clean(), "failures: {:?}", report.failures);
    assert_eq!(report.project_id.as_deref(), Some(PROJECT));
    assert_eq!(report.constraints_opened, 1);
    assert_eq!(report.tasks_blocked, vec!["t1".to_string()]);
    assert_eq!(report.tasks_evaluated, 1);
    assert_eq!(report.packages_rolled_up, 1);
    assert_eq!(report.permissions_refreshed, 1);

    let record = readiness(&store, "t1")?;
    assert_eq!(record.readiness_status, ReadinessStatus::NotReady);
    assert_eq!(record.blocker_count, 1);
    assert!(record.drivers[0].contains("rfi-12"), "drivers: {:?}", record.drivers);
    assert_eq!(store.require::<Task>("t1")?.status, TaskStatus::Blocked);
    assert_eq!(
        store.require::<ExecutionPermission>("wp-1")?.permission_status,
        PermissionStatus::Blocked
    );

    let closed = with_status(&rfi, RfiStatus::Closed);
    seed(&store, &[closed.clone()]);
    let report = engine.handle_notification(&notification(EventKind::Update, &closed))?;
    assert!(report.is_clean());
    assert_eq!(report.constraints_cleared, 1);
    assert_eq!(report.tasks_unblocked, vec!["t1".to_string()]);

    assert!(open_constraints(&store)?.is_empty());
    let record = readiness(&store, "t1")?;
    assert_eq!(record.readiness_status, ReadinessStatus::Ready);
    assert!(record.drivers.is_empty());
    assert_eq!(store.require::<Task>("t1")?.status, TaskStatus::NotStarted);
    assert_eq!(
        store.require::<ExecutionPermission>("wp-1")?.permission_status,
        PermissionStatus::Released
    );
    Ok(())
}

#[test]
fn started_task_resumes_in_progress() -> TestResult {
    let task = TaskBuilder::erection("t1", PROJECT)
        .package("wp-1")
        .status(TaskStatus::InProgress)
        .started_at(hours_from_now(-6))
        .build();
    let store = store_with(&[task]);
    let engine = engine(&store);
    let rfi = blocker_rfi("rfi-3", "t1");

    seed(&store, &[rfi.clone()]);
    engine.handle_notification(&notification(EventKind::Create, &rfi))?;
    assert_eq!(store.require::<Task>("t1")?.status, TaskStatus::Blocked);

    let answered = with_status(&rfi, RfiStatus::Answered);
    seed(&store, &[answered.clone()]);
    engine.handle_notification(&notification(EventKind::Update, &answered))?;

    let task = store.require::<Task>("t1")?;
    assert_eq!(task.status, TaskStatus::InProgress);
    assert_eq!(task.actual_start, Some(hours_from_now(-6)));
    Ok(())
}

#[test]
fn replayed_notifications_converge() -> TestResult {
    let store = store_with(&[TaskBuilder::erection("t1", PROJECT).package("wp-1").build()]);
    let engine = engine(&store);
    let rfi = blocker_rfi("rfi-4", "t1");
    seed(&store, &[rfi.clone()]);

    let create = notification(EventKind::Create, &rfi);
    engine.handle_notification(&create)?;
    let replay = engine.handle_notification(&create)?;
    assert_eq!(replay.constraints_opened, 0);
    assert!(replay.tasks_blocked.is_empty());
    assert_eq!(open_constraints(&store)?.len(), 1);
    assert_eq!(readiness(&store, "t1")?.blocker_count, 1);

    let closed = with_status(&rfi, RfiStatus::Closed);
    seed(&store, &[closed.clone()]);
    let close = notification(EventKind::Update, &closed);
    engine.handle_notification(&close)?;
    let replay = engine.handle_notification(&close)?;
    assert_eq!(replay.constraints_cleared, 0);
    assert!(replay.tasks_unblocked.is_empty());
    assert_eq!(store.require::<Task>("t1")?.status, TaskStatus::NotStarted);

    // Cleared history is kept, never duplicated.
    assert_eq!(store.all::<Constraint>(PROJECT)?.len(), 1);
    Ok(())
}

#[test]
fn non_blocker_rfi_warns_without_blocking_the_task() -> TestResult {
    let store = store_with(&[TaskBuilder::erection("t1", PROJECT).package("wp-1").build()]);
    let rfi = RfiBuilder::new("rfi-5", PROJECT).links("t1").build();
    seed(&store, &[rfi.clone()]);

    let report = engine(&store).handle_notification(&notification(EventKind::Create, &rfi))?;
    assert_eq!(report.constraints_opened, 1);
    assert!(report.tasks_blocked.is_empty());
    assert_eq!(store.require::<Task>("t1")?.status, TaskStatus::NotStarted);
    assert_eq!(
        readiness(&store, "t1")?.readiness_status,
        ReadinessStatus::ReadyWithWarnings
    );
    Ok(())
}

#[test]
fn task_stays_blocked_while_another_blocker_rfi_is_open() -> TestResult {
    let store = store_with(&[TaskBuilder::erection("t1", PROJECT).package("wp-1").build()]);
    let engine = engine(&store);
    let first = blocker_rfi("rfi-6", "t1");
    let second = blocker_rfi("rfi-7", "t1");
    seed(&store, &[first.clone(), second.clone()]);

    engine.handle_notification(&notification(EventKind::Create, &first))?;
    engine.handle_notification(&notification(EventKind::Create, &second))?;
    assert_eq!(readiness(&store, "t1")?.blocker_count, 2);

    let closed = with_status(&first, RfiStatus::Closed);
    seed(&store, &[closed.clone()]);
    let report = engine.handle_notification(&notification(EventKind::Update, &closed))?;

    assert_eq!(report.constraints_cleared, 1);
    assert!(report.tasks_unblocked.is_empty());
    assert_eq!(store.require::<Task>("t1")?.status, TaskStatus::Blocked);
    let record = readiness(&store, "t1")?;
    assert_eq!(record.readiness_status, ReadinessStatus::NotReady);
    assert_eq!(record.blocker_count, 1);
    Ok(())
}

#[test]
fn held_task_is_not_released_by_an_rfi_closing() -> TestResult {
    let task = TaskBuilder::erection("t1", PROJECT)
        .package("wp-1")
        .area("Grid A-C")
        .held("crane exclusion zone")
        .status(TaskStatus::OnHold)
        .build();
    let store = store_with(&[task]);
    let engine = engine(&store);
    let rfi = blocker_rfi("rfi-8", "t1");
    seed(&store, &[rfi.clone()]);
    engine.handle_notification(&notification(EventKind::Create, &rfi))?;

    let closed = with_status(&rfi, RfiStatus::Closed);
    seed(&store, &[closed.clone()]);
    let report = engine.handle_notification(&notification(EventKind::Update, &closed))?;

    assert!(report.tasks_unblocked.is_empty());
    assert_eq!(store.require::<Task>("t1")?.status, TaskStatus::OnHold);
    Ok(())
}

#[test]
fn deleted_rfi_clears_its_constraints() -> TestResult {
    let store = store_with(&[TaskBuilder::erection("t1", PROJECT).package("wp-1").build()]);
    let engine = engine(&store);
    let rfi = blocker_rfi("rfi-9", "t1");
    seed(&store, &[rfi.clone()]);
    engine.handle_notification(&notification(EventKind::Create, &rfi))?;

    let report = engine.handle_notification(&notification(EventKind::Delete, &rfi))?;
    assert_eq!(report.constraints_cleared, 1);
    assert_eq!(report.tasks_unblocked, vec!["t1".to_string()]);
    assert!(open_constraints(&store)?.is_empty());
    Ok(())
}

#[test]
fn after_image_stands_in_for_a_record_not_yet_stored() -> TestResult {
    let store = store_with(&[TaskBuilder::erection("t1", PROJECT).package("wp-1").build()]);
    let rfi = blocker_rfi("rfi-10", "t1");

    let report = engine(&store).handle_notification(&notification(EventKind::Create, &rfi))?;
    assert_eq!(report.constraints_opened, 1);

    let open = open_constraints(&store)?;
    assert_eq!(open.len(), 1);
    assert!(open[0].has_evidence("rfi-10"));
    assert_eq!(open[0].task_id.as_deref(), Some("t1"));
    assert_eq!(readiness(&store, "t1")?.readiness_status, ReadinessStatus::NotReady);
    Ok(())
}

#[test]
fn unlinking_a_task_clears_its_rfi_constraint() -> TestResult {
    let store = store_with(&[
        TaskBuilder::erection("t1", PROJECT).package("wp-1").build(),
        TaskBuilder::erection("t2", PROJECT).package("wp-1").build(),
    ]);
    let engine = engine(&store);
    let rfi = RfiBuilder::new("rfi-11", PROJECT).links("t1").links("t2").build();
    seed(&store, &[rfi.clone()]);
    engine.handle_notification(&notification(EventKind::Create, &rfi))?;
    assert_eq!(open_constraints(&store)?.len(), 2);

    let narrowed = RfiBuilder::new("rfi-11", PROJECT).links("t1").build();
    seed(&store, &[narrowed.clone()]);
    let report = engine.handle_notification(&notification(EventKind::Update, &narrowed))?;

    assert_eq!(report.constraints_cleared, 1);
    let open = open_constraints(&store)?;
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].task_id.as_deref(), Some("t1"));
    assert_eq!(readiness(&store, "t2")?.readiness_status, ReadinessStatus::Ready);
    Ok(())
}
