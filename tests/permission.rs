// tests/permission.rs

mod common;
use crate::common::builders::{
    project_store, ConstraintBuilder, RfiBuilder, TaskBuilder, WorkPackageBuilder,
};
use crate::common::{engine, engine_with, fixed_now, hours_from_now, init_tracing, seed, PROJECT};

use std::error::Error;

use readygate::config::{ConfigFile, PermissionSection, RawConfigFile};
use readygate::errors::GateError;
use readygate::model::{ExecutionPermission, Task, WorkPackageReadiness};
use readygate::permission::{decide, RiskAssessment};
use readygate::store::{MemoryStore, StoreExt};
use readygate::types::{
    ConstraintType, OverridePolicy, PermissionStatus, ReadinessStatus, RiskLevel, Severity,
};

type TestResult = Result<(), Box<dyn Error>>;

fn config(policy: OverridePolicy, pm_at_high: bool) -> ConfigFile {
    let mut raw = RawConfigFile::default();
    raw.permission.override_policy = policy;
    raw.permission.pm_approval_at_high_risk = pm_at_high;
    ConfigFile::try_from(raw).expect("valid config")
}

fn package_with(task: Task) -> MemoryStore {
    let store = project_store(PROJECT);
    seed(&store, &[WorkPackageBuilder::new("wp-1", PROJECT).build()]);
    seed(&store, &[task]);
    store
}

fn plain_task() -> Task {
    TaskBuilder::erection("t1", PROJECT).package("wp-1").build()
}

fn permission(store: &MemoryStore) -> Result<ExecutionPermission, Box<dyn Error>> {
    Ok(store.require::<ExecutionPermission>("wp-1")?)
}

fn rollup(status: ReadinessStatus, blockers: usize, warnings: usize) -> WorkPackageReadiness {
    WorkPackageReadiness {
        work_package_id: "wp-1".to_string(),
        project_id: PROJECT.to_string(),
        lookahead_ready: status,
        lookahead_blockers: blockers,
        lookahead_warnings: warnings,
        task_count: 1,
        evaluated_at: fixed_now(),
    }
}

#[test]
fn transition_table() {
    let cfg = PermissionSection::default();
    let risk = |level, score| RiskAssessment { level, score };
    let none: Vec<String> = Vec::new();
    let review = vec!["bolt pattern".to_string()];

    let cases = [
        (ReadinessStatus::NotReady, RiskLevel::Low, &none, PermissionStatus::Blocked),
        (ReadinessStatus::Ready, RiskLevel::Critical, &none, PermissionStatus::Blocked),
        (ReadinessStatus::NotReady, RiskLevel::Low, &review, PermissionStatus::Blocked),
        (
            ReadinessStatus::Ready,
            RiskLevel::Medium,
            &review,
            PermissionStatus::EngineerReviewRequired,
        ),
        (ReadinessStatus::Ready, RiskLevel::Low, &review, PermissionStatus::EngineerReviewRequired),
        (
            ReadinessStatus::ReadyWithWarnings,
            RiskLevel::Medium,
            &none,
            PermissionStatus::PmApprovalRequired,
        ),
        (ReadinessStatus::Ready, RiskLevel::High, &none, PermissionStatus::Released),
        (ReadinessStatus::ReadyWithWarnings, RiskLevel::Low, &none, PermissionStatus::Released),
    ];

    for (readiness, level, reviews, expected) in cases {
        let decision = decide(&rollup(readiness, 0, 0), &risk(level, 0), reviews, &cfg);
        assert_eq!(
            decision.status, expected,
            "readiness={readiness} risk={level} reviews={reviews:?}"
        );
        assert_eq!(decision.reason.is_none(), expected == PermissionStatus::Released);
    }

    let strict = PermissionSection {
        pm_approval_at_high_risk: true,
        ..PermissionSection::default()
    };
    let decision = decide(
        &rollup(ReadinessStatus::Ready, 0, 0),
        &risk(RiskLevel::High, 20),
        &none,
        &strict,
    );
    assert_eq!(decision.status, PermissionStatus::PmApprovalRequired);
}

#[test]
fn ready_low_risk_package_is_released() -> TestResult {
    init_tracing();

    let store = package_with(plain_task());
    let perm = engine(&store).refresh_permission("wp-1")?;

    assert_eq!(perm.permission_status, PermissionStatus::Released);
    assert_eq!(perm.risk_level, RiskLevel::Low);
    assert_eq!(perm.risk_score, 0);
    assert!(perm.blocking_reason.is_none());
    assert_eq!(permission(&store)?, perm);
    Ok(())
}

#[test]
fn warnings_push_risk_to_medium_and_require_pm_approval() -> TestResult {
    let store = package_with(plain_task());
    seed(
        &store,
        &[
            RfiBuilder::new("rfi-1", PROJECT).links("t1").build(),
            RfiBuilder::new("rfi-2", PROJECT).links("t1").build(),
        ],
    );

    let perm = engine(&store).refresh_permission("wp-1")?;
    assert_eq!(perm.risk_score, 6);
    assert_eq!(perm.risk_level, RiskLevel::Medium);
    assert_eq!(perm.permission_status, PermissionStatus::PmApprovalRequired);
    Ok(())
}

#[test]
fn not_ready_package_is_blocked_with_reason() -> TestResult {
    let store = package_with(plain_task());
    seed(&store, &[RfiBuilder::new("rfi-1", PROJECT).blocker().links("t1").build()]);

    let perm = engine(&store).refresh_permission("wp-1")?;
    assert_eq!(perm.permission_status, PermissionStatus::Blocked);
    let reason = perm.blocking_reason.unwrap_or_default();
    assert!(reason.contains("1 blocker"), "reason: {reason}");
    Ok(())
}

#[test]
fn engineer_review_takes_precedence_over_pm_approval() -> TestResult {
    let store = package_with(plain_task());
    seed(
        &store,
        &[ConstraintBuilder::new("c-rev", PROJECT, ConstraintType::EngineerReviewRequired)
            .task("t1")
            .severity(Severity::Warning)
            .evidence("rev-1")
            .summary("moment connection check")
            .build()],
    );
    seed(
        &store,
        &[
            RfiBuilder::new("rfi-1", PROJECT).links("t1").build(),
            RfiBuilder::new("rfi-2", PROJECT).links("t1").build(),
        ],
    );

    let perm = engine(&store).refresh_permission("wp-1")?;
    assert_eq!(perm.risk_level, RiskLevel::Medium);
    assert_eq!(perm.permission_status, PermissionStatus::EngineerReviewRequired);
    assert!(perm
        .blocking_reason
        .unwrap_or_default()
        .contains("moment connection check"));
    Ok(())
}

#[test]
fn consumed_float_can_make_a_ready_package_critical() -> TestResult {
    // 240 hours late against baseline at 8 hours per point: score 30.
    let task = TaskBuilder::erection("t1", PROJECT)
        .package("wp-1")
        .baseline(hours_from_now(-240), hours_from_now(-200))
        .build();
    let store = package_with(task);

    let perm = engine(&store).refresh_permission("wp-1")?;
    assert_eq!(perm.risk_score, 30);
    assert_eq!(perm.risk_level, RiskLevel::Critical);
    assert_eq!(perm.permission_status, PermissionStatus::Blocked);
    assert!(perm.blocking_reason.unwrap_or_default().contains("critical"));
    Ok(())
}

#[test]
fn high_risk_needs_pm_approval_only_when_configured() -> TestResult {
    let task = TaskBuilder::erection("t1", PROJECT)
        .package("wp-1")
        .baseline(hours_from_now(-120), hours_from_now(-100))
        .build();

    let store = package_with(task.clone());
    let perm = engine(&store).refresh_permission("wp-1")?;
    assert_eq!(perm.risk_level, RiskLevel::High);
    assert_eq!(perm.permission_status, PermissionStatus::Released);

    let store = package_with(task);
    let engine = engine_with(&store, config(OverridePolicy::UntilBasisChanges, true));
    let perm = engine.refresh_permission("wp-1")?;
    assert_eq!(perm.permission_status, PermissionStatus::PmApprovalRequired);
    Ok(())
}

/// Package blocked by one blocker RFI (NOT_READY, risk 10 = medium).
fn blocked_package() -> MemoryStore {
    let store = package_with(plain_task());
    seed(&store, &[RfiBuilder::new("rfi-1", PROJECT).blocker().links("t1").build()]);
    store
}

#[test]
fn override_survives_recompute_until_its_basis_changes() -> TestResult {
    init_tracing();

    let store = blocked_package();
    let engine = engine(&store);
    engine.recompute_project(PROJECT)?;
    assert_eq!(permission(&store)?.permission_status, PermissionStatus::Blocked);

    let perm = engine.override_permission(
        "wp-1",
        PermissionStatus::Released,
        "pm@site",
        Some("crane booked"),
    )?;
    assert_eq!(perm.permission_status, PermissionStatus::Released);
    assert_eq!(perm.approved_by.as_deref(), Some("pm@site"));
    let manual = perm.manual_override.clone().ok_or("override recorded")?;
    assert_eq!(manual.basis_readiness, ReadinessStatus::NotReady);
    assert_eq!(manual.basis_risk, RiskLevel::Medium);

    // Same readiness, same risk: the override holds.
    engine.recompute_project(PROJECT)?;
    let held = permission(&store)?;
    assert_eq!(held.permission_status, PermissionStatus::Released);
    assert!(held.manual_override.is_some());

    // A second blocker raises risk to high: automatic computation resumes.
    seed(&store, &[RfiBuilder::new("rfi-2", PROJECT).blocker().links("t1").build()]);
    engine.recompute_project(PROJECT)?;
    let resumed = permission(&store)?;
    assert_eq!(resumed.risk_level, RiskLevel::High);
    assert_eq!(resumed.permission_status, PermissionStatus::Blocked);
    assert!(resumed.manual_override.is_none());
    assert!(resumed.approved_by.is_none());
    Ok(())
}

#[test]
fn sticky_override_survives_basis_changes() -> TestResult {
    let store = blocked_package();
    let engine = engine_with(&store, config(OverridePolicy::Sticky, false));

    engine.override_permission("wp-1", PermissionStatus::Released, "pm@site", None)?;
    seed(&store, &[RfiBuilder::new("rfi-2", PROJECT).blocker().links("t1").build()]);
    engine.recompute_project(PROJECT)?;

    let perm = permission(&store)?;
    assert_eq!(perm.permission_status, PermissionStatus::Released);
    assert_eq!(perm.risk_level, RiskLevel::High);
    Ok(())
}

#[test]
fn discard_policy_replaces_override_on_next_recompute() -> TestResult {
    let store = blocked_package();
    let engine = engine_with(&store, config(OverridePolicy::Discard, false));

    engine.override_permission("wp-1", PermissionStatus::Released, "pm@site", None)?;
    engine.recompute_project(PROJECT)?;

    let perm = permission(&store)?;
    assert_eq!(perm.permission_status, PermissionStatus::Blocked);
    assert!(perm.manual_override.is_none());
    Ok(())
}

#[test]
fn clearing_an_override_recomputes_automatically() -> TestResult {
    let store = blocked_package();
    let engine = engine(&store);

    engine.override_permission("wp-1", PermissionStatus::Released, "pm@site", None)?;
    let perm = engine.clear_override("wp-1")?;

    assert_eq!(perm.permission_status, PermissionStatus::Blocked);
    assert!(perm.manual_override.is_none());
    assert!(perm.approved_by.is_none());
    Ok(())
}

#[test]
fn override_requires_an_approver() {
    let store = blocked_package();
    let err = engine(&store)
        .override_permission("wp-1", PermissionStatus::Released, "  ", None)
        .unwrap_err();
    assert!(matches!(err, GateError::Validation(_)));
    assert!(store.find::<ExecutionPermission>("wp-1").unwrap().is_none());
}
