// src/permission/machine.rs

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::{ConfigFile, PermissionSection};
use crate::constraint::filter_constraints;
use crate::errors::{GateError, Result};
use crate::model::{ExecutionPermission, ManualOverride, Task, WorkPackage, WorkPackageReadiness};
use crate::permission::risk::{assess_risk, RiskAssessment};
use crate::readiness::rollup_package;
use crate::store::{EntityStore, StoreExt};
use crate::types::{ConstraintType, OverridePolicy, PermissionStatus, ReadinessStatus, RiskLevel};

/// Automatic permission decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub status: PermissionStatus,
    pub reason: Option<String>,
}

/// Transition function.
///
/// - NOT_READY readiness or critical risk: `BLOCKED`.
/// - Any open engineer-review constraint: `ENGINEER_REVIEW_REQUIRED`,
///   whatever the (non-critical) risk.
/// - Medium risk (and high risk when configured): `PM_APPROVAL_REQUIRED`.
/// - Otherwise `RELEASED`.
pub fn decide(
    rollup: &WorkPackageReadiness,
    risk: &RiskAssessment,
    engineer_reviews: &[String],
    cfg: &PermissionSection,
) -> Decision {
    match (rollup.lookahead_ready, risk.level) {
        (ReadinessStatus::NotReady, _) => Decision {
            status: PermissionStatus::Blocked,
            reason: Some(format!(
                "{} blocker(s) across {} task(s)",
                rollup.lookahead_blockers, rollup.task_count
            )),
        },
        (_, RiskLevel::Critical) => Decision {
            status: PermissionStatus::Blocked,
            reason: Some(format!("critical risk (score {})", risk.score)),
        },
        _ if !engineer_reviews.is_empty() => Decision {
            status: PermissionStatus::EngineerReviewRequired,
            reason: Some(format!("engineer review required: {}", engineer_reviews.join("; "))),
        },
        (_, RiskLevel::Medium) => Decision {
            status: PermissionStatus::PmApprovalRequired,
            reason: Some(format!("medium risk (score {}) requires PM approval", risk.score)),
        },
        (_, RiskLevel::High) if cfg.pm_approval_at_high_risk => Decision {
            status: PermissionStatus::PmApprovalRequired,
            reason: Some(format!("high risk (score {}) requires PM approval", risk.score)),
        },
        (_, RiskLevel::Low | RiskLevel::High) => Decision {
            status: PermissionStatus::Released,
            reason: None,
        },
    }
}

/// The override that survives a recomputation under `policy`, if any.
pub fn retained_override(
    existing: Option<&ExecutionPermission>,
    readiness: ReadinessStatus,
    risk: RiskLevel,
    policy: OverridePolicy,
) -> Option<ManualOverride> {
    let current = existing?.manual_override.as_ref()?;
    match policy {
        OverridePolicy::Sticky => Some(current.clone()),
        OverridePolicy::Discard => None,
        OverridePolicy::UntilBasisChanges => {
            if current.basis_readiness == readiness && current.basis_risk == risk {
                Some(current.clone())
            } else {
                None
            }
        }
    }
}

/// Re-derive and overwrite a package's [`ExecutionPermission`] from its
/// rollup.
pub fn refresh_permission<S: EntityStore + ?Sized>(
    store: &S,
    cfg: &ConfigFile,
    package: &WorkPackage,
    rollup: &WorkPackageReadiness,
    now: DateTime<Utc>,
) -> Result<ExecutionPermission> {
    let (risk, engineer_reviews) = package_signals(store, cfg, package, rollup, now)?;
    let decision = decide(rollup, &risk, &engineer_reviews, &cfg.permission);

    let existing = store.find::<ExecutionPermission>(&package.id)?;
    let kept = retained_override(
        existing.as_ref(),
        rollup.lookahead_ready,
        risk.level,
        cfg.permission.override_policy,
    );

    if kept.is_none() {
        if let Some(dropped) = existing.as_ref().and_then(|p| p.manual_override.as_ref()) {
            info!(
                work_package = %package.id,
                approved_by = %dropped.approved_by,
                readiness = %rollup.lookahead_ready,
                risk = %risk.level,
                "manual override no longer applies; resuming automatic permission"
            );
        }
    }

    let permission = match kept {
        Some(o) => ExecutionPermission {
            work_package_id: package.id.clone(),
            project_id: package.project_id.clone(),
            permission_status: o.status,
            blocking_reason: override_reason(&o),
            risk_level: risk.level,
            risk_score: risk.score,
            approved_by: Some(o.approved_by.clone()),
            manual_override: Some(o),
            evaluated_at: now,
        },
        None => ExecutionPermission {
            work_package_id: package.id.clone(),
            project_id: package.project_id.clone(),
            permission_status: decision.status,
            blocking_reason: decision.reason,
            risk_level: risk.level,
            risk_score: risk.score,
            approved_by: None,
            manual_override: None,
            evaluated_at: now,
        },
    };

    store.upsert_entity(&permission)?;

    let previous = existing.map(|p| p.permission_status);
    if previous != Some(permission.permission_status) {
        info!(
            work_package = %package.id,
            from = ?previous,
            to = %permission.permission_status,
            risk = %permission.risk_level,
            "execution permission changed"
        );
    } else {
        debug!(
            work_package = %package.id,
            status = %permission.permission_status,
            "execution permission unchanged"
        );
    }
    Ok(permission)
}

/// Manually set a package's permission on behalf of `actor`.
///
/// The override is recorded against the package's current readiness and risk
/// so the configured policy can tell when it stops applying.
pub fn override_permission<S: EntityStore + ?Sized>(
    store: &S,
    cfg: &ConfigFile,
    package_id: &str,
    status: PermissionStatus,
    actor: &str,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ExecutionPermission> {
    if actor.trim().is_empty() {
        return Err(GateError::Validation(
            "a manual override requires an approver identity".to_string(),
        ));
    }

    let package = store.require::<WorkPackage>(package_id)?;
    let rollup = rollup_package(store, &package, now)?;
    let (risk, _) = package_signals(store, cfg, &package, &rollup, now)?;

    let manual = ManualOverride {
        status,
        approved_by: actor.to_string(),
        approved_at: now,
        reason: reason.map(str::to_string),
        basis_readiness: rollup.lookahead_ready,
        basis_risk: risk.level,
    };

    let permission = ExecutionPermission {
        work_package_id: package.id.clone(),
        project_id: package.project_id.clone(),
        permission_status: status,
        blocking_reason: override_reason(&manual),
        risk_level: risk.level,
        risk_score: risk.score,
        approved_by: Some(actor.to_string()),
        manual_override: Some(manual),
        evaluated_at: now,
    };
    store.upsert_entity(&permission)?;

    info!(
        work_package = %package.id,
        status = %status,
        approved_by = %actor,
        readiness = %rollup.lookahead_ready,
        risk = %risk.level,
        "manual permission override recorded"
    );
    Ok(permission)
}

/// Drop any manual override and recompute automatically.
pub fn clear_override<S: EntityStore + ?Sized>(
    store: &S,
    cfg: &ConfigFile,
    package_id: &str,
    now: DateTime<Utc>,
) -> Result<ExecutionPermission> {
    let package = store.require::<WorkPackage>(package_id)?;

    if let Some(mut existing) = store.find::<ExecutionPermission>(package_id)? {
        if existing.manual_override.take().is_some() {
            existing.approved_by = None;
            store.update_entity(&existing)?;
            info!(work_package = %package_id, "manual permission override cleared");
        }
    }

    let rollup = match store.find::<WorkPackageReadiness>(package_id)? {
        Some(r) => r,
        None => rollup_package(store, &package, now)?,
    };
    refresh_permission(store, cfg, &package, &rollup, now)
}

fn override_reason(o: &ManualOverride) -> Option<String> {
    match &o.reason {
        Some(reason) => Some(format!("manual override by {}: {}", o.approved_by, reason)),
        None => Some(format!("manual override by {}", o.approved_by)),
    }
}

/// Risk and open engineer reviews for a package.
fn package_signals<S: EntityStore + ?Sized>(
    store: &S,
    cfg: &ConfigFile,
    package: &WorkPackage,
    rollup: &WorkPackageReadiness,
    now: DateTime<Utc>,
) -> Result<(RiskAssessment, Vec<String>)> {
    let tasks = store.filter::<Task>(&package.project_id, |t| {
        t.work_package_id.as_deref() == Some(package.id.as_str())
    })?;
    let erection: Vec<Task> = tasks.iter().filter(|t| t.is_erection()).cloned().collect();
    let risk = assess_risk(&cfg.risk, rollup, &erection, now);

    let reviews = filter_constraints(store, &package.project_id, |c| {
        c.is_open()
            && c.constraint_type == ConstraintType::EngineerReviewRequired
            && (c.work_package_id.as_deref() == Some(package.id.as_str())
                || c
                    .task_id
                    .as_deref()
                    .is_some_and(|id| tasks.iter().any(|t| t.id == id)))
    })?;
    let summaries = reviews
        .into_iter()
        .map(|c| {
            if c.summary.is_empty() {
                c.id
            } else {
                c.summary
            }
        })
        .collect();

    Ok((risk, summaries))
}
