// src/permission/risk.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::RiskSection;
use crate::model::{Task, WorkPackageReadiness};
use crate::schedule::float_consumed_hours;
use crate::types::RiskLevel;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub score: u32,
}

/// Score a package.
///
/// `blockers * blocker_weight + warnings * warning_weight
///  + floor(max consumed float / float_hours_per_point)
///  + held tasks * hold_weight`
pub fn assess_risk(
    cfg: &RiskSection,
    rollup: &WorkPackageReadiness,
    tasks: &[Task],
    now: DateTime<Utc>,
) -> RiskAssessment {
    let blockers = saturating_u32(rollup.lookahead_blockers).saturating_mul(cfg.blocker_weight);
    let warnings = saturating_u32(rollup.lookahead_warnings).saturating_mul(cfg.warning_weight);

    let max_float = tasks
        .iter()
        .filter(|t| !t.status.is_terminal())
        .map(|t| float_consumed_hours(t, now).max(t.float_consumed_hours))
        .fold(0.0_f64, f64::max);
    let float_points = (max_float / cfg.float_hours_per_point).floor() as u32;

    let held = tasks.iter().filter(|t| t.hold_area).count();
    let hold_points = saturating_u32(held).saturating_mul(cfg.hold_weight);

    let score = blockers
        .saturating_add(warnings)
        .saturating_add(float_points)
        .saturating_add(hold_points);

    RiskAssessment {
        level: score_level(cfg, score),
        score,
    }
}

pub fn score_level(cfg: &RiskSection, score: u32) -> RiskLevel {
    if score >= cfg.critical_threshold {
        RiskLevel::Critical
    } else if score >= cfg.high_threshold {
        RiskLevel::High
    } else if score >= cfg.medium_threshold {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
