// src/types.rs

//! Closed enumerations shared by the model, the evaluators and the config.
//!
//! Every decision the engine makes (severity grading, readiness verdicts,
//! permission transitions) is an exhaustive `match` over one of these.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of schedulable unit. Only erection tasks are gated on readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Erection,
    Other,
}

impl Default for TaskType {
    fn default() -> Self {
        TaskType::Other
    }
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Blocked,
    OnHold,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Completed and cancelled tasks take no further automatic transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::NotStarted
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::OnHold => "on_hold",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkPackageStatus {
    Active,
    OnHold,
    Complete,
}

impl Default for WorkPackageStatus {
    fn default() -> Self {
        WorkPackageStatus::Active
    }
}

/// Project phase a work package belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Detailing,
    Fabrication,
    Delivery,
    Erection,
    Closeout,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Erection
    }
}

/// Typed blocking condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintType {
    DrawingNotReleased,
    RfiResponseRequired,
    DeliveryPending,
    AreaHold,
    PredecessorIncomplete,
    EngineerReviewRequired,
    Other,
}

impl ConstraintType {
    /// Severity applied when a constraint is opened without an explicit grade.
    pub fn default_severity(&self) -> Severity {
        match self {
            ConstraintType::DrawingNotReleased => Severity::Blocker,
            ConstraintType::RfiResponseRequired => Severity::Blocker,
            ConstraintType::DeliveryPending => Severity::Warning,
            ConstraintType::AreaHold => Severity::Blocker,
            ConstraintType::PredecessorIncomplete => Severity::Blocker,
            ConstraintType::EngineerReviewRequired => Severity::Warning,
            ConstraintType::Other => Severity::Warning,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintType::DrawingNotReleased => "DRAWING_NOT_RELEASED",
            ConstraintType::RfiResponseRequired => "RFI_RESPONSE_REQUIRED",
            ConstraintType::DeliveryPending => "DELIVERY_PENDING",
            ConstraintType::AreaHold => "AREA_HOLD",
            ConstraintType::PredecessorIncomplete => "PREDECESSOR_INCOMPLETE",
            ConstraintType::EngineerReviewRequired => "ENGINEER_REVIEW_REQUIRED",
            ConstraintType::Other => "OTHER",
        }
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConstraintType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DRAWING_NOT_RELEASED" => Ok(ConstraintType::DrawingNotReleased),
            "RFI_RESPONSE_REQUIRED" => Ok(ConstraintType::RfiResponseRequired),
            "DELIVERY_PENDING" => Ok(ConstraintType::DeliveryPending),
            "AREA_HOLD" => Ok(ConstraintType::AreaHold),
            "PREDECESSOR_INCOMPLETE" => Ok(ConstraintType::PredecessorIncomplete),
            "ENGINEER_REVIEW_REQUIRED" => Ok(ConstraintType::EngineerReviewRequired),
            "OTHER" => Ok(ConstraintType::Other),
            other => Err(format!("unknown constraint type: {other}")),
        }
    }
}

/// Grade of a constraint. Blockers force `NOT_READY`; warnings never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Blocker,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Blocker => f.write_str("BLOCKER"),
            Severity::Warning => f.write_str("WARNING"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintStatus {
    Open,
    Cleared,
}

impl Default for ConstraintStatus {
    fn default() -> Self {
        ConstraintStatus::Open
    }
}

/// Three-valued readiness verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadinessStatus {
    NotReady,
    ReadyWithWarnings,
    Ready,
}

impl ReadinessStatus {
    /// Verdict rule: any blocker means not ready, any warning means ready
    /// with warnings, otherwise ready.
    pub fn from_counts(blockers: usize, warnings: usize) -> Self {
        if blockers > 0 {
            ReadinessStatus::NotReady
        } else if warnings > 0 {
            ReadinessStatus::ReadyWithWarnings
        } else {
            ReadinessStatus::Ready
        }
    }

    /// Dominance rank: NOT_READY > READY_WITH_WARNINGS > READY.
    pub fn rank(&self) -> u8 {
        match self {
            ReadinessStatus::NotReady => 2,
            ReadinessStatus::ReadyWithWarnings => 1,
            ReadinessStatus::Ready => 0,
        }
    }

    /// The more severe of two verdicts.
    pub fn dominant(self, other: ReadinessStatus) -> ReadinessStatus {
        if other.rank() > self.rank() { other } else { self }
    }
}

impl fmt::Display for ReadinessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessStatus::NotReady => f.write_str("NOT_READY"),
            ReadinessStatus::ReadyWithWarnings => f.write_str("READY_WITH_WARNINGS"),
            ReadinessStatus::Ready => f.write_str("READY"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => f.write_str("low"),
            RiskLevel::Medium => f.write_str("medium"),
            RiskLevel::High => f.write_str("high"),
            RiskLevel::Critical => f.write_str("critical"),
        }
    }
}

/// Gate state for a work package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionStatus {
    Blocked,
    PmApprovalRequired,
    EngineerReviewRequired,
    Released,
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionStatus::Blocked => f.write_str("BLOCKED"),
            PermissionStatus::PmApprovalRequired => f.write_str("PM_APPROVAL_REQUIRED"),
            PermissionStatus::EngineerReviewRequired => f.write_str("ENGINEER_REVIEW_REQUIRED"),
            PermissionStatus::Released => f.write_str("RELEASED"),
        }
    }
}

impl FromStr for PermissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "BLOCKED" => Ok(PermissionStatus::Blocked),
            "PM_APPROVAL_REQUIRED" => Ok(PermissionStatus::PmApprovalRequired),
            "ENGINEER_REVIEW_REQUIRED" => Ok(PermissionStatus::EngineerReviewRequired),
            "RELEASED" => Ok(PermissionStatus::Released),
            other => Err(format!(
                "invalid permission status: {other} (expected BLOCKED, PM_APPROVAL_REQUIRED, ENGINEER_REVIEW_REQUIRED or RELEASED)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RfiStatus {
    Draft,
    Submitted,
    UnderReview,
    Answered,
    Closed,
}

impl RfiStatus {
    /// Submitted or under review: a response is still owed.
    pub fn awaiting_response(&self) -> bool {
        matches!(self, RfiStatus::Submitted | RfiStatus::UnderReview)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, RfiStatus::Answered | RfiStatus::Closed)
    }
}

impl Default for RfiStatus {
    fn default() -> Self {
        RfiStatus::Draft
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawingStatus {
    InProgress,
    IssuedForApproval,
    ReturnedWithComments,
    Released,
    Superseded,
}

impl Default for DrawingStatus {
    fn default() -> Self {
        DrawingStatus::InProgress
    }
}

impl fmt::Display for DrawingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DrawingStatus::InProgress => "in_progress",
            DrawingStatus::IssuedForApproval => "issued_for_approval",
            DrawingStatus::ReturnedWithComments => "returned_with_comments",
            DrawingStatus::Released => "released",
            DrawingStatus::Superseded => "superseded",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Scheduled,
    InTransit,
    Arrived,
    Cancelled,
}

impl DeliveryStatus {
    /// Scheduled or in transit.
    pub fn is_pending(&self) -> bool {
        matches!(self, DeliveryStatus::Scheduled | DeliveryStatus::InTransit)
    }
}

impl Default for DeliveryStatus {
    fn default() -> Self {
        DeliveryStatus::Scheduled
    }
}

/// What happens to a manual permission override on automatic recomputation.
///
/// - `UntilBasisChanges` (default): the override is kept while the package's
///   readiness and risk level match the values it was granted against.
/// - `Sticky`: kept until explicitly cleared.
/// - `Discard`: every recomputation replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverridePolicy {
    UntilBasisChanges,
    Sticky,
    Discard,
}

impl Default for OverridePolicy {
    fn default() -> Self {
        OverridePolicy::UntilBasisChanges
    }
}

impl FromStr for OverridePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "until_basis_changes" => Ok(OverridePolicy::UntilBasisChanges),
            "sticky" => Ok(OverridePolicy::Sticky),
            "discard" => Ok(OverridePolicy::Discard),
            other => Err(format!(
                "invalid override_policy: {other} (expected \"until_basis_changes\", \"sticky\" or \"discard\")"
            )),
        }
    }
}
