// src/config/model.rs

use serde::Deserialize;

use crate::types::OverridePolicy;

/// Configuration as read from TOML, before validation.
///
/// ```toml
/// [risk]
/// blocker_weight = 10
/// warning_weight = 3
/// float_hours_per_point = 8.0
/// hold_weight = 5
/// medium_threshold = 5
/// high_threshold = 15
/// critical_threshold = 30
///
/// [permission]
/// override_policy = "until_basis_changes"
/// pm_approval_at_high_risk = false
///
/// [cascade]
/// reconcile_on_recompute = true
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub risk: RiskSection,
    #[serde(default)]
    pub permission: PermissionSection,
    #[serde(default)]
    pub cascade: CascadeSection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`
/// or [`ConfigFile::default`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub risk: RiskSection,
    pub permission: PermissionSection,
    pub cascade: CascadeSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        risk: RiskSection,
        permission: PermissionSection,
        cascade: CascadeSection,
    ) -> Self {
        Self {
            risk,
            permission,
            cascade,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(
            RiskSection::default(),
            PermissionSection::default(),
            CascadeSection::default(),
        )
    }
}

/// `[risk]` section: weights feeding the package risk score and the score
/// thresholds for each level.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskSection {
    #[serde(default = "default_blocker_weight")]
    pub blocker_weight: u32,
    #[serde(default = "default_warning_weight")]
    pub warning_weight: u32,
    /// Hours of consumed float worth one risk point.
    #[serde(default = "default_float_hours_per_point")]
    pub float_hours_per_point: f64,
    /// Points per erection task sitting in a held area.
    #[serde(default = "default_hold_weight")]
    pub hold_weight: u32,
    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: u32,
    #[serde(default = "default_high_threshold")]
    pub high_threshold: u32,
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: u32,
}

fn default_blocker_weight() -> u32 {
    10
}

fn default_warning_weight() -> u32 {
    3
}

fn default_float_hours_per_point() -> f64 {
    8.0
}

fn default_hold_weight() -> u32 {
    5
}

fn default_medium_threshold() -> u32 {
    5
}

fn default_high_threshold() -> u32 {
    15
}

fn default_critical_threshold() -> u32 {
    30
}

impl Default for RiskSection {
    fn default() -> Self {
        Self {
            blocker_weight: default_blocker_weight(),
            warning_weight: default_warning_weight(),
            float_hours_per_point: default_float_hours_per_point(),
            hold_weight: default_hold_weight(),
            medium_threshold: default_medium_threshold(),
            high_threshold: default_high_threshold(),
            critical_threshold: default_critical_threshold(),
        }
    }
}

/// `[permission]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionSection {
    /// How long a manual override survives automatic recomputation.
    #[serde(default)]
    pub override_policy: OverridePolicy,

    /// Also require PM approval at `high` risk (by default only `medium`
    /// does).
    #[serde(default)]
    pub pm_approval_at_high_risk: bool,
}

/// `[cascade]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CascadeSection {
    /// On a manual project recompute, first clear persisted constraints whose
    /// originating condition has already resolved.
    #[serde(default = "default_reconcile_on_recompute")]
    pub reconcile_on_recompute: bool,
}

fn default_reconcile_on_recompute() -> bool {
    true
}

impl Default for CascadeSection {
    fn default() -> Self {
        Self {
            reconcile_on_recompute: default_reconcile_on_recompute(),
        }
    }
}
