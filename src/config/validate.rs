// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{GateError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = GateError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.risk, raw.permission, raw.cascade))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_thresholds(cfg)?;
    validate_float_scale(cfg)?;
    Ok(())
}

fn validate_thresholds(cfg: &RawConfigFile) -> Result<()> {
    let r = &cfg.risk;
    if r.medium_threshold == 0 {
        return Err(GateError::ConfigError(
            "[risk].medium_threshold must be >= 1 (got 0)".to_string(),
        ));
    }
    if !(r.medium_threshold < r.high_threshold && r.high_threshold < r.critical_threshold) {
        return Err(GateError::ConfigError(format!(
            "[risk] thresholds must be strictly increasing: medium ({}) < high ({}) < critical ({})",
            r.medium_threshold, r.high_threshold, r.critical_threshold
        )));
    }
    Ok(())
}

fn validate_float_scale(cfg: &RawConfigFile) -> Result<()> {
    let hours = cfg.risk.float_hours_per_point;
    if !hours.is_finite() || hours <= 0.0 {
        return Err(GateError::ConfigError(format!(
            "[risk].float_hours_per_point must be a positive number (got {hours})"
        )));
    }
    Ok(())
}
