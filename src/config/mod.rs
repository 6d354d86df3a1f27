// src/config/mod.rs

//! Engine configuration (`Readygate.toml`).
//!
//! - [`model`] maps the TOML sections.
//! - [`validate`] turns a [`RawConfigFile`] into a checked [`ConfigFile`].
//! - [`loader`] reads files.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{CascadeSection, ConfigFile, PermissionSection, RawConfigFile, RiskSection};
