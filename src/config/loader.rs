// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Read and deserialize a config file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Read, deserialize and validate a config file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Load `path` if given; otherwise load the default path if it exists, and
/// fall back to built-in defaults when it does not.
pub fn load_or_default(path: Option<&Path>) -> Result<ConfigFile> {
    match path {
        Some(p) => load_and_validate(p),
        None => {
            let default = default_config_path();
            if default.is_file() {
                debug!(path = ?default, "loading default config file");
                load_and_validate(default)
            } else {
                debug!("no config file; using built-in defaults");
                Ok(ConfigFile::default())
            }
        }
    }
}

/// `Readygate.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Readygate.toml")
}
