// src/config/loader.rs

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// A missing file is not an error: the service runs on defaults. A file that
/// exists but does not parse or validate is.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = match load_from_path(path) {
        Ok(raw) => raw,
        Err(crate::errors::RunwaiterError::IoError(e)) if e.kind() == ErrorKind::NotFound => {
            RawConfigFile::default()
        }
        Err(e) => return Err(e),
    };
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Default config path: `runwaiter.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("runwaiter.toml")
}
