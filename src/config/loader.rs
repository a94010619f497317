// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Name of the optional settings file looked up in the watched root.
pub const CONFIG_FILE_NAME: &str = "Rerun.toml";

/// Load and validate a settings file from an explicit path.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let raw: RawConfigFile = toml::from_str(&contents)?;

    ConfigFile::try_from(raw)
}

/// Load `Rerun.toml` from `root` if it exists, otherwise use defaults.
///
/// A file that exists but fails to parse or validate is an error; we never
/// silently fall back to defaults in that case.
pub fn load_for_root(root: &Path) -> Result<ConfigFile> {
    let path = root.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        debug!(?path, "no settings file; using defaults");
        return Ok(ConfigFile::default());
    }

    debug!(?path, "loading settings file");
    load_from_path(&path)
}
