// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{RerunError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::RerunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.command, raw.watch))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_command_section(cfg)?;
    validate_ignore_names(cfg)?;
    Ok(())
}

fn validate_command_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.command.shell.trim().is_empty() {
        return Err(RerunError::ConfigError(
            "[command].shell must not be empty".to_string(),
        ));
    }

    if cfg.command.capture_limit == 0 {
        return Err(RerunError::ConfigError(
            "[command].capture_limit must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Ignore entries are matched against a single path component, so anything
/// containing a separator could never match.
fn validate_ignore_names(cfg: &RawConfigFile) -> Result<()> {
    for name in &cfg.watch.ignore {
        if name.is_empty() || name == "." || name == ".." {
            return Err(RerunError::ConfigError(format!(
                "[watch].ignore contains invalid directory name {name:?}"
            )));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(RerunError::ConfigError(format!(
                "[watch].ignore entries must be plain directory names, got {name:?}"
            )));
        }
    }
    Ok(())
}
