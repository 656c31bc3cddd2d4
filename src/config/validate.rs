// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PoolError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PoolError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.pool))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_pool_section(cfg)?;
    Ok(())
}

fn validate_pool_section(cfg: &RawConfigFile) -> Result<()> {
    // command_mode is strongly typed and checked during deserialization.

    if cfg.pool.jobs == Some(0) {
        return Err(PoolError::ConfigError(
            "[pool].jobs must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.pool.idle_backoff_ms == 0 {
        return Err(PoolError::ConfigError(
            "[pool].idle_backoff_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}
