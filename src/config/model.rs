// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::pool::PoolSettings;
use crate::types::CommandMode;

/// Raw configuration as read from a TOML file, before validation.
///
/// ```toml
/// [pool]
/// jobs = 4
/// idle_backoff_ms = 200
/// command_mode = "argv"
/// capture_output = false
/// ```
///
/// Every section and key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub pool: PoolSection,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub pool: PoolSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(pool: PoolSection) -> Self {
        Self { pool }
    }

    /// Runtime settings for a [`crate::pool::WorkerPool`].
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            size: self.pool.jobs,
            idle_backoff: Duration::from_millis(self.pool.idle_backoff_ms),
            command_mode: self.pool.command_mode,
            capture_output: self.pool.capture_output,
        }
    }
}

/// `[pool]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSection {
    /// Number of worker slots. `None` means "one per detected processor".
    #[serde(default)]
    pub jobs: Option<usize>,

    /// How long the pool sleeps between polling passes when no child has
    /// signalled completion.
    #[serde(default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,

    /// `"argv"` or `"shell"`. Defaults to `argv`, except on Windows.
    #[serde(default)]
    pub command_mode: CommandMode,

    /// Pipe child stdout/stderr into the log instead of inheriting them.
    #[serde(default)]
    pub capture_output: bool,
}

fn default_idle_backoff_ms() -> u64 {
    200
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            jobs: None,
            idle_backoff_ms: default_idle_backoff_ms(),
            command_mode: CommandMode::default(),
            capture_output: false,
        }
    }
}
