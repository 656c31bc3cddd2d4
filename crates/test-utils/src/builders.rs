#![allow(dead_code)]

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use buildpool::config::{ConfigFile, PoolSection, RawConfigFile};
use buildpool::{CommandMode, PoolSettings};
use tempfile::TempDir;

/// Pool settings suited to tests: fixed size, 5 ms idle backoff.
pub fn fast_settings(size: usize) -> PoolSettings {
    PoolSettings::default()
        .with_size(size)
        .with_idle_backoff(Duration::from_millis(5))
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                pool: PoolSection::default(),
            },
        }
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.pool.jobs = Some(jobs);
        self
    }

    pub fn idle_backoff_ms(mut self, ms: u64) -> Self {
        self.config.pool.idle_backoff_ms = ms;
        self
    }

    pub fn command_mode(mut self, mode: CommandMode) -> Self {
        self.config.pool.command_mode = mode;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A throwaway directory tree with controllable modification times.
pub struct TempTree {
    dir: TempDir,
}

impl TempTree {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The root as a separator-terminated string, as the walker reports it.
    pub fn root(&self) -> String {
        format!("{}{MAIN_SEPARATOR}", self.dir.path().display())
    }

    pub fn join(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Create an empty file (and its parents).
    pub fn file(&self, rel: &str) -> io::Result<PathBuf> {
        let path = self.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        File::create(&path)?;
        Ok(path)
    }

    /// Create a file whose mtime is `secs` seconds after the Unix epoch.
    pub fn file_at(&self, rel: &str, secs: u64) -> io::Result<PathBuf> {
        let path = self.file(rel)?;
        set_mtime(&path, UNIX_EPOCH + Duration::from_secs(secs))?;
        Ok(path)
    }

    pub fn dir(&self, rel: &str) -> io::Result<PathBuf> {
        let path = self.join(rel);
        fs::create_dir_all(&path)?;
        Ok(path)
    }
}

pub fn set_mtime(path: &Path, time: SystemTime) -> io::Result<()> {
    File::options().write(true).open(path)?.set_modified(time)
}
