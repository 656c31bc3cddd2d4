// src/stale.rs

//! Modification-time comparison.
//!
//! A path that cannot be statted for any reason (missing, permission denied,
//! dangling symlink) has the modification time [`ModTime::MISSING`], which
//! orders strictly before every real timestamp. That makes "absent" behave as
//! "maximally stale" without the caller ever seeing an error.
//!
//! The usual check for a single target is
//!
//! ```no_run
//! use buildpool::stale::latest_mod_time;
//!
//! let rebuild = latest_mod_time(["app.o"]) < latest_mod_time(["app.c", "app.h"]);
//! ```
//!
//! or, with the "any output missing" rule included, [`StalenessQuery`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::trace;

use crate::fs::{FileSystem, RealFileSystem};

/// A file's last-modified time, or the "does not exist" sentinel.
///
/// `None` sorts before every `Some`, which is exactly the sentinel ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModTime(Option<SystemTime>);

impl ModTime {
    pub const MISSING: ModTime = ModTime(None);

    pub fn from_system_time(t: SystemTime) -> Self {
        ModTime(Some(t))
    }

    pub fn exists(&self) -> bool {
        self.0.is_some()
    }

    pub fn system_time(&self) -> Option<SystemTime> {
        self.0
    }

    /// Seconds since the Unix epoch, fractional where the platform has the
    /// precision. Times before the epoch are negative; `MISSING` is negative
    /// infinity.
    pub fn as_secs_f64(&self) -> f64 {
        match self.0 {
            Some(t) => match t.duration_since(UNIX_EPOCH) {
                Ok(d) => d.as_secs_f64(),
                Err(e) => -e.duration().as_secs_f64(),
            },
            None => f64::NEG_INFINITY,
        }
    }
}

impl From<SystemTime> for ModTime {
    fn from(t: SystemTime) -> Self {
        ModTime::from_system_time(t)
    }
}

impl fmt::Display for ModTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => write!(f, "{:.3}", self.as_secs_f64()),
            None => f.write_str("missing"),
        }
    }
}

/// Modification time of `path` on the real filesystem.
pub fn mod_time(path: impl AsRef<Path>) -> ModTime {
    mod_time_in(&RealFileSystem, path)
}

pub fn mod_time_in(fs: &dyn FileSystem, path: impl AsRef<Path>) -> ModTime {
    let path = path.as_ref();
    match fs.modified(path) {
        Ok(t) => ModTime(Some(t)),
        Err(e) => {
            trace!(path = %path.display(), error = %e, "treating unstattable path as missing");
            ModTime::MISSING
        }
    }
}

/// Newest modification time over `paths`.
///
/// An empty set yields [`ModTime::MISSING`].
pub fn latest_mod_time<I, P>(paths: I) -> ModTime
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    latest_mod_time_in(&RealFileSystem, paths)
}

pub fn latest_mod_time_in<I, P>(fs: &dyn FileSystem, paths: I) -> ModTime
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    paths
        .into_iter()
        .map(|p| mod_time_in(fs, p))
        .max()
        .unwrap_or(ModTime::MISSING)
}

/// "Do these outputs need rebuilding from these inputs?"
///
/// Stale when any output is missing, or when the newest input is newer than
/// the newest output. Nothing is cached; every call stats again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StalenessQuery {
    inputs: Vec<PathBuf>,
    outputs: Vec<PathBuf>,
}

impl StalenessQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(path.into());
        self
    }

    pub fn inputs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.inputs.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.outputs.push(path.into());
        self
    }

    pub fn outputs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.outputs.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_in(&RealFileSystem)
    }

    pub fn is_stale_in(&self, fs: &dyn FileSystem) -> bool {
        let mut newest_output = ModTime::MISSING;
        for output in &self.outputs {
            let t = mod_time_in(fs, output);
            if !t.exists() {
                trace!(output = %output.display(), "output missing");
                return true;
            }
            newest_output = newest_output.max(t);
        }

        let newest_input = latest_mod_time_in(fs, &self.inputs);
        newest_output < newest_input
    }
}
