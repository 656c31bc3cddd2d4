// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result};

pub mod mock;

/// One immediate child of a directory, as seen by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Abstract filesystem interface.
///
/// The staleness engine and the directory walker only need these two
/// lookups; both treat an `Err` as "absent" rather than propagating it.
pub trait FileSystem: Send + Sync + Debug {
    /// Last modification time, following symlinks.
    fn modified(&self, path: &Path) -> Result<SystemTime>;

    /// Immediate entries of a directory, in whatever order the platform
    /// yields them.
    fn read_dir(&self, path: &Path) -> Result<Vec<FsEntry>>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn modified(&self, path: &Path) -> Result<SystemTime> {
        let meta = fs::metadata(path).with_context(|| format!("stat {:?}", path))?;
        meta.modified()
            .with_context(|| format!("reading mtime of {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<FsEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(dir = ?path, error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };

            // Symlinks are classified by what they point at; a dangling link
            // is reported as a file.
            let is_dir = match entry.file_type() {
                Ok(ft) if ft.is_symlink() => fs::metadata(entry.path())
                    .map(|m| m.is_dir())
                    .unwrap_or(false),
                Ok(ft) => ft.is_dir(),
                Err(_) => false,
            };

            entries.push(FsEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        Ok(entries)
    }
}
