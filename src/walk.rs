// src/walk.rs

//! Single-level directory enumeration.
//!
//! [`walk`] lists one directory and hands every entry to a visitor. It never
//! descends on its own: a visitor that wants the whole tree calls `walk` again
//! for each [`WalkEntry::Directory`] it receives.
//!
//! ```no_run
//! use buildpool::walk::{walk, WalkEntry};
//!
//! fn sources(dir: &str, out: &mut Vec<String>) {
//!     walk(dir, |entry| match entry {
//!         WalkEntry::Directory { path } => sources(path, out),
//!         WalkEntry::File { extension: ".c", .. } => out.push(entry.full_path()),
//!         WalkEntry::File { .. } => {}
//!     });
//! }
//! ```
//!
//! Paths are plain strings so that `parent + base + extension` is the file's
//! path verbatim. Non-UTF-8 names are converted lossily.

use std::path::{is_separator, Path, MAIN_SEPARATOR};

use tracing::debug;

use crate::fs::{FileSystem, RealFileSystem};

/// One immediate child of a walked directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEntry<'a> {
    /// A subdirectory, separator-terminated.
    Directory { path: &'a str },
    /// A non-directory. `parent` is separator-terminated and `extension` keeps
    /// its leading dot; it is `""` when the name has no dot.
    File {
        parent: &'a str,
        base: &'a str,
        extension: &'a str,
    },
}

impl WalkEntry<'_> {
    /// The entry's full path (for directories, with the trailing separator).
    pub fn full_path(&self) -> String {
        match *self {
            WalkEntry::Directory { path } => path.to_string(),
            WalkEntry::File {
                parent,
                base,
                extension,
            } => format!("{parent}{base}{extension}"),
        }
    }
}

/// Walk one level of `dir` on the real filesystem.
pub fn walk<F>(dir: &str, visitor: F)
where
    F: FnMut(WalkEntry<'_>),
{
    walk_in(&RealFileSystem, dir, visitor)
}

/// Walk one level of `dir` on `fs`.
///
/// An unreadable directory produces no calls at all. Entries come in whatever
/// order the filesystem lists them.
pub fn walk_in<F>(fs: &dyn FileSystem, dir: &str, mut visitor: F)
where
    F: FnMut(WalkEntry<'_>),
{
    let dir = normalize_dir(dir);

    let entries = match fs.read_dir(Path::new(&dir)) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir, error = %e, "cannot read directory; treating as empty");
            return;
        }
    };

    for entry in entries {
        if entry.name == "." || entry.name == ".." {
            continue;
        }

        if entry.is_dir {
            let sub = format!("{dir}{}{MAIN_SEPARATOR}", entry.name);
            visitor(WalkEntry::Directory { path: &sub });
        } else {
            let (base, extension) = split_file_name(&entry.name);
            visitor(WalkEntry::File {
                parent: &dir,
                base,
                extension,
            });
        }
    }
}

/// Make sure `dir` ends with a path separator.
///
/// An existing trailing separator is kept as is (on Windows both `/` and `\`
/// count). An empty string means the current directory.
pub fn normalize_dir(dir: &str) -> String {
    if dir.is_empty() {
        return format!(".{MAIN_SEPARATOR}");
    }
    match dir.chars().last() {
        Some(c) if is_separator(c) => dir.to_string(),
        _ => format!("{dir}{MAIN_SEPARATOR}"),
    }
}

/// Split a file name at its last dot.
///
/// `"a.tar.gz"` gives `("a.tar", ".gz")`, `"Makefile"` gives `("Makefile", "")`
/// and a dotfile such as `".profile"` is all extension: `("", ".profile")`.
pub fn split_file_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) => name.split_at(idx),
        None => (name, ""),
    }
}
