// src/errors.rs

//! Crate-wide error type.
//!
//! Everything that goes wrong while managing child processes is fatal for a
//! build run. The pool reports it as a `PoolError`; only the top-level handler
//! ([`crate::exit_on_failure`] or `main`) turns it into a process exit.

use std::io;

use thiserror::Error;

use crate::pool::SourceLocation;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("{location}: failed to spawn `{command}`: {source}")]
    Spawn {
        location: SourceLocation,
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{location}: exit code is {code}. command: `{command}`")]
    JobFailed {
        location: SourceLocation,
        command: String,
        code: i32,
    },

    #[error("{location}: failed to terminate `{command}`: {source}")]
    Terminate {
        location: SourceLocation,
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{location}: lost track of `{command}`: {source}")]
    Poll {
        location: SourceLocation,
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot detect processor count: {0}")]
    PoolSizing(#[source] io::Error),

    #[error("worker pool was aborted by an earlier failure")]
    Aborted,

    #[error("interrupted; running jobs were terminated")]
    Interrupted,

    #[error("no such worker slot: {0}")]
    NoSuchSlot(usize),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PoolError {
    /// Exit status the host process should terminate with.
    ///
    /// A failed job propagates its own non-zero code and an interrupt is the
    /// conventional 130; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            PoolError::JobFailed { code, .. } if *code > 0 => *code,
            PoolError::Interrupted => 130,
            _ => 1,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PoolError>;
