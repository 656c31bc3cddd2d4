// src/exec/process.rs

//! The capability the pool needs from a running child process.
//!
//! The scheduler only ever talks to these traits. [`super::OsLauncher`] is the
//! production implementation; tests plug in a scripted fake.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Notify;

use crate::pool::{Job, JobOutcome};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A live (or just finished) child process owned by one worker slot.
pub trait ProcessHandle: Send {
    /// OS process id, if there is one.
    fn id(&self) -> Option<u32>;

    /// Non-blocking check for termination.
    ///
    /// Returns `Ok(None)` while the process runs. Once it has returned
    /// `Ok(Some(_))` the handle is spent and only good for dropping.
    fn try_outcome(&mut self) -> io::Result<Option<JobOutcome>>;

    /// Forcibly terminate the process and wait until it is gone.
    ///
    /// A process that already exited on its own counts as terminated.
    fn terminate(&mut self) -> BoxFuture<'_, io::Result<()>>;
}

/// Creates child processes for jobs.
pub trait Launcher: Send + Sync {
    /// Start `job` and return as soon as the process exists.
    ///
    /// Implementations that can observe completion should call
    /// `completions.notify_one()` when the child exits; the pool then wakes
    /// without waiting out its idle backoff.
    fn launch(&self, job: &Job, completions: Arc<Notify>) -> io::Result<Box<dyn ProcessHandle>>;
}
