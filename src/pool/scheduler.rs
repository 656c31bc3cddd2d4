// src/pool/scheduler.rs

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, error, info, trace, warn};

use crate::errors::{PoolError, Result};
use crate::exec::{Launcher, OsLauncher};
use crate::pool::job::{Job, JobOutcome, SourceLocation};
use crate::pool::slot::{Occupant, Slot, SlotState};
use crate::types::CommandMode;

pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(200);

/// Knobs for a [`WorkerPool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    /// Number of slots; `None` sizes the pool to the processor count when the
    /// first job is submitted.
    pub size: Option<usize>,
    /// Longest the pool sleeps between polling passes.
    pub idle_backoff: Duration,
    pub command_mode: CommandMode,
    pub capture_output: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            size: None,
            idle_backoff: DEFAULT_IDLE_BACKOFF,
            command_mode: CommandMode::default(),
            capture_output: false,
        }
    }
}

impl PoolSettings {
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_idle_backoff(mut self, idle_backoff: Duration) -> Self {
        self.idle_backoff = idle_backoff;
        self
    }

    pub fn with_command_mode(mut self, mode: CommandMode) -> Self {
        self.command_mode = mode;
        self
    }
}

/// Fixed-size pool of worker slots, each running at most one child process.
///
/// The pool is driven by a single task through `&mut self`, so slot state
/// needs no locking; the only concurrency is between the children.
///
/// Any failure (a job exiting non-zero, a spawn or kill error) terminates
/// every other running job and *aborts* the pool: the error is returned and
/// all later `submit`/`await_all` calls fail with [`PoolError::Aborted`].
pub struct WorkerPool {
    settings: PoolSettings,
    launcher: Box<dyn Launcher>,
    slots: Vec<Slot>,
    completions: Arc<Notify>,
    aborted: bool,
}

impl WorkerPool {
    /// Pool launching real OS processes per `settings`.
    pub fn new(settings: PoolSettings) -> Self {
        let launcher = OsLauncher::new(settings.command_mode, settings.capture_output);
        Self::with_launcher(settings, launcher)
    }

    pub fn with_launcher(settings: PoolSettings, launcher: impl Launcher + 'static) -> Self {
        Self {
            settings,
            launcher: Box::new(launcher),
            slots: Vec::new(),
            completions: Arc::new(Notify::new()),
            aborted: false,
        }
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Number of slots, once the first submission has sized the pool.
    pub fn size(&self) -> Option<usize> {
        if self.slots.is_empty() {
            None
        } else {
            Some(self.slots.len())
        }
    }

    /// Slots currently holding a job (finished or not, until polled).
    pub fn running(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_empty()).count()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Start `command` in the first free slot, waiting for one if the pool is
    /// saturated. Returns the slot index once the process exists.
    pub async fn submit(
        &mut self,
        location: SourceLocation,
        command: impl Into<String>,
    ) -> Result<usize> {
        self.ensure_usable()?;
        self.ensure_initialized()?;

        let job = Job::new(location, command);
        let index = self.acquire_slot().await?;

        match self.launcher.launch(&job, Arc::clone(&self.completions)) {
            Ok(handle) => {
                info!(
                    slot = index,
                    pid = ?handle.id(),
                    location = %job.location,
                    command = %job.command,
                    "launched job"
                );
                self.slots[index].occupant = Some(Occupant { job, handle });
                Ok(index)
            }
            Err(source) => {
                error!(
                    location = %job.location,
                    command = %job.command,
                    error = %source,
                    "failed to spawn job"
                );
                self.abort().await?;
                Err(PoolError::Spawn {
                    location: job.location,
                    command: job.command,
                    source,
                })
            }
        }
    }

    /// Non-blocking poll of one slot.
    ///
    /// A job that exited zero is reclaimed and the slot reported available.
    /// A job that exited non-zero kills everything else and comes back as
    /// [`PoolError::JobFailed`].
    pub async fn check_slot(&mut self, index: usize) -> Result<SlotState> {
        let outcome = match self.slots.get_mut(index) {
            None => return Err(PoolError::NoSuchSlot(index)),
            Some(slot) => match slot.occupant.as_mut() {
                None => return Ok(SlotState::Available),
                Some(occupant) => occupant.handle.try_outcome(),
            },
        };

        let finished = match outcome {
            Ok(None) => return Ok(SlotState::Busy),
            Ok(Some(outcome)) => Ok(outcome),
            Err(e) => Err(e),
        };
        let Some(job) = self.slots[index].clear() else {
            return Ok(SlotState::Available);
        };

        match finished {
            Ok(JobOutcome::Success) => {
                debug!(slot = index, location = %job.location, "job finished");
                Ok(SlotState::Available)
            }
            Ok(JobOutcome::Failed(code)) => {
                error!(
                    slot = index,
                    location = %job.location,
                    command = %job.command,
                    exit_code = code,
                    "job failed; terminating remaining jobs"
                );
                self.abort().await?;
                Err(PoolError::JobFailed {
                    location: job.location,
                    command: job.command,
                    code,
                })
            }
            Err(source) => {
                error!(
                    slot = index,
                    location = %job.location,
                    command = %job.command,
                    error = %source,
                    "lost track of job; terminating remaining jobs"
                );
                self.abort().await?;
                Err(PoolError::Poll {
                    location: job.location,
                    command: job.command,
                    source,
                })
            }
        }
    }

    /// Barrier: return once every job submitted so far has terminated.
    ///
    /// Every slot is polled on every pass, so a failure anywhere is noticed
    /// while other jobs are still running.
    pub async fn await_all(&mut self) -> Result<()> {
        self.ensure_usable()?;

        loop {
            let mut busy = 0;
            for index in 0..self.slots.len() {
                if self.check_slot(index).await? == SlotState::Busy {
                    busy += 1;
                }
            }
            if busy == 0 {
                return Ok(());
            }
            trace!(busy, "waiting for running jobs");
            self.idle().await;
        }
    }

    /// Run one command on its own: everything before it finishes first, and
    /// it finishes before this returns.
    pub async fn run_serial(
        &mut self,
        location: SourceLocation,
        command: impl Into<String>,
    ) -> Result<()> {
        self.await_all().await?;
        self.submit(location, command).await?;
        self.await_all().await
    }

    /// Forcibly terminate every running job.
    ///
    /// Stops at the first job that cannot be terminated; the pool can no
    /// longer vouch for its children then, so it is aborted.
    pub async fn kill_all(&mut self) -> Result<()> {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(occupant) = slot.occupant.as_mut() else {
                continue;
            };

            let terminated = occupant.handle.terminate().await;
            match terminated {
                Ok(()) => {
                    warn!(
                        slot = index,
                        location = %occupant.job.location,
                        command = %occupant.job.command,
                        "terminated job"
                    );
                    slot.clear();
                }
                Err(source) => {
                    self.aborted = true;
                    error!(
                        slot = index,
                        location = %occupant.job.location,
                        error = %source,
                        "failed to terminate job"
                    );
                    return Err(PoolError::Terminate {
                        location: occupant.job.location.clone(),
                        command: occupant.job.command.clone(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    async fn abort(&mut self) -> Result<()> {
        self.aborted = true;
        self.kill_all().await
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.aborted {
            return Err(PoolError::Aborted);
        }
        Ok(())
    }

    fn ensure_initialized(&mut self) -> Result<()> {
        if !self.slots.is_empty() {
            return Ok(());
        }

        let size = match self.settings.size {
            Some(0) => {
                return Err(PoolError::ConfigError(
                    "worker pool size must be >= 1".to_string(),
                ));
            }
            Some(n) => n,
            None => match std::thread::available_parallelism() {
                Ok(n) => n.get(),
                Err(e) => {
                    self.aborted = true;
                    return Err(PoolError::PoolSizing(e));
                }
            },
        };

        self.slots = (0..size).map(|_| Slot::default()).collect();
        info!(size, "worker pool initialized");
        Ok(())
    }

    /// First poll pass over every slot; picks the lowest free index.
    async fn acquire_slot(&mut self) -> Result<usize> {
        loop {
            let mut free = None;
            for index in 0..self.slots.len() {
                let state = self.check_slot(index).await?;
                if state == SlotState::Available && free.is_none() {
                    free = Some(index);
                }
            }
            if let Some(index) = free {
                return Ok(index);
            }
            trace!("all slots busy; waiting");
            self.idle().await;
        }
    }

    /// Sleep until a child signals completion or the idle backoff elapses.
    ///
    /// Owns its captures so the wait does not borrow the pool.
    fn idle(&self) -> impl Future<Output = ()> + Send + 'static {
        let completions = Arc::clone(&self.completions);
        let backoff = self.settings.idle_backoff;
        async move {
            tokio::select! {
                _ = completions.notified() => {}
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }
}
