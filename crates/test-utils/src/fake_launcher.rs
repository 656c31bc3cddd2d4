use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use buildpool::exec::{BoxFuture, Launcher, ProcessHandle};
use buildpool::pool::{Job, JobOutcome};

/// Scripted behaviour for one command string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeJob {
    pub duration: Duration,
    pub exit_code: i32,
    pub spawn_error: bool,
    pub unkillable: bool,
}

impl FakeJob {
    pub fn succeeds_after(ms: u64) -> Self {
        Self {
            duration: Duration::from_millis(ms),
            exit_code: 0,
            spawn_error: false,
            unkillable: false,
        }
    }

    pub fn fails_after(ms: u64, exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Self::succeeds_after(ms)
        }
    }

    pub fn unspawnable() -> Self {
        Self {
            spawn_error: true,
            ..Self::succeeds_after(0)
        }
    }

    /// `terminate()` on this job fails.
    pub fn unkillable(mut self) -> Self {
        self.unkillable = true;
        self
    }
}

/// What the fake launcher has observed so far.
#[derive(Debug, Clone, Default)]
pub struct FakeStats {
    /// Launched and not yet reaped or killed.
    pub live: usize,
    pub max_live: usize,
    pub launched: Vec<String>,
    pub finished: Vec<String>,
    pub killed: Vec<String>,
}

/// A launcher that never touches the OS.
///
/// Each command string is looked up in a script; unscripted commands succeed
/// immediately. A fake process "exits" once its duration has elapsed, which
/// the pool only discovers by polling, unless `notify_on_exit` is set.
#[derive(Debug, Clone, Default)]
pub struct FakeLauncher {
    script: Arc<Mutex<HashMap<String, FakeJob>>>,
    stats: Arc<Mutex<FakeStats>>,
    notify_on_exit: bool,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job(self, command: &str, job: FakeJob) -> Self {
        self.script.lock().unwrap().insert(command.to_string(), job);
        self
    }

    /// Wake the pool through its completion notifier when a job's time is up.
    pub fn notifying(mut self) -> Self {
        self.notify_on_exit = true;
        self
    }

    pub fn stats(&self) -> FakeStats {
        self.stats.lock().unwrap().clone()
    }
}

impl Launcher for FakeLauncher {
    fn launch(&self, job: &Job, completions: Arc<Notify>) -> io::Result<Box<dyn ProcessHandle>> {
        let script = self
            .script
            .lock()
            .unwrap()
            .get(&job.command)
            .cloned()
            .unwrap_or_else(|| FakeJob::succeeds_after(0));

        if script.spawn_error {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("fake: cannot spawn `{}`", job.command),
            ));
        }

        {
            let mut stats = self.stats.lock().unwrap();
            stats.live += 1;
            stats.max_live = stats.max_live.max(stats.live);
            stats.launched.push(job.command.clone());
        }

        // Taken before the notifier starts so a wake-up is never early.
        let started = Instant::now();
        if self.notify_on_exit {
            let duration = script.duration;
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                completions.notify_one();
            });
        }

        Ok(Box::new(FakeProcess {
            command: job.command.clone(),
            script,
            started,
            stats: Arc::clone(&self.stats),
            settled: false,
        }))
    }
}

struct FakeProcess {
    command: String,
    script: FakeJob,
    started: Instant,
    stats: Arc<Mutex<FakeStats>>,
    settled: bool,
}

impl ProcessHandle for FakeProcess {
    fn id(&self) -> Option<u32> {
        None
    }

    fn try_outcome(&mut self) -> io::Result<Option<JobOutcome>> {
        if self.settled {
            return Err(io::Error::other("fake: outcome already consumed"));
        }
        if self.started.elapsed() < self.script.duration {
            return Ok(None);
        }

        self.settled = true;
        let mut stats = self.stats.lock().unwrap();
        stats.live -= 1;
        stats.finished.push(self.command.clone());

        Ok(Some(if self.script.exit_code == 0 {
            JobOutcome::Success
        } else {
            JobOutcome::Failed(self.script.exit_code)
        }))
    }

    fn terminate(&mut self) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(async move {
            if self.script.unkillable {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "fake: operation not permitted",
                ));
            }
            if !self.settled {
                self.settled = true;
                let mut stats = self.stats.lock().unwrap();
                stats.live -= 1;
                stats.killed.push(self.command.clone());
            }
            Ok(())
        })
    }
}
