// src/exec/launcher.rs

//! Production launcher backed by `tokio::process`.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, info, warn};

use crate::exec::process::{BoxFuture, Launcher, ProcessHandle};
use crate::exec::tokenize::tokenize;
use crate::pool::{Job, JobOutcome};
use crate::types::CommandMode;

/// Starts each job as an OS child process.
#[derive(Debug, Clone, Default)]
pub struct OsLauncher {
    mode: CommandMode,
    capture_output: bool,
}

impl OsLauncher {
    pub fn new(mode: CommandMode, capture_output: bool) -> Self {
        Self {
            mode,
            capture_output,
        }
    }

    fn build_command(&self, job: &Job) -> io::Result<Command> {
        let mut cmd = match self.mode {
            CommandMode::Argv => {
                let argv = tokenize(&job.command);
                let Some((program, args)) = argv.split_first() else {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "empty command line",
                    ));
                };
                let mut c = Command::new(program);
                c.args(args);
                c
            }
            // Build a shell command appropriate for the platform.
            CommandMode::Shell => {
                if cfg!(windows) {
                    let mut c = Command::new("cmd");
                    c.arg("/C").arg(&job.command);
                    c
                } else {
                    let mut c = Command::new("sh");
                    c.arg("-c").arg(&job.command);
                    c
                }
            }
        };

        if self.capture_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        cmd.stdin(Stdio::null()).kill_on_drop(true);

        // Own process group, so a kill reaches whatever the command forks.
        #[cfg(unix)]
        cmd.process_group(0);

        Ok(cmd)
    }
}

impl Launcher for OsLauncher {
    fn launch(&self, job: &Job, completions: Arc<Notify>) -> io::Result<Box<dyn ProcessHandle>> {
        let mut child = self.build_command(job)?.spawn()?;
        let pid = child.id();

        if self.capture_output {
            let label = job.location.to_string();
            if let Some(stdout) = child.stdout.take() {
                forward_lines(stdout, label.clone(), false);
            }
            if let Some(stderr) = child.stderr.take() {
                forward_lines(stderr, label, true);
            }
        }

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let (report_tx, report_rx) = oneshot::channel::<ChildReport>();

        tokio::spawn(supervise(child, pid, cancel_rx, report_tx, completions));

        Ok(Box::new(OsProcess {
            pid,
            cancel: Some(cancel_tx),
            report: report_rx,
            settled: false,
        }))
    }
}

/// What the supervisor task observed about its child.
#[derive(Debug)]
enum ChildReport {
    Exited(ExitStatus),
    Killed,
    KillFailed(io::Error),
    WaitFailed(io::Error),
}

/// Own the child until it exits or a cancellation arrives.
///
/// A dropped cancel sender (the handle went away) is treated like an explicit
/// cancellation, so a released handle never leaves an orphan behind.
async fn supervise(
    mut child: Child,
    pid: Option<u32>,
    mut cancel_rx: oneshot::Receiver<()>,
    report_tx: oneshot::Sender<ChildReport>,
    completions: Arc<Notify>,
) {
    let report = tokio::select! {
        status_res = child.wait() => match status_res {
            Ok(status) => {
                debug!(?pid, exit_code = ?status.code(), "child process exited");
                ChildReport::Exited(status)
            }
            Err(e) => ChildReport::WaitFailed(e),
        },

        _ = &mut cancel_rx => {
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            match child.kill().await {
                Ok(()) => {
                    info!(?pid, "child process killed");
                    ChildReport::Killed
                }
                Err(e) => {
                    warn!(?pid, error = %e, "failed to kill child process");
                    ChildReport::KillFailed(e)
                }
            }
        }
    };

    // The receiver is gone if the handle was dropped; nothing left to tell.
    let _ = report_tx.send(report);
    completions.notify_one();
}

/// SIGKILL every process in the group led by `pid`.
///
/// A group that is already gone is not an error; the leader itself is still
/// reaped through `Child::kill`.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => debug!(pgid = pid, "killed process group"),
        Err(Errno::ESRCH) => {}
        Err(e) => warn!(pgid = pid, error = %e, "failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

fn forward_lines<R>(stream: R, label: String, is_stderr: bool)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let reader = BufReader::new(stream);
        let mut lines = reader.lines();

        while let Ok(Some(line)) = lines.next_line().await {
            if is_stderr {
                warn!(job = %label, "stderr: {}", line);
            } else {
                info!(job = %label, "{}", line);
            }
        }
    });
}

fn outcome_from_status(status: ExitStatus) -> JobOutcome {
    if status.success() {
        JobOutcome::Success
    } else {
        // Killed by a signal: no exit code.
        JobOutcome::Failed(status.code().unwrap_or(-1))
    }
}

/// Handle to a child owned by a [`supervise`] task.
struct OsProcess {
    pid: Option<u32>,
    cancel: Option<oneshot::Sender<()>>,
    report: oneshot::Receiver<ChildReport>,
    /// The report has been consumed.
    settled: bool,
}

impl ProcessHandle for OsProcess {
    fn id(&self) -> Option<u32> {
        self.pid
    }

    fn try_outcome(&mut self) -> io::Result<Option<JobOutcome>> {
        if self.settled {
            return Err(io::Error::other("process outcome already consumed"));
        }

        let report = match self.report.try_recv() {
            Ok(report) => report,
            Err(TryRecvError::Empty) => return Ok(None),
            Err(TryRecvError::Closed) => {
                self.settled = true;
                return Err(io::Error::other("process supervisor ended without a report"));
            }
        };

        self.settled = true;
        match report {
            ChildReport::Exited(status) => Ok(Some(outcome_from_status(status))),
            ChildReport::Killed => Ok(Some(JobOutcome::Failed(-1))),
            ChildReport::KillFailed(e) | ChildReport::WaitFailed(e) => Err(e),
        }
    }

    fn terminate(&mut self) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(async move {
            if self.settled {
                return Ok(());
            }

            if let Some(cancel) = self.cancel.take() {
                // Fails only if the supervisor already finished; its report
                // is waiting for us either way.
                let _ = cancel.send(());
            }

            let report = (&mut self.report).await;
            self.settled = true;
            match report {
                Ok(ChildReport::Killed) | Ok(ChildReport::Exited(_)) => Ok(()),
                Ok(ChildReport::KillFailed(e)) | Ok(ChildReport::WaitFailed(e)) => Err(e),
                Err(_) => Err(io::Error::other("process supervisor ended without a report")),
            }
        })
    }
}
