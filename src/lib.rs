// src/lib.rs

//! Procedural build automation: run shell commands as jobs on a bounded
//! worker pool, decide staleness by modification time, and enumerate
//! directories to find what to build.
//!
//! The three building blocks are independent:
//! - [`pool::WorkerPool`] runs jobs with fail-fast semantics,
//! - [`stale`] compares modification times,
//! - [`walk`] lists one directory level at a time.

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pool;
pub mod stale;
pub mod types;
pub mod walk;

pub use errors::{PoolError, Result};
pub use pool::{Job, JobOutcome, PoolSettings, SlotState, SourceLocation, WorkerPool};
pub use stale::{latest_mod_time, mod_time, ModTime, StalenessQuery};
pub use types::CommandMode;
pub use walk::{walk, WalkEntry};

use std::io::{self, Write};

use tracing::{debug, error, warn};

use crate::cli::{CliArgs, Command, LsArgs, RunArgs, StaleArgs};
use crate::config::{default_config_path, load_and_validate, load_or_default, ConfigFile};

/// Top-level fail-fast handler.
///
/// Returns the value on success. On error, reports it and terminates the
/// process with [`PoolError::exit_code`]. By the time a pool error reaches
/// here the pool has already terminated its other children.
pub fn exit_on_failure<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            error!(error = %err, "build failed");
            eprintln!("{err}");
            std::process::exit(err.exit_code());
        }
    }
}

/// High-level entry point used by `main.rs`. Returns the exit status.
pub async fn run(args: CliArgs) -> Result<i32> {
    let cfg = match &args.config {
        Some(path) => load_and_validate(path)?,
        None => load_or_default(default_config_path())?,
    };

    match args.command {
        Command::Run(run_args) => {
            run_commands(&cfg, run_args).await?;
            Ok(0)
        }
        Command::Stale(stale_args) => report_staleness(stale_args),
        Command::Ls(ls_args) => {
            list_dir(&ls_args)?;
            Ok(0)
        }
    }
}

async fn run_commands(cfg: &ConfigFile, args: RunArgs) -> Result<()> {
    let mut settings = cfg.pool_settings();
    if let Some(jobs) = args.jobs {
        settings.size = Some(jobs);
    }
    if args.shell {
        settings.command_mode = CommandMode::Shell;
    } else if args.argv {
        settings.command_mode = CommandMode::Argv;
    }
    if args.capture {
        settings.capture_output = true;
    }
    debug!(?settings, "running commands from the command line");

    let mut pool = WorkerPool::new(settings);

    // Jobs sit in their own process groups, so a terminal Ctrl-C only
    // reaches us; the pool has to take them down itself.
    let finished = {
        let work = submit_all(&mut pool, args.commands);
        tokio::select! {
            result = work => Some(result),
            Ok(()) = tokio::signal::ctrl_c() => None,
        }
    };

    match finished {
        Some(result) => result,
        None => {
            warn!("interrupted; terminating running jobs");
            pool.kill_all().await?;
            Err(PoolError::Interrupted)
        }
    }
}

async fn submit_all(pool: &mut WorkerPool, commands: Vec<String>) -> Result<()> {
    for (index, command) in commands.into_iter().enumerate() {
        let location = SourceLocation::new("<command-line>", index as u32 + 1);
        pool.submit(location, command).await?;
    }
    pool.await_all().await
}

fn report_staleness(args: StaleArgs) -> Result<i32> {
    debug!(
        newest_input = %latest_mod_time(&args.inputs),
        newest_output = %latest_mod_time(&args.outputs),
        "staleness check"
    );

    let stale = StalenessQuery::new()
        .inputs(args.inputs)
        .outputs(args.outputs)
        .is_stale();

    let verdict = if stale { "stale" } else { "up-to-date" };
    write_stdout(|out| writeln!(out, "{verdict}"))?;
    Ok(if stale { 1 } else { 0 })
}

fn list_dir(args: &LsArgs) -> Result<()> {
    write_stdout(|out| print_level(out, &args.dir, args.recursive))
}

fn print_level<W: Write + ?Sized>(out: &mut W, dir: &str, recursive: bool) -> io::Result<()> {
    let mut result = Ok(());
    walk(dir, |entry| {
        if result.is_err() {
            return;
        }
        result = match entry {
            WalkEntry::Directory { path } => writeln!(out, "{path}").and_then(|()| {
                if recursive {
                    print_level(out, path, true)
                } else {
                    Ok(())
                }
            }),
            WalkEntry::File { .. } => writeln!(out, "{}", entry.full_path()),
        };
    });
    result
}

/// Run `f` against a locked stdout.
///
/// A reader that went away (`buildpool ls | head`) just ends the output.
fn write_stdout<F>(f: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match f(&mut out).and_then(|()| out.flush()) {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!("stdout closed by reader; output truncated");
            Ok(())
        }
        other => other.map_err(PoolError::from),
    }
}
