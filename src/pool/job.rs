// src/pool/job.rs

use std::fmt;

/// Where a job was submitted from, for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// The [`SourceLocation`] of the macro invocation.
///
/// ```no_run
/// # async fn build(pool: &mut buildpool::WorkerPool) -> buildpool::errors::Result<()> {
/// pool.submit(buildpool::location!(), "cc -c main.c -o main.o").await?;
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! location {
    () => {
        $crate::pool::SourceLocation::new(file!(), line!())
    };
}

/// One command line to execute, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub location: SourceLocation,
    pub command: String,
}

impl Job {
    pub fn new(location: SourceLocation, command: impl Into<String>) -> Self {
        Self {
            location,
            command: command.into(),
        }
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Failed(i32), // exit code, -1 when killed by a signal
}
