// src/pool/mod.rs

//! Bounded-parallelism job execution.
//!
//! A [`WorkerPool`] owns `N` slots; each holds at most one running job. Jobs
//! are plain command lines tagged with a [`SourceLocation`]:
//!
//! ```no_run
//! use buildpool::{location, PoolSettings, WorkerPool};
//!
//! # async fn build() -> buildpool::errors::Result<()> {
//! let mut pool = WorkerPool::new(PoolSettings::default());
//! for unit in ["a", "b", "c"] {
//!     pool.submit(location!(), format!("cc -c {unit}.c -o {unit}.o")).await?;
//! }
//! pool.await_all().await?;
//! pool.run_serial(location!(), "cc a.o b.o c.o -o app").await?;
//! # Ok(())
//! # }
//! ```

pub mod job;
pub mod scheduler;
mod slot;

pub use job::{Job, JobOutcome, SourceLocation};
pub use scheduler::{PoolSettings, WorkerPool, DEFAULT_IDLE_BACKOFF};
pub use slot::SlotState;
