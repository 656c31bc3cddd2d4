// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`process`] defines the `ProcessHandle` / `Launcher` capabilities the
//!   worker pool is written against.
//! - [`launcher`] provides `OsLauncher`, which starts real child processes
//!   with `tokio::process::Command`, either through the platform shell or as a
//!   whitespace-tokenized argument vector.
//! - [`tokenize`] is that whitespace tokenizer.

pub mod launcher;
pub mod process;
pub mod tokenize;

pub use launcher::OsLauncher;
pub use process::{BoxFuture, Launcher, ProcessHandle};
pub use tokenize::tokenize;
