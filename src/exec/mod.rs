// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the user's command with
//! `tokio::process::Command` and tearing it down again.
//!
//! - [`runner`] owns the single active execution and its completion tracking.
//! - [`output`] tees child stdout/stderr to ours and into memory.
//! - [`process_group`] terminates the command together with its descendants.
//! - [`backend`] provides the `ProcessBackend` trait the runtime drives, which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod output;
pub mod process_group;
pub mod runner;

pub use backend::ProcessBackend;
pub use runner::{ExitFlag, RunOutcome, RunRecord, Runner, RunnerOptions};
