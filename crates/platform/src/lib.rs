#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Platform layer for relval
//!
//! This crate owns every interaction with the host system:
//! - Shell command execution with event emission and captured output
//! - The single-instance pid lock
//! - Filesystem helpers returning `relval_errors::Error`

pub mod fs;
pub mod lock;
pub mod process;

pub use lock::{pid_is_alive, PidLock};
pub use process::{CommandOutput, ProcessRunner, ShellCommand, ShellRunner};
