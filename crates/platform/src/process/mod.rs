//! Shell command execution
//!
//! Every external collaborator (unpacking, the validation tool, its status
//! probe and the mail transport) is an opaque shell string run through
//! `/bin/sh -c`. The controller blocks on each child until it exits.

use async_trait::async_trait;
use relval_errors::{Error, PlatformError};
use relval_events::{AppEvent, EventEmitter, EventSender, ProcessEvent};
use std::convert::TryFrom;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const SHELL: &str = "/bin/sh";

/// A rendered shell command line, optionally fed on stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub command: String,
    pub stdin: Option<String>,
}

impl ShellCommand {
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            stdin: None,
        }
    }

    /// Feed `input` to the command's standard input
    #[must_use]
    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

/// Result of a command that was spawned and waited for
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, `None` when the child was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs shell commands on behalf of the orchestrator
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `command` to completion
    ///
    /// A non-zero exit is reported in the output, not as an error; only a
    /// failure to spawn or wait for the child is an error.
    async fn run(&self, command: &ShellCommand) -> Result<CommandOutput, Error>;
}

/// `ProcessRunner` backed by `/bin/sh -c`
///
/// Output is captured and forwarded as a debug-level event, so it only
/// reaches the console when debug logging is enabled.
#[derive(Clone)]
pub struct ShellRunner {
    tx: EventSender,
}

impl ShellRunner {
    #[must_use]
    pub fn new(tx: EventSender) -> Self {
        Self { tx }
    }

    async fn spawn_and_wait(command: &ShellCommand) -> Result<std::process::Output, PlatformError> {
        let spawn_error = |e: std::io::Error| PlatformError::ProcessExecutionFailed {
            command: command.command.clone(),
            message: e.to_string(),
        };

        let mut child = Command::new(SHELL)
            .arg("-c")
            .arg(&command.command)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        if let (Some(input), Some(mut stdin)) = (&command.stdin, child.stdin.take()) {
            // A child that exits without reading its input closes the pipe;
            // its exit code tells the real story.
            let _ = stdin.write_all(input.as_bytes()).await;
            drop(stdin);
        }

        child.wait_with_output().await.map_err(spawn_error)
    }
}

impl EventEmitter for ShellRunner {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

#[async_trait]
impl ProcessRunner for ShellRunner {
    async fn run(&self, command: &ShellCommand) -> Result<CommandOutput, Error> {
        let start = Instant::now();
        self.emit(AppEvent::Process(ProcessEvent::Started {
            command: command.command.clone(),
        }));

        let output = match Self::spawn_and_wait(command).await {
            Ok(output) => output,
            Err(e) => {
                self.emit(AppEvent::Process(ProcessEvent::Failed {
                    command: command.command.clone(),
                    error: e.to_string(),
                }));
                return Err(e.into());
            }
        };

        let duration = start.elapsed();
        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration,
        };

        if !result.stdout.is_empty() || !result.stderr.is_empty() {
            self.emit(AppEvent::Process(ProcessEvent::Output {
                command: command.command.clone(),
                stdout: result.stdout.clone(),
                stderr: result.stderr.clone(),
            }));
        }
        self.emit(AppEvent::Process(ProcessEvent::Completed {
            command: command.command.clone(),
            exit_code: result.code,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }));

        Ok(result)
    }
}
