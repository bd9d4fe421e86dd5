//! Subprocess execution with deadlines.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit status was zero
    pub success: bool,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl ProcessOutput {
    /// Successful output with the given stdout
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given stderr
    #[must_use]
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// stdout followed by stderr, the way a terminal would show them
    #[must_use]
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            return self.stdout.clone();
        }
        if self.stdout.is_empty() {
            return self.stderr.clone();
        }
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Process execution failures
#[derive(Debug, Error)]
pub enum RunError {
    /// Process did not finish before the deadline and was killed
    #[error("process timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
    /// Process could not be started
    #[error("failed to spawn process: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Runs external programs.
///
/// Implementations must stop the child when the returned future is dropped,
/// so that [`run_with_deadline`] can enforce its timeout.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args` to completion and capture its output.
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<ProcessOutput>;
}

/// [`ProcessRunner`] backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<ProcessOutput> {
        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(ProcessOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run a process, giving up after `timeout`.
///
/// # Errors
///
/// Returns [`RunError::TimedOut`] when the deadline fires and
/// [`RunError::Spawn`] when the process cannot be started.
pub async fn run_with_deadline(
    runner: &dyn ProcessRunner,
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<ProcessOutput, RunError> {
    debug!(program = %program, command = %render_command(program, args), "Running command");
    match tokio::time::timeout(timeout, runner.run(program, args)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(RunError::TimedOut(timeout)),
    }
}

/// Shell-quoted rendering of a command line, for logs.
#[must_use]
pub fn render_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(|part| shell_escape::escape(part.into()).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
