//! Child-process execution
//!
//! [`ProcessRunner`] executes an ordered list of [`InvocationRequest`]s, each
//! as a direct child process (no shell) with the working directory pinned to
//! the application root. Sequencing is deliberately best-effort: every
//! request runs regardless of the previous one's exit status. A Ctrl-C
//! during execution is caught and converted into a clean return so the
//! program can exit without a panic or a signal-shaped error; the child
//! receives the same signal through the process group.
//!
//! No timeout is imposed here. Interactive commands (a chat session, a
//! foreground `up`) run until they exit or are interrupted.
//!
//! The [`CommandExecutor`] trait is the seam the dispatcher talks through,
//! so tests can substitute a recording executor.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::future::Future;
use std::path::PathBuf;
use tokio::process::Command;
use tokio::signal;
use tracing::{debug, warn};

use crate::command::InvocationRequest;

/// Outcome of running a sequence of commands. Status and captured streams
/// are those of the last command that ran.
#[derive(Debug, Clone, Default)]
pub struct InvocationResult {
    /// Exit code of the last command; `None` if it was killed by a signal
    /// or never spawned.
    pub exit_code: Option<i32>,

    /// Captured standard output, when capture was requested.
    pub stdout: Option<String>,

    /// Captured standard error, when capture was requested.
    pub stderr: Option<String>,

    /// The run was cut short by a user interrupt. Treated as clean.
    pub interrupted: bool,
}

impl InvocationResult {
    /// A user interrupt counts as success: the user asked for the stop.
    pub fn success(&self) -> bool {
        self.interrupted || self.exit_code == Some(0)
    }

    /// Exit code the program should propagate for this result.
    pub fn program_exit_code(&self) -> i32 {
        if self.interrupted {
            0
        } else {
            self.exit_code.unwrap_or(1)
        }
    }
}

/// Executes command sequences. Implemented by [`ProcessRunner`] for real
/// child processes and by recording fakes in tests.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, requests: &[InvocationRequest], capture: bool) -> InvocationResult;
}

/// Runs commands as direct child processes rooted at the application
/// directory.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    app_root: PathBuf,
}

impl ProcessRunner {
    pub fn new(app_root: PathBuf) -> Self {
        Self { app_root }
    }

    /// Runs the requests in order, catching Ctrl-C.
    pub async fn run(&self, requests: &[InvocationRequest], capture: bool) -> InvocationResult {
        self.run_with_interrupt(requests, capture, async {
            // An error installing the handler leaves the future pending,
            // which degrades to "no interrupt handling".
            if signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Same as [`run`](Self::run) with the interrupt source injected, so
    /// tests can trigger it deterministically.
    pub async fn run_with_interrupt<F>(
        &self,
        requests: &[InvocationRequest],
        capture: bool,
        interrupt: F,
    ) -> InvocationResult
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);
        let mut result = InvocationResult::default();

        for request in requests {
            debug!(command = %request.display(), capture, "running command");
            tokio::select! {
                outcome = self.run_one(request, capture) => match outcome {
                    Ok((exit_code, stdout, stderr)) => {
                        if exit_code != Some(0) {
                            warn!(command = %request.display(), code = ?exit_code, "command exited non-zero");
                        }
                        result.exit_code = exit_code;
                        result.stdout = stdout;
                        result.stderr = stderr;
                    }
                    Err(e) => {
                        // Best-effort sequencing: log and move on.
                        warn!(command = %request.display(), error = format!("{e:#}"), "command could not run");
                        result.exit_code = None;
                        result.stdout = None;
                        result.stderr = None;
                    }
                },
                _ = &mut interrupt => {
                    debug!("user interrupt, treating as clean termination");
                    result.interrupted = true;
                    break;
                }
            }
        }

        result
    }

    async fn run_one(
        &self,
        request: &InvocationRequest,
        capture: bool,
    ) -> Result<(Option<i32>, Option<String>, Option<String>)> {
        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args)
            .current_dir(&self.app_root)
            // Only relevant when the wait is cancelled by an interrupt; the
            // terminal already delivered the signal to the child as well.
            .kill_on_drop(true);

        if capture {
            let output = cmd
                .output()
                .await
                .with_context(|| format!("running '{}'", request.display()))?;
            Ok((
                output.status.code(),
                Some(String::from_utf8_lossy(&output.stdout).into_owned()),
                Some(String::from_utf8_lossy(&output.stderr).into_owned()),
            ))
        } else {
            let status = cmd
                .status()
                .await
                .with_context(|| format!("running '{}'", request.display()))?;
            Ok((status.code(), None, None))
        }
    }
}

#[async_trait]
impl CommandExecutor for ProcessRunner {
    async fn execute(&self, requests: &[InvocationRequest], capture: bool) -> InvocationResult {
        self.run(requests, capture).await
    }
}
