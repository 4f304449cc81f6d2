//! Llemy subprocess infrastructure adapter.
//!
//! Implements the [`pipeline::CommandRunner`] trait over `tokio::process`.
//! Every external tool Llemy talks to (`gh`, `codex`) is reached through this
//! one runner, so the rules for arguments, output capture, timeouts and error
//! reporting live in exactly one place.
//!
//! ## Architectural Layer
//!
//! **Infrastructure adapter.** No domain logic lives here.
//!
//! ## Behaviour
//!
//! - Arguments are passed verbatim; no shell is involved.
//! - stdin is closed; stdout and stderr are captured.
//! - The child is killed when its future is dropped, which is how an elapsed
//!   timeout terminates it.
//! - Success returns stdout with surrounding whitespace trimmed.
//! - Failure detail is the first non-blank of trimmed stderr, trimmed stdout,
//!   or a description of the exit status.

use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use pipeline::{CommandInvocation, CommandRunner, LlemyError};
use tokio::process::Command;
use tracing::debug;

/// [`CommandRunner`] that spawns real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a runner.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &CommandInvocation) -> Result<String, LlemyError> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        debug!(
            program = %invocation.program,
            args = invocation.args.len(),
            timeout_ms = invocation.timeout.map(|t| t.as_millis() as u64),
            "Running command"
        );

        let output = match invocation.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| LlemyError::CommandTimeout {
                    program: invocation.program.clone(),
                    timeout: limit,
                })?,
            None => command.output().await,
        }
        .map_err(|e| LlemyError::ExternalCommand {
            program: invocation.program.clone(),
            detail: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = failure_detail(stderr, stdout, output.status);
        debug!(program = %invocation.program, %detail, "Command failed");
        Err(LlemyError::ExternalCommand {
            program: invocation.program.clone(),
            detail,
        })
    }
}

fn failure_detail(stderr: String, stdout: String, status: ExitStatus) -> String {
    if !stderr.is_empty() {
        return stderr;
    }
    if !stdout.is_empty() {
        return stdout;
    }
    match status.code() {
        Some(code) => format!("exited with status {code}"),
        None => "terminated by signal".to_string(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use super::*;

    fn sh(script: &str) -> CommandInvocation {
        CommandInvocation::new("sh").args(["-c", script])
    }

    #[tokio::test]
    async fn returns_trimmed_stdout() {
        let out = ProcessRunner
            .run(&CommandInvocation::new("echo").args(["  hello  "]))
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn arguments_are_not_shell_expanded() {
        let out = ProcessRunner
            .run(&CommandInvocation::new("echo").args(["$HOME && rm -rf /"]))
            .await
            .unwrap();
        assert_eq!(out, "$HOME && rm -rf /");
    }

    #[tokio::test]
    async fn non_zero_exit_prefers_stderr() {
        let err = ProcessRunner
            .run(&sh("echo out; echo 'bad thing' >&2; exit 3"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LlemyError::ExternalCommand {
                program: "sh".into(),
                detail: "bad thing".into(),
            }
        );
    }

    #[tokio::test]
    async fn non_zero_exit_falls_back_to_stdout_then_status() {
        let err = ProcessRunner.run(&sh("echo only-out; exit 1")).await.unwrap_err();
        assert_eq!(err.to_string(), "sh failed: only-out");

        let err = ProcessRunner.run(&sh("exit 4")).await.unwrap_err();
        assert_eq!(err.to_string(), "sh failed: exited with status 4");
    }

    #[tokio::test]
    async fn elapsed_timeout_is_reported() {
        let err = ProcessRunner
            .run(&sh("sleep 5").timeout(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn runs_in_working_directory() {
        let dir = std::env::temp_dir();
        let out = ProcessRunner
            .run(&CommandInvocation::new("pwd").working_dir(&dir))
            .await
            .unwrap();
        let expected = dir.canonicalize().unwrap();
        assert_eq!(
            std::path::PathBuf::from(out).canonicalize().unwrap(),
            expected
        );
    }

    #[tokio::test]
    async fn missing_program_is_an_external_command_error() {
        let err = ProcessRunner
            .run(&CommandInvocation::new("llemy-definitely-not-installed"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlemyError::ExternalCommand { .. }));
    }
}
