//! Process execution capability
//!
//! Every external tool the spool transports need (`lpstat`, `lp`, `scp`,
//! `ssh`, `sshpass`) is invoked through a [`CommandRunner`], which the
//! dispatcher receives at construction.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::ExecError;

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when the process was killed by a signal
    pub status: Option<i32>,
}

impl CommandOutput {
    /// Successful output with exit status 0
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            status: Some(0),
        }
    }

    /// Failed output with the given exit status
    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            status: Some(status),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Turn a non-zero exit into [`ExecError::Status`]
    pub fn check(self, program: &str) -> Result<Self, ExecError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ExecError::Status {
                program: program.to_string(),
                status: self.status,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs an external program to completion
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`; spawn failures are errors, non-zero exits are not
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ExecError>;
}

/// [`CommandRunner`] backed by real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ExecError> {
        debug!(program, ?args, "Running command");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExecError::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status() {
        assert!(CommandOutput::ok("x").check("lp").is_ok());

        let err = CommandOutput::failed(1, "lp: The printer or class does not exist.\n")
            .check("lp")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "lp exited with status 1: lp: The printer or class does not exist."
        );
    }

    #[test]
    fn test_signal_exit_is_failure() {
        let output = CommandOutput {
            status: None,
            ..CommandOutput::default()
        };
        assert!(!output.success());
        assert!(output.check("ssh").unwrap_err().to_string().contains("signal"));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = SystemCommandRunner
            .run("till-printer-no-such-program", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }
}
