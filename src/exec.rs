//! Privileged command execution
//!
//! Defines the executor seam the drivers run external tools through
//! (iscsiadm, mount), plus the system implementation. Commands declare which
//! exit codes they accept; anything else is a structured failure carrying
//! the exit code so callers can tell "already in desired state" signals
//! apart from fatal errors.

use crate::error::{Error, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Captured output of a completed command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Runs external commands on behalf of the volume drivers
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run `cmd` with `args`, optionally via sudo.
    ///
    /// Returns an error unless the exit code is in `check_exit_codes`.
    async fn execute(
        &self,
        cmd: &str,
        args: &[&str],
        run_as_root: bool,
        check_exit_codes: &[i32],
    ) -> Result<CommandOutput>;
}

/// Executor backed by the host system
pub struct SystemExecutor;

#[async_trait]
impl Executor for SystemExecutor {
    async fn execute(
        &self,
        cmd: &str,
        args: &[&str],
        run_as_root: bool,
        check_exit_codes: &[i32],
    ) -> Result<CommandOutput> {
        let mut command = if run_as_root {
            let mut c = Command::new("sudo");
            c.arg(cmd);
            c
        } else {
            Command::new(cmd)
        };
        command.args(args);

        debug!("Executing: {} {}", cmd, args.join(" "));

        let output = command.output().await?;
        // Killed-by-signal has no code; report it as -1
        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if check_exit_codes.contains(&exit_code) {
            Ok(CommandOutput {
                stdout,
                stderr,
                exit_code,
            })
        } else {
            Err(Error::CommandFailed {
                command: format!("{} {}", cmd, args.join(" ")),
                exit_code,
                stderr,
            })
        }
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockExecutor;
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_mock_tolerated_exit_code() {
        let exec = MockExecutor::new();
        exec.script(255, "", "already logged in");

        let out = exec
            .execute("iscsiadm", &["--login"], true, &[0, 255])
            .await
            .unwrap();
        assert_eq!(out.exit_code, 255);
    }

    #[tokio::test]
    async fn test_mock_unexpected_exit_code() {
        let exec = MockExecutor::new();
        exec.script(1, "", "boom");

        let err = exec
            .execute("mount", &["-t", "nfs"], true, &[0])
            .await
            .unwrap_err();
        assert_matches!(err, Error::CommandFailed { exit_code: 1, .. });
    }

    #[tokio::test]
    async fn test_mock_records_root_flag() {
        let exec = MockExecutor::new();
        exec.execute("stat", &["/tmp"], false, &[0]).await.unwrap();

        let calls = exec.recorded();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].run_as_root);
        assert_eq!(calls[0].line(), "stat /tmp");
    }

    #[tokio::test]
    async fn test_system_executor_runs_command() {
        let out = SystemExecutor
            .execute("true", &[], false, &[0])
            .await
            .unwrap();
        assert_eq!(out.exit_code, 0);
    }

    #[tokio::test]
    async fn test_system_executor_rejects_unexpected_code() {
        let err = SystemExecutor
            .execute("false", &[], false, &[0])
            .await
            .unwrap_err();
        assert_matches!(err, Error::CommandFailed { exit_code: 1, .. });
    }
}
