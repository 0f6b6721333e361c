use async_trait::async_trait;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::{ProxyError, Result};
use super::{MediaCommand, ProcessRunner};

/// Runs commands as real child processes
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(command: &MediaCommand) -> Command {
        let mut cmd = Command::new(&command.binary_path);
        cmd.args(&command.args).kill_on_drop(true);
        cmd
    }

    fn into_stdout(command: &MediaCommand, output: Output) -> Result<String> {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProxyError::Tool(format!(
                "{} failed ({}): {}",
                command.description,
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, command: &MediaCommand) -> Result<String> {
        debug!("Executing: {}", command.command_line());

        let output = Self::command(command)
            .output()
            .await
            .map_err(|e| ProxyError::Tool(format!("Failed to execute {}: {}", command.binary_path, e)))?;

        Self::into_stdout(command, output)
    }

    async fn run_with_timeout(&self, command: &MediaCommand, timeout: Duration) -> Result<String> {
        debug!("Executing with {}s timeout: {}", timeout.as_secs(), command.command_line());

        // kill_on_drop reaps the child when the timeout drops the future
        let output = tokio::time::timeout(timeout, Self::command(command).output())
            .await
            .map_err(|_| ProxyError::ToolTimeout(command.description.clone(), timeout.as_secs()))?
            .map_err(|e| ProxyError::Tool(format!("Failed to execute {}: {}", command.binary_path, e)))?;

        Self::into_stdout(command, output)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_returns_stdout() {
        let cmd = MediaCommand::new("sh", "echo").arg("-c").arg("echo 42.5");
        let out = SystemRunner::new().run(&cmd).await.unwrap();
        assert_eq!(out.trim(), "42.5");
    }

    #[tokio::test]
    async fn test_run_reports_stderr_on_failure() {
        let cmd = MediaCommand::new("sh", "Failing tool").arg("-c").arg("echo broken >&2; exit 3");
        let err = SystemRunner::new().run(&cmd).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Failing tool failed"));
        assert!(msg.contains("broken"));
    }

    #[tokio::test]
    async fn test_run_with_timeout_expires() {
        let cmd = MediaCommand::new("sh", "Slow tool").arg("-c").arg("sleep 5");
        let err = SystemRunner::new()
            .run_with_timeout(&cmd, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::ToolTimeout(_, _)));
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_error() {
        let cmd = MediaCommand::new("definitely-not-a-real-binary-xyz", "Missing");
        let err = SystemRunner::new().run(&cmd).await.unwrap_err();
        assert!(matches!(err, ProxyError::Tool(_)));
    }
}
