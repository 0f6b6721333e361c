// External tool plumbing
//
// - Commands: builders for ffprobe, mpv and mediainfo invocations
// - Runner: executes a command and hands back stdout

pub mod commands;
pub mod runner;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use commands::*;
pub use runner::*;

use crate::error::Result;

/// Executes external media tools
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion and return stdout; non-zero exit is a tool error
    async fn run(&self, command: &MediaCommand) -> Result<String>;

    /// Same as `run`, killing the child once `timeout` elapses
    async fn run_with_timeout(&self, command: &MediaCommand, timeout: Duration) -> Result<String>;
}

/// Factory for process runner instances
pub struct ProcessRunnerFactory;

impl ProcessRunnerFactory {
    /// Runner backed by real child processes
    pub fn create_system() -> Arc<dyn ProcessRunner> {
        Arc::new(SystemRunner::new())
    }
}
