//! Runner for file commands

use crate::error::{ErrorCode, FlowError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Prefix of env vars carrying command arguments into scripts
pub const ARG_ENV_PREFIX: &str = "CMDFLOW_ARG_";
/// Prefix of env vars carrying the flow env into scripts
pub const FLOW_ENV_PREFIX: &str = "CMDFLOW_ENV_";

/// Everything a file command needs from the flow
#[derive(Debug, Clone, Default)]
pub struct FileInvocation {
    pub cmd_path: String,
    pub args: BTreeMap<String, String>,
    pub positional: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub working_directory: Option<PathBuf>,
}

impl FileInvocation {
    /// Process env vars: args and flow env, upper-cased with `.`/`-` mapped to `_`
    pub fn env_vars(&self) -> Vec<(String, String)> {
        let args = self
            .args
            .iter()
            .map(|(k, v)| (format!("{}{}", ARG_ENV_PREFIX, env_var_name(k)), v.clone()));
        let env = self
            .env
            .iter()
            .map(|(k, v)| (format!("{}{}", FLOW_ENV_PREFIX, env_var_name(k)), v.clone()));
        args.chain(env).collect()
    }
}

fn env_var_name(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '.' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// Result of running a file command
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Trait for running the executable part of file commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run_file(&self, file: &Path, invocation: &FileInvocation) -> Result<ExecutionResult>;
}

/// Runs files through `sh`
pub struct RealCommandRunner {
    capture_output: bool,
}

impl RealCommandRunner {
    /// Runner whose scripts write straight to the terminal
    pub fn new() -> Self {
        Self {
            capture_output: false,
        }
    }

    /// Runner that captures stdout/stderr into the result
    pub fn capturing() -> Self {
        Self {
            capture_output: true,
        }
    }
}

impl Default for RealCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for RealCommandRunner {
    async fn run_file(&self, file: &Path, invocation: &FileInvocation) -> Result<ExecutionResult> {
        debug!(
            "Running file {} for command {}",
            file.display(),
            invocation.cmd_path
        );
        let mut command = Command::new("sh");
        command.arg(file).args(&invocation.positional);
        if let Some(dir) = &invocation.working_directory {
            command.current_dir(dir);
        }
        for (key, value) in invocation.env_vars() {
            command.env(key, value);
        }

        if self.capture_output {
            command.stdout(Stdio::piped());
            command.stderr(Stdio::piped());
        }

        let output = command.output().await.map_err(|e| {
            FlowError::execution_with_code(
                ErrorCode::EXEC_SPAWN_FAILED,
                format!("cannot run {}", file.display()),
                Some(invocation.cmd_path.clone()),
            )
            .with_source(e)
        })?;

        Ok(ExecutionResult {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
        })
    }
}
