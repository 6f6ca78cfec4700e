//! Invocation settings shared by every subcommand

use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
    /// Directory the project config and relative paths resolve against
    pub working_dir: PathBuf,
    /// Filter used when no `-v` is given
    pub default_log_level: Option<String>,
}

impl AppConfig {
    pub fn new(verbose: u8) -> Result<Self> {
        let working_dir = std::env::current_dir()
            .map_err(|e| anyhow::anyhow!("Failed to get current directory: {}", e))?;

        Ok(Self {
            verbose,
            working_dir,
            default_log_level: None,
        })
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn with_default_log_level(mut self, level: Option<String>) -> Self {
        self.default_log_level = level;
        self
    }

    /// Tracing filter for the verbosity level
    pub fn log_level(&self) -> String {
        match self.verbose {
            0 => self
                .default_log_level
                .clone()
                .unwrap_or_else(|| "warn".to_string()),
            1 => "debug".to_string(),
            2 => "trace".to_string(),
            _ => "trace,tokio=debug".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            verbose: 0,
            working_dir: PathBuf::from("."),
            default_log_level: None,
        }
    }
}
