//! Configuration
//!
//! Settings come from up to three places, later ones winning:
//!
//! 1. the global `config.toml` in the cmdflow data directory
//! 2. the project's `.cmdflow/config.toml`
//! 3. `CMDFLOW_*` environment variables
//!
//! Values that commands read at runtime (wait seconds) are seeded into the
//! default layer of the flow [`Env`](crate::env::Env).

pub mod loader;

pub use loader::ConfigLoader;

use crate::breakpoint::InvalidInputPolicy;
use crate::env::{keys, Env, EnvLayer};
use crate::error::{ErrorCode, FlowError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const CONFIG_FILE: &str = "config.toml";
pub const PROJECT_CONFIG_DIR: &str = ".cmdflow";
pub const DEFAULT_COMMANDS_FILE: &str = "cmdflow.yml";
pub const ENV_VAR_PREFIX: &str = "CMDFLOW_";

/// Data directory holding the global config, the env file and sessions
pub fn get_global_cmdflow_dir() -> Result<PathBuf> {
    ProjectDirs::from("dev", "cmdflow", "cmdflow")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| FlowError::config("could not determine the cmdflow data directory"))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where session directories are created
    pub sessions_dir: Option<PathBuf>,
    /// TOML file backing the persisted env layer
    pub env_file: Option<PathBuf>,
    pub execute_wait_sec: Option<u64>,
    pub execute_wait_sec_at_end: Option<u64>,
    pub invalid_input: Option<InvalidInputPolicy>,
    pub log_level: Option<String>,
    /// Flow run before every main flow
    pub bootstrap: Option<String>,
    /// Command definition file
    pub commands: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML config file body
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            FlowError::config_with_code(
                ErrorCode::CONFIG_INVALID_TOML,
                format!("invalid config {}", origin.display()),
            )
            .with_source(e)
        })
    }

    /// Overlay every value set in `other`
    pub fn merge(&mut self, other: Config) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field;
                })*
            };
        }
        overlay!(
            sessions_dir,
            env_file,
            execute_wait_sec,
            execute_wait_sec_at_end,
            invalid_input,
            log_level,
            bootstrap,
            commands
        );
    }

    pub fn merge_env_vars(&mut self) {
        self.merge_env_from(|name| std::env::var(name).ok());
    }

    /// Apply `CMDFLOW_*` overrides read through `lookup`. Values that do
    /// not parse are ignored with a warning.
    pub fn merge_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_VAR_PREFIX, name));

        if let Some(dir) = var("SESSIONS_DIR") {
            self.sessions_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.log_level = Some(level);
        }
        if let Some(flow) = var("BOOTSTRAP") {
            self.bootstrap = Some(flow);
        }
        if let Some(file) = var("COMMANDS") {
            self.commands = Some(PathBuf::from(file));
        }
        if let Some(secs) = var("EXECUTE_WAIT_SEC") {
            match secs.parse() {
                Ok(secs) => self.execute_wait_sec = Some(secs),
                Err(_) => warn!("Ignoring CMDFLOW_EXECUTE_WAIT_SEC={}", secs),
            }
        }
        if let Some(secs) = var("EXECUTE_WAIT_SEC_AT_END") {
            match secs.parse() {
                Ok(secs) => self.execute_wait_sec_at_end = Some(secs),
                Err(_) => warn!("Ignoring CMDFLOW_EXECUTE_WAIT_SEC_AT_END={}", secs),
            }
        }
        if let Some(policy) = var("INVALID_INPUT") {
            match policy.parse() {
                Ok(policy) => self.invalid_input = Some(policy),
                Err(e) => warn!("Ignoring CMDFLOW_INVALID_INPUT: {}", e),
            }
        }
    }

    /// Resolve relative paths against `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.sessions_dir, &mut self.env_file, &mut self.commands]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn invalid_input_policy(&self) -> InvalidInputPolicy {
        self.invalid_input.unwrap_or_default()
    }

    /// Write config-derived values into the default env layer
    pub fn seed_env(&self, env: &mut Env) {
        if let Some(secs) = self.execute_wait_sec {
            env.set_in(EnvLayer::Default, keys::EXECUTE_WAIT_SEC, secs.to_string());
        }
        if let Some(secs) = self.execute_wait_sec_at_end {
            env.set_in(
                EnvLayer::Default,
                keys::EXECUTE_WAIT_SEC_AT_END,
                secs.to_string(),
            );
        }
    }
}
