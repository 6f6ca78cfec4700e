//! State shared by every subcommand of one invocation

use crate::app::AppConfig;
use crate::command::CmdRegistry;
use crate::config::{get_global_cmdflow_dir, Config, ConfigLoader};
use crate::env::persist::load_persisted;
use crate::env::Env;
use crate::session::SessionStore;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the data directory
pub const HOME_ENV_VAR: &str = "CMDFLOW_HOME";

/// `--data-dir`, else `$CMDFLOW_HOME`, else the platform data directory
pub fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Some(dir) = std::env::var_os(HOME_ENV_VAR) {
        return Ok(PathBuf::from(dir));
    }
    Ok(get_global_cmdflow_dir()?)
}

/// Registry with built-ins plus the definitions of a command file
pub struct LoadedCommands {
    pub registry: CmdRegistry,
    pub file: Option<PathBuf>,
    /// Flow the command file runs when none is given
    pub default_flow: Option<String>,
}

pub struct CliContext {
    pub app: AppConfig,
    pub loader: ConfigLoader,
}

impl CliContext {
    pub async fn load(app: AppConfig, data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir)?;
        debug!("Using data directory {}", data_dir.display());
        let loader = ConfigLoader::load(data_dir, &app.working_dir).await?;
        let app = app.with_default_log_level(loader.get_config().log_level.clone());
        Ok(Self { app, loader })
    }

    pub fn config(&self) -> &Config {
        self.loader.get_config()
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.loader.sessions_dir())
    }

    pub fn env_file(&self) -> PathBuf {
        self.loader.env_file()
    }

    /// Fresh env: config defaults plus the persisted layer
    pub fn load_env(&self) -> Result<Env> {
        let mut env = Env::new();
        self.config().seed_env(&mut env);
        load_persisted(&mut env, &self.env_file())?;
        Ok(env)
    }

    /// Load `commands`, or the configured command file when `None`
    pub async fn load_commands(&self, commands: Option<&Path>) -> Result<LoadedCommands> {
        let mut registry = CmdRegistry::with_builtins();
        let file = match commands {
            Some(path) if path.is_relative() => Some(self.app.working_dir.join(path)),
            Some(path) => Some(path.to_path_buf()),
            None => self.loader.commands_file(),
        };
        let default_flow = match &file {
            Some(path) => registry.load_definitions(path).await?,
            None => None,
        };
        Ok(LoadedCommands {
            registry,
            file,
            default_flow,
        })
    }
}
