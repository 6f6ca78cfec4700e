use super::{Config, CONFIG_FILE, DEFAULT_COMMANDS_FILE, PROJECT_CONFIG_DIR};
use crate::error::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const SESSIONS_DIR: &str = "sessions";
const ENV_FILE: &str = "env.toml";

/// Builds the effective [`Config`] from its layers
pub struct ConfigLoader {
    config: Config,
    data_dir: PathBuf,
    project_dir: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            config: Config::new(),
            data_dir: data_dir.into(),
            project_dir: None,
        }
    }

    /// Load every layer: global, project at `project_path`, environment
    pub async fn load(data_dir: impl Into<PathBuf>, project_path: &Path) -> Result<Self> {
        let mut loader = Self::new(data_dir);
        loader.load_global().await?;
        loader.load_project(project_path).await?;
        loader.config.merge_env_vars();
        Ok(loader)
    }

    pub async fn load_global(&mut self) -> Result<()> {
        let config_path = self.data_dir.join(CONFIG_FILE);
        if let Some(global) = read_config(&config_path).await? {
            self.config.merge(global);
        }
        Ok(())
    }

    /// Merge `.cmdflow/config.toml` under `project_path`; its relative paths
    /// resolve against `project_path`
    pub async fn load_project(&mut self, project_path: &Path) -> Result<()> {
        self.project_dir = Some(project_path.to_path_buf());
        let config_path = project_path.join(PROJECT_CONFIG_DIR).join(CONFIG_FILE);
        if let Some(mut project) = read_config(&config_path).await? {
            project.resolve_paths(project_path);
            self.config.merge(project);
        }
        Ok(())
    }

    pub fn merge_env_vars(&mut self) {
        self.config.merge_env_vars();
    }

    pub fn get_config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.config
            .sessions_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join(SESSIONS_DIR))
    }

    pub fn env_file(&self) -> PathBuf {
        self.config
            .env_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join(ENV_FILE))
    }

    /// Configured command file, else `cmdflow.yml` in the project if present
    pub fn commands_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config.commands {
            return Some(path.clone());
        }
        self.project_dir
            .as_ref()
            .map(|dir| dir.join(DEFAULT_COMMANDS_FILE))
            .filter(|path| path.exists())
    }
}

async fn read_config(path: &Path) -> Result<Option<Config>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!("No config at {}", path.display());
        return Ok(None);
    }
    let content = fs::read_to_string(path).await?;
    debug!("Loaded config from {}", path.display());
    Config::from_toml(&content, path).map(Some)
}
