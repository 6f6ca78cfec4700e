//! YAML command definitions
//!
//! ```yaml
//! flow: "build : deploy"
//! commands:
//!   - name: build
//!     help: compile everything
//!     flow: "clean : compile"
//!   - name: compile
//!     file: scripts/compile.sh
//!   - name: deploy
//!     flow: "build"
//!     file: scripts/deploy.sh
//! ```

use super::{Cmd, CmdKind, CmdRegistry};
use crate::error::{ErrorCode, FlowError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct CommandFile {
    /// Flow run when none is given on the command line
    #[serde(default)]
    pub flow: Option<String>,
    #[serde(default)]
    pub commands: Vec<CommandDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommandDefinition {
    pub name: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub flow: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub quiet: bool,
    #[serde(default)]
    pub unbreak_file_flow: bool,
}

impl CommandDefinition {
    /// Turn the definition into a command, resolving `file` against `base_dir`
    pub fn to_cmd(&self, base_dir: &Path) -> Result<Cmd> {
        if self.name.trim().is_empty() {
            return Err(FlowError::validation_with_code(
                ErrorCode::VALIDATION_REQUIRED_FIELD,
                "command definition without a name",
                Some("name".to_string()),
            ));
        }

        let flow = match &self.flow {
            Some(flow) => Some(shell_words::split(flow).map_err(|e| {
                FlowError::flow_with_code(
                    ErrorCode::FLOW_INVALID_SYNTAX,
                    format!("cannot split flow of command '{}'", self.name),
                )
                .with_source(e)
            })?),
            None => None,
        };
        let file = self.file.as_ref().map(|file| {
            if file.is_absolute() {
                file.clone()
            } else {
                base_dir.join(file)
            }
        });

        let kind = match (flow, file) {
            (Some(flow), Some(file)) => CmdKind::FileWithFlow { flow, file },
            (Some(flow), None) => CmdKind::Flow(flow),
            (None, Some(file)) => CmdKind::File(file),
            (None, None) => CmdKind::Empty,
        };

        let mut cmd = Cmd::new(self.name.trim(), self.help.clone(), kind);
        cmd.quiet = self.quiet;
        cmd.unbreak_file_and_flow = self.unbreak_file_flow;
        Ok(cmd)
    }
}

impl CmdRegistry {
    /// Register the commands of a YAML command file and return its default flow
    pub async fn load_definitions(&mut self, path: &Path) -> Result<Option<String>> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            FlowError::config_with_code(
                ErrorCode::CONFIG_NOT_FOUND,
                format!("cannot read command file {}", path.display()),
            )
            .with_source(e)
        })?;
        let file: CommandFile = serde_yaml::from_str(&content)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        for definition in &file.commands {
            let cmd = definition.to_cmd(base_dir)?;
            debug!("Registered {} command {}", cmd.cmd_type(), cmd.path);
            self.register(cmd);
        }
        Ok(file.flow)
    }
}
