//! Persisted progress of one flow run

use crate::command::ParsedFlow;
use crate::env::keys;
use crate::error::Result;
use crate::executor::mask::{ExecPolicy, ExecuteMask};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowResult {
    Running,
    Succeeded,
    Failed,
    Aborted,
}

impl fmt::Display for FlowResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FlowResult::Running => "running",
            FlowResult::Succeeded => "succeeded",
            FlowResult::Failed => "failed",
            FlowResult::Aborted => "aborted",
        };
        write!(f, "{}", text)
    }
}

/// How a run ended, as reported to the status writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    Succeeded,
    Failed(String),
    Aborted,
}

impl FlowOutcome {
    pub fn from_result(result: &Result<()>) -> Self {
        match result {
            Ok(()) => FlowOutcome::Succeeded,
            Err(e) if e.is_abort() => FlowOutcome::Aborted,
            Err(e) => FlowOutcome::Failed(e.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FlowOutcome::Succeeded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CmdState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
    Scheduled,
}

impl CmdState {
    /// Nothing left to do for this command on a retry
    pub fn is_done(self) -> bool {
        matches!(
            self,
            CmdState::Succeeded | CmdState::Skipped | CmdState::Scheduled
        )
    }
}

impl fmt::Display for CmdState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CmdState::Pending => "pending",
            CmdState::Running => "running",
            CmdState::Succeeded => "succeeded",
            CmdState::Failed => "failed",
            CmdState::Skipped => "skipped",
            CmdState::Scheduled => "scheduled",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmdStatus {
    pub index: usize,
    pub path: String,
    pub state: CmdState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Contents of `status.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStatus {
    pub session_id: String,
    /// Flow tokens, enough to parse the flow again
    pub flow: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands_file: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub result: FlowResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub commands: Vec<CmdStatus>,
    /// Session env layer at the end of the run
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub bg_tasks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_of: Option<String>,
}

impl FlowStatus {
    pub fn new(session_id: impl Into<String>, flow: &ParsedFlow) -> Self {
        let commands = flow
            .cmds
            .iter()
            .enumerate()
            .map(|(index, cmd)| CmdStatus {
                index,
                path: cmd.display(),
                state: CmdState::Pending,
                error: None,
                started_at: None,
                finished_at: None,
            })
            .collect();
        Self {
            session_id: session_id.into(),
            flow: flow.to_tokens(),
            commands_file: None,
            started_at: Utc::now(),
            finished_at: None,
            result: FlowResult::Running,
            error: None,
            commands,
            env: BTreeMap::new(),
            bg_tasks: Vec::new(),
            retry_of: None,
        }
    }

    pub fn command_mut(&mut self, index: usize) -> Option<&mut CmdStatus> {
        self.commands.get_mut(index)
    }

    pub fn mark_started(&mut self, index: usize) {
        if let Some(cmd) = self.command_mut(index) {
            cmd.state = CmdState::Running;
            cmd.started_at = Some(Utc::now());
        }
    }

    pub fn mark_finished(&mut self, index: usize, state: CmdState, error: Option<String>) {
        if let Some(cmd) = self.command_mut(index) {
            cmd.state = state;
            cmd.error = error;
            cmd.finished_at = Some(Utc::now());
        }
    }

    pub fn finish(&mut self, outcome: &FlowOutcome, env: BTreeMap<String, String>) {
        self.finished_at = Some(Utc::now());
        self.env = env
            .into_iter()
            .filter(|(key, _)| !keys::is_runtime_key(key))
            .collect();
        match outcome {
            FlowOutcome::Succeeded => {
                self.result = FlowResult::Succeeded;
                self.error = None;
            }
            FlowOutcome::Failed(message) => {
                self.result = FlowResult::Failed;
                self.error = Some(message.clone());
            }
            FlowOutcome::Aborted => {
                self.result = FlowResult::Aborted;
                self.error = Some(crate::error::ABORTED_BY_USER.to_string());
            }
        }
    }

    /// A run that did not succeed can be resumed
    pub fn is_retryable(&self) -> bool {
        self.result != FlowResult::Succeeded
    }

    /// Index of the first command a retry would run
    pub fn first_unfinished(&self) -> Option<usize> {
        self.commands
            .iter()
            .find(|cmd| !cmd.state.is_done())
            .map(|cmd| cmd.index)
    }

    /// Masks that skip every command finished in this run
    pub fn retry_masks(&self) -> Vec<ExecuteMask> {
        self.commands
            .iter()
            .map(|cmd| {
                if cmd.state.is_done() {
                    ExecuteMask::new(ExecPolicy::Skip)
                } else {
                    ExecuteMask::tracked(ExecPolicy::Default)
                }
            })
            .collect()
    }
}
