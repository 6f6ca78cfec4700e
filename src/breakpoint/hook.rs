//! Breakpoint prompting
//!
//! The engine never reads input itself; it asks a [`BreakpointHook`]. The
//! terminal hook reads stdin, the scripted hook replays a list of answers and
//! is what tests and `--script` runs use.

use crate::error::{ErrorCode, FlowError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

/// Answer the scripted hook gives once its script runs out
pub const SCRIPT_FALLBACK_ANSWER: &str = "c";

/// What to do when the answer at a prompt is not one of the offered keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidInput {
    Reprompt,
    Continue,
}

/// Configured handling of invalid answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidInputPolicy {
    /// Whatever the hook prefers
    #[default]
    Auto,
    Reprompt,
    Continue,
}

impl InvalidInputPolicy {
    pub fn resolve(self, hook_default: InvalidInput) -> InvalidInput {
        match self {
            Self::Auto => hook_default,
            Self::Reprompt => InvalidInput::Reprompt,
            Self::Continue => InvalidInput::Continue,
        }
    }
}

impl FromStr for InvalidInputPolicy {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "reprompt" => Ok(Self::Reprompt),
            "continue" => Ok(Self::Continue),
            other => Err(FlowError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                format!(
                    "invalid_input must be auto, reprompt or continue, got '{}'",
                    other
                ),
            )),
        }
    }
}

/// Source of answers at breakpoints and interactive prompts
#[async_trait]
pub trait BreakpointHook: Send + Sync {
    /// Ask for one of `keys`; the raw answer is returned unvalidated
    async fn on_breakpoint(
        &self,
        reason: &str,
        keys: &[String],
        descriptions: &[String],
    ) -> Result<String>;

    /// Read one interactive line; `None` means no more input
    async fn on_interact_prompt(&self, prompt: &str) -> Result<Option<String>>;

    fn invalid_input(&self) -> InvalidInput;
}

/// Hook reading answers from stdin
pub struct TerminalHook;

impl Default for TerminalHook {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalHook {
    pub fn new() -> Self {
        Self
    }

    async fn read_line(prompt: String) -> Result<Option<String>> {
        let line = tokio::task::spawn_blocking(move || -> io::Result<Option<String>> {
            let mut stdout = io::stdout();
            stdout.write_all(prompt.as_bytes())?;
            stdout.flush()?;
            let mut input = String::new();
            if io::stdin().lock().read_line(&mut input)? == 0 {
                return Ok(None);
            }
            Ok(Some(input.trim().to_string()))
        })
        .await
        .map_err(|e| {
            FlowError::execution_with_code(ErrorCode::DEBUG_HOOK_FAILED, "prompt task failed", None)
                .with_source(e)
        })??;
        Ok(line)
    }

    pub fn format_choice_prompt(keys: &[String]) -> String {
        format!("choose [{}]: ", keys.join("/"))
    }
}

#[async_trait]
impl BreakpointHook for TerminalHook {
    async fn on_breakpoint(
        &self,
        _reason: &str,
        keys: &[String],
        _descriptions: &[String],
    ) -> Result<String> {
        match Self::read_line(Self::format_choice_prompt(keys)).await? {
            Some(answer) => Ok(answer),
            None => Err(FlowError::execution_with_code(
                ErrorCode::DEBUG_HOOK_FAILED,
                "stdin closed at a breakpoint prompt",
                None,
            )),
        }
    }

    async fn on_interact_prompt(&self, prompt: &str) -> Result<Option<String>> {
        Self::read_line(prompt.to_string()).await
    }

    fn invalid_input(&self) -> InvalidInput {
        InvalidInput::Reprompt
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    answers: VecDeque<String>,
    interact_lines: VecDeque<String>,
    answers_used: usize,
    reasons: Vec<String>,
    offered: Vec<Vec<String>>,
}

/// Hook replaying a fixed list of answers, then answering `c`
#[derive(Debug, Default)]
pub struct ScriptedHook {
    state: Mutex<ScriptState>,
}

impl ScriptedHook {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: Mutex::new(ScriptState {
                answers: answers.into_iter().map(Into::into).collect(),
                ..Default::default()
            }),
        }
    }

    /// Parse a script like `t,c,d` or `t c d`
    pub fn from_script(script: &str) -> Self {
        Self::new(
            script
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty()),
        )
    }

    /// Lines fed to interactive prompts, in order
    pub fn with_interact_lines<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock()
            .interact_lines
            .extend(lines.into_iter().map(Into::into));
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of prompts answered from the script
    pub fn answers_used(&self) -> usize {
        self.lock().answers_used
    }

    /// Answers not consumed yet
    pub fn remaining(&self) -> usize {
        self.lock().answers.len()
    }

    /// Reasons of every breakpoint prompt so far
    pub fn reasons(&self) -> Vec<String> {
        self.lock().reasons.clone()
    }

    /// Keys offered at every breakpoint prompt so far
    pub fn offered_keys(&self) -> Vec<Vec<String>> {
        self.lock().offered.clone()
    }

    pub fn prompt_count(&self) -> usize {
        self.lock().reasons.len()
    }
}

#[async_trait]
impl BreakpointHook for ScriptedHook {
    async fn on_breakpoint(
        &self,
        reason: &str,
        keys: &[String],
        _descriptions: &[String],
    ) -> Result<String> {
        let mut state = self.lock();
        state.reasons.push(reason.to_string());
        state.offered.push(keys.to_vec());
        match state.answers.pop_front() {
            Some(answer) => {
                state.answers_used += 1;
                Ok(answer)
            }
            None => Ok(SCRIPT_FALLBACK_ANSWER.to_string()),
        }
    }

    async fn on_interact_prompt(&self, _prompt: &str) -> Result<Option<String>> {
        Ok(self.lock().interact_lines.pop_front())
    }

    fn invalid_input(&self) -> InvalidInput {
        InvalidInput::Continue
    }
}
