//! Command model
//!
//! A [`Cmd`] is a named, path-addressable unit registered once in a
//! [`CmdRegistry`]. Flows reference commands through [`ParsedCmd`]; the
//! executor calls [`Cmd::execute`], which is also where flow commands recurse
//! back into the executor with their sub-flow.

pub mod builtins;
pub mod definition;
pub mod execute;
pub mod parser;
pub mod registry;
pub mod runner;

pub use execute::ExecRequest;
pub use parser::{parse_flow, parse_flow_str, ParsedCmd, ParsedFlow};
pub use registry::CmdRegistry;
pub use runner::{CommandRunner, ExecutionResult, FileInvocation, RealCommandRunner};

use crate::env::Env;
use crate::error::Result;
use crate::executor::Executor;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Coarse command type, as shown to users and recorded in sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CmdType {
    Empty,
    Native,
    File,
    Flow,
    FileWithFlow,
    NoExecutable,
}

impl fmt::Display for CmdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CmdType::Empty => "empty",
            CmdType::Native => "native",
            CmdType::File => "file",
            CmdType::Flow => "flow",
            CmdType::FileWithFlow => "file+flow",
            CmdType::NoExecutable => "no-executable",
        };
        write!(f, "{}", name)
    }
}

/// What running a command does
#[derive(Clone)]
pub enum CmdKind {
    /// Does nothing
    Empty,
    /// Built-in action implemented in Rust
    Native(Arc<dyn NativeAction>),
    /// Executable file run through the shell
    File(PathBuf),
    /// Sub-flow, stored as unparsed tokens and parsed on each run
    Flow(Vec<String>),
    /// Sub-flow first, then the executable file
    FileWithFlow { flow: Vec<String>, file: PathBuf },
    /// Directory-like placeholder with sub-commands but no action of its own
    NoExecutable,
}

/// A registered command
#[derive(Clone)]
pub struct Cmd {
    pub path: String,
    pub help: String,
    pub kind: CmdKind,
    /// Quiet commands are invisible to the debugger
    pub quiet: bool,
    /// Never offer step-in on this file+flow command
    pub unbreak_file_and_flow: bool,
}

impl Cmd {
    pub fn new(path: impl Into<String>, help: impl Into<String>, kind: CmdKind) -> Self {
        Self {
            path: path.into(),
            help: help.into(),
            kind,
            quiet: false,
            unbreak_file_and_flow: false,
        }
    }

    pub fn native(
        path: impl Into<String>,
        help: impl Into<String>,
        action: impl NativeAction + 'static,
    ) -> Self {
        Self::new(path, help, CmdKind::Native(Arc::new(action)))
    }

    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    pub fn unbreak_file_and_flow(mut self) -> Self {
        self.unbreak_file_and_flow = true;
        self
    }

    pub fn cmd_type(&self) -> CmdType {
        match self.kind {
            CmdKind::Empty => CmdType::Empty,
            CmdKind::Native(_) => CmdType::Native,
            CmdKind::File(_) => CmdType::File,
            CmdKind::Flow(_) => CmdType::Flow,
            CmdKind::FileWithFlow { .. } => CmdType::FileWithFlow,
            CmdKind::NoExecutable => CmdType::NoExecutable,
        }
    }

    /// Unparsed sub-flow tokens, if this command owns a sub-flow
    pub fn sub_flow(&self) -> Option<&[String]> {
        match &self.kind {
            CmdKind::Flow(flow) | CmdKind::FileWithFlow { flow, .. } => Some(flow),
            _ => None,
        }
    }

    pub fn has_sub_flow(&self) -> bool {
        self.sub_flow()
            .map(|tokens| tokens.iter().any(|t| t.trim() != ":" && !t.trim().is_empty()))
            .unwrap_or(false)
    }
}

impl fmt::Debug for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cmd")
            .field("path", &self.path)
            .field("type", &self.cmd_type())
            .field("quiet", &self.quiet)
            .field("unbreak_file_and_flow", &self.unbreak_file_and_flow)
            .finish()
    }
}

/// Everything a built-in action can touch while it runs
pub struct ActionContext<'a> {
    pub executor: &'a Executor,
    pub env: &'a mut Env,
    pub path: &'a str,
    pub args: &'a BTreeMap<String, String>,
    pub positional: &'a [String],
}

impl ActionContext<'_> {
    /// Named argument, falling back to the first positional one
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args
            .get(key)
            .map(String::as_str)
            .or_else(|| self.positional.first().map(String::as_str))
    }

    pub fn print(&self, text: &str) {
        self.executor.screen().print(text);
    }
}

/// Built-in command behavior
#[async_trait]
pub trait NativeAction: Send + Sync {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()>;
}
