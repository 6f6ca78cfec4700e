//! Flow executor
//!
//! The executor walks a parsed flow command by command. Before and after
//! each command it asks the [`BreakpointEngine`] what to do, applies the
//! answer to the command's [`ExecuteMask`] and runs the command. Flow
//! commands recurse back into [`Executor::run_flow`] through
//! [`Cmd::execute`](crate::command::Cmd::execute); delayed commands are
//! handed to background tasks.
//!
//! An `Executor` is a bundle of shared handles and is cheap to clone.
//! Background tasks get their own clone with a different status writer.

pub mod background;
pub mod flow;
pub mod interact;
pub mod mask;

pub use background::{current_bg_thread, BgTaskInfo, BgTaskState, BgTasks};
pub use flow::{Frame, MAX_FLOW_DEPTH};
pub use mask::{ExecPolicy, ExecuteMask};

use crate::breakpoint::{
    BreakpointEngine, BreakpointHook, InvalidInputPolicy, ScriptedHook, SharedBreakPoints,
    TerminalHook,
};
use crate::command::{CmdRegistry, CommandRunner, RealCommandRunner};
use crate::display::{Screen, StdScreen};
use crate::session::{NoopStatusWriter, StatusWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone)]
pub struct Executor {
    registry: Arc<CmdRegistry>,
    engine: Arc<BreakpointEngine>,
    screen: Arc<dyn Screen>,
    runner: Arc<dyn CommandRunner>,
    status: Arc<dyn StatusWriter>,
    bg_tasks: Arc<BgTasks>,
    working_dir: Option<PathBuf>,
}

impl Executor {
    pub fn builder(registry: CmdRegistry) -> ExecutorBuilder {
        ExecutorBuilder::new(registry)
    }

    pub fn registry(&self) -> &CmdRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &BreakpointEngine {
        &self.engine
    }

    pub fn breakpoints(&self) -> &SharedBreakPoints {
        self.engine.breakpoints()
    }

    pub fn screen(&self) -> &dyn Screen {
        self.screen.as_ref()
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn status(&self) -> &dyn StatusWriter {
        self.status.as_ref()
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Same executor reporting to another status writer
    pub fn with_status(&self, status: Arc<dyn StatusWriter>) -> Executor {
        Executor {
            status,
            ..self.clone()
        }
    }
}

pub struct ExecutorBuilder {
    registry: CmdRegistry,
    breakpoints: SharedBreakPoints,
    hook: Option<Arc<dyn BreakpointHook>>,
    screen: Option<Arc<dyn Screen>>,
    runner: Option<Arc<dyn CommandRunner>>,
    status: Option<Arc<dyn StatusWriter>>,
    invalid_input: InvalidInputPolicy,
    working_dir: Option<PathBuf>,
}

impl ExecutorBuilder {
    pub fn new(registry: CmdRegistry) -> Self {
        Self {
            registry,
            breakpoints: SharedBreakPoints::new(),
            hook: None,
            screen: None,
            runner: None,
            status: None,
            invalid_input: InvalidInputPolicy::Auto,
            working_dir: None,
        }
    }

    pub fn breakpoints(mut self, breakpoints: SharedBreakPoints) -> Self {
        self.breakpoints = breakpoints;
        self
    }

    pub fn hook(mut self, hook: Arc<dyn BreakpointHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Answer breakpoints from a script like `t,c,d` instead of stdin
    pub fn script(self, script: &str) -> Self {
        self.hook(Arc::new(ScriptedHook::from_script(script)))
    }

    pub fn screen(mut self, screen: Arc<dyn Screen>) -> Self {
        self.screen = Some(screen);
        self
    }

    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn status(mut self, status: Arc<dyn StatusWriter>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn invalid_input(mut self, policy: InvalidInputPolicy) -> Self {
        self.invalid_input = policy;
        self
    }

    pub fn working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn build(self) -> Executor {
        let screen = self
            .screen
            .unwrap_or_else(|| Arc::new(StdScreen::new()) as Arc<dyn Screen>);
        let hook = self
            .hook
            .unwrap_or_else(|| Arc::new(TerminalHook::new()) as Arc<dyn BreakpointHook>);
        let engine = BreakpointEngine::new(self.breakpoints, hook, screen.clone())
            .with_invalid_input(self.invalid_input);

        Executor {
            registry: Arc::new(self.registry),
            engine: Arc::new(engine),
            screen,
            runner: self
                .runner
                .unwrap_or_else(|| Arc::new(RealCommandRunner::new()) as Arc<dyn CommandRunner>),
            status: self
                .status
                .unwrap_or_else(|| Arc::new(NoopStatusWriter) as Arc<dyn StatusWriter>),
            bg_tasks: Arc::new(BgTasks::default()),
            working_dir: self.working_dir,
        }
    }
}
