//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use cmdflow::breakpoint::ScriptedHook;
use cmdflow::command::{parse_flow_str, ActionContext, Cmd, CmdKind, CmdRegistry, NativeAction};
use cmdflow::display::MemoryScreen;
use cmdflow::env::Env;
use cmdflow::error::{FlowError, Result};
use cmdflow::executor::{ExecuteMask, Executor, ExecutorBuilder};
use std::sync::Arc;

/// Env key that lets `gate` pass
pub const GATE_KEY: &str = "gate.open";

/// Prints `ran <path>`
pub struct Mark;

#[async_trait]
impl NativeAction for Mark {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        ctx.print(&format!("ran {}\n", ctx.path));
        Ok(())
    }
}

/// Fails unless `gate.open` is true in the env
pub struct Gate;

#[async_trait]
impl NativeAction for Gate {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        if !ctx.env.get_bool(GATE_KEY) {
            return Err(FlowError::execution("gate is closed"));
        }
        ctx.print(&format!("ran {}\n", ctx.path));
        Ok(())
    }
}

fn tokens(flow: &str) -> Vec<String> {
    flow.split_whitespace().map(String::from).collect()
}

/// Built-ins plus `cmd0`..`cmd2`, `child1`, `child2`, `gate`, `parent`
/// (a flow of `child1 : child2`) and `later` (a flow delaying `cmd0`)
pub fn registry() -> CmdRegistry {
    let mut registry = CmdRegistry::with_builtins();
    for name in ["cmd0", "cmd1", "cmd2", "child1", "child2"] {
        registry.register(Cmd::native(name, "marks itself", Mark));
    }
    registry.register(Cmd::native("gate", "fails unless gate.open", Gate));
    registry.register(Cmd::new(
        "parent",
        "runs both children",
        CmdKind::Flow(tokens("child1 : child2")),
    ));
    registry.register(Cmd::new(
        "later",
        "delays cmd0",
        CmdKind::Flow(tokens("cmd0 %delay=1ms")),
    ));
    registry
}

pub struct Harness {
    pub executor: Executor,
    pub hook: Arc<ScriptedHook>,
    pub screen: Arc<MemoryScreen>,
}

impl Harness {
    pub fn new(script: &str) -> Self {
        Self::with_builder(script, |builder| builder)
    }

    pub fn with_builder<F>(script: &str, configure: F) -> Self
    where
        F: FnOnce(ExecutorBuilder) -> ExecutorBuilder,
    {
        let hook = Arc::new(ScriptedHook::from_script(script));
        let screen = Arc::new(MemoryScreen::new());
        let builder = Executor::builder(registry())
            .hook(hook.clone())
            .screen(screen.clone());
        Self {
            executor: configure(builder).build(),
            hook,
            screen,
        }
    }

    pub async fn run(&self, flow: &str) -> Result<()> {
        self.run_in(flow, &mut Env::new(), &[]).await
    }

    pub async fn run_in(&self, flow: &str, env: &mut Env, masks: &[ExecuteMask]) -> Result<()> {
        let flow = parse_flow_str(self.executor.registry(), flow)?;
        self.executor.run(flow, env, masks).await
    }

    pub fn output(&self) -> String {
        self.screen.contents()
    }

    /// Whether `name` ran, as printed by [`Mark`]
    pub fn ran(&self, name: &str) -> bool {
        self.output().lines().any(|line| line == format!("ran {}", name))
    }
}
