//! Built-in commands
//!
//! Everything the debugger and the background scheduler expose to flows is
//! a regular command, so `dbg.break.at name=build : build` works the same
//! way from the CLI, from a command file or from an interactive line.

use super::{ActionContext, Cmd, CmdKind, CmdRegistry, NativeAction};
use crate::env::keys;
use crate::error::{ErrorCode, FlowError, Result};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::time::Duration;
use tracing::debug;

/// Register every built-in command
pub fn register_builtins(registry: &mut CmdRegistry) {
    registry.register(Cmd::new("noop", "do nothing", CmdKind::Empty).quiet());
    registry.register(Cmd::native("echo", "print msg=<text>", Echo));
    registry.register(Cmd::native("sleep", "sleep dur=<duration>", Sleep));
    registry.register(Cmd::native("dummy", "print the command path", Dummy));
    registry.register(Cmd::native("dummy.fail", "always fail", DummyFail));

    registry.register(Cmd::native(
        "dbg.break.at",
        "break before command name=<path>",
        BreakAt,
    ));
    registry.register(Cmd::native(
        "dbg.break.after",
        "break after command name=<path>",
        BreakAfter,
    ));
    registry.register(Cmd::native(
        "dbg.break.at-end",
        "break once the main flow finishes",
        BreakAtEnd,
    ));
    registry.register(Cmd::native(
        "dbg.break.clean",
        "remove every breakpoint",
        BreakClean,
    ));
    registry.register(Cmd::native(
        "dbg.break.here",
        "break before the next command",
        BreakHere,
    ));
    registry.register(Cmd::native(
        "dbg.wait-sec",
        "pause sec=<n> seconds after each command",
        WaitSec,
    ));
    registry.register(Cmd::native(
        "dbg.interact.leave",
        "leave interactive mode and continue the flow",
        InteractLeave,
    ));

    registry.register(Cmd::native(
        "bg.wait",
        "wait for all background tasks",
        BgWait::All,
    ));
    registry.register(Cmd::native(
        "bg.wait.latest",
        "wait for the latest background task",
        BgWait::Latest,
    ));
    registry.register(Cmd::native(
        "bg.wait.task",
        "wait for background task id=<id>",
        BgWait::Task,
    ));
    registry.register(Cmd::native("bg.list", "list background tasks", BgList));

    registry.register(Cmd::native(
        "env.set",
        "set key=<key> value=<value> in the session env",
        EnvSet,
    ));
    registry.register(Cmd::native("env.show", "print the env", EnvShow));
}

fn required<'a>(ctx: &'a ActionContext<'_>, key: &str) -> Result<&'a str> {
    ctx.arg(key).ok_or_else(|| {
        FlowError::validation_with_code(
            ErrorCode::VALIDATION_REQUIRED_FIELD,
            format!("{} needs {}=<value>", ctx.path, key),
            Some(key.to_string()),
        )
    })
}

struct Echo;

#[async_trait]
impl NativeAction for Echo {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        let text = match ctx.args.get("msg") {
            Some(msg) => msg.clone(),
            None => ctx.positional.join(" "),
        };
        ctx.print(&format!("{}\n", text));
        Ok(())
    }
}

struct Sleep;

#[async_trait]
impl NativeAction for Sleep {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        let raw = ctx.arg("dur").unwrap_or("1s");
        let duration: Duration = humantime::parse_duration(raw).map_err(|e| {
            FlowError::validation_with_code(
                ErrorCode::VALIDATION_INVALID_FORMAT,
                format!("invalid duration '{}'", raw),
                Some("dur".to_string()),
            )
            .with_source(e)
        })?;
        debug!("sleeping {:?}", duration);
        tokio::time::sleep(duration).await;
        Ok(())
    }
}

struct Dummy;

#[async_trait]
impl NativeAction for Dummy {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        ctx.print(&format!("{}\n", ctx.path));
        Ok(())
    }
}

struct DummyFail;

#[async_trait]
impl NativeAction for DummyFail {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        Err(FlowError::execution_with_code(
            ErrorCode::EXEC_COMMAND_FAILED,
            "dummy failure",
            Some(ctx.path.to_string()),
        ))
    }
}

struct BreakAt;

#[async_trait]
impl NativeAction for BreakAt {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        let name = required(ctx, "name")?.to_string();
        ctx.executor.breakpoints().add_before(&name);
        ctx.print(&format!("break point added: before {}\n", name));
        Ok(())
    }
}

struct BreakAfter;

#[async_trait]
impl NativeAction for BreakAfter {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        let name = required(ctx, "name")?.to_string();
        ctx.executor.breakpoints().add_after(&name);
        ctx.print(&format!("break point added: after {}\n", name));
        Ok(())
    }
}

struct BreakAtEnd;

#[async_trait]
impl NativeAction for BreakAtEnd {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        ctx.executor.breakpoints().set_at_end(true);
        ctx.print("break point added: at end of flow\n");
        Ok(())
    }
}

struct BreakClean;

#[async_trait]
impl NativeAction for BreakClean {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        ctx.executor.breakpoints().clear();
        ctx.print("all break points removed\n");
        Ok(())
    }
}

struct BreakHere;

#[async_trait]
impl NativeAction for BreakHere {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        ctx.env.flags().arm_here_now();
        Ok(())
    }
}

struct WaitSec;

#[async_trait]
impl NativeAction for WaitSec {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        let raw = required(ctx, "sec")?.to_string();
        let secs: u64 = raw.trim().parse().map_err(|_| {
            FlowError::validation_with_code(
                ErrorCode::VALIDATION_INVALID_FORMAT,
                format!("sec must be a whole number of seconds, got '{}'", raw),
                Some("sec".to_string()),
            )
        })?;
        ctx.env.set(keys::EXECUTE_WAIT_SEC, secs.to_string());
        Ok(())
    }
}

struct InteractLeave;

#[async_trait]
impl NativeAction for InteractLeave {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        ctx.env.flags().request_leave();
        Ok(())
    }
}

enum BgWait {
    All,
    Latest,
    Task,
}

#[async_trait]
impl NativeAction for BgWait {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        match self {
            BgWait::All => ctx.executor.wait_all_bg_tasks().await,
            BgWait::Latest => ctx.executor.wait_latest_bg_task().await,
            BgWait::Task => {
                let id = required(ctx, "id")?.to_string();
                ctx.executor.wait_bg_task(&id).await
            }
        }
    }
}

struct BgList;

#[async_trait]
impl NativeAction for BgList {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        let tasks = ctx.executor.list_bg_tasks();
        if tasks.is_empty() {
            ctx.print("no background tasks\n");
            return Ok(());
        }
        let mut out = String::new();
        for task in tasks {
            let _ = writeln!(out, "{}  {}  {}", task.id, task.state(), task.cmd_display);
        }
        ctx.print(&out);
        Ok(())
    }
}

struct EnvSet;

#[async_trait]
impl NativeAction for EnvSet {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        let key = required(ctx, "key")?.to_string();
        let value = ctx.args.get("value").cloned().unwrap_or_default();
        ctx.env.set(key, value);
        Ok(())
    }
}

struct EnvShow;

#[async_trait]
impl NativeAction for EnvShow {
    async fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        let mut out = String::new();
        for (key, value) in ctx.env.flatten() {
            let _ = writeln!(out, "{} = {}", key, value);
        }
        ctx.print(&out);
        Ok(())
    }
}
