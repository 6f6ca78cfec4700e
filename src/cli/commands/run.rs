//! `cmdflow run`

use crate::breakpoint::{InvalidInputPolicy, SharedBreakPoints};
use crate::cli::context::CliContext;
use crate::command::{parse_flow, parse_flow_str, CmdRegistry, ParsedFlow};
use crate::env::{keys, Env};
use crate::error::{ErrorCode, FlowError};
use crate::executor::{ExecuteMask, Executor};
use crate::session::SessionStore;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub struct RunParams {
    pub flow: Vec<String>,
    pub commands: Option<PathBuf>,
    pub break_before: Vec<String>,
    pub break_after: Vec<String>,
    pub break_at_end: bool,
    pub script: Option<String>,
    pub wait_sec: Option<u64>,
    pub forest: bool,
    pub no_session: bool,
    pub invalid_input: Option<InvalidInputPolicy>,
}

pub async fn run_flow_command(ctx: &CliContext, params: RunParams) -> Result<()> {
    let loaded = ctx.load_commands(params.commands.as_deref()).await?;

    let flow = if !params.flow.is_empty() {
        parse_flow(&loaded.registry, &params.flow)?
    } else if let Some(default_flow) = &loaded.default_flow {
        parse_flow_str(&loaded.registry, default_flow)?
    } else {
        return Err(FlowError::validation_with_code(
            ErrorCode::VALIDATION_REQUIRED_FIELD,
            "no flow given and no default flow in the command file",
            Some("flow".to_string()),
        )
        .into());
    };

    let mut env = ctx.load_env()?;
    if params.forest {
        env.set_bool(keys::FOREST_MODE, true);
    }
    if let Some(secs) = params.wait_sec {
        env.set(keys::EXECUTE_WAIT_SEC, secs.to_string());
    }

    let breakpoints = SharedBreakPoints::new();
    for name in &params.break_before {
        breakpoints.add_before(name);
    }
    for name in &params.break_after {
        breakpoints.add_after(name);
    }
    breakpoints.set_at_end(params.break_at_end);

    launch_flow(
        ctx,
        loaded.registry,
        env,
        Launch {
            flow,
            masks: Vec::new(),
            breakpoints,
            script: params.script,
            invalid_input: params.invalid_input,
            record_session: !params.no_session,
            commands_file: loaded.file,
            retry_of: None,
        },
    )
    .await
}

/// A flow ready to run, from `run` or `retry`
pub(crate) struct Launch {
    pub flow: ParsedFlow,
    pub masks: Vec<ExecuteMask>,
    pub breakpoints: SharedBreakPoints,
    pub script: Option<String>,
    pub invalid_input: Option<InvalidInputPolicy>,
    pub record_session: bool,
    pub commands_file: Option<PathBuf>,
    pub retry_of: Option<String>,
}

/// Build the executor, run the bootstrap flow and then the flow itself.
/// Background tasks still pending are waited for before returning.
pub(crate) async fn launch_flow(
    ctx: &CliContext,
    registry: CmdRegistry,
    mut env: Env,
    launch: Launch,
) -> Result<()> {
    let config = ctx.config();
    let mut builder = Executor::builder(registry)
        .breakpoints(launch.breakpoints)
        .invalid_input(
            launch
                .invalid_input
                .unwrap_or_else(|| config.invalid_input_policy()),
        )
        .working_dir(Some(ctx.app.working_dir.clone()));
    if let Some(script) = &launch.script {
        builder = builder.script(script);
    }

    let session_id = if launch.record_session {
        let id = SessionStore::new_session_id();
        let writer = ctx
            .session_store()
            .create_writer(&id)
            .with_commands_file(launch.commands_file.clone())
            .with_retry_of(launch.retry_of.clone());
        info!("Recording session {} in {}", id, writer.dir().display());
        builder = builder.status(Arc::new(writer));
        env.set(keys::SESSION_ID, id.clone());
        Some(id)
    } else {
        None
    };
    let executor = builder.build();

    if let Some(bootstrap) = &config.bootstrap {
        let flow = parse_flow_str(executor.registry(), bootstrap)
            .map_err(|e| e.with_context("in bootstrap flow"))?;
        executor.run_bootstrap(flow, &mut env).await?;
    }

    let result = executor.run(launch.flow, &mut env, &launch.masks).await;

    if let Err(e) = executor.wait_all_bg_tasks().await {
        warn!("Could not wait for background tasks: {}", e);
    }

    if result.is_err() {
        if let Some(id) = &session_id {
            eprintln!("Resume with: cmdflow retry {}", id);
        }
    }
    result?;
    Ok(())
}
