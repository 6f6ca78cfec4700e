//! `cmdflow retry`

use super::run::{launch_flow, Launch};
use crate::breakpoint::SharedBreakPoints;
use crate::cli::context::CliContext;
use crate::command::parse_flow;
use crate::error::{ErrorCode, FlowError};
use crate::session::FlowStatus;
use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

pub struct RetryParams {
    pub session_id: Option<String>,
    pub force: bool,
    pub script: Option<String>,
    pub commands: Option<PathBuf>,
}

pub(crate) async fn load_session(ctx: &CliContext, session_id: Option<&str>) -> Result<FlowStatus> {
    let store = ctx.session_store();
    let status = match session_id {
        Some(id) => store.load(id).await?,
        None => store.latest().await?.ok_or_else(|| {
            FlowError::session_with_code(ErrorCode::SESSION_NOT_FOUND, "no sessions recorded", None)
        })?,
    };
    Ok(status)
}

/// Re-run a recorded flow. Commands that finished are masked to skip, so
/// the run picks up at the first unfinished one with the recorded env.
pub async fn run_retry_command(ctx: &CliContext, params: RetryParams) -> Result<()> {
    let status = load_session(ctx, params.session_id.as_deref()).await?;
    if !status.is_retryable() && !params.force {
        return Err(FlowError::session_with_code(
            ErrorCode::SESSION_NOT_RETRYABLE,
            "session succeeded, use --force to run it again",
            Some(status.session_id.clone()),
        )
        .into());
    }

    let commands = params.commands.or_else(|| status.commands_file.clone());
    let loaded = ctx.load_commands(commands.as_deref()).await?;
    let flow = parse_flow(&loaded.registry, &status.flow)?;

    let masks = match status.first_unfinished() {
        Some(index) if status.is_retryable() => {
            info!(
                "Resuming session {} at command {}",
                status.session_id, index
            );
            status.retry_masks()
        }
        _ => {
            info!("Running session {} from the start", status.session_id);
            Vec::new()
        }
    };

    let mut env = ctx.load_env()?;
    for (key, value) in &status.env {
        env.set(key.clone(), value.clone());
    }

    launch_flow(
        ctx,
        loaded.registry,
        env,
        Launch {
            flow,
            masks,
            breakpoints: SharedBreakPoints::new(),
            script: params.script,
            invalid_input: None,
            record_session: true,
            commands_file: loaded.file,
            retry_of: Some(status.session_id.clone()),
        },
    )
    .await
}
