//! Command routing
//!
//! This module routes parsed CLI commands to their implementations.

use crate::cli::args::Commands;
use crate::cli::commands::*;
use crate::cli::context::CliContext;
use anyhow::Result;

/// Execute a CLI command based on the parsed arguments
pub async fn execute_command(command: Commands, ctx: &CliContext) -> Result<()> {
    match command {
        Commands::Run {
            flow,
            commands,
            break_before,
            break_after,
            break_at_end,
            script,
            wait_sec,
            forest,
            no_session,
            invalid_input,
        } => {
            run_flow_command(
                ctx,
                RunParams {
                    flow,
                    commands,
                    break_before,
                    break_after,
                    break_at_end,
                    script,
                    wait_sec,
                    forest,
                    no_session,
                    invalid_input,
                },
            )
            .await
        }
        Commands::Retry {
            session_id,
            force,
            script,
            commands,
        } => {
            run_retry_command(
                ctx,
                RetryParams {
                    session_id,
                    force,
                    script,
                    commands,
                },
            )
            .await
        }
        Commands::Sessions { command } => run_sessions_command(ctx, command).await,
        Commands::Cmds { commands } => run_cmds_command(ctx, commands).await,
        Commands::Env { command } => run_env_command(ctx, command),
    }
}
