//! `cmdflow sessions`

use super::retry::load_session;
use crate::cli::args::SessionCommands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn run_sessions_command(ctx: &CliContext, command: SessionCommands) -> Result<()> {
    match command {
        SessionCommands::List => {
            let sessions = ctx.session_store().list().await?;
            if sessions.is_empty() {
                println!("No sessions recorded.");
                return Ok(());
            }
            for status in sessions {
                println!(
                    "{}  {:<9}  {}",
                    status.session_id,
                    status.result.to_string(),
                    status.flow.join(" ")
                );
            }
        }
        SessionCommands::Show { session_id } => {
            let status = load_session(ctx, session_id.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}
