//! `cmdflow cmds`

use crate::cli::context::CliContext;
use anyhow::Result;
use std::path::PathBuf;

pub async fn run_cmds_command(ctx: &CliContext, commands: Option<PathBuf>) -> Result<()> {
    let loaded = ctx.load_commands(commands.as_deref()).await?;
    for (name, cmd) in loaded.registry.list_commands() {
        println!(
            "{:<22} {:<14} {}",
            name,
            cmd.cmd_type().to_string(),
            cmd.help
        );
    }
    Ok(())
}
