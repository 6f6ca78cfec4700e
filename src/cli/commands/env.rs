//! `cmdflow env`

use crate::cli::args::EnvCommands;
use crate::cli::context::CliContext;
use crate::env::persist::{load_persisted, save_persisted};
use crate::env::{keys, Env, EnvLayer};
use crate::error::{ErrorCode, FlowError};
use anyhow::Result;

pub fn run_env_command(ctx: &CliContext, command: EnvCommands) -> Result<()> {
    let path = ctx.env_file();
    match command {
        EnvCommands::List => {
            let env = ctx.load_env()?;
            for layer in EnvLayer::LOOKUP_ORDER {
                for (key, value) in env.layer_values(layer) {
                    println!("{:<9} {} = {}", layer.to_string(), key, value);
                }
            }
        }
        EnvCommands::Set { key, value } => {
            if keys::is_runtime_key(&key) {
                return Err(FlowError::validation_with_code(
                    ErrorCode::VALIDATION_INVALID_INPUT,
                    format!("{} is managed by cmdflow and cannot be persisted", key),
                    Some("key".to_string()),
                )
                .into());
            }
            let mut env = Env::new();
            load_persisted(&mut env, &path)?;
            env.set_in(EnvLayer::Persisted, key, value);
            save_persisted(&env, &path)?;
        }
        EnvCommands::Remove { key } => {
            let mut env = Env::new();
            load_persisted(&mut env, &path)?;
            if env.delete_in(EnvLayer::Persisted, &key).is_none() {
                println!("{} is not set", key);
                return Ok(());
            }
            save_persisted(&env, &path)?;
        }
    }
    Ok(())
}
