//! CLI command handlers
//!
//! This module contains all CLI-related functionality:
//! - Argument parsing structures
//! - The per-invocation context (config, env, registry loading)
//! - Command implementations

pub mod args;
pub mod commands;
pub mod context;
pub mod router;

pub use args::{Cli, Commands, EnvCommands, SessionCommands};
pub use context::{resolve_data_dir, CliContext};
pub use router::execute_command;
