//! CLI argument structures
//!
//! This module defines the command-line interface of cmdflow: the main
//! CLI structure and every subcommand.

use crate::breakpoint::InvalidInputPolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Run flows of named commands with breakpoints and resumable sessions
#[derive(Parser)]
#[command(name = "cmdflow")]
#[command(about = "cmdflow - run command flows with step debugging", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Data directory for config, env file and sessions (default: platform data dir, or $CMDFLOW_HOME)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a flow, e.g. `cmdflow run build : deploy region=eu`
    #[command(name = "run")]
    Run {
        /// Flow tokens; commands are separated by `:`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        flow: Vec<String>,

        /// Command definition file (YAML)
        #[arg(short = 'c', long, value_name = "FILE")]
        commands: Option<PathBuf>,

        /// Break before every command with this path
        #[arg(short = 'b', long, value_name = "CMD")]
        break_before: Vec<String>,

        /// Break after every command with this path
        #[arg(short = 'a', long, value_name = "CMD")]
        break_after: Vec<String>,

        /// Break once the flow has finished
        #[arg(long)]
        break_at_end: bool,

        /// Answer breakpoints from a script such as "t,c,d" instead of stdin
        #[arg(long, value_name = "ANSWERS")]
        script: Option<String>,

        /// Seconds to pause after each command
        #[arg(long, value_name = "SECS")]
        wait_sec: Option<u64>,

        /// Give every top-level command its own copy of the env
        #[arg(long)]
        forest: bool,

        /// Do not record a session
        #[arg(long)]
        no_session: bool,

        /// What to do with an answer that is not offered: auto, reprompt or continue
        #[arg(long, value_name = "POLICY")]
        invalid_input: Option<InvalidInputPolicy>,
    },

    /// Resume a failed or aborted session at its first unfinished command
    #[command(name = "retry")]
    Retry {
        /// Session to retry (default: the latest)
        session_id: Option<String>,

        /// Retry even a session that succeeded, running it from the start
        #[arg(short = 'f', long)]
        force: bool,

        /// Answer breakpoints from a script instead of stdin
        #[arg(long, value_name = "ANSWERS")]
        script: Option<String>,

        /// Command definition file, overriding the one the session used
        #[arg(short = 'c', long, value_name = "FILE")]
        commands: Option<PathBuf>,
    },

    /// Inspect recorded sessions
    #[command(name = "sessions")]
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// List the commands a flow can use
    #[command(name = "cmds")]
    Cmds {
        /// Command definition file (YAML)
        #[arg(short = 'c', long, value_name = "FILE")]
        commands: Option<PathBuf>,
    },

    /// Manage the persisted env layer
    #[command(name = "env")]
    Env {
        #[command(subcommand)]
        command: EnvCommands,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// List sessions, newest first
    List,
    /// Show the recorded status of a session
    Show {
        /// Session ID (default: the latest)
        session_id: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum EnvCommands {
    /// Show every env value with the layer it comes from
    List,
    /// Persist a value
    Set { key: String, value: String },
    /// Remove a persisted value
    Remove { key: String },
}
