//! # cmdflow
//!
//! Runs flows of named commands, `build : test : deploy region=eu`, where a
//! command may itself be a flow. Runs can be paused and stepped through
//! like a debugger, commands can be delayed onto background tasks, and
//! every run is recorded so a failed one can be retried where it stopped.
//!
//! ## Usage
//!
//! ```bash
//! cmdflow run -b deploy build : deploy region=eu
//! cmdflow retry
//! ```
//!
//! ## Modules
//!
//! - `app` - Process setup for the binary: logging and fatal errors
//! - `breakpoint` - Breakpoint registry, prompting hooks and the decision engine
//! - `cli` - Argument parsing and subcommand implementations
//! - `command` - Command model, registry, flow parser and file runner
//! - `config` - Layered configuration
//! - `display` - Plain-text output and breakpoint frames
//! - `env` - Layered key-value environment shared by a flow
//! - `error` - `FlowError` and its error codes
//! - `executor` - Flow execution, execution masks and background tasks
//! - `session` - Run status persistence and retry support
pub mod app;
pub mod breakpoint;
pub mod cli;
pub mod command;
pub mod config;
pub mod display;
pub mod env;
pub mod error;
pub mod executor;
pub mod session;
