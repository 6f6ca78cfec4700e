//! Command implementation modules
//!
//! Each CLI subcommand is implemented in its own module.

pub mod cmds;
pub mod env;
pub mod retry;
pub mod run;
pub mod sessions;

pub use cmds::run_cmds_command;
pub use env::run_env_command;
pub use retry::{run_retry_command, RetryParams};
pub use run::{run_flow_command, RunParams};
pub use sessions::run_sessions_command;
