//! Interactive loop behind the `interact` breakpoint choice
//!
//! Each line is parsed as a flow and run one level below the command that
//! broke, sharing its env. Breakpoints stay silent while the loop runs.
//! `dbg.interact.leave` ends the loop and lets the flow continue.

use super::flow::Frame;
use super::Executor;
use crate::breakpoint::Interactor;
use crate::command::parse_flow_str;
use crate::env::{keys, Env};
use crate::error::Result;
use async_trait::async_trait;
use tracing::debug;

pub const INTERACT_PROMPT: &str = "(cmdflow) ";

#[async_trait]
impl Interactor for Executor {
    async fn interact(&self, env: &mut Env) -> Result<()> {
        let depth = env.get_u64(keys::STACK_DEPTH).unwrap_or(0) as usize;
        self.screen
            .print("interactive mode, 'dbg.interact.leave' resumes the flow\n");

        while let Some(line) = self.engine.hook().on_interact_prompt(INTERACT_PROMPT).await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            debug!("Interactive line: {}", line);

            let result = match parse_flow_str(&self.registry, line) {
                Ok(mut flow) => {
                    flow.trim_empty_tail();
                    self.run_flow(&flow, env, &[], Frame::interactive(depth))
                        .await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                if e.is_fatal() {
                    return Err(e);
                }
                self.screen.print(&format!("{}\n", e.user_message()));
            }

            if env.get_bool(keys::INTERACT_LEAVING) {
                break;
            }
        }
        Ok(())
    }
}
