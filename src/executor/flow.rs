use super::mask::{ExecPolicy, ExecuteMask};
use super::Executor;
use crate::breakpoint::{BreakCheck, BreakPointAction, BreakStage, BreakTarget};
use crate::command::{ExecRequest, ParsedCmd, ParsedFlow};
use crate::env::{keys, Env};
use crate::error::{ErrorCode, FlowError, Result};
use crate::session::{CmdState, FlowOutcome};
use futures::future::BoxFuture;
use tracing::{debug, info, warn};

/// Nesting limit for flows calling flows
pub const MAX_FLOW_DEPTH: usize = 64;

const STACK_SEPARATOR: &str = " > ";

/// Where a flow runs in the call tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub depth: usize,
    pub is_bootstrap: bool,
    /// Report command progress to the status writer
    pub track_status: bool,
}

impl Frame {
    /// The main flow of a run
    pub fn top() -> Self {
        Self {
            depth: 0,
            is_bootstrap: false,
            track_status: true,
        }
    }

    pub fn bootstrap() -> Self {
        Self {
            depth: 0,
            is_bootstrap: true,
            track_status: false,
        }
    }

    /// A line typed in the interactive loop, nested below `parent_depth`
    pub fn interactive(parent_depth: usize) -> Self {
        Self {
            depth: parent_depth + 1,
            is_bootstrap: false,
            track_status: false,
        }
    }

    /// Sub-flow of a command running in this frame
    pub fn child(&self) -> Self {
        Self {
            depth: self.depth + 1,
            is_bootstrap: self.is_bootstrap,
            track_status: false,
        }
    }
}

impl Executor {
    /// Run a top-level flow: status start, the flow, the at-end break,
    /// status finish. Breakpoint flags are cleared whatever the outcome.
    pub async fn run(
        &self,
        mut flow: ParsedFlow,
        env: &mut Env,
        masks: &[ExecuteMask],
    ) -> Result<()> {
        flow.trim_empty_tail();
        info!("Running flow with {} command(s)", flow.len());

        if let Err(e) = self.status.on_flow_start(&flow, env).await {
            warn!("Failed to record flow start: {}", e);
        }

        let result: Result<()> = async {
            self.run_flow(&flow, env, masks, Frame::top()).await?;
            self.engine.decide_at_end(self, env).await?;
            Ok(())
        }
        .await;

        env.flags().clear_all();
        self.finish_status(env, &result).await;
        result
    }

    /// Run the configured bootstrap flow; it never pauses after commands
    pub async fn run_bootstrap(&self, mut flow: ParsedFlow, env: &mut Env) -> Result<()> {
        flow.trim_empty_tail();
        debug!("Running bootstrap flow with {} command(s)", flow.len());
        self.run_flow(&flow, env, &[], Frame::bootstrap()).await
    }

    /// Body of a background task: one tracked flow without the at-end break
    pub(super) async fn run_detached(&self, flow: ParsedFlow, env: &mut Env) -> Result<()> {
        if let Err(e) = self.status.on_flow_start(&flow, env).await {
            warn!("Failed to record background flow start: {}", e);
        }
        let result = self.run_flow(&flow, env, &[], Frame::top()).await;
        self.finish_status(env, &result).await;
        result
    }

    async fn finish_status(&self, env: &Env, result: &Result<()>) {
        let outcome = FlowOutcome::from_result(result);
        if let Err(e) = self.status.on_flow_finish(env, &outcome).await {
            warn!("Failed to record flow result: {}", e);
        }
    }

    /// Run one level of a flow. `masks` may be shorter than the flow; each
    /// command works on its own copy of its mask.
    pub fn run_flow<'a>(
        &'a self,
        flow: &'a ParsedFlow,
        env: &'a mut Env,
        masks: &'a [ExecuteMask],
        frame: Frame,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if frame.depth > MAX_FLOW_DEPTH {
                return Err(FlowError::flow_with_code(
                    ErrorCode::FLOW_TOO_DEEP,
                    format!("flows nested deeper than {}", MAX_FLOW_DEPTH),
                ));
            }
            if frame.depth > 0 {
                let parent = env.get_u64(keys::STACK_DEPTH).unwrap_or(0) as usize;
                if parent + 1 != frame.depth {
                    return Err(FlowError::invariant(
                        ErrorCode::INVARIANT_STACK_DEPTH,
                        format!(
                            "entering depth {} from recorded depth {}",
                            frame.depth, parent
                        ),
                    ));
                }
            }

            env.set(keys::STACK_DEPTH, frame.depth.to_string());
            let result = self.run_cmds(flow, env, masks, frame).await;
            if frame.depth == 0 {
                env.delete(keys::STACK_DEPTH);
            } else {
                env.set(keys::STACK_DEPTH, (frame.depth - 1).to_string());
            }
            result
        })
    }

    async fn run_cmds(
        &self,
        flow: &ParsedFlow,
        env: &mut Env,
        masks: &[ExecuteMask],
        frame: Frame,
    ) -> Result<()> {
        let forest = frame.depth == 0 && env.get_bool(keys::FOREST_MODE);
        let mut break_at_next = false;
        let mut index = 0;

        while index < flow.len() {
            let parsed = &flow.cmds[index];
            let is_last = index + 1 == flow.len();

            let mut forest_env = None;
            let cmd_env: &mut Env = if forest {
                forest_env.insert(env.clone())
            } else {
                &mut *env
            };

            parsed.apply_env(cmd_env);
            if parsed.cmd.is_none() {
                self.record_start(frame, index, parsed).await;
                self.record_finish(frame, index, CmdState::Succeeded, None)
                    .await;
                index += 1;
                continue;
            }

            let mut mask = masks.get(index).cloned();
            let target = BreakTarget::in_flow(flow, index, parsed);
            let check = BreakCheck {
                break_by_prev: std::mem::take(&mut break_at_next),
                is_last_in_flow: is_last,
                is_bootstrap: frame.is_bootstrap,
            };

            if !parsed.is_delayed() {
                let action = self
                    .engine
                    .decide_break_with_wait(
                        BreakStage::Before,
                        self,
                        cmd_env,
                        &target,
                        mask.as_ref(),
                        check,
                    )
                    .await?;
                match action {
                    BreakPointAction::Continue => {}
                    BreakPointAction::Skip => {
                        mask.get_or_insert_with(ExecuteMask::default).policy = ExecPolicy::Skip;
                        cmd_env.flags().arm_at_next();
                    }
                    BreakPointAction::StepOver => {
                        break_at_next = true;
                        mask.get_or_insert_with(ExecuteMask::default)
                            .set_exec_policy_for_all(ExecPolicy::Exec);
                    }
                    other => {
                        return Err(FlowError::invariant(
                            ErrorCode::INVARIANT_UNEXPECTED_ACTION,
                            format!("'{}' returned before {}", other, parsed.display_path),
                        ))
                    }
                }
            }

            self.record_start(frame, index, parsed).await;
            let (state, result) = self
                .execute_one(flow, index, parsed, cmd_env, mask.as_mut(), frame)
                .await;
            self.record_finish(frame, index, state, result.as_ref().err())
                .await;
            let next = result?;

            let recorded = cmd_env.get_u64(keys::STACK_DEPTH).unwrap_or(0) as usize;
            if recorded != frame.depth {
                return Err(FlowError::invariant(
                    ErrorCode::INVARIANT_STACK_DEPTH,
                    format!(
                        "depth {} after {} but expected {}",
                        recorded, parsed.display_path, frame.depth
                    ),
                ));
            }

            if !parsed.is_delayed() {
                let action = self
                    .engine
                    .decide_break_with_wait(
                        BreakStage::After,
                        self,
                        cmd_env,
                        &target,
                        mask.as_ref(),
                        check,
                    )
                    .await?;
                if action == BreakPointAction::StepOver {
                    break_at_next = true;
                }
            }

            index = next;
        }
        Ok(())
    }

    async fn execute_one(
        &self,
        flow: &ParsedFlow,
        index: usize,
        parsed: &ParsedCmd,
        env: &mut Env,
        mask: Option<&mut ExecuteMask>,
        frame: Frame,
    ) -> (CmdState, Result<usize>) {
        if mask.as_ref().is_some_and(|m| m.is_skip()) {
            self.screen
                .print(&format!("(skipped) {}\n", parsed.display()));
            return (CmdState::Skipped, Ok(index + 1));
        }

        if parsed.is_delayed() {
            return match self.schedule_background(flow, index, parsed, env).await {
                Ok(id) => {
                    debug!("Scheduled {} as {}", parsed.display_path, id);
                    (CmdState::Scheduled, Ok(index + 1))
                }
                Err(e) => (CmdState::Failed, Err(e)),
            };
        }

        let Some(cmd) = parsed.cmd.clone() else {
            return (CmdState::Succeeded, Ok(index + 1));
        };

        let parent_stack = env.get(keys::STACK).map(str::to_string);
        let stack = match parent_stack.as_deref() {
            Some(parent) if !parent.is_empty() => {
                format!("{}{}{}", parent, STACK_SEPARATOR, parsed.display_path)
            }
            _ => parsed.display_path.clone(),
        };
        env.set(keys::STACK, stack);

        let result = cmd
            .execute(ExecRequest {
                executor: self,
                env: &mut *env,
                mask,
                parsed,
                flow,
                index,
                frame,
            })
            .await;

        match parent_stack {
            Some(parent) => env.set(keys::STACK, parent),
            None => {
                env.delete(keys::STACK);
            }
        }

        match result {
            Ok(next) => (CmdState::Succeeded, Ok(next)),
            Err(e) => (CmdState::Failed, Err(e)),
        }
    }

    async fn record_start(&self, frame: Frame, index: usize, parsed: &ParsedCmd) {
        if !frame.track_status {
            return;
        }
        if let Err(e) = self.status.on_cmd_start(index, parsed).await {
            warn!("Failed to record start of {}: {}", parsed.display_path, e);
        }
    }

    async fn record_finish(
        &self,
        frame: Frame,
        index: usize,
        state: CmdState,
        error: Option<&FlowError>,
    ) {
        if !frame.track_status {
            return;
        }
        if let Err(e) = self.status.on_cmd_finish(index, state, error).await {
            warn!("Failed to record result of command {}: {}", index, e);
        }
    }
}
