use super::{parse_flow, ActionContext, Cmd, CmdKind, FileInvocation, ParsedCmd, ParsedFlow};
use crate::breakpoint::BreakTarget;
use crate::env::Env;
use crate::error::{ErrorCode, FlowError, Result};
use crate::executor::{ExecuteMask, Executor, Frame};
use std::path::Path;
use tracing::debug;

/// Everything [`Cmd::execute`] needs from the running flow
pub struct ExecRequest<'a> {
    pub executor: &'a Executor,
    pub env: &'a mut Env,
    /// This command's own mask; its child slots drive the sub-flow
    pub mask: Option<&'a mut ExecuteMask>,
    pub parsed: &'a ParsedCmd,
    pub flow: &'a ParsedFlow,
    pub index: usize,
    pub frame: Frame,
}

impl Cmd {
    /// Run the command and return the index of the next command in the flow
    pub async fn execute(&self, request: ExecRequest<'_>) -> Result<usize> {
        let ExecRequest {
            executor,
            env,
            mask,
            parsed,
            flow,
            index,
            frame,
        } = request;
        debug!("Executing {} command {}", self.cmd_type(), self.path);

        match &self.kind {
            CmdKind::Empty => {}
            CmdKind::NoExecutable => {
                let children = executor.registry().sub_commands(&self.path);
                executor.screen().print(&format!(
                    "{} has nothing to run, try one of: {}\n",
                    self.path,
                    children.join(", ")
                ));
            }
            CmdKind::Native(action) => {
                let mut ctx = ActionContext {
                    executor,
                    env,
                    path: &self.path,
                    args: &parsed.args,
                    positional: &parsed.positional,
                };
                action.run(&mut ctx).await?;
            }
            CmdKind::File(file) => {
                self.run_file(executor, env, parsed, file).await?;
            }
            CmdKind::Flow(tokens) => {
                self.run_sub_flow(executor, env, mask, tokens, frame)
                    .await?;
            }
            CmdKind::FileWithFlow { flow: tokens, file } => {
                self.run_sub_flow(executor, env, mask, tokens, frame)
                    .await?;
                let target = BreakTarget::in_flow(flow, index, parsed);
                let run_file = executor
                    .engine()
                    .decide_inside_file_and_flow(executor, env, &target, false)
                    .await?;
                if run_file {
                    self.run_file(executor, env, parsed, file).await?;
                } else {
                    executor
                        .screen()
                        .print(&format!("(skipped) {} file part\n", self.path));
                }
            }
        }
        Ok(index + 1)
    }

    async fn run_sub_flow(
        &self,
        executor: &Executor,
        env: &mut Env,
        mask: Option<&mut ExecuteMask>,
        tokens: &[String],
        frame: Frame,
    ) -> Result<()> {
        let mut sub_flow = parse_flow(executor.registry(), tokens)
            .map_err(|e| e.with_context(format!("in sub-flow of {}", self.path)))?;
        sub_flow.trim_empty_tail();
        let child_masks = match mask {
            Some(mask) => mask.sub_flow_masks(sub_flow.len()).clone(),
            None => Vec::new(),
        };
        executor
            .run_flow(&sub_flow, env, &child_masks, frame.child())
            .await
    }

    async fn run_file(
        &self,
        executor: &Executor,
        env: &Env,
        parsed: &ParsedCmd,
        file: &Path,
    ) -> Result<()> {
        let invocation = FileInvocation {
            cmd_path: self.path.clone(),
            args: parsed.args.clone(),
            positional: parsed.positional.clone(),
            env: env.session_snapshot(),
            working_directory: executor.working_dir().map(Path::to_path_buf),
        };
        let result = executor.runner().run_file(file, &invocation).await?;
        if !result.stdout.is_empty() {
            executor.screen().print(&result.stdout);
        }
        if !result.stderr.is_empty() {
            executor.screen().print(&result.stderr);
        }

        if result.success {
            return Ok(());
        }
        let exit_code = result.exit_code.unwrap_or(-1);
        Err(FlowError::execution_with_code(
            ErrorCode::EXEC_COMMAND_FAILED,
            format!("{} exited with code {}", file.display(), exit_code),
            Some(self.path.clone()),
        )
        .with_exit_code(exit_code))
    }
}
