//! Breakpoint decisions
//!
//! The engine is consulted before and after every command of a flow. It
//! reads the registry and the one-shot status flags in the env, prompts the
//! hook when something asks for a break, and leaves the answer's side effects
//! in the env (step-in/step-out/at-next). Masking and the step-over cascade
//! are left to the executor.

use super::action::{BreakPointAction, ChoiceSet};
use super::hook::{BreakpointHook, InvalidInput, InvalidInputPolicy};
use super::registry::SharedBreakPoints;
use crate::command::{ParsedCmd, ParsedFlow};
use crate::display::{render_frame, render_legend, Screen};
use crate::env::{keys, Env};
use crate::error::{FlowError, Result};
use crate::executor::mask::ExecuteMask;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const REASON_BEFORE: &str = "before command";
pub const REASON_AFTER: &str = "after command";
pub const REASON_STEPPED_IN: &str = "just stepped in";
pub const REASON_STEPPED_OUT: &str = "just stepped out";
pub const REASON_PREVIOUS_CHOICE: &str = "previous choice";
pub const REASON_AT_END: &str = "at end of flow";

/// Runs the nested interactive loop for the `interact` choice
#[async_trait]
pub trait Interactor: Send + Sync {
    async fn interact(&self, env: &mut Env) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakStage {
    Before,
    After,
}

/// The command a decision is about
#[derive(Debug, Clone, Copy)]
pub struct BreakTarget<'a> {
    pub cmd: &'a ParsedCmd,
    pub flow: Option<&'a ParsedFlow>,
    pub index: usize,
}

impl<'a> BreakTarget<'a> {
    pub fn new(cmd: &'a ParsedCmd) -> Self {
        Self {
            cmd,
            flow: None,
            index: 0,
        }
    }

    pub fn in_flow(flow: &'a ParsedFlow, index: usize, cmd: &'a ParsedCmd) -> Self {
        Self {
            cmd,
            flow: Some(flow),
            index,
        }
    }

    pub fn path(&self) -> &str {
        &self.cmd.display_path
    }

    fn quiet(&self) -> bool {
        self.cmd.is_quiet()
    }

    fn has_sub_flow(&self) -> bool {
        self.cmd.cmd.as_ref().is_some_and(|c| c.has_sub_flow())
    }

    fn unbreak_file_and_flow(&self) -> bool {
        self.cmd
            .cmd
            .as_ref()
            .is_some_and(|c| c.unbreak_file_and_flow)
    }
}

/// Per-check facts known by the executor
#[derive(Debug, Clone, Copy, Default)]
pub struct BreakCheck {
    /// The previous choice asked to stop at this command
    pub break_by_prev: bool,
    pub is_last_in_flow: bool,
    pub is_bootstrap: bool,
}

enum Answer {
    Action(BreakPointAction),
    Invalid,
}

pub struct BreakpointEngine {
    breakpoints: SharedBreakPoints,
    hook: Arc<dyn BreakpointHook>,
    screen: Arc<dyn Screen>,
    invalid_input: InvalidInputPolicy,
}

impl BreakpointEngine {
    pub fn new(
        breakpoints: SharedBreakPoints,
        hook: Arc<dyn BreakpointHook>,
        screen: Arc<dyn Screen>,
    ) -> Self {
        Self {
            breakpoints,
            hook,
            screen,
            invalid_input: InvalidInputPolicy::Auto,
        }
    }

    pub fn with_invalid_input(mut self, policy: InvalidInputPolicy) -> Self {
        self.invalid_input = policy;
        self
    }

    pub fn breakpoints(&self) -> &SharedBreakPoints {
        &self.breakpoints
    }

    pub fn hook(&self) -> &Arc<dyn BreakpointHook> {
        &self.hook
    }

    /// Decide what happens before a command runs
    pub async fn decide_before(
        &self,
        interactor: &dyn Interactor,
        env: &mut Env,
        target: &BreakTarget<'_>,
        mask: Option<&ExecuteMask>,
        check: BreakCheck,
    ) -> Result<BreakPointAction> {
        if env.flags().inside_interact() || target.quiet() {
            return Ok(BreakPointAction::Continue);
        }

        let break_before =
            self.breakpoints.has_before(target.path()) || env.flags().consume_here_now();
        let break_by_prev = check.break_by_prev || env.flags().consume_at_next();

        // Inside a step-over: run through, leave step-in/out for whoever is next.
        if mask.is_some_and(ExecuteMask::is_exec) {
            return Ok(BreakPointAction::Continue);
        }

        let step_in = env.flags().peek_step_in();
        let step_out = env.flags().peek_step_out();
        if !(break_before || step_in || step_out || break_by_prev) {
            return Ok(BreakPointAction::Continue);
        }

        let offer_step_in = target.has_sub_flow()
            && !target.unbreak_file_and_flow()
            && mask.map_or(true, |m| m.sub_flow.is_some());
        let choices = ChoiceSet::before(offer_step_in);

        // A step flag is consumed only when it is the reason for this prompt;
        // one outranked by a registry break stays armed for the next command.
        let reason = if break_before {
            REASON_BEFORE
        } else if step_in && env.flags().consume_step_in() {
            REASON_STEPPED_IN
        } else if step_out && env.flags().consume_step_out() {
            REASON_STEPPED_OUT
        } else {
            REASON_PREVIOUS_CHOICE
        };

        loop {
            let action = match self.ask(env, reason, &choices, target).await? {
                Answer::Action(action) => action,
                Answer::Invalid => match self.on_invalid_input() {
                    InvalidInput::Reprompt => continue,
                    InvalidInput::Continue => BreakPointAction::Continue,
                },
            };
            debug!("Breakpoint before {}: {}", target.path(), action);

            match action {
                BreakPointAction::Continue => {
                    env.flags().clear_at_next();
                    return Ok(BreakPointAction::Continue);
                }
                BreakPointAction::Skip | BreakPointAction::StepOver => {
                    if check.is_last_in_flow {
                        env.flags().arm_step_out();
                    }
                    return Ok(action);
                }
                BreakPointAction::StepIn => {
                    env.flags().arm_step_in();
                    return Ok(BreakPointAction::Continue);
                }
                BreakPointAction::Interact => {
                    if self.interact(interactor, env).await? {
                        return Ok(BreakPointAction::Continue);
                    }
                }
                BreakPointAction::Quit => return Err(FlowError::aborted()),
                BreakPointAction::StepToNext => return Ok(BreakPointAction::StepOver),
            }
        }
    }

    /// Decide what happens after a command ran; only the `afters` registry
    /// triggers this prompt
    pub async fn decide_after(
        &self,
        interactor: &dyn Interactor,
        env: &mut Env,
        target: &BreakTarget<'_>,
        check: BreakCheck,
    ) -> Result<BreakPointAction> {
        if env.flags().inside_interact()
            || target.quiet()
            || !self.breakpoints.has_after(target.path())
        {
            return Ok(BreakPointAction::Continue);
        }

        let choices = ChoiceSet::after();
        loop {
            let action = match self.ask(env, REASON_AFTER, &choices, target).await? {
                Answer::Action(action) => action.normalized(),
                Answer::Invalid => match self.on_invalid_input() {
                    InvalidInput::Reprompt => continue,
                    InvalidInput::Continue => BreakPointAction::Continue,
                },
            };
            debug!("Breakpoint after {}: {}", target.path(), action);

            match action {
                BreakPointAction::StepOver => {
                    if check.is_last_in_flow && !target.has_sub_flow() {
                        env.flags().arm_step_out();
                    }
                    return Ok(BreakPointAction::StepOver);
                }
                BreakPointAction::Interact => {
                    if self.interact(interactor, env).await? {
                        return Ok(BreakPointAction::Continue);
                    }
                }
                BreakPointAction::Quit => return Err(FlowError::aborted()),
                _ => return Ok(BreakPointAction::Continue),
            }
        }
    }

    /// Before/after decision followed by the configured pause after a
    /// command that was let through
    pub async fn decide_break_with_wait(
        &self,
        stage: BreakStage,
        interactor: &dyn Interactor,
        env: &mut Env,
        target: &BreakTarget<'_>,
        mask: Option<&ExecuteMask>,
        check: BreakCheck,
    ) -> Result<BreakPointAction> {
        let action = match stage {
            BreakStage::Before => {
                self.decide_before(interactor, env, target, mask, check)
                    .await?
            }
            BreakStage::After => self.decide_after(interactor, env, target, check).await?,
        };

        if stage == BreakStage::After
            && action == BreakPointAction::Continue
            && !check.is_bootstrap
            && !target.quiet()
        {
            self.wait(env, check.is_last_in_flow).await;
        }
        Ok(action)
    }

    /// Break once after the main flow
    pub async fn decide_at_end(
        &self,
        interactor: &dyn Interactor,
        env: &mut Env,
    ) -> Result<BreakPointAction> {
        if env.flags().inside_interact() {
            return Ok(BreakPointAction::Continue);
        }
        let here_now = env.flags().consume_here_now();
        if !(self.breakpoints.at_end() || here_now) {
            return Ok(BreakPointAction::Continue);
        }

        let choices = ChoiceSet::at_end();
        loop {
            let answer = self.ask_plain(env, REASON_AT_END, &choices).await?;
            let action = match answer {
                Answer::Action(action) => action,
                Answer::Invalid => match self.on_invalid_input() {
                    InvalidInput::Reprompt => continue,
                    InvalidInput::Continue => BreakPointAction::Continue,
                },
            };
            match action {
                BreakPointAction::Interact => {
                    if self.interact(interactor, env).await? {
                        return Ok(BreakPointAction::Continue);
                    }
                }
                BreakPointAction::Quit => return Err(FlowError::aborted()),
                _ => return Ok(BreakPointAction::Continue),
            }
        }
    }

    /// Break between the sub-flow and the file of a file+flow command.
    /// Returns whether the file part should run.
    pub async fn decide_inside_file_and_flow(
        &self,
        interactor: &dyn Interactor,
        env: &mut Env,
        target: &BreakTarget<'_>,
        break_by_prev: bool,
    ) -> Result<bool> {
        if env.flags().inside_interact() {
            return Ok(true);
        }
        let step_in = env.flags().peek_step_in();
        let step_out = env.flags().peek_step_out();
        let break_by_prev = break_by_prev || env.flags().consume_at_next();
        if !(step_in || step_out || break_by_prev) {
            return Ok(true);
        }

        let reason = if step_in && env.flags().consume_step_in() {
            REASON_STEPPED_IN
        } else if step_out {
            REASON_STEPPED_OUT
        } else {
            REASON_PREVIOUS_CHOICE
        };
        let choices = ChoiceSet::inside_file_and_flow();

        loop {
            let action = match self.ask(env, reason, &choices, target).await? {
                Answer::Action(action) => action,
                Answer::Invalid => match self.on_invalid_input() {
                    InvalidInput::Reprompt => continue,
                    InvalidInput::Continue => BreakPointAction::Continue,
                },
            };
            debug!("Breakpoint inside {}: {}", target.path(), action);

            match action {
                BreakPointAction::Skip => return Ok(false),
                BreakPointAction::StepOver | BreakPointAction::StepToNext => return Ok(true),
                BreakPointAction::Interact => {
                    if self.interact(interactor, env).await? {
                        env.flags().consume_step_out();
                        return Ok(true);
                    }
                }
                BreakPointAction::Quit => return Err(FlowError::aborted()),
                BreakPointAction::Continue | BreakPointAction::StepIn => {
                    env.flags().consume_step_out();
                    return Ok(true);
                }
            }
        }
    }

    fn on_invalid_input(&self) -> InvalidInput {
        self.invalid_input.resolve(self.hook.invalid_input())
    }

    async fn ask(
        &self,
        env: &Env,
        reason: &str,
        choices: &ChoiceSet,
        target: &BreakTarget<'_>,
    ) -> Result<Answer> {
        if let Some(flow) = target.flow {
            self.screen
                .print(&render_frame(flow, target.index, env.get(keys::STACK)));
        }
        let reason = format!("{}: {}", reason, target.path());
        self.prompt(&reason, choices).await
    }

    async fn ask_plain(&self, env: &Env, reason: &str, choices: &ChoiceSet) -> Result<Answer> {
        if let Some(stack) = env.get(keys::STACK).filter(|s| !s.is_empty()) {
            self.screen.print(&format!("[{}]\n", stack));
        }
        self.prompt(reason, choices).await
    }

    async fn prompt(&self, reason: &str, choices: &ChoiceSet) -> Result<Answer> {
        let keys = choices.keys();
        let descriptions = choices.descriptions();
        self.screen.print(&format!("[break] {}\n", reason));
        self.screen.print(&render_legend(&keys, &descriptions));

        let input = self
            .hook
            .on_breakpoint(reason, &keys, &descriptions)
            .await?;
        match choices.resolve(&input) {
            Some(action) => Ok(Answer::Action(action)),
            None => {
                self.screen.print(&format!(
                    "'{}' is not one of [{}]\n",
                    input.trim(),
                    keys.join("/")
                ));
                Ok(Answer::Invalid)
            }
        }
    }

    /// Run the interactive loop; true when the user asked to leave it
    async fn interact(&self, interactor: &dyn Interactor, env: &mut Env) -> Result<bool> {
        env.flags().enter_interact();
        let result = interactor.interact(env).await;
        env.flags().exit_interact();
        result?;
        Ok(env.flags().consume_leaving())
    }

    async fn wait(&self, env: &Env, is_last: bool) {
        let key = if is_last {
            keys::EXECUTE_WAIT_SEC_AT_END
        } else {
            keys::EXECUTE_WAIT_SEC
        };
        let secs = env.get_u64(key).unwrap_or(0);
        if secs == 0 {
            return;
        }
        for _ in 0..secs {
            self.screen.print(".");
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        self.screen.print("\n");
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod engine_tests;
