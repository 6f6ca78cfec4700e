//! Breakpoint status flags
//!
//! The step state of the debugger lives in the session layer of the env so
//! it travels with cloned envs and session snapshots. Every read of a
//! one-shot flag goes through a `consume_*` accessor, which deletes it: a
//! flag is never observed as `true` twice.

use super::keys;
use super::Env;

/// Borrowed accessor over the breakpoint keys of an [`Env`]
pub struct BreakpointFlags<'a> {
    env: &'a mut Env,
}

impl<'a> BreakpointFlags<'a> {
    pub(super) fn new(env: &'a mut Env) -> Self {
        Self { env }
    }

    pub fn consume_here_now(&mut self) -> bool {
        self.env.take_bool(keys::BREAKPOINT_HERE_NOW)
    }

    pub fn arm_here_now(&mut self) {
        self.env.set_bool(keys::BREAKPOINT_HERE_NOW, true);
    }

    pub fn peek_here_now(&self) -> bool {
        self.env.get_bool(keys::BREAKPOINT_HERE_NOW)
    }

    pub fn consume_at_next(&mut self) -> bool {
        self.env.take_bool(keys::BREAKPOINT_AT_NEXT)
    }

    pub fn arm_at_next(&mut self) {
        self.env.set_bool(keys::BREAKPOINT_AT_NEXT, true);
    }

    pub fn clear_at_next(&mut self) {
        self.env.take_bool(keys::BREAKPOINT_AT_NEXT);
    }

    pub fn peek_at_next(&self) -> bool {
        self.env.get_bool(keys::BREAKPOINT_AT_NEXT)
    }

    pub fn consume_step_in(&mut self) -> bool {
        self.env.take_bool(keys::BREAKPOINT_STEP_IN)
    }

    pub fn arm_step_in(&mut self) {
        self.env.set_bool(keys::BREAKPOINT_STEP_IN, true);
    }

    pub fn peek_step_in(&self) -> bool {
        self.env.get_bool(keys::BREAKPOINT_STEP_IN)
    }

    pub fn consume_step_out(&mut self) -> bool {
        self.env.take_bool(keys::BREAKPOINT_STEP_OUT)
    }

    pub fn arm_step_out(&mut self) {
        self.env.set_bool(keys::BREAKPOINT_STEP_OUT, true);
    }

    pub fn peek_step_out(&self) -> bool {
        self.env.get_bool(keys::BREAKPOINT_STEP_OUT)
    }

    pub fn clear_all(&mut self) {
        for key in keys::BREAKPOINT_STATUS_KEYS {
            self.env.take_bool(key);
        }
    }

    /// No breakpoint fires while the interactive loop runs
    pub fn inside_interact(&self) -> bool {
        self.env.get_bool(keys::INTERACT_INSIDE)
    }

    pub fn enter_interact(&mut self) {
        self.env.set_bool(keys::INTERACT_INSIDE, true);
    }

    pub fn exit_interact(&mut self) {
        self.env.take_bool(keys::INTERACT_INSIDE);
    }

    pub fn request_leave(&mut self) {
        self.env.set_bool(keys::INTERACT_LEAVING, true);
    }

    pub fn consume_leaving(&mut self) -> bool {
        self.env.take_bool(keys::INTERACT_LEAVING)
    }
}
