//! Env keys shared with persisted sessions and command scripts
//!
//! These strings are a wire format: session status files and cloned
//! background envs carry them verbatim.

pub const BREAKPOINT_HERE_NOW: &str = "sys.breakpoint.here.now";
pub const BREAKPOINT_AT_NEXT: &str = "sys.breakpoint.at-next";
pub const BREAKPOINT_STEP_IN: &str = "sys.breakpoint.status.step-in";
pub const BREAKPOINT_STEP_OUT: &str = "sys.breakpoint.status.step-out";

pub const INTERACT_INSIDE: &str = "sys.interact.inside";
pub const INTERACT_LEAVING: &str = "sys.interact.leaving";

pub const IN_BG_TASK: &str = "sys.in-bg-task";
pub const BG_THREAD_ID: &str = "sys.bg-thread-id";

pub const EXECUTE_WAIT_SEC: &str = "sys.execute-wait-sec";
pub const EXECUTE_WAIT_SEC_AT_END: &str = "sys.execute-wait-sec.at-end";

pub const FOREST_MODE: &str = "sys.forest-mode";
pub const STACK_DEPTH: &str = "sys.stack-depth";
pub const STACK: &str = "sys.stack";
pub const SESSION_ID: &str = "sys.session.id";

/// Every breakpoint status flag; background tasks start with none of them set.
pub const BREAKPOINT_STATUS_KEYS: [&str; 4] = [
    BREAKPOINT_HERE_NOW,
    BREAKPOINT_AT_NEXT,
    BREAKPOINT_STEP_IN,
    BREAKPOINT_STEP_OUT,
];

/// Keys that only make sense for the lifetime of one process run
pub fn is_runtime_key(key: &str) -> bool {
    BREAKPOINT_STATUS_KEYS.contains(&key)
        || matches!(
            key,
            INTERACT_INSIDE
                | INTERACT_LEAVING
                | STACK_DEPTH
                | STACK
                | IN_BG_TASK
                | BG_THREAD_ID
                | SESSION_ID
        )
}
