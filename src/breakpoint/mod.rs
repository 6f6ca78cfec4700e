//! Interactive breakpoint/step debugging
//!
//! - [`registry`] holds the user's "break before/after/at end" markers
//! - [`engine`] turns markers and env status flags into a [`BreakPointAction`]
//! - [`hook`] supplies the answers, from a terminal or a script

pub mod action;
pub mod engine;
pub mod hook;
pub mod registry;

pub use action::{BreakPointAction, ChoiceSet};
pub use engine::{BreakCheck, BreakStage, BreakTarget, BreakpointEngine, Interactor};
pub use hook::{
    BreakpointHook, InvalidInput, InvalidInputPolicy, ScriptedHook, TerminalHook,
    SCRIPT_FALLBACK_ANSWER,
};
pub use registry::{BreakPoints, SharedBreakPoints};
