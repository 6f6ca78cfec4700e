//! Execution masks
//!
//! A mask overrides what the debugger would do with one command: `Exec`
//! runs it without breaking (set by step-over, inherited by everything
//! below), `Skip` drops it. Masks mirror the flow tree and grow lazily as
//! sub-flows are entered.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecPolicy {
    #[default]
    Default,
    Exec,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecuteMask {
    pub policy: ExecPolicy,
    /// One mask per sub-flow command; `None` when the sub-flow is not tracked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_flow: Option<Vec<ExecuteMask>>,
}

impl ExecuteMask {
    pub fn new(policy: ExecPolicy) -> Self {
        Self {
            policy,
            sub_flow: None,
        }
    }

    /// Mask whose sub-flow is tracked from the start
    pub fn tracked(policy: ExecPolicy) -> Self {
        Self {
            policy,
            sub_flow: Some(Vec::new()),
        }
    }

    pub fn is_skip(&self) -> bool {
        self.policy == ExecPolicy::Skip
    }

    pub fn is_exec(&self) -> bool {
        self.policy == ExecPolicy::Exec
    }

    /// Set `policy` here and on every descendant created so far; later
    /// children inherit it through [`sub_flow_masks`](Self::sub_flow_masks)
    pub fn set_exec_policy_for_all(&mut self, policy: ExecPolicy) {
        self.policy = policy;
        if let Some(children) = &mut self.sub_flow {
            for child in children {
                child.set_exec_policy_for_all(policy);
            }
        }
    }

    /// Child masks for a sub-flow of `len` commands, created on demand
    pub fn sub_flow_masks(&mut self, len: usize) -> &mut Vec<ExecuteMask> {
        let policy = self.policy;
        let children = self.sub_flow.get_or_insert_with(Vec::new);
        while children.len() < len {
            children.push(ExecuteMask::tracked(policy));
        }
        children
    }
}
