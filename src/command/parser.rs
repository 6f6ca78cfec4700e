//! Flow parsing
//!
//! A flow is a `:`-separated list of command invocations:
//!
//! ```text
//! {deploy.target=staging} build jobs=4 : test : notify.slack+ %delay=30s
//! ```
//!
//! Each segment holds optional `{key=value}` env assignments, a command path
//! (a trailing `+` marks tail mode), `key=value` arguments, positional
//! arguments and an optional `%delay=<duration>` that sends the command to a
//! background task.

use super::{Cmd, CmdKind, CmdRegistry};
use crate::env::Env;
use crate::error::{ErrorCode, FlowError, Result};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

pub const FLOW_SEPARATOR: &str = ":";
const DELAY_PREFIX: &str = "%delay=";
const TAIL_MODE_SUFFIX: char = '+';

/// One resolved invocation in a flow
#[derive(Debug, Clone)]
pub struct ParsedCmd {
    /// `None` for a segment that only assigns env values
    pub cmd: Option<Arc<Cmd>>,
    pub display_path: String,
    pub args: BTreeMap<String, String>,
    pub positional: Vec<String>,
    pub env_assignments: Vec<(String, String)>,
    pub delay: Option<Duration>,
    pub tail_mode: bool,
    /// Tokens this segment was parsed from, used to persist and replay flows
    pub source: Vec<String>,
}

impl ParsedCmd {
    pub fn is_quiet(&self) -> bool {
        self.cmd.as_ref().map(|c| c.quiet).unwrap_or(false)
    }

    pub fn is_delayed(&self) -> bool {
        self.delay.is_some()
    }

    /// Nothing to run and nothing to assign
    pub fn is_empty(&self) -> bool {
        let no_action = match &self.cmd {
            None => true,
            Some(cmd) => matches!(cmd.kind, CmdKind::Empty),
        };
        no_action && self.env_assignments.is_empty()
    }

    pub fn apply_env(&self, env: &mut Env) {
        for (key, value) in &self.env_assignments {
            env.set(key.clone(), value.clone());
        }
    }

    /// Same invocation without the background delay
    pub fn without_delay(&self) -> ParsedCmd {
        let mut cmd = self.clone();
        cmd.delay = None;
        cmd.source.retain(|t| !t.starts_with(DELAY_PREFIX));
        cmd
    }

    /// Human-readable form: path, args and delay
    pub fn display(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.env_assignments {
            let _ = write!(out, "{{{}={}}} ", key, value);
        }
        out.push_str(&self.display_path);
        if self.tail_mode {
            out.push(TAIL_MODE_SUFFIX);
        }
        for value in &self.positional {
            let _ = write!(out, " {}", value);
        }
        for (key, value) in &self.args {
            let _ = write!(out, " {}={}", key, value);
        }
        if let Some(delay) = self.delay {
            let _ = write!(out, " {}{}", DELAY_PREFIX, humantime::format_duration(delay));
        }
        out.trim().to_string()
    }
}

/// Ordered commands of one flow level
#[derive(Debug, Clone, Default)]
pub struct ParsedFlow {
    pub cmds: Vec<ParsedCmd>,
    /// The flow collapsed to a single tail-mode command
    pub tail_mode_call: bool,
    pub has_tail_mode: bool,
}

impl ParsedFlow {
    /// Flow made of one command
    pub fn single(cmd: ParsedCmd) -> Self {
        let tail = cmd.tail_mode;
        Self {
            cmds: vec![cmd],
            tail_mode_call: tail,
            has_tail_mode: tail,
        }
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    /// Drop trailing commands that would do nothing
    pub fn trim_empty_tail(&mut self) {
        while self.cmds.last().map(ParsedCmd::is_empty).unwrap_or(false) {
            self.cmds.pop();
        }
    }

    /// Tokens that parse back into this flow
    pub fn to_tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        for (i, cmd) in self.cmds.iter().enumerate() {
            if i > 0 {
                tokens.push(FLOW_SEPARATOR.to_string());
            }
            tokens.extend(cmd.source.iter().cloned());
        }
        tokens
    }
}

/// Parse a flow written as one string, shell-quoting rules apply
pub fn parse_flow_str(registry: &CmdRegistry, flow: &str) -> Result<ParsedFlow> {
    let tokens = shell_words::split(flow).map_err(|e| {
        FlowError::flow_with_code(
            ErrorCode::FLOW_INVALID_SYNTAX,
            format!("cannot split flow '{}'", flow),
        )
        .with_source(e)
    })?;
    parse_flow(registry, &tokens)
}

/// Parse flow tokens against the command registry
pub fn parse_flow(registry: &CmdRegistry, tokens: &[String]) -> Result<ParsedFlow> {
    let mut flow = ParsedFlow::default();
    for segment in split_segments(tokens) {
        if segment.is_empty() {
            continue;
        }
        flow.cmds.push(parse_segment(registry, segment)?);
    }

    flow.has_tail_mode = flow.cmds.iter().any(|c| c.tail_mode);
    let real_cmds: Vec<_> = flow.cmds.iter().filter(|c| c.cmd.is_some()).collect();
    flow.tail_mode_call = real_cmds.len() == 1 && real_cmds[0].tail_mode;
    Ok(flow)
}

/// Split tokens into segments on standalone, leading or trailing `:`
fn split_segments(tokens: &[String]) -> Vec<Vec<String>> {
    let mut segments = vec![Vec::new()];
    for token in tokens {
        let mut token = token.trim();
        if token.is_empty() {
            continue;
        }
        if token == FLOW_SEPARATOR {
            segments.push(Vec::new());
            continue;
        }
        if let Some(rest) = token.strip_prefix(FLOW_SEPARATOR) {
            segments.push(Vec::new());
            token = rest;
        }
        let trailing = token.ends_with(FLOW_SEPARATOR) && !token.ends_with("::");
        let body = if trailing {
            &token[..token.len() - 1]
        } else {
            token
        };
        if !body.is_empty() {
            if let Some(current) = segments.last_mut() {
                current.push(body.to_string());
            }
        }
        if trailing {
            segments.push(Vec::new());
        }
    }
    segments
}

fn parse_segment(registry: &CmdRegistry, segment: Vec<String>) -> Result<ParsedCmd> {
    let mut parsed = ParsedCmd {
        cmd: None,
        display_path: String::new(),
        args: BTreeMap::new(),
        positional: Vec::new(),
        env_assignments: Vec::new(),
        delay: None,
        tail_mode: false,
        source: segment.clone(),
    };

    for token in &segment {
        if let Some(assignment) = token.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
            parsed.env_assignments.push(split_assignment(assignment, token)?);
            continue;
        }

        if parsed.cmd.is_none() {
            let (path, tail) = match token.strip_suffix(TAIL_MODE_SUFFIX) {
                Some(path) => (path, true),
                None => (token.as_str(), false),
            };
            let cmd = registry.resolve(path).ok_or_else(|| {
                FlowError::flow_with_code(
                    ErrorCode::FLOW_UNKNOWN_COMMAND,
                    format!("unknown command '{}'", path),
                )
            })?;
            parsed.display_path = cmd.path.clone();
            parsed.tail_mode = tail;
            parsed.cmd = Some(cmd);
            continue;
        }

        if let Some(raw) = token.strip_prefix(DELAY_PREFIX) {
            let delay = humantime::parse_duration(raw).map_err(|e| {
                FlowError::validation_with_code(
                    ErrorCode::VALIDATION_INVALID_FORMAT,
                    format!("invalid delay '{}'", raw),
                    Some("%delay".to_string()),
                )
                .with_source(e)
            })?;
            parsed.delay = Some(delay);
        } else if let Some((key, value)) = token.split_once('=') {
            parsed.args.insert(key.to_string(), value.to_string());
        } else {
            parsed.positional.push(token.clone());
        }
    }

    Ok(parsed)
}

fn split_assignment(assignment: &str, token: &str) -> Result<(String, String)> {
    match assignment.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(FlowError::flow_with_code(
            ErrorCode::FLOW_INVALID_SYNTAX,
            format!("env assignment '{}' must look like {{key=value}}", token),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(flow: &str) -> Vec<String> {
        shell_words::split(flow).unwrap()
    }

    #[test]
    fn test_split_segments_handles_attached_separators() {
        let segments = split_segments(&tokens("echo hi: sleep dur=1s :noop"));
        assert_eq!(
            segments,
            vec![
                vec!["echo".to_string(), "hi".to_string()],
                vec!["sleep".to_string(), "dur=1s".to_string()],
                vec!["noop".to_string()],
            ]
        );
    }

    #[test]
    fn test_parse_args_env_and_delay() {
        let registry = CmdRegistry::with_builtins();
        let flow = parse_flow_str(
            &registry,
            "{deploy.target=staging} echo msg=hello extra : sleep %delay=2s",
        )
        .unwrap();

        assert_eq!(flow.len(), 2);
        let echo = &flow.cmds[0];
        assert_eq!(echo.display_path, "echo");
        assert_eq!(echo.args.get("msg").map(String::as_str), Some("hello"));
        assert_eq!(echo.positional, vec!["extra".to_string()]);
        assert_eq!(
            echo.env_assignments,
            vec![("deploy.target".to_string(), "staging".to_string())]
        );

        let sleep = &flow.cmds[1];
        assert_eq!(sleep.delay, Some(Duration::from_secs(2)));
        assert!(sleep.without_delay().delay.is_none());
        assert_eq!(sleep.without_delay().source, vec!["sleep".to_string()]);
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        let registry = CmdRegistry::with_builtins();
        let err = parse_flow_str(&registry, "echo : no.such.cmd").unwrap_err();
        assert_eq!(err.code(), ErrorCode::FLOW_UNKNOWN_COMMAND);
    }

    #[test]
    fn test_invalid_delay_is_rejected() {
        let registry = CmdRegistry::with_builtins();
        let err = parse_flow_str(&registry, "noop %delay=soon").unwrap_err();
        assert_eq!(err.code(), ErrorCode::VALIDATION_INVALID_FORMAT);
    }

    #[test]
    fn test_tail_mode_flags() {
        let registry = CmdRegistry::with_builtins();
        let flow = parse_flow_str(&registry, "{a=1} : echo+").unwrap();
        assert!(flow.has_tail_mode);
        assert!(flow.tail_mode_call);

        let flow = parse_flow_str(&registry, "noop : echo+").unwrap();
        assert!(flow.has_tail_mode);
        assert!(!flow.tail_mode_call);
    }

    #[test]
    fn test_trim_keeps_trailing_env_assignments() {
        let registry = CmdRegistry::with_builtins();
        let mut flow = parse_flow_str(&registry, "echo : {x=1} : :").unwrap();
        flow.trim_empty_tail();
        assert_eq!(flow.len(), 2);
        assert!(flow.cmds[1].cmd.is_none());
    }

    #[test]
    fn test_tokens_round_trip() {
        let registry = CmdRegistry::with_builtins();
        let flow = parse_flow_str(&registry, "echo msg=a : noop").unwrap();
        let reparsed = parse_flow(&registry, &flow.to_tokens()).unwrap();
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed.cmds[1].display_path, "noop");
    }
}
