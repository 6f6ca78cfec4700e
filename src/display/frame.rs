use crate::command::ParsedFlow;
use std::fmt::Write as _;

const CURRENT_MARKER: &str = ">>";

/// Text view of a flow with the current command marked
pub fn render_frame(flow: &ParsedFlow, index: usize, stack: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(stack) = stack.filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "[{}]", stack);
    }
    for (i, cmd) in flow.cmds.iter().enumerate() {
        let marker = if i == index { CURRENT_MARKER } else { "" };
        let _ = writeln!(out, "{:>2} {:>3}  {}", marker, i, cmd.display());
    }
    out
}

/// One-line legend of the offered keys
pub fn render_legend(keys: &[String], descriptions: &[String]) -> String {
    let items: Vec<String> = keys
        .iter()
        .zip(descriptions)
        .map(|(key, desc)| format!("[{}] {}", key, desc))
        .collect();
    format!("    {}\n", items.join("  "))
}
