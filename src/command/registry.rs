use super::{builtins, Cmd, CmdKind};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registered commands keyed by display path
#[derive(Clone, Default)]
pub struct CmdRegistry {
    commands: BTreeMap<String, Arc<Cmd>>,
}

impl CmdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in commands
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::register_builtins(&mut registry);
        registry
    }

    pub fn register(&mut self, command: Cmd) {
        self.commands
            .insert(command.path.clone(), Arc::new(command));
    }

    pub fn get_command(&self, path: &str) -> Option<Arc<Cmd>> {
        self.commands.get(path).cloned()
    }

    /// Resolve a path to a command. A path that only prefixes other
    /// commands (`dbg.break` for `dbg.break.at`) resolves to a
    /// no-executable placeholder.
    pub fn resolve(&self, path: &str) -> Option<Arc<Cmd>> {
        if let Some(cmd) = self.get_command(path) {
            return Some(cmd);
        }
        let children = self.sub_commands(path);
        if children.is_empty() {
            return None;
        }
        Some(Arc::new(Cmd::new(
            path,
            format!("command group: {}", children.join(", ")),
            CmdKind::NoExecutable,
        )))
    }

    /// Paths registered anywhere below `path`
    pub fn sub_commands(&self, path: &str) -> Vec<String> {
        let prefix = format!("{}.", path);
        self.commands
            .keys()
            .filter(|name| name.starts_with(&prefix))
            .cloned()
            .collect()
    }

    pub fn list_commands(&self) -> Vec<(&str, &Cmd)> {
        self.commands
            .iter()
            .map(|(name, cmd)| (name.as_str(), cmd.as_ref()))
            .collect()
    }

    pub fn has_command(&self, path: &str) -> bool {
        self.commands.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CmdType;

    #[test]
    fn test_register_and_resolve() {
        let mut registry = CmdRegistry::new();
        registry.register(Cmd::new(
            "build",
            "",
            CmdKind::Flow(vec!["compile".to_string()]),
        ));
        assert!(registry.has_command("build"));
        assert_eq!(
            registry.resolve("build").unwrap().cmd_type(),
            CmdType::Flow
        );
        assert!(registry.resolve("missing").is_none());
    }

    #[test]
    fn test_group_paths_resolve_to_placeholders() {
        let registry = CmdRegistry::with_builtins();
        let group = registry.resolve("dbg.break").unwrap();
        assert_eq!(group.cmd_type(), CmdType::NoExecutable);
        assert!(group.help.contains("dbg.break.at"));
        assert!(!registry.has_command("dbg.break"));
    }
}
