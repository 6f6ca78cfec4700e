//! Layered key-value environment
//!
//! Commands read their settings from an [`Env`] and the breakpoint engine
//! stores its step state in it. Lookups go through the layers from the most
//! specific to the least specific:
//!
//! 1. `Session` - values set while the flow runs (always the write target)
//! 2. `Persisted` - values loaded from the user's env file
//! 3. `Default` - values derived from configuration
//!
//! A whole `Env` is cheap to clone; background tasks and forest-mode commands
//! receive their own copy so flags never leak between threads of control.

pub mod flags;
pub mod keys;
pub mod persist;

pub use flags::BreakpointFlags;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One layer of the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvLayer {
    Session,
    Persisted,
    Default,
}

impl EnvLayer {
    /// Lookup order, most specific first
    pub const LOOKUP_ORDER: [EnvLayer; 3] =
        [EnvLayer::Session, EnvLayer::Persisted, EnvLayer::Default];
}

impl fmt::Display for EnvLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvLayer::Session => write!(f, "session"),
            EnvLayer::Persisted => write!(f, "persisted"),
            EnvLayer::Default => write!(f, "default"),
        }
    }
}

/// Layered string map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Env {
    session: BTreeMap<String, String>,
    persisted: BTreeMap<String, String>,
    defaults: BTreeMap<String, String>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    fn layer(&self, layer: EnvLayer) -> &BTreeMap<String, String> {
        match layer {
            EnvLayer::Session => &self.session,
            EnvLayer::Persisted => &self.persisted,
            EnvLayer::Default => &self.defaults,
        }
    }

    fn layer_mut(&mut self, layer: EnvLayer) -> &mut BTreeMap<String, String> {
        match layer {
            EnvLayer::Session => &mut self.session,
            EnvLayer::Persisted => &mut self.persisted,
            EnvLayer::Default => &mut self.defaults,
        }
    }

    /// Resolve a key through the layers
    pub fn get(&self, key: &str) -> Option<&str> {
        EnvLayer::LOOKUP_ORDER
            .iter()
            .find_map(|layer| self.layer(*layer).get(key))
            .map(String::as_str)
    }

    /// Resolve a key and report which layer provided it
    pub fn get_with_layer(&self, key: &str) -> Option<(&str, EnvLayer)> {
        EnvLayer::LOOKUP_ORDER.iter().find_map(|layer| {
            self.layer(*layer)
                .get(key)
                .map(|value| (value.as_str(), *layer))
        })
    }

    /// Read a boolean; missing or unparsable values are `false`
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).map(parse_bool).unwrap_or(false)
    }

    /// Read an unsigned integer; missing or unparsable values are `None`
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// Set a value in the session layer
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.session.insert(key.into(), value.into());
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.set(key, value.to_string());
    }

    /// Set a value in a specific layer
    pub fn set_in(&mut self, layer: EnvLayer, key: impl Into<String>, value: impl Into<String>) {
        self.layer_mut(layer).insert(key.into(), value.into());
    }

    /// Remove a key from the session layer
    pub fn delete(&mut self, key: &str) -> Option<String> {
        self.session.remove(key)
    }

    /// Remove a key from a specific layer
    pub fn delete_in(&mut self, layer: EnvLayer, key: &str) -> Option<String> {
        self.layer_mut(layer).remove(key)
    }

    /// Read a boolean and make sure it reads `false` afterwards
    pub fn take_bool(&mut self, key: &str) -> bool {
        let value = self.get_bool(key);
        self.session.remove(key);
        if self.get_bool(key) {
            // A lower layer still says true; shadow it.
            self.set_bool(key, false);
        }
        value
    }

    /// Copy of the session layer
    pub fn session_snapshot(&self) -> BTreeMap<String, String> {
        self.session.clone()
    }

    /// Replace a whole layer
    pub fn replace_layer(&mut self, layer: EnvLayer, values: BTreeMap<String, String>) {
        *self.layer_mut(layer) = values;
    }

    /// Read-only view of a layer
    pub fn layer_values(&self, layer: EnvLayer) -> &BTreeMap<String, String> {
        self.layer(layer)
    }

    /// All visible key-value pairs after layer resolution
    pub fn flatten(&self) -> BTreeMap<String, String> {
        let mut merged = self.defaults.clone();
        merged.extend(self.persisted.clone());
        merged.extend(self.session.clone());
        merged
    }

    /// Copy used by a background task: own session layer, flagged as
    /// background, no inherited breakpoint status.
    pub fn clone_for_background(&self, thread_id: &str) -> Env {
        let mut env = self.clone();
        env.set_bool(keys::IN_BG_TASK, true);
        env.set(keys::BG_THREAD_ID, thread_id);
        env.flags().clear_all();
        env.delete(keys::INTERACT_INSIDE);
        env.delete(keys::INTERACT_LEAVING);
        env.delete(keys::STACK);
        env.delete(keys::STACK_DEPTH);
        env
    }

    /// Named accessors for the breakpoint status flags
    pub fn flags(&mut self) -> BreakpointFlags<'_> {
        BreakpointFlags::new(self)
    }
}

/// Parse the loose boolean spellings accepted in env values
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "y"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_precedence() {
        let mut env = Env::new();
        env.set_in(EnvLayer::Default, "k", "default");
        assert_eq!(env.get("k"), Some("default"));
        env.set_in(EnvLayer::Persisted, "k", "persisted");
        assert_eq!(env.get("k"), Some("persisted"));
        env.set("k", "session");
        assert_eq!(env.get_with_layer("k"), Some(("session", EnvLayer::Session)));
        env.delete("k");
        assert_eq!(env.get("k"), Some("persisted"));
    }

    #[test]
    fn test_bool_parsing() {
        let mut env = Env::new();
        for (raw, expected) in [("true", true), ("On", true), ("1", true), ("no", false)] {
            env.set("flag", raw);
            assert_eq!(env.get_bool("flag"), expected, "value {raw}");
        }
        assert!(!env.get_bool("missing"));
    }

    #[test]
    fn test_take_bool_shadows_lower_layers() {
        let mut env = Env::new();
        env.set_in(EnvLayer::Persisted, "flag", "true");
        assert!(env.take_bool("flag"));
        assert!(!env.get_bool("flag"));
        assert!(!env.take_bool("flag"));
    }

    #[test]
    fn test_clone_for_background_clears_status() {
        let mut env = Env::new();
        env.set("user.key", "v");
        env.flags().arm_step_in();
        env.flags().arm_at_next();
        env.set_bool(keys::INTERACT_INSIDE, true);

        let bg = env.clone_for_background("bg-1");
        assert_eq!(bg.get("user.key"), Some("v"));
        assert!(bg.get_bool(keys::IN_BG_TASK));
        assert_eq!(bg.get(keys::BG_THREAD_ID), Some("bg-1"));
        for key in keys::BREAKPOINT_STATUS_KEYS {
            assert!(!bg.get_bool(key), "{key} leaked into background env");
        }
        assert!(!bg.get_bool(keys::INTERACT_INSIDE));
        // The original is untouched
        assert!(env.get_bool(keys::BREAKPOINT_STEP_IN));
    }

    #[test]
    fn test_flatten_merges_layers() {
        let mut env = Env::new();
        env.set_in(EnvLayer::Default, "a", "1");
        env.set_in(EnvLayer::Persisted, "b", "2");
        env.set("a", "3");
        let flat = env.flatten();
        assert_eq!(flat.get("a").map(String::as_str), Some("3"));
        assert_eq!(flat.get("b").map(String::as_str), Some("2"));
    }
}
