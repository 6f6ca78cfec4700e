//! Persisted env layer stored as a flat TOML table

use super::{keys, Env, EnvLayer};
use crate::error::Result;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Load the persisted layer from `path` into `env`; a missing file is an empty layer
pub fn load_persisted(env: &mut Env, path: &Path) -> Result<()> {
    if !path.exists() {
        debug!("No persisted env at {}", path.display());
        return Ok(());
    }
    let content = std::fs::read_to_string(path)?;
    let values: BTreeMap<String, String> = toml::from_str(&content)?;
    debug!("Loaded {} persisted env values", values.len());
    env.replace_layer(EnvLayer::Persisted, values);
    Ok(())
}

/// Write the persisted layer of `env` to `path`
pub fn save_persisted(env: &Env, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let values: BTreeMap<String, String> = env
        .layer_values(EnvLayer::Persisted)
        .iter()
        .filter(|(k, _)| !keys::is_runtime_key(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    std::fs::write(path, toml::to_string(&values)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_persisted_layer_round_trip_skips_runtime_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("env.toml");

        let mut env = Env::new();
        env.set_in(EnvLayer::Persisted, "deploy.target", "staging");
        env.set_in(EnvLayer::Persisted, keys::BREAKPOINT_STEP_IN, "true");
        save_persisted(&env, &path).unwrap();

        let mut loaded = Env::new();
        load_persisted(&mut loaded, &path).unwrap();
        assert_eq!(loaded.get("deploy.target"), Some("staging"));
        assert!(!loaded.get_bool(keys::BREAKPOINT_STEP_IN));
    }

    #[test]
    fn test_missing_file_is_empty_layer() {
        let temp = TempDir::new().unwrap();
        let mut env = Env::new();
        load_persisted(&mut env, &temp.path().join("nope.toml")).unwrap();
        assert!(env.layer_values(EnvLayer::Persisted).is_empty());
    }
}
