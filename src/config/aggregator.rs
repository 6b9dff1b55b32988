//! Multi-source configuration aggregator.

use std::path::{Path, PathBuf};

use serde_json::Map;
use tracing::debug;

use super::local::{config_file_path, load_json_object};
use super::source::ConfigValue;
use super::{default_state_dir, ConfigError, PROJECT_FILE, STATE_DIR_VAR};

const ENV_PREFIX: &str = "NIMBUS_";

/// Where an aggregated entry came from, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayerKind {
    Environment,
    Project,
    Global,
}

#[derive(Debug, Clone)]
struct Layer {
    kind: LayerKind,
    entries: Map<String, ConfigValue>,
}

/// Merges configuration from the environment, the project-local config file
/// and the global config file into a single effective value per key.
///
/// The project layer is discovered from the *current working directory* by
/// walking parent directories until one contains `nimbus-project.json`; this
/// is what makes the directory-scoped bootstrap in [`crate::AuthHelper`]
/// necessary in multi-workspace environments.
#[derive(Debug, Clone)]
pub struct ConfigAggregator {
    state_dir: PathBuf,
    layers: Vec<Layer>,
}

impl ConfigAggregator {
    /// Builds an aggregator against the default state dir and the current
    /// working directory.
    ///
    /// Missing config files are empty layers; malformed files are hard
    /// errors, since an aggregator built over corrupt state is unusable.
    pub fn create() -> Result<Self, ConfigError> {
        Self::create_in(default_state_dir()?)
    }

    /// Builds an aggregator against an explicit state dir.
    pub fn create_in(state_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let mut aggregator = Self {
            state_dir: state_dir.into(),
            layers: Vec::new(),
        };
        aggregator.scan()?;
        Ok(aggregator)
    }

    /// Returns the effective value for a key: the first non-null hit in
    /// precedence order (environment, project, global).
    pub fn property_value(&self, key: &str) -> Option<&ConfigValue> {
        self.layers
            .iter()
            .find_map(|layer| layer.entries.get(key).filter(|v| !v.is_null()))
    }

    /// Rescans all sources in place, picking up external edits.
    pub fn reload(&mut self) -> Result<(), ConfigError> {
        self.scan()
    }

    fn scan(&mut self) -> Result<(), ConfigError> {
        let mut layers = Vec::with_capacity(3);

        layers.push(Layer {
            kind: LayerKind::Environment,
            entries: env_entries(),
        });

        let project_entries = match project_root() {
            Some(root) => {
                debug!(root = %root.display(), "found project root");
                load_json_object(&config_file_path(&root))?.unwrap_or_default()
            }
            None => Map::new(),
        };
        layers.push(Layer {
            kind: LayerKind::Project,
            entries: project_entries,
        });

        layers.push(Layer {
            kind: LayerKind::Global,
            entries: load_json_object(&config_file_path_in(&self.state_dir))?.unwrap_or_default(),
        });

        for layer in &layers {
            debug!(kind = ?layer.kind, keys = layer.entries.len(), "scanned config layer");
        }

        self.layers = layers;
        Ok(())
    }
}

// The global config file sits directly in the state dir, which already is
// the tool dir.
fn config_file_path_in(state_dir: &Path) -> PathBuf {
    state_dir.join(super::CONFIG_FILE)
}

/// Walks up from the current working directory looking for the project
/// marker file. No marker (or an unreadable cwd) means no project layer.
fn project_root() -> Option<PathBuf> {
    let start = std::env::current_dir().ok()?;
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_FILE).is_file())
        .map(Path::to_path_buf)
}

/// Collects `NIMBUS_*` variables, mapping names to config keys:
/// strip the prefix, lowercase, `_` becomes `-`.
fn env_entries() -> Map<String, ConfigValue> {
    let mut entries = Map::new();
    for (name, value) in std::env::vars() {
        if name == STATE_DIR_VAR {
            continue;
        }
        if let Some(rest) = name.strip_prefix(ENV_PREFIX) {
            if rest.is_empty() {
                continue;
            }
            let key = rest.to_lowercase().replace('_', "-");
            entries.insert(key, coerce_value(&value));
        }
    }
    entries
}

/// Coerces an environment string to the most specific JSON scalar:
/// boolean, integer, float, then string.
fn coerce_value(s: &str) -> ConfigValue {
    if s.eq_ignore_ascii_case("true") {
        return ConfigValue::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return ConfigValue::Bool(false);
    }

    if looks_like_integer(s) {
        if let Ok(i) = s.parse::<i64>() {
            return ConfigValue::from(i);
        }
    }

    if s.contains('.') {
        if let Ok(f) = s.parse::<f64>() {
            if let Some(n) = serde_json::Number::from_f64(f) {
                return ConfigValue::Number(n);
            }
        }
    }

    ConfigValue::String(s.to_string())
}

fn looks_like_integer(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn write_global_config(state_dir: &Path, contents: &str) {
        std::fs::create_dir_all(state_dir).unwrap();
        std::fs::write(state_dir.join(super::super::CONFIG_FILE), contents).unwrap();
    }

    #[test]
    fn test_create_with_empty_state_dir() {
        let state = tempdir().unwrap();
        let aggregator = ConfigAggregator::create_in(state.path()).unwrap();
        assert_eq!(aggregator.property_value("target-org"), None);
    }

    #[test]
    fn test_global_layer_supplies_values() {
        let state = tempdir().unwrap();
        write_global_config(state.path(), r#"{"target-org": "admin@example.com"}"#);

        let aggregator = ConfigAggregator::create_in(state.path()).unwrap();
        assert_eq!(
            aggregator.property_value("target-org"),
            Some(&json!("admin@example.com"))
        );
    }

    #[test]
    fn test_null_entries_are_skipped() {
        let state = tempdir().unwrap();
        write_global_config(state.path(), r#"{"target-org": null}"#);

        let aggregator = ConfigAggregator::create_in(state.path()).unwrap();
        assert_eq!(aggregator.property_value("target-org"), None);
    }

    #[test]
    fn test_malformed_global_file_fails_creation() {
        let state = tempdir().unwrap();
        write_global_config(state.path(), "{broken");

        let result = ConfigAggregator::create_in(state.path());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_reload_picks_up_edits() {
        let state = tempdir().unwrap();
        write_global_config(state.path(), r#"{"org-api-version": "55.0"}"#);

        let mut aggregator = ConfigAggregator::create_in(state.path()).unwrap();
        assert_eq!(
            aggregator.property_value("org-api-version"),
            Some(&json!("55.0"))
        );

        write_global_config(state.path(), r#"{"org-api-version": "58.0"}"#);
        aggregator.reload().unwrap();
        assert_eq!(
            aggregator.property_value("org-api-version"),
            Some(&json!("58.0"))
        );
    }

    #[test]
    fn test_env_coercion() {
        assert_eq!(coerce_value("true"), json!(true));
        assert_eq!(coerce_value("FALSE"), json!(false));
        assert_eq!(coerce_value("42"), json!(42));
        assert_eq!(coerce_value("-7"), json!(-7));
        assert_eq!(coerce_value("3.5"), json!(3.5));
        assert_eq!(coerce_value("57.0.1"), json!("57.0.1"));
        assert_eq!(coerce_value("dev@example.com"), json!("dev@example.com"));
    }
}
