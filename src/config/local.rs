//! Project-scoped configuration source.

use std::path::{Path, PathBuf};

use serde_json::Map;

use super::source::ConfigValue;
use super::{ConfigError, CONFIG_DIR, CONFIG_FILE};

/// A read-only view of a workspace's local config store at
/// `<workspace>/.nimbus/config.json`.
///
/// Opened per lookup; nothing is cached across calls. A missing file is a
/// normal state (the project may not be initialized yet) and yields an empty
/// store. Read and parse failures are typed errors so callers decide whether
/// to surface or swallow them.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    entries: Map<String, ConfigValue>,
}

impl LocalConfig {
    /// Opens the local config store for a workspace.
    pub fn open(workspace_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = workspace_path.as_ref().join(CONFIG_DIR).join(CONFIG_FILE);
        Ok(Self {
            entries: load_json_object(&path)?.unwrap_or_default(),
        })
    }

    /// Returns the raw value for a key, including explicit `null`s.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }
}

/// Loads and parses a JSON config file into a flat object.
///
/// Returns `Ok(None)` if the file doesn't exist.
pub(crate) fn load_json_object(
    path: &Path,
) -> Result<Option<Map<String, ConfigValue>>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let value: ConfigValue =
                serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            match value {
                ConfigValue::Object(map) => Ok(Some(map)),
                _ => Err(ConfigError::NotAnObject(path.to_path_buf())),
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

pub(crate) fn config_file_path(root: &Path) -> PathBuf {
    root.join(CONFIG_DIR).join(CONFIG_FILE)
}
