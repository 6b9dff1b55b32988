//! Layered key lookup: local project config first, global aggregator second.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::aggregator::ConfigAggregator;
use super::local::LocalConfig;
use super::source::{ConfigLayer, ConfigSource, ConfigValue};
use super::{default_state_dir, ConfigError};

/// Resolves single configuration keys with local-before-global precedence.
///
/// Exists because the aggregator alone does not answer "which layer supplied
/// this value" and, being cwd-relative, may miss the local config of a
/// workspace the process is not currently inside. Lookups are best-effort:
/// any failure inside a layer probe counts as "no value" for that layer, so
/// an uninitialized or corrupt config file never surfaces as an error here.
#[derive(Debug, Clone)]
pub struct ConfigReader {
    state_dir: PathBuf,
}

impl ConfigReader {
    /// A reader against the default state dir.
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            state_dir: default_state_dir()?,
        })
    }

    /// A reader against an explicit state dir.
    pub fn with_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    /// Returns the first non-null value for `key`, local layer first.
    pub fn value(&self, workspace_path: impl AsRef<Path>, key: &str) -> Option<ConfigValue> {
        self.value_from(workspace_path, key, None)
    }

    /// Like [`value`](Self::value), optionally restricted to a single layer.
    ///
    /// A restricted lookup never touches the other layer.
    pub fn value_from(
        &self,
        workspace_path: impl AsRef<Path>,
        key: &str,
        layer: Option<ConfigLayer>,
    ) -> Option<ConfigValue> {
        if matches!(layer, None | Some(ConfigLayer::Local)) {
            if let Some(value) = probe_local(workspace_path.as_ref(), key) {
                return Some(value);
            }
        }
        if matches!(layer, None | Some(ConfigLayer::Global)) {
            if let Some(value) = self.probe_global(key) {
                return Some(value);
            }
        }
        None
    }

    /// Reports which layer would satisfy a lookup for `key`.
    ///
    /// Same probes, same order and same short-circuit as
    /// [`value`](Self::value); only the projection of the result differs.
    pub fn source(&self, workspace_path: impl AsRef<Path>, key: &str) -> ConfigSource {
        let workspace_path = workspace_path.as_ref();
        if self
            .value_from(workspace_path, key, Some(ConfigLayer::Local))
            .is_some()
        {
            return ConfigSource::Local;
        }
        if self
            .value_from(workspace_path, key, Some(ConfigLayer::Global))
            .is_some()
        {
            return ConfigSource::Global;
        }
        ConfigSource::None
    }

    // Swallow boundary for the global layer: aggregator creation or read
    // failures degrade to "no value".
    fn probe_global(&self, key: &str) -> Option<ConfigValue> {
        match ConfigAggregator::create_in(&self.state_dir) {
            Ok(aggregator) => aggregator.property_value(key).cloned(),
            Err(err) => {
                debug!(%err, "global config probe failed");
                None
            }
        }
    }
}

// Swallow boundary for the local layer: a missing, unreadable or malformed
// project file degrades to "no value". Explicit nulls are absent too.
fn probe_local(workspace_path: &Path, key: &str) -> Option<ConfigValue> {
    match LocalConfig::open(workspace_path) {
        Ok(config) => config.get(key).filter(|v| !v.is_null()).cloned(),
        Err(err) => {
            debug!(%err, "local config probe failed");
            None
        }
    }
}
