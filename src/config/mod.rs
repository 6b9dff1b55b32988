//! Configuration resolution: local project files, the global state dir,
//! and the multi-source aggregator.

mod aggregator;
mod error;
mod local;
mod lookup;
mod source;

pub use aggregator::ConfigAggregator;
pub use error::ConfigError;
pub use local::LocalConfig;
pub use lookup::ConfigReader;
pub use source::{ConfigLayer, ConfigSource, ConfigValue};

pub(crate) use source::value_to_string;

use std::path::PathBuf;

/// Directory holding project-scoped config, relative to a workspace root.
pub const CONFIG_DIR: &str = ".nimbus";

/// Config file name, used both locally and in the global state dir.
pub const CONFIG_FILE: &str = "config.json";

/// Marker file identifying a Nimbus project root.
pub const PROJECT_FILE: &str = "nimbus-project.json";

/// Environment variable overriding the global state dir location.
pub const STATE_DIR_VAR: &str = "NIMBUS_HOME";

/// Config key naming the default org (username or alias).
pub const TARGET_ORG: &str = "target-org";

/// Config key overriding the API version used for connections.
pub const ORG_API_VERSION: &str = "org-api-version";

/// Resolves the global state dir: `$NIMBUS_HOME` if set, else `~/.nimbus`.
pub fn default_state_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = std::env::var_os(STATE_DIR_VAR) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR))
        .ok_or(ConfigError::NoHomeDir)
}
