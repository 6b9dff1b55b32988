use crate::config::ConfigError;
use thiserror::Error;

/// Top-level error type for the nimbus-auth library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("no default username found in org config")]
    NoDefaultUsername,

    #[error("failed to read process working directory: {0}")]
    WorkingDir(#[source] std::io::Error),

    #[error("failed to change working directory to '{}': {source}", .path.display())]
    ChangeDir {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}
