use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}': {source}", .path.display())]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("config file '{}' is not a JSON object", .0.display())]
    NotAnObject(PathBuf),

    #[error("could not determine a home directory for the global state dir")]
    NoHomeDir,
}
