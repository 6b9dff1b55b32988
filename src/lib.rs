//! Thin auth/config adapter for the Nimbus CLI ecosystem.
//!
//! Credential storage, token refresh and alias persistence belong to the
//! Nimbus tooling itself; this crate only resolves configuration with a
//! local-before-global precedence rule, bootstraps the config aggregator
//! against a chosen workspace directory, and adapts the resulting
//! connection descriptor into the raw client's constructor options.

pub mod auth;
pub mod config;
pub mod connection;
mod error;

pub use auth::AuthHelper;
pub use config::{ConfigAggregator, ConfigError, ConfigLayer, ConfigReader, ConfigSource};
pub use connection::{Connection, RawConnection, RawConnectionOptions};
pub use error::Error;
