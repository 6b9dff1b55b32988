//! Stored-credential loading and the primary connection descriptor.

use std::path::Path;

use serde::Deserialize;

use crate::config::ConfigError;
use crate::connection::{ConnectionOptions, OAuth2Options};

const ORGS_DIR: &str = "orgs";

/// Credential fields persisted for an org, one JSON file per username at
/// `<state>/orgs/<username>.json`. Which fields are present depends on how
/// the org was authorized (access token, JWT or OAuth web flow); downstream
/// consumers copy them verbatim and never branch on the flow.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthFields {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub instance_url: Option<String>,
    #[serde(default)]
    pub login_url: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
}

/// Auth descriptor for a single username.
#[derive(Debug, Clone)]
pub struct AuthInfo {
    username: String,
    fields: AuthFields,
}

impl AuthInfo {
    /// Loads stored auth for a username.
    ///
    /// A username with no stored file yields empty fields rather than an
    /// error; the connection built from it fails downstream at first use.
    /// A present but malformed file is a hard error.
    pub fn create(state_dir: &Path, username: &str) -> Result<Self, ConfigError> {
        let path = state_dir.join(ORGS_DIR).join(format!("{username}.json"));
        let fields = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
                    path: path.clone(),
                    source: e,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AuthFields::default(),
            Err(e) => {
                return Err(ConfigError::ReadError {
                    path,
                    source: e,
                })
            }
        };
        Ok(Self {
            username: username.to_string(),
            fields,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn fields(&self) -> &AuthFields {
        &self.fields
    }

    /// Projects the stored fields into the primary connection's option shape.
    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            access_token: self.fields.access_token.clone(),
            instance_url: self.fields.instance_url.clone(),
            login_url: self.fields.login_url.clone(),
            oauth2: OAuth2Options {
                client_id: self.fields.client_id.clone(),
                login_url: self.fields.login_url.clone(),
                redirect_uri: self.fields.redirect_uri.clone(),
            },
            refresh_fn: None,
        }
    }
}
