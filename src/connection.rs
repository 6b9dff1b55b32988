//! Connection descriptors: the primary connection produced from stored auth,
//! and the raw (secondary client) constructor option shape it adapts into.

use std::fmt;
use std::sync::Arc;

/// Callback invoked by a client when an access token expires; yields a fresh
/// token. Passed through adapters untouched; this crate never calls it.
pub type RefreshFn =
    Arc<dyn Fn(&RawConnection) -> Result<String, Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

/// OAuth client identifiers carried alongside a token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OAuth2Options {
    pub client_id: Option<String>,
    pub login_url: Option<String>,
    pub redirect_uri: Option<String>,
}

/// Client identification sent with API calls, shown in server-side logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOptions {
    pub client: String,
}

/// Auth/transport options of the primary connection, as produced by
/// [`crate::auth::AuthInfo`].
#[derive(Clone, Default)]
pub struct ConnectionOptions {
    pub access_token: Option<String>,
    pub instance_url: Option<String>,
    pub login_url: Option<String>,
    pub oauth2: OAuth2Options,
    pub refresh_fn: Option<RefreshFn>,
}

impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("access_token", &self.access_token.as_deref().map(|_| "<redacted>"))
            .field("instance_url", &self.instance_url)
            .field("login_url", &self.login_url)
            .field("oauth2", &self.oauth2)
            .field("refresh_fn", &self.refresh_fn.is_some())
            .finish()
    }
}

/// An authenticated primary connection for a resolved username.
///
/// Carries whatever credentials were stored for the username; a username
/// with no stored auth yields a connection with empty options, which fails
/// downstream at first use rather than here.
#[derive(Debug, Clone)]
pub struct Connection {
    username: String,
    api_version: String,
    options: ConnectionOptions,
}

impl Connection {
    pub(crate) fn new(username: String, api_version: String, options: ConnectionOptions) -> Self {
        Self {
            username,
            api_version,
            options,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn connection_options(&self) -> &ConnectionOptions {
        &self.options
    }
}

/// Constructor options for the raw client connection; the target shape of
/// the field-mapping adapter in [`crate::AuthHelper`].
#[derive(Clone)]
pub struct RawConnectionOptions {
    pub version: String,
    pub access_token: Option<String>,
    pub instance_url: Option<String>,
    pub login_url: Option<String>,
    pub oauth2: OAuth2Options,
    pub call_options: CallOptions,
    pub refresh_fn: Option<RefreshFn>,
}

impl fmt::Debug for RawConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawConnectionOptions")
            .field("version", &self.version)
            .field("access_token", &self.access_token.as_deref().map(|_| "<redacted>"))
            .field("instance_url", &self.instance_url)
            .field("login_url", &self.login_url)
            .field("oauth2", &self.oauth2)
            .field("call_options", &self.call_options)
            .field("refresh_fn", &self.refresh_fn.is_some())
            .finish()
    }
}

/// The raw (secondary client) connection object.
#[derive(Debug, Clone)]
pub struct RawConnection {
    options: RawConnectionOptions,
}

impl RawConnection {
    pub fn new(options: RawConnectionOptions) -> Self {
        Self { options }
    }

    pub fn version(&self) -> &str {
        &self.options.version
    }

    pub fn access_token(&self) -> Option<&str> {
        self.options.access_token.as_deref()
    }

    pub fn instance_url(&self) -> Option<&str> {
        self.options.instance_url.as_deref()
    }

    pub fn login_url(&self) -> Option<&str> {
        self.options.login_url.as_deref()
    }

    pub fn oauth2(&self) -> &OAuth2Options {
        &self.options.oauth2
    }

    pub fn call_options(&self) -> &CallOptions {
        &self.options.call_options
    }

    pub fn refresh_fn(&self) -> Option<&RefreshFn> {
        self.options.refresh_fn.as_ref()
    }
}
