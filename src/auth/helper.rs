//! Workspace-scoped bootstrap and connection construction.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::{
    self, ConfigAggregator, ORG_API_VERSION, TARGET_ORG,
};
use crate::connection::{CallOptions, Connection, ConnectionOptions, RawConnection, RawConnectionOptions};
use crate::error::Error;

use super::alias::Aliases;
use super::info::AuthInfo;

/// callOptions client id - shown in server-side logs.
const CLIENT: &str = "nimbus-auth";

/// Raw clients default to an old API version; used when the config does not
/// pin one and the caller supplies no default.
const DEFAULT_API_VERSION: &str = "57.0";

/// Process working-directory access, as a seam so tests can observe and fake
/// directory changes without touching real process state.
trait ProcessDir {
    fn cwd(&self) -> std::io::Result<PathBuf>;
    fn chdir(&self, path: &Path) -> std::io::Result<()>;
}

struct SystemProcess;

impl ProcessDir for SystemProcess {
    fn cwd(&self) -> std::io::Result<PathBuf> {
        std::env::current_dir()
    }

    fn chdir(&self, path: &Path) -> std::io::Result<()> {
        std::env::set_current_dir(path)
    }
}

/// Puts the working directory back where it started when dropped, on every
/// exit path out of the bootstrap. No-op when the directory never moved.
struct RestoreDir<'a> {
    process: &'a dyn ProcessDir,
    start_dir: PathBuf,
}

impl Drop for RestoreDir<'_> {
    fn drop(&mut self) {
        let moved = match self.process.cwd() {
            Ok(current) => current != self.start_dir,
            Err(_) => true,
        };
        if moved {
            if let Err(err) = self.process.chdir(&self.start_dir) {
                warn!(
                    start_dir = %self.start_dir.display(),
                    %err,
                    "failed to restore working directory after bootstrap"
                );
            }
        }
    }
}

/// Entry point for obtaining authenticated connections against the org
/// configured for a workspace.
///
/// The config aggregator walks up from the current working directory to find
/// a project marker, so in multi-workspace environments the bootstrap
/// temporarily switches into the workspace dir to pick up the right local
/// config on first try, then restores the original directory. The aggregator
/// is created once per helper instance and cached for its lifetime.
#[derive(Debug)]
pub struct AuthHelper {
    config: ConfigAggregator,
    state_dir: PathBuf,
}

impl AuthHelper {
    /// Bootstraps a helper for a workspace, against the default state dir.
    pub fn instance(workspace_path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::instance_in(workspace_path, config::default_state_dir()?)
    }

    /// Bootstraps a helper against an explicit state dir.
    pub fn instance_in(
        workspace_path: impl AsRef<Path>,
        state_dir: impl Into<PathBuf>,
    ) -> Result<Self, Error> {
        Self::bootstrap(workspace_path.as_ref(), state_dir.into(), &SystemProcess)
    }

    fn bootstrap(
        workspace_path: &Path,
        state_dir: PathBuf,
        process: &dyn ProcessDir,
    ) -> Result<Self, Error> {
        let start_dir = process.cwd().map_err(Error::WorkingDir)?;

        if workspace_path != start_dir {
            debug!(workspace = %workspace_path.display(), "switching into workspace for bootstrap");
            process.chdir(workspace_path).map_err(|source| Error::ChangeDir {
                path: workspace_path.to_path_buf(),
                source,
            })?;
        }

        // The guard restores start_dir whether creation succeeds or fails;
        // a creation error still propagates, after restoration.
        let created = {
            let _restore = RestoreDir {
                process,
                start_dir: start_dir.clone(),
            };
            ConfigAggregator::create_in(&state_dir)
        };

        Ok(Self {
            config: created?,
            state_dir,
        })
    }

    /// Creates a connection for a username, alias, or the default org.
    ///
    /// An unresolvable name is carried through as a literal username; the
    /// resulting connection then has no stored credentials and fails
    /// downstream at first use.
    pub fn connect(&self, username_or_alias: Option<&str>) -> Result<Connection, Error> {
        let username = self.valid_username(username_or_alias)?;
        let auth = AuthInfo::create(&self.state_dir, &username)?;
        let version = self.api_version(DEFAULT_API_VERSION);
        Ok(Connection::new(username, version, auth.connection_options()))
    }

    /// Creates a raw client connection for a username, alias, or the default
    /// org, pinning the API version from config when present.
    pub fn connect_raw(&self, username_or_alias: Option<&str>) -> Result<RawConnection, Error> {
        self.connect_raw_with_version(username_or_alias, DEFAULT_API_VERSION)
    }

    /// Like [`connect_raw`](Self::connect_raw) with an explicit fallback API
    /// version for when the config does not pin one.
    pub fn connect_raw_with_version(
        &self,
        username_or_alias: Option<&str>,
        default_api_version: &str,
    ) -> Result<RawConnection, Error> {
        let username = self.valid_username(username_or_alias)?;
        let auth = AuthInfo::create(&self.state_dir, &username)?;
        let version = self.api_version(default_api_version);
        Ok(RawConnection::new(raw_options(
            &auth.connection_options(),
            version,
        )))
    }

    /// Adapts an existing primary connection into a raw client one,
    /// inheriting its API version. Token, URLs and the refresh callback are
    /// copied through unchanged.
    pub fn to_raw_connection(connection: &Connection) -> RawConnection {
        RawConnection::new(raw_options(
            connection.connection_options(),
            connection.api_version().to_string(),
        ))
    }

    /// The full username of the configured default org.
    ///
    /// Reads `target-org` from the aggregator and resolves it through the
    /// alias store, falling back to the literal value.
    pub fn default_username(&self) -> Result<String, Error> {
        let target = self
            .config
            .property_value(TARGET_ORG)
            .and_then(config::value_to_string)
            .ok_or(Error::NoDefaultUsername)?;
        Ok(Aliases::resolve(&self.state_dir, &target).unwrap_or(target))
    }

    /// Rescans the underlying config sources, e.g. after an org was
    /// authorized or the default target changed.
    pub fn reload_config(&mut self) -> Result<(), Error> {
        self.config.reload()?;
        Ok(())
    }

    /// The aggregator bootstrapped for this helper's workspace.
    pub fn config(&self) -> &ConfigAggregator {
        &self.config
    }

    // Explicit argument wins; aliases fall back to the literal name.
    fn valid_username(&self, username_or_alias: Option<&str>) -> Result<String, Error> {
        match username_or_alias {
            Some(name) => Ok(
                Aliases::resolve(&self.state_dir, name).unwrap_or_else(|| name.to_string())
            ),
            None => self.default_username(),
        }
    }

    fn api_version(&self, default: &str) -> String {
        self.config
            .property_value(ORG_API_VERSION)
            .and_then(config::value_to_string)
            .unwrap_or_else(|| default.to_string())
    }
}

fn raw_options(options: &ConnectionOptions, version: String) -> RawConnectionOptions {
    RawConnectionOptions {
        version,
        access_token: options.access_token.clone(),
        instance_url: options.instance_url.clone(),
        login_url: options.login_url.clone(),
        oauth2: options.oauth2.clone(),
        call_options: CallOptions {
            client: CLIENT.to_string(),
        },
        refresh_fn: options.refresh_fn.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    /// Fake process state: tracks a pretend working directory and records
    /// every call, so tests can assert on the exact change sequence.
    struct MockProcess {
        current: Mutex<PathBuf>,
        cwd_calls: Mutex<usize>,
        chdir_calls: Mutex<Vec<PathBuf>>,
    }

    impl MockProcess {
        fn at(dir: impl Into<PathBuf>) -> Self {
            Self {
                current: Mutex::new(dir.into()),
                cwd_calls: Mutex::new(0),
                chdir_calls: Mutex::new(Vec::new()),
            }
        }

        fn chdirs(&self) -> Vec<PathBuf> {
            self.chdir_calls.lock().unwrap().clone()
        }

        fn cwd_count(&self) -> usize {
            *self.cwd_calls.lock().unwrap()
        }
    }

    impl ProcessDir for MockProcess {
        fn cwd(&self) -> std::io::Result<PathBuf> {
            *self.cwd_calls.lock().unwrap() += 1;
            Ok(self.current.lock().unwrap().clone())
        }

        fn chdir(&self, path: &Path) -> std::io::Result<()> {
            self.chdir_calls.lock().unwrap().push(path.to_path_buf());
            *self.current.lock().unwrap() = path.to_path_buf();
            Ok(())
        }
    }

    fn write_state(state_dir: &Path, config: &str, aliases: Option<&str>) {
        std::fs::write(state_dir.join("config.json"), config).unwrap();
        if let Some(aliases) = aliases {
            std::fs::write(state_dir.join("alias.json"), aliases).unwrap();
        }
    }

    fn write_org(state_dir: &Path, username: &str, contents: &str) {
        let dir = state_dir.join("orgs");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{username}.json")), contents).unwrap();
    }

    fn helper_with_state(state: &TempDir) -> AuthHelper {
        let ws = PathBuf::from("/project");
        let process = MockProcess::at(&ws);
        AuthHelper::bootstrap(&ws, state.path().to_path_buf(), &process).unwrap()
    }

    #[test]
    fn test_bootstrap_in_current_dir_does_not_move() {
        let state = tempdir().unwrap();
        let process = MockProcess::at("/project");

        AuthHelper::bootstrap(Path::new("/project"), state.path().to_path_buf(), &process)
            .unwrap();

        assert_eq!(process.cwd_count(), 2);
        assert!(process.chdirs().is_empty());
    }

    #[test]
    fn test_bootstrap_in_other_dir_moves_and_restores() {
        let state = tempdir().unwrap();
        let process = MockProcess::at("/project");

        AuthHelper::bootstrap(
            Path::new("/otherproject"),
            state.path().to_path_buf(),
            &process,
        )
        .unwrap();

        assert_eq!(
            process.chdirs(),
            vec![PathBuf::from("/otherproject"), PathBuf::from("/project")]
        );
    }

    #[test]
    fn test_bootstrap_failure_still_restores() {
        let state = tempdir().unwrap();
        write_state(state.path(), "{broken", None);
        let process = MockProcess::at("/project");

        let result = AuthHelper::bootstrap(
            Path::new("/otherproject"),
            state.path().to_path_buf(),
            &process,
        );

        assert!(matches!(result, Err(Error::Config(_))));
        assert_eq!(
            process.chdirs(),
            vec![PathBuf::from("/otherproject"), PathBuf::from("/project")]
        );
    }

    #[test]
    fn test_connect_without_default_org_fails() {
        let state = tempdir().unwrap();
        write_state(state.path(), "{}", None);
        let helper = helper_with_state(&state);

        let err = helper.connect(None).unwrap_err();
        assert!(err.to_string().contains("no default username found"));
    }

    #[test]
    fn test_connect_resolves_default_alias() {
        let state = tempdir().unwrap();
        write_state(
            state.path(),
            r#"{"target-org": "dev"}"#,
            Some(r#"{"orgs": {"dev": "test@org.com"}}"#),
        );
        write_org(
            state.path(),
            "test@org.com",
            r#"{"accessToken": "token-123", "instanceUrl": "https://inst.example.com"}"#,
        );
        let helper = helper_with_state(&state);

        let conn = helper.connect(None).unwrap();
        assert_eq!(conn.username(), "test@org.com");
        assert_eq!(
            conn.connection_options().access_token.as_deref(),
            Some("token-123")
        );
    }

    #[test]
    fn test_connect_accepts_default_literal_username() {
        let state = tempdir().unwrap();
        write_state(state.path(), r#"{"target-org": "test@org.com"}"#, None);
        write_org(state.path(), "test@org.com", r#"{"accessToken": "t"}"#);
        let helper = helper_with_state(&state);

        let conn = helper.connect(None).unwrap();
        assert_eq!(conn.username(), "test@org.com");
    }

    #[test]
    fn test_connect_with_explicit_alias() {
        let state = tempdir().unwrap();
        write_state(
            state.path(),
            "{}",
            Some(r#"{"orgs": {"dev": "test@org.com"}}"#),
        );
        write_org(state.path(), "test@org.com", r#"{"accessToken": "t"}"#);
        let helper = helper_with_state(&state);

        let conn = helper.connect(Some("dev")).unwrap();
        assert_eq!(conn.username(), "test@org.com");
    }

    #[test]
    fn test_connect_with_unresolvable_username_falls_through() {
        let state = tempdir().unwrap();
        write_state(state.path(), "{}", None);
        let helper = helper_with_state(&state);

        let conn = helper.connect(Some("bad")).unwrap();
        assert_eq!(conn.username(), "bad");
        assert_eq!(conn.connection_options().access_token, None);
    }

    #[test]
    fn test_connect_raw_uses_configured_api_version() {
        let state = tempdir().unwrap();
        write_state(state.path(), r#"{"org-api-version": "55.0"}"#, None);
        write_org(state.path(), "test@org.com", r#"{"accessToken": "t"}"#);
        let helper = helper_with_state(&state);

        let conn = helper.connect_raw(Some("test@org.com")).unwrap();
        assert_eq!(conn.version(), "55.0");
    }

    #[test]
    fn test_connect_raw_falls_back_to_supplied_default_version() {
        let state = tempdir().unwrap();
        write_state(state.path(), "{}", None);
        write_org(state.path(), "test@org.com", r#"{"accessToken": "t"}"#);
        let helper = helper_with_state(&state);

        let conn = helper
            .connect_raw_with_version(Some("test@org.com"), "52.0")
            .unwrap();
        assert_eq!(conn.version(), "52.0");
    }

    #[test]
    fn test_raw_adaptation_preserves_auth_fields() {
        let state = tempdir().unwrap();
        write_state(state.path(), "{}", None);
        write_org(
            state.path(),
            "test@org.com",
            r#"{
                "accessToken": "token-123",
                "instanceUrl": "https://inst.example.com",
                "loginUrl": "https://login.example.com",
                "clientId": "connected-app"
            }"#,
        );
        let helper = helper_with_state(&state);

        let conn = helper.connect(Some("test@org.com")).unwrap();
        let raw = AuthHelper::to_raw_connection(&conn);

        assert_eq!(raw.version(), conn.api_version());
        assert_eq!(raw.access_token(), Some("token-123"));
        assert_eq!(raw.instance_url(), Some("https://inst.example.com"));
        assert_eq!(raw.login_url(), Some("https://login.example.com"));
        assert_eq!(raw.oauth2().client_id.as_deref(), Some("connected-app"));
        assert_eq!(raw.call_options().client, CLIENT);
    }

    #[test]
    fn test_default_username_without_target_org() {
        let state = tempdir().unwrap();
        write_state(state.path(), "{}", None);
        let helper = helper_with_state(&state);

        assert!(matches!(
            helper.default_username(),
            Err(Error::NoDefaultUsername)
        ));
    }

    #[test]
    fn test_reload_config_picks_up_new_default() {
        let state = tempdir().unwrap();
        write_state(state.path(), "{}", None);
        let mut helper = helper_with_state(&state);
        assert!(helper.default_username().is_err());

        write_state(state.path(), r#"{"target-org": "test@org.com"}"#, None);
        helper.reload_config().unwrap();
        assert_eq!(helper.default_username().unwrap(), "test@org.com");
    }
}
