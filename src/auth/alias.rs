//! Alias to username resolution.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

const ALIAS_FILE: &str = "alias.json";

#[derive(Debug, Default, Deserialize)]
struct AliasFile {
    #[serde(default)]
    orgs: BTreeMap<String, String>,
}

/// Read-only view of the alias store at `<state>/alias.json`.
///
/// Resolution never fails: an unknown alias, a missing file or an unreadable
/// one all resolve to `None`, and callers fall back to treating the input as
/// a literal username.
#[derive(Debug)]
pub struct Aliases;

impl Aliases {
    /// Resolves an alias to its username, or `None` if it is not an alias.
    pub fn resolve(state_dir: &Path, name: &str) -> Option<String> {
        let path = state_dir.join(ALIAS_FILE);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) => {
                debug!(path = %path.display(), %err, "alias store not readable");
                return None;
            }
        };
        match serde_json::from_str::<AliasFile>(&contents) {
            Ok(file) => file.orgs.get(name).cloned(),
            Err(err) => {
                debug!(path = %path.display(), %err, "alias store not parseable");
                None
            }
        }
    }
}
