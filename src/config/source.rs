/// Opaque configuration value. The lookup layer never interprets contents
/// beyond null checks; callers stringify scalars where they need text.
pub type ConfigValue = serde_json::Value;

/// Which layer satisfied a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSource {
    Local,
    Global,
    None,
}

/// Optional restriction for a lookup: consult one layer only.
///
/// A separate type from [`ConfigSource`] so that `None` is not a valid
/// restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigLayer {
    Local,
    Global,
}

/// Renders a scalar config value as a string, the way version and org keys
/// are consumed. Objects and arrays have no string form here.
pub(crate) fn value_to_string(value: &ConfigValue) -> Option<String> {
    match value {
        ConfigValue::String(s) => Some(s.clone()),
        ConfigValue::Number(n) => Some(n.to_string()),
        ConfigValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
