//! Verification settings for a [`crate::Repository`].
//!
//! Settings can be built in code or read from the process environment using
//! the same variable names the agent uses.

use std::collections::HashMap;
use std::env;

/// Environment variable overriding the embedded director root metadata.
const ENV_DIRECTOR_ROOT: &str = "DD_REMOTE_CONFIGURATION_DIRECTOR_ROOT";
/// Environment variable enabling `expires` checks on root and targets metadata.
const ENV_ENFORCE_EXPIRY: &str = "DD_REMOTE_CONFIGURATION_ENFORCE_EXPIRY";

/// Knobs applied while verifying updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Reject root and targets documents past their `expires` date. Off by default.
    pub enforce_expiry: bool,
    /// When set, every `datadog/<org_id>/…` client config must carry this org id.
    pub expected_org_id: Option<u64>,
    /// Raw root metadata used by [`crate::Repository::from_config`].
    pub director_root_override: Option<String>,
}

impl RepositoryConfig {
    /// Builds settings from the current process environment.
    pub fn from_os_env() -> Self {
        Self::from_env_iter(env::vars())
    }

    /// Builds settings from an iterator of key/value pairs (typically for tests).
    pub fn from_env_iter<I, K, V>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let director_root_override = map
            .get(ENV_DIRECTOR_ROOT)
            .and_then(|value| sanitize_non_empty(value));
        let enforce_expiry = parse_bool(map.get(ENV_ENFORCE_EXPIRY).map(String::as_str), false);

        Self {
            enforce_expiry,
            expected_org_id: None,
            director_root_override,
        }
    }

    pub fn with_expected_org_id(mut self, org_id: u64) -> Self {
        self.expected_org_id = Some(org_id);
        self
    }

    pub fn with_enforce_expiry(mut self, enforce: bool) -> Self {
        self.enforce_expiry = enforce;
        self
    }
}

/// Helper trimming whitespace and discarding empty values.
fn sanitize_non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses boolean values from strings, falling back to the provided default.
fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value.map(|s| s.trim().to_ascii_lowercase()) {
        Some(ref v) if ["1", "true", "t", "yes", "y"].contains(&v.as_str()) => true,
        Some(ref v) if ["0", "false", "f", "no", "n"].contains(&v.as_str()) => false,
        _ => default,
    }
}
