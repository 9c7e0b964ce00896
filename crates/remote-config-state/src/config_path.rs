//! Parsing of Remote Config target paths.
//!
//! Client configs live under `datadog/<org_id>/<product>/<config_id>/<name>`
//! or, for configs pushed by Datadog employees, `employee/<product>/<config_id>/<name>`.

use crate::error::{RepositoryError, Result};

pub const PRODUCT_AGENT_CONFIG: &str = "AGENT_CONFIG";
pub const PRODUCT_AGENT_TASK: &str = "AGENT_TASK";
pub const PRODUCT_AGENT_FAILOVER: &str = "AGENT_FAILOVER";
pub const PRODUCT_APM_TRACING: &str = "APM_TRACING";
pub const PRODUCT_APM_SAMPLING: &str = "APM_SAMPLING";
pub const PRODUCT_ASM: &str = "ASM";
pub const PRODUCT_ASM_DD: &str = "ASM_DD";
pub const PRODUCT_ASM_DATA: &str = "ASM_DATA";
pub const PRODUCT_ASM_FEATURES: &str = "ASM_FEATURES";
pub const PRODUCT_CWS_DD: &str = "CWS_DD";
pub const PRODUCT_CWS_CUSTOM: &str = "CWS_CUSTOM";
pub const PRODUCT_CWS_SECURITY_PROFILES: &str = "CWS_SECURITY_PROFILES";
pub const PRODUCT_LIVE_DEBUGGING: &str = "LIVE_DEBUGGING";
pub const PRODUCT_CONTAINER_AUTOSCALING_SETTINGS: &str = "CONTAINER_AUTOSCALING_SETTINGS";
pub const PRODUCT_CONTAINER_AUTOSCALING_VALUES: &str = "CONTAINER_AUTOSCALING_VALUES";
pub const PRODUCT_ORCHESTRATOR_K8S_CRDS: &str = "ORCHESTRATOR_K8S_CRDS";

/// Namespace a config path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// `datadog/<org>/<product>/<config>/<name>`.
    Datadog,
    /// `employee/<product>/<config>/<name>`.
    Employee,
}

/// Structured view of a client config path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPath {
    pub source: ConfigSource,
    /// Present for Datadog-managed configs only.
    pub org_id: Option<u64>,
    pub product: String,
    pub config_id: String,
    pub name: String,
}

/// Parses a client config path.
pub fn parse_config_path(path: &str) -> Result<ConfigPath> {
    let segments: Vec<&str> = path.split('/').collect();
    let malformed = |reason: String| RepositoryError::MalformedPath {
        path: path.to_string(),
        reason,
    };
    let (source, org_id, rest) = match segments.first().copied() {
        Some("datadog") => {
            if segments.len() != 5 {
                return Err(malformed(format!(
                    "expected 5 segments, found {}",
                    segments.len()
                )));
            }
            let org_segment = segments[1];
            let org_id: u64 = org_segment.parse().map_err(|err| {
                malformed(format!("could not parse orgID '{org_segment}': {err}"))
            })?;
            (ConfigSource::Datadog, Some(org_id), &segments[2..])
        }
        Some("employee") => {
            if segments.len() != 4 {
                return Err(malformed(format!(
                    "expected 4 segments, found {}",
                    segments.len()
                )));
            }
            (ConfigSource::Employee, None, &segments[1..])
        }
        _ => return Err(malformed("unknown source".to_string())),
    };
    let [product, config_id, name] = rest else {
        return Err(malformed("wrong format".to_string()));
    };
    for (label, value) in [("product", product), ("config id", config_id), ("name", name)] {
        if value.is_empty() {
            return Err(malformed(format!("{label} is empty")));
        }
    }
    Ok(ConfigPath {
        source,
        org_id,
        product: product.to_string(),
        config_id: config_id.to_string(),
        name: name.to_string(),
    })
}

/// Ensures a Datadog-managed path belongs to `expected_org_id`. Employee paths are exempt.
pub(crate) fn check_org_id(path: &str, parsed: &ConfigPath, expected_org_id: u64) -> Result<()> {
    if parsed.source == ConfigSource::Employee {
        return Ok(());
    }
    let actual = parsed.org_id.unwrap_or(0);
    if actual != expected_org_id {
        tracing::warn!(
            target_path = %path,
            expected_org_id,
            actual_org_id = actual,
            "repository: target org id mismatch"
        );
        return Err(RepositoryError::OrgIdMismatch {
            path: path.to_string(),
            expected: expected_org_id,
            actual,
        });
    }
    Ok(())
}
